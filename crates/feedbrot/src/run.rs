use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::settings::{self, ConfigOrigin};

pub fn run(args: &RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let resolved = settings::resolve(args, &paths)?;
    match &resolved.origin {
        ConfigOrigin::File(path) => {
            tracing::info!(config = %path.display(), "loaded session config");
        }
        ConfigOrigin::Defaults { searched } => {
            tracing::info!(
                searched = %searched.display(),
                "no session config found; using defaults"
            );
        }
    }

    let renderer_config = settings::renderer_config(&resolved.config)?;
    let program = settings::load_program(&resolved.config)?;
    tracing::info!(
        width = renderer_config.dimensions.width,
        height = renderer_config.dimensions.height,
        interval = ?renderer_config.min_frame_interval,
        max_iterations = renderer_config.max_iterations,
        shader = ?resolved.config.shader,
        "starting feedback preview"
    );
    renderer::run_window(&renderer_config, &program)
}

/// Logs go to stderr so `config show` output stays machine-readable.
pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run_config_show(args: &RunArgs, json: bool) -> Result<()> {
    let paths = AppPaths::discover()?;
    let resolved = settings::resolve(args, &paths)?;
    let rendered = if json {
        serde_json::to_string_pretty(&resolved.config)
            .context("failed to encode config as JSON")?
    } else {
        resolved
            .config
            .to_toml_string()
            .context("failed to encode config as TOML")?
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

pub fn run_config_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    let file = paths.config_file();
    println!("config dir:  {}", paths.config_dir().display());
    println!(
        "config file: {} ({})",
        file.display(),
        if file.is_file() { "present" } else { "missing" }
    );
    Ok(())
}
