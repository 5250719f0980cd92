use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use renderer::{GpuPowerPreference, RendererConfig};
use scheduler::{Dimensions, Domain, RecenterMode};
use sessionconfig::{PowerSetting, RecenterSetting, SessionConfig};

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Built-in compute program used when no `shader` is configured.
pub const BUILTIN_PROGRAM: &str = include_str!("../shaders/mandelbrot.frag");

/// Where the session configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    /// No file was found at the searched location.
    Defaults { searched: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub config: SessionConfig,
    pub origin: ConfigOrigin,
}

/// Loads the config file (explicit `--config` or the discovered default),
/// applies command-line overrides and validates the result.
pub fn resolve(args: &RunArgs, paths: &AppPaths) -> Result<ResolvedSettings> {
    let (mut config, origin) = match &args.config {
        Some(path) => (load_file(path)?, ConfigOrigin::File(path.clone())),
        None => {
            let path = paths.config_file();
            if path.is_file() {
                (load_file(&path)?, ConfigOrigin::File(path))
            } else {
                tracing::debug!(searched = %path.display(), "no config file; using defaults");
                (SessionConfig::default(), ConfigOrigin::Defaults { searched: path })
            }
        }
    };

    apply_overrides(&mut config, args);
    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;
    Ok(ResolvedSettings { config, origin })
}

/// Parses a config file; a relative `shader` path is taken relative to the
/// file's directory.
fn load_file(path: &Path) -> Result<SessionConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let mut config = SessionConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to load config at {}", path.display()))?;
    if let (Some(shader), Some(base)) = (config.shader.as_mut(), path.parent()) {
        if shader.is_relative() {
            *shader = base.join(&*shader);
        }
    }
    Ok(config)
}

fn apply_overrides(config: &mut SessionConfig, args: &RunArgs) {
    if let Some(shader) = &args.shader {
        config.shader = Some(shader.clone());
    }
    if let Some(size) = args.size {
        config.width = size.width;
        config.height = size.height;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
        config.frame_interval = None;
    }
    if let Some(iterations) = args.iterations {
        config.max_iterations = iterations;
    }
    if let Some(recenter) = args.recenter {
        config.zoom.recenter = recenter;
    }
}

pub fn renderer_config(config: &SessionConfig) -> Result<RendererConfig> {
    let domain = Domain::new(config.domain.x, config.domain.y).context("invalid domain")?;
    Ok(RendererConfig {
        dimensions: Dimensions::new(config.width, config.height),
        min_frame_interval: config.min_frame_interval(),
        max_iterations: config.max_iterations,
        domain,
        recenter: match config.zoom.recenter {
            RecenterSetting::PerAxis => RecenterMode::PerAxis,
            RecenterSetting::SharedX => RecenterMode::SharedX,
        },
        zoom_in_factor: config.zoom.in_factor,
        zoom_out_factor: config.zoom.out_factor,
        restart_on_remap: config.zoom.restart_on_remap,
        power: match config.gpu.power {
            PowerSetting::High => GpuPowerPreference::High,
            PowerSetting::Low => GpuPowerPreference::Low,
        },
        vsync: config.gpu.vsync,
        ..RendererConfig::default()
    })
}

/// Reads the configured compute program, or returns the built-in one.
pub fn load_program(config: &SessionConfig) -> Result<String> {
    match &config.shader {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read compute program at {}", path.display())),
        None => Ok(BUILTIN_PROGRAM.to_string()),
    }
}
