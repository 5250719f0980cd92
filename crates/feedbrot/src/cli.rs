use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scheduler::Dimensions;
use sessionconfig::RecenterSetting;

#[derive(Parser, Debug)]
#[command(
    name = "feedbrot",
    author,
    version,
    about = "GPU ping-pong feedback viewer for escape-time fractals"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Session config file (defaults to `feedbrot.toml` in the config directory).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Compute program to run instead of the built-in Mandelbrot program.
    #[arg(long, value_name = "PATH")]
    pub shader: Option<PathBuf>,

    /// Feedback buffer and window size (e.g. `1000x1000`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<Dimensions>,

    /// Target feedback steps per second.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Steps to run after every zoom before the loop goes idle.
    #[arg(long, value_name = "N")]
    pub iterations: Option<u32>,

    /// How a zoom target recenters the domain: `per-axis` or `shared-x`.
    #[arg(long, value_name = "MODE", value_parser = parse_recenter)]
    pub recenter: Option<RecenterSetting>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the session configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration, including command-line overrides.
    Show {
        /// Emit JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
    /// Print where the config file is looked up.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<Dimensions, String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WIDTHxHEIGHT, e.g. 1000x1000".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height in size specification".to_string())?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero in both dimensions".into());
    }
    Ok(Dimensions::new(width, height))
}

pub fn parse_recenter(value: &str) -> Result<RecenterSetting, String> {
    RecenterSetting::parse(value).ok_or_else(|| {
        format!("unknown recenter mode '{}'; expected per-axis or shared-x", value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_variants() {
        assert_eq!(parse_size("1000x1000").unwrap(), Dimensions::new(1000, 1000));
        assert_eq!(parse_size(" 640X480 ").unwrap(), Dimensions::new(640, 480));
        assert_eq!(parse_size("800×600").unwrap(), Dimensions::new(800, 600));
        assert!(parse_size("1000").is_err());
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("wide x tall").is_err());
    }

    #[test]
    fn parses_recenter_modes() {
        assert_eq!(parse_recenter("per-axis").unwrap(), RecenterSetting::PerAxis);
        assert_eq!(parse_recenter("SHARED-X").unwrap(), RecenterSetting::SharedX);
        assert!(parse_recenter("diagonal").is_err());
    }

    #[test]
    fn overrides_precede_subcommand() {
        let cli = Cli::try_parse_from([
            "feedbrot",
            "--iterations",
            "42",
            "--size",
            "320x200",
            "config",
            "show",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.run.iterations, Some(42));
        assert_eq!(cli.run.size, Some(Dimensions::new(320, 200)));
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand {
                action: ConfigAction::Show { json: true }
            }))
        ));
    }
}
