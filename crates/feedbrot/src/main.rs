mod cli;
mod paths;
mod run;
mod settings;

use anyhow::Result;
use cli::{Command, ConfigAction};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => match config_cmd.action {
            ConfigAction::Show { json } => run::run_config_show(&cli.run, json),
            ConfigAction::Where => run::run_config_where(),
        },
        None => run::run(&cli.run),
    }
}
