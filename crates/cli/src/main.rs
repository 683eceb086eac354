use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Commands;

#[derive(Parser, Debug)]
#[command(name = "permcache")]
#[command(about = "Check permissions through the permcache authorizer", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file, overridden by environment variables
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_level(true)
                .with_target(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            cli.log_level,
        ))
        .init();

    match cli.command.execute(cli.config.as_deref()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(commands::EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "permcache",
            "check",
            "--token",
            "abc",
            "--permission",
            "product-view",
            "--config",
            "permcache.json",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("permcache.json")));
        assert_eq!(cli.log_level, Level::DEBUG);
        assert!(matches!(
            cli.command,
            Commands::Check { ref token, repeat: 1, .. } if token == "abc"
        ));
    }

    #[test]
    fn check_requires_token_and_permission() {
        assert!(Cli::try_parse_from(["permcache", "check", "--token", "abc"]).is_err());
        assert!(Cli::try_parse_from(["permcache", "login"]).is_ok());
    }
}
