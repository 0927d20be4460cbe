use std::path::PathBuf;

use anyhow::{Context, Result};
use carbontrip::{CarbonTripConfig, VERSION, telemetry, web};
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "carbontrip", version, about = "Multi-leg trip planner with CO2e estimates")]
struct Cli {
    /// Configuration file, defaults to the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config =
        CarbonTripConfig::load_from_path(cli.config).context("Failed to load configuration")?;
    let _telemetry = telemetry::init(&config.logging)?;

    info!("Starting CarbonTrip {}", VERSION);
    web::run(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flag() {
        let cli = Cli::try_parse_from(["carbontrip", "--config", "/etc/carbontrip.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/carbontrip.toml")));

        let cli = Cli::try_parse_from(["carbontrip", "-c", "local.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("local.toml")));
    }

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["carbontrip"]).unwrap();
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_config_flag_needs_a_path() {
        assert!(Cli::try_parse_from(["carbontrip", "--config"]).is_err());
        assert!(Cli::try_parse_from(["carbontrip", "serve"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
