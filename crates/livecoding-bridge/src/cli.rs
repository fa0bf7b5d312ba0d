//! Command line and tracing setup

use std::{net::IpAddr, path::PathBuf};

use anyhow::Result;
use clap::{value_parser, Arg, ArgMatches, Command};
use livecoding_core::{BridgeConfig, DiagnosticsLayer, DiagnosticsSink};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn build_cli() -> Command {
    Command::new("livecoding-bridge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("HTTP trigger for single-flight live coding compiles")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Config file (default: .livecoding/config.toml, then the user config dir)"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("PORT")
                .value_parser(value_parser!(u16).range(1..))
                .help("Port to listen on"),
        )
        .arg(
            Arg::new("route")
                .long("route")
                .value_name("PATH")
                .help("Trigger route"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .value_parser(value_parser!(IpAddr))
                .help("Address to bind"),
        )
}

/// Values given on the command line; each one beats file and environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub port: Option<u16>,
    pub route: Option<String>,
    pub bind: Option<IpAddr>,
}

impl CliArgs {
    #[must_use]
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config: matches.get_one::<PathBuf>("config").cloned(),
            port: matches.get_one::<u16>("port").copied(),
            route: matches.get_one::<String>("route").cloned(),
            bind: matches.get_one::<IpAddr>("bind").copied(),
        }
    }

    /// Apply overrides and re-validate
    ///
    /// # Errors
    ///
    /// Returns an error if the overridden config no longer validates
    pub fn apply(&self, config: &mut BridgeConfig) -> Result<()> {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(route) = &self.route {
            config.server.route.clone_from(route);
        }
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        config.validate()?;
        Ok(())
    }
}

/// Initialize tracing: stderr output filtered by `RUST_LOG` (INFO by
/// default) plus an unfiltered layer feeding `sink`.
///
/// The console filter never hides records from the sink, so compiler output
/// reaches the log window at any verbosity.
///
/// # Errors
/// Returns an error if a global subscriber is already set
pub fn init_tracing(sink: &DiagnosticsSink) -> Result<()> {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()));

    tracing_subscriber::registry()
        .with(console)
        .with(DiagnosticsLayer::new(sink.clone()))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_overrides() {
        let matches = build_cli()
            .try_get_matches_from(["livecoding-bridge", "--port", "9001", "--route", "hot", "--bind", "0.0.0.0"])
            .unwrap();
        let args = CliArgs::from_matches(&matches);

        assert_eq!(args.port, Some(9001));
        assert_eq!(args.route.as_deref(), Some("hot"));
        assert_eq!(args.bind, Some("0.0.0.0".parse().unwrap()));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_port_zero_rejected_by_parser() {
        let parsed = build_cli().try_get_matches_from(["livecoding-bridge", "--port", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_apply_normalizes_route() -> Result<()> {
        let mut config = BridgeConfig::default();
        let args = CliArgs {
            route: Some("hot/".to_string()),
            ..CliArgs::default()
        };
        args.apply(&mut config)?;
        assert_eq!(config.server.route, "/hot");
        Ok(())
    }

    #[test]
    fn test_apply_without_overrides_keeps_config() -> Result<()> {
        let mut config = BridgeConfig::default();
        CliArgs::default().apply(&mut config)?;
        assert_eq!(config, BridgeConfig::default());
        Ok(())
    }
}
