use std::path::PathBuf;

use clap::Parser;
use orderlink_core::config::{ConfigOverrides, LoadOptions, RelayMode};

#[derive(Debug, Parser)]
#[command(
    name = "orderlink-server",
    about = "Serve the order relay over A2A-style JSON-RPC",
    after_help = "Examples:\n  orderlink-server\n  \
                  orderlink-server --mode proxy --peer-url http://127.0.0.1:9000"
)]
pub struct Args {
    #[arg(long, help = "Config file; must exist when given")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind_address: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long, help = "URL advertised in the capability descriptor")]
    pub public_url: Option<String>,
    #[arg(long, help = "fulfiller or proxy")]
    pub mode: Option<RelayMode>,
    #[arg(long, help = "Peer the proxy forwards to")]
    pub peer_url: Option<String>,
    #[arg(long)]
    pub catalog_url: Option<String>,
    #[arg(long)]
    pub fulfillment_url: Option<String>,
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    pub fn load_options(self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config,
            overrides: ConfigOverrides {
                bind_address: self.bind_address,
                port: self.port,
                public_url: self.public_url,
                log_level: self.log_level,
                relay_mode: self.mode,
                peer_url: self.peer_url,
                catalog_url: self.catalog_url,
                fulfillment_url: self.fulfillment_url,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use orderlink_core::config::RelayMode;

    use crate::cli::Args;

    #[test]
    fn flags_become_config_overrides() {
        let args = Args::try_parse_from([
            "orderlink-server",
            "--port",
            "9100",
            "--mode",
            "proxy",
            "--peer-url",
            "http://127.0.0.1:9000",
        ])
        .expect("valid flags");

        let options = args.load_options();

        assert!(!options.require_file);
        assert_eq!(options.overrides.port, Some(9100));
        assert_eq!(options.overrides.relay_mode, Some(RelayMode::Proxy));
        assert_eq!(options.overrides.peer_url.as_deref(), Some("http://127.0.0.1:9000"));
    }

    #[test]
    fn explicit_config_path_is_required_to_exist() {
        let args = Args::try_parse_from(["orderlink-server", "--config", "relay.toml"])
            .expect("valid flags");

        let options = args.load_options();

        assert!(options.require_file);
        assert_eq!(options.config_path.as_deref(), Some(std::path::Path::new("relay.toml")));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Args::try_parse_from(["orderlink-server", "--mode", "broker"]).is_err());
    }
}
