use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sigbox_core::StoreConfig;
use sigbox_trust::TrustConfig;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sigbox",
    version,
    about = "Signed zip containers over HTTP: create, list, sign and delete signatures"
)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "SIGBOX_BIND", default_value = "0.0.0.0:1234")]
    pub bind: SocketAddr,

    /// Directory holding <name>.zip containers
    #[arg(long, env = "SIGBOX_CONTAINERS_DIR", default_value = "containers")]
    pub containers_dir: PathBuf,

    /// Directory compressed into every new container
    #[arg(long, env = "SIGBOX_SOURCE_DIR", default_value = "files")]
    pub source_dir: PathBuf,

    /// Signing service base URL
    #[arg(long, env = "SIGBOX_AGGREGATOR_URL")]
    pub aggregator_url: Option<String>,

    #[arg(long, env = "SIGBOX_LOGIN_ID")]
    pub login_id: Option<String>,

    #[arg(long, env = "SIGBOX_LOGIN_KEY", hide_env_values = true)]
    pub login_key: Option<String>,

    /// Upper bound on one signing call, in seconds
    #[arg(long, env = "SIGBOX_SIGN_TIMEOUT", default_value_t = 30)]
    pub sign_timeout: u64,

    /// Sign with an in-process authority of this name instead of the network service
    #[arg(long, value_name = "NAME")]
    pub local_authority: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Args {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_containers_dir(&self.containers_dir)
            .with_source_dir(&self.source_dir)
            .with_sign_timeout_secs(self.sign_timeout)
    }

    /// Trust config from the environment, overridden by explicit flags.
    pub fn trust_config(&self) -> TrustConfig {
        let mut config = TrustConfig::from_env();
        if let Some(url) = &self.aggregator_url {
            config = config.with_url(url);
        }
        config.login_id = self.login_id.clone().or(config.login_id);
        config.login_key = self.login_key.clone().or(config.login_key);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sigbox"]).unwrap();
        assert_eq!(args.bind.port(), 1234);
        assert_eq!(args.log_format, LogFormat::Text);
        assert!(args.local_authority.is_none());
    }

    #[test]
    fn test_flags_flow_into_configs() {
        let args = Args::try_parse_from([
            "sigbox",
            "--containers-dir",
            "/srv/boxes",
            "--sign-timeout",
            "5",
            "--aggregator-url",
            "https://signer.test",
            "--login-id",
            "svc",
            "--login-key",
            "secret",
            "--log-format",
            "json",
        ])
        .unwrap();

        let store = args.store_config();
        assert_eq!(store.containers_dir, PathBuf::from("/srv/boxes"));
        assert_eq!(store.sign_timeout_secs, 5);

        let trust = args.trust_config();
        assert_eq!(trust.url, "https://signer.test");
        assert_eq!(trust.login_id.as_deref(), Some("svc"));
        assert_eq!(trust.login_key.as_deref(), Some("secret"));
        assert_eq!(args.log_format, LogFormat::Json);
    }
}
