//! Process configuration: CLI flags layered over environment variables
//! layered over defaults, via `clap` + `ortho_config`.

use clap::Args;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::session::{DEFAULT_ABSOLUTE_LIFETIME, DEFAULT_CLEANUP_INTERVAL, DEFAULT_SESSION_DURATION};

fn default_bind() -> String { "0.0.0.0:6500".to_owned() }

/// Runtime configuration for the `nexusd` binary.
///
/// Resolved in precedence order: CLI flags, then `NEXUSD_`-prefixed
/// environment variables, then an optional dotfile, then these defaults —
/// the standard layering `ortho_config` gives any `OrthoConfig` struct.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "NEXUSD_")]
pub struct AppConfig {
    /// The `host:port` the connection server listens on.
    #[ortho_config(default = default_bind())]
    #[arg(long, default_value_t = default_bind())]
    pub bind: String,

    /// Default per-session validity window, in seconds, when a caller omits
    /// one.
    #[ortho_config(default = DEFAULT_SESSION_DURATION.as_secs())]
    #[arg(long, default_value_t = DEFAULT_SESSION_DURATION.as_secs())]
    pub session_duration_secs: u64,

    /// Absolute session lifetime cap, in seconds, regardless of refreshes.
    #[ortho_config(default = DEFAULT_ABSOLUTE_LIFETIME.as_secs())]
    #[arg(long, default_value_t = DEFAULT_ABSOLUTE_LIFETIME.as_secs())]
    pub session_lifetime_secs: u64,

    /// How often, in seconds, the session sweeper runs.
    #[ortho_config(default = DEFAULT_CLEANUP_INTERVAL.as_secs())]
    #[arg(long, default_value_t = DEFAULT_CLEANUP_INTERVAL.as_secs())]
    pub cleanup_interval_secs: u64,
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn env_config_loading() {
        Jail::expect_with(|jail| {
            jail.set_env("NEXUSD_BIND", "127.0.0.1:8000");
            let cfg = AppConfig::load_from_iter(["nexusd"]).expect("load");
            assert_eq!(cfg.bind, "127.0.0.1:8000");
            Ok(())
        });
    }

    #[test]
    fn cli_overrides_env() {
        Jail::expect_with(|jail| {
            jail.set_env("NEXUSD_BIND", "127.0.0.1:8000");
            let cfg = AppConfig::load_from_iter(["nexusd", "--bind", "0.0.0.0:9000"]).expect("load");
            assert_eq!(cfg.bind, "0.0.0.0:9000");
            Ok(())
        });
    }

    #[test]
    fn defaults_when_unset() {
        Jail::expect_with(|_jail| {
            let cfg = AppConfig::load_from_iter(["nexusd"]).expect("load");
            assert_eq!(cfg.bind, default_bind());
            assert_eq!(cfg.session_duration_secs, DEFAULT_SESSION_DURATION.as_secs());
            Ok(())
        });
    }

    #[test]
    fn loads_from_dotfile() {
        Jail::expect_with(|jail| {
            jail.create_file(".nexusd.toml", "bind = \"1.2.3.4:1111\"")?;
            let cfg = AppConfig::load_from_iter(["nexusd"]).expect("load");
            assert_eq!(cfg.bind, "1.2.3.4:1111");
            Ok(())
        });
    }
}
