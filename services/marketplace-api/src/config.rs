use anyhow::{Context, Result, bail};
use marketplace_throttle::PolicyOverride;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

// Marketplace API configuration sourced from environment variables, with an
// optional YAML file layered on top.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub trust_forwarded_for: bool,
    pub auth_guard: String,
    pub rate_limit_sweep: Duration,
    pub rate_limits: BTreeMap<String, PolicyOverride>,
    pub bootstrap: BootstrapConfig,
    pub log_json: bool,
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub enabled: bool,
    pub bind_addr: SocketAddr,
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MarketplaceConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    trust_forwarded_for: Option<bool>,
    auth_guard: Option<String>,
    rate_limit_sweep_secs: Option<u64>,
    #[serde(default)]
    rate_limits: BTreeMap<String, PolicyOverride>,
    bootstrap: Option<BootstrapConfigOverride>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BootstrapConfigOverride {
    enabled: Option<bool>,
    bind_addr: Option<String>,
    token: Option<String>,
}

fn env_addr(name: &str, default: &str) -> Result<SocketAddr> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("parse {name}"))
}

fn env_flag(name: &str) -> Result<bool> {
    match std::env::var(name) {
        Err(_) => Ok(false),
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "" | "0" | "false" | "no" | "off" => Ok(false),
            other => bail!("parse {name}: expected a boolean, got {other:?}"),
        },
    }
}

impl MarketplaceConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_addr("MARKETPLACE_API_BIND", "0.0.0.0:8000")?;
        let metrics_bind = env_addr("MARKETPLACE_METRICS_BIND", "0.0.0.0:9100")?;
        let trust_forwarded_for = env_flag("MARKETPLACE_TRUST_FORWARDED_FOR")?;
        let auth_guard =
            std::env::var("MARKETPLACE_AUTH_GUARD").unwrap_or_else(|_| "api".to_string());
        let sweep_secs: u64 = std::env::var("MARKETPLACE_RATE_LIMIT_SWEEP_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .with_context(|| "parse MARKETPLACE_RATE_LIMIT_SWEEP_SECS")?;
        let bootstrap = BootstrapConfig {
            enabled: env_flag("MARKETPLACE_BOOTSTRAP_ENABLED")?,
            bind_addr: env_addr("MARKETPLACE_BOOTSTRAP_BIND", "127.0.0.1:8001")?,
            token: std::env::var("MARKETPLACE_BOOTSTRAP_TOKEN")
                .ok()
                .filter(|token| !token.is_empty()),
        };
        let config = Self {
            bind_addr,
            metrics_bind,
            trust_forwarded_for,
            auth_guard,
            rate_limit_sweep: Duration::from_secs(sweep_secs),
            rate_limits: BTreeMap::new(),
            bootstrap,
            log_json: env_flag("MARKETPLACE_LOG_JSON")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("MARKETPLACE_API_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read MARKETPLACE_API_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: MarketplaceConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse marketplace config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.trust_forwarded_for {
            self.trust_forwarded_for = value;
        }
        if let Some(value) = override_cfg.auth_guard {
            self.auth_guard = value;
        }
        if let Some(value) = override_cfg.rate_limit_sweep_secs {
            self.rate_limit_sweep = Duration::from_secs(value);
        }
        self.rate_limits.extend(override_cfg.rate_limits);
        if let Some(bootstrap) = override_cfg.bootstrap {
            if let Some(value) = bootstrap.enabled {
                self.bootstrap.enabled = value;
            }
            if let Some(value) = bootstrap.bind_addr {
                self.bootstrap.bind_addr =
                    value.parse().with_context(|| "parse bootstrap.bind_addr")?;
            }
            if let Some(value) = bootstrap.token {
                self.bootstrap.token = Some(value);
            }
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.auth_guard.trim().is_empty() {
            bail!("auth guard must not be empty");
        }
        if self.rate_limit_sweep.is_zero() {
            bail!("rate limit sweep interval must be greater than zero");
        }
        if self.bootstrap.enabled && self.bootstrap.token.is_none() {
            bail!("bootstrap is enabled but MARKETPLACE_BOOTSTRAP_TOKEN is not set");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketplace_throttle::KeySource;
    use serial_test::serial;

    const VARS: [&str; 10] = [
        "MARKETPLACE_API_BIND",
        "MARKETPLACE_METRICS_BIND",
        "MARKETPLACE_TRUST_FORWARDED_FOR",
        "MARKETPLACE_AUTH_GUARD",
        "MARKETPLACE_RATE_LIMIT_SWEEP_SECS",
        "MARKETPLACE_BOOTSTRAP_ENABLED",
        "MARKETPLACE_BOOTSTRAP_BIND",
        "MARKETPLACE_BOOTSTRAP_TOKEN",
        "MARKETPLACE_LOG_JSON",
        "MARKETPLACE_API_CONFIG",
    ];

    fn clear_env() {
        for name in VARS {
            unsafe { std::env::remove_var(name) };
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        clear_env();
        let config = MarketplaceConfig::from_env().expect("config");
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().expect("addr"));
        assert_eq!(config.metrics_bind, "0.0.0.0:9100".parse().expect("addr"));
        assert!(!config.trust_forwarded_for);
        assert_eq!(config.auth_guard, "api");
        assert_eq!(config.rate_limit_sweep, Duration::from_secs(60));
        assert!(!config.bootstrap.enabled);
        assert_eq!(
            config.bootstrap.bind_addr,
            "127.0.0.1:8001".parse().expect("addr")
        );
        assert!(config.rate_limits.is_empty());
    }

    #[test]
    #[serial]
    fn env_values_are_parsed() {
        clear_env();
        unsafe {
            std::env::set_var("MARKETPLACE_API_BIND", "127.0.0.1:9000");
            std::env::set_var("MARKETPLACE_TRUST_FORWARDED_FOR", "true");
            std::env::set_var("MARKETPLACE_RATE_LIMIT_SWEEP_SECS", "15");
            std::env::set_var("MARKETPLACE_BOOTSTRAP_ENABLED", "1");
            std::env::set_var("MARKETPLACE_BOOTSTRAP_TOKEN", "secret");
        }
        let config = MarketplaceConfig::from_env().expect("config");
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().expect("addr"));
        assert!(config.trust_forwarded_for);
        assert_eq!(config.rate_limit_sweep, Duration::from_secs(15));
        assert!(config.bootstrap.enabled);
        assert_eq!(config.bootstrap.token.as_deref(), Some("secret"));
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_env_values_are_errors() {
        clear_env();
        unsafe { std::env::set_var("MARKETPLACE_API_BIND", "not-an-addr") };
        let err = MarketplaceConfig::from_env().expect_err("bad bind");
        assert!(err.to_string().contains("MARKETPLACE_API_BIND"));

        clear_env();
        unsafe { std::env::set_var("MARKETPLACE_TRUST_FORWARDED_FOR", "maybe") };
        assert!(MarketplaceConfig::from_env().is_err());

        clear_env();
        unsafe { std::env::set_var("MARKETPLACE_BOOTSTRAP_ENABLED", "true") };
        let err = MarketplaceConfig::from_env().expect_err("missing token");
        assert!(err.to_string().contains("MARKETPLACE_BOOTSTRAP_TOKEN"));
        clear_env();
    }

    #[test]
    #[serial]
    fn yaml_overrides_env_and_carries_rate_limits() {
        clear_env();
        let mut config = MarketplaceConfig::from_env().expect("config");
        config
            .apply_yaml(
                r#"
bind_addr: "127.0.0.1:7000"
auth_guard: web
rate_limits:
  search:
    max_requests: 100
  otp:
    window_seconds: 300
    key_source: address
bootstrap:
  enabled: true
  token: from-yaml
"#,
            )
            .expect("yaml");
        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse().expect("addr"));
        assert_eq!(config.auth_guard, "web");
        assert_eq!(config.rate_limits["search"].max_requests, Some(100));
        assert_eq!(config.rate_limits["otp"].window_seconds, Some(300));
        assert_eq!(
            config.rate_limits["otp"].key_source,
            Some(KeySource::Address)
        );
        assert!(config.bootstrap.enabled);
        assert_eq!(config.bootstrap.token.as_deref(), Some("from-yaml"));
    }

    #[test]
    #[serial]
    fn yaml_rejects_unknown_keys() {
        clear_env();
        let mut config = MarketplaceConfig::from_env().expect("config");
        assert!(config.apply_yaml("bind_adr: \"127.0.0.1:1\"").is_err());
    }

    #[test]
    #[serial]
    fn yaml_file_is_read_from_env_path() {
        clear_env();
        let path = std::env::temp_dir().join(format!(
            "marketplace-config-{}.yaml",
            std::process::id()
        ));
        fs::write(&path, "metrics_bind: \"127.0.0.1:9999\"\n").expect("write");
        unsafe { std::env::set_var("MARKETPLACE_API_CONFIG", &path) };
        let config = MarketplaceConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.metrics_bind, "127.0.0.1:9999".parse().expect("addr"));
        clear_env();
        let _ = fs::remove_file(path);
    }
}
