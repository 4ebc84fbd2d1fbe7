//! Process configuration, read from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use secrecy::SecretString;

use aluguetudo_gateway::HttpBackendConfig;
use aluguetudo_portal::{BootstrapCredentials, ProvisioningConfig};

const DEV_JWT_SECRET: &str = "dev-secret";

/// Which backend the API talks to.
#[derive(Debug)]
pub enum BackendConfig {
    /// In-process backend; data lives as long as the process.
    InMemory,
    Http(HttpBackendConfig),
}

#[derive(Debug)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: SecretString,
    /// Lifetime of portal-issued bearer tokens.
    pub session_ttl: chrono::Duration,
    pub backend: BackendConfig,
    pub provisioning: ProvisioningConfig,
    pub bootstrap: BootstrapCredentials,
}

impl ApiConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (key → value).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address (host:port)")?;

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let session_ttl = session_ttl(parse_number(
            var("SESSION_TTL_MINUTES"),
            "SESSION_TTL_MINUTES",
            60,
        )?)?;

        let backend = match (var("BACKEND_URL"), var("BACKEND_ANON_KEY")) {
            (Some(base_url), Some(anon_key)) => BackendConfig::Http(HttpBackendConfig {
                base_url,
                anon_key: SecretString::from(anon_key),
            }),
            (Some(_), None) => bail!("BACKEND_URL is set but BACKEND_ANON_KEY is missing"),
            (None, _) => {
                tracing::warn!("BACKEND_URL not set; using in-memory backend");
                BackendConfig::InMemory
            }
        };

        let provisioning = ProvisioningConfig {
            signup_fallback: parse_bool(var("PROVISION_SIGNUP_FALLBACK"), "PROVISION_SIGNUP_FALLBACK", false)?,
            redirect_delay: Duration::from_millis(parse_number(
                var("REAUTH_REDIRECT_DELAY_MS"),
                "REAUTH_REDIRECT_DELAY_MS",
                2000,
            )?),
            email_redirect_to: var("SIGNUP_REDIRECT_URL"),
        };

        let bootstrap = BootstrapCredentials {
            email: var("BOOTSTRAP_ADMIN_EMAIL").unwrap_or_else(|| "admin@aluguetudo.com".to_string()),
            password: SecretString::from(
                var("BOOTSTRAP_ADMIN_PASSWORD").unwrap_or_else(|| "admin123".to_string()),
            ),
        };

        Ok(Self {
            bind_addr,
            jwt_secret: SecretString::from(jwt_secret),
            session_ttl,
            backend,
            provisioning,
            bootstrap,
        })
    }

    /// Defaults with the in-memory backend and the given signing secret.
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: SecretString::from(jwt_secret.to_string()),
            session_ttl: chrono::Duration::minutes(60),
            backend: BackendConfig::InMemory,
            provisioning: ProvisioningConfig::default(),
            bootstrap: BootstrapCredentials {
                email: "admin@aluguetudo.com".to_string(),
                password: SecretString::from("admin123".to_string()),
            },
        }
    }
}

fn parse_number(value: Option<String>, key: &str, default: u64) -> anyhow::Result<u64> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer, got {v:?}")),
    }
}

/// Token lifetime from a minute count; the resulting expiry must be representable.
fn session_ttl(minutes: u64) -> anyhow::Result<chrono::Duration> {
    if minutes == 0 {
        bail!("SESSION_TTL_MINUTES must be greater than zero");
    }
    let ttl = i64::try_from(minutes)
        .ok()
        .and_then(chrono::Duration::try_minutes)
        .filter(|ttl| chrono::Utc::now().checked_add_signed(*ttl).is_some());
    match ttl {
        Some(ttl) => Ok(ttl),
        None => bail!("SESSION_TTL_MINUTES is out of range, got {minutes}"),
    }
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("{key} must be a boolean, got {other:?}"),
    }
}
