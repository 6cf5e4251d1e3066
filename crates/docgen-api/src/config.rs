use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
pub const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key-change-this-in-production",
];

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub templates_dir: PathBuf,
    pub frontend_dir: Option<PathBuf>,
    pub smtp: SmtpConfig,
}

impl Config {
    /// Read `DOCGEN_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port: u16 = var("DOCGEN_PORT", "8001")
            .parse()
            .context("DOCGEN_PORT must be a port number")?;
        let ttl_hours: i64 = var("DOCGEN_TOKEN_TTL_HOURS", "24")
            .parse()
            .context("DOCGEN_TOKEN_TTL_HOURS must be a whole number of hours")?;
        if ttl_hours <= 0 {
            bail!("DOCGEN_TOKEN_TTL_HOURS must be positive");
        }
        let smtp_port: u16 = var("DOCGEN_SMTP_PORT", "587")
            .parse()
            .context("DOCGEN_SMTP_PORT must be a port number")?;

        let smtp_user = var("DOCGEN_SMTP_USER", "");
        let smtp = SmtpConfig {
            host: var("DOCGEN_SMTP_HOST", "smtp.gmail.com"),
            port: smtp_port,
            from: var("DOCGEN_SMTP_FROM", &smtp_user),
            password: var("DOCGEN_SMTP_PASS", ""),
            username: smtp_user,
        };

        Ok(Self {
            jwt_secret: var("DOCGEN_JWT_SECRET", ""),
            token_ttl: chrono::Duration::hours(ttl_hours),
            db_path: var("DOCGEN_DB_PATH", "docgen.db").into(),
            host: var("DOCGEN_HOST", "0.0.0.0"),
            port,
            templates_dir: var("DOCGEN_TEMPLATES_DIR", "templates").into(),
            frontend_dir: lookup("DOCGEN_FRONTEND_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            smtp,
        })
    }

    /// Fails when the JWT secret is unset or still a known placeholder.
    pub fn ensure_secret(&self) -> Result<()> {
        if self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str()) {
            bail!("DOCGEN_JWT_SECRET is unset or still a placeholder");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8001);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.db_path, PathBuf::from("docgen.db"));
        assert_eq!(cfg.token_ttl, chrono::Duration::hours(24));
        assert_eq!(cfg.smtp.host, "smtp.gmail.com");
        assert_eq!(cfg.smtp.port, 587);
        assert!(!cfg.smtp.is_configured());
        assert!(cfg.frontend_dir.is_none());
        assert!(cfg.ensure_secret().is_err());
    }

    #[test]
    fn sender_defaults_to_smtp_user() {
        let cfg = config(&[
            ("DOCGEN_SMTP_USER", "bot@example.com"),
            ("DOCGEN_SMTP_PASS", "app-password"),
            ("DOCGEN_JWT_SECRET", "8c1f0e8a9d"),
        ])
        .unwrap();
        assert_eq!(cfg.smtp.from, "bot@example.com");
        assert!(cfg.smtp.is_configured());
        assert!(cfg.ensure_secret().is_ok());
    }

    #[test]
    fn rejects_placeholder_secret_and_bad_numbers() {
        let cfg = config(&[("DOCGEN_JWT_SECRET", "dev-secret-change-me")]).unwrap();
        assert!(cfg.ensure_secret().is_err());

        assert!(config(&[("DOCGEN_PORT", "http")]).is_err());
        assert!(config(&[("DOCGEN_TOKEN_TTL_HOURS", "0")]).is_err());
    }
}
