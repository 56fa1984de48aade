use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

/// Named secrets loaded from a JSON file of string pairs. Consulted only
/// when the matching environment variable is absent.
#[derive(Debug, Default)]
pub struct Secrets(HashMap<String, String>);

impl Secrets {
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Self(map),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "secrets file unreadable; ignoring");
                Self::default()
            }
        }
    }

    /// Environment first, secrets file second.
    pub fn resolve(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().or_else(|| self.0.get(key).cloned())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub pg_host: String,
    pub pg_database: String,
    pub pg_user: String,
    pub pg_password: String,
    pub document_path: String,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secrets_path =
            std::env::var("SECRETS_FILE").unwrap_or_else(|_| ".secrets.json".into());
        let secrets = Secrets::load(Path::new(&secrets_path));

        let require = |key: &str| {
            secrets
                .resolve(key)
                .with_context(|| format!("{key} not set in environment or secrets file"))
        };

        let session = SessionConfig {
            secret: require("SESSION_SECRET")?,
            issuer: secrets
                .resolve("SESSION_ISSUER")
                .unwrap_or_else(|| "ilssak".into()),
            audience: secrets
                .resolve("SESSION_AUDIENCE")
                .unwrap_or_else(|| "ilssak-streamers".into()),
            ttl_minutes: secrets
                .resolve("SESSION_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(12 * 60),
        };

        Ok(Self {
            pg_host: require("PG_HOST")?,
            pg_database: require("PG_DATABASE")?,
            pg_user: require("PG_USER")?,
            pg_password: require("PG_PASSWORD")?,
            document_path: secrets
                .resolve("DOCUMENT_PATH")
                .unwrap_or_else(|| "docs/document.md".into()),
            session,
        })
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}/{}",
            self.pg_user, self.pg_password, self.pg_host, self.pg_database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_environment_over_file() {
        let mut map = HashMap::new();
        map.insert("ILSSAK_RESOLVE_TEST".to_string(), "from-file".to_string());
        let secrets = Secrets(map);

        std::env::set_var("ILSSAK_RESOLVE_TEST", "from-env");
        assert_eq!(
            secrets.resolve("ILSSAK_RESOLVE_TEST").as_deref(),
            Some("from-env")
        );
        std::env::remove_var("ILSSAK_RESOLVE_TEST");
        assert_eq!(
            secrets.resolve("ILSSAK_RESOLVE_TEST").as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn resolve_returns_none_when_unset_everywhere() {
        let secrets = Secrets::default();
        assert_eq!(secrets.resolve("ILSSAK_MISSING_TEST"), None);
    }

    #[test]
    fn load_missing_file_yields_empty_secrets() {
        let secrets = Secrets::load(Path::new("/nonexistent/.secrets.json"));
        assert_eq!(secrets.resolve("ANYTHING"), None);
    }

    #[test]
    fn database_url_is_assembled_from_parts() {
        let config = AppConfig {
            pg_host: "db.local".into(),
            pg_database: "ilssak".into(),
            pg_user: "app".into(),
            pg_password: "pw".into(),
            document_path: "docs/document.md".into(),
            session: SessionConfig {
                secret: "s".into(),
                issuer: "i".into(),
                audience: "a".into(),
                ttl_minutes: 5,
            },
        };
        assert_eq!(config.database_url(), "postgres://app:pw@db.local/ilssak");
    }
}
