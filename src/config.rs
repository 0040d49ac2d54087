use crate::content::ContentVariant;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Default upper bound for uploaded import files.
pub const DEFAULT_IMPORT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the catalog server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Service credential accepted as `Authorization: Bearer <key>`.
    pub payload_api_key: Option<String>,
    /// Application secret. Only its presence is ever reported.
    pub payload_secret: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Base URL of the Qdrant instance; `None` selects the in-memory index.
    pub qdrant_url: Option<String>,
    /// Name of the Qdrant collection holding search projections.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Dimensionality of the vectors stored with each projection.
    pub search_vector_dimension: usize,
    /// Content variants that are projected into the search index.
    pub searchable_collections: Vec<ContentVariant>,
    /// Largest accepted multipart body for `/api/import`.
    pub import_max_bytes: usize,
    /// Email of an admin user seeded at startup.
    pub admin_email: Option<String>,
    /// API key for the seeded admin user.
    pub admin_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let admin_email = optional("ADMIN_EMAIL");
        let admin_api_key = optional("ADMIN_API_KEY");
        if admin_email.is_some() != admin_api_key.is_some() {
            let missing = if admin_email.is_some() {
                "ADMIN_API_KEY"
            } else {
                "ADMIN_EMAIL"
            };
            return Err(ConfigError::MissingVariable(missing.to_string()));
        }

        Ok(Self {
            payload_api_key: optional("PAYLOAD_API_KEY"),
            payload_secret: optional("PAYLOAD_SECRET"),
            server_port: parse_optional(optional("SERVER_PORT"), "SERVER_PORT")?,
            qdrant_url: optional("QDRANT_URL"),
            qdrant_collection_name: optional("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| "search".to_string()),
            qdrant_api_key: optional("QDRANT_API_KEY"),
            search_vector_dimension: parse_optional(
                optional("SEARCH_VECTOR_DIMENSION"),
                "SEARCH_VECTOR_DIMENSION",
            )?
            .filter(|dimension| *dimension > 0)
            .unwrap_or(256),
            searchable_collections: match optional("SEARCH_COLLECTIONS") {
                Some(raw) => parse_variants(&raw)?,
                None => ContentVariant::ALL.to_vec(),
            },
            import_max_bytes: parse_optional(optional("IMPORT_MAX_BYTES"), "IMPORT_MAX_BYTES")?
                .unwrap_or(DEFAULT_IMPORT_MAX_BYTES),
            admin_email,
            admin_api_key,
        })
    }
}

fn parse_optional<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_variants(raw: &str) -> Result<Vec<ContentVariant>, ConfigError> {
    let mut variants = Vec::new();
    for slug in raw.split(',').map(str::trim).filter(|slug| !slug.is_empty()) {
        let variant = ContentVariant::from_slug(slug)
            .ok_or_else(|| ConfigError::InvalidValue(format!("SEARCH_COLLECTIONS ({slug})")))?;
        if !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    Ok(variants)
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment (and `.env`) and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        qdrant_url = ?config.qdrant_url,
        collection = %config.qdrant_collection_name,
        server_port = ?config.server_port,
        searchable = ?config.searchable_collections,
        has_api_key = config.payload_api_key.is_some(),
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert!(config.payload_api_key.is_none());
        assert!(config.qdrant_url.is_none());
        assert_eq!(config.qdrant_collection_name, "search");
        assert_eq!(config.search_vector_dimension, 256);
        assert_eq!(config.searchable_collections, ContentVariant::ALL.to_vec());
        assert_eq!(config.import_max_bytes, DEFAULT_IMPORT_MAX_BYTES);
    }

    #[test]
    fn parses_overrides() {
        let config = load(&[
            ("PAYLOAD_API_KEY", "k"),
            ("SERVER_PORT", "4000"),
            ("SEARCH_COLLECTIONS", "tags, videos,tags"),
            ("IMPORT_MAX_BYTES", "1024"),
            ("PAYLOAD_SECRET", "   "),
        ])
        .unwrap();
        assert_eq!(config.payload_api_key.as_deref(), Some("k"));
        assert_eq!(config.server_port, Some(4000));
        assert_eq!(
            config.searchable_collections,
            vec![ContentVariant::Tag, ContentVariant::Video]
        );
        assert_eq!(config.import_max_bytes, 1024);
        assert!(config.payload_secret.is_none());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            load(&[("SERVER_PORT", "http")]),
            Err(ConfigError::InvalidValue(key)) if key == "SERVER_PORT"
        ));
        assert!(matches!(
            load(&[("SEARCH_COLLECTIONS", "videos,media")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("ADMIN_EMAIL", "a@b.c")]),
            Err(ConfigError::MissingVariable(key)) if key == "ADMIN_API_KEY"
        ));
    }
}
