//! Configuration loaded from environment variables.
//!
//! Every knob has a default so the bot boots in a dev environment with
//! nothing set; missing partner credentials degrade the relevant client
//! (Safra auth fails, Z-API sends fail) instead of blocking startup.
//! `/health` reports which credential sets are present.

use secrecy::{ExposeSecret, SecretString};

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub safra: SafraConfig,
    pub zapi: ZapiConfig,
}

/// HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Local database location.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Credentials and endpoint for the Safra correspondent API.
#[derive(Debug, Clone)]
pub struct SafraConfig {
    pub base_url: String,
    pub username: String,
    pub password: SecretString,
}

impl SafraConfig {
    /// Whether both credential halves are present.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.expose_secret().is_empty()
    }
}

/// Credentials and endpoint for the Z-API WhatsApp gateway.
#[derive(Debug, Clone)]
pub struct ZapiConfig {
    pub base_url: String,
    pub instance_id: Option<String>,
    pub token: Option<SecretString>,
    /// Extra account-level token some Z-API plans require.
    pub client_token: Option<SecretString>,
}

impl ZapiConfig {
    /// Whether the instance id and token are both set.
    pub fn has_credentials(&self) -> bool {
        self.instance_id.is_some() && self.token.is_some()
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port,
            },
            database: DatabaseConfig {
                path: env_or("REFIN_BOT_DB_PATH", "./data/refin-bot.db"),
            },
            safra: SafraConfig {
                base_url: env_or(
                    "SAFRA_BASE_URL",
                    "https://api.safrafinanceira.com.br/apl-api-correspondente/api/v1",
                ),
                username: env_or("SAFRA_USERNAME", ""),
                password: SecretString::from(env_or("SAFRA_PASSWORD", "")),
            },
            zapi: ZapiConfig {
                base_url: env_or("ZAPI_BASE_URL", "https://api.z-api.io"),
                instance_id: non_empty(std::env::var("ZAPI_INSTANCE_ID").ok()),
                token: non_empty(std::env::var("ZAPI_TOKEN").ok()).map(SecretString::from),
                client_token: non_empty(std::env::var("ZAPI_CLIENT_TOKEN").ok())
                    .map(SecretString::from),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safra_credentials_require_both_halves() {
        let mut cfg = SafraConfig {
            base_url: "https://example.com".into(),
            username: String::new(),
            password: SecretString::from(""),
        };
        assert!(!cfg.has_credentials());

        cfg.username = "user".into();
        assert!(!cfg.has_credentials());

        cfg.password = SecretString::from("pass");
        assert!(cfg.has_credentials());
    }

    #[test]
    fn zapi_credentials_require_instance_and_token() {
        let mut cfg = ZapiConfig {
            base_url: "https://api.z-api.io".into(),
            instance_id: None,
            token: None,
            client_token: None,
        };
        assert!(!cfg.has_credentials());

        cfg.instance_id = Some("inst".into());
        assert!(!cfg.has_credentials());

        cfg.token = Some(SecretString::from("tok"));
        assert!(cfg.has_credentials());
    }

    #[test]
    fn non_empty_filters_blank_values() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("x".into())), Some("x".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
