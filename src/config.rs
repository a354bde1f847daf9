//! Runtime configuration for the licensing server.
//!
//! Settings arrive as environment variables (optionally via a `.env` file)
//! and are deserialized into [`Config`] with `envy`. Only the database
//! connection string is mandatory; everything else has a deploy-friendly
//! default.

use serde::Deserialize;

/// Settings the server needs before it can accept validation traffic.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string for the key,
///   installation and audit stores
/// - `BIND_ADDRESS` (optional): interface to listen on, defaults to `0.0.0.0`
/// - `SERVER_PORT` (optional): HTTP port, defaults to 3000
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub server_port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is honored when present and
    /// silently skipped otherwise, so local runs and containerized deploys
    /// share one code path.
    ///
    /// # Errors
    ///
    /// Returns an error when `DATABASE_URL` is missing or any value fails to
    /// parse into its field type (e.g. a non-numeric `SERVER_PORT`).
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_environment_gets_defaults() {
        let config: Config = envy::from_iter(vec![(
            "DATABASE_URL".to_string(),
            "postgres://localhost/license_gate".to_string(),
        )])
        .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config: Config = envy::from_iter(vec![
            (
                "DATABASE_URL".to_string(),
                "postgres://localhost/license_gate".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1".to_string()),
            ("SERVER_PORT".to_string(), "8080".to_string()),
        ])
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.server_port, 8080);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let result = envy::from_iter::<_, Config>(Vec::<(String, String)>::new());
        assert!(result.is_err());
    }
}
