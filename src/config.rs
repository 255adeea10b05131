use std::{fmt::Display, str::FromStr};

use anyhow::{Context, Result, anyhow};

pub const DEFAULT_SESSION_COOKIE: &str = "app_session_id";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub seed_db: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `None` runs the service without a database: reads come back empty, writes fail.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Identity that is promoted to admin when its user record is synced.
    pub owner_open_id: Option<String>,
    pub session_cookie_name: String,
    /// HS256 key for session tokens. Without it no session is accepted.
    pub session_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            owner_open_id: None,
            session_cookie_name: DEFAULT_SESSION_COOKIE.into(),
            session_secret: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
            },
            auth: AuthConfig::default(),
            seed_db: false,
        }
    }
}

/// Loads the configuration from the process environment.
pub fn load() -> Result<AppConfig> {
    load_from(|key| std::env::var(key).ok())
}

/// Loads the configuration through `lookup`, which returns the raw value of a variable if set.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
    let defaults = AppConfig::default();
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    Ok(AppConfig {
        server: ServerConfig {
            host: non_empty("SERVER_HOST").unwrap_or(defaults.server.host),
            port: parse_or(&lookup, "SERVER_PORT", defaults.server.port)?,
        },
        database: DatabaseConfig {
            url: non_empty("DATABASE_URL"),
            max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database.max_connections,
            )?,
        },
        auth: AuthConfig {
            owner_open_id: non_empty("OWNER_OPEN_ID"),
            session_cookie_name: non_empty("SESSION_COOKIE_NAME")
                .unwrap_or(defaults.auth.session_cookie_name),
            session_secret: non_empty("SESSION_SECRET"),
        },
        seed_db: parse_or(&lookup, "SEED_DB", defaults.seed_db)?,
    })
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|err| anyhow!("{}", err))
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load_from(lookup_in(&[])).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.database.url.is_none());
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.session_cookie_name, DEFAULT_SESSION_COOKIE);
        assert!(config.auth.owner_open_id.is_none());
        assert!(config.auth.session_secret.is_none());
        assert!(!config.seed_db);
    }

    #[test]
    fn reads_every_variable() {
        let config = load_from(lookup_in(&[
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", "8081"),
            ("DATABASE_URL", "postgres://store@localhost/store"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("OWNER_OPEN_ID", "owner-1"),
            ("SESSION_COOKIE_NAME", "sid"),
            ("SESSION_SECRET", "s3cret"),
            ("SEED_DB", "true"),
        ]))
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8081);
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://store@localhost/store")
        );
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.auth.owner_open_id.as_deref(), Some("owner-1"));
        assert_eq!(config.auth.session_cookie_name, "sid");
        assert_eq!(config.auth.session_secret.as_deref(), Some("s3cret"));
        assert!(config.seed_db);
    }

    #[test]
    fn blank_database_url_means_no_database() {
        let config = load_from(lookup_in(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database.url.is_none());
    }

    #[test]
    fn invalid_port_names_the_variable() {
        let err = load_from(lookup_in(&[("SERVER_PORT", "eighty")])).unwrap_err();
        assert!(format!("{:#}", err).contains("SERVER_PORT"));
    }
}
