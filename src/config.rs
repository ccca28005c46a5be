use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub allowed_hosts: Vec<String>,
    pub media_root: Option<String>,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub secret_key: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 6,
            max_limit: 100,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|host| host.trim().to_lowercase())
        .filter(|host| !host.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env_or("SERVER_PORT", "8000")
            .parse()
            .map_err(|e| anyhow::anyhow!("SERVER_PORT is not a valid port: {}", e))?;
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", "5")
            .parse()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is not a number: {}", e))?;

        let defaults = PaginationConfig::default();
        let default_limit = env::var("PAGINATION_DEFAULT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.default_limit);
        let max_limit = env::var("PAGINATION_MAX_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_limit);

        Ok(Self {
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "sqlite:data/foodgram.db?mode=rwc"),
                max_connections,
            },
            server: ServerConfig {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port,
                debug: parse_bool(&env_or("DEBUG", "false")),
                allowed_hosts: parse_list(&env_or("ALLOWED_HOSTS", "*")),
                media_root: env::var("MEDIA_ROOT").ok().filter(|v| !v.is_empty()),
                public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost")
                    .trim_end_matches('/')
                    .to_string(),
            },
            security: SecurityConfig {
                secret_key: env_or("SECRET_KEY", "insecure-dev-key"),
            },
            pagination: PaginationConfig {
                default_limit: default_limit.max(1),
                max_limit: max_limit.max(1),
            },
        })
    }

    /// Configuration for tests and the fixture loader: in-memory database, open hosts.
    pub fn for_testing() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                debug: true,
                allowed_hosts: vec!["*".to_string()],
                media_root: None,
                public_base_url: "http://testserver".to_string(),
            },
            security: SecurityConfig {
                secret_key: "test-secret".to_string(),
            },
            pagination: PaginationConfig::default(),
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Whether a request `Host` header value is accepted. The port part is ignored.
    pub fn is_host_allowed(&self, host: &str) -> bool {
        let host = strip_port(host).to_lowercase();
        self.server.allowed_hosts.iter().any(|allowed| {
            allowed == "*"
                || *allowed == host
                || (allowed.starts_with('.') && (host.ends_with(allowed.as_str()) || host == allowed[1..]))
        })
    }
}

/// `host:port` -> `host`; bracketed IPv6 literals keep their brackets.
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.contains(']') && (name.ends_with(']') || !name.contains(':')) => name,
        _ => host,
    }
}
