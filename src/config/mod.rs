use serde::{Deserialize, Serialize};
use std::env;

/// Longest accepted token lifetime: one year
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub data: DataConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    pub upload_root: String,
    /// Base URL used when handing out links to uploaded files
    pub public_url: String,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub allowed_tables: Vec<String>,
    /// Never reachable through the data endpoints, even if listed as allowed
    pub forbidden_tables: Vec<String>,
    pub allowed_procedures: Vec<String>,
    pub default_per_page: i64,
    pub max_per_page: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared payload key: 32 raw bytes or 64 hex characters
    #[serde(skip_serializing)]
    pub envelope_key: String,
    /// Plaintext bypass credential for the `x-api-key` header. Always `None` in production.
    #[serde(skip_serializing)]
    pub dev_key: Option<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// Allow the master password from `app_config.hash_master` to log into any account
    pub auth_bypass: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub from_address: String,
    pub from_name: String,
    /// Every outbound mail is redirected here outside production
    pub dev_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary variable source (used by tests and the CLI)
    pub fn from_vars<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match get("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&get)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    fn with_overrides<F>(mut self, get: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = get("BIND_HOST") {
            self.server.bind_host = v;
        }
        if let Some(v) = get("API_PORT").or_else(|| get("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = get("UPLOAD_ROOT") {
            self.server.upload_root = v;
        }
        if let Some(v) = get("PUBLIC_URL") {
            self.server.public_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Some(v) = get("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = get("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Data access overrides
        if let Some(v) = get("ALLOWED_TABLES") {
            self.data.allowed_tables = split_list(&v);
        }
        if let Some(v) = get("ALLOWED_PROCEDURES") {
            self.data.allowed_procedures = split_list(&v);
        }

        // Security overrides
        if let Some(v) = get("API_SECRET_KEY") {
            self.security.envelope_key = v;
        }
        self.security.dev_key = get("DEV_KEY").filter(|k| !k.is_empty());
        if let Some(v) = get("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = get("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v
                .parse::<u64>()
                .unwrap_or(self.security.jwt_expiry_hours)
                .min(MAX_JWT_EXPIRY_HOURS);
        }
        if let Some(v) = get("AUTH_BYPASS") {
            self.security.auth_bypass = v.parse().unwrap_or(self.security.auth_bypass);
        }
        if let Some(v) = get("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        // Mail overrides
        if let Some(v) = get("MAIL_HOST") {
            self.mail.host = v;
        }
        if let Some(v) = get("MAIL_PORT") {
            self.mail.port = v.parse().unwrap_or(self.mail.port);
        }
        self.mail.username = get("MAIL_USERNAME").filter(|v| !v.is_empty());
        self.mail.password = get("MAIL_PASSWORD").filter(|v| !v.is_empty());
        if let Some(v) = get("MAIL_FROM_ADDRESS") {
            self.mail.from_address = v;
        }
        if let Some(v) = get("MAIL_FROM_NAME") {
            self.mail.from_name = v;
        }
        if let Some(v) = get("DEV_EMAIL") {
            self.mail.dev_email = Some(v).filter(|v| !v.is_empty());
        }

        // The plaintext bypass never survives into production
        if self.is_production() {
            if self.security.dev_key.take().is_some() {
                tracing::warn!("DEV_KEY is set but ignored in production");
            }
            self.security.auth_bypass = false;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind_host: "0.0.0.0".to_string(),
                port: 3000,
                upload_root: "storage/uploads".to_string(),
                public_url: "http://localhost:3000".to_string(),
                max_request_size_bytes: 20 * 1024 * 1024, // 20MB, uploads included
            },
            database: DatabaseConfig {
                url: "mysql://root@localhost:3306/trainers".to_string(),
                max_connections: 10,
                connection_timeout: 30,
            },
            data: DataConfig::default(),
            security: SecurityConfig {
                envelope_key: String::new(),
                dev_key: None,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
                auth_bypass: false,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            mail: MailConfig::default(),
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.security.jwt_expiry_hours = 24;
        config.security.cors_origins = vec![];
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.security.jwt_expiry_hours = 4;
        config.security.cors_origins = vec![];
        config
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            allowed_tables: [
                "trainers",
                "trainer_details",
                "trainers_staging",
                "training",
                "trainer_schedule",
                "training_feedback",
                "trainer_monthly_view",
                "trainer_completed_view",
                "trainer_imbalance_view",
                "trainer_kpi_view",
                "training_view",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            forbidden_tables: [
                "migrations",
                "personal_access_tokens",
                "failed_jobs",
                "user_sessions",
                "two_factor_auth",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            allowed_procedures: ["get_trainerCompleted", "get_kpi", "get_availability"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_per_page: 10,
            max_per_page: 100,
        }
    }
}

impl DataConfig {
    pub fn table_allowed(&self, table: &str) -> bool {
        self.allowed_tables.iter().any(|t| t == table) && !self.forbidden_tables.iter().any(|t| t == table)
    }

    pub fn procedure_allowed(&self, name: &str) -> bool {
        self.allowed_procedures.iter().any(|p| p == name)
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: "no-reply@localhost".to_string(),
            from_name: "Trainer Admin".to_string(),
            dev_email: None,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
