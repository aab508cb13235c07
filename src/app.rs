use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::auth::{AuthError, JwtKeys, TokenDenylist};
use crate::config::AppConfig;
use crate::database::models::{TrainerStore, TwoFactorStore};
use crate::database::{DatabaseError, DatabaseManager, MySqlSchema, SchemaIntrospector};
use crate::envelope::{EnvelopeCodec, EnvelopeError, EnvelopeKey};
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::{FileStorage, Mailer};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Shared, read-only request context. Only the denylist mutates.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: DatabaseManager,
    pub schema: Arc<dyn SchemaIntrospector>,
    pub codec: Arc<EnvelopeCodec>,
    pub jwt: JwtKeys,
    pub denylist: TokenDenylist,
    pub mailer: Arc<dyn Mailer>,
    pub storage: FileStorage,
}

/// Key material parsed from configuration, checked before anything touches the network
#[derive(Clone)]
pub struct StartupKeys {
    pub codec: EnvelopeCodec,
    pub jwt: JwtKeys,
}

impl StartupKeys {
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let key = EnvelopeKey::parse(config.security.envelope_key.as_bytes())?;
        Ok(Self {
            codec: EnvelopeCodec::new(key),
            jwt: JwtKeys::from_config(&config.security)?,
        })
    }
}

impl AppState {
    pub fn new(config: AppConfig, database: DatabaseManager, mailer: Arc<dyn Mailer>) -> Result<Self, StartupError> {
        let keys = StartupKeys::from_config(&config)?;
        Ok(Self::assemble(config, keys, database, mailer))
    }

    pub fn assemble(config: AppConfig, keys: StartupKeys, database: DatabaseManager, mailer: Arc<dyn Mailer>) -> Self {
        let schema: Arc<dyn SchemaIntrospector> = Arc::new(MySqlSchema::new(database.pool().clone()));

        Self {
            storage: FileStorage::new(&config.server.upload_root),
            config: Arc::new(config),
            database,
            schema,
            codec: Arc::new(keys.codec),
            jwt: keys.jwt,
            denylist: TokenDenylist::new(),
            mailer,
        }
    }

    /// Swap the introspection source (tests use an in-memory schema)
    pub fn with_schema(mut self, schema: Arc<dyn SchemaIntrospector>) -> Self {
        self.schema = schema;
        self
    }

    pub fn pool(&self) -> &sqlx::MySqlPool {
        self.database.pool()
    }

    pub fn trainers(&self) -> TrainerStore {
        TrainerStore::new(self.pool().clone())
    }

    pub fn two_factor(&self) -> TwoFactorStore {
        TwoFactorStore::new(self.pool().clone())
    }
}

pub fn app(state: AppState) -> Router {
    let upload_root = state.storage.root().to_path_buf();
    let body_limit = state.config.server.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(public_api_routes())
        .merge(protected_api_routes(state.clone()))
        // Static file serving
        .route("/view/file/:base64", get(public::files::view_file))
        .nest_service("/images", ServeDir::new(upload_root.join("images")))
        .nest_service("/doc", ServeDir::new(upload_root.join("documents")))
        .nest_service("/storage", ServeDir::new(upload_root))
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_api_routes() -> Router<AppState> {
    use public::{auth, mail, trainer};

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/reset", post(auth::reset))
        .route("/api/auth/staging", get(auth::staging))
        .route("/api/view/trainer", get(trainer::view_trainers))
        .route("/api/email/send", post(mail::send))
        .route("/api/email/reset", post(mail::reset))
}

fn protected_api_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, data, procedure, two_factor, upload};

    Router::new()
        .route("/api/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/change-pass", patch(auth::change_password))
        .route("/api/auth/2fa/status", post(two_factor::status))
        .route("/api/auth/2fa/verify", post(two_factor::verify))
        .route("/api/data/:table", get(data::fetch))
        .route("/api/data/:table/info", get(data::table_info))
        .route("/api/data/:table/upsert", post(data::upsert))
        .route("/api/call/procedure", post(procedure::call))
        .route("/api/upload-image", post(upload::image))
        .route("/api/upload-doc", post(upload::document))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
        ]);

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str, jwt_secret: &str) -> AppConfig {
        AppConfig::from_vars(|name| match name {
            "API_SECRET_KEY" => Some(key.to_string()),
            "JWT_SECRET" => Some(jwt_secret.to_string()),
            _ => None,
        })
    }

    #[test]
    fn bad_envelope_key_fails_without_a_database() {
        let result = StartupKeys::from_config(&config("too-short", "secret"));
        assert!(matches!(result, Err(StartupError::Envelope(_))));
    }

    #[test]
    fn missing_jwt_secret_fails_startup() {
        let result = StartupKeys::from_config(&config(&"ab".repeat(32), ""));
        assert!(matches!(result, Err(StartupError::Auth(_))));
    }

    #[test]
    fn valid_keys_are_accepted() {
        assert!(StartupKeys::from_config(&config(&"ab".repeat(32), "secret")).is_ok());
    }
}
