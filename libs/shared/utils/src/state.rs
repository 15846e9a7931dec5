use std::sync::Arc;

use shared_api::ApiError;
use shared_config::AppConfig;
use shared_models::error::{AppError, GENERIC_CONNECTIVITY_MESSAGE};

use crate::session::Session;
use crate::time::{Clock, SystemClock};

/// Shared by every cell router.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let clock = Arc::new(SystemClock::from_config(&config));
        Self {
            config: Arc::new(config),
            clock,
        }
    }

    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            clock,
        }
    }

    pub fn login_required(&self, return_to: &str) -> AppError {
        AppError::login_required(&self.config.login_path, return_to)
    }

    /// Token for an authenticated call, or a login redirect back to `return_to`.
    pub fn require_token(&self, session: &Session, return_to: &str) -> Result<String, AppError> {
        session
            .valid_token(self.clock.now())
            .ok_or_else(|| self.login_required(return_to))
    }

    /// Maps an upstream failure to the HTTP taxonomy, keeping the server's reason verbatim.
    pub fn api_error(&self, err: ApiError, return_to: &str) -> AppError {
        let message = err.to_string();
        match err {
            ApiError::Unauthorized { .. } => self.login_required(return_to),
            ApiError::Forbidden { .. } => AppError::Forbidden(message),
            ApiError::NotFound { .. } => AppError::NotFound(message),
            ApiError::Conflict { .. } => AppError::Conflict(message),
            ApiError::Rejected { .. } => AppError::BadRequest(message),
            ApiError::Server { detail, .. } => AppError::ExternalService(
                detail.unwrap_or_else(|| GENERIC_CONNECTIVITY_MESSAGE.to_string()),
            ),
            ApiError::Network(_) => AppError::ExternalService(GENERIC_CONNECTIVITY_MESSAGE.to_string()),
            ApiError::Decode(msg) => AppError::Internal(msg),
        }
    }
}
