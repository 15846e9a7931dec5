use std::env;

use chrono::FixedOffset;
use tracing::warn;

/// America/Sao_Paulo has had no daylight saving time since 2019.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -180;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub utc_offset_minutes: i32,
    pub login_path: String,
    pub request_timeout_secs: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("CONTRATAPRO_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("CONTRATAPRO_API_URL not set, using http://localhost:8000");
                    "http://localhost:8000".to_string()
                }),
            utc_offset_minutes: env::var("BOOKING_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i32>().ok())
                .filter(|minutes| minutes.abs() < 24 * 60)
                .unwrap_or_else(|| {
                    warn!("BOOKING_UTC_OFFSET_MINUTES not set or invalid, using America/Sao_Paulo (-180)");
                    DEFAULT_UTC_OFFSET_MINUTES
                }),
            login_path: env::var("FRONTEND_LOGIN_PATH")
                .unwrap_or_else(|_| "/login".to_string()),
            request_timeout_secs: env::var("API_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing API base URL");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }

    /// Offset used for every "today" and "past hour" decision.
    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| {
                warn!("Invalid UTC offset {} minutes, falling back to -03:00", self.utc_offset_minutes);
                FixedOffset::west_opt(3 * 3600).expect("-03:00 is a valid offset")
            })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            login_path: "/login".to_string(),
            request_timeout_secs: 15,
            port: 3000,
        }
    }
}
