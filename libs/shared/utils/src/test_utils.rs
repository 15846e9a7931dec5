use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{FixedOffset, NaiveDate};
use serde_json::{json, Value};

use shared_config::{AppConfig, DEFAULT_UTC_OFFSET_MINUTES};

use crate::state::AppState;
use crate::time::FixedClock;

/// 2100-01-01T00:00:00Z
pub const FAR_FUTURE_EXP: i64 = 4_102_444_800;
/// 2001-09-09T01:46:40Z
pub const LONG_PAST_EXP: i64 = 1_000_000_000;

pub struct TestConfig {
    pub api_base_url: String,
    pub utc_offset_minutes: i32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

impl TestConfig {
    pub fn with_api(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            utc_offset_minutes: self.utc_offset_minutes,
            request_timeout_secs: 5,
            ..AppConfig::default()
        }
    }

    /// State whose clock is frozen at `date` `hour:minute` local time.
    pub fn to_state_at(&self, date: &str, hour: u32, minute: u32) -> AppState {
        let config = self.to_app_config();
        let clock = clock_at(date, hour, minute);
        AppState::with_clock(config, clock)
    }
}

pub fn sao_paulo() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60).expect("valid offset")
}

pub fn test_date(date: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("test dates use yyyy-mm-dd")
}

pub fn clock_at(date: &str, hour: u32, minute: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock::at(test_date(date), hour, minute, sao_paulo()).expect("valid test instant"))
}

/// JWT-shaped token with the given `exp`; the signature segment is a placeholder.
pub fn token_expiring_at(sub: &str, exp: i64) -> String {
    let header = json!({ "alg": "HS256", "typ": "JWT" });
    let payload = json!({ "sub": sub, "exp": exp, "iat": exp - 3600 });

    let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
    let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

    format!("{}.{}.test-signature", header_encoded, payload_encoded)
}

pub fn test_token(sub: &str) -> String {
    token_expiring_at(sub, FAR_FUTURE_EXP)
}

pub fn expired_token(sub: &str) -> String {
    token_expiring_at(sub, LONG_PAST_EXP)
}

/// JSON bodies shaped like the ContrataPro API responses.
pub struct MockApiResponses;

impl MockApiResponses {
    pub fn working_hour(id: i64, professional_id: i64, day_of_week: u8, start: &str, end: &str) -> Value {
        json!({
            "id": id,
            "professional_id": professional_id,
            "day_of_week": day_of_week,
            "start_time": start,
            "end_time": end
        })
    }

    pub fn service(id: i64, professional_id: i64, title: &str, duration_type: &str, price: Option<f64>) -> Value {
        json!({
            "id": id,
            "professional_id": professional_id,
            "title": title,
            "description": null,
            "price": price,
            "duration_type": duration_type,
            "image_url": null
        })
    }

    pub fn appointment(
        id: i64,
        professional_id: i64,
        date: &str,
        start: &str,
        end: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "client_id": 100 + id,
            "professional_id": professional_id,
            "service_id": 1,
            "date": date,
            "start_time": start,
            "end_time": end,
            "status": status,
            "reason": null,
            "is_manual_block": false,
            "client_name": "Maria Souza",
            "client_whatsapp": "11999990000",
            "professional_name": "João Eletricista",
            "service_title": "Instalação de tomada"
        })
    }

    pub fn manual_block(id: i64, professional_id: i64, date: &str, start: &str, end: &str) -> Value {
        json!({
            "id": id,
            "client_id": professional_id,
            "professional_id": professional_id,
            "service_id": null,
            "date": date,
            "start_time": start,
            "end_time": end,
            "status": "blocked",
            "reason": "Bloqueio manual",
            "is_manual_block": true
        })
    }

    pub fn professional_public(
        id: i64,
        city: &str,
        state: &str,
        services: Vec<Value>,
        working_hours: Vec<Value>,
    ) -> Value {
        json!({
            "id": id,
            "name": "João Eletricista",
            "slug": "joao-eletricista",
            "category": "Eletricista",
            "description": "Instalações e reparos",
            "city": city,
            "state": state,
            "whatsapp": "19988887777",
            "services": services,
            "working_hours": working_hours
        })
    }

    pub fn current_user(id: i64, city: Option<&str>) -> Value {
        json!({
            "id": id,
            "name": "Maria Souza",
            "email": "maria@example.com",
            "is_professional": false,
            "is_admin": false,
            "cep": city.map(|_| "13010000"),
            "city": city,
            "state": city.map(|_| "SP")
        })
    }

    pub fn created_appointment(id: i64, professional_id: i64, date: &str, start: &str, end: &str) -> Value {
        let mut body = Self::appointment(id, professional_id, date, start, end, "scheduled");
        body["whatsapp_link"] = json!("https://wa.me/5519988887777?text=Ol%C3%A1");
        body
    }
}
