use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_api::ApiClient;
use shared_config::AppConfig;
use shared_utils::session::Session;

use crate::models::{AppointmentError, CreateServiceRequest, DurationType, Service};

impl CreateServiceRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.title.trim().is_empty() {
            return Err(AppointmentError::InvalidService("title is required".to_string()));
        }

        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(AppointmentError::InvalidService(
                    "price must be zero or positive".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// The professional's own service catalog.
pub struct CatalogService {
    api: ApiClient,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api: ApiClient::new(config),
        }
    }

    pub async fn list_mine(&self, session: &Session) -> Result<Vec<Service>, AppointmentError> {
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;
        let result = self
            .api
            .request::<Vec<Service>>(Method::GET, "/services/me", Some(&token), None)
            .await;
        Ok(session.observe(result)?)
    }

    pub async fn create(
        &self,
        session: &Session,
        request: CreateServiceRequest,
    ) -> Result<Service, AppointmentError> {
        request.validate()?;
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;

        debug!("Creating service '{}'", request.title.trim());

        let body = json!({
            "title": request.title.trim(),
            "description": request.description.as_deref().map(str::trim).filter(|d| !d.is_empty()),
            "price": request.price,
            "duration_type": match request.duration_type {
                DurationType::Hourly => "hourly",
                DurationType::Daily => "daily",
            },
        });

        let result = self
            .api
            .request::<Service>(Method::POST, "/services/", Some(&token), Some(body))
            .await;
        let service = session.observe(result)?;

        info!("Service {} created", service.id);
        Ok(service)
    }

    pub async fn delete(&self, session: &Session, service_id: i64) -> Result<(), AppointmentError> {
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;

        let path = format!("/services/{}", service_id);
        let result = self
            .api
            .request_no_content(Method::DELETE, &path, Some(&token))
            .await;
        session.observe(result)?;

        info!("Service {} deleted", service_id);
        Ok(())
    }
}
