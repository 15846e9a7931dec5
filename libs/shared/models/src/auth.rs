use serde::{Deserialize, Serialize};

/// Claims read from the session token. Signatures are verified by the API, never here.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
}

/// Shape of `GET /auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_professional: bool,
    #[serde(default)]
    pub is_admin: bool,
    pub cep: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub whatsapp: Option<String>,
}

impl CurrentUser {
    /// City used for region matching; blank values count as missing.
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref().filter(|c| !c.trim().is_empty())
    }
}
