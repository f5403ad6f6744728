use std::sync::Arc;

use axum::{extract::{Request, State}, http::{header, StatusCode}, middleware::Next, response::Response};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use service::{caller::Caller, requests::{RequestService, RequestStore}};

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct ServerState {
    pub auth: ServerAuthConfig,
    pub requests: Arc<RequestService<RequestStore>>,
}

/// Claims issued by the host's identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

impl Claims {
    pub fn into_caller(self) -> Caller {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        Caller { id: self.sub, display_name: name, is_admin: self.admin }
    }
}

/// Sign a token for `caller`, valid for `ttl_secs`.
pub fn issue_token(secret: &str, caller: &Caller, ttl_secs: u64) -> Result<String, jsonwebtoken::errors::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let claims = Claims {
        sub: caller.id.clone(),
        name: Some(caller.display_name.clone()),
        admin: caller.is_admin,
        exp: (now + ttl_secs) as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Middleware: resolve the caller from `Authorization: Bearer <token>` (or the
/// `auth_token` cookie) and attach it as a request extension.
/// Missing, malformed, invalid or expired tokens are rejected with 401.
pub async fn require_caller(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = req.uri().path().to_string();

    let token = match bearer_token(&req).or_else(|| cookie_token(&req)) {
        Some(t) => t,
        None => {
            tracing::warn!(path = %path, "missing Authorization header and auth_token cookie");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let key = DecodingKey::from_secret(state.auth.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    match decode::<Claims>(&token, &key, &validation) {
        Ok(data) => {
            let caller = data.claims.into_caller();
            tracing::debug!(path = %path, user = %caller.id, admin = caller.is_admin, "caller resolved");
            req.extensions_mut().insert(caller);
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "invalid or expired token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

fn bearer_token(req: &Request) -> Option<String> {
    let h = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    h.strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn cookie_token(req: &Request) -> Option<String> {
    let cookie_header = req.headers().get(header::COOKIE)?.to_str().ok()?;
    cookie_header
        .split(';')
        .find_map(|part| part.trim().strip_prefix("auth_token="))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_name_resolves_to_unknown() {
        let claims = Claims { sub: "u1".into(), name: None, admin: false, exp: 0 };
        let caller = claims.into_caller();
        assert_eq!(caller.display_name, "Unknown");
        assert!(!caller.is_admin);
    }

    #[test]
    fn issued_token_decodes_to_same_caller() {
        let caller = Caller::admin("a1", "Admin");
        let token = issue_token("s3cret", &caller, 60).unwrap();
        let data = decode::<Claims>(&token, &DecodingKey::from_secret(b"s3cret"), &Validation::new(Algorithm::HS256)).unwrap();
        assert_eq!(data.claims.into_caller(), caller);
    }
}
