//! Actix-web extractor for bearer token authentication.

use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use secrecy::{ExposeSecret, SecretString};

use super::JwtKeys;
use crate::config::AUTHORIZATION_HEADER;
use crate::error::AppError;
use crate::models::CurrentUser;

/// Extract the bearer token, wrapped in SecretString.
/// Returns None if the header is missing, not UTF-8, or not a bearer token.
fn extract_bearer(req: &HttpRequest) -> Option<SecretString> {
    req.headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(|t| SecretString::from(t.trim().to_string()))
}

/// Extractor that requires a valid bearer token.
///
/// ```ignore
/// async fn protected_handler(auth: AuthenticatedUser) -> impl Responder {
///     // auth.user.user_id is the caller
/// }
/// ```
pub struct AuthenticatedUser {
    pub user: CurrentUser,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(keys) = req.app_data::<web::Data<JwtKeys>>() else {
            return ready(Err(AppError::Unauthorized(
                "Internal configuration error".to_string(),
            )));
        };

        let Some(token) = extract_bearer(req) else {
            return ready(Err(AppError::Unauthorized(
                "Missing bearer token. Provide an Authorization header.".to_string(),
            )));
        };

        ready(
            keys.verify(token.expose_secret())
                .map(|user| AuthenticatedUser { user }),
        )
    }
}
