use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
};
use validator::Validate;

use crate::errors::ServiceError;

/// Opaque cart session identifier, taken from the `session_id` cookie or the
/// `X-Session-ID` header. Cart and checkout routes refuse requests without
/// one.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(sid) = session_from_cookie(parts.headers.get(header::COOKIE)) {
            return Ok(SessionId(sid));
        }

        if let Some(sid) = parts
            .headers
            .get("x-session-id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return Ok(SessionId(sid.to_string()));
        }

        Err(ServiceError::BadRequest("session_id required".to_string()))
    }
}

fn session_from_cookie(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "session_id" && !value.is_empty()).then(|| value.to_string())
    })
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("validation failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_session_id_is_parsed() {
        let header = HeaderValue::from_static("theme=dark; session_id=sess-42; lang=de");
        assert_eq!(
            session_from_cookie(Some(&header)),
            Some("sess-42".to_string())
        );
    }

    #[test]
    fn missing_cookie_yields_none() {
        assert_eq!(session_from_cookie(None), None);

        let header = HeaderValue::from_static("theme=dark");
        assert_eq!(session_from_cookie(Some(&header)), None);
    }

    #[test]
    fn empty_cookie_value_is_ignored() {
        let header = HeaderValue::from_static("session_id=");
        assert_eq!(session_from_cookie(Some(&header)), None);
    }
}
