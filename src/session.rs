use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;

use crate::api::ClassroomError;

/// Caller identity as far as this service knows it: the Google access token
/// the identity provider handed to the browser, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Bearer(String),
}

impl Session {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                let (scheme, token) = v.split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|t| !t.is_empty())
            .map(|t| Self::Bearer(t.to_string()))
            .unwrap_or(Self::Anonymous)
    }

    pub fn access_token(&self) -> Result<&str, ClassroomError> {
        match self {
            Self::Bearer(token) => Ok(token),
            Self::Anonymous => Err(ClassroomError::Unauthorized),
        }
    }
}

/// Every request has a session; a missing or malformed header is just
/// `Anonymous`. Whether that is acceptable is the data source's call.
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn parses_bearer_token() {
        let session = Session::from_headers(&headers("Bearer ya29.token"));
        assert_eq!(session, Session::Bearer("ya29.token".into()));
        assert_eq!(session.access_token().unwrap(), "ya29.token");
    }

    #[test]
    fn other_schemes_are_anonymous() {
        assert_eq!(Session::from_headers(&headers("Basic abc")), Session::Anonymous);
        assert_eq!(Session::from_headers(&headers("Bearer  ")), Session::Anonymous);
        assert_eq!(Session::from_headers(&HeaderMap::new()), Session::Anonymous);
        assert!(matches!(
            Session::Anonymous.access_token(),
            Err(ClassroomError::Unauthorized)
        ));
    }
}
