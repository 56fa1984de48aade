use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{config::SessionConfig, state::AppState};

/// Per-visitor authentication state. Resolved fresh for every request and
/// handed to view handlers as an explicit value; there is no ambient session
/// storage and no logout transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated { user_id: i32 },
}

impl Session {
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Session::Authenticated { user_id } => Some(*user_id),
            Session::Anonymous => None,
        }
    }

    /// A missing, malformed, or expired token is an anonymous visitor, not
    /// an error.
    pub fn from_bearer(keys: &SessionKeys, header: Option<&str>) -> Session {
        let Some(token) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
            return Session::Anonymous;
        };
        match keys.verify(token) {
            Ok(claims) => Session::Authenticated {
                user_id: claims.sub,
            },
            Err(e) => {
                debug!(error = %e, "session token rejected");
                Session::Anonymous
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::minutes(config.ttl_minutes),
        }
    }

    pub fn sign(&self, user_id: i32) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.ttl;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        SessionKeys::new(&state.config.session)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        Ok(Session::from_bearer(&keys, header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> SessionKeys {
        SessionKeys::new(&SessionConfig {
            secret: "dev-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let token = keys.sign(42).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let keys = make_keys();
        let other = SessionKeys::new(&SessionConfig {
            secret: "other-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        });
        let token = keys.sign(7).expect("sign");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn missing_header_resolves_anonymous() {
        let keys = make_keys();
        assert_eq!(Session::from_bearer(&keys, None), Session::Anonymous);
    }

    #[test]
    fn garbage_token_resolves_anonymous() {
        let keys = make_keys();
        let session = Session::from_bearer(&keys, Some("Bearer not-a-token"));
        assert_eq!(session, Session::Anonymous);
        let session = Session::from_bearer(&keys, Some("Basic dXNlcg=="));
        assert_eq!(session, Session::Anonymous);
    }

    #[test]
    fn valid_token_resolves_authenticated() {
        let keys = make_keys();
        let token = keys.sign(13).expect("sign");
        let header = format!("Bearer {token}");
        let session = Session::from_bearer(&keys, Some(header.as_str()));
        assert_eq!(session, Session::Authenticated { user_id: 13 });
        assert_eq!(session.user_id(), Some(13));
    }
}
