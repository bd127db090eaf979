//! Cookie-based session identity.

use agent_run_core::SessionId;
use axum::http::{HeaderMap, HeaderValue, header};
use uuid::Uuid;

/// Cookie holding the session identifier.
pub const SESSION_COOKIE: &str = "session_id";

/// A resolved session identity for one request.
#[derive(Debug, Clone, Copy)]
pub struct SessionIdentity {
    /// The session identifier.
    pub id: SessionId,
    /// Whether the identifier was minted for this request and still needs
    /// to be persisted via a `Set-Cookie` header.
    pub minted: bool,
}

impl SessionIdentity {
    /// `Set-Cookie` header value persisting this identity, when minted.
    #[must_use]
    pub fn set_cookie(&self) -> Option<HeaderValue> {
        if !self.minted {
            return None;
        }
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly",
            self.id.simple()
        ))
        .ok()
    }
}

/// Return the request's session identifier, minting a fresh one if the
/// cookie is absent or unparseable.
#[must_use]
pub fn ensure_session_id(headers: &HeaderMap) -> SessionIdentity {
    session_from_headers(headers).map_or_else(
        || SessionIdentity {
            id: Uuid::new_v4(),
            minted: true,
        },
        |id| SessionIdentity { id, minted: false },
    )
}

fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}
