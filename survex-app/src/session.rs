use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use survex_cache::SessionId;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{AppState, Session};

pub const SESSION_COOKIE: &str = "survex_session";

/// The caller's session.
///
/// Looking a visitor up never stores anything: without a known cookie the
/// visitor gets a throwaway session at the welcome screen. Only
/// [`Visitor::enroll`] puts a session into the cache.
pub struct Visitor {
    pub id: SessionId,
    pub session: Arc<Mutex<Session>>,
    pub is_new: bool,
    stored: bool,
}

#[async_trait]
impl FromRequestParts<AppState> for Visitor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(id) = session_cookie(&parts.headers) {
            if let Some(session) = state.sessions.get(&id) {
                return Ok(Self {
                    id,
                    session,
                    is_new: false,
                    stored: true,
                });
            }
            debug!("Session {} expired or unknown, starting over", id);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            session: Arc::new(Mutex::new(state.new_session())),
            is_new: false,
            stored: false,
        })
    }
}

impl Visitor {
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// Stores a throwaway session so later requests find it again.
    pub fn enroll(self, state: &AppState) -> Self {
        if self.stored {
            return self;
        }
        let (id, session) = state.sessions.insert(state.new_session());
        Self {
            id,
            session,
            is_new: true,
            stored: true,
        }
    }

    /// Attaches the session cookie when the session was created by this request.
    pub fn finish(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.is_new {
            match HeaderValue::from_str(&format!(
                "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
                self.id
            )) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => warn!("Could not build session cookie: {}", e),
            }
        }
        response
    }
}

pub fn session_cookie(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_session_among_other_cookies() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}; lang=en")).unwrap(),
        );
        assert_eq!(session_cookie(&headers), Some(id));
    }

    #[test]
    fn ignores_malformed_ids() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("survex_session=not-a-uuid"));
        assert_eq!(session_cookie(&headers), None);
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }
}
