use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::auth::Session};

pub const SESSION_COOKIE: &str = "inovatech_sid";

/// Id da aba carregado no cookie de sessão (se houver e for um UUID).
pub fn tab_id(headers: &HeaderMap) -> Option<Uuid> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

// Sem Max-Age: vive enquanto o navegador estiver aberto
pub fn session_cookie(tab: Uuid, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, tab.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

// Extrator com a sessão da aba atual. Nunca falha: sem cookie é sessão anônima.
pub struct CurrentSession {
    pub tab: Option<Uuid>,
    pub session: Session,
}

impl CurrentSession {
    /// Rotas que dependem de uma aba identificada (painel ao vivo, logout...).
    pub fn require_tab(&self) -> Result<Uuid, AppError> {
        self.tab.ok_or(AppError::AuthExpired { status: 401, message: None })
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let tab = tab_id(&parts.headers);
        let session = match tab {
            Some(tab) => app_state.sessions.load(tab).await,
            None => Session::anonymous(),
        };
        Ok(CurrentSession { tab, session })
    }
}
