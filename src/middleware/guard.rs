use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{middleware::session::CurrentSession, models::auth::Session};

/// Capacidade exigida por uma rota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Public,
    RequiresAuth,
    RequiresAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(&'static str),
}

/// Decisão pura, só a partir da sessão.
pub fn evaluate(session: &Session, requirement: Requirement) -> Decision {
    match requirement {
        Requirement::Public => Decision::Allow,
        Requirement::RequiresAuth if !session.is_authenticated() => Decision::RedirectTo("/login"),
        Requirement::RequiresAuth => Decision::Allow,
        Requirement::RequiresAdmin if !session.is_authenticated() => Decision::RedirectTo("/login?role=admin"),
        Requirement::RequiresAdmin if !session.is_admin() => Decision::RedirectTo("/dashboard"),
        Requirement::RequiresAdmin => Decision::Allow,
    }
}

async fn enforce(requirement: Requirement, current: CurrentSession, request: Request, next: Next) -> Response {
    match evaluate(&current.session, requirement) {
        Decision::Allow => next.run(request).await,
        Decision::RedirectTo(target) => {
            tracing::debug!("{} bloqueado ({:?}), indo para {}", request.uri().path(), requirement, target);
            Redirect::to(target).into_response()
        }
    }
}

pub async fn auth_guard(current: CurrentSession, request: Request, next: Next) -> Response {
    enforce(Requirement::RequiresAuth, current, request, next).await
}

pub async fn admin_guard(current: CurrentSession, request: Request, next: Next) -> Response {
    enforce(Requirement::RequiresAdmin, current, request, next).await
}

// "/" nunca renderiza nada: manda para o login ou para o painel
pub async fn root_redirect(current: CurrentSession) -> Redirect {
    if current.session.is_authenticated() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

pub async fn fallback_redirect() -> Redirect {
    Redirect::to("/")
}
