use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{common::error::AuthLost, config::AppState, middleware::session::tab_id};

const LOGIN_PATH: &str = "/login";

/// Camada mais externa. Único lugar que reage à perda de autorização:
/// desmonta o painel da aba, limpa a sessão e volta ao login.
/// Quem já está em /login recebe o erro como veio, sem nova navegação.
pub async fn navigation_controller(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let tab = tab_id(request.headers());

    let response = next.run(request).await;
    if response.extensions().get::<AuthLost>().is_none() {
        return response;
    }

    if let Some(tab) = tab {
        state.live.unmount(tab).await;
        state.sessions.clear(tab).await;
    }
    tracing::info!("Autorização perdida em {}", path);

    if path == LOGIN_PATH {
        return response;
    }
    Redirect::to(LOGIN_PATH).into_response()
}
