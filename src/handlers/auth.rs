use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::session::{session_cookie, CurrentSession},
    models::{
        auth::{
            FlowOutcome, LoginOutcome, LoginPayload, LoginQuery, LoginView, ProfileView, ResetPasswordPayload,
            RoleQuery, SignupPayload,
        },
        cnpj::{CnpjCheckPayload, CnpjRequestPayload, CnpjStatusView},
    },
    services::auth::login_path,
};

#[utoipa::path(
    get,
    path = "/login",
    tag = "Auth",
    params(
        ("role" = Option<String>, Query, description = "admin | cliente")
    ),
    responses(
        (status = 200, description = "Tela de login", body = LoginView),
        (status = 303, description = "Já autenticado: vai para /dashboard")
    )
)]
pub async fn login_page(current: CurrentSession, Query(query): Query<LoginQuery>) -> Response {
    if current.session.is_authenticated() {
        return Redirect::to("/dashboard").into_response();
    }
    let role = query.role.unwrap_or_default();
    Json(LoginView { role, profile: role.profile_label().to_string() }).into_response()
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginPayload,
    params(
        ("role" = Option<String>, Query, description = "Perfil com que a tela foi aberta"),
        ("next" = Option<String>, Query, description = "Rota pretendida (somente caminhos locais)")
    ),
    responses(
        (status = 200, description = "Login efetuado", body = LoginOutcome),
        (status = 400, description = "E-mail ou senha em branco"),
        (status = 401, description = "Credenciais recusadas pela API")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    current: CurrentSession,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
    Json(payload): Json<LoginPayload>,
) -> Result<(CookieJar, Json<LoginOutcome>), AppError> {
    let (session, outcome) = app_state.auth_service.login(payload, &query).await?;

    // Reaproveita a aba se ela já tinha cookie; painel antigo não serve mais
    let tab = current.tab.unwrap_or_else(Uuid::new_v4);
    app_state.live.unmount(tab).await;
    app_state.sessions.establish(tab, &session).await?;

    let jar = jar.add(session_cookie(tab, app_state.config.secure_cookies));
    Ok((jar, Json(outcome)))
}

#[utoipa::path(
    post,
    path = "/signup",
    tag = "Auth",
    request_body = SignupPayload,
    responses(
        (status = 200, description = "Conta criada", body = FlowOutcome),
        (status = 400, description = "Dados inválidos ou CNPJ não aprovado"),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn signup(
    State(app_state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<Json<FlowOutcome>, AppError> {
    let outcome = app_state.auth_service.signup(payload).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/cnpj/check",
    tag = "Auth",
    request_body = CnpjCheckPayload,
    responses(
        (status = 200, description = "Situação do CNPJ na whitelist", body = CnpjStatusView),
        (status = 400, description = "CNPJ sem 14 dígitos")
    )
)]
pub async fn check_cnpj(
    State(app_state): State<AppState>,
    Json(payload): Json<CnpjCheckPayload>,
) -> Result<Json<CnpjStatusView>, AppError> {
    let view = app_state.cnpj_service.check(payload).await?;
    Ok(Json(view))
}

// /forgot e /reset são a mesma operação
#[utoipa::path(
    post,
    path = "/reset",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Senha atualizada", body = FlowOutcome),
        (status = 400, description = "Dados inválidos ou recusados pela API")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Query(query): Query<RoleQuery>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<FlowOutcome>, AppError> {
    let outcome = app_state
        .auth_service
        .reset_password(payload, query.role.unwrap_or_default())
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/onboarding",
    tag = "Auth",
    request_body = CnpjRequestPayload,
    responses(
        (status = 200, description = "Solicitação registrada", body = CnpjStatusView),
        (status = 400, description = "CNPJ sem 14 dígitos")
    )
)]
pub async fn onboarding(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Json(payload): Json<CnpjRequestPayload>,
) -> Result<Json<CnpjStatusView>, AppError> {
    let view = app_state.cnpj_service.request(&current.session, payload).await?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    responses(
        (status = 303, description = "Sessão encerrada; volta ao login do mesmo perfil")
    )
)]
pub async fn logout(State(app_state): State<AppState>, current: CurrentSession) -> Redirect {
    if let Some(tab) = current.tab {
        app_state.live.unmount(tab).await;
        app_state.sessions.clear(tab).await;
    }
    tracing::info!("Logout de {}", current.session.email);
    Redirect::to(&login_path(current.session.role))
}

#[utoipa::path(
    get,
    path = "/configuracoes",
    tag = "Auth",
    responses(
        (status = 200, description = "Dados do usuário logado", body = ProfileView)
    )
)]
pub async fn profile(current: CurrentSession) -> Json<ProfileView> {
    Json(ProfileView::from(&current.session))
}

#[cfg(test)]
mod tests {
    use crate::common::testing::{browser, cookie_for, login_as, spawn_app, MockBackend, MockReply};
    use crate::models::auth::Role;
    use crate::services::auth::ADMIN_DOWNGRADE_WARNING;
    use axum::http::{header, Method, StatusCode};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn admin_login_with_client_role_warns_and_issues_cookie() {
        let mock = MockBackend::new();
        mock.on(Method::POST, "/auth/login", MockReply::json(json!({
            "token": "jwt", "role": "cliente", "name": "Bia", "cnpj": "12345678000190"
        })));
        let (app, state) = spawn_app(&mock).await;

        let response = browser()
            .post(format!("{}/login?role=admin", app))
            .json(&json!({"email": "bia@mail.com", "password": "123456"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
        assert!(cookie.starts_with("inovatech_sid="));
        assert!(cookie.contains("HttpOnly"));
        let tab = cookie["inovatech_sid=".len()..].split(';').next().unwrap().parse().unwrap();

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["redirectTo"], "/dashboard");
        assert_eq!(body["warning"], ADMIN_DOWNGRADE_WARNING);

        let session = state.sessions.load(tab).await;
        assert_eq!(session.token, "jwt");
        assert_eq!(session.role, Role::Cliente);
    }

    #[tokio::test]
    async fn login_page_redirects_authenticated_tabs() {
        let mock = MockBackend::new();
        let (app, state) = spawn_app(&mock).await;
        let tab = login_as(&state, Role::Cliente).await;

        let response = browser().get(format!("{}/login", app)).header("cookie", cookie_for(tab)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/dashboard");

        let response = browser().get(format!("{}/login?role=admin", app)).send().await.unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"role": "admin", "profile": "Administrativo"}));
    }

    #[tokio::test]
    async fn logout_clears_session_and_returns_to_role_login() {
        let mock = MockBackend::new();
        let (app, state) = spawn_app(&mock).await;
        let tab = login_as(&state, Role::Admin).await;

        let response = browser().post(format!("{}/logout", app)).header("cookie", cookie_for(tab)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login?role=admin");
        assert!(!state.sessions.load(tab).await.is_authenticated());
    }

    #[tokio::test]
    async fn onboarding_rejects_short_cnpj_without_calling_backend() {
        let mock = MockBackend::new();
        let (app, _) = spawn_app(&mock).await;

        let response = browser()
            .post(format!("{}/onboarding", app))
            .json(&json!({"cnpj": "12.345.678/0001"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Informe um CNPJ válido com 14 dígitos.");
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn profile_never_exposes_token() {
        let mock = MockBackend::new();
        let (app, state) = spawn_app(&mock).await;
        let tab = login_as(&state, Role::Cliente).await;

        let response = browser().get(format!("{}/configuracoes", app)).header("cookie", cookie_for(tab)).send().await.unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["role"], "cliente");
        assert_eq!(body["cnpj"], "12345678000190");
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn reset_validation_errors_list_fields() {
        let mock = MockBackend::new();
        let (app, _) = spawn_app(&mock).await;

        let response = browser()
            .post(format!("{}/forgot?role=cliente", app))
            .json(&json!({"email": "nao-e-email", "password": "123", "confirmacao": "321"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["details"]["email"].is_array());
        assert!(body["details"]["password"].is_array());
        assert!(mock.requests().is_empty());
    }
}
