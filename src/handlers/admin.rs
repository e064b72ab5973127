use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::session::CurrentSession,
    models::{
        cnpj::{ApprovePayload, CnpjEntry, CnpjRequestPayload, CnpjStatusView, SearchQuery},
        dashboard::SeedPayload,
        users::{UserForm, UserRecord},
    },
};

const DEFAULT_SEED_DAYS: u32 = 7;

// --- Whitelist de CNPJ ---

#[utoipa::path(
    get,
    path = "/admin/cnpj",
    tag = "Admin",
    params(
        ("q" = Option<String>, Query, description = "Busca por CNPJ, razão social ou nome fantasia")
    ),
    responses(
        (status = 200, description = "Entradas da whitelist", body = Vec<CnpjEntry>)
    )
)]
pub async fn list_cnpjs(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<CnpjEntry>>, AppError> {
    let entries = app_state.cnpj_service.list(&current.session, query.term()).await?;
    Ok(Json(entries))
}

#[utoipa::path(
    post,
    path = "/admin/cnpj",
    tag = "Admin",
    request_body = CnpjRequestPayload,
    responses(
        (status = 200, description = "CNPJ cadastrado", body = CnpjStatusView),
        (status = 400, description = "CNPJ sem 14 dígitos")
    )
)]
pub async fn register_cnpj(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Json(payload): Json<CnpjRequestPayload>,
) -> Result<Json<CnpjStatusView>, AppError> {
    let view = app_state
        .cnpj_service
        .request(&current.session, payload)
        .await
        .map_err(|e| e.or_message("Erro ao cadastrar CNPJ."))?;
    Ok(Json(view))
}

#[utoipa::path(
    put,
    path = "/admin/cnpj/{id}/approve",
    tag = "Admin",
    request_body = ApprovePayload,
    params(
        ("id" = i64, Path, description = "ID da entrada na whitelist")
    ),
    responses(
        (status = 200, description = "Lista atualizada", body = Vec<CnpjEntry>)
    )
)]
pub async fn approve_cnpj(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(payload): Json<ApprovePayload>,
) -> Result<Json<Vec<CnpjEntry>>, AppError> {
    let entries = app_state.cnpj_service.approve(&current.session, id, payload.approved).await?;
    Ok(Json(entries))
}

// --- Usuários ---

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Admin",
    params(
        ("q" = Option<String>, Query, description = "Busca por nome ou e-mail")
    ),
    responses(
        (status = 200, description = "Usuários", body = Vec<UserRecord>)
    )
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    let users = app_state.user_service.list(&current.session, query.term()).await?;
    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/admin/users",
    tag = "Admin",
    request_body = UserForm,
    responses(
        (status = 200, description = "Usuário criado; lista atualizada", body = Vec<UserRecord>),
        (status = 400, description = "Regras de perfil não atendidas")
    )
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Json(form): Json<UserForm>,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    let users = app_state.user_service.save(&current.session, None, form).await?;
    Ok(Json(users))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    tag = "Admin",
    request_body = UserForm,
    params(
        ("id" = i64, Path, description = "ID do usuário")
    ),
    responses(
        (status = 200, description = "Usuário atualizado; lista atualizada", body = Vec<UserRecord>)
    )
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(form): Json<UserForm>,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    let users = app_state.user_service.save(&current.session, Some(id), form).await?;
    Ok(Json(users))
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "Admin",
    params(
        ("id" = i64, Path, description = "ID do usuário")
    ),
    responses(
        (status = 200, description = "Usuário excluído; lista atualizada", body = Vec<UserRecord>)
    )
)]
pub async fn delete_user(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    let users = app_state.user_service.delete(&current.session, id).await?;
    Ok(Json(users))
}

// --- Operação ---

#[utoipa::path(
    post,
    path = "/admin/dev/seed-more",
    tag = "Admin",
    request_body = SeedPayload,
    responses(
        (status = 204, description = "Dados gerados; painel da aba recarregado")
    )
)]
pub async fn seed_more(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Json(payload): Json<SeedPayload>,
) -> Result<StatusCode, AppError> {
    let days = payload.days.unwrap_or(DEFAULT_SEED_DAYS);
    app_state.dashboard_service.seed_more(&current.session, days).await?;

    if let Some(tab) = current.tab {
        if let Some(dashboard) = app_state.live.get(tab).await {
            dashboard.refresh().await?;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/restaurantes",
    tag = "Admin",
    responses(
        (status = 200, description = "Restaurantes (lista vazia se a API falhar)", body = Vec<Value>)
    )
)]
pub async fn restaurants(
    State(app_state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<Vec<Value>>, AppError> {
    let rows = app_state.dashboard_service.restaurants(&current.session).await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use crate::common::testing::{browser, cookie_for, login_as, mock_dashboard, spawn_app, MockBackend, MockReply};
    use crate::models::auth::Role;
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn user_creation_is_checked_before_reaching_backend() {
        let mock = MockBackend::new();
        let (app, state) = spawn_app(&mock).await;
        let tab = login_as(&state, Role::Admin).await;

        let response = browser()
            .post(format!("{}/admin/users", app))
            .header("cookie", cookie_for(tab))
            .json(&json!({
                "nome": "Ana", "email": "ana@gmail.com", "role": "admin",
                "codigoCannoli": "CANNOLI", "senha": "123456"
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Admins só podem usar e-mails @cannoli.com.br ou @inovatech.com.br.");
        assert_eq!(mock.hits(Method::POST, "/users"), 0);
    }

    #[tokio::test]
    async fn cnpj_search_forwards_trimmed_term() {
        let mock = MockBackend::new();
        mock.on(Method::GET, "/cnpj", MockReply::json(json!([
            {"id": 1, "cnpj": "12345678000190", "razao_social": "Cannoli LTDA", "approved": false}
        ])));
        let (app, state) = spawn_app(&mock).await;
        let tab = login_as(&state, Role::Admin).await;

        let response = browser()
            .get(format!("{}/admin/cnpj?q=%20cannoli%20", app))
            .header("cookie", cookie_for(tab))
            .send()
            .await
            .unwrap();
        let rows: Value = response.json().await.unwrap();
        assert_eq!(rows[0]["razao_social"], "Cannoli LTDA");
        assert_eq!(mock.requests_to(Method::GET, "/cnpj")[0].query.get("q").map(String::as_str), Some("cannoli"));
    }

    #[tokio::test]
    async fn seed_more_defaults_to_a_week_and_refreshes_mounted_dashboard() {
        let mock = MockBackend::new();
        mock_dashboard(&mock);
        mock.on(Method::POST, "/dev/seed-more", MockReply::json(json!({"ok": true})));
        let (app, state) = spawn_app(&mock).await;
        let tab = login_as(&state, Role::Admin).await;
        let client = browser();

        client.get(format!("{}/dashboard", app)).header("cookie", cookie_for(tab)).send().await.unwrap();
        let response = client
            .post(format!("{}/admin/dev/seed-more", app))
            .header("cookie", cookie_for(tab))
            .json(&json!({}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(mock.requests_to(Method::POST, "/dev/seed-more")[0].body, json!({"days": 7}));
        assert_eq!(mock.hits(Method::GET, "/metrics"), 2);
    }

    #[tokio::test]
    async fn restaurants_lost_authorization_still_redirects() {
        let mock = MockBackend::new();
        mock.on(Method::GET, "/admin/restaurantes", MockReply::status(401, json!({})));
        let (app, state) = spawn_app(&mock).await;
        let tab = login_as(&state, Role::Admin).await;

        let response = browser().get(format!("{}/restaurantes", app)).header("cookie", cookie_for(tab)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(!state.sessions.load(tab).await.is_authenticated());
    }
}
