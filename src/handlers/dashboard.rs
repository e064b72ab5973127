use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::Stream;
use serde_json::Value;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::session::CurrentSession,
    models::dashboard::{DashboardQuery, DashboardView, FilterUpdate, SimulationPayload, SimulationView, ViewAsPayload},
    services::{dashboard_service::series_csv, live::LiveDashboard},
};

// Painel da aba, montado no primeiro acesso
async fn mounted(app_state: &AppState, current: &CurrentSession) -> Result<Arc<LiveDashboard>, AppError> {
    let tab = current.require_tab()?;
    let dashboard = app_state.live.mount(tab, &current.session).await?;
    dashboard.ensure_active()?;
    Ok(dashboard)
}

// Filtros ativos do painel montado (ou os padrões)
async fn active_query(app_state: &AppState, current: &CurrentSession) -> DashboardQuery {
    match current.tab {
        Some(tab) => match app_state.live.get(tab).await {
            Some(dashboard) => dashboard.view().query,
            None => DashboardQuery::default(),
        },
        None => DashboardQuery::default(),
    }
}

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Estado atual do painel", body = DashboardView),
        (status = 303, description = "Sem sessão ou sessão expirada: vai para /login")
    )
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<DashboardView>, AppError> {
    let dashboard = mounted(&app_state, &current).await?;
    Ok(Json(dashboard.view()))
}

/// Stream SSE com um evento `snapshot` a cada mudança do painel.
/// Se a autorização cair em segundo plano, manda `auth` e fecha.
/// Fechar a última conexão desmonta o painel da aba.
#[utoipa::path(
    get,
    path = "/dashboard/live",
    tag = "Dashboard",
    responses(
        (status = 200, description = "text/event-stream de DashboardView; `auth` (data: /login) encerra o stream")
    )
)]
pub async fn live_updates(
    State(app_state): State<AppState>,
    current: CurrentSession,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let tab = current.require_tab()?;
    let dashboard = mounted(&app_state, &current).await?;
    let receiver = dashboard.subscribe();
    let watch = app_state.live.watch(tab, &dashboard);
    let sessions = app_state.sessions.clone();

    let stream = futures::stream::unfold(Some((receiver, watch, true)), move |state| {
        let sessions = sessions.clone();
        async move {
            let (mut receiver, watch, first) = state?;
            // o canal fecha quando o painel é desmontado
            if !first {
                receiver.changed().await.ok()?;
            }
            if watch.auth_lost() {
                sessions.clear(tab).await;
                tracing::info!("Stream do painel encerrado: autorização perdida (aba {})", tab);
                return Some((Ok::<_, Infallible>(Event::default().event("auth").data("/login")), None));
            }
            let view = receiver.borrow_and_update().clone();
            let event = Event::default()
                .event("snapshot")
                .json_data(&view)
                .unwrap_or_else(|e| {
                    tracing::warn!("Falha ao serializar o painel: {}", e);
                    Event::default().event("snapshot")
                });
            Some((Ok::<_, Infallible>(event), Some((receiver, watch, false))))
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[utoipa::path(
    delete,
    path = "/dashboard/live",
    tag = "Dashboard",
    responses(
        (status = 204, description = "Painel desmontado (stream e alertas encerrados)")
    )
)]
pub async fn unmount_dashboard(State(app_state): State<AppState>, current: CurrentSession) -> StatusCode {
    if let Some(tab) = current.tab {
        app_state.live.unmount(tab).await;
    }
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    put,
    path = "/dashboard/filters",
    tag = "Dashboard",
    request_body = FilterUpdate,
    responses(
        (status = 200, description = "Painel recarregado com os novos filtros", body = DashboardView)
    )
)]
pub async fn update_filters(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Json(update): Json<FilterUpdate>,
) -> Result<Json<DashboardView>, AppError> {
    let dashboard = mounted(&app_state, &current).await?;
    dashboard.update_filters(update).await?;
    Ok(Json(dashboard.view()))
}

#[utoipa::path(
    put,
    path = "/dashboard/view-as",
    tag = "Dashboard",
    request_body = ViewAsPayload,
    responses(
        (status = 200, description = "Série por canal refeita para o CNPJ escolhido (somente admin)", body = DashboardView)
    )
)]
pub async fn view_as(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Json(payload): Json<ViewAsPayload>,
) -> Result<Json<DashboardView>, AppError> {
    let dashboard = mounted(&app_state, &current).await?;
    dashboard.view_as(payload.cnpj).await?;
    Ok(Json(dashboard.view()))
}

#[utoipa::path(
    post,
    path = "/dashboard/simulate",
    tag = "Dashboard",
    request_body = SimulationPayload,
    responses(
        (status = 200, description = "Projeção calculada pela API", body = SimulationView),
        (status = 400, description = "Investimento ou duração inválidos")
    )
)]
pub async fn simulate(
    State(app_state): State<AppState>,
    current: CurrentSession,
    Json(payload): Json<SimulationPayload>,
) -> Result<Json<SimulationView>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let view = app_state.dashboard_service.simulate(&current.session, &payload).await?;
    Ok(Json(view))
}

#[utoipa::path(
    get,
    path = "/dashboard/export/csv",
    tag = "Dashboard",
    responses(
        (status = 200, description = "CSV de pedidos gerado pela API (filtros ativos)", content_type = "text/csv")
    )
)]
pub async fn export_csv(State(app_state): State<AppState>, current: CurrentSession) -> Result<Response, AppError> {
    let query = active_query(&app_state, &current).await;
    let (content_type, bytes) = app_state.dashboard_service.export_csv(&current.session, &query).await?;
    let content_type = content_type
        .filter(|c| c.starts_with("text/csv"))
        .unwrap_or_else(|| "text/csv".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, "attachment; filename=pedidos.csv".to_string()),
        ],
        bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/dashboard/export/series",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Série exibida no painel (hora,pedidos)", content_type = "text/csv")
    )
)]
pub async fn export_series(State(app_state): State<AppState>, current: CurrentSession) -> Result<Response, AppError> {
    let dashboard = mounted(&app_state, &current).await?;
    let bytes = series_csv(&dashboard.view().time_series)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=serie_pedidos.csv"),
        ],
        bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/dashboard/export/pdf",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Relatório com os KPIs visíveis e as sugestões", content_type = "application/pdf"),
        (status = 500, description = "Fontes do relatório ausentes no servidor")
    )
)]
pub async fn export_pdf(State(app_state): State<AppState>, current: CurrentSession) -> Result<Response, AppError> {
    let dashboard = mounted(&app_state, &current).await?;
    let pdf_bytes = app_state.report_service.render_kpi_report(&dashboard.view())?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "attachment; filename=relatorio_inovatech.pdf"),
        ],
        pdf_bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/campanhas",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Campanhas (lista vazia se a API falhar)", body = Vec<Value>)
    )
)]
pub async fn campaigns(
    State(app_state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<Vec<Value>>, AppError> {
    let rows = app_state.dashboard_service.campaigns(&current.session).await?;
    Ok(Json(rows))
}
