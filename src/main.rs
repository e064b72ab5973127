//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppConfig, AppState};
use crate::middleware::{
    guard::{admin_guard, auth_guard, fallback_redirect, root_redirect},
    navigation::navigation_controller,
};

/// Todas as rotas do painel, já com guardas e o controlador de navegação.
pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let public_routes = Router::new()
        .route("/login", get(handlers::auth::login_page).post(handlers::auth::login))
        .route("/signup", post(handlers::auth::signup))
        .route("/cnpj/check", post(handlers::auth::check_cnpj))
        .route("/forgot", post(handlers::auth::reset_password))
        .route("/reset", post(handlers::auth::reset_password))
        .route("/onboarding", post(handlers::auth::onboarding))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(docs::ApiDoc::openapi()) }));

    // Exigem sessão
    let user_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route(
            "/dashboard/live",
            get(handlers::dashboard::live_updates).delete(handlers::dashboard::unmount_dashboard),
        )
        .route("/dashboard/filters", put(handlers::dashboard::update_filters))
        .route("/dashboard/view-as", put(handlers::dashboard::view_as))
        .route("/dashboard/simulate", post(handlers::dashboard::simulate))
        .route("/dashboard/export/csv", get(handlers::dashboard::export_csv))
        .route("/dashboard/export/series", get(handlers::dashboard::export_series))
        .route("/dashboard/export/pdf", get(handlers::dashboard::export_pdf))
        .route("/campanhas", get(handlers::dashboard::campaigns))
        .route("/configuracoes", get(handlers::auth::profile))
        .route("/logout", post(handlers::auth::logout))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Exigem perfil admin
    let admin_routes = Router::new()
        .route("/restaurantes", get(handlers::admin::restaurants))
        .route(
            "/admin/cnpj",
            get(handlers::admin::list_cnpjs).post(handlers::admin::register_cnpj),
        )
        .route("/admin/cnpj/{id}/approve", put(handlers::admin::approve_cnpj))
        .route(
            "/admin/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route(
            "/admin/users/{id}",
            put(handlers::admin::update_user).delete(handlers::admin::delete_user),
        )
        .route("/admin/dev/seed-more", post(handlers::admin::seed_more))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    // Combina tudo; o controlador de navegação é a camada mais externa
    Router::new()
        .route("/", get(root_redirect))
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .fallback(fallback_redirect)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            navigation_controller,
        ))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = AppConfig::from_env().context("Falha ao ler a configuração")?;
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config).context("Falha ao inicializar o estado da aplicação.")?;

    let app = build_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
