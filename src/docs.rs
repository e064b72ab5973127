// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "InovaTech Painel", description = "BFF do painel administrativo da InovaTech"),
    paths(
        // --- Auth ---
        handlers::auth::login_page,
        handlers::auth::login,
        handlers::auth::signup,
        handlers::auth::check_cnpj,
        handlers::auth::reset_password,
        handlers::auth::onboarding,
        handlers::auth::logout,
        handlers::auth::profile,

        // --- Dashboard ---
        handlers::dashboard::get_dashboard,
        handlers::dashboard::live_updates,
        handlers::dashboard::unmount_dashboard,
        handlers::dashboard::update_filters,
        handlers::dashboard::view_as,
        handlers::dashboard::simulate,
        handlers::dashboard::export_csv,
        handlers::dashboard::export_series,
        handlers::dashboard::export_pdf,
        handlers::dashboard::campaigns,

        // --- Admin ---
        handlers::admin::list_cnpjs,
        handlers::admin::register_cnpj,
        handlers::admin::approve_cnpj,
        handlers::admin::list_users,
        handlers::admin::create_user,
        handlers::admin::update_user,
        handlers::admin::delete_user,
        handlers::admin::seed_more,
        handlers::admin::restaurants,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::LoginPayload,
            models::auth::SignupPayload,
            models::auth::ResetPasswordPayload,
            models::auth::LoginView,
            models::auth::LoginOutcome,
            models::auth::FlowOutcome,
            models::auth::ProfileView,

            // --- CNPJ ---
            models::cnpj::CnpjStatus,
            models::cnpj::CnpjRequestPayload,
            models::cnpj::CnpjCheckPayload,
            models::cnpj::CnpjStatusView,
            models::cnpj::CnpjEntry,
            models::cnpj::ApprovePayload,

            // --- Users ---
            models::users::UserRecord,
            models::users::UserForm,

            // --- DASHBOARD ---
            models::dashboard::FilterOptions,
            models::dashboard::DashboardQuery,
            models::dashboard::FilterUpdate,
            models::dashboard::ViewAsPayload,
            models::dashboard::SeriesPoint,
            models::dashboard::TopItem,
            models::dashboard::StackedSeries,
            models::dashboard::Alert,
            models::dashboard::Phase,
            models::dashboard::TopRestaurant,
            models::dashboard::LocationPerformance,
            models::dashboard::AdminOverview,
            models::dashboard::DashboardView,
            models::dashboard::SimulationPayload,
            models::dashboard::SimulationView,
            models::dashboard::SeedPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Login, cadastro, senha e onboarding de CNPJ"),
        (name = "Dashboard", description = "Painel ao vivo, simulador e exportações"),
        (name = "Admin", description = "Whitelist de CNPJ, usuários e operação")
    )
)]
pub struct ApiDoc;
