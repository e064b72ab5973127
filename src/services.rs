pub mod auth;
pub mod cnpj_service;
pub mod dashboard_service;
pub mod gateway;
pub mod live;
pub mod report_service;
pub mod session;
pub mod user_service;

pub use auth::AuthService;
pub use cnpj_service::CnpjService;
pub use dashboard_service::DashboardService;
pub use gateway::ApiClient;
pub use live::LiveRegistry;
pub use report_service::ReportService;
pub use session::SessionStore;
pub use user_service::UserService;
