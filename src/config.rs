// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;

use crate::services::{
    ApiClient, AuthService, CnpjService, DashboardService, LiveRegistry, ReportService, SessionStore, UserService,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub bind_addr: String,
    pub http_timeout: Duration,
    pub alert_poll_interval: Duration,
    pub stream_retry: Duration,
    pub secure_cookies: bool,
    // Relatório PDF: pasta e nome da família de fontes
    pub pdf_font_dir: PathBuf,
    pub pdf_font_name: String,
}

// Variável numérica com default; valor inválido é erro de configuração
fn env_number(name: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} deve ser um número inteiro (recebido: {:?})", name, raw)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let secure_cookies = match env::var("SECURE_COOKIES") {
            Ok(raw) => raw
                .trim()
                .parse::<bool>()
                .with_context(|| format!("SECURE_COOKIES deve ser true ou false (recebido: {:?})", raw))?,
            Err(_) => false,
        };

        Ok(Self {
            api_url: env::var("INOVATECH_API_URL").unwrap_or_else(|_| "http://127.0.0.1:5001".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            http_timeout: Duration::from_secs(env_number("HTTP_TIMEOUT_SECS", 10)?),
            alert_poll_interval: Duration::from_millis(env_number("ALERT_POLL_INTERVAL_MS", 4000)?),
            stream_retry: Duration::from_millis(env_number("STREAM_RETRY_MS", 3000)?),
            secure_cookies,
            pdf_font_dir: env::var("PDF_FONT_DIR").unwrap_or_else(|_| "./fonts".to_string()).into(),
            pdf_font_name: env::var("PDF_FONT_NAME").unwrap_or_else(|_| "DejaVuSans".to_string()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    pub live: LiveRegistry,
    pub auth_service: AuthService,
    pub cnpj_service: CnpjService,
    pub user_service: UserService,
    pub dashboard_service: DashboardService,
    pub report_service: ReportService,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let api = ApiClient::new(&config.api_url, config.http_timeout)?;
        tracing::info!("✅ Cliente da API InovaTech pronto ({})", api.base_url());

        // --- Monta o gráfico de dependências ---
        let cnpj_service = CnpjService::new(api.clone());
        let auth_service = AuthService::new(api.clone(), cnpj_service.clone());
        let user_service = UserService::new(api.clone(), cnpj_service.clone());
        let dashboard_service = DashboardService::new(api);
        let report_service = ReportService::new(config.pdf_font_dir.clone(), config.pdf_font_name.clone());
        let live = LiveRegistry::new(dashboard_service.clone(), config.alert_poll_interval, config.stream_retry);

        Ok(Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            live,
            auth_service,
            cnpj_service,
            user_service,
            dashboard_service,
            report_service,
        })
    }
}
