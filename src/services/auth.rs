// src/services/auth.rs

use validator::Validate;

use crate::{
    common::{cnpj::normalize_cnpj, error::AppError},
    models::{
        auth::{
            FlowOutcome, LoginOutcome, LoginPayload, LoginQuery, LoginRequest, LoginResponse, OkResponse,
            ResetPasswordPayload, ResetRequest, Role, Session, SignupPayload, SignupRequest,
        },
        cnpj::{CnpjRequestPayload, CnpjStatus},
    },
    services::{cnpj_service::CnpjService, gateway::ApiClient},
};

const DEFAULT_LANDING: &str = "/dashboard";
pub const ADMIN_DOWNGRADE_WARNING: &str = "Você não tem perfil administrativo. Entrando como cliente.";

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    cnpj_service: CnpjService,
}

impl AuthService {
    pub fn new(api: ApiClient, cnpj_service: CnpjService) -> Self {
        Self { api, cnpj_service }
    }

    /// Autentica na API e devolve a sessão a gravar + para onde ir.
    pub async fn login(&self, payload: LoginPayload, query: &LoginQuery) -> Result<(Session, LoginOutcome), AppError> {
        let email = payload.email.trim().to_lowercase();
        let password = payload.password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::invalid("Preencha e-mail e senha."));
        }

        let response: LoginResponse = self
            .api
            .post_json(&Session::anonymous(), "/auth/login", &LoginRequest { email: &email, password })
            .await
            .map_err(|e| e.or_message("Falha no login. Verifique e-mail e senha."))?;

        let session = Session {
            token: response.token,
            role: response.role,
            name: response.name.unwrap_or_default(),
            email,
            cnpj: response.cnpj.filter(|c| !c.is_empty()),
        };
        tracing::info!("Login de {} ({})", session.email, session.role.as_str());

        let outcome = login_outcome(query, session.role);
        Ok((session, outcome))
    }

    pub async fn signup(&self, payload: SignupPayload) -> Result<FlowOutcome, AppError> {
        let payload = payload.normalized();
        payload.validate()?;

        let (cnpj, admin_code) = match payload.role {
            Role::Cliente => {
                let digits = normalize_cnpj(payload.cnpj.as_deref().unwrap_or_default())?;
                let request = CnpjRequestPayload { contato_email: Some(payload.email.clone()), ..Default::default() };
                let status = self
                    .cnpj_service
                    .submit(&Session::anonymous(), request.with_digits(digits.clone()))
                    .await
                    .map_err(|e| e.or_message("Não foi possível verificar o CNPJ. Tente novamente."))?;
                if status != CnpjStatus::Aprovado {
                    return Err(AppError::invalid(
                        "CNPJ não aprovado. Clique em 'Verificar CNPJ' e aguarde a aprovação do admin.",
                    ));
                }
                (Some(digits), None)
            }
            Role::Admin => {
                let code = payload.admin_code.as_deref().map(str::trim).unwrap_or_default();
                if code.is_empty() {
                    return Err(AppError::invalid("Informe o Código do Admin."));
                }
                (None, Some(code.to_string()))
            }
        };

        let request = SignupRequest {
            role: payload.role,
            nome: payload.nome,
            email: payload.email,
            senha: payload.senha,
            cnpj,
            admin_code,
        };
        let _: serde::de::IgnoredAny = self
            .api
            .post_json(&Session::anonymous(), "/auth/signup", &request)
            .await
            .map_err(|e| match e {
                AppError::Remote { status: 409, message: None } => AppError::Remote {
                    status: 409,
                    message: Some("E-mail já cadastrado.".to_string()),
                },
                other => other.or_message("Não foi possível criar a conta."),
            })?;

        tracing::info!("Conta criada para {} ({})", request.email, request.role.as_str());
        Ok(FlowOutcome {
            message: "Conta criada com sucesso! Faça login para entrar.".to_string(),
            redirect_to: login_path(request.role),
        })
    }

    pub async fn reset_password(&self, payload: ResetPasswordPayload, role: Role) -> Result<FlowOutcome, AppError> {
        let payload = payload.normalized();
        payload.validate()?;

        let request = ResetRequest { email: &payload.email, password: &payload.password };
        let response: OkResponse = self
            .api
            .post_json(&Session::anonymous(), "/auth/reset-basic", &request)
            .await
            .map_err(|e| e.or_message("Não foi possível atualizar a senha."))?;

        if !response.ok {
            return Err(AppError::Remote {
                status: 400,
                message: Some(response.error.unwrap_or_else(|| "Não foi possível atualizar a senha.".to_string())),
            });
        }

        Ok(FlowOutcome {
            message: "Senha atualizada com sucesso!".to_string(),
            redirect_to: login_path(role),
        })
    }
}

pub fn login_path(role: Role) -> String {
    format!("/login?role={}", role.as_str())
}

// Só caminhos locais: "/x" sim, "//host" e "http://..." não
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}

/// Para onde seguir depois do login.
/// Tela aberta como admin + perfil cliente na API: avisa e vai ao painel.
pub fn login_outcome(query: &LoginQuery, role: Role) -> LoginOutcome {
    if query.role == Some(Role::Admin) && role != Role::Admin {
        return LoginOutcome {
            redirect_to: DEFAULT_LANDING.to_string(),
            warning: Some(ADMIN_DOWNGRADE_WARNING.to_string()),
        };
    }
    LoginOutcome {
        redirect_to: safe_next(query.next.as_deref()).unwrap_or(DEFAULT_LANDING).to_string(),
        warning: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::testing::{MockBackend, MockReply};
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    async fn service_for(mock: &MockBackend) -> AuthService {
        let url = mock.spawn().await;
        let api = ApiClient::new(&url, Duration::from_secs(2)).unwrap();
        AuthService::new(api.clone(), CnpjService::new(api))
    }

    fn query(role: Option<Role>, next: Option<&str>) -> LoginQuery {
        LoginQuery { role, next: next.map(String::from) }
    }

    #[test]
    fn admin_page_with_client_role_warns_and_lands_on_dashboard() {
        let outcome = login_outcome(&query(Some(Role::Admin), Some("/admin/users")), Role::Cliente);
        assert_eq!(outcome.redirect_to, "/dashboard");
        assert_eq!(outcome.warning.as_deref(), Some(ADMIN_DOWNGRADE_WARNING));

        let outcome = login_outcome(&query(Some(Role::Admin), Some("/admin/users")), Role::Admin);
        assert_eq!(outcome.redirect_to, "/admin/users");
        assert_eq!(outcome.warning, None);
    }

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(login_outcome(&query(None, Some("//evil.com")), Role::Cliente).redirect_to, "/dashboard");
        assert_eq!(login_outcome(&query(None, Some("https://evil.com")), Role::Cliente).redirect_to, "/dashboard");
        assert_eq!(login_outcome(&query(None, Some("/campanhas")), Role::Cliente).redirect_to, "/campanhas");
        assert_eq!(login_outcome(&query(None, None), Role::Cliente).redirect_to, "/dashboard");
    }

    #[tokio::test]
    async fn login_normalizes_credentials_and_builds_session() {
        let mock = MockBackend::new();
        mock.on(Method::POST, "/auth/login", MockReply::json(json!({
            "token": "jwt", "role": "cliente", "name": "Bia", "cnpj": "12345678000190"
        })));
        let service = service_for(&mock).await;

        let payload = LoginPayload { email: "  Bia@Mail.COM ".into(), password: " segredo ".into() };
        let (session, outcome) = service.login(payload, &LoginQuery::default()).await.unwrap();

        assert_eq!(session.email, "bia@mail.com");
        assert_eq!(session.token, "jwt");
        assert_eq!(session.cnpj.as_deref(), Some("12345678000190"));
        assert_eq!(outcome.redirect_to, "/dashboard");
        assert_eq!(
            mock.requests_to(Method::POST, "/auth/login")[0].body,
            json!({"email": "bia@mail.com", "password": "segredo"})
        );
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_backend() {
        let mock = MockBackend::new();
        let service = service_for(&mock).await;
        let payload = LoginPayload { email: "  ".into(), password: "x".into() };
        let err = service.login(payload, &LoginQuery::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Preencha e-mail e senha.");
        assert!(mock.requests().is_empty());
    }

    fn signup(role: Role, cnpj: Option<&str>, admin_code: Option<&str>) -> SignupPayload {
        SignupPayload {
            role,
            nome: "Ana".into(),
            email: "ana@cannoli.com.br".into(),
            senha: "123456".into(),
            confirmacao: "123456".into(),
            cnpj: cnpj.map(String::from),
            admin_code: admin_code.map(String::from),
        }
    }

    #[tokio::test]
    async fn client_signup_requires_approved_cnpj() {
        let mock = MockBackend::new();
        mock.on(Method::POST, "/cnpj/request", MockReply::json(json!({"ok": true, "status": "pendente"})));
        let service = service_for(&mock).await;

        let err = service.signup(signup(Role::Cliente, Some("12.345.678/0001-90"), None)).await.unwrap_err();
        assert!(err.to_string().starts_with("CNPJ não aprovado"));
        assert_eq!(mock.hits(Method::POST, "/auth/signup"), 0);
        assert_eq!(mock.requests_to(Method::POST, "/cnpj/request")[0].body["cnpj"], "12345678000190");
    }

    #[tokio::test]
    async fn signup_conflict_without_message_reports_duplicate_email() {
        let mock = MockBackend::new();
        mock.on(Method::POST, "/auth/signup", MockReply::status(409, json!({})));
        let service = service_for(&mock).await;

        let err = service.signup(signup(Role::Admin, None, Some(" CANNOLI "))).await.unwrap_err();
        assert_eq!(err.to_string(), "E-mail já cadastrado.");
        assert_eq!(mock.requests_to(Method::POST, "/auth/signup")[0].body["adminCode"], "CANNOLI");

        let err = service.signup(signup(Role::Admin, None, None)).await.unwrap_err();
        assert_eq!(err.to_string(), "Informe o Código do Admin.");
    }

    #[tokio::test]
    async fn successful_signup_points_back_to_login_for_the_role() {
        let mock = MockBackend::new();
        mock.on(Method::POST, "/cnpj/request", MockReply::json(json!({"status": "aprovado"})));
        mock.on(Method::POST, "/auth/signup", MockReply::json(json!({"ok": true})));
        let service = service_for(&mock).await;

        let outcome = service.signup(signup(Role::Cliente, Some("12345678000190"), None)).await.unwrap();
        assert_eq!(outcome.redirect_to, "/login?role=cliente");
        let body = &mock.requests_to(Method::POST, "/auth/signup")[0].body;
        assert_eq!(body["cnpj"], "12345678000190");
        assert!(body.get("adminCode").is_none());
    }

    #[tokio::test]
    async fn reset_reports_backend_refusal() {
        let mock = MockBackend::new();
        mock.on(Method::POST, "/auth/reset-basic", MockReply::json(json!({"ok": false, "error": "Usuário não encontrado"})));
        let service = service_for(&mock).await;

        let payload = ResetPasswordPayload {
            email: "ana@mail.com".into(),
            password: "novasenha".into(),
            confirmacao: "novasenha".into(),
        };
        let err = service.reset_password(payload, Role::Cliente).await.unwrap_err();
        assert_eq!(err.to_string(), "Usuário não encontrado");
    }
}
