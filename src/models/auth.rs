// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// Perfis que a API conhece. Qualquer coisa diferente de "admin" é tratada como cliente.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    Cliente,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cliente => "cliente",
        }
    }

    // Rótulo mostrado nas telas de login/reset
    pub fn profile_label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrativo",
            Role::Cliente => "Cliente",
        }
    }
}

/// Identidade da aba. Token vazio significa "não autenticado".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub cnpj: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// --- Formulários (browser -> BFF) ---

// A checagem de login é feita à mão depois do trim, igual ao formulário.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginPayload {
    #[serde(default)]
    #[schema(example = "admin@inovatech.com.br")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub role: Option<Role>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    #[serde(default)]
    pub role: Role,

    #[validate(length(min = 1, message = "Preencha nome, e-mail e senha."))]
    #[serde(default)]
    pub nome: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[serde(default)]
    pub email: String,

    #[validate(length(min = 6, message = "Senha muito curta (mínimo 6)."))]
    #[serde(default)]
    pub senha: String,

    #[validate(must_match(other = "senha", message = "Confirmação de senha não confere."))]
    #[serde(default)]
    pub confirmacao: String,

    pub cnpj: Option<String>,
    pub admin_code: Option<String>,
}

impl SignupPayload {
    pub fn normalized(mut self) -> Self {
        self.nome = self.nome.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.senha = self.senha.trim().to_string();
        self.confirmacao = self.confirmacao.trim().to_string();
        self
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordPayload {
    #[validate(email(message = "E-mail inválido."))]
    #[serde(default)]
    pub email: String,

    #[validate(length(min = 6, message = "Senha muito curta (mín. 6)."))]
    #[serde(default)]
    pub password: String,

    #[validate(must_match(other = "password", message = "As senhas não conferem."))]
    #[serde(default)]
    pub confirmacao: String,
}

impl ResetPasswordPayload {
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_lowercase();
        self.password = self.password.trim().to_string();
        self.confirmacao = self.confirmacao.trim().to_string();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub role: Option<Role>,
}

// --- Contrato da API da InovaTech ---

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub role: Role,
    pub name: Option<String>,
    pub cnpj: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub role: Role,
    pub nome: String,
    pub email: String,
    pub senha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct OkResponse {
    #[serde(default)]
    pub ok: bool,
    pub error: Option<String>,
}

// --- Respostas do BFF ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginView {
    pub role: Role,
    pub profile: String,
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub redirect_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// Resposta de fluxos que terminam voltando ao login (cadastro, reset)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowOutcome {
    pub message: String,
    pub redirect_to: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileView {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub cnpj: Option<String>,
}

impl From<&Session> for ProfileView {
    fn from(session: &Session) -> Self {
        Self {
            name: session.name.clone(),
            email: session.email.clone(),
            role: session.role,
            cnpj: session.cnpj.clone(),
        }
    }
}
