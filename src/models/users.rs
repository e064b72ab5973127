// src/models/users.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::auth::Role;

// Regras para criar/editar ADMIN
pub const ADMIN_DOMAINS: [&str; 2] = ["cannoli.com.br", "inovatech.com.br"];
pub const ADMIN_CODES: [&str; 2] = ["CANNOLI", "INOVATECH"];

// Usuário como a API devolve
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    pub id: i64,
    pub nome: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub cnpj: Option<String>,
    pub codigo_cannoli: Option<String>,
    pub created_at: Option<String>,
}

// Formulário de criação/edição. Também é o corpo enviado à API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo_cannoli: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub senha: Option<String>,
}
