// src/models/cnpj.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CnpjStatus {
    Aprovado,
    Pendente,
}

// Pré-cadastro de CNPJ. O mesmo formato serve ao formulário e à API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CnpjRequestPayload {
    #[serde(default)]
    #[schema(example = "12.345.678/0001-90")]
    pub cnpj: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razao_social: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome_fantasia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contato_email: Option<String>,
}

impl CnpjRequestPayload {
    /// Campos opcionais vazios viram "ausentes"; e-mail de contato em minúsculas.
    pub fn with_digits(self, digits: String) -> Self {
        Self {
            cnpj: digits,
            razao_social: non_empty(self.razao_social),
            nome_fantasia: non_empty(self.nome_fantasia),
            contato_email: non_empty(self.contato_email.map(|e| e.to_lowercase())),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct CnpjRequestResponse {
    pub status: CnpjStatus,
}

// Botão "Verificar CNPJ" do cadastro
#[derive(Debug, Deserialize, ToSchema)]
pub struct CnpjCheckPayload {
    #[serde(default)]
    pub cnpj: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CnpjStatusView {
    pub cnpj: String,
    pub status: CnpjStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CnpjEntry {
    pub id: i64,
    pub cnpj: String,
    pub razao_social: Option<String>,
    pub nome_fantasia: Option<String>,
    pub contato_email: Option<String>,
    #[serde(default)]
    pub approved: bool,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApprovePayload {
    pub approved: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    pub fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}
