// src/services/cnpj_service.rs

use std::collections::HashSet;

use serde::de::IgnoredAny;

use crate::{
    common::{
        cnpj::{format_cnpj, normalize_cnpj, only_digits},
        error::AppError,
    },
    models::{
        auth::Session,
        cnpj::{ApprovePayload, CnpjCheckPayload, CnpjEntry, CnpjRequestPayload, CnpjRequestResponse, CnpjStatus, CnpjStatusView},
    },
    services::gateway::ApiClient,
};

#[derive(Clone)]
pub struct CnpjService {
    api: ApiClient,
}

impl CnpjService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// POST /cnpj/request com o CNPJ já reduzido a dígitos.
    pub async fn submit(&self, session: &Session, payload: CnpjRequestPayload) -> Result<CnpjStatus, AppError> {
        let response: CnpjRequestResponse = self.api.post_json(session, "/cnpj/request", &payload).await?;
        tracing::debug!("CNPJ {} está {:?}", format_cnpj(&payload.cnpj), response.status);
        Ok(response.status)
    }

    /// Pré-cadastro (onboarding e cadastro pelo admin).
    /// CNPJ inválido é recusado antes de qualquer chamada.
    pub async fn request(&self, session: &Session, payload: CnpjRequestPayload) -> Result<CnpjStatusView, AppError> {
        let digits = normalize_cnpj(&payload.cnpj)?;
        let status = self
            .submit(session, payload.with_digits(digits.clone()))
            .await
            .map_err(|e| e.or_message("Não foi possível enviar. Tente novamente."))?;

        let message = match status {
            CnpjStatus::Aprovado => "CNPJ já aprovado ✅ Você já pode criar sua conta como Cliente.",
            CnpjStatus::Pendente => "Solicitação enviada ✅ Aguarde um admin aprovar seu CNPJ para finalizar o cadastro.",
        };
        Ok(CnpjStatusView { cnpj: digits, status, message: message.to_string() })
    }

    // Botão "Verificar CNPJ" do cadastro
    pub async fn check(&self, payload: CnpjCheckPayload) -> Result<CnpjStatusView, AppError> {
        let digits = normalize_cnpj(&payload.cnpj)?;
        let request = CnpjRequestPayload { contato_email: payload.email, ..Default::default() };
        let status = self
            .submit(&Session::anonymous(), request.with_digits(digits.clone()))
            .await
            .map_err(|e| e.or_message("Não foi possível verificar o CNPJ. Tente novamente."))?;

        let message = match status {
            CnpjStatus::Aprovado => "CNPJ aprovado. Você já pode criar a conta.",
            CnpjStatus::Pendente => "CNPJ cadastrado e pendente de aprovação pelo admin.",
        };
        Ok(CnpjStatusView { cnpj: digits, status, message: message.to_string() })
    }

    pub async fn list(&self, session: &Session, term: Option<&str>) -> Result<Vec<CnpjEntry>, AppError> {
        let query: Vec<(&str, String)> = term.map(|q| ("q", q.to_string())).into_iter().collect();
        self.api
            .get_json(session, "/cnpj", &query)
            .await
            .map_err(|e| e.or_message("Falha ao carregar CNPJs."))
    }

    /// Aprova/reprova e devolve a lista atualizada.
    pub async fn approve(&self, session: &Session, id: i64, approved: bool) -> Result<Vec<CnpjEntry>, AppError> {
        let _: IgnoredAny = self
            .api
            .put_json(session, &format!("/cnpj/{}/approve", id), &ApprovePayload { approved })
            .await
            .map_err(|e| e.or_message("Erro ao atualizar CNPJ."))?;
        tracing::info!("CNPJ #{} {}", id, if approved { "aprovado" } else { "reprovado" });
        self.list(session, None).await
    }

    /// CNPJs aprovados (só dígitos), usados na validação de usuários cliente.
    pub async fn approved_set(&self, session: &Session) -> Result<HashSet<String>, AppError> {
        Ok(self
            .list(session, None)
            .await?
            .into_iter()
            .filter(|entry| entry.approved)
            .map(|entry| only_digits(&entry.cnpj))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::testing::{session_as, MockBackend, MockReply};
    use crate::models::auth::Role;
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    async fn service_for(mock: &MockBackend) -> CnpjService {
        let url = mock.spawn().await;
        CnpjService::new(ApiClient::new(&url, Duration::from_secs(2)).unwrap())
    }

    #[tokio::test]
    async fn short_cnpj_is_rejected_without_network() {
        let mock = MockBackend::new();
        let service = service_for(&mock).await;

        let payload = CnpjRequestPayload { cnpj: "12.345.678/0001".into(), ..Default::default() };
        let err = service.request(&Session::anonymous(), payload).await.unwrap_err();
        assert_eq!(err.to_string(), "Informe um CNPJ válido com 14 dígitos.");
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn request_sends_digits_and_trimmed_fields() {
        let mock = MockBackend::new();
        mock.on(Method::POST, "/cnpj/request", MockReply::json(json!({"ok": true, "status": "pendente"})));
        let service = service_for(&mock).await;

        let payload = CnpjRequestPayload {
            cnpj: "12.345.678/0001-90".into(),
            razao_social: Some("  ".into()),
            nome_fantasia: Some("Cannoli Centro".into()),
            contato_email: Some(" Dono@Cannoli.com.br ".into()),
        };
        let view = service.request(&Session::anonymous(), payload).await.unwrap();
        assert_eq!(view.status, CnpjStatus::Pendente);
        assert!(view.message.starts_with("Solicitação enviada"));

        let body = &mock.requests_to(Method::POST, "/cnpj/request")[0].body;
        assert_eq!(body, &json!({
            "cnpj": "12345678000190",
            "nome_fantasia": "Cannoli Centro",
            "contato_email": "dono@cannoli.com.br"
        }));
    }

    #[tokio::test]
    async fn approve_returns_refreshed_list_and_approved_set() {
        let mock = MockBackend::new();
        mock.on(Method::PUT, "/cnpj/7/approve", MockReply::json(json!({"ok": true})));
        mock.on(Method::GET, "/cnpj", MockReply::json(json!([
            {"id": 7, "cnpj": "12345678000190", "approved": true},
            {"id": 8, "cnpj": "98.765.432/0001-10", "approved": false}
        ])));
        let service = service_for(&mock).await;
        let admin = session_as(Role::Admin);

        let list = service.approve(&admin, 7, true).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(mock.requests_to(Method::PUT, "/cnpj/7/approve")[0].body, json!({"approved": true}));

        let approved = service.approved_set(&admin).await.unwrap();
        assert!(approved.contains("12345678000190"));
        assert!(!approved.contains("98765432000110"));
    }
}
