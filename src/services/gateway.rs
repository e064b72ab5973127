// src/services/gateway.rs

use std::time::Duration;

use anyhow::Context;
use eventsource_stream::{Event, Eventsource};
use futures::{Stream, StreamExt};
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{common::error::AppError, models::auth::Session};

// Corpo de erro padrão da API: {"error": "..."}
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Único ponto de saída para a API da InovaTech.
/// Anexa o token da sessão e classifica as falhas; nunca decide navegação.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        // O timeout total vai por requisição, senão o stream SSE morreria junto
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .context("Falha ao montar o cliente HTTP")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, session: &Session) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if session.is_authenticated() {
            builder.bearer_auth(&session.token)
        } else {
            builder
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AppError> {
        let response = builder
            .timeout(self.timeout)
            .send()
            .await
            .map_err(AppError::NetworkUnavailable)?;
        Self::classify(response).await
    }

    async fn classify(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .filter(|m| !m.trim().is_empty());

        tracing::debug!("API respondeu {} ({:?})", status, message);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::AuthExpired {
                status: status.as_u16(),
                message,
            }),
            _ => Err(AppError::Remote { status: status.as_u16(), message }),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
        let bytes = response.bytes().await.map_err(AppError::NetworkUnavailable)?;
        // Resposta sem corpo vira `null`
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };

        serde_json::from_slice(body).map_err(|e| {
            tracing::warn!("Resposta da API em formato inesperado: {}", e);
            AppError::Remote { status: StatusCode::BAD_GATEWAY.as_u16(), message: None }
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self.send(self.request(Method::GET, path, session).query(query)).await?;
        Self::decode(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self.send(self.request(Method::POST, path, session).json(body)).await?;
        Self::decode(response).await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self.send(self.request(Method::PUT, path, session).json(body)).await?;
        Self::decode(response).await
    }

    pub async fn delete(&self, session: &Session, path: &str) -> Result<(), AppError> {
        self.send(self.request(Method::DELETE, path, session)).await?;
        Ok(())
    }

    /// Download de arquivo: bytes + content-type informado pela API.
    pub async fn get_bytes(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(Option<String>, Vec<u8>), AppError> {
        let response = self.send(self.request(Method::GET, path, session).query(query)).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(AppError::NetworkUnavailable)?;
        Ok((content_type, bytes.to_vec()))
    }

    /// Abre um canal SSE. Sem timeout total: a conexão fica aberta até a API fechar.
    pub async fn open_event_stream(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<impl Stream<Item = Result<Event, AppError>> + Send + 'static, AppError> {
        let response = self
            .request(Method::GET, path, session)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(AppError::NetworkUnavailable)?;
        let response = Self::classify(response).await?;

        Ok(response.bytes_stream().eventsource().map(|event| {
            event.map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Stream SSE interrompido: {}", e)))
        }))
    }
}
