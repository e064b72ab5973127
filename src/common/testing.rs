// src/common/testing.rs
// Backend InovaTech de mentira + helpers para subir o BFF em testes.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::{
    config::{AppConfig, AppState},
    models::auth::{Role, Session},
};

#[derive(Debug, Clone)]
enum MockBody {
    Json(Value),
    Sse(Vec<Value>),
    Text { content_type: &'static str, body: String },
}

#[derive(Debug, Clone)]
pub struct MockReply {
    status: StatusCode,
    body: MockBody,
    delay: Option<Duration>,
}

impl MockReply {
    pub fn json(body: Value) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: MockBody::Json(body),
            delay: None,
        }
    }

    // Cada valor vira uma linha "data: ..." e o stream fecha no fim
    pub fn sse(events: Vec<Value>) -> Self {
        Self { status: StatusCode::OK, body: MockBody::Sse(events), delay: None }
    }

    pub fn text(content_type: &'static str, body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: MockBody::Text { content_type, body: body.to_string() },
            delay: None,
        }
    }

    pub fn delayed(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }
}

impl IntoResponse for MockReply {
    fn into_response(self) -> Response {
        match self.body {
            MockBody::Json(body) => (self.status, Json(body)).into_response(),
            MockBody::Sse(events) => {
                let body: String = events.iter().map(|e| format!("data: {}\n\n", e)).collect();
                (self.status, [(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
            }
            MockBody::Text { content_type, body } => {
                (self.status, [(header::CONTENT_TYPE, content_type)], body).into_response()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct MockState {
    routes: HashMap<(Method, String), VecDeque<MockReply>>,
    requests: Vec<RecordedRequest>,
}

/// Respostas enfileiradas por (método, caminho). A última da fila é reaproveitada.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        self.state
            .lock()
            .unwrap()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn hits(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    pub async fn spawn(&self) -> String {
        let app = Router::new().fallback(handle).with_state(self.clone());
        serve(app).await
    }
}

async fn handle(
    State(mock): State<MockBackend>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let reply = {
        let mut state = mock.state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: uri.path().to_string(),
            query,
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });

        match state.routes.get_mut(&(method, uri.path().to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
    };

    let Some(reply) = reply else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "rota não mockada"}))).into_response();
    };
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    reply.into_response()
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// --- BFF ---

pub fn test_config(api_url: &str) -> AppConfig {
    AppConfig {
        api_url: api_url.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        http_timeout: Duration::from_secs(2),
        alert_poll_interval: Duration::from_millis(100),
        stream_retry: Duration::from_millis(100),
        secure_cookies: false,
        pdf_font_dir: "./fonts".into(),
        pdf_font_name: "DejaVuSans".to_string(),
    }
}

/// Sobe o router real apontando para o backend mockado.
pub async fn spawn_app(mock: &MockBackend) -> (String, AppState) {
    let api_url = mock.spawn().await;
    spawn_app_with(test_config(&api_url)).await
}

pub async fn spawn_app_with(config: AppConfig) -> (String, AppState) {
    let state = AppState::new(config).unwrap();
    let url = serve(crate::build_router(state.clone())).await;
    (url, state)
}

/// Cliente do "navegador": sem seguir redirects, para podermos inspecioná-los.
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

pub fn cookie_for(tab: Uuid) -> String {
    format!("{}={}", crate::middleware::session::SESSION_COOKIE, tab)
}

pub fn session_as(role: Role) -> Session {
    Session {
        token: "token-de-teste".into(),
        role,
        name: "Teste".into(),
        email: "teste@inovatech.com.br".into(),
        cnpj: match role {
            Role::Admin => None,
            Role::Cliente => Some("12345678000190".into()),
        },
    }
}

/// Cria uma aba já logada e devolve o id dela.
pub async fn login_as(state: &AppState, role: Role) -> Uuid {
    let tab = Uuid::new_v4();
    state.sessions.establish(tab, &session_as(role)).await.unwrap();
    tab
}

/// Mocks mínimos para montar o painel sem erros.
pub fn mock_dashboard(mock: &MockBackend) {
    mock.on(Method::GET, "/filters/options", MockReply::json(json!({
        "periods": ["24h", "7d", "30d"],
        "channels": ["iFood", "Delivery Próprio"],
        "locations": ["Centro", "Zona Sul", "Zona Norte"]
    })));
    mock.on(Method::GET, "/metrics", MockReply::json(json!({
        "kpis": {"pedidos": 10, "ticketMedio": 12.345, "churn": 4.2, "clientesAtivos": 80},
        "serie": [{"hora": "10h", "pedidos": 3}, {"hora": "11h", "pedidos": 7}]
    })));
    mock.on(Method::GET, "/panel/by-channel", MockReply::json(json!({"iFood": 6, "Delivery Próprio": 4})));
    mock.on(Method::GET, "/panel/top-items", MockReply::json(json!([{"item": "Cannoli", "qtd": 5, "revenue": 90.5}])));
    mock.on(Method::GET, "/suggestions", MockReply::json(json!(["Ative cupom no iFood"])));
    mock.on(Method::GET, "/series/by-channel", MockReply::json(json!({
        "labels": ["seg", "ter"],
        "series": {"iFood": [1, 2], "Delivery Próprio": [0, 3]},
        "channels": ["iFood", "Delivery Próprio"]
    })));
    mock.on(Method::GET, "/alerts", MockReply::json(json!([])));
    mock.on(Method::GET, "/stream/kpis", MockReply::sse(vec![]));
}
