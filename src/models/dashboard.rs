// src/models/dashboard.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// KPIs nomeados ("pedidos", "ticketMedio", "totalVendas", "churn"...).
pub type KpiMap = BTreeMap<String, f64>;

pub const DEFAULT_PERIOD: &str = "7d";
pub const ALERT_CAPACITY: usize = 5;

// 1. Filtros disponíveis (carregados uma vez por montagem)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct FilterOptions {
    #[serde(default)]
    pub periods: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

// 2. Parâmetros ativos do painel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub period: String,
    pub channel: Option<String>,
    pub location: Option<String>,
    // Só vale para admin, e só na série empilhada
    pub view_as_cnpj: Option<String>,
}

impl Default for DashboardQuery {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD.to_string(),
            channel: None,
            location: None,
            view_as_cnpj: None,
        }
    }
}

impl DashboardQuery {
    /// Parâmetros de /metrics, /panel/top-items e /export/csv.
    pub fn metrics_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("period", self.period.clone())];
        if let Some(channel) = &self.channel {
            params.push(("channel", channel.clone()));
        }
        if let Some(location) = &self.location {
            params.push(("location", location.clone()));
        }
        params
    }

    /// /panel/by-channel não filtra por canal.
    pub fn breakdown_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("period", self.period.clone())];
        if let Some(location) = &self.location {
            params.push(("location", location.clone()));
        }
        params
    }

    pub fn stacked_params(&self, is_admin: bool) -> Vec<(&'static str, String)> {
        let mut params = self.breakdown_params();
        if is_admin {
            if let Some(cnpj) = &self.view_as_cnpj {
                params.push(("cnpj", cnpj.clone()));
            }
        }
        params
    }

    /// Aplica a seleção do usuário. Devolve `true` se algo mudou
    /// (e portanto o painel precisa recarregar).
    pub fn apply(&mut self, update: FilterUpdate) -> bool {
        let before = self.clone();
        if let Some(period) = update.period.map(|p| p.trim().to_string()) {
            if !period.is_empty() {
                self.period = period;
            }
        }
        if let Some(channel) = update.channel {
            self.channel = blank_to_none(channel);
        }
        if let Some(location) = update.location {
            self.location = blank_to_none(location);
        }
        *self != before
    }
}

pub fn blank_to_none(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_string()) }
}

// Campo ausente = não mexe; string vazia = limpa o filtro
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FilterUpdate {
    pub period: Option<String>,
    pub channel: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ViewAsPayload {
    pub cnpj: Option<String>,
}

// 3. Respostas da API

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SeriesPoint {
    #[serde(rename = "hora")]
    pub label: String,
    #[serde(rename = "pedidos")]
    pub value: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsResponse {
    #[serde(default)]
    pub kpis: KpiMap,
    #[serde(default)]
    pub serie: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopItem {
    pub item: String,
    #[serde(default)]
    pub qtd: f64,
    #[serde(default)]
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StackedSeries {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub series: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    #[serde(default)]
    pub tipo: String,
    #[serde(default)]
    pub msg: String,
}

/// Fila limitada de alertas: os mais novos na frente, no máximo `ALERT_CAPACITY`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFeed {
    items: Vec<Alert>,
}

impl AlertFeed {
    pub fn push_batch(&mut self, batch: Vec<Alert>) {
        if batch.is_empty() {
            return;
        }
        let mut items = batch;
        items.append(&mut self.items);
        items.truncate(ALERT_CAPACITY);
        self.items = items;
    }

    pub fn items(&self) -> &[Alert] {
        &self.items
    }
}

// 4. Estado do painel

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Idle,
    LoadingInitial,
    Ready,
    LoadingRefresh,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub kpis: KpiMap,
    pub time_series: Vec<SeriesPoint>,
    pub channel_breakdown: BTreeMap<String, f64>,
    pub stacked_series: StackedSeries,
    pub top_items: Vec<TopItem>,
    pub alerts: AlertFeed,
    pub suggestions: Vec<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

// Placeholder: não é um ranking real, só mantém o formato do painel
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopRestaurant {
    pub nome: String,
    pub valor: i64,
    pub campanhas_ativas: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct LocationPerformance {
    pub labels: Vec<String>,
    pub valores: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub restaurantes_ativos: usize,
    #[schema(value_type = f64)]
    pub vendas_totais_mes: Decimal,
    pub campanhas_ativas: u32,
    pub clientes_finais_ativos: f64,
    pub top_restaurantes: Vec<TopRestaurant>,
    pub desempenho_por_loja: LocationPerformance,
}

/// O que o navegador recebe em GET /dashboard e no stream /dashboard/live.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub phase: Phase,
    pub query: DashboardQuery,
    pub options: FilterOptions,
    pub kpis: KpiMap,
    #[schema(value_type = f64)]
    pub total_sales: Decimal,
    pub time_series: Vec<SeriesPoint>,
    pub channel_breakdown: BTreeMap<String, f64>,
    pub stacked_series: StackedSeries,
    pub top_items: Vec<TopItem>,
    pub alerts: Vec<Alert>,
    pub suggestions: Vec<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub admin: Option<AdminOverview>,
}

// 5. Simulador de campanha

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPayload {
    #[serde(default = "default_sim_channel")]
    pub channel: String,
    #[validate(range(exclusive_min = 0.0, message = "O investimento deve ser maior que zero."))]
    pub investment: f64,
    #[validate(range(min = 1, message = "A duração deve ser de pelo menos 1 dia."))]
    pub duration_days: u32,
}

fn default_sim_channel() -> String {
    "Delivery Próprio".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest<'a> {
    pub canal: &'a str,
    pub investimento: f64,
    pub duracao_dias: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpectedKpis {
    #[serde(rename = "ticketMedio", default)]
    pub ticket_medio: f64,
    #[serde(default)]
    pub conversoes: f64,
}

#[derive(Debug, Deserialize)]
pub struct SimulationResponse {
    #[serde(default)]
    pub canal: String,
    #[serde(default)]
    pub uplift_pedidos: f64,
    #[serde(default)]
    pub proj_receita: f64,
    #[serde(default)]
    pub kpi_esperado: ExpectedKpis,
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationView {
    pub channel: String,
    pub uplift_orders: f64,
    pub projected_revenue: f64,
    pub expected_ticket: f64,
    pub expected_conversions: f64,
}

impl From<SimulationResponse> for SimulationView {
    fn from(r: SimulationResponse) -> Self {
        Self {
            channel: r.canal,
            uplift_orders: r.uplift_pedidos,
            projected_revenue: r.proj_receita,
            expected_ticket: r.kpi_esperado.ticket_medio,
            expected_conversions: r.kpi_esperado.conversoes,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SeedPayload {
    pub days: Option<u32>,
}
