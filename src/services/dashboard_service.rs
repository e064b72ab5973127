// src/services/dashboard_service.rs

use std::{collections::BTreeMap, str::FromStr};

use anyhow::Context;
use futures::Stream;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::IgnoredAny;
use serde_json::{json, Value};

use crate::{
    common::error::AppError,
    models::{
        auth::Session,
        dashboard::{
            AdminOverview, Alert, DashboardQuery, DashboardSnapshot, DashboardView, FilterOptions, KpiMap,
            LocationPerformance, MetricsResponse, Phase, SeriesPoint, SimulationPayload, SimulationRequest,
            SimulationResponse, SimulationView, StackedSeries, TopItem, TopRestaurant,
        },
    },
    services::gateway::ApiClient,
};

pub const KPI_TOTAL_SALES: &str = "totalVendas";
pub const KPI_ORDERS: &str = "pedidos";
pub const KPI_TICKET: &str = "ticketMedio";
pub const KPI_CHURN: &str = "churn";
pub const KPI_ACTIVE_CLIENTS: &str = "clientesAtivos";

#[derive(Clone)]
pub struct DashboardService {
    api: ApiClient,
}

impl DashboardService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn fetch_options(&self, session: &Session) -> Result<FilterOptions, AppError> {
        self.api.get_json(session, "/filters/options", &[]).await
    }

    pub async fn fetch_metrics(&self, session: &Session, query: &DashboardQuery) -> Result<MetricsResponse, AppError> {
        self.api.get_json(session, "/metrics", &query.metrics_params()).await
    }

    pub async fn fetch_channel_breakdown(
        &self,
        session: &Session,
        query: &DashboardQuery,
    ) -> Result<BTreeMap<String, f64>, AppError> {
        self.api.get_json(session, "/panel/by-channel", &query.breakdown_params()).await
    }

    pub async fn fetch_top_items(&self, session: &Session, query: &DashboardQuery) -> Result<Vec<TopItem>, AppError> {
        self.api.get_json(session, "/panel/top-items", &query.metrics_params()).await
    }

    pub async fn fetch_suggestions(&self, session: &Session) -> Result<Vec<String>, AppError> {
        self.api.get_json(session, "/suggestions", &[]).await
    }

    // O cnpj de "ver como" só segue para a API quando quem pede é admin
    pub async fn fetch_stacked(&self, session: &Session, query: &DashboardQuery) -> Result<StackedSeries, AppError> {
        let params = query.stacked_params(session.is_admin());
        self.api.get_json(session, "/series/by-channel", &params).await
    }

    pub async fn fetch_alerts(&self, session: &Session) -> Result<Vec<Alert>, AppError> {
        self.api.get_json(session, "/alerts", &[]).await
    }

    pub async fn open_kpi_stream(
        &self,
        session: &Session,
    ) -> Result<impl Stream<Item = Result<eventsource_stream::Event, AppError>> + Send + 'static, AppError> {
        self.api.open_event_stream(session, "/stream/kpis").await
    }

    /// Projeção do simulador: só repassa o que a API calculou.
    pub async fn simulate(&self, session: &Session, payload: &SimulationPayload) -> Result<SimulationView, AppError> {
        let request = SimulationRequest {
            canal: &payload.channel,
            investimento: payload.investment,
            duracao_dias: payload.duration_days,
        };
        let response: SimulationResponse = self
            .api
            .post_json(session, "/simulate/campaign", &request)
            .await
            .map_err(|e| e.or_message("Não foi possível simular a campanha."))?;

        Ok(response.into())
    }

    pub async fn export_csv(
        &self,
        session: &Session,
        query: &DashboardQuery,
    ) -> Result<(Option<String>, Vec<u8>), AppError> {
        self.api
            .get_bytes(session, "/export/csv", &query.metrics_params())
            .await
            .map_err(|e| e.or_message("Falha ao exportar CSV."))
    }

    pub async fn seed_more(&self, session: &Session, days: u32) -> Result<(), AppError> {
        let _: IgnoredAny = self
            .api
            .post_json(session, "/dev/seed-more", &json!({ "days": days }))
            .await
            .map_err(|e| e.or_message("Falha ao gerar dados de demonstração."))?;
        tracing::info!("Dados de demonstração gerados ({} dias)", days);
        Ok(())
    }

    pub async fn campaigns(&self, session: &Session) -> Result<Vec<Value>, AppError> {
        degrade_to_empty("/panel/campaigns", self.api.get_json(session, "/panel/campaigns", &[]).await)
    }

    pub async fn restaurants(&self, session: &Session) -> Result<Vec<Value>, AppError> {
        degrade_to_empty("/admin/restaurantes", self.api.get_json(session, "/admin/restaurantes", &[]).await)
    }
}

// Feeds opcionais: só a perda de autorização sobe, o resto vira lista vazia
fn degrade_to_empty(path: &str, result: Result<Vec<Value>, AppError>) -> Result<Vec<Value>, AppError> {
    match result {
        Ok(rows) => Ok(rows),
        Err(e) if e.is_auth_expired() => Err(e),
        Err(e) => {
            tracing::warn!("{} indisponível, exibindo lista vazia: {}", path, e);
            Ok(Vec::new())
        }
    }
}

// --- Estado do painel ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    Metrics,
    ChannelBreakdown,
    TopItems,
    Suggestions,
    Stacked,
}

/// Último número de sequência aplicado numa fatia do snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceClock {
    committed: u64,
}

impl SliceClock {
    /// `true` se `seq` ainda pode ser aplicado (não é mais antigo que o último).
    pub fn admit(&mut self, seq: u64) -> bool {
        if seq < self.committed {
            return false;
        }
        self.committed = seq;
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SliceClocks {
    metrics: SliceClock,
    channel_breakdown: SliceClock,
    top_items: SliceClock,
    suggestions: SliceClock,
    stacked: SliceClock,
}

impl SliceClocks {
    pub fn clock(&mut self, slice: Slice) -> &mut SliceClock {
        match slice {
            Slice::Metrics => &mut self.metrics,
            Slice::ChannelBreakdown => &mut self.channel_breakdown,
            Slice::TopItems => &mut self.top_items,
            Slice::Suggestions => &mut self.suggestions,
            Slice::Stacked => &mut self.stacked,
        }
    }
}

#[derive(Debug, Default)]
pub struct DashboardState {
    pub phase: Phase,
    pub query: DashboardQuery,
    pub options: FilterOptions,
    pub snapshot: DashboardSnapshot,
    pub clocks: SliceClocks,
    // Ciclos completos emitidos / buscas da série empilhada emitidas
    pub issued: u64,
    pub stacked_issued: u64,
}

impl DashboardState {
    pub fn view(&self, is_admin: bool) -> DashboardView {
        let snapshot = &self.snapshot;
        DashboardView {
            phase: self.phase,
            query: self.query.clone(),
            options: self.options.clone(),
            kpis: visible_kpis(&snapshot.kpis, is_admin),
            total_sales: total_sales(&snapshot.kpis),
            time_series: snapshot.time_series.clone(),
            channel_breakdown: snapshot.channel_breakdown.clone(),
            stacked_series: snapshot.stacked_series.clone(),
            top_items: snapshot.top_items.clone(),
            alerts: snapshot.alerts.items().to_vec(),
            suggestions: snapshot.suggestions.clone(),
            refreshed_at: snapshot.refreshed_at,
            admin: is_admin.then(|| admin_overview(&snapshot.kpis, &snapshot.channel_breakdown, &self.options)),
        }
    }
}

// --- Derivações ---

// Fora da faixa do Decimal (ou NaN) conta como zero, com aviso no log
fn to_decimal(field: &str, value: f64) -> Decimal {
    match Decimal::from_str(&value.to_string()) {
        Ok(decimal) => decimal,
        Err(e) => {
            tracing::warn!("KPI {} = {} não cabe em Decimal ({}), usando 0", field, value, e);
            Decimal::ZERO
        }
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `totalVendas` quando a API manda; senão pedidos × ticket médio.
pub fn total_sales(kpis: &KpiMap) -> Decimal {
    if let Some(total) = kpis.get(KPI_TOTAL_SALES) {
        return round_money(to_decimal(KPI_TOTAL_SALES, *total));
    }
    let (Some(orders), Some(ticket)) = (kpis.get(KPI_ORDERS), kpis.get(KPI_TICKET)) else {
        return Decimal::ZERO;
    };
    let orders = to_decimal(KPI_ORDERS, *orders);
    let ticket = to_decimal(KPI_TICKET, *ticket);
    match orders.checked_mul(ticket) {
        Some(total) => round_money(total),
        None => {
            tracing::warn!("Pedidos × ticket médio estourou ({} × {}), total zerado", orders, ticket);
            Decimal::ZERO
        }
    }
}

/// Mescla campo a campo; o que chega por último prevalece.
pub fn merge_kpis(target: &mut KpiMap, patch: KpiMap) {
    target.extend(patch);
}

// Churn é informação interna: cliente não vê
pub fn visible_kpis(kpis: &KpiMap, is_admin: bool) -> KpiMap {
    let mut visible = kpis.clone();
    if !is_admin {
        visible.remove(KPI_CHURN);
    }
    visible
}

/// Mensagem `data:` do stream de KPIs. Campos não numéricos são ignorados.
pub fn parse_kpi_patch(data: &str) -> Option<KpiMap> {
    let fields: serde_json::Map<String, Value> = match serde_json::from_str(data) {
        Ok(fields) => fields,
        Err(e) => {
            tracing::debug!("Mensagem de KPI ignorada ({}): {}", e, data);
            return None;
        }
    };
    Some(
        fields
            .into_iter()
            .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
            .collect(),
    )
}

// Valor do canal i; ausente ou zero conta como 1
fn breakdown_factor(values: &[f64], i: usize) -> f64 {
    match values.get(i) {
        Some(v) if *v != 0.0 => *v,
        _ => 1.0,
    }
}

pub fn admin_overview(
    kpis: &KpiMap,
    channel_breakdown: &BTreeMap<String, f64>,
    options: &FilterOptions,
) -> AdminOverview {
    let factors: Vec<f64> = channel_breakdown.values().copied().collect();

    // Placeholders até a API expor um ranking de verdade
    let top_restaurantes = options
        .locations
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, nome)| TopRestaurant {
            nome: nome.clone(),
            valor: (breakdown_factor(&factors, i) * 1000.0 + 20000.0 - 3000.0 * i as f64).round() as i64,
            campanhas_ativas: 30 - 7 * i as i64,
        })
        .collect();

    let locations: Vec<&String> = options.locations.iter().take(5).collect();
    let desempenho_por_loja = LocationPerformance {
        labels: locations.iter().map(|l| l.to_string()).collect(),
        valores: (0..locations.len())
            .map(|i| (breakdown_factor(&factors, i) * 800.0 + 150000.0 - 12000.0 * i as f64).round() as i64)
            .collect(),
    };

    AdminOverview {
        restaurantes_ativos: options.locations.len(),
        vendas_totais_mes: total_sales(kpis),
        campanhas_ativas: 0,
        clientes_finais_ativos: kpis.get(KPI_ACTIVE_CLIENTS).copied().unwrap_or(0.0),
        top_restaurantes,
        desempenho_por_loja,
    }
}

/// CSV "hora,pedidos" da série exibida.
pub fn series_csv(points: &[SeriesPoint]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["hora", "pedidos"]).context("Falha ao gerar CSV")?;
    for point in points {
        writer
            .write_record([point.label.as_str(), point.value.to_string().as_str()])
            .context("Falha ao gerar CSV")?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("Falha ao gerar CSV: {}", e))?;
    Ok(bytes)
}
