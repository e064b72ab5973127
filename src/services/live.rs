// src/services/live.rs

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, Weak,
    },
    time::Duration,
};

use chrono::Utc;
use futures::StreamExt;
use tokio::{
    sync::{watch, RwLock},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::Session,
        dashboard::{blank_to_none, Alert, DashboardSnapshot, DashboardView, FilterUpdate, Phase},
    },
    services::dashboard_service::{merge_kpis, parse_kpi_patch, DashboardService, DashboardState, Slice},
};

/// Painel montado de uma aba: estado, tarefas de fundo e canal de publicação.
pub struct LiveDashboard {
    session: Session,
    service: DashboardService,
    state: RwLock<DashboardState>,
    views: watch::Sender<DashboardView>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    auth_lost: AtomicBool,
    // Conexões SSE abertas neste painel
    watchers: AtomicUsize,
}

impl LiveDashboard {
    fn new(service: DashboardService, session: Session) -> Self {
        let (views, _) = watch::channel(DashboardView::default());
        Self {
            session,
            service,
            state: RwLock::new(DashboardState::default()),
            views,
            tasks: Mutex::new(Vec::new()),
            auth_lost: AtomicBool::new(false),
            watchers: AtomicUsize::new(0),
        }
    }

    pub fn view(&self) -> DashboardView {
        self.views.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.views.subscribe()
    }

    /// Uma tarefa de fundo perdeu a autorização: o próximo acesso leva ao login.
    pub fn ensure_active(&self) -> Result<(), AppError> {
        if self.is_auth_lost() {
            return Err(AppError::AuthExpired { status: 401, message: None });
        }
        Ok(())
    }

    pub fn is_auth_lost(&self) -> bool {
        self.auth_lost.load(Ordering::Acquire)
    }

    // Acorda quem assiste o painel para que a perda chegue ao navegador
    fn mark_auth_lost(&self) {
        if !self.auth_lost.swap(true, Ordering::AcqRel) {
            tracing::info!("Autorização perdida no painel de {}", self.session.email);
            self.views.send_modify(|_| {});
        }
    }

    async fn publish(&self) {
        let view = self.state.read().await.view(self.session.is_admin());
        self.views.send_replace(view);
    }

    /// Idle -> LoadingInitial -> Ready, com stream e polling já rodando.
    async fn start(self: &Arc<Self>, alert_interval: Duration, stream_retry: Duration) -> Result<(), AppError> {
        {
            let mut tasks = self.tasks.lock().map_err(|_| anyhow::anyhow!("lock de tarefas envenenado"))?;
            tasks.push(tokio::spawn(run_push_stream(Arc::downgrade(self), stream_retry)));
            tasks.push(tokio::spawn(run_alert_poll(Arc::downgrade(self), alert_interval)));
        }

        let options = match self.service.fetch_options(&self.session).await {
            Ok(options) => options,
            Err(e) if e.is_auth_expired() => {
                self.mark_auth_lost();
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Opções de filtro indisponíveis: {}", e);
                Default::default()
            }
        };
        self.state.write().await.options = options;

        self.refresh().await
    }

    /// Ciclo completo: as cinco buscas correm juntas e cada uma aplica a sua fatia.
    pub async fn refresh(&self) -> Result<(), AppError> {
        self.ensure_active()?;

        let (seq, stacked_seq, query) = {
            let mut st = self.state.write().await;
            st.issued += 1;
            st.stacked_issued += 1;
            st.phase = match st.phase {
                Phase::Idle | Phase::LoadingInitial => Phase::LoadingInitial,
                Phase::Ready | Phase::LoadingRefresh => Phase::LoadingRefresh,
            };
            (st.issued, st.stacked_issued, st.query.clone())
        };
        self.publish().await;
        tracing::debug!("Ciclo {} do painel ({:?})", seq, query);

        let session = &self.session;
        let service = &self.service;
        let failures = tokio::join!(
            async {
                let result = service.fetch_metrics(session, &query).await;
                self.commit(Slice::Metrics, seq, result, |s, m| {
                    // busca explícita substitui o mapa inteiro
                    s.kpis = m.kpis;
                    s.time_series = m.serie;
                })
                .await
            },
            async {
                let result = service.fetch_channel_breakdown(session, &query).await;
                self.commit(Slice::ChannelBreakdown, seq, result, |s, v| s.channel_breakdown = v).await
            },
            async {
                let result = service.fetch_top_items(session, &query).await;
                self.commit(Slice::TopItems, seq, result, |s, v| s.top_items = v).await
            },
            async {
                let result = service.fetch_suggestions(session).await;
                self.commit(Slice::Suggestions, seq, result, |s, v| s.suggestions = v).await
            },
            async {
                let result = service.fetch_stacked(session, &query).await;
                self.commit(Slice::Stacked, stacked_seq, result, |s, v| s.stacked_series = v).await
            },
        );

        {
            let mut st = self.state.write().await;
            if seq == st.issued {
                st.phase = Phase::Ready;
                st.snapshot.refreshed_at = Some(Utc::now());
            }
        }
        self.publish().await;

        let (a, b, c, d, e) = failures;
        match a.or(b).or(c).or(d).or(e) {
            Some(err) => {
                self.mark_auth_lost();
                Err(err)
            }
            None => Ok(()),
        }
    }

    // Aplica uma fatia se ela não for mais velha que a última aplicada.
    // Falha vira fatia vazia; só a perda de autorização é devolvida.
    async fn commit<T: Default>(
        &self,
        slice: Slice,
        seq: u64,
        result: Result<T, AppError>,
        apply: impl FnOnce(&mut DashboardSnapshot, T),
    ) -> Option<AppError> {
        let (value, failure) = match result {
            Ok(value) => (value, None),
            Err(e) => {
                tracing::warn!("Fatia {:?} falhou, exibindo vazia: {}", slice, e);
                (T::default(), Some(e))
            }
        };

        {
            let mut st = self.state.write().await;
            if !st.clocks.clock(slice).admit(seq) {
                tracing::debug!("Resposta antiga de {:?} descartada (seq {})", slice, seq);
                return failure.filter(AppError::is_auth_expired);
            }
            apply(&mut st.snapshot, value);
        }
        self.publish().await;

        failure.filter(AppError::is_auth_expired)
    }

    /// Período/canal/local. Sem mudança, nada é buscado.
    pub async fn update_filters(&self, update: FilterUpdate) -> Result<(), AppError> {
        self.ensure_active()?;
        let changed = self.state.write().await.query.apply(update);
        if !changed {
            return Ok(());
        }
        self.refresh().await
    }

    /// "Ver como" (admin): só a série empilhada é refeita.
    pub async fn view_as(&self, cnpj: Option<String>) -> Result<(), AppError> {
        self.ensure_active()?;
        if !self.session.is_admin() {
            tracing::debug!("Ver como ignorado para perfil cliente");
            return Ok(());
        }

        let (seq, query) = {
            let mut st = self.state.write().await;
            st.query.view_as_cnpj = cnpj.and_then(blank_to_none);
            st.stacked_issued += 1;
            (st.stacked_issued, st.query.clone())
        };

        let result = self.service.fetch_stacked(&self.session, &query).await;
        match self.commit(Slice::Stacked, seq, result, |s, v| s.stacked_series = v).await {
            Some(err) => {
                self.mark_auth_lost();
                Err(err)
            }
            None => Ok(()),
        }
    }

    async fn apply_push(&self, data: &str) {
        let Some(patch) = parse_kpi_patch(data) else {
            return;
        };
        merge_kpis(&mut self.state.write().await.snapshot.kpis, patch);
        self.publish().await;
    }

    async fn push_alerts(&self, batch: Vec<Alert>) {
        if batch.is_empty() {
            return;
        }
        self.state.write().await.snapshot.alerts.push_batch(batch);
        self.publish().await;
    }

    fn stop(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

impl Drop for LiveDashboard {
    fn drop(&mut self) {
        self.stop();
    }
}

// As tarefas seguram só um `Weak`: se o painel sumir, elas terminam sozinhas.
async fn run_push_stream(dashboard: Weak<LiveDashboard>, retry: Duration) {
    loop {
        let (service, session) = {
            let Some(dash) = dashboard.upgrade() else { return };
            (dash.service.clone(), dash.session.clone())
        };

        match service.open_kpi_stream(&session).await {
            Ok(stream) => {
                let mut stream = Box::pin(stream);
                while let Some(event) = stream.next().await {
                    let Some(dash) = dashboard.upgrade() else { return };
                    match event {
                        Ok(event) => dash.apply_push(&event.data).await,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            break;
                        }
                    }
                }
                tracing::debug!("Stream de KPIs encerrado, reconectando em {:?}", retry);
            }
            Err(e) if e.is_auth_expired() => {
                if let Some(dash) = dashboard.upgrade() {
                    dash.mark_auth_lost();
                }
                return;
            }
            Err(e) => tracing::warn!("Stream de KPIs indisponível: {}", e),
        }

        tokio::time::sleep(retry).await;
    }
}

async fn run_alert_poll(dashboard: Weak<LiveDashboard>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // o primeiro tick é imediato
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(dash) = dashboard.upgrade() else { return };
        match dash.service.fetch_alerts(&dash.session).await {
            Ok(batch) => dash.push_alerts(batch).await,
            Err(e) if e.is_auth_expired() => {
                dash.mark_auth_lost();
                return;
            }
            Err(e) => tracing::debug!("Falha ao buscar alertas: {}", e),
        }
    }
}

/// Painéis montados, um por aba.
#[derive(Clone)]
pub struct LiveRegistry {
    dashboards: Arc<RwLock<HashMap<Uuid, Arc<LiveDashboard>>>>,
    service: DashboardService,
    alert_interval: Duration,
    stream_retry: Duration,
}

impl LiveRegistry {
    pub fn new(service: DashboardService, alert_interval: Duration, stream_retry: Duration) -> Self {
        Self {
            dashboards: Arc::new(RwLock::new(HashMap::new())),
            service,
            alert_interval,
            stream_retry,
        }
    }

    pub async fn get(&self, tab: Uuid) -> Option<Arc<LiveDashboard>> {
        self.dashboards.read().await.get(&tab).cloned()
    }

    /// Devolve o painel da aba, montando na primeira vez.
    /// Se a sessão mudou desde a montagem, o painel antigo é descartado.
    pub async fn mount(&self, tab: Uuid, session: &Session) -> Result<Arc<LiveDashboard>, AppError> {
        let dashboard = {
            let mut dashboards = self.dashboards.write().await;
            if let Some(existing) = dashboards.get(&tab) {
                if existing.session == *session {
                    existing.ensure_active()?;
                    return Ok(existing.clone());
                }
                existing.stop();
            }
            let dashboard = Arc::new(LiveDashboard::new(self.service.clone(), session.clone()));
            dashboards.insert(tab, dashboard.clone());
            dashboard
        };

        tracing::info!("Painel montado para {} ({})", session.email, session.role.as_str());
        dashboard.start(self.alert_interval, self.stream_retry).await?;
        Ok(dashboard)
    }

    pub async fn unmount(&self, tab: Uuid) {
        if let Some(dashboard) = self.dashboards.write().await.remove(&tab) {
            dashboard.stop();
            tracing::debug!("Painel desmontado da aba {}", tab);
        }
    }

    /// Registra uma conexão SSE no painel. Quando a última cai, a aba é desmontada.
    pub fn watch(&self, tab: Uuid, dashboard: &Arc<LiveDashboard>) -> LiveWatch {
        dashboard.watchers.fetch_add(1, Ordering::AcqRel);
        LiveWatch {
            registry: self.clone(),
            tab,
            dashboard: Arc::downgrade(dashboard),
        }
    }

    // Só desmonta se ninguém voltou a assistir e a aba ainda aponta para este painel
    async fn release(&self, tab: Uuid, dashboard: &Arc<LiveDashboard>) {
        let mut dashboards = self.dashboards.write().await;
        if dashboard.watchers.load(Ordering::Acquire) > 0 {
            return;
        }
        if dashboards.get(&tab).is_some_and(|current| Arc::ptr_eq(current, dashboard)) {
            dashboards.remove(&tab);
            dashboard.stop();
            tracing::debug!("Última conexão da aba {} fechou, painel desmontado", tab);
        }
    }
}

/// Guarda de uma conexão `/dashboard/live`; vive dentro do stream SSE.
pub struct LiveWatch {
    registry: LiveRegistry,
    tab: Uuid,
    // `Weak` para não segurar o canal aberto depois de um unmount
    dashboard: Weak<LiveDashboard>,
}

impl LiveWatch {
    pub fn auth_lost(&self) -> bool {
        self.dashboard.upgrade().is_some_and(|dash| dash.is_auth_lost())
    }
}

impl Drop for LiveWatch {
    fn drop(&mut self) {
        let Some(dashboard) = self.dashboard.upgrade() else { return };
        if dashboard.watchers.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        let registry = self.registry.clone();
        let tab = self.tab;
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move { registry.release(tab, &dashboard).await });
        }
    }
}
