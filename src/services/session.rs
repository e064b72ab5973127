// src/services/session.rs

use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::Session};

/// Armazenamento da sessão por aba: um documento JSON ("user") por id de aba.
/// Só `establish` e `clear` alteram o conteúdo.
#[derive(Clone, Default)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<Uuid, String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessão da aba. Ausente ou ilegível vale como "não autenticado".
    pub async fn load(&self, tab: Uuid) -> Session {
        let entries = self.entries.read().await;
        let Some(raw) = entries.get(&tab) else {
            return Session::anonymous();
        };

        match serde_json::from_str::<Session>(raw) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Sessão corrompida na aba {}: {}", tab, e);
                Session::anonymous()
            }
        }
    }

    // Substitui a sessão inteira, nunca campo a campo
    pub async fn establish(&self, tab: Uuid, session: &Session) -> Result<(), AppError> {
        let raw = serde_json::to_string(session).context("Falha ao serializar a sessão")?;
        self.entries.write().await.insert(tab, raw);
        tracing::debug!("Sessão estabelecida na aba {}", tab);
        Ok(())
    }

    pub async fn clear(&self, tab: Uuid) {
        if self.entries.write().await.remove(&tab).is_some() {
            tracing::debug!("Sessão removida da aba {}", tab);
        }
    }

    #[cfg(test)]
    pub async fn put_raw(&self, tab: Uuid, raw: &str) {
        self.entries.write().await.insert(tab, raw.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;

    fn admin() -> Session {
        Session {
            token: "tok".into(),
            role: Role::Admin,
            name: "Ana".into(),
            email: "ana@inovatech.com.br".into(),
            cnpj: None,
        }
    }

    #[tokio::test]
    async fn establish_replaces_and_clear_removes() {
        let store = SessionStore::new();
        let tab = Uuid::new_v4();

        assert!(!store.load(tab).await.is_authenticated());

        store.establish(tab, &admin()).await.unwrap();
        assert_eq!(store.load(tab).await, admin());

        let other = Session { token: "t2".into(), name: "Bia".into(), ..Default::default() };
        store.establish(tab, &other).await.unwrap();
        let loaded = store.load(tab).await;
        assert_eq!(loaded.name, "Bia");
        assert_eq!(loaded.role, Role::Cliente);
        assert!(loaded.email.is_empty());

        store.clear(tab).await;
        assert_eq!(store.load(tab).await, Session::anonymous());
    }

    #[tokio::test]
    async fn malformed_document_reads_as_anonymous() {
        let store = SessionStore::new();
        let tab = Uuid::new_v4();
        store.put_raw(tab, "{token: nope").await;
        assert!(!store.load(tab).await.is_authenticated());
    }

    #[tokio::test]
    async fn tabs_are_isolated() {
        let store = SessionStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.establish(a, &admin()).await.unwrap();
        assert!(store.load(a).await.is_admin());
        assert!(!store.load(b).await.is_authenticated());
    }
}
