// src/services/user_service.rs

use std::collections::HashSet;

use serde::de::IgnoredAny;

use crate::{
    common::{
        cnpj::{only_digits, CNPJ_DIGITS},
        error::AppError,
    },
    models::{
        auth::{Role, Session},
        users::{UserForm, UserRecord, ADMIN_CODES, ADMIN_DOMAINS},
    },
    services::{cnpj_service::CnpjService, gateway::ApiClient},
};

#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
    cnpj_service: CnpjService,
}

impl UserService {
    pub fn new(api: ApiClient, cnpj_service: CnpjService) -> Self {
        Self { api, cnpj_service }
    }

    pub async fn list(&self, session: &Session, term: Option<&str>) -> Result<Vec<UserRecord>, AppError> {
        let query: Vec<(&str, String)> = term.map(|q| ("q", q.to_string())).into_iter().collect();
        self.api
            .get_json(session, "/users", &query)
            .await
            .map_err(|e| e.or_message("Falha ao carregar usuários."))
    }

    /// Cria (`id = None`) ou edita um usuário e devolve a lista atualizada.
    pub async fn save(&self, session: &Session, id: Option<i64>, form: UserForm) -> Result<Vec<UserRecord>, AppError> {
        // a whitelist só importa para clientes
        let approved = match form.role {
            Role::Cliente => self.cnpj_service.approved_set(session).await?,
            Role::Admin => HashSet::new(),
        };
        let form = validate_user_form(form, id.is_none(), &approved)?;

        let result: Result<IgnoredAny, AppError> = match id {
            Some(id) => self.api.put_json(session, &format!("/users/{}", id), &form).await,
            None => self.api.post_json(session, "/users", &form).await,
        };
        result.map_err(|e| e.or_message("Erro ao salvar."))?;

        tracing::info!("Usuário {} salvo ({})", form.email, form.role.as_str());
        self.list(session, None).await
    }

    pub async fn delete(&self, session: &Session, id: i64) -> Result<Vec<UserRecord>, AppError> {
        self.api
            .delete(session, &format!("/users/{}", id))
            .await
            .map_err(|e| e.or_message("Erro ao excluir."))?;
        tracing::info!("Usuário #{} excluído", id);
        self.list(session, None).await
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Normaliza o formulário e aplica as regras de perfil antes de salvar.
pub fn validate_user_form(form: UserForm, is_new: bool, approved: &HashSet<String>) -> Result<UserForm, AppError> {
    let form = UserForm {
        nome: form.nome.trim().to_string(),
        email: form.email.trim().to_lowercase(),
        cnpj: match form.role {
            Role::Cliente => form.cnpj.map(|c| only_digits(&c)).filter(|c| !c.is_empty()),
            Role::Admin => None,
        },
        codigo_cannoli: match form.role {
            Role::Admin => trimmed(form.codigo_cannoli),
            Role::Cliente => None,
        },
        senha: form.senha.filter(|s| !s.is_empty()),
        role: form.role,
    };

    if form.nome.is_empty() || form.email.is_empty() {
        return Err(AppError::invalid("Preencha nome e e-mail."));
    }
    if is_new && form.senha.is_none() {
        return Err(AppError::invalid("Defina uma senha para novo usuário."));
    }

    match form.role {
        Role::Cliente => {
            let cnpj = form.cnpj.as_deref().unwrap_or_default();
            if cnpj.len() != CNPJ_DIGITS {
                return Err(AppError::invalid("CNPJ é obrigatório (14 dígitos)."));
            }
            if !approved.contains(cnpj) {
                return Err(AppError::invalid("Este CNPJ ainda não está aprovado na whitelist."));
            }
        }
        Role::Admin => {
            let domain = form.email.rsplit_once('@').map(|(_, d)| d).unwrap_or_default();
            if !ADMIN_DOMAINS.contains(&domain) {
                return Err(AppError::invalid(
                    "Admins só podem usar e-mails @cannoli.com.br ou @inovatech.com.br.",
                ));
            }
            let code = form.codigo_cannoli.as_deref().unwrap_or_default().to_uppercase();
            if !ADMIN_CODES.contains(&code.as_str()) {
                return Err(AppError::invalid("Código do administrador inválido. Use CANNOLI ou INOVATECH."));
            }
        }
    }

    Ok(form)
}
