//! Display text for a failed call, per call site.
//!
//! Parsing lives in [`super::normalize`]; a call site only picks a fallback
//! label and one of the policies below. The backend's screens never agreed
//! on a single policy, so each site keeps its own.

use std::collections::HashMap;

use super::ApiError;

pub const GENERIC_FALLBACK: &str = "Erro inesperado";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticePolicy {
    /// Always the fallback label.
    Fixed,
    /// Normalised `detail`, else the label.
    DetailOr,
    /// Normalised `detail`, else the error message, else the label.
    DetailOrMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub policy: NoticePolicy,
    pub fallback: String,
}

impl CallSite {
    pub fn new(policy: NoticePolicy, fallback: impl Into<String>) -> Self {
        Self { policy, fallback: fallback.into() }
    }

    pub fn notice(&self, error: &ApiError) -> String {
        let text = match self.policy {
            NoticePolicy::Fixed => None,
            NoticePolicy::DetailOr => error.detail_str(),
            NoticePolicy::DetailOrMessage => {
                error.detail_str().or(Some(error.message.as_str()).filter(|m| !m.is_empty()))
            }
        };
        text.unwrap_or(self.fallback.as_str()).to_string()
    }
}

/// Built-in sites: (name, policy, label).
const BUILTIN: &[(&str, NoticePolicy, &str)] = &[
    ("login", NoticePolicy::DetailOrMessage, "Credenciais inválidas"),
    ("schedule_generate", NoticePolicy::DetailOrMessage, "Erro ao gerar escalas"),
    ("schedule_manual", NoticePolicy::DetailOrMessage, "Erro ao criar escala"),
    ("church_save", NoticePolicy::DetailOr, "Erro ao salvar igreja"),
    ("user_save", NoticePolicy::DetailOr, "Erro ao salvar usuário"),
    ("evaluation_submit", NoticePolicy::DetailOr, "Erro ao enviar avaliação"),
    ("data_load", NoticePolicy::Fixed, "Erro ao carregar dados"),
    ("profile_load", NoticePolicy::Fixed, "Erro ao carregar perfil"),
    ("profile_update", NoticePolicy::Fixed, "Erro ao atualizar perfil"),
];

/// Registry of call sites, keyed by name.
#[derive(Debug, Clone)]
pub struct Notices {
    sites: HashMap<String, CallSite>,
}

impl Default for Notices {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Notices {
    pub fn builtin() -> Self {
        let sites = BUILTIN
            .iter()
            .map(|(name, policy, label)| (name.to_string(), CallSite::new(*policy, *label)))
            .collect();
        Self { sites }
    }

    /// Built-in sites with labels replaced from `labels` (the `[messages]`
    /// table). Unknown names become new `DetailOrMessage` sites.
    pub fn with_labels(labels: &HashMap<String, String>) -> Self {
        let mut notices = Self::builtin();
        for (name, label) in labels {
            notices
                .sites
                .entry(name.clone())
                .and_modify(|site| site.fallback = label.clone())
                .or_insert_with(|| CallSite::new(NoticePolicy::DetailOrMessage, label.clone()));
        }
        notices
    }

    pub fn site(&self, name: &str) -> CallSite {
        self.sites
            .get(name)
            .cloned()
            .unwrap_or_else(|| CallSite::new(NoticePolicy::DetailOrMessage, GENERIC_FALLBACK))
    }

    pub fn notice(&self, site: &str, error: &ApiError) -> String {
        self.site(site).notice(error)
    }
}
