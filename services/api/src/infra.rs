use card_advisor::advisor::catalog::CatalogSourceError;
use card_advisor::advisor::history::TransactionHistory;
use card_advisor::advisor::session::InMemorySessionStore;
use card_advisor::advisor::{
    AdvisorService, CatalogSource, InMemoryRecommendationRepository, JsonFileCatalog,
    NoPrimaryCatalog,
};
use card_advisor::config::AdvisorSettings;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Primary catalog chosen from configuration.
pub(crate) enum ConfiguredCatalog {
    File(JsonFileCatalog),
    FallbackOnly(NoPrimaryCatalog),
}

impl ConfiguredCatalog {
    pub(crate) fn from_settings(settings: &AdvisorSettings) -> Self {
        match &settings.catalog_path {
            Some(path) => Self::File(JsonFileCatalog::new(path)),
            None => Self::FallbackOnly(NoPrimaryCatalog),
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::File(_) => "json file",
            Self::FallbackOnly(_) => "fallback only",
        }
    }
}

impl CatalogSource for ConfiguredCatalog {
    fn fetch_active(&self, limit: usize) -> Result<Vec<Value>, CatalogSourceError> {
        match self {
            Self::File(catalog) => catalog.fetch_active(limit),
            Self::FallbackOnly(catalog) => catalog.fetch_active(limit),
        }
    }
}

pub(crate) type ApiService<H> =
    AdvisorService<ConfiguredCatalog, H, InMemoryRecommendationRepository, InMemorySessionStore>;

pub(crate) fn build_service<H>(settings: AdvisorSettings, history: Arc<H>) -> Arc<ApiService<H>>
where
    H: TransactionHistory + 'static,
{
    let catalog = ConfiguredCatalog::from_settings(&settings);
    Arc::new(AdvisorService::new(
        catalog,
        history,
        Arc::new(InMemoryRecommendationRepository::default()),
        Arc::new(InMemorySessionStore::default()),
        settings,
    ))
}
