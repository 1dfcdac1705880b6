use std::{path::PathBuf, thread, time::Duration};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::model::translation::TranslationTable;
use crate::services::{
    collector::{self, CollectError, Collected, CollectorConfig},
    driver::ListingDriver,
    enrich::{DetailsLookup, TaxonomyLookup},
    merge,
    store::{self, DocumentStore, PersistReport, PersistedCollection, StoreError, StoreTarget},
};

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Tamanho total desejado da coleção.
    pub limit: usize,
    /// Pausa entre consultas de enriquecimento.
    pub delay: Duration,
    pub input_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub primary_locale: String,
    pub secondary_locale: Option<String>,
    pub collection: String,
    pub collector: CollectorConfig,
}

/// Provedores de enriquecimento. Ausentes = modo só-identificador.
pub struct Enrichers<'a> {
    pub details: &'a dyn DetailsLookup,
    pub taxonomy: &'a dyn TaxonomyLookup,
    pub table: &'a TranslationTable,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error("failed to assemble new records: {0}")]
    Assemble(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct LocaleReport {
    pub locale: String,
    pub collected: usize,
    pub termination: String,
    pub attempts: usize,
    pub skipped: usize,
    pub already_known: usize,
}

impl From<&Collected> for LocaleReport {
    fn from(c: &Collected) -> Self {
        LocaleReport {
            locale: c.locale.clone(),
            collected: c.items.len(),
            termination: c.termination.to_string(),
            attempts: c.attempts,
            skipped: c.skipped,
            already_known: c.already_known,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub existing: usize,
    pub needed: usize,
    pub primary: LocaleReport,
    pub secondary: Option<LocaleReport>,
    pub appended: usize,
    pub enriched: usize,
    pub enrichment_degraded: usize,
    pub total: usize,
    pub persist: PersistReport,
}

pub fn run(
    cfg: &HarvestConfig,
    driver: &mut dyn ListingDriver,
    enrichers: Option<Enrichers<'_>>,
    store: Option<&mut dyn DocumentStore>,
) -> Result<HarvestReport, PipelineError> {
    let mut collection = PersistedCollection::load(&cfg.input_path);
    let existing_ids = collection.identifiers();
    let existing = collection.len();

    let needed = cfg.limit.saturating_sub(existing);
    if needed == 0 {
        info!(existing, limit = cfg.limit, "limit reached, no new records needed");
    } else {
        info!(existing, needed, "collecting new records");
    }

    let primary = collector::collect(
        &mut *driver,
        &cfg.collector,
        &cfg.primary_locale,
        &existing_ids,
        needed,
    )?;

    let secondary = match &cfg.secondary_locale {
        Some(locale) => Some(collector::collect(
            &mut *driver,
            &cfg.collector,
            locale,
            &existing_ids,
            needed,
        )?),
        None => None,
    };

    let primary_report = LocaleReport::from(&primary);
    let secondary_report = secondary.as_ref().map(LocaleReport::from);

    let records = merge::join_locales(primary.items, secondary.map(|s| s.items));

    let mut enriched = 0usize;
    let mut degraded = 0usize;

    let new_records = merge::assemble(existing, records, |record| {
        let e = enrichers.as_ref()?;
        let title = record.title_primary.as_str();

        info!(identifier = %record.identifier, title, "enriching");
        let details = e.details.lookup(title);
        let taxonomy = e.taxonomy.lookup(title, e.table);

        enriched += 1;
        if details.is_degraded() || taxonomy.is_degraded() {
            degraded += 1;
        }

        // Cortesia com os provedores
        thread::sleep(cfg.delay);

        Some(merge::combine(details.into_value(), taxonomy.into_value()))
    });

    let appended = new_records.len();
    collection.append(&new_records)?;
    info!(appended, total = collection.len(), "records assembled");

    let target = store.map(|s| StoreTarget {
        store: s,
        collection: &cfg.collection,
    });
    let persist = store::persist(&collection, &cfg.snapshot_path, target);

    Ok(HarvestReport {
        existing,
        needed,
        primary: primary_report,
        secondary: secondary_report,
        appended,
        enriched,
        enrichment_degraded: degraded,
        total: collection.len(),
        persist,
    })
}
