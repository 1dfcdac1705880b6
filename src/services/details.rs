use std::{path::PathBuf, thread, time::Duration};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::services::{
    enrich::IdentifierLookup,
    store::{self, identifier_of, DocumentStore, PersistReport, PersistedCollection, StoreTarget},
};

#[derive(Debug, Clone)]
pub struct DetailsConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub delay: Duration,
    /// Grava um snapshot parcial a cada N fichas obtidas (0 desliga).
    pub checkpoint_every: usize,
    pub collection: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailsReport {
    pub requested: usize,
    pub fetched: usize,
    pub failed: usize,
    pub checkpoints: usize,
    pub persist: Option<PersistReport>,
}

/// Busca a ficha completa de cada identificador da coleção de entrada.
pub fn run(
    cfg: &DetailsConfig,
    lookup: &dyn IdentifierLookup,
    store: Option<&mut dyn DocumentStore>,
) -> DetailsReport {
    let input = PersistedCollection::load(&cfg.input_path);
    let identifiers: Vec<&str> = input.entries().iter().filter_map(identifier_of).collect();

    if identifiers.is_empty() {
        warn!(path = %cfg.input_path.display(), "no identifiers to process");
        return DetailsReport {
            requested: 0,
            fetched: 0,
            failed: 0,
            checkpoints: 0,
            persist: None,
        };
    }

    info!(count = identifiers.len(), "fetching details");

    let mut fetched: Vec<serde_json::Value> = Vec::new();
    let mut failed = 0usize;
    let mut checkpoints = 0usize;

    for id in &identifiers {
        match lookup.fetch(id) {
            Ok(payload) => {
                info!(identifier = id, "details fetched");
                fetched.push(payload);

                if cfg.checkpoint_every > 0 && fetched.len() % cfg.checkpoint_every == 0 {
                    let partial = PersistedCollection::from_entries(fetched.clone());
                    match store::write_snapshot(&cfg.output_path, &partial) {
                        Ok(_) => {
                            checkpoints += 1;
                            info!(
                                fetched = fetched.len(),
                                total = identifiers.len(),
                                "checkpoint written"
                            );
                        }
                        Err(e) => error!(error = %e, "failed to write checkpoint"),
                    }
                }
            }
            Err(e) => {
                failed += 1;
                warn!(identifier = id, error = %e, "details unavailable, skipping");
            }
        }

        thread::sleep(cfg.delay);
    }

    let output = PersistedCollection::from_entries(fetched);

    let target = store.map(|s| StoreTarget {
        store: s,
        collection: &cfg.collection,
    });
    let persist = store::persist(&output, &cfg.output_path, target);

    DetailsReport {
        requested: identifiers.len(),
        fetched: output.len(),
        failed,
        checkpoints,
        persist: Some(persist),
    }
}
