use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::model::record::{EnrichedRecord, Enrichment, ListingItem, Record};
use crate::services::enrich::{ShowDetails, Taxonomy};

/// Une as listas dos dois locales pelo identificador.
///
/// A ordem do locale primário prevalece. Itens só do secundário são descartados.
pub fn join_locales(primary: Vec<ListingItem>, secondary: Option<Vec<ListingItem>>) -> Vec<Record> {
    let Some(secondary) = secondary else {
        return primary.into_iter().map(|p| record(p, None)).collect();
    };

    let primary_ids: HashSet<&str> = primary.iter().map(|p| p.identifier.as_str()).collect();
    for orphan in secondary
        .iter()
        .filter(|s| !primary_ids.contains(s.identifier.as_str()))
    {
        warn!(identifier = %orphan.identifier, "only found in secondary locale, dropped");
    }

    let mut titles: HashMap<String, String> = secondary
        .into_iter()
        .map(|s| (s.identifier, s.title))
        .collect();

    primary
        .into_iter()
        .map(|p| {
            let secondary_title = titles.remove(&p.identifier);
            if secondary_title.is_none() {
                warn!(identifier = %p.identifier, "no secondary-locale title");
            }
            record(p, secondary_title)
        })
        .collect()
}

fn record(item: ListingItem, title_secondary: Option<String>) -> Record {
    Record {
        identifier: item.identifier,
        title_primary: item.title,
        title_secondary,
        release_year: item.release_year,
        source_rating: item.source_rating,
    }
}

/// Numera os registros novos a partir de `existing_count + 1`, sem lacunas.
pub fn assemble<F>(existing_count: usize, records: Vec<Record>, mut enrich: F) -> Vec<EnrichedRecord>
where
    F: FnMut(&Record) -> Option<Enrichment>,
{
    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let enrichment = enrich(&r);
            EnrichedRecord::new(existing_count + i + 1, r, enrichment)
        })
        .collect()
}

pub fn combine(details: ShowDetails, taxonomy: Taxonomy) -> Enrichment {
    Enrichment {
        secondary_rating: details.rating,
        status: details.status,
        poster_url: details.poster_url,
        backdrop_url: details.backdrop_url,
        overview: details.overview,
        episode_count: taxonomy.episodes,
        tags: taxonomy.tags,
        genres: taxonomy.genres,
    }
}
