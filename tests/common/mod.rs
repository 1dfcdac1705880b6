#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use listing_harvester::model::translation::TranslationTable;
use listing_harvester::parsers::listing::Fragment;
use listing_harvester::services::collector::CollectorConfig;
use listing_harvester::services::driver::{Control, DriverError, ListingDriver};
use listing_harvester::services::enrich::{
    DetailsLookup, Lookup, ShowDetails, Taxonomy, TaxonomyLookup,
};
use listing_harvester::services::store::{DocumentStore, StoreError};

/// Uma listagem por locale; cada clique revela mais `page_size` itens.
pub struct FakeListing {
    pages: HashMap<String, Vec<Fragment>>,
    page_size: usize,
    locale: Option<String>,
    revealed: usize,
    pub visits: Vec<String>,
    pub closes: usize,
}

impl FakeListing {
    pub fn new(page_size: usize) -> Self {
        FakeListing {
            pages: HashMap::new(),
            page_size,
            locale: None,
            revealed: 0,
            visits: Vec::new(),
            closes: 0,
        }
    }

    pub fn with_locale(mut self, locale: &str, items: &[(&str, &str)]) -> Self {
        let fragments = items
            .iter()
            .enumerate()
            .map(|(i, (id, title))| fragment(i + 1, id, title))
            .collect();
        self.pages.insert(locale.to_string(), fragments);
        self
    }

    fn rendered(&self) -> Vec<Fragment> {
        self.locale
            .as_ref()
            .and_then(|l| self.pages.get(l))
            .map(|all| all.iter().take(self.revealed).cloned().collect())
            .unwrap_or_default()
    }
}

impl ListingDriver for FakeListing {
    fn navigate(&mut self, _url: &str, locale: &str) -> Result<(), DriverError> {
        self.visits.push(locale.to_string());
        self.locale = Some(locale.to_string());
        self.revealed = self.page_size;
        Ok(())
    }

    fn current_fragments(&mut self) -> Result<Vec<Fragment>, DriverError> {
        if self.locale.is_none() {
            return Err(DriverError::NoSession);
        }
        Ok(self.rendered())
    }

    fn find_load_more(&mut self) -> Result<Option<Control>, DriverError> {
        let total = self
            .locale
            .as_ref()
            .and_then(|l| self.pages.get(l))
            .map_or(0, Vec::len);
        Ok((self.revealed < total).then(|| Control("load-more".into())))
    }

    fn scroll_into_view(&mut self, _control: &Control) -> Result<(), DriverError> {
        Ok(())
    }

    fn click(&mut self, _control: &Control) -> Result<(), DriverError> {
        self.revealed += self.page_size;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closes += 1;
        self.locale = None;
        Ok(())
    }
}

pub fn fragment(position: usize, id: &str, title: &str) -> Fragment {
    Fragment::new(format!(
        r#"<li class="ipc-metadata-list-summary-item">
            <a href="/title/{id}/?ref_=sr_t_{position}"><h3>{position}. {title}</h3></a>
            <span class="dli-title-metadata-item">2019–2021</span>
            <span class="ipc-rating-star--rating">8.1</span>
        </li>"#
    ))
}

pub fn collector_config(max_attempts: usize) -> CollectorConfig {
    CollectorConfig {
        listing_url: "https://listing.test/search".into(),
        max_attempts,
        initial_timeout: Duration::ZERO,
        control_timeout: Duration::ZERO,
        expansion_timeout: Duration::ZERO,
        scroll_pause: Duration::ZERO,
        delay: Duration::ZERO,
        poll_interval: Duration::ZERO,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub collections: HashMap<String, Vec<Value>>,
    pub fail: bool,
}

impl DocumentStore for MemoryStore {
    fn replace_all(&mut self, collection: &str, docs: &[Value]) -> Result<usize, StoreError> {
        if self.fail {
            return Err(StoreError::Backend("connection refused".into()));
        }
        self.collections
            .insert(collection.to_string(), docs.to_vec());
        Ok(docs.len())
    }
}

/// Provedores que sempre falham: o resultado é o valor neutro.
pub struct Unreachable;

impl DetailsLookup for Unreachable {
    fn lookup(&self, _title: &str) -> Lookup<ShowDetails> {
        Lookup::Degraded {
            value: ShowDetails::neutral(),
            reason: "transport error: connection refused".into(),
        }
    }
}

impl TaxonomyLookup for Unreachable {
    fn lookup(&self, _title: &str, _table: &TranslationTable) -> Lookup<Taxonomy> {
        Lookup::Degraded {
            value: Taxonomy::default(),
            reason: "transport error: connection refused".into(),
        }
    }
}

/// Provedores com respostas fixas por título.
pub struct Catalog;

impl DetailsLookup for Catalog {
    fn lookup(&self, title: &str) -> Lookup<ShowDetails> {
        Lookup::Found(ShowDetails {
            overview: format!("Overview of {title}"),
            poster_url: Some(format!("https://image.tmdb.org/t/p/w500/{title}.jpg")),
            backdrop_url: None,
            rating: 7.5,
            status: "Завершён".into(),
        })
    }
}

impl TaxonomyLookup for Catalog {
    fn lookup(&self, _title: &str, table: &TranslationTable) -> Lookup<Taxonomy> {
        Lookup::Found(Taxonomy {
            tags: table.translate_tags(["Shounen", "Unlisted"]),
            genres: table.translate_genres(["Action"]),
            episodes: Some(12),
        })
    }
}

pub fn table() -> TranslationTable {
    TranslationTable::new(
        HashMap::from([("Shounen".to_string(), "Сёнэн".to_string())]),
        HashMap::from([("Action".to_string(), "Экшен".to_string())]),
    )
}
