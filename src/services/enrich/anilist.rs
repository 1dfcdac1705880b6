use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};

use super::{read_json, settle, Lookup, LookupError, Taxonomy, TaxonomyLookup, TIMEOUT_SECS};
use crate::model::translation::TranslationTable;

const ENDPOINT: &str = "https://graphql.anilist.co";

const MEDIA_QUERY: &str = r#"
query ($search: String) {
    Media (search: $search, type: ANIME) {
        tags {
            name
        }
        genres
        episodes
    }
}
"#;

pub struct AniListClient {
    client: Client,
    endpoint: String,
}

impl AniListClient {
    pub fn new() -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(AniListClient {
            client,
            endpoint: ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    fn fetch(&self, title: &str, table: &TranslationTable) -> Result<Taxonomy, LookupError> {
        let body = json!({
            "query": MEDIA_QUERY,
            "variables": { "search": title }
        });

        let resp = self.client.post(&self.endpoint).json(&body).send()?;
        let v = read_json(resp)?;

        let media = v
            .get("data")
            .and_then(|d| d.get("Media"))
            .filter(|m| !m.is_null())
            .ok_or(LookupError::NoMatch)?;

        Ok(taxonomy_from(media, table))
    }
}

impl TaxonomyLookup for AniListClient {
    fn lookup(&self, title: &str, table: &TranslationTable) -> Lookup<Taxonomy> {
        settle("anilist", title, self.fetch(title, table), Taxonomy::default)
    }
}

fn taxonomy_from(media: &Value, table: &TranslationTable) -> Taxonomy {
    let tags = media
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            table.translate_tags(
                arr.iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str)),
            )
        })
        .unwrap_or_default();

    let genres = media
        .get("genres")
        .and_then(Value::as_array)
        .map(|arr| table.translate_genres(arr.iter().filter_map(Value::as_str)))
        .unwrap_or_default();

    let episodes = media
        .get("episodes")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());

    Taxonomy {
        tags,
        genres,
        episodes,
    }
}
