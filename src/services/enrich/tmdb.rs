use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use super::{read_json, settle, DetailsLookup, Lookup, LookupError, ShowDetails, TIMEOUT_SECS};

const BASE_URL: &str = "https://api.themoviedb.org/3";
const POSTER_PREFIX: &str = "https://image.tmdb.org/t/p/w500";
const BACKDROP_PREFIX: &str = "https://image.tmdb.org/t/p/original";

pub const STATUS_UNKNOWN: &str = "Неизвестно";

const STATUS_TABLE: [(&str, &str); 6] = [
    ("Returning Series", "Выходит"),
    ("Planned", "Запланировано"),
    ("In Production", "В производстве"),
    ("Ended", "Завершён"),
    ("Canceled", "Отменён"),
    ("Pilot", "Пилот"),
];

pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
}

impl TmdbClient {
    pub fn new(api_key: Option<String>, language: &str) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(TmdbClient {
            client,
            base_url: BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            language: language.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, LookupError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.client.get(url).query(params).send()?;
        read_json(resp)
    }

    fn fetch(&self, title: &str) -> Result<ShowDetails, LookupError> {
        let key = self.api_key.as_deref().ok_or(LookupError::MissingApiKey)?;
        let lang = self.language.as_str();

        let search = self.get(
            "/search/tv",
            &[("api_key", key), ("query", title), ("language", lang)],
        )?;

        let first = search
            .get("results")
            .and_then(|r| r.get(0))
            .ok_or(LookupError::NoMatch)?;

        // O status só vem no detalhe da série
        let series_id = first
            .get("id")
            .and_then(Value::as_u64)
            .ok_or(LookupError::NoMatch)?;

        let details = self.get(
            &format!("/tv/{series_id}"),
            &[("api_key", key), ("language", lang)],
        )?;

        Ok(details_from(first, details.get("status").and_then(Value::as_str)))
    }
}

impl DetailsLookup for TmdbClient {
    fn lookup(&self, title: &str) -> Lookup<ShowDetails> {
        settle("tmdb", title, self.fetch(title), ShowDetails::neutral)
    }
}

pub fn translate_status(status: Option<&str>) -> String {
    status
        .and_then(|s| STATUS_TABLE.iter().find(|(en, _)| *en == s))
        .map(|(_, local)| local.to_string())
        .unwrap_or_else(|| STATUS_UNKNOWN.to_string())
}

fn image_url(prefix: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty()).map(|p| format!("{prefix}{p}"))
}

fn details_from(result: &Value, status: Option<&str>) -> ShowDetails {
    ShowDetails {
        overview: result
            .get("overview")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        poster_url: image_url(POSTER_PREFIX, result.get("poster_path").and_then(Value::as_str)),
        backdrop_url: image_url(
            BACKDROP_PREFIX,
            result.get("backdrop_path").and_then(Value::as_str),
        ),
        rating: result.get("vote_average").and_then(Value::as_f64).unwrap_or(0.0),
        status: translate_status(status),
    }
}
