pub mod anilist;
pub mod omdb;
pub mod tmdb;

use reqwest::blocking::Response;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::model::translation::TranslationTable;

pub(crate) const TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("api key not configured")]
    MissingApiKey,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("no match")]
    NoMatch,
    #[error("provider error: {0}")]
    Provider(String),
}

/// Resultado de uma consulta de enriquecimento.
///
/// Falhas nunca sobem para o chamador: viram `Degraded` com um valor neutro.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Degraded { value: T, reason: String },
}

impl<T> Lookup<T> {
    pub fn value(&self) -> &T {
        match self {
            Lookup::Found(v) => v,
            Lookup::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Lookup::Found(v) => v,
            Lookup::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Lookup::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Lookup::Found(_) => None,
            Lookup::Degraded { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowDetails {
    pub overview: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub rating: f64,
    pub status: String,
}

impl ShowDetails {
    pub fn neutral() -> Self {
        ShowDetails {
            overview: String::new(),
            poster_url: None,
            backdrop_url: None,
            rating: 0.0,
            status: tmdb::STATUS_UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Taxonomy {
    pub tags: Vec<String>,
    pub genres: Vec<String>,
    pub episodes: Option<u32>,
}

/// Consulta A: sinopse, imagens, nota e status, pelo título.
pub trait DetailsLookup {
    fn lookup(&self, title: &str) -> Lookup<ShowDetails>;
}

/// Consulta B: tags, gêneros e episódios, pelo título, filtrados pela tabela.
pub trait TaxonomyLookup {
    fn lookup(&self, title: &str, table: &TranslationTable) -> Lookup<Taxonomy>;
}

/// Ficha completa por identificador; o erro é tratado pelo chamador.
pub trait IdentifierLookup {
    fn fetch(&self, identifier: &str) -> Result<Value, LookupError>;
}

pub(crate) fn settle<T>(
    provider: &str,
    title: &str,
    result: Result<T, LookupError>,
    neutral: impl FnOnce() -> T,
) -> Lookup<T> {
    match result {
        Ok(v) => Lookup::Found(v),
        Err(e) => {
            warn!(provider, title, error = %e, "lookup degraded to neutral result");
            Lookup::Degraded {
                value: neutral(),
                reason: e.to_string(),
            }
        }
    }
}

pub(crate) fn read_json(resp: Response) -> Result<Value, LookupError> {
    let status = resp.status();
    let text = resp.text()?;

    if !status.is_success() {
        return Err(LookupError::Http(extract_error_message(status, &text)));
    }

    serde_json::from_str(&text).map_err(|e| LookupError::InvalidResponse(e.to_string()))
}

fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    // TMDB: status_message; AniList: errors[0].message; OMDb: Error
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        let msg = v
            .get("status_message")
            .or_else(|| v.get("errors").and_then(|e| e.get(0)).and_then(|e| e.get("message")))
            .or_else(|| v.get("Error"))
            .and_then(|m| m.as_str());
        if let Some(msg) = msg {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let snippet: String = body_text.trim().chars().take(200).collect();
    format!("HTTP {}: {}", status.as_u16(), snippet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_turns_errors_into_neutral_values() {
        let ok = settle("p", "t", Ok(5), || 0);
        assert_eq!(ok, Lookup::Found(5));
        assert!(!ok.is_degraded());

        let degraded = settle::<i32>("p", "t", Err(LookupError::NoMatch), || 0);
        assert!(degraded.is_degraded());
        assert_eq!(degraded.reason(), Some("no match"));
        assert_eq!(degraded.into_value(), 0);
    }

    #[test]
    fn error_message_reads_provider_shapes() {
        assert_eq!(
            extract_error_message(
                StatusCode::UNAUTHORIZED,
                r#"{"status_code":7,"status_message":"Invalid API key"}"#
            ),
            "HTTP 401: Invalid API key"
        );
        assert_eq!(
            extract_error_message(
                StatusCode::NOT_FOUND,
                r#"{"errors":[{"message":"Not Found.","status":404}],"data":{"Media":null}}"#
            ),
            "HTTP 404: Not Found."
        );
        assert_eq!(
            extract_error_message(StatusCode::INTERNAL_SERVER_ERROR, "  oops "),
            "HTTP 500: oops"
        );
    }

    #[test]
    fn neutral_details_use_unknown_status() {
        let n = ShowDetails::neutral();
        assert_eq!(n.status, "Неизвестно");
        assert_eq!(n.rating, 0.0);
        assert!(n.poster_url.is_none());
    }
}
