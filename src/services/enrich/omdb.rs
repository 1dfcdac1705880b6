use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use super::{read_json, IdentifierLookup, LookupError, TIMEOUT_SECS};

const BASE_URL: &str = "http://www.omdbapi.com/";

/// Consulta de ficha completa por identificador (não por título).
pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(api_key: &str) -> Result<Self, LookupError> {
        if api_key.trim().is_empty() {
            return Err(LookupError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(OmdbClient {
            client,
            base_url: BASE_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

impl IdentifierLookup for OmdbClient {
    /// Devolve o payload do provedor com o campo `ttid` acrescentado.
    fn fetch(&self, identifier: &str) -> Result<Value, LookupError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("i", identifier), ("apikey", self.api_key.as_str())])
            .send()?;

        accept(read_json(resp)?, identifier)
    }
}

fn accept(mut payload: Value, identifier: &str) -> Result<Value, LookupError> {
    if payload.get("Response").and_then(Value::as_str) != Some("True") {
        let msg = payload
            .get("Error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(LookupError::Provider(msg));
    }

    match payload.as_object_mut() {
        Some(obj) => {
            obj.insert("ttid".to_string(), Value::String(identifier.to_string()));
            Ok(payload)
        }
        None => Err(LookupError::InvalidResponse("expected JSON object".into())),
    }
}
