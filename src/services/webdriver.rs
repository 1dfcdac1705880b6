use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::parsers::listing::{split_page, Fragment, ITEM_SELECTOR};
use crate::services::driver::{Control, DriverError, ListingDriver};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const TIMEOUT_SECS: u64 = 60;

const SCROLL_SCRIPT: &str = "arguments[0].scrollIntoView({behavior: 'smooth', block: 'center'});";
const CLICK_SCRIPT: &str = "arguments[0].click();";

/// Sessão Firefox controlada via protocolo W3C WebDriver (geckodriver).
///
/// O locale é aplicado na criação da sessão; cada `close` encerra o navegador
/// e o próximo `navigate` abre uma sessão nova.
pub struct WebDriverSession {
    client: Client,
    endpoint: String,
    load_more_xpath: String,
    headless: bool,
    session_id: Option<String>,
}

impl WebDriverSession {
    pub fn new(endpoint: &str, load_more_xpath: &str, headless: bool) -> Result<Self, DriverError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(WebDriverSession {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            load_more_xpath: load_more_xpath.to_string(),
            headless,
            session_id: None,
        })
    }

    fn start_session(&mut self, locale: &str) -> Result<(), DriverError> {
        let mut args = Vec::new();
        if self.headless {
            args.push("-headless");
        }

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": {
                        "prefs": { "intl.accept_languages": locale },
                        "args": args
                    }
                }
            }
        });

        let url = format!("{}/session", self.endpoint);
        let value = self.send(Method::POST, &url, Some(body))?;
        let id = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DriverError::InvalidResponse("missing value.sessionId".into()))?;

        info!(session = id, locale, "browser session started");
        self.session_id = Some(id.to_string());
        Ok(())
    }

    fn session_url(&self, path: &str) -> Result<String, DriverError> {
        let id = self.session_id.as_deref().ok_or(DriverError::NoSession)?;
        Ok(format!("{}/session/{id}{path}", self.endpoint))
    }

    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DriverError> {
        let url = self.session_url(path)?;
        self.send(method, &url, body)
    }

    fn send(&self, method: Method, url: &str, body: Option<Value>) -> Result<Value, DriverError> {
        let mut req = self.client.request(method, url);
        if let Some(b) = &body {
            req = req.json(b);
        }

        let resp = req.send()?;
        let status = resp.status();
        // Lê como texto primeiro para não perder a mensagem de erro
        let text = resp.text()?;

        if !status.is_success() {
            return Err(DriverError::Protocol(extract_error_message(status, &text)));
        }

        let v: Value = serde_json::from_str(&text)
            .map_err(|e| DriverError::InvalidResponse(format!("invalid JSON: {e}")))?;
        Ok(v.get("value").cloned().unwrap_or(Value::Null))
    }

    fn find_elements(&self, using: &str, value: &str) -> Result<Vec<String>, DriverError> {
        let found = self.command(
            Method::POST,
            "/elements",
            Some(json!({ "using": using, "value": value })),
        )?;

        let arr = found
            .as_array()
            .ok_or_else(|| DriverError::InvalidResponse("elements: expected array".into()))?;

        Ok(arr
            .iter()
            .filter_map(|el| el.get(ELEMENT_KEY).and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect())
    }

    fn element_flag(&self, element: &str, flag: &str) -> Result<bool, DriverError> {
        let v = self.command(Method::GET, &format!("/element/{element}/{flag}"), None)?;
        Ok(v.as_bool().unwrap_or(false))
    }

    fn execute(&self, script: &str, control: &Control) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [{ ELEMENT_KEY: control.0 }] })),
        )?;
        Ok(())
    }
}

impl ListingDriver for WebDriverSession {
    fn navigate(&mut self, url: &str, locale: &str) -> Result<(), DriverError> {
        if self.session_id.is_none() {
            self.start_session(locale)?;
        }
        self.command(Method::POST, "/url", Some(json!({ "url": url })))?;
        Ok(())
    }

    fn current_fragments(&mut self) -> Result<Vec<Fragment>, DriverError> {
        let source = self.command(Method::GET, "/source", None)?;
        let html = source
            .as_str()
            .ok_or_else(|| DriverError::InvalidResponse("source: expected string".into()))?;
        Ok(split_page(html))
    }

    fn fragment_count(&mut self) -> Result<usize, DriverError> {
        Ok(self.find_elements("css selector", ITEM_SELECTOR)?.len())
    }

    fn find_load_more(&mut self) -> Result<Option<Control>, DriverError> {
        let xpath = self.load_more_xpath.clone();
        let Some(element) = self.find_elements("xpath", &xpath)?.into_iter().next() else {
            return Ok(None);
        };

        if self.element_flag(&element, "displayed")? && self.element_flag(&element, "enabled")? {
            Ok(Some(Control(element)))
        } else {
            Ok(None)
        }
    }

    fn scroll_into_view(&mut self, control: &Control) -> Result<(), DriverError> {
        self.execute(SCROLL_SCRIPT, control)
    }

    fn click(&mut self, control: &Control) -> Result<(), DriverError> {
        let native = self.command(
            Method::POST,
            &format!("/element/{}/click", control.0),
            Some(json!({})),
        );

        match native {
            Ok(_) => Ok(()),
            // Botão coberto por outro elemento: tenta o clique via JavaScript
            Err(DriverError::Protocol(msg)) => {
                debug!(error = %msg, "native click rejected, falling back to script click");
                self.execute(CLICK_SCRIPT, control)
            }
            Err(e) => Err(e),
        }
    }

    fn close(&mut self) -> Result<(), DriverError> {
        let Some(id) = self.session_id.as_deref() else {
            return Ok(());
        };
        let url = format!("{}/session/{id}", self.endpoint);
        // Só esquece a sessão depois que o navegador confirmou o encerramento
        self.send(Method::DELETE, &url, None)?;
        if let Some(id) = self.session_id.take() {
            info!(session = %id, "browser session closed");
        }
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.session_id.is_some() {
            if let Err(e) = self.close() {
                warn!(error = %e, "failed to close browser session on drop");
            }
        }
    }
}

fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    // Padrão W3C: { "value": { "error": "...", "message": "..." } }
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        let value = v.get("value").unwrap_or(&v);
        let error = value.get("error").and_then(|e| e.as_str());
        let message = value.get("message").and_then(|m| m.as_str());
        match (error, message) {
            (Some(e), Some(m)) => return format!("HTTP {}: {e}: {m}", status.as_u16()),
            (Some(e), None) => return format!("HTTP {}: {e}", status.as_u16()),
            (None, Some(m)) => return format!("HTTP {}: {m}", status.as_u16()),
            (None, None) => {}
        }
    }

    let trimmed = body_text.trim();
    let snippet: String = trimmed.chars().take(400).collect();
    if snippet.len() < trimmed.len() {
        format!("HTTP {}: {snippet}...", status.as_u16())
    } else {
        format!("HTTP {}: {snippet}", status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_w3c_shape() {
        let body = r#"{"value":{"error":"no such element","message":"Unable to locate element","stacktrace":""}}"#;
        assert_eq!(
            extract_error_message(StatusCode::NOT_FOUND, body),
            "HTTP 404: no such element: Unable to locate element"
        );
    }

    #[test]
    fn error_message_falls_back_to_body_snippet() {
        let long = "x".repeat(500);
        let msg = extract_error_message(StatusCode::BAD_GATEWAY, &long);
        assert!(msg.starts_with("HTTP 502: xxx"));
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn commands_require_a_session() {
        let mut session = WebDriverSession::new("http://127.0.0.1:9", "//button", true).unwrap();
        assert!(matches!(session.current_fragments(), Err(DriverError::NoSession)));
        assert!(session.close().is_ok());
    }

    #[test]
    fn failed_close_keeps_the_session() {
        let mut session = WebDriverSession::new("http://127.0.0.1:9", "//button", true).unwrap();
        session.session_id = Some("abc".into());

        assert!(matches!(session.close(), Err(DriverError::Transport(_))));
        assert_eq!(session.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        let mut session = WebDriverSession::new("http://127.0.0.1:9/", "//button", true).unwrap();
        assert!(matches!(
            session.navigate("https://example.com", "en-US, en"),
            Err(DriverError::Transport(_))
        ));
    }
}
