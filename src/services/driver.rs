use std::{
    thread,
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::parsers::listing::Fragment;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("no browser session, navigate first")]
    NoSession,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webdriver error: {0}")]
    Protocol(String),
    #[error("unexpected webdriver response: {0}")]
    InvalidResponse(String),
}

/// Referência opaca a um elemento interativo da página (o botão "load more").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control(pub String);

/// Página de listagem paginada, controlada por automação de navegador.
///
/// Cada execução de locale é dona exclusiva da sessão e deve chamar `close`
/// ao final, com ou sem sucesso.
pub trait ListingDriver {
    fn navigate(&mut self, url: &str, locale: &str) -> Result<(), DriverError>;

    fn current_fragments(&mut self) -> Result<Vec<Fragment>, DriverError>;

    fn fragment_count(&mut self) -> Result<usize, DriverError> {
        Ok(self.current_fragments()?.len())
    }

    /// `None` quando o controle não existe ou ainda não está clicável.
    fn find_load_more(&mut self) -> Result<Option<Control>, DriverError>;

    fn scroll_into_view(&mut self, control: &Control) -> Result<(), DriverError>;

    fn click(&mut self, control: &Control) -> Result<(), DriverError>;

    fn close(&mut self) -> Result<(), DriverError>;
}

/// Espera limitada: avalia `condition` até ela retornar `true` ou o prazo acabar.
///
/// A condição é sempre avaliada pelo menos uma vez, mesmo com `timeout` zero.
pub fn wait_until<F>(timeout: Duration, poll: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    // Prazo que não cabe num Instant equivale a esperar sem limite.
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if condition() {
            return true;
        }
        let now = Instant::now();
        match deadline {
            Some(d) if now >= d => return false,
            Some(d) => thread::sleep(poll.min(d - now)),
            None => thread::sleep(poll),
        }
    }
}

/// Como `wait_until`, mas devolve o primeiro valor encontrado.
pub fn wait_for<T, F>(timeout: Duration, poll: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let mut found = None;
    wait_until(timeout, poll, || {
        found = probe();
        found.is_some()
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_checked_once_with_zero_timeout() {
        let mut calls = 0;
        let ok = wait_until(Duration::ZERO, Duration::from_millis(10), || {
            calls += 1;
            false
        });
        assert!(!ok);
        assert_eq!(calls, 1);
    }

    #[test]
    fn polls_until_condition_holds() {
        let mut calls = 0;
        let ok = wait_until(Duration::from_secs(5), Duration::from_millis(1), || {
            calls += 1;
            calls == 3
        });
        assert!(ok);
        assert_eq!(calls, 3);
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let mut calls = 0;
        let ok = wait_until(Duration::from_secs(u64::MAX / 2), Duration::ZERO, || {
            calls += 1;
            calls == 2
        });
        assert!(ok);
        assert_eq!(calls, 2);
    }

    #[test]
    fn wait_for_returns_probe_value() {
        let mut n = 0;
        let v = wait_for(Duration::from_secs(1), Duration::from_millis(1), || {
            n += 1;
            (n >= 2).then_some(n * 10)
        });
        assert_eq!(v, Some(20));

        let none: Option<u8> = wait_for(Duration::ZERO, Duration::ZERO, || None);
        assert_eq!(none, None);
    }
}
