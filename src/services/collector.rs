use std::{collections::HashSet, fmt, thread, time::Duration};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::record::ListingItem;
use crate::parsers::listing::{parse_fragment, Fragment, FragmentOutcome};
use crate::services::driver::{wait_for, wait_until, DriverError, ListingDriver};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub listing_url: String,
    pub max_attempts: usize,
    pub initial_timeout: Duration,
    pub control_timeout: Duration,
    pub expansion_timeout: Duration,
    pub scroll_pause: Duration,
    /// Pausa de cortesia depois de cada expansão.
    pub delay: Duration,
    pub poll_interval: Duration,
}

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("failed to open listing page: {0}")]
    Navigation(#[source] DriverError),
    #[error("no listing items rendered within {0:?}")]
    InitialLoadTimeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExhaustReason {
    AttemptBudget,
    NoExpansionControl,
    ExpansionStalled,
    DriverFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Satisfied,
    Exhausted(ExhaustReason),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Satisfied => f.write_str("satisfied"),
            Termination::Exhausted(ExhaustReason::AttemptBudget) => {
                f.write_str("exhausted: attempt budget reached")
            }
            Termination::Exhausted(ExhaustReason::NoExpansionControl) => {
                f.write_str("exhausted: load-more control not available")
            }
            Termination::Exhausted(ExhaustReason::ExpansionStalled) => {
                f.write_str("exhausted: no new items after expansion")
            }
            Termination::Exhausted(ExhaustReason::DriverFailure(e)) => {
                write!(f, "exhausted: driver failure: {e}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collected {
    pub locale: String,
    pub items: Vec<ListingItem>,
    pub termination: Termination,
    pub attempts: usize,
    pub skipped: usize,
    pub already_known: usize,
}

/// Percorre a listagem até reunir `needed` itens novos ou esgotar as tentativas.
///
/// Só a carga inicial da página é erro fatal; qualquer outra falha encerra a
/// coleta com o que já foi reunido. A sessão do driver é sempre encerrada.
pub fn collect<D>(
    driver: &mut D,
    cfg: &CollectorConfig,
    locale: &str,
    existing: &HashSet<String>,
    needed: usize,
) -> Result<Collected, CollectError>
where
    D: ListingDriver + ?Sized,
{
    if needed == 0 {
        return Ok(Collected {
            locale: locale.to_string(),
            items: Vec::new(),
            termination: Termination::Satisfied,
            attempts: 0,
            skipped: 0,
            already_known: 0,
        });
    }

    let result = run(driver, cfg, locale, existing, needed);

    if let Err(e) = driver.close() {
        warn!(locale, error = %e, "failed to close listing session");
    }

    result
}

struct RunState<'a> {
    existing: &'a HashSet<String>,
    needed: usize,
    items: Vec<ListingItem>,
    seen: HashSet<String>,
    processed: usize,
    attempts: usize,
    skipped: usize,
    already_known: usize,
}

impl RunState<'_> {
    fn done(&self) -> bool {
        self.items.len() >= self.needed
    }

    // Só olha os fragmentos além dos já processados nesta execução.
    fn absorb(&mut self, fragments: &[Fragment]) {
        for fragment in fragments.iter().skip(self.processed) {
            if self.done() {
                break;
            }
            self.processed += 1;

            let item = match parse_fragment(fragment) {
                FragmentOutcome::Parsed(item) => item,
                FragmentOutcome::Skipped(reason) => {
                    self.skipped += 1;
                    warn!(position = self.processed, %reason, "fragment skipped");
                    continue;
                }
            };

            if self.existing.contains(&item.identifier) {
                self.already_known += 1;
                debug!(identifier = %item.identifier, "already persisted, skipping");
                continue;
            }

            if !self.seen.insert(item.identifier.clone()) {
                debug!(identifier = %item.identifier, "rendered twice, skipping");
                continue;
            }

            info!(identifier = %item.identifier, title = %item.title, "collected");
            self.items.push(item);
        }
    }
}

fn run<D>(
    driver: &mut D,
    cfg: &CollectorConfig,
    locale: &str,
    existing: &HashSet<String>,
    needed: usize,
) -> Result<Collected, CollectError>
where
    D: ListingDriver + ?Sized,
{
    info!(locale, needed, url = %cfg.listing_url, "opening listing page");
    driver
        .navigate(&cfg.listing_url, locale)
        .map_err(CollectError::Navigation)?;

    let loaded = wait_until(cfg.initial_timeout, cfg.poll_interval, || {
        matches!(driver.fragment_count(), Ok(n) if n > 0)
    });
    if !loaded {
        return Err(CollectError::InitialLoadTimeout(cfg.initial_timeout));
    }

    let mut state = RunState {
        existing,
        needed,
        items: Vec::new(),
        seen: HashSet::new(),
        processed: 0,
        attempts: 0,
        skipped: 0,
        already_known: 0,
    };

    let termination = loop {
        let fragments = match driver.current_fragments() {
            Ok(f) => f,
            Err(e) => {
                warn!(locale, error = %e, "failed to read rendered items");
                break Termination::Exhausted(ExhaustReason::DriverFailure(e.to_string()));
            }
        };

        info!(
            locale,
            attempt = state.attempts + 1,
            rendered = fragments.len(),
            fresh = fragments.len().saturating_sub(state.processed),
            "page parsed"
        );

        state.absorb(&fragments);
        info!(locale, collected = state.items.len(), needed, "progress");

        if state.done() {
            break Termination::Satisfied;
        }
        if state.attempts >= cfg.max_attempts {
            break Termination::Exhausted(ExhaustReason::AttemptBudget);
        }

        match expand(driver, cfg, fragments.len()) {
            Ok(()) => state.attempts += 1,
            Err(reason) => break Termination::Exhausted(reason),
        }
    };

    state.items.truncate(needed);

    match &termination {
        Termination::Satisfied => info!(locale, total = state.items.len(), "collection complete"),
        other => warn!(locale, total = state.items.len(), needed, reason = %other, "collection ended early"),
    }

    Ok(Collected {
        locale: locale.to_string(),
        items: state.items,
        termination,
        attempts: state.attempts,
        skipped: state.skipped,
        already_known: state.already_known,
    })
}

fn expand<D>(driver: &mut D, cfg: &CollectorConfig, rendered: usize) -> Result<(), ExhaustReason>
where
    D: ListingDriver + ?Sized,
{
    debug!("looking for load-more control");
    let control = wait_for(cfg.control_timeout, cfg.poll_interval, || {
        match driver.find_load_more() {
            Ok(found) => found,
            Err(e) => {
                debug!(error = %e, "load-more lookup failed");
                None
            }
        }
    });

    let Some(control) = control else {
        warn!("load-more control not found or not clickable");
        return Err(ExhaustReason::NoExpansionControl);
    };

    let failure = |e: DriverError| {
        warn!(error = %e, "expansion failed");
        ExhaustReason::DriverFailure(e.to_string())
    };

    driver.scroll_into_view(&control).map_err(failure)?;
    thread::sleep(cfg.scroll_pause);
    driver.click(&control).map_err(failure)?;

    let grew = wait_until(cfg.expansion_timeout, cfg.poll_interval, || {
        matches!(driver.fragment_count(), Ok(n) if n > rendered)
    });
    if !grew {
        warn!(rendered, "no new items rendered after expansion");
        return Err(ExhaustReason::ExpansionStalled);
    }

    thread::sleep(cfg.delay);
    Ok(())
}
