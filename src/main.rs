use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use listing_harvester::config::{Cli, CollectArgs, Command, DetailsArgs};
use listing_harvester::model::translation::TranslationTable;
use listing_harvester::services::{
    details,
    enrich::{anilist::AniListClient, omdb::OmdbClient, tmdb::TmdbClient},
    pipeline::{self, Enrichers},
    store::DocumentStore,
    webdriver::WebDriverSession,
};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut backend = open_store(&cli);
    let store = backend
        .as_deref_mut()
        .map(|s| s as &mut dyn DocumentStore);

    match &cli.command {
        Command::Collect(args) => collect(args, store),
        Command::Details(args) => fetch_details(args, store),
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},reqwest=warn,hyper=warn,mongodb=warn",
            cli.log_level.as_str()
        ))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(feature = "mongo")]
fn open_store(cli: &Cli) -> Option<Box<dyn DocumentStore>> {
    use listing_harvester::services::store::MongoStore;

    let uri = cli.store_uri()?;
    match MongoStore::connect(uri, &cli.db_name) {
        Ok(s) => Some(Box::new(s)),
        Err(e) => {
            warn!(error = %e, "document store unavailable, continuing with snapshot only");
            None
        }
    }
}

#[cfg(not(feature = "mongo"))]
fn open_store(cli: &Cli) -> Option<Box<dyn DocumentStore>> {
    if cli.store_uri().is_some() {
        warn!("built without the mongo feature, document store disabled");
    }
    None
}

fn collect(args: &CollectArgs, store: Option<&mut dyn DocumentStore>) -> anyhow::Result<()> {
    let cfg = args.harvest_config()?;

    let mut driver = WebDriverSession::new(&args.webdriver_url, &args.load_more_xpath, args.headless)
        .context("failed to build webdriver client")?;

    let table;
    let tmdb;
    let anilist;
    let enrichers = if args.no_enrich {
        info!("enrichment disabled, persisting identifier-only records");
        None
    } else {
        let key = args.tmdb_api_key();
        if key.is_none() {
            warn!("TMDB_API_KEY not set, details lookups will degrade");
        }
        table = TranslationTable::load(&args.tags_file, &args.genres_file);
        tmdb = TmdbClient::new(key, &args.language).context("failed to build TMDB client")?;
        anilist = AniListClient::new().context("failed to build AniList client")?;
        Some(Enrichers {
            details: &tmdb,
            taxonomy: &anilist,
            table: &table,
        })
    };

    let report = pipeline::run(&cfg, &mut driver, enrichers, store)?;

    info!(
        report = %serde_json::to_string(&report).unwrap_or_default(),
        "harvest finished"
    );
    Ok(())
}

fn fetch_details(args: &DetailsArgs, store: Option<&mut dyn DocumentStore>) -> anyhow::Result<()> {
    let cfg = args.details_config()?;
    let omdb = OmdbClient::new(&args.api_key()?).context("failed to build OMDb client")?;

    let report = details::run(&cfg, &omdb, store);

    info!(
        report = %serde_json::to_string(&report).unwrap_or_default(),
        "details finished"
    );
    Ok(())
}
