use serde::Serialize;

pub const RATING_NOT_AVAILABLE: &str = "N/A";

const TITLE_URL_PREFIX: &str = "https://m.imdb.com/title/";

/// Um item da listagem, tal como aparece numa execução de um único locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub identifier: String,
    pub title: String,
    pub release_year: Option<String>,
    /// `RATING_NOT_AVAILABLE` quando a listagem não mostra nota.
    pub source_rating: String,
}

/// Título descoberto, já com os nomes dos dois locales unidos pelo identificador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub identifier: String,
    pub title_primary: String,
    pub title_secondary: Option<String>,
    pub release_year: Option<String>,
    pub source_rating: String,
}

impl Record {
    pub fn page_url(&self) -> String {
        format!("{TITLE_URL_PREFIX}{}", self.identifier)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Enrichment {
    #[serde(rename = "TMDbRating")]
    pub secondary_rating: f64,

    #[serde(rename = "Status")]
    pub status: String,

    #[serde(rename = "PosterRu")]
    pub poster_url: Option<String>,

    #[serde(rename = "Backdrop")]
    pub backdrop_url: Option<String>,

    #[serde(rename = "OverviewRu")]
    pub overview: String,

    #[serde(rename = "Episodes")]
    pub episode_count: Option<u32>,

    #[serde(rename = "Tags")]
    pub tags: Vec<String>,

    #[serde(rename = "Genres")]
    pub genres: Vec<String>,
}

/// Entrada nova da coleção persistida. Nunca é alterada depois de criada.
///
/// Sem enriquecimento (`enrichment == None`) só as chaves do `Record` são gravadas.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct EnrichedRecord {
    #[serde(rename = "ID")]
    pub id: usize,

    #[serde(rename = "TitleEng")]
    pub title_primary: String,

    #[serde(rename = "TitleRu")]
    pub title_secondary: Option<String>,

    #[serde(rename = "URL")]
    pub url: String,

    #[serde(rename = "TTID")]
    pub identifier: String,

    #[serde(rename = "Year")]
    pub release_year: Option<String>,

    #[serde(rename = "IMDbRating")]
    pub source_rating: String,

    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

impl EnrichedRecord {
    pub fn new(id: usize, record: Record, enrichment: Option<Enrichment>) -> Self {
        let url = record.page_url();
        EnrichedRecord {
            id,
            title_primary: record.title_primary,
            title_secondary: record.title_secondary,
            url,
            identifier: record.identifier,
            release_year: record.release_year,
            source_rating: record.source_rating,
            enrichment,
        }
    }
}
