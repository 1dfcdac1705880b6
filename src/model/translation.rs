use std::{collections::HashMap, fs, path::Path};

use tracing::{info, warn};

/// Tabelas de tradução de tags e gêneros. Somente leitura durante a execução.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    tags: HashMap<String, String>,
    genres: HashMap<String, String>,
}

impl TranslationTable {
    pub fn new(tags: HashMap<String, String>, genres: HashMap<String, String>) -> Self {
        TranslationTable { tags, genres }
    }

    pub fn load(tags_file: &Path, genres_file: &Path) -> Self {
        let tags = load_mapping(tags_file);
        let genres = load_mapping(genres_file);
        info!(tags = tags.len(), genres = genres.len(), "translation tables loaded");
        TranslationTable { tags, genres }
    }

    /// Entradas sem tradução são descartadas, nunca repassadas.
    pub fn translate_tags<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        translate(&self.tags, names)
    }

    pub fn translate_genres<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        translate(&self.genres, names)
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn genre_count(&self) -> usize {
        self.genres.len()
    }
}

fn translate<'a, I>(table: &HashMap<String, String>, names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|n| table.get(n).cloned())
        .collect()
}

fn load_mapping(path: &Path) -> HashMap<String, String> {
    if !path.exists() {
        warn!(path = %path.display(), "translation file not found, table is empty");
        return HashMap::new();
    }

    let data = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read translation file");
            return HashMap::new();
        }
    };

    match serde_json::from_str(&data) {
        Ok(map) => map,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse translation file");
            HashMap::new()
        }
    }
}
