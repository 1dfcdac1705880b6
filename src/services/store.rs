use std::{
    collections::HashSet,
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document store error: {0}")]
    Backend(String),
}

/// Coleção persistida. As entradas existentes são mantidas como JSON opaco
/// para serem regravadas sem alteração (inclusive a ordem das chaves).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedCollection {
    entries: Vec<Value>,
}

impl PersistedCollection {
    pub fn from_entries(entries: Vec<Value>) -> Self {
        PersistedCollection { entries }
    }

    /// Arquivo ausente ou ilegível resulta em coleção vazia.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "no existing collection, starting empty");
            return Self::default();
        }

        let data = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read collection, starting empty");
                return Self::default();
            }
        };

        match serde_json::from_str::<Vec<Value>>(&data) {
            Ok(entries) => {
                info!(path = %path.display(), count = entries.len(), "existing collection loaded");
                PersistedCollection { entries }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse collection, starting empty");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    pub fn identifiers(&self) -> HashSet<String> {
        self.entries
            .iter()
            .filter_map(identifier_of)
            .map(str::to_string)
            .collect()
    }

    pub fn append<T: Serialize>(&mut self, records: &[T]) -> Result<(), StoreError> {
        let mut values = Vec::with_capacity(records.len());
        for r in records {
            values.push(serde_json::to_value(r)?);
        }
        self.entries.extend(values);
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, StoreError> {
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.entries.serialize(&mut ser)?;
        Ok(buf)
    }
}

/// Identificador de uma entrada gravada: `TTID` (coleção completa) ou `ttid`.
pub fn identifier_of(entry: &Value) -> Option<&str> {
    entry
        .get("TTID")
        .or_else(|| entry.get("ttid"))
        .and_then(Value::as_str)
}

pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Grava o snapshot inteiro (sobrescreve) e devolve o SHA-256 do conteúdo.
pub fn write_snapshot(path: &Path, collection: &PersistedCollection) -> Result<String, StoreError> {
    let bytes = collection.to_json()?;
    write_atomic(path, &bytes)?;
    Ok(digest(&bytes))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(&tmp, bytes)?;
    // rename substitui o destino; o snapshot anterior nunca some
    fs::rename(&tmp, path)?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "collection".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}

/// Armazenamento de documentos com substituição total da coleção.
///
/// Apaga tudo e depois insere tudo; uma queda entre os dois passos deixa a
/// coleção vazia.
pub trait DocumentStore {
    fn replace_all(&mut self, collection: &str, docs: &[Value]) -> Result<usize, StoreError>;
}

#[cfg(feature = "mongo")]
pub use self::mongo::MongoStore;

#[cfg(feature = "mongo")]
mod mongo {
    use mongodb::bson::{doc, Document};
    use mongodb::sync::Client;
    use serde_json::Value;

    use super::{DocumentStore, StoreError};

    fn backend(e: impl std::fmt::Display) -> StoreError {
        StoreError::Backend(e.to_string())
    }

    pub struct MongoStore {
        client: Client,
        db_name: String,
    }

    impl MongoStore {
        pub fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
            let client = Client::with_uri_str(uri).map_err(backend)?;
            Ok(MongoStore {
                client,
                db_name: db_name.to_string(),
            })
        }
    }

    impl DocumentStore for MongoStore {
        fn replace_all(&mut self, collection: &str, docs: &[Value]) -> Result<usize, StoreError> {
            let documents = docs
                .iter()
                .map(mongodb::bson::to_document)
                .collect::<Result<Vec<Document>, _>>()
                .map_err(backend)?;

            let coll = self
                .client
                .database(&self.db_name)
                .collection::<Document>(collection);

            coll.delete_many(doc! {}).run().map_err(backend)?;

            if documents.is_empty() {
                return Ok(0);
            }

            let result = coll.insert_many(documents).run().map_err(backend)?;
            Ok(result.inserted_ids.len())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SinkStatus {
    Written { count: usize },
    Disabled,
    Failed { reason: String },
}

impl fmt::Display for SinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkStatus::Written { count } => write!(f, "written ({count} records)"),
            SinkStatus::Disabled => f.write_str("disabled"),
            SinkStatus::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub snapshot: SinkStatus,
    pub store: SinkStatus,
    pub digest: Option<String>,
}

/// Destino no armazenamento de documentos: cliente + nome da coleção.
pub struct StoreTarget<'a> {
    pub store: &'a mut dyn DocumentStore,
    pub collection: &'a str,
}

/// Grava o snapshot JSON e substitui a coleção no armazenamento.
///
/// As duas gravações são independentes: a falha de uma não impede a outra.
pub fn persist(
    collection: &PersistedCollection,
    snapshot_path: &Path,
    target: Option<StoreTarget<'_>>,
) -> PersistReport {
    let (snapshot, digest) = match write_snapshot(snapshot_path, collection) {
        Ok(d) => {
            info!(path = %snapshot_path.display(), total = collection.len(), "snapshot written");
            (SinkStatus::Written { count: collection.len() }, Some(d))
        }
        Err(e) => {
            error!(path = %snapshot_path.display(), error = %e, "failed to write snapshot");
            (SinkStatus::Failed { reason: e.to_string() }, None)
        }
    };

    let store = match target {
        None => {
            info!("document store not configured, skipping");
            SinkStatus::Disabled
        }
        Some(t) => match t.store.replace_all(t.collection, collection.entries()) {
            Ok(count) => {
                info!(collection = t.collection, count, "document store replaced");
                SinkStatus::Written { count }
            }
            Err(e) => {
                error!(collection = t.collection, error = %e, "failed to replace document store");
                SinkStatus::Failed { reason: e.to_string() }
            }
        },
    };

    PersistReport {
        snapshot,
        store,
        digest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingStore {
        collections: std::collections::HashMap<String, Vec<Value>>,
        fail: bool,
    }

    impl DocumentStore for RecordingStore {
        fn replace_all(&mut self, collection: &str, docs: &[Value]) -> Result<usize, StoreError> {
            if self.fail {
                return Err(StoreError::Backend("connection refused".into()));
            }
            self.collections.insert(collection.to_string(), docs.to_vec());
            Ok(docs.len())
        }
    }

    #[test]
    fn missing_or_broken_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PersistedCollection::load(&dir.path().join("absent.json")).is_empty());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "[{").unwrap();
        assert!(PersistedCollection::load(&broken).is_empty());
    }

    #[test]
    fn identifiers_read_both_key_styles() {
        let c = PersistedCollection::from_entries(vec![
            json!({ "ID": 1, "TTID": "tt1" }),
            json!({ "ttid": "tt2" }),
            json!({ "Title": "no id" }),
        ]);
        assert_eq!(
            c.identifiers(),
            HashSet::from(["tt1".to_string(), "tt2".to_string()])
        );
    }

    #[test]
    fn rewriting_loaded_file_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anime_list.json");
        let original = "[\n    {\n        \"ID\": 1,\n        \"TitleEng\": \"Naruto\",\n        \"TMDbRating\": 0,\n        \"Tags\": []\n    }\n]";
        fs::write(&path, original).unwrap();

        let c = PersistedCollection::load(&path);
        let d1 = write_snapshot(&path, &c).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), original);
        assert_eq!(d1, digest(original.as_bytes()));
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn snapshot_is_replaced_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anime_list.json");
        fs::write(&path, "[]").unwrap();

        let c = PersistedCollection::from_entries(vec![json!({ "TTID": "tt1" })]);
        write_snapshot(&path, &c).unwrap();

        assert_eq!(PersistedCollection::load(&path), c);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn sinks_fail_independently() {
        let dir = tempfile::tempdir().unwrap();
        let c = PersistedCollection::from_entries(vec![json!({ "TTID": "tt1" })]);

        // Diretório no lugar do arquivo: a gravação do snapshot falha
        let blocked = dir.path().join("blocked");
        fs::create_dir_all(blocked.join("x")).unwrap();
        let mut store = RecordingStore::default();
        let report = persist(
            &c,
            &blocked,
            Some(StoreTarget { store: &mut store, collection: "anime_list" }),
        );
        assert!(matches!(report.snapshot, SinkStatus::Failed { .. }));
        assert_eq!(report.store, SinkStatus::Written { count: 1 });
        assert_eq!(store.collections["anime_list"].len(), 1);

        let mut failing = RecordingStore { fail: true, ..Default::default() };
        let path = dir.path().join("ok.json");
        let report = persist(
            &c,
            &path,
            Some(StoreTarget { store: &mut failing, collection: "anime_list" }),
        );
        assert_eq!(report.snapshot, SinkStatus::Written { count: 1 });
        assert!(matches!(report.store, SinkStatus::Failed { .. }));
        assert!(path.exists());
    }

    #[test]
    fn no_target_means_disabled_store() {
        let dir = tempfile::tempdir().unwrap();
        let report = persist(&PersistedCollection::default(), &dir.path().join("a.json"), None);
        assert_eq!(report.store, SinkStatus::Disabled);
        assert!(report.digest.is_some());
    }
}
