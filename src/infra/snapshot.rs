//! On-disk JSON snapshots of the catalogs and the aggregated auction house.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info};

use crate::error::SnapshotError;

/// A named set of records kept between runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Realms,
    Professions,
    Recipes,
    Items,
    Auctions,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Realms => "realms",
            Collection::Professions => "professions",
            Collection::Recipes => "recipes",
            Collection::Items => "items",
            Collection::Auctions => "auctions",
        }
    }
}

/// File envelope of a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// RFC 3339 timestamp of the fetch.
    pub fetched_at: String,
    pub records: Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            fetched_at: now_rfc3339(),
            records,
        }
    }

    pub fn fetched_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.fetched_at, &Rfc3339).ok()
    }

    pub fn age(&self) -> Option<Duration> {
        let fetched = self.fetched_at()?;
        let elapsed = OffsetDateTime::now_utc() - fetched;
        Some(Duration::from_secs(
            u64::try_from(elapsed.whole_seconds()).unwrap_or(0),
        ))
    }

    /// Human-readable age, e.g. `3h`.
    pub fn age_string(&self) -> String {
        let Some(age) = self.age() else {
            return "unknown".to_string();
        };
        let secs = age.as_secs();
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a, T> {
    fetched_at: String,
    records: &'a [T],
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Snapshot files of one region, language and realm.
///
/// Catalogs live in `<root>/<region>.<language>/`, the auction snapshot in
/// `<root>/auctions/<region>.<realm>.json`.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    root: PathBuf,
    catalog_dir: String,
    auction_file: String,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>, region: &str, language: &str, realm: &str) -> Self {
        Self {
            root: root.into(),
            catalog_dir: format!("{region}.{language}"),
            auction_file: format!("{region}.{realm}.json"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, collection: Collection) -> PathBuf {
        match collection {
            Collection::Auctions => self.root.join("auctions").join(&self.auction_file),
            other => self
                .root
                .join(&self.catalog_dir)
                .join(format!("{}.json", other.name())),
        }
    }

    /// Records of a collection; empty when nothing was stored yet.
    pub fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, SnapshotError> {
        Ok(self
            .load_snapshot(collection)?
            .map(|snapshot| snapshot.records)
            .unwrap_or_default())
    }

    /// The whole envelope, `None` when the file does not exist. A file that
    /// exists but cannot be read or parsed is an error.
    pub fn load_snapshot<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Option<Snapshot<T>>, SnapshotError> {
        let path = self.path(collection);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no snapshot yet");
                return Ok(None);
            }
            Err(source) => return Err(SnapshotError::Io { path, source }),
        };
        let snapshot: Snapshot<T> = serde_json::from_str(&content)
            .map_err(|source| SnapshotError::Corrupt {
                path: path.clone(),
                source,
            })?;
        debug!(
            collection = collection.name(),
            records = snapshot.records.len(),
            age = %snapshot.age_string(),
            "loaded snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Replaces a collection, creating directories as needed.
    pub fn store<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<(), SnapshotError> {
        let path = self.path(collection);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SnapshotError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let envelope = SnapshotRef {
            fetched_at: now_rfc3339(),
            records,
        };
        let content = serde_json::to_string(&envelope).map_err(|source| SnapshotError::Corrupt {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, content).map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;
        info!(
            collection = collection.name(),
            records = records.len(),
            path = %path.display(),
            "stored snapshot"
        );
        Ok(())
    }

    /// Removes a collection. Clearing a missing collection is a no-op.
    pub fn clear(&self, collection: Collection) -> Result<(), SnapshotError> {
        let path = self.path(collection);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(collection = collection.name(), "cleared snapshot");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SnapshotError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SnapshotStore {
        SnapshotStore::new("/data", "eu", "de_DE", "blackhand")
    }

    #[test]
    fn catalog_and_auction_paths() {
        let store = store();

        assert_eq!(
            store.path(Collection::Recipes),
            PathBuf::from("/data/eu.de_DE/recipes.json")
        );
        assert_eq!(
            store.path(Collection::Auctions),
            PathBuf::from("/data/auctions/eu.blackhand.json")
        );
    }

    #[test]
    fn age_of_fresh_snapshot_is_small() {
        let snapshot = Snapshot::new(vec![1, 2, 3]);

        assert!(snapshot.fetched_at().is_some());
        assert!(snapshot.age().map_or(false, |age| age.as_secs() < 60));
    }

    #[test]
    fn age_of_unparsable_timestamp_is_unknown() {
        let snapshot: Snapshot<u32> = Snapshot {
            fetched_at: "yesterday".to_string(),
            records: Vec::new(),
        };

        assert!(snapshot.age().is_none());
        assert_eq!(snapshot.age_string(), "unknown");
    }
}
