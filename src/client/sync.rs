use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{Change, ChangeEvent, delivery::Delivery};
use crate::{
    Result,
    cache::Cache,
    config::{CachePaths, Conf},
    poller::{SyncOrigin, UpdateHandler},
    transport::{Item, Requester, VersionId},
};

/// State shared between the client facade and the poller task.
pub(crate) struct SyncEngine {
    pub(crate) conf: Conf,
    pub(crate) paths: CachePaths,
    pub(crate) cache: Cache,
    pub(crate) requester: Arc<dyn Requester>,
    pub(crate) delivery: Delivery,
}

impl SyncEngine {
    pub(crate) fn new(conf: Conf, requester: Arc<dyn Requester>) -> Self {
        Self {
            paths: conf.cache_paths(),
            conf,
            cache: Cache::new(),
            requester,
            delivery: Delivery::new(),
        }
    }

    /// Fetches `version` and applies it to the cache.
    ///
    /// The cache is left untouched when the fetch fails.
    #[instrument(skip(self), fields(project = %self.conf.project_name, env = %self.conf.env_name))]
    pub(crate) async fn sync(&self, version: VersionId) -> Result<ChangeEvent> {
        let items = self.requester.items(version).await?;
        debug!(items = items.len(), "Fetched configuration items");
        Ok(self.process_result(items))
    }

    /// Diffs `items` against the cache, applies them and returns the changes.
    ///
    /// The snapshot is persisted afterwards when the disk cache is enabled,
    /// even if nothing changed.
    pub(crate) fn process_result(&self, items: Vec<Item>) -> ChangeEvent {
        let after: HashMap<String, String> =
            items.into_iter().map(|item| (item.key, item.value)).collect();
        let before = self.cache.dump();

        let changes = diff_snapshots(&before, &after);

        let removed = before
            .keys()
            .filter(|key| !after.contains_key(*key))
            .map(String::as_str);
        let upserted = after.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        self.cache.apply(removed, upserted);

        if self.conf.enable_cache {
            if let Err(e) = self.persist() {
                warn!(path = %self.paths.file().display(), error = %e, "Failed to store cache file");
            }
        }

        ChangeEvent::new(changes)
    }

    /// Writes the cache to its snapshot file, creating the directory on demand.
    pub(crate) fn persist(&self) -> Result<()> {
        self.paths.ensure_dir()?;
        self.cache.store(self.paths.file())
    }

    /// Replaces the cache with the persisted snapshot.
    pub(crate) fn restore(&self) -> Result<()> {
        self.cache.load(self.paths.file())
    }
}

#[async_trait]
impl UpdateHandler for SyncEngine {
    async fn handle_update(&self, version: VersionId, origin: SyncOrigin) -> Result<()> {
        let event = self.sync(version).await?;

        match origin {
            SyncOrigin::Preload => {
                debug!(%version, keys = self.cache.len(), "Preload applied");
            }
            SyncOrigin::Update if event.is_empty() => {
                debug!(%version, "Version changed without key changes");
            }
            SyncOrigin::Update => self.delivery.deliver(event).await,
        }

        Ok(())
    }
}

/// Classifies every key of `before` and `after` into add, modify or delete.
///
/// Keys present in both with identical values produce no change. Values are
/// compared byte for byte.
pub(crate) fn diff_snapshots(
    before: &HashMap<String, String>,
    after: &HashMap<String, String>,
) -> HashMap<String, Change> {
    let mut changes = HashMap::new();

    for (key, old) in before {
        if !after.contains_key(key) {
            changes.insert(key.clone(), Change::deleted(key.as_str(), old.as_str()));
        }
    }

    for (key, new) in after {
        match before.get(key) {
            None => {
                changes.insert(key.clone(), Change::added(key.as_str(), new.as_str()));
            }
            Some(old) if old != new => {
                changes.insert(
                    key.clone(),
                    Change::modified(key.as_str(), old.as_str(), new.as_str()),
                );
            }
            Some(_) => {}
        }
    }

    changes
}
