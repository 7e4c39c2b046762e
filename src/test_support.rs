//! In-memory authority used by unit tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    RccError, Result,
    transport::{Item, Requester, VersionId},
};

/// Authority double whose active version and item sets are set by the test.
#[derive(Default)]
pub(crate) struct FakeAuthority {
    active: Mutex<i64>,
    versions: Mutex<HashMap<VersionId, Vec<Item>>>,
    unreachable: AtomicBool,
    version_checks: AtomicUsize,
    item_fetches: AtomicUsize,
}

impl FakeAuthority {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Publishes `items` as version `id` and makes it active.
    pub(crate) fn publish(&self, id: i64, items: &[(&str, &str)]) {
        let items = items.iter().map(|(k, v)| Item::new(*k, *v)).collect();
        if let Ok(mut versions) = self.versions.lock() {
            versions.insert(VersionId(id), items);
        }
        if let Ok(mut active) = self.active.lock() {
            *active = id;
        }
    }

    pub(crate) fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub(crate) fn version_checks(&self) -> usize {
        self.version_checks.load(Ordering::SeqCst)
    }

    pub(crate) fn item_fetches(&self) -> usize {
        self.item_fetches.load(Ordering::SeqCst)
    }

    fn check_reachable(&self, url: &str) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RccError::Transport {
                url: url.to_string(),
                details: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Requester for FakeAuthority {
    async fn active_version(&self) -> Result<VersionId> {
        self.version_checks.fetch_add(1, Ordering::SeqCst);
        self.check_reachable("fake://version")?;
        let active = self.active.lock().map(|a| *a).unwrap_or_default();
        Ok(VersionId(active))
    }

    async fn items(&self, version: VersionId) -> Result<Vec<Item>> {
        self.item_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_reachable("fake://items")?;
        self.versions
            .lock()
            .ok()
            .and_then(|versions| versions.get(&version).cloned())
            .ok_or_else(|| RccError::Transport {
                url: "fake://items".to_string(),
                details: format!("version {version} not found"),
            })
    }
}
