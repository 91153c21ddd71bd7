use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use serde::Serialize;
use tracing::trace;

use crate::domain::{Group, ObjectKind, Owner, RemoteObject};
use crate::events::EventBus;
use crate::loader::AsyncLoader;
use crate::repository::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub parent_id: i64,
    pub parent_kind: ObjectKind,
    pub group_id: i64,
    pub owner_id: i64,
}

impl CacheKey {
    pub fn new(parent: &RemoteObject, group: &Group, owner: &Owner) -> Self {
        Self {
            parent_id: parent.id(),
            parent_kind: parent.kind(),
            group_id: group.id,
            owner_id: owner.id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}@group:{}/owner:{}",
            self.parent_kind, self.parent_id, self.group_id, self.owner_id
        )
    }
}

pub type CacheEntry = Arc<Vec<Arc<RemoteObject>>>;

pub(crate) type EntryMap = Arc<RwLock<HashMap<CacheKey, CacheEntry>>>;

pub(crate) fn read_entries(
    entries: &RwLock<HashMap<CacheKey, CacheEntry>>,
) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
    entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct HierarchyCache {
    entries: EntryMap,
    loader: AsyncLoader,
}

impl HierarchyCache {
    pub fn new(repository: Arc<dyn Repository>, events: EventBus) -> Self {
        let entries: EntryMap = Arc::default();
        let loader = AsyncLoader::spawn(repository, entries.clone(), events);
        Self { entries, loader }
    }

    pub fn get_children(
        &self,
        parent: &Arc<RemoteObject>,
        group: &Group,
        owner: &Owner,
    ) -> Vec<Arc<RemoteObject>> {
        match parent.kind() {
            ObjectKind::Image => return Vec::new(),
            ObjectKind::OrphanedFolder => return parent.orphaned_images(),
            _ => {}
        }

        let key = CacheKey::new(parent, group, owner);
        if let Some(entry) = self.cached(&key) {
            trace!(%key, "cache hit");
            return entry.as_ref().clone();
        }
        self.loader
            .fetch(key, parent.clone(), group.clone(), owner.clone());
        Vec::new()
    }

    /// Whether `node` can be shown without an expand arrow. A reported count of
    /// zero decides at once; a missing count is settled by the first fetch.
    /// Datasets and wells also become leaves once fetched empty.
    pub fn is_leaf(&self, node: &Arc<RemoteObject>, group: &Group, owner: &Owner) -> bool {
        let fetched_empty = || {
            self.cached(&CacheKey::new(node, group, owner))
                .is_some_and(|entry| entry.is_empty())
        };
        match node.kind() {
            ObjectKind::Server => false,
            ObjectKind::Image => true,
            ObjectKind::OrphanedFolder => node.child_count() == Some(0),
            ObjectKind::Dataset | ObjectKind::Well => {
                node.child_count() == Some(0) || fetched_empty()
            }
            ObjectKind::Project | ObjectKind::Screen | ObjectKind::Plate => {
                match node.child_count() {
                    Some(count) => count == 0,
                    None => fetched_empty(),
                }
            }
        }
    }

    pub fn cached(&self, key: &CacheKey) -> Option<CacheEntry> {
        read_entries(&self.entries).get(key).cloned()
    }

    pub fn is_loaded(&self, key: &CacheKey) -> bool {
        read_entries(&self.entries).contains_key(key)
    }

    pub fn len(&self) -> usize {
        read_entries(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shutdown(&self) {
        self.loader.shutdown();
    }
}
