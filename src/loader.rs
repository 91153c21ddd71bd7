use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheKey, EntryMap, read_entries};
use crate::domain::{Group, ObjectKind, Owner, RemoteObject};
use crate::error::BrowseError;
use crate::events::{BrowseEvent, EventBus};
use crate::orphaned;
use crate::repository::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchState {
    Fetching,
    Cached,
}

struct Job {
    key: CacheKey,
    parent: Arc<RemoteObject>,
    group: Group,
    owner: Owner,
}

/// Single background worker that loads child lists, one at a time.
///
/// The worker thread owns the per-key fetch state, so "already requested?"
/// is answered on the worker itself and a key is fetched at most once.
pub struct AsyncLoader {
    sender: Sender<Job>,
    closed: Arc<AtomicBool>,
}

impl AsyncLoader {
    pub(crate) fn spawn(
        repository: Arc<dyn Repository>,
        entries: EntryMap,
        events: EventBus,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        let closed = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            repository,
            entries,
            events,
            states: HashMap::new(),
            closed: closed.clone(),
        };
        thread::Builder::new()
            .name("hierarchy-loader".to_string())
            .spawn(move || worker.run(receiver))
            .map_err(|err| warn!("failed to start hierarchy loader: {err}"))
            .ok();
        Self { sender, closed }
    }

    pub fn fetch(&self, key: CacheKey, parent: Arc<RemoteObject>, group: Group, owner: Owner) {
        if self.is_closed() {
            debug!(%key, "loader closed, dropping fetch");
            return;
        }
        let job = Job {
            key,
            parent,
            group,
            owner,
        };
        if self.sender.send(job).is_err() {
            debug!(%key, "loader thread gone, dropping fetch");
        }
    }

    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("hierarchy loader shut down");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for AsyncLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    repository: Arc<dyn Repository>,
    entries: EntryMap,
    events: EventBus,
    states: HashMap<CacheKey, FetchState>,
    closed: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self, receiver: Receiver<Job>) {
        for job in receiver {
            if self.closed.load(Ordering::SeqCst) {
                debug!("dropping queued fetches after shutdown");
                break;
            }
            self.handle(job);
        }
    }

    fn handle(&mut self, job: Job) {
        let Job {
            key,
            parent,
            group,
            owner,
        } = job;
        if let Some(state) = self.states.get(&key) {
            debug!(%key, ?state, "fetch already handled");
            return;
        }
        self.states.insert(key, FetchState::Fetching);

        let result = self.load(&parent, &group, &owner);
        if self.closed.load(Ordering::SeqCst) {
            debug!(%key, "discarding result fetched during shutdown");
            self.states.remove(&key);
            return;
        }
        self.complete(key, result);
    }

    fn load(
        &mut self,
        parent: &Arc<RemoteObject>,
        group: &Group,
        owner: &Owner,
    ) -> Result<Vec<Arc<RemoteObject>>, BrowseError> {
        match parent.kind() {
            ObjectKind::Server if owner.is_all_members() => self.load_all_members(parent, group),
            ObjectKind::Server => self.load_server(parent, group, owner),
            ObjectKind::Image => Ok(Vec::new()),
            ObjectKind::OrphanedFolder => Ok(parent.orphaned_images()),
            ObjectKind::Project
            | ObjectKind::Dataset
            | ObjectKind::Screen
            | ObjectKind::Plate
            | ObjectKind::Well => {
                debug!(parent = %parent.object_ref(), group = group.id, owner = owner.id, "fetching children");
                let children = self
                    .repository
                    .fetch_children(parent.object_ref(), group, owner)?
                    .into_iter()
                    .map(|descriptor| RemoteObject::from_descriptor(descriptor, parent))
                    .collect();
                Ok(children)
            }
        }
    }

    fn load_server(
        &self,
        server: &Arc<RemoteObject>,
        group: &Group,
        owner: &Owner,
    ) -> Result<Vec<Arc<RemoteObject>>, BrowseError> {
        debug!(group = group.id, owner = owner.id, "fetching top-level containers");
        let mut children = self
            .repository
            .fetch_children(server.object_ref(), group, owner)?
            .into_iter()
            .map(|descriptor| RemoteObject::from_descriptor(descriptor, server))
            .collect::<Vec<_>>();
        let orphans = self.repository.fetch_orphaned_images(group, owner)?;
        if !orphans.is_empty() {
            children.push(orphaned::orphaned_folder(server, group, owner, orphans));
        }
        Ok(children)
    }

    fn load_all_members(
        &mut self,
        server: &Arc<RemoteObject>,
        group: &Group,
    ) -> Result<Vec<Arc<RemoteObject>>, BrowseError> {
        let owners = self.repository.list_owners(group)?;
        debug!(group = group.id, owners = owners.len(), "fetching for all members");

        let mut children = Vec::new();
        for owner in owners.iter().filter(|owner| !owner.is_all_members()) {
            let key = CacheKey::new(server, group, owner);
            let entry = match self.cached(&key) {
                Some(entry) => entry,
                None => {
                    self.states.insert(key, FetchState::Fetching);
                    let result = self.load_server(server, group, owner);
                    match self.complete(key, result) {
                        Some(entry) => entry,
                        None => {
                            return Err(BrowseError::Http(format!(
                                "children of {} for {owner} unavailable",
                                server.name()
                            )));
                        }
                    }
                }
            };
            children.extend(entry.iter().cloned());
        }

        children.sort_by_cached_key(|child| (child.kind(), child.name().to_lowercase()));
        Ok(orphaned::fold_orphans(server, group, children))
    }

    fn cached(&self, key: &CacheKey) -> Option<CacheEntry> {
        if self.states.get(key) != Some(&FetchState::Cached) {
            return None;
        }
        read_entries(&self.entries).get(key).cloned()
    }

    /// Records the outcome of a fetch. Access denial caches an empty list;
    /// any other failure returns the key to "unrequested" so a later expand
    /// retries it.
    fn complete(
        &mut self,
        key: CacheKey,
        result: Result<Vec<Arc<RemoteObject>>, BrowseError>,
    ) -> Option<CacheEntry> {
        match result {
            Ok(children) => Some(self.store(key, children)),
            Err(BrowseError::AccessDenied(object)) => {
                warn!(%key, "access denied to {object}, showing no children");
                Some(self.store(key, Vec::new()))
            }
            Err(err) => {
                warn!(%key, "fetch failed: {err}");
                self.states.remove(&key);
                self.events.publish(BrowseEvent::FetchFailed {
                    key,
                    message: err.to_string(),
                });
                None
            }
        }
    }

    fn store(&mut self, key: CacheKey, children: Vec<Arc<RemoteObject>>) -> CacheEntry {
        let count = children.len();
        let entry: CacheEntry = Arc::new(children);
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key, entry.clone());
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key, entry.clone());
            }
        }
        self.states.insert(key, FetchState::Cached);
        debug!(%key, count, "children cached");
        self.events.publish(BrowseEvent::ChildrenReady { key, count });
        entry
    }
}
