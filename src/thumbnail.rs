use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

use tracing::{debug, warn};

use crate::events::{BrowseEvent, EventBus};
use crate::repository::Repository;

type ThumbnailKey = (i64, u32);

pub struct ThumbnailPool {
    sender: Mutex<Option<Sender<ThumbnailKey>>>,
    cache: Arc<RwLock<HashMap<ThumbnailKey, Arc<[u8]>>>>,
    pending: Arc<Mutex<HashSet<ThumbnailKey>>>,
}

impl ThumbnailPool {
    pub fn new(repository: Arc<dyn Repository>, workers: usize, events: EventBus) -> Self {
        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let cache = Arc::new(RwLock::new(HashMap::new()));
        let pending = Arc::new(Mutex::new(HashSet::new()));

        for index in 0..workers.max(1) {
            let worker = ThumbnailWorker {
                repository: repository.clone(),
                receiver: receiver.clone(),
                cache: cache.clone(),
                pending: pending.clone(),
                events: events.clone(),
            };
            if let Err(err) = thread::Builder::new()
                .name(format!("thumbnail-{index}"))
                .spawn(move || worker.run())
            {
                warn!("failed to start thumbnail worker: {err}");
            }
        }

        Self {
            sender: Mutex::new(Some(sender)),
            cache,
            pending,
        }
    }

    pub fn cached(&self, image_id: i64, size: u32) -> Option<Arc<[u8]>> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&(image_id, size)).cloned())
    }

    pub fn request(&self, image_id: i64, size: u32) -> Option<Arc<[u8]>> {
        if let Some(bytes) = self.cached(image_id, size) {
            return Some(bytes);
        }
        let key = (image_id, size);
        let newly_pending = self
            .pending
            .lock()
            .map(|mut pending| pending.insert(key))
            .unwrap_or(false);
        if !newly_pending {
            return None;
        }
        let sent = self
            .sender
            .lock()
            .ok()
            .and_then(|sender| sender.as_ref().map(|tx| tx.send(key).is_ok()))
            .unwrap_or(false);
        if !sent {
            debug!(image_id, "thumbnail pool closed, dropping request");
            if let Ok(mut pending) = self.pending.lock() {
                pending.remove(&key);
            }
        }
        None
    }

    pub fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

impl Drop for ThumbnailPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct ThumbnailWorker {
    repository: Arc<dyn Repository>,
    receiver: Arc<Mutex<Receiver<ThumbnailKey>>>,
    cache: Arc<RwLock<HashMap<ThumbnailKey, Arc<[u8]>>>>,
    pending: Arc<Mutex<HashSet<ThumbnailKey>>>,
    events: EventBus,
}

impl ThumbnailWorker {
    fn run(self) {
        loop {
            let next = match self.receiver.lock() {
                Ok(receiver) => receiver.recv(),
                Err(_) => break,
            };
            let Ok((image_id, size)) = next else {
                break;
            };

            match self.repository.fetch_thumbnail(image_id, size) {
                Ok(bytes) => {
                    if let Ok(mut cache) = self.cache.write() {
                        cache.insert((image_id, size), Arc::from(bytes));
                    }
                    self.events
                        .publish(BrowseEvent::ThumbnailReady { image_id, size });
                }
                Err(err) => warn!(image_id, "thumbnail fetch failed: {err}"),
            }
            if let Ok(mut pending) = self.pending.lock() {
                pending.remove(&(image_id, size));
            }
        }
    }
}
