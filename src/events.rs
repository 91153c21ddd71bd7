use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::cache::CacheKey;
use crate::domain::{Group, Owner};

#[derive(Debug, Clone)]
pub enum BrowseEvent {
    LoggedIn { user: Owner, group: Group },
    GroupChanged { group: Group },
    LoggedOut,
    ChildrenReady { key: CacheKey, count: usize },
    FetchFailed { key: CacheKey, message: String },
    ThumbnailReady { image_id: i64, size: u32 },
}

#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<BrowseEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<BrowseEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    pub fn publish(&self, event: BrowseEvent) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}
