use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{CacheKey, HierarchyCache};
use crate::config::ResolvedConfig;
use crate::domain::{Group, ObjectKind, ObjectRef, Owner, RemoteObject};
use crate::error::BrowseError;
use crate::events::{BrowseEvent, EventBus};
use crate::filter::Filter;
use crate::metadata::{self, MergePolicy, ReconcileReport};
use crate::repository::{Credentials, Repository, Tag};
use crate::session::Session;
use crate::thumbnail::ThumbnailPool;
use crate::uri;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocalMetadata {
    #[serde(default)]
    pub key_values: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteMetadata {
    pub object: ObjectRef,
    pub key_values: Vec<(String, String)>,
    pub tags: Vec<Tag>,
    pub duplicate_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataPushReport {
    pub object: ObjectRef,
    pub key_values: ReconcileReport,
    pub tags: ReconcileReport,
}

pub struct Browser {
    session: Session,
    cache: HierarchyCache,
    thumbnails: ThumbnailPool,
    events: EventBus,
    root: Arc<RemoteObject>,
    owner: RwLock<Owner>,
    thumbnail_size: u32,
}

impl Browser {
    pub fn connect(
        repository: Arc<dyn Repository>,
        credentials: &Credentials,
        config: &ResolvedConfig,
    ) -> Result<Self, BrowseError> {
        let events = EventBus::new();
        let session = Session::login(repository.clone(), credentials, events.clone())?;
        let root = RemoteObject::server(session.server_uri());
        let owner = RwLock::new(session.user().clone());
        Ok(Self {
            cache: HierarchyCache::new(repository.clone(), events.clone()),
            thumbnails: ThumbnailPool::new(repository, config.thumbnail_workers, events.clone()),
            session,
            events,
            root,
            owner,
            thumbnail_size: config.thumbnail_size,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &HierarchyCache {
        &self.cache
    }

    pub fn subscribe(&self) -> Receiver<BrowseEvent> {
        self.events.subscribe()
    }

    pub fn root(&self) -> Arc<RemoteObject> {
        self.root.clone()
    }

    pub fn selected_owner(&self) -> Owner {
        self.owner
            .read()
            .map(|owner| owner.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn select_owner(&self, owner: Owner) {
        match self.owner.write() {
            Ok(mut selected) => *selected = owner,
            Err(poisoned) => *poisoned.into_inner() = owner,
        }
    }

    pub fn switch_group(&self, group_id: i64) -> Result<bool, BrowseError> {
        self.session.switch_group(group_id)
    }

    pub fn scope_of(&self, node: &RemoteObject) -> (Group, Owner) {
        match node.kind() {
            ObjectKind::Server => (self.session.active_group(), self.selected_owner()),
            _ => (node.group().clone(), Owner::all_members()),
        }
    }

    pub fn key_of(&self, node: &RemoteObject) -> CacheKey {
        let (group, owner) = self.scope_of(node);
        CacheKey::new(node, &group, &owner)
    }

    pub fn children(&self, node: &Arc<RemoteObject>) -> Vec<Arc<RemoteObject>> {
        let (group, owner) = self.scope_of(node);
        self.cache.get_children(node, &group, &owner)
    }

    pub fn visible_children(
        &self,
        node: &Arc<RemoteObject>,
        filter: &Filter,
    ) -> Vec<Arc<RemoteObject>> {
        filter.apply(&self.children(node))
    }

    pub fn is_leaf(&self, node: &Arc<RemoteObject>) -> bool {
        let (group, owner) = self.scope_of(node);
        self.cache.is_leaf(node, &group, &owner)
    }

    pub fn thumbnail(&self, image_id: i64) -> Option<Arc<[u8]>> {
        self.thumbnails.request(image_id, self.thumbnail_size)
    }

    pub fn object_uri(&self, object: ObjectRef) -> Result<String, BrowseError> {
        uri::object_uri(self.session.server_uri(), object)
    }

    pub fn pull_metadata(&self, object: ObjectRef) -> Result<RemoteMetadata, BrowseError> {
        let repository = self.session.repository();
        let key_values = repository.read_key_values(object)?;
        let tags = repository.read_tags(object)?;
        let duplicate_keys = metadata::duplicate_keys(&key_values);
        Ok(RemoteMetadata {
            object,
            key_values,
            tags,
            duplicate_keys,
        })
    }

    pub fn push_metadata(
        &self,
        object: ObjectRef,
        local: &LocalMetadata,
        key_value_policy: MergePolicy,
        tag_policy: MergePolicy,
    ) -> Result<MetadataPushReport, BrowseError> {
        let repository = self.session.repository().as_ref();
        let key_values =
            metadata::apply_key_values(repository, object, &local.key_values, key_value_policy)?;
        let tags = metadata::apply_tags(
            repository,
            object,
            &local.tags,
            self.session.user().id,
            tag_policy,
        )?;
        Ok(MetadataPushReport {
            object,
            key_values,
            tags,
        })
    }

    pub fn logout(self) -> Result<(), BrowseError> {
        self.cache.shutdown();
        self.thumbnails.shutdown();
        info!(cached_lists = self.cache.len(), "discarding hierarchy cache");
        self.session.logout()
    }
}
