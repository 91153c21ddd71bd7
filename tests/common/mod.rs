#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

use omero_browse::domain::{
    DescriptorBody, Group, ImageInfo, ObjectDescriptor, ObjectKind, ObjectRef, Owner,
};
use omero_browse::error::BrowseError;
use omero_browse::events::BrowseEvent;
use omero_browse::repository::{Credentials, Repository, SessionHandle, Tag};

pub const SERVER: &str = "https://omero.example.org";

pub fn lab() -> Group {
    Group::new(10, "lab")
}

pub fn alice() -> Owner {
    Owner::new(1, "Alice")
}

pub fn bob() -> Owner {
    Owner::new(2, "Bob")
}

pub fn descriptor(id: i64, name: &str, owner: &Owner, body: DescriptorBody) -> ObjectDescriptor {
    ObjectDescriptor {
        id,
        name: name.to_string(),
        description: None,
        owner: owner.clone(),
        group: lab(),
        child_count: Some(1),
        body,
    }
}

pub fn project(id: i64, name: &str, owner: &Owner) -> ObjectDescriptor {
    descriptor(id, name, owner, DescriptorBody::Project)
}

pub fn dataset(id: i64, name: &str, owner: &Owner) -> ObjectDescriptor {
    descriptor(id, name, owner, DescriptorBody::Dataset)
}

pub fn screen(id: i64, name: &str, owner: &Owner) -> ObjectDescriptor {
    descriptor(id, name, owner, DescriptorBody::Screen)
}

pub fn image(id: i64, name: &str, owner: &Owner) -> ObjectDescriptor {
    let mut image = descriptor(
        id,
        name,
        owner,
        DescriptorBody::Image(ImageInfo {
            size_x: 1024,
            size_y: 1024,
            size_c: 3,
            size_z: 1,
            size_t: 1,
            physical_size_x: Some(0.325),
            physical_size_y: Some(0.325),
            physical_size_z: None,
            pixel_type: "uint16".to_string(),
            acquisition_date: None,
        }),
    );
    image.child_count = None;
    image
}

pub fn server_ref() -> ObjectRef {
    ObjectRef::new(ObjectKind::Server, 0)
}

struct Gate {
    parent: ObjectRef,
    entered: Sender<()>,
    release: Receiver<()>,
}

/// In-memory repository that records every call, in the manner of the
/// mocks used by the app tests.
pub struct FakeRepository {
    pub user: Owner,
    pub groups: Vec<Group>,
    pub is_admin: bool,
    pub password: String,
    pub owners: Vec<Owner>,
    server_children: HashMap<i64, Vec<ObjectDescriptor>>,
    children: HashMap<ObjectRef, Vec<ObjectDescriptor>>,
    orphans: HashMap<i64, Vec<ObjectDescriptor>>,
    failures: Mutex<HashMap<ObjectRef, VecDeque<BrowseError>>>,
    owner_failures: Mutex<HashMap<i64, VecDeque<BrowseError>>>,
    pub owners_fail: bool,
    gate: Mutex<Option<Gate>>,
    pub ping_fails: bool,
    fetch_calls: Mutex<HashMap<(ObjectRef, i64), usize>>,
    pub switched: Mutex<Vec<i64>>,
    key_values: Mutex<HashMap<ObjectRef, Vec<(String, String)>>>,
    tags: Mutex<HashMap<ObjectRef, Vec<Tag>>>,
    tag_ids: Mutex<HashMap<String, i64>>,
    pub annotation_calls: Mutex<usize>,
    pub thumbnail_calls: Mutex<usize>,
    pub logged_out: Mutex<bool>,
}

impl Default for FakeRepository {
    fn default() -> Self {
        Self {
            user: alice(),
            groups: vec![lab()],
            is_admin: false,
            password: "secret".to_string(),
            owners: vec![alice(), bob()],
            server_children: HashMap::new(),
            children: HashMap::new(),
            orphans: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            owner_failures: Mutex::new(HashMap::new()),
            owners_fail: false,
            gate: Mutex::new(None),
            ping_fails: false,
            fetch_calls: Mutex::new(HashMap::new()),
            switched: Mutex::new(Vec::new()),
            key_values: Mutex::new(HashMap::new()),
            tags: Mutex::new(HashMap::new()),
            tag_ids: Mutex::new(HashMap::new()),
            annotation_calls: Mutex::new(0),
            thumbnail_calls: Mutex::new(0),
            logged_out: Mutex::new(false),
        }
    }
}

impl FakeRepository {
    pub fn with_server_children(mut self, owner: &Owner, items: Vec<ObjectDescriptor>) -> Self {
        self.server_children.insert(owner.id, items);
        self
    }

    pub fn with_children(mut self, parent: ObjectRef, items: Vec<ObjectDescriptor>) -> Self {
        self.children.insert(parent, items);
        self
    }

    pub fn with_orphans(mut self, owner: &Owner, items: Vec<ObjectDescriptor>) -> Self {
        self.orphans.insert(owner.id, items);
        self
    }

    pub fn with_key_values(self, object: ObjectRef, pairs: &[(&str, &str)]) -> Self {
        self.key_values.lock().unwrap().insert(
            object,
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_tags(self, object: ObjectRef, tags: Vec<Tag>) -> Self {
        for tag in &tags {
            self.tag_ids
                .lock()
                .unwrap()
                .insert(tag.name.clone(), tag.id);
        }
        self.tags.lock().unwrap().insert(object, tags);
        self
    }

    pub fn fail_next(&self, parent: ObjectRef, error: BrowseError) {
        self.failures
            .lock()
            .unwrap()
            .entry(parent)
            .or_default()
            .push_back(error);
    }

    /// Fails the next children fetch made on behalf of `owner`, whatever the
    /// parent.
    pub fn fail_next_for(&self, owner: &Owner, error: BrowseError) {
        self.owner_failures
            .lock()
            .unwrap()
            .entry(owner.id)
            .or_default()
            .push_back(error);
    }

    /// Makes the next fetch of `parent` block until the returned sender
    /// fires. The receiver reports when the fetch has started.
    pub fn block_on(&self, parent: ObjectRef) -> (Sender<()>, Receiver<()>) {
        let (release_tx, release_rx) = mpsc::channel();
        let (entered_tx, entered_rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some(Gate {
            parent,
            entered: entered_tx,
            release: release_rx,
        });
        (release_tx, entered_rx)
    }

    pub fn fetch_count(&self, parent: ObjectRef, owner: &Owner) -> usize {
        self.fetch_calls
            .lock()
            .unwrap()
            .get(&(parent, owner.id))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetch_calls.lock().unwrap().values().sum()
    }

    pub fn key_values_of(&self, object: ObjectRef) -> HashMap<String, String> {
        self.key_values
            .lock()
            .unwrap()
            .get(&object)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    pub fn tag_names_of(&self, object: ObjectRef) -> Vec<String> {
        let mut names = self
            .tags
            .lock()
            .unwrap()
            .get(&object)
            .map(|tags| tags.iter().map(|tag| tag.name.clone()).collect::<Vec<_>>())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn pass_gate(&self, parent: ObjectRef) {
        let gate = {
            let mut gate = self.gate.lock().unwrap();
            if gate.as_ref().is_some_and(|g| g.parent == parent) {
                gate.take()
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            gate.entered.send(()).ok();
            gate.release.recv_timeout(Duration::from_secs(5)).ok();
        }
    }

    fn take_failure(&self, parent: ObjectRef, owner: &Owner) -> Option<BrowseError> {
        let by_owner = self
            .owner_failures
            .lock()
            .unwrap()
            .get_mut(&owner.id)
            .and_then(|queue| queue.pop_front());
        by_owner.or_else(|| {
            self.failures
                .lock()
                .unwrap()
                .get_mut(&parent)
                .and_then(|queue| queue.pop_front())
        })
    }
}

impl Repository for FakeRepository {
    fn login(&self, credentials: &Credentials) -> Result<SessionHandle, BrowseError> {
        if credentials.password != self.password {
            return Err(BrowseError::BadCredentials(
                "Incorrect username or password".to_string(),
            ));
        }
        Ok(SessionHandle {
            server_uri: credentials.server.clone(),
            user: self.user.clone(),
            default_group: self.groups[0].clone(),
            groups: self.groups.clone(),
            is_admin: self.is_admin,
        })
    }

    fn switch_group(&self, _handle: &SessionHandle, group_id: i64) -> Result<(), BrowseError> {
        self.switched.lock().unwrap().push(group_id);
        Ok(())
    }

    fn logout(&self, _handle: &SessionHandle) -> Result<(), BrowseError> {
        *self.logged_out.lock().unwrap() = true;
        Ok(())
    }

    fn ping(&self, _handle: &SessionHandle) -> Result<(), BrowseError> {
        if self.ping_fails {
            return Err(BrowseError::Unreachable("connection reset".to_string()));
        }
        Ok(())
    }

    fn fetch_children(
        &self,
        parent: ObjectRef,
        _group: &Group,
        owner: &Owner,
    ) -> Result<Vec<ObjectDescriptor>, BrowseError> {
        *self
            .fetch_calls
            .lock()
            .unwrap()
            .entry((parent, owner.id))
            .or_default() += 1;
        self.pass_gate(parent);
        if let Some(error) = self.take_failure(parent, owner) {
            return Err(error);
        }
        if parent.kind == ObjectKind::Server {
            return Ok(self
                .server_children
                .get(&owner.id)
                .cloned()
                .unwrap_or_default());
        }
        Ok(self.children.get(&parent).cloned().unwrap_or_default())
    }

    fn fetch_orphaned_images(
        &self,
        _group: &Group,
        owner: &Owner,
    ) -> Result<Vec<ObjectDescriptor>, BrowseError> {
        Ok(self.orphans.get(&owner.id).cloned().unwrap_or_default())
    }

    fn list_owners(&self, _group: &Group) -> Result<Vec<Owner>, BrowseError> {
        if self.owners_fail {
            return Err(BrowseError::Http("experimenter listing timed out".to_string()));
        }
        Ok(self.owners.clone())
    }

    fn read_tags(&self, object: ObjectRef) -> Result<Vec<Tag>, BrowseError> {
        *self.annotation_calls.lock().unwrap() += 1;
        Ok(self
            .tags
            .lock()
            .unwrap()
            .get(&object)
            .cloned()
            .unwrap_or_default())
    }

    fn read_key_values(&self, object: ObjectRef) -> Result<Vec<(String, String)>, BrowseError> {
        *self.annotation_calls.lock().unwrap() += 1;
        Ok(self
            .key_values
            .lock()
            .unwrap()
            .get(&object)
            .cloned()
            .unwrap_or_default())
    }

    fn find_or_create_tag(&self, name: &str) -> Result<i64, BrowseError> {
        let mut ids = self.tag_ids.lock().unwrap();
        let next = 100 + ids.len() as i64;
        Ok(*ids.entry(name.to_string()).or_insert(next))
    }

    fn link_tag(&self, object: ObjectRef, tag_id: i64) -> Result<(), BrowseError> {
        let name = self
            .tag_ids
            .lock()
            .unwrap()
            .iter()
            .find(|(_, id)| **id == tag_id)
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        self.tags.lock().unwrap().entry(object).or_default().push(Tag {
            id: tag_id,
            name,
            linked_by: self.user.id,
        });
        Ok(())
    }

    fn unlink_tag(&self, object: ObjectRef, tag_id: i64) -> Result<(), BrowseError> {
        if let Some(tags) = self.tags.lock().unwrap().get_mut(&object) {
            tags.retain(|tag| tag.id != tag_id);
        }
        Ok(())
    }

    fn write_key_values(
        &self,
        object: ObjectRef,
        pairs: &[(String, String)],
    ) -> Result<(), BrowseError> {
        self.key_values
            .lock()
            .unwrap()
            .entry(object)
            .or_default()
            .extend(pairs.iter().cloned());
        Ok(())
    }

    fn delete_key_values(&self, object: ObjectRef, keys: &[String]) -> Result<(), BrowseError> {
        if let Some(pairs) = self.key_values.lock().unwrap().get_mut(&object) {
            pairs.retain(|(key, _)| !keys.contains(key));
        }
        Ok(())
    }

    fn fetch_thumbnail(&self, image_id: i64, size: u32) -> Result<Vec<u8>, BrowseError> {
        *self.thumbnail_calls.lock().unwrap() += 1;
        Ok(format!("thumb-{image_id}-{size}").into_bytes())
    }
}

/// Receives events until one satisfies `matches`, panicking after a few
/// seconds without one.
pub fn wait_for<F>(events: &Receiver<BrowseEvent>, mut matches: F) -> BrowseEvent
where
    F: FnMut(&BrowseEvent) -> bool,
{
    loop {
        let event = events
            .recv_timeout(Duration::from_secs(5))
            .expect("timed out waiting for event");
        if matches(&event) {
            return event;
        }
    }
}
