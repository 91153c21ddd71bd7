use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BrowseError;

pub const ORPHANED_FOLDER_NAME: &str = "Orphaned Images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Server,
    Project,
    Dataset,
    Screen,
    Plate,
    Well,
    Image,
    #[serde(rename = "orphaned")]
    OrphanedFolder,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Server => "server",
            ObjectKind::Project => "project",
            ObjectKind::Dataset => "dataset",
            ObjectKind::Screen => "screen",
            ObjectKind::Plate => "plate",
            ObjectKind::Well => "well",
            ObjectKind::Image => "image",
            ObjectKind::OrphanedFolder => "orphaned",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ObjectKind::Project
                | ObjectKind::Dataset
                | ObjectKind::Screen
                | ObjectKind::Plate
                | ObjectKind::Well
        )
    }

    pub fn from_omero_type(value: &str) -> Option<Self> {
        let name = value.rsplit('#').next()?;
        match name {
            "Project" => Some(ObjectKind::Project),
            "Dataset" => Some(ObjectKind::Dataset),
            "Screen" => Some(ObjectKind::Screen),
            "Plate" => Some(ObjectKind::Plate),
            "Well" => Some(ObjectKind::Well),
            "Image" => Some(ObjectKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = BrowseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "project" => Ok(ObjectKind::Project),
            "dataset" => Ok(ObjectKind::Dataset),
            "screen" => Ok(ObjectKind::Screen),
            "plate" => Ok(ObjectKind::Plate),
            "well" => Ok(ObjectKind::Well),
            "image" => Ok(ObjectKind::Image),
            _ => Err(BrowseError::UnknownObjectType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: i64,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.id)
    }
}

const SENTINEL_ID: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub display_name: String,
}

impl Owner {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    pub fn all_members() -> Self {
        Self::new(SENTINEL_ID, "All members")
    }

    pub fn is_all_members(&self) -> bool {
        self.id == SENTINEL_ID
    }
}

impl PartialEq for Owner {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Owner {}

impl Hash for Owner {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub display_name: String,
}

impl Group {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    pub fn all_groups() -> Self {
        Self::new(SENTINEL_ID, "All groups")
    }

    pub fn is_all_groups(&self) -> bool {
        self.id == SENTINEL_ID
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Group {}

impl Hash for Group {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub size_x: u32,
    pub size_y: u32,
    pub size_c: u32,
    pub size_z: u32,
    pub size_t: u32,
    pub physical_size_x: Option<f64>,
    pub physical_size_y: Option<f64>,
    pub physical_size_z: Option<f64>,
    pub pixel_type: String,
    pub acquisition_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellPosition {
    pub row: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DescriptorBody {
    Project,
    Dataset,
    Screen,
    Plate,
    Well(WellPosition),
    Image(ImageInfo),
}

impl DescriptorBody {
    pub fn kind(&self) -> ObjectKind {
        match self {
            DescriptorBody::Project => ObjectKind::Project,
            DescriptorBody::Dataset => ObjectKind::Dataset,
            DescriptorBody::Screen => ObjectKind::Screen,
            DescriptorBody::Plate => ObjectKind::Plate,
            DescriptorBody::Well(_) => ObjectKind::Well,
            DescriptorBody::Image(_) => ObjectKind::Image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner: Owner,
    pub group: Group,
    pub child_count: Option<u32>,
    pub body: DescriptorBody,
}

impl ObjectDescriptor {
    pub fn kind(&self) -> ObjectKind {
        self.body.kind()
    }
}

#[derive(Debug)]
pub enum Variant {
    Server { uri: String },
    Project,
    Dataset,
    Screen,
    Plate,
    Well(WellPosition),
    Image(ImageInfo),
    OrphanedFolder(Mutex<Vec<Arc<RemoteObject>>>),
}

#[derive(Debug)]
pub struct RemoteObject {
    id: i64,
    name: String,
    description: Option<String>,
    owner: Owner,
    group: Group,
    child_count: Option<u32>,
    parent: Weak<RemoteObject>,
    variant: Variant,
}

impl RemoteObject {
    pub fn server(uri: impl Into<String>) -> Arc<Self> {
        let uri = uri.into();
        Arc::new(Self {
            id: 0,
            name: uri.clone(),
            description: None,
            owner: Owner::all_members(),
            group: Group::all_groups(),
            child_count: None,
            parent: Weak::new(),
            variant: Variant::Server { uri },
        })
    }

    pub fn from_descriptor(descriptor: ObjectDescriptor, parent: &Arc<RemoteObject>) -> Arc<Self> {
        let variant = match descriptor.body {
            DescriptorBody::Project => Variant::Project,
            DescriptorBody::Dataset => Variant::Dataset,
            DescriptorBody::Screen => Variant::Screen,
            DescriptorBody::Plate => Variant::Plate,
            DescriptorBody::Well(position) => Variant::Well(position),
            DescriptorBody::Image(info) => Variant::Image(info),
        };
        Arc::new(Self {
            id: descriptor.id,
            name: descriptor.name,
            description: descriptor.description,
            owner: descriptor.owner,
            group: descriptor.group,
            child_count: descriptor.child_count,
            parent: Arc::downgrade(parent),
            variant,
        })
    }

    pub fn orphaned_folder(parent: &Arc<RemoteObject>, group: Group, owner: Owner) -> Arc<Self> {
        Arc::new(Self {
            id: SENTINEL_ID,
            name: ORPHANED_FOLDER_NAME.to_string(),
            description: None,
            owner,
            group,
            child_count: None,
            parent: Arc::downgrade(parent),
            variant: Variant::OrphanedFolder(Mutex::new(Vec::new())),
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        match &self.variant {
            Variant::Server { .. } => ObjectKind::Server,
            Variant::Project => ObjectKind::Project,
            Variant::Dataset => ObjectKind::Dataset,
            Variant::Screen => ObjectKind::Screen,
            Variant::Plate => ObjectKind::Plate,
            Variant::Well(_) => ObjectKind::Well,
            Variant::Image(_) => ObjectKind::Image,
            Variant::OrphanedFolder(_) => ObjectKind::OrphanedFolder,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn child_count(&self) -> Option<u32> {
        match &self.variant {
            Variant::OrphanedFolder(images) => {
                Some(u32::try_from(lock_images(images).len()).unwrap_or(u32::MAX))
            }
            _ => self.child_count,
        }
    }

    pub fn parent(&self) -> Option<Arc<RemoteObject>> {
        self.parent.upgrade()
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind(), self.id)
    }

    pub fn image_info(&self) -> Option<&ImageInfo> {
        match &self.variant {
            Variant::Image(info) => Some(info),
            _ => None,
        }
    }

    pub fn server_uri(&self) -> Option<&str> {
        match &self.variant {
            Variant::Server { uri } => Some(uri),
            _ => None,
        }
    }

    pub fn orphaned_images(&self) -> Vec<Arc<RemoteObject>> {
        match &self.variant {
            Variant::OrphanedFolder(images) => lock_images(images).clone(),
            _ => Vec::new(),
        }
    }

    pub fn extend_orphaned<I>(&self, images: I) -> bool
    where
        I: IntoIterator<Item = Arc<RemoteObject>>,
    {
        match &self.variant {
            Variant::OrphanedFolder(list) => {
                lock_images(list).extend(images);
                true
            }
            _ => false,
        }
    }
}

fn lock_images(
    images: &Mutex<Vec<Arc<RemoteObject>>>,
) -> std::sync::MutexGuard<'_, Vec<Arc<RemoteObject>>> {
    images.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_object_kind() {
        assert_eq!("Dataset".parse::<ObjectKind>().unwrap(), ObjectKind::Dataset);
        let err = "folder".parse::<ObjectKind>().unwrap_err();
        assert_matches!(err, BrowseError::UnknownObjectType(_));
    }

    #[test]
    fn omero_type_suffix() {
        let kind =
            ObjectKind::from_omero_type("http://www.openmicroscopy.org/Schemas/OME/2016-06#Plate");
        assert_eq!(kind, Some(ObjectKind::Plate));
        assert_eq!(ObjectKind::from_omero_type("#Roi"), None);
    }

    #[test]
    fn owner_equality_by_id() {
        assert_eq!(Owner::new(3, "alice"), Owner::new(3, "Alice Smith"));
        assert_ne!(Owner::new(3, "alice"), Owner::all_members());
        assert!(Group::all_groups().is_all_groups());
    }

    #[test]
    fn kind_order_puts_orphans_last() {
        let mut kinds = vec![
            ObjectKind::OrphanedFolder,
            ObjectKind::Screen,
            ObjectKind::Project,
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                ObjectKind::Project,
                ObjectKind::Screen,
                ObjectKind::OrphanedFolder
            ]
        );
    }

    #[test]
    fn parent_is_weak() {
        let server = RemoteObject::server("https://omero.example.org");
        let folder =
            RemoteObject::orphaned_folder(&server, Group::new(1, "lab"), Owner::new(2, "bob"));
        assert_eq!(folder.parent().map(|p| p.kind()), Some(ObjectKind::Server));
        assert_eq!(Arc::strong_count(&server), 1);
        drop(server);
        assert!(folder.parent().is_none());
    }
}
