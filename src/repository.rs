use serde::{Deserialize, Serialize};

use crate::domain::{Group, ObjectDescriptor, ObjectRef, Owner};
use crate::error::BrowseError;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub server: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionHandle {
    pub server_uri: String,
    pub user: Owner,
    pub default_group: Group,
    pub groups: Vec<Group>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub linked_by: i64,
}

pub trait Repository: Send + Sync {
    fn login(&self, credentials: &Credentials) -> Result<SessionHandle, BrowseError>;
    fn switch_group(&self, handle: &SessionHandle, group_id: i64) -> Result<(), BrowseError>;
    fn logout(&self, handle: &SessionHandle) -> Result<(), BrowseError>;
    fn ping(&self, handle: &SessionHandle) -> Result<(), BrowseError>;

    fn fetch_children(
        &self,
        parent: ObjectRef,
        group: &Group,
        owner: &Owner,
    ) -> Result<Vec<ObjectDescriptor>, BrowseError>;
    fn fetch_orphaned_images(
        &self,
        group: &Group,
        owner: &Owner,
    ) -> Result<Vec<ObjectDescriptor>, BrowseError>;
    fn list_owners(&self, group: &Group) -> Result<Vec<Owner>, BrowseError>;

    fn read_tags(&self, object: ObjectRef) -> Result<Vec<Tag>, BrowseError>;
    fn read_key_values(&self, object: ObjectRef) -> Result<Vec<(String, String)>, BrowseError>;
    fn find_or_create_tag(&self, name: &str) -> Result<i64, BrowseError>;
    fn link_tag(&self, object: ObjectRef, tag_id: i64) -> Result<(), BrowseError>;
    fn unlink_tag(&self, object: ObjectRef, tag_id: i64) -> Result<(), BrowseError>;
    fn write_key_values(
        &self,
        object: ObjectRef,
        pairs: &[(String, String)],
    ) -> Result<(), BrowseError>;
    fn delete_key_values(&self, object: ObjectRef, keys: &[String]) -> Result<(), BrowseError>;

    fn fetch_thumbnail(&self, image_id: i64, size: u32) -> Result<Vec<u8>, BrowseError>;
}
