use std::sync::Arc;

use crate::domain::{Group, ObjectDescriptor, ObjectKind, Owner, RemoteObject};

pub fn orphaned_folder(
    server: &Arc<RemoteObject>,
    group: &Group,
    owner: &Owner,
    images: Vec<ObjectDescriptor>,
) -> Arc<RemoteObject> {
    let folder = RemoteObject::orphaned_folder(server, group.clone(), owner.clone());
    let images = images
        .into_iter()
        .filter(|image| image.kind() == ObjectKind::Image)
        .map(|image| RemoteObject::from_descriptor(image, &folder))
        .collect::<Vec<_>>();
    folder.extend_orphaned(images);
    folder
}

pub fn merge_orphans(
    server: &Arc<RemoteObject>,
    group: &Group,
    folders: &[Arc<RemoteObject>],
) -> Arc<RemoteObject> {
    let merged = RemoteObject::orphaned_folder(server, group.clone(), Owner::all_members());
    for folder in folders {
        merged.extend_orphaned(folder.orphaned_images());
    }
    merged
}

/// Replaces every orphaned folder in `children` by a single merged one, placed
/// where the first folder was.
pub fn fold_orphans(
    server: &Arc<RemoteObject>,
    group: &Group,
    children: Vec<Arc<RemoteObject>>,
) -> Vec<Arc<RemoteObject>> {
    let Some(position) = children
        .iter()
        .position(|child| child.kind() == ObjectKind::OrphanedFolder)
    else {
        return children;
    };

    let (folders, mut rest): (Vec<_>, Vec<_>) = children
        .into_iter()
        .partition(|child| child.kind() == ObjectKind::OrphanedFolder);
    rest.insert(position, merge_orphans(server, group, &folders));
    rest
}
