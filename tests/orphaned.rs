mod common;

use omero_browse::domain::{ObjectKind, RemoteObject};
use omero_browse::orphaned::{fold_orphans, merge_orphans, orphaned_folder};

use common::{SERVER, alice, bob, image, lab, project};

fn ids(folder: &RemoteObject) -> Vec<i64> {
    folder.orphaned_images().iter().map(|image| image.id()).collect()
}

#[test]
fn merge_concatenates_in_owner_order() {
    let server = RemoteObject::server(SERVER);
    let first = orphaned_folder(
        &server,
        &lab(),
        &alice(),
        vec![image(1, "a.tif", &alice()), image(2, "b.tif", &alice())],
    );
    let second = orphaned_folder(&server, &lab(), &bob(), vec![image(3, "c.tif", &bob())]);

    let merged = merge_orphans(&server, &lab(), &[first, second]);
    assert_eq!(ids(&merged), vec![1, 2, 3]);
    assert_eq!(merged.child_count(), Some(3));
    assert!(merged.owner().is_all_members());
    assert_eq!(merged.parent().map(|parent| parent.kind()), Some(ObjectKind::Server));
}

#[test]
fn fold_keeps_first_folder_position() {
    let server = RemoteObject::server(SERVER);
    let children = vec![
        RemoteObject::from_descriptor(project(1, "P", &alice()), &server),
        orphaned_folder(&server, &lab(), &alice(), vec![image(1, "a.tif", &alice())]),
        RemoteObject::from_descriptor(project(2, "Q", &bob()), &server),
        orphaned_folder(&server, &lab(), &bob(), vec![image(2, "b.tif", &bob())]),
    ];

    let folded = fold_orphans(&server, &lab(), children);
    let kinds = folded.iter().map(|child| child.kind()).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![ObjectKind::Project, ObjectKind::OrphanedFolder, ObjectKind::Project]
    );
    assert_eq!(ids(&folded[1]), vec![1, 2]);
}
