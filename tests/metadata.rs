mod common;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use assert_matches::assert_matches;

use omero_browse::domain::{ObjectKind, ObjectRef};
use omero_browse::error::BrowseError;
use omero_browse::metadata::{
    MergePolicy, ReconcileReport, apply_key_values, apply_tags, split,
};
use omero_browse::repository::Tag;

use common::FakeRepository;

fn target() -> ObjectRef {
    ObjectRef::new(ObjectKind::Dataset, 42)
}

fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn hash_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn repository() -> FakeRepository {
    FakeRepository::default().with_key_values(target(), &[("a", "1"), ("b", "2")])
}

fn push(policy: MergePolicy) -> (FakeRepository, ReconcileReport) {
    let repository = repository();
    let local = map(&[("b", "3"), ("c", "4")]);
    let report = apply_key_values(&repository, target(), &local, policy).unwrap();
    (repository, report)
}

#[test]
fn split_is_a_partition_of_target() {
    let cases = [
        (map(&[]), map(&[("x", "1")])),
        (map(&[("x", "1")]), map(&[])),
        (map(&[("a", "1"), ("b", "2")]), map(&[("b", "3"), ("c", "4")])),
        (map(&[("a", "1")]), map(&[("a", "9")])),
    ];
    for (reference, target) in cases {
        let result = split(&reference, &target);
        assert!(result.existing.keys().all(|key| !result.new.contains_key(key)));
        assert!(result.existing.keys().all(|key| reference.contains_key(key)));
        assert!(result.new.keys().all(|key| !reference.contains_key(key)));

        let mut union = result.existing.clone();
        union.extend(result.new.clone());
        assert_eq!(union, target);
    }
}

#[test]
fn keep_only_adds_missing_keys() {
    let (repository, report) = push(MergePolicy::KeepKeys);
    assert_eq!(
        repository.key_values_of(target()),
        hash_map(&[("a", "1"), ("b", "2"), ("c", "4")])
    );
    assert_eq!(report.kept, 1);
    assert_eq!(report.added, 1);
}

#[test]
fn update_overwrites_existing_keys() {
    let (repository, report) = push(MergePolicy::UpdateKeys);
    assert_eq!(
        repository.key_values_of(target()),
        hash_map(&[("a", "1"), ("b", "3"), ("c", "4")])
    );
    assert_eq!(report.replaced, 1);
    assert_eq!(report.added, 1);
}

#[test]
fn delete_replaces_everything() {
    let (repository, report) = push(MergePolicy::DeleteKeys);
    assert_eq!(
        repository.key_values_of(target()),
        hash_map(&[("b", "3"), ("c", "4")])
    );
    assert_eq!(report.to_string(), "kept 0, added 1, replaced 1, removed 1");
}

#[test]
fn no_update_never_contacts_the_server() {
    let (repository, report) = push(MergePolicy::NoUpdate);
    assert_eq!(report, ReconcileReport::default());
    assert_eq!(*repository.annotation_calls.lock().unwrap(), 0);

    let tags = BTreeSet::from(["qc".to_string()]);
    apply_tags(&repository, target(), &tags, 1, MergePolicy::NoUpdate).unwrap();
    assert_eq!(*repository.annotation_calls.lock().unwrap(), 0);
    assert!(repository.tag_names_of(target()).is_empty());
}

#[test]
fn update_refuses_to_pick_among_duplicate_keys() {
    let repository = FakeRepository::default()
        .with_key_values(target(), &[("a", "1"), ("a", "2"), ("b", "3")]);
    let local = map(&[("a", "9")]);

    let result = apply_key_values(&repository, target(), &local, MergePolicy::UpdateKeys);
    assert_matches!(result, Err(BrowseError::AmbiguousKeys(keys)) if keys == vec!["a".to_string()]);
    assert_eq!(
        repository.key_values_of(target()).get("b").map(String::as_str),
        Some("3")
    );

    // Keys not being written may stay duplicated.
    let local = map(&[("b", "4")]);
    apply_key_values(&repository, target(), &local, MergePolicy::UpdateKeys).unwrap();
}

fn tagged() -> FakeRepository {
    FakeRepository::default().with_tags(
        target(),
        vec![
            Tag {
                id: 5,
                name: "qc".to_string(),
                linked_by: 1,
            },
            Tag {
                id: 6,
                name: "other".to_string(),
                linked_by: 2,
            },
        ],
    )
}

#[test]
fn keep_links_only_missing_tags() {
    let repository = tagged();
    let local = BTreeSet::from(["qc".to_string(), "new".to_string()]);

    let report = apply_tags(&repository, target(), &local, 1, MergePolicy::KeepKeys).unwrap();
    assert_eq!(repository.tag_names_of(target()), vec!["new", "other", "qc"]);
    assert_eq!(report.kept, 1);
    assert_eq!(report.added, 1);
}

#[test]
fn delete_unlinks_only_own_tags() {
    let repository = tagged();
    let local = BTreeSet::from(["new".to_string()]);

    let report = apply_tags(&repository, target(), &local, 1, MergePolicy::DeleteKeys).unwrap();
    assert_eq!(repository.tag_names_of(target()), vec!["new", "other"]);
    assert_eq!(report.removed, 1);
    assert_eq!(report.added, 1);
}
