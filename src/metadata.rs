use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::ObjectRef;
use crate::error::BrowseError;
use crate::repository::{Repository, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum MergePolicy {
    #[default]
    #[serde(rename = "keep")]
    #[value(name = "keep")]
    KeepKeys,
    #[serde(rename = "update")]
    #[value(name = "update")]
    UpdateKeys,
    #[serde(rename = "delete")]
    #[value(name = "delete")]
    DeleteKeys,
    #[serde(rename = "none")]
    #[value(name = "none")]
    NoUpdate,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::KeepKeys => write!(f, "keep"),
            MergePolicy::UpdateKeys => write!(f, "update"),
            MergePolicy::DeleteKeys => write!(f, "delete"),
            MergePolicy::NoUpdate => write!(f, "none"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = BrowseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "keep" | "keep_keys" => Ok(MergePolicy::KeepKeys),
            "update" | "update_keys" => Ok(MergePolicy::UpdateKeys),
            "delete" | "delete_keys" => Ok(MergePolicy::DeleteKeys),
            "none" | "no_update" => Ok(MergePolicy::NoUpdate),
            _ => Err(BrowseError::InvalidPolicy(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    pub existing: BTreeMap<String, String>,
    pub new: BTreeMap<String, String>,
}

pub fn split(
    reference: &BTreeMap<String, String>,
    target: &BTreeMap<String, String>,
) -> MergeResult {
    let (existing, new) = target
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .partition(|(key, _)| reference.contains_key(key));
    MergeResult { existing, new }
}

pub fn duplicate_keys(pairs: &[(String, String)]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for (key, _) in pairs {
        if !seen.insert(key.as_str()) {
            duplicates.insert(key.clone());
        }
    }
    duplicates.into_iter().collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub kept: usize,
    pub added: usize,
    pub replaced: usize,
    pub removed: usize,
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kept {}, added {}, replaced {}, removed {}",
            self.kept, self.added, self.replaced, self.removed
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValuePlan {
    pub delete: Vec<String>,
    pub write: Vec<(String, String)>,
    pub report: ReconcileReport,
}

pub fn plan_key_values(
    remote: &[(String, String)],
    local: &BTreeMap<String, String>,
    policy: MergePolicy,
) -> Result<KeyValuePlan, BrowseError> {
    let mut reference = BTreeMap::new();
    for (key, value) in remote {
        reference.entry(key.clone()).or_insert_with(|| value.clone());
    }
    let MergeResult { existing, new } = split(&reference, local);

    let plan = match policy {
        MergePolicy::NoUpdate => KeyValuePlan::default(),
        MergePolicy::KeepKeys => KeyValuePlan {
            delete: Vec::new(),
            report: ReconcileReport {
                kept: existing.len(),
                added: new.len(),
                ..ReconcileReport::default()
            },
            write: new.into_iter().collect(),
        },
        MergePolicy::UpdateKeys => {
            let ambiguous = duplicate_keys(remote)
                .into_iter()
                .filter(|key| existing.contains_key(key))
                .collect::<Vec<_>>();
            if !ambiguous.is_empty() {
                return Err(BrowseError::AmbiguousKeys(ambiguous));
            }
            KeyValuePlan {
                delete: existing.keys().cloned().collect(),
                write: local
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
                report: ReconcileReport {
                    kept: reference.len() - existing.len(),
                    added: new.len(),
                    replaced: existing.len(),
                    removed: 0,
                },
            }
        }
        MergePolicy::DeleteKeys => KeyValuePlan {
            delete: reference.keys().cloned().collect(),
            write: local
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            report: ReconcileReport {
                kept: 0,
                added: new.len(),
                replaced: existing.len(),
                removed: reference.len() - existing.len(),
            },
        },
    };
    Ok(plan)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPlan {
    pub unlink: Vec<i64>,
    pub link: Vec<String>,
    pub report: ReconcileReport,
}

pub fn plan_tags(
    remote: &[Tag],
    local: &BTreeSet<String>,
    user_id: i64,
    policy: MergePolicy,
) -> TagPlan {
    let linked = remote
        .iter()
        .map(|tag| tag.name.as_str())
        .collect::<BTreeSet<_>>();
    match policy {
        MergePolicy::NoUpdate => TagPlan::default(),
        MergePolicy::KeepKeys | MergePolicy::UpdateKeys => {
            let link = local
                .iter()
                .filter(|name| !linked.contains(name.as_str()))
                .cloned()
                .collect::<Vec<_>>();
            TagPlan {
                unlink: Vec::new(),
                report: ReconcileReport {
                    kept: local.len() - link.len(),
                    added: link.len(),
                    ..ReconcileReport::default()
                },
                link,
            }
        }
        MergePolicy::DeleteKeys => {
            let unlink = remote
                .iter()
                .filter(|tag| tag.linked_by == user_id)
                .map(|tag| tag.id)
                .collect::<BTreeSet<_>>();
            TagPlan {
                report: ReconcileReport {
                    added: local.len(),
                    removed: unlink.len(),
                    ..ReconcileReport::default()
                },
                unlink: unlink.into_iter().collect(),
                link: local.iter().cloned().collect(),
            }
        }
    }
}

pub fn apply_key_values(
    repository: &dyn Repository,
    object: ObjectRef,
    local: &BTreeMap<String, String>,
    policy: MergePolicy,
) -> Result<ReconcileReport, BrowseError> {
    if policy == MergePolicy::NoUpdate {
        return Ok(ReconcileReport::default());
    }
    let remote = repository.read_key_values(object)?;
    let plan = plan_key_values(&remote, local, policy)?;
    if !plan.delete.is_empty() {
        debug!(%object, keys = plan.delete.len(), "deleting key/value pairs");
        repository.delete_key_values(object, &plan.delete)?;
    }
    if !plan.write.is_empty() {
        debug!(%object, pairs = plan.write.len(), "writing key/value pairs");
        repository.write_key_values(object, &plan.write)?;
    }
    info!(%object, %policy, "key/value pairs: {}", plan.report);
    Ok(plan.report)
}

pub fn apply_tags(
    repository: &dyn Repository,
    object: ObjectRef,
    local: &BTreeSet<String>,
    user_id: i64,
    policy: MergePolicy,
) -> Result<ReconcileReport, BrowseError> {
    if policy == MergePolicy::NoUpdate {
        return Ok(ReconcileReport::default());
    }
    let remote = repository.read_tags(object)?;
    let plan = plan_tags(&remote, local, user_id, policy);
    for tag_id in &plan.unlink {
        repository.unlink_tag(object, *tag_id)?;
    }
    for name in &plan.link {
        let tag_id = repository.find_or_create_tag(name)?;
        repository.link_tag(object, tag_id)?;
    }
    info!(%object, %policy, "tags: {}", plan.report);
    Ok(plan.report)
}
