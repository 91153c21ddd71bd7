use std::sync::Arc;

use crate::domain::{Group, ObjectKind, Owner, RemoteObject};

#[derive(Debug, Clone)]
pub struct Filter {
    pub group: Group,
    pub owner: Owner,
    text: String,
}

impl Filter {
    pub fn new(group: Group, owner: Owner, text: &str) -> Self {
        Self {
            group,
            owner,
            text: text.to_lowercase(),
        }
    }

    pub fn everything() -> Self {
        Self::new(Group::all_groups(), Owner::all_members(), "")
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, node: &RemoteObject) -> bool {
        if node.kind() == ObjectKind::Server {
            return true;
        }
        match node.parent() {
            Some(parent) if parent.kind() != ObjectKind::Server => self.matches(&parent),
            _ => self.matches_top_level(node),
        }
    }

    pub fn apply(&self, nodes: &[Arc<RemoteObject>]) -> Vec<Arc<RemoteObject>> {
        nodes
            .iter()
            .filter(|node| self.matches(node))
            .cloned()
            .collect()
    }

    fn matches_top_level(&self, node: &RemoteObject) -> bool {
        let group = self.group.is_all_groups() || &self.group == node.group();
        let owner = self.owner.is_all_members()
            || node.owner().is_all_members()
            || &self.owner == node.owner();
        let text = self.text.is_empty() || node.name().to_lowercase().contains(&self.text);
        group && owner && text
    }
}
