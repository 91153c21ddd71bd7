use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::domain::{Group, Owner};
use crate::error::BrowseError;
use crate::events::{BrowseEvent, EventBus};
use crate::repository::{Credentials, Repository, SessionHandle};

pub struct Session {
    repository: Arc<dyn Repository>,
    handle: SessionHandle,
    active_group: RwLock<Group>,
    events: EventBus,
}

impl Session {
    pub fn login(
        repository: Arc<dyn Repository>,
        credentials: &Credentials,
        events: EventBus,
    ) -> Result<Self, BrowseError> {
        let handle = repository.login(credentials)?;
        info!(
            user = %handle.user,
            group = %handle.default_group,
            admin = handle.is_admin,
            "logged in to {}",
            handle.server_uri
        );
        events.publish(BrowseEvent::LoggedIn {
            user: handle.user.clone(),
            group: handle.default_group.clone(),
        });
        Ok(Self {
            repository,
            active_group: RwLock::new(handle.default_group.clone()),
            handle,
            events,
        })
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    pub fn user(&self) -> &Owner {
        &self.handle.user
    }

    pub fn groups(&self) -> &[Group] {
        &self.handle.groups
    }

    pub fn is_admin(&self) -> bool {
        self.handle.is_admin
    }

    pub fn server_uri(&self) -> &str {
        &self.handle.server_uri
    }

    pub fn active_group(&self) -> Group {
        self.active_group
            .read()
            .map(|group| group.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn is_member_of(&self, group_id: i64) -> bool {
        self.handle.groups.iter().any(|group| group.id == group_id)
    }

    pub fn switch_group(&self, group_id: i64) -> Result<bool, BrowseError> {
        if self.active_group().id == group_id {
            return Ok(true);
        }
        if !self.is_admin() && !self.is_member_of(group_id) {
            debug!(group_id, "not a member, ignoring group switch");
            return Ok(false);
        }

        self.repository.switch_group(&self.handle, group_id)?;
        let group = self
            .handle
            .groups
            .iter()
            .find(|group| group.id == group_id)
            .cloned()
            .unwrap_or_else(|| Group::new(group_id, format!("group {group_id}")));
        match self.active_group.write() {
            Ok(mut active) => *active = group.clone(),
            Err(poisoned) => *poisoned.into_inner() = group.clone(),
        }
        info!(group = %group, "switched group");
        self.events.publish(BrowseEvent::GroupChanged { group });
        Ok(true)
    }

    pub fn is_alive(&self) -> bool {
        match self.repository.ping(&self.handle) {
            Ok(()) => true,
            Err(err) => {
                warn!("session ping failed: {err}");
                false
            }
        }
    }

    pub fn logout(self) -> Result<(), BrowseError> {
        let result = self.repository.logout(&self.handle);
        self.events.publish(BrowseEvent::LoggedOut);
        info!(user = %self.handle.user, "logged out");
        result
    }
}
