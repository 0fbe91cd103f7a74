//! Role permissions and the capability pairs backing them.
//!
//! A role's authority is stored as a list of `(subject, action)` capability
//! pairs. The user-facing [`Permission`] keys are an exhaustive mapping onto
//! those pairs; a permission is granted only when every one of its pairs is
//! present.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Resource a capability applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbilitySubject {
    Channel,
    Invite,
    Role,
    ServerConfig,
}

/// Operation a capability allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityAction {
    Manage,
    Create,
    Read,
    Update,
    Delete,
}

/// One `(subject, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability {
    pub subject: AbilitySubject,
    pub action: AbilityAction,
}

impl Capability {
    #[must_use]
    pub const fn new(subject: AbilitySubject, action: AbilityAction) -> Self {
        Self { subject, action }
    }
}

/// User-facing permission key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    ManageChannels,
    ManageSettings,
    ManageRoles,
    CreateInvites,
    ManageInvites,
}

const MANAGE_CHANNELS: &[Capability] = &[Capability::new(
    AbilitySubject::Channel,
    AbilityAction::Manage,
)];
const MANAGE_SETTINGS: &[Capability] = &[Capability::new(
    AbilitySubject::ServerConfig,
    AbilityAction::Manage,
)];
const MANAGE_ROLES: &[Capability] = &[Capability::new(AbilitySubject::Role, AbilityAction::Manage)];
const CREATE_INVITES: &[Capability] = &[
    Capability::new(AbilitySubject::Invite, AbilityAction::Read),
    Capability::new(AbilitySubject::Invite, AbilityAction::Create),
];
const MANAGE_INVITES: &[Capability] = &[Capability::new(
    AbilitySubject::Invite,
    AbilityAction::Manage,
)];

impl Permission {
    /// Every permission key, in display order.
    pub const ALL: [Self; 5] = [
        Self::ManageChannels,
        Self::ManageSettings,
        Self::ManageRoles,
        Self::CreateInvites,
        Self::ManageInvites,
    ];

    /// Capability pairs this permission stands for.
    #[must_use]
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::ManageChannels => MANAGE_CHANNELS,
            Self::ManageSettings => MANAGE_SETTINGS,
            Self::ManageRoles => MANAGE_ROLES,
            Self::CreateInvites => CREATE_INVITES,
            Self::ManageInvites => MANAGE_INVITES,
        }
    }

    /// Whether every capability pair of this permission is in `granted`.
    #[must_use]
    pub fn is_granted_by(self, granted: &BTreeSet<Capability>) -> bool {
        self.capabilities().iter().all(|c| granted.contains(c))
    }
}

/// Per-permission booleans derived from a capability set.
#[must_use]
pub fn permission_values(granted: &BTreeSet<Capability>) -> BTreeMap<Permission, bool> {
    Permission::ALL
        .into_iter()
        .map(|permission| (permission, permission.is_granted_by(granted)))
        .collect()
}

/// Capability set implied by a set of granted permissions.
#[must_use]
pub fn capabilities_for(permissions: &BTreeSet<Permission>) -> BTreeSet<Capability> {
    permissions
        .iter()
        .flat_map(|p| p.capabilities().iter().copied())
        .collect()
}
