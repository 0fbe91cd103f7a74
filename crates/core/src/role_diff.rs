//! Role change proposals.
//!
//! A proposal to change a role is stored as a minimal change-set against a
//! baseline snapshot of the role. The change-set can be applied to the
//! baseline to obtain the proposed role, and inverted to obtain the
//! change-set that undoes it.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use agora_common::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::PollAction;
use crate::permission::{AbilityAction, AbilitySubject, Capability, Permission, permission_values};

#[allow(clippy::unwrap_used)]
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

/// Direction of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Remove,
}

impl ChangeType {
    #[must_use]
    pub const fn invert(self) -> Self {
        match self {
            Self::Add => Self::Remove,
            Self::Remove => Self::Add,
        }
    }
}

/// A role as it exists before the proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSnapshot {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub permissions: BTreeSet<Capability>,
    #[serde(default)]
    pub members: BTreeSet<String>,
}

impl RoleSnapshot {
    /// Per-permission booleans of this role.
    #[must_use]
    pub fn permission_values(&self) -> BTreeMap<Permission, bool> {
        permission_values(&self.permissions)
    }
}

/// Edited role form submitted for review.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoleEdit {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(regex(path = *COLOR_RE, message = "Color must be in #rrggbb format"))]
    pub color: String,
    /// Permission keys missing from the map keep their baseline value.
    #[serde(default)]
    pub permissions: BTreeMap<Permission, bool>,
    #[serde(default)]
    pub members: BTreeSet<String>,
}

impl RoleEdit {
    /// An edit that reproduces `role` exactly.
    #[must_use]
    pub fn from_snapshot(role: &RoleSnapshot) -> Self {
        Self {
            name: role.name.clone(),
            color: role.color.clone(),
            permissions: role.permission_values(),
            members: role.members.clone(),
        }
    }

    fn validate_input(&self) -> AppResult<()> {
        self.validate()?;
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Role name cannot be blank".to_string()));
        }
        Ok(())
    }
}

/// One capability pair added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionChange {
    pub subject: AbilitySubject,
    pub action: AbilityAction,
    pub change_type: ChangeType,
    /// The baseline already held this pair; adding it is a no-op that
    /// the inverse must not undo.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub was_present: bool,
}

impl PermissionChange {
    #[must_use]
    pub const fn capability(&self) -> Capability {
        Capability::new(self.subject, self.action)
    }
}

/// One member added to or removed from the role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberChange {
    pub user_id: String,
    pub change_type: ChangeType,
}

/// Minimal set of changes to a role. Attributes are present only when they
/// change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleChangeSet {
    pub name: Option<String>,
    pub prev_name: Option<String>,
    pub color: Option<String>,
    pub prev_color: Option<String>,
    pub permissions: Vec<PermissionChange>,
    pub members: Vec<MemberChange>,
}

impl RoleChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.color.is_none()
            && self.permissions.is_empty()
            && self.members.is_empty()
    }

    /// Re-derive per-permission changes for review.
    ///
    /// A permission appears only when every one of its capability pairs is
    /// present in the change-set with the same direction.
    #[must_use]
    pub fn permission_changes(&self) -> BTreeMap<Permission, ChangeType> {
        let mut result = BTreeMap::new();
        for change_type in [ChangeType::Add, ChangeType::Remove] {
            let pairs: BTreeSet<Capability> = self
                .permissions
                .iter()
                .filter(|c| c.change_type == change_type)
                .map(PermissionChange::capability)
                .collect();
            for permission in Permission::ALL {
                if permission.is_granted_by(&pairs) {
                    result.insert(permission, change_type);
                }
            }
        }
        result
    }

    /// Members added and removed, in that order.
    #[must_use]
    pub fn member_changes(&self) -> (Vec<&str>, Vec<&str>) {
        (
            self.members_with(ChangeType::Add),
            self.members_with(ChangeType::Remove),
        )
    }

    fn members_with(&self, change_type: ChangeType) -> Vec<&str> {
        self.members
            .iter()
            .filter(|m| m.change_type == change_type)
            .map(|m| m.user_id.as_str())
            .collect()
    }

    /// The role that results from applying this change-set to `baseline`.
    #[must_use]
    pub fn apply(&self, baseline: &RoleSnapshot) -> RoleSnapshot {
        let mut role = baseline.clone();
        if let Some(name) = &self.name {
            role.name.clone_from(name);
        }
        if let Some(color) = &self.color {
            role.color.clone_from(color);
        }
        for change in &self.permissions {
            match change.change_type {
                ChangeType::Add => role.permissions.insert(change.capability()),
                ChangeType::Remove => role.permissions.remove(&change.capability()),
            };
        }
        for change in &self.members {
            match change.change_type {
                ChangeType::Add => role.members.insert(change.user_id.clone()),
                ChangeType::Remove => role.members.remove(&change.user_id),
            };
        }
        role
    }

    /// The change-set that undoes this one.
    #[must_use]
    pub fn invert(&self) -> Self {
        Self {
            name: self.prev_name.clone(),
            prev_name: self.name.clone(),
            color: self.prev_color.clone(),
            prev_color: self.color.clone(),
            permissions: self
                .permissions
                .iter()
                .filter(|c| c.change_type != ChangeType::Add || !c.was_present)
                .map(|c| PermissionChange {
                    change_type: c.change_type.invert(),
                    was_present: false,
                    ..*c
                })
                .collect(),
            members: self
                .members
                .iter()
                .map(|m| MemberChange {
                    user_id: m.user_id.clone(),
                    change_type: m.change_type.invert(),
                })
                .collect(),
        }
    }
}

/// Compute the minimal change-set turning `baseline` into `edit`.
#[must_use]
pub fn diff_role(baseline: &RoleSnapshot, edit: &RoleEdit) -> RoleChangeSet {
    let mut changes = RoleChangeSet::default();

    let name = edit.name.trim();
    if name != baseline.name {
        changes.name = Some(name.to_string());
        changes.prev_name = Some(baseline.name.clone());
    }
    if !edit.color.eq_ignore_ascii_case(&baseline.color) {
        changes.color = Some(edit.color.clone());
        changes.prev_color = Some(baseline.color.clone());
    }

    for permission in Permission::ALL {
        let current = permission.is_granted_by(&baseline.permissions);
        let proposed = edit.permissions.get(&permission).copied().unwrap_or(current);
        if proposed == current {
            continue;
        }
        let change_type = if proposed {
            ChangeType::Add
        } else {
            ChangeType::Remove
        };
        changes
            .permissions
            .extend(permission.capabilities().iter().map(|c| PermissionChange {
                subject: c.subject,
                action: c.action,
                change_type,
                was_present: baseline.permissions.contains(c),
            }));
    }

    changes.members.extend(
        edit.members
            .difference(&baseline.members)
            .map(|user_id| MemberChange {
                user_id: user_id.clone(),
                change_type: ChangeType::Add,
            }),
    );
    changes.members.extend(
        baseline
            .members
            .difference(&edit.members)
            .map(|user_id| MemberChange {
                user_id: user_id.clone(),
                change_type: ChangeType::Remove,
            }),
    );

    changes
}

/// A validated, non-empty role change ready to attach to a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChangeProposal {
    /// Role being changed; `None` for a new role.
    pub role_id: Option<String>,
    pub baseline: RoleSnapshot,
    pub changes: RoleChangeSet,
}

impl RoleChangeProposal {
    /// Propose changes to an existing role.
    pub fn change_role(baseline: RoleSnapshot, edit: &RoleEdit) -> AppResult<Self> {
        Self::build(Some(baseline.id.clone()), baseline, edit)
    }

    /// Propose a new role.
    pub fn create_role(edit: &RoleEdit) -> AppResult<Self> {
        Self::build(None, RoleSnapshot::default(), edit)
    }

    fn build(role_id: Option<String>, baseline: RoleSnapshot, edit: &RoleEdit) -> AppResult<Self> {
        edit.validate_input()?;
        let changes = diff_role(&baseline, edit);
        if changes.is_empty() {
            return Err(AppError::NoChangesProposed);
        }
        Ok(Self {
            role_id,
            baseline,
            changes,
        })
    }

    /// The role as it would be after ratification.
    #[must_use]
    pub fn proposed_role(&self) -> RoleSnapshot {
        self.changes.apply(&self.baseline)
    }

    #[must_use]
    pub fn into_action(self) -> PollAction {
        match self.role_id {
            Some(role_id) => PollAction::ChangeRole {
                role_id,
                changes: self.changes,
            },
            None => PollAction::CreateRole {
                changes: self.changes,
            },
        }
    }
}
