use shared::domain::Principal;

use crate::cache::QueryCache;

/// Admin-only UI capabilities. Everything is off for non-admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Affordances {
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
    pub reorder: bool,
    pub edit_info: bool,
    pub edit_heading: bool,
    pub manage_admins: bool,
}

impl Affordances {
    pub fn for_admin(is_admin: bool) -> Self {
        Self {
            add: is_admin,
            edit: is_admin,
            delete: is_admin,
            reorder: is_admin,
            edit_info: is_admin,
            edit_heading: is_admin,
            manage_admins: is_admin,
        }
    }

    pub fn any(&self) -> bool {
        self.add
            || self.edit
            || self.delete
            || self.reorder
            || self.edit_info
            || self.edit_heading
            || self.manage_admins
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminEntry {
    pub principal: Principal,
    pub removable: bool,
}

#[derive(Debug, Clone)]
pub struct RoleGate {
    default_admin: Option<Principal>,
}

impl RoleGate {
    pub fn new(default_admin: Option<Principal>) -> Self {
        Self { default_admin }
    }

    pub fn default_admin(&self) -> Option<&Principal> {
        self.default_admin.as_ref()
    }

    /// `false` until the admin query has resolved to `true`.
    pub fn is_admin(&self, cache: &QueryCache) -> bool {
        cache.is_caller_admin().unwrap_or(false)
    }

    pub fn affordances(&self, cache: &QueryCache) -> Affordances {
        Affordances::for_admin(self.is_admin(cache))
    }

    pub fn is_protected(&self, principal: &Principal) -> bool {
        self.default_admin.as_ref() == Some(principal)
    }

    pub fn can_remove_admin(&self, principal: &Principal) -> bool {
        !self.is_protected(principal)
    }

    /// Admin list as shown to the caller; empty for non-admins even when the
    /// cache still holds a list from an earlier admin session.
    pub fn visible_admins(&self, cache: &QueryCache) -> Vec<AdminEntry> {
        if !self.is_admin(cache) {
            return Vec::new();
        }
        cache
            .admin_principals()
            .unwrap_or_default()
            .iter()
            .map(|principal| AdminEntry {
                principal: principal.clone(),
                removable: self.can_remove_admin(principal),
            })
            .collect()
    }
}
