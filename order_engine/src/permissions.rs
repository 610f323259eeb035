//! Role-based authorization.
//!
//! The [`PermissionTable`] maps a `(Resource, Action)` pair to the set of roles allowed to perform it. It is built
//! once at start-up and shared; lookups are pure. Ownership is resolved by the caller choosing between the `Own` and
//! `Any` flavours of an action.
use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use crate::db_types::{Caller, Order, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Order,
    Payment,
    Inventory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    ReadOwn,
    ReadAny,
    CancelOwn,
    CancelAny,
    UpdateStatus,
    CheckoutOwn,
    CheckoutAny,
    Read,
    Restock,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::ReadOwn => "read_own",
            Action::ReadAny => "read_any",
            Action::CancelOwn => "cancel_own",
            Action::CancelAny => "cancel_any",
            Action::UpdateStatus => "update_status",
            Action::CheckoutOwn => "checkout_own",
            Action::CheckoutAny => "checkout_any",
            Action::Read => "read",
            Action::Restock => "restock",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct PermissionTable {
    rules: HashMap<(Resource, Action), HashSet<Role>>,
}

impl Default for PermissionTable {
    fn default() -> Self {
        use Action::*;
        use Role::*;
        let everyone = [Customer, Staff, Admin];
        let privileged = [Staff, Admin];
        Self::empty()
            .allow(Resource::Order, Create, &everyone)
            .allow(Resource::Order, ReadOwn, &everyone)
            .allow(Resource::Order, ReadAny, &privileged)
            .allow(Resource::Order, CancelOwn, &everyone)
            .allow(Resource::Order, CancelAny, &privileged)
            .allow(Resource::Order, UpdateStatus, &privileged)
            .allow(Resource::Payment, CheckoutOwn, &everyone)
            .allow(Resource::Payment, CheckoutAny, &privileged)
            .allow(Resource::Inventory, Read, &privileged)
            .allow(Resource::Inventory, Restock, &[Admin])
    }
}

impl PermissionTable {
    /// A table that denies everything.
    pub fn empty() -> Self {
        Self { rules: HashMap::new() }
    }

    pub fn allow(mut self, resource: Resource, action: Action, roles: &[Role]) -> Self {
        self.rules.entry((resource, action)).or_default().extend(roles.iter().copied());
        self
    }

    pub fn is_allowed(&self, role: Role, resource: Resource, action: Action) -> bool {
        self.rules.get(&(resource, action)).map(|roles| roles.contains(&role)).unwrap_or(false)
    }

    /// Resolves an ownership-dependent permission: `own` applies when the caller placed the order, `any` otherwise.
    pub fn is_allowed_on_order(
        &self,
        caller: &Caller,
        order: &Order,
        resource: Resource,
        own: Action,
        any: Action,
    ) -> bool {
        (caller.owns(order) && self.is_allowed(caller.role, resource, own)) || self.is_allowed(caller.role, resource, any)
    }
}
