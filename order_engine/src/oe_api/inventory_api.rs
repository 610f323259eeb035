use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db_types::{Caller, InventoryAdjustment, Item, ItemQuantity},
    oe_api::errors::InventoryError,
    permissions::{Action, PermissionTable, Resource},
    traits::{CatalogManagement, InventoryManagement, ReservationResult},
};

/// `InventoryApi` is the inventory ledger: availability checks, all-or-nothing reservations and restocking.
pub struct InventoryApi<B> {
    db: B,
    permissions: Arc<PermissionTable>,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, permissions: Arc::new(PermissionTable::default()) }
    }

    pub fn with_permissions(mut self, permissions: Arc<PermissionTable>) -> Self {
        self.permissions = permissions;
        self
    }
}

impl<B> InventoryApi<B>
where B: CatalogManagement + InventoryManagement
{
    /// True iff the item is active and has at least `quantity` units available.
    pub async fn check_availability(&self, item_id: i64, quantity: i64) -> Result<bool, InventoryError> {
        check_quantity(quantity)?;
        let item = self.db.fetch_item(item_id).await.map_err(InventoryError::database)?;
        let item = item.ok_or(InventoryError::ItemNotFound(item_id))?;
        Ok(item.can_supply(quantity))
    }

    /// Reserves every line or none of them.
    ///
    /// An unavailable item is an expected outcome, not a fault, so it is reported as
    /// [`InventoryError::UnavailableItem`] without being logged as an error.
    pub async fn reserve(&self, lines: &[ItemQuantity], operator: &str, reason: &str) -> Result<(), InventoryError> {
        if lines.is_empty() {
            return Err(InventoryError::ValidationError("Nothing to reserve".into()));
        }
        for line in lines {
            check_quantity(line.quantity)?;
        }
        match self.db.reserve_items(lines, operator, reason).await.map_err(InventoryError::database)? {
            ReservationResult::Reserved => {
                debug!("📦️ {} lines reserved for {reason}", lines.len());
                Ok(())
            },
            ReservationResult::Unavailable { item_id } => {
                debug!("📦️ Reservation for {reason} declined. Item {item_id} cannot supply the requested quantity");
                Err(InventoryError::UnavailableItem { item_id })
            },
        }
    }

    /// Adds stock to an item, e.g. when goods are received. Admins only.
    pub async fn restock(&self, caller: &Caller, item_id: i64, quantity: i64) -> Result<Item, InventoryError> {
        if !self.permissions.is_allowed(caller.role, Resource::Inventory, Action::Restock) {
            return Err(InventoryError::Forbidden(format!("{} may not restock items", caller.role)));
        }
        check_quantity(quantity)?;
        let item = self
            .db
            .restock_item(item_id, quantity, caller.user_id.as_str(), "restock")
            .await
            .map_err(InventoryError::database)?
            .ok_or(InventoryError::ItemNotFound(item_id))?;
        info!("📦️ {} restocked item {item_id} with {quantity} units. {} now available", caller.user_id, item.quantity);
        Ok(item)
    }

    /// The stock audit trail for an item, oldest first.
    pub async fn adjustments(&self, caller: &Caller, item_id: i64) -> Result<Vec<InventoryAdjustment>, InventoryError> {
        if !self.permissions.is_allowed(caller.role, Resource::Inventory, Action::Read) {
            return Err(InventoryError::Forbidden(format!("{} may not view inventory records", caller.role)));
        }
        if self.db.fetch_item(item_id).await.map_err(InventoryError::database)?.is_none() {
            return Err(InventoryError::ItemNotFound(item_id));
        }
        self.db.fetch_adjustments_for_item(item_id).await.map_err(InventoryError::database)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn check_quantity(quantity: i64) -> Result<(), InventoryError> {
    if quantity <= 0 {
        return Err(InventoryError::ValidationError(format!("Quantity must be strictly positive, not {quantity}")));
    }
    Ok(())
}
