use crate::{
    db_types::{InventoryAdjustment, Item, ItemQuantity},
    traits::{ReservationResult, StorageBackend},
};

/// The inventory ledger.
///
/// Every change to available stock goes through here and leaves an [`InventoryAdjustment`] behind. The adjustments
/// are an audit trail only; nothing reads them back to make a decision.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement: StorageBackend {
    /// Decrements stock for every line in `lines`, in a single transaction.
    ///
    /// Each line is a conditional decrement that only succeeds if the item is active and has at least the requested
    /// quantity. If any line fails, the whole transaction is rolled back and no stock moves for any line.
    async fn reserve_items(
        &self,
        lines: &[ItemQuantity],
        operator: &str,
        reason: &str,
    ) -> Result<ReservationResult, Self::Error>;

    /// Returns `quantity` units to an item's stock. Returns `None` if the item does not exist.
    async fn restock_item(
        &self,
        item_id: i64,
        quantity: i64,
        operator: &str,
        reason: &str,
    ) -> Result<Option<Item>, Self::Error>;

    /// The audit trail for an item, oldest first.
    async fn fetch_adjustments_for_item(&self, item_id: i64) -> Result<Vec<InventoryAdjustment>, Self::Error>;
}
