use crate::{
    db_types::{Item, ItemUpdate, NewItem},
    traits::StorageBackend,
};

/// Catalog maintenance. Available quantity is only set here when an item is first created; after that it belongs to
/// [`InventoryManagement`](crate::traits::InventoryManagement).
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: StorageBackend {
    /// Creates a new catalog item. Fails if the SKU is already in use.
    async fn insert_item(&self, item: NewItem) -> Result<Item, Self::Error>;

    /// Edits the name, price or active flag of an item. Returns `None` if the item does not exist.
    ///
    /// Orders already placed are unaffected, since they carry their own priced snapshot.
    async fn update_item(&self, item_id: i64, update: ItemUpdate) -> Result<Option<Item>, Self::Error>;

    async fn fetch_item(&self, item_id: i64) -> Result<Option<Item>, Self::Error>;

    /// Fetches all the items in `ids` in a single query. Ids with no matching item are silently skipped, so the result
    /// may be shorter than the request.
    async fn fetch_items(&self, ids: &[i64]) -> Result<Vec<Item>, Self::Error>;
}
