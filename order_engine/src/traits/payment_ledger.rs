use crate::{
    db_types::{NewPaymentTransaction, PaymentTransaction},
    traits::{ApplyTransactionResult, PaymentUpdate, StorageBackend},
};

/// The append-only ledger of gateway transactions.
///
/// The transaction id is the primary key. Two concurrent deliveries of the same transaction are resolved by the
/// uniqueness constraint: exactly one insert wins, and the other is reported as
/// [`ApplyTransactionResult::AlreadyProcessed`].
#[allow(async_fn_in_trait)]
pub trait PaymentLedger: StorageBackend {
    async fn fetch_transaction(&self, id: i64) -> Result<Option<PaymentTransaction>, Self::Error>;

    async fn fetch_transactions_for_order(&self, order_id: i64) -> Result<Vec<PaymentTransaction>, Self::Error>;

    /// In a single transaction, inserts the ledger row and then, if `update` is given, applies it to the order with a
    /// compare-and-set on `payment_status = 'pending'`.
    ///
    /// When `update.advance_status` is set, the order status moves from `pending` to `processing` in the same
    /// statement. Orders in any other status keep it.
    async fn apply_transaction(
        &self,
        transaction: NewPaymentTransaction,
        update: Option<PaymentUpdate>,
    ) -> Result<ApplyTransactionResult, Self::Error>;
}
