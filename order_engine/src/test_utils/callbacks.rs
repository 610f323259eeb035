use paymob_tools::{
    data_objects::{RemoteOrderRef, SourceData},
    signature::transaction_signature,
    TransactionCallback,
    TransactionObj,
};

/// A card transaction for `merchant_order_id`, shaped like the ones the processor sends.
pub fn transaction(id: i64, merchant_order_id: &str, amount_cents: i64, success: bool, pending: bool) -> TransactionObj {
    TransactionObj {
        id,
        success,
        pending,
        amount_cents,
        currency: "EGP".into(),
        integration_id: 4411,
        order: RemoteOrderRef { id: 9001, merchant_order_id: Some(merchant_order_id.to_string()) },
        source_data: SourceData {
            pan: Some("2346".into()),
            sub_type: Some("MasterCard".into()),
            source_type: Some("card".into()),
        },
        created_at: "2024-05-01T10:00:00.000000".into(),
        is_3d_secure: true,
        is_standalone_payment: true,
        owner: 302,
        ..Default::default()
    }
}

/// The callback body and its signature under `secret`.
pub fn signed_callback(secret: &str, obj: TransactionObj) -> (Vec<u8>, String) {
    let signature = transaction_signature(secret, &obj).expect("Error signing transaction");
    let callback = TransactionCallback { callback_type: Some("TRANSACTION".into()), obj };
    let body = serde_json::to_vec(&callback).expect("Error serializing callback");
    (body, signature)
}
