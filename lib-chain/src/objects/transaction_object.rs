//! Recent-transaction window for duplicate detection.

use serde::{Deserialize, Serialize};

use lib_chainstore::StateObject;
use lib_types::{ObjectId, TimePoint, TransactionId};

/// One applied transaction, kept until its expiration passes. A second
/// submission of the same id inside the window is a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionObject {
    pub id: ObjectId,
    pub trx_id: TransactionId,
    pub expiration: TimePoint,
}

impl StateObject for TransactionObject {
    const TABLE: &'static str = "transactions";
    type UniqueKey = TransactionId;
    type OrderedKey = TimePoint;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn unique_key(&self) -> TransactionId {
        self.trx_id
    }

    /// Ordered by expiration for the per-block cleanup sweep.
    fn ordered_key(&self) -> Option<TimePoint> {
        Some(self.expiration)
    }
}
