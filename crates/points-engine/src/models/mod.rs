//! 积分引擎领域模型

pub mod campaign;
pub mod consumer;
pub mod event;
pub mod response;

pub use campaign::Campaign;
pub use consumer::{
    Balance, ConsumerProfile, ConsumerSeed, DEFAULT_TIER, LedgerRecord, TransactionRecord,
};
pub use event::{EventType, LoyaltyEvent};
pub use response::{
    ExpirationDetail, PointBreakdownEntry, PointSummary, PointsResponse, RecyclingCheck,
    RedemptionCheck,
};
