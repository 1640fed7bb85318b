//! 存储抽象
//!
//! 账本采用 “读取 -> 修改 -> 按版本比较并交换” 的事务型键值接口，
//! 丢失更新风险在接口上显式可测。

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ConsumerProfile, LedgerRecord};

pub use memory::MemoryStore;

/// 带版本的账本存储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// 读取账本，未建账时返回 None
    async fn load(&self, consumer_id: &str) -> Result<Option<LedgerRecord>>;

    /// 当前存储版本等于 `expected_version` 时写入（未建账视为版本 0），
    /// 否则返回 `VersionConflict`
    async fn compare_and_swap(&self, expected_version: u64, record: LedgerRecord) -> Result<()>;
}

/// 消费者档案存储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsumerStore: Send + Sync {
    async fn get(&self, consumer_id: &str) -> Result<Option<ConsumerProfile>>;

    /// 创建档案；已存在时保持原档案不变
    async fn create(&self, profile: ConsumerProfile) -> Result<()>;
}
