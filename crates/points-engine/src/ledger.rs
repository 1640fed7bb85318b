//! 积分账本
//!
//! 负责 `{total, available, used, accountVersion}` 的唯一变更入口。
//! 一次变更 = 读取 → 计算新余额 → 带期望版本的 compare-and-swap，
//! 余额与流水在同一次写入中提交。

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{PointsError, Result};
use crate::models::{Balance, LedgerRecord, TransactionRecord};
use crate::store::VersionedStore;

/// 变更类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingKind {
    /// 获得积分或调整：带符号增量同时计入 total 与 available
    Earn,
    /// 兑换：|points| 从 available 转入 used，total 不变
    Redeem,
}

/// 一次待提交的变更
#[derive(Debug, Clone)]
pub struct Posting {
    pub kind: PostingKind,
    pub points: i64,
    pub transaction: TransactionRecord,
}

/// 计算变更后的余额，版本加 1
///
/// available 不允许为负；任一字段溢出返回 `BalanceOverflow`，不做回绕。
pub fn next_balance(balance: Balance, kind: PostingKind, points: i64) -> Result<Balance> {
    let overflow = || PointsError::BalanceOverflow { points };
    let mut next = balance;
    match kind {
        PostingKind::Earn => {
            next.total = balance.total.checked_add(points).ok_or_else(overflow)?;
            next.available = balance.available.checked_add(points).ok_or_else(overflow)?;
        }
        PostingKind::Redeem => {
            let amount = points.checked_abs().ok_or_else(overflow)?;
            next.available = balance.available.checked_sub(amount).ok_or_else(overflow)?;
            next.used = balance.used.checked_add(amount).ok_or_else(overflow)?;
        }
    }

    if next.available < 0 {
        return Err(PointsError::InsufficientBalance {
            required: points.saturating_abs(),
            available: balance.available,
        });
    }

    next.account_version = balance.account_version + 1;
    Ok(next)
}

/// 积分账本
#[derive(Clone)]
pub struct BalanceLedger {
    store: Arc<dyn VersionedStore>,
}

impl BalanceLedger {
    pub fn new(store: Arc<dyn VersionedStore>) -> Self {
        Self { store }
    }

    /// 读取账本；首次引用的消费者返回零余额、版本 0 的空账本
    pub async fn load(&self, consumer_id: &str) -> Result<LedgerRecord> {
        Ok(self
            .store
            .load(consumer_id)
            .await?
            .unwrap_or_else(|| LedgerRecord::empty(consumer_id)))
    }

    /// 基于 `current` 提交一次变更
    ///
    /// 写入时以 `current` 的版本作为期望版本，期间有其他写入则返回
    /// `VersionConflict`，本方法不重试。
    #[instrument(skip(self, current, posting), fields(consumer_id = %current.consumer_id))]
    pub async fn apply(&self, current: &LedgerRecord, posting: Posting) -> Result<LedgerRecord> {
        let balance = next_balance(current.balance, posting.kind, posting.points)?;

        let mut next = current.clone();
        next.balance = balance;
        next.history.push(posting.transaction);

        self.store
            .compare_and_swap(current.version(), next.clone())
            .await?;

        debug!(
            version = balance.account_version,
            available = balance.available,
            "账本已提交"
        );
        Ok(next)
    }
}
