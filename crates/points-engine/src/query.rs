//! 积分查询服务
//!
//! 只读接口：积分概览（含过期信息）、兑换 / 回收预校验、流水查询。
//! 过期策略只在这里调用，事件处理过程中不计算。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::error::{PointsError, Result};
use crate::expiration::{ExpirationInput, expiration_details};
use crate::markets::MarketRegistry;
use crate::models::{
    ConsumerProfile, LedgerRecord, PointSummary, RecyclingCheck, RedemptionCheck,
    TransactionRecord,
};
use crate::store::{ConsumerStore, VersionedStore};
use crate::validation::{check_recycling, check_redemption};

/// 积分查询服务
#[derive(Clone)]
pub struct PointsQueryService {
    markets: Arc<MarketRegistry>,
    consumers: Arc<dyn ConsumerStore>,
    ledgers: Arc<dyn VersionedStore>,
}

impl PointsQueryService {
    pub fn new(
        markets: Arc<MarketRegistry>,
        consumers: Arc<dyn ConsumerStore>,
        ledgers: Arc<dyn VersionedStore>,
    ) -> Self {
        Self {
            markets,
            consumers,
            ledgers,
        }
    }

    /// 积分概览
    #[instrument(skip(self))]
    pub async fn point_summary(
        &self,
        consumer_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<PointSummary> {
        let (profile, ledger) = self
            .snapshot(consumer_id)
            .await?
            .ok_or_else(|| PointsError::ConsumerNotFound(consumer_id.to_string()))?;

        let market = self.markets.get(&profile.market).ok_or_else(|| {
            PointsError::Config(format!("市场未配置: {}", profile.market))
        })?;

        let expiration = expiration_details(
            market,
            ExpirationInput {
                history: &ledger.history,
                balance: ledger.balance,
                last_order_date: None,
                first_order_date: None,
                registration_date: profile.registration_date,
            },
        );
        let today = market.local_date(as_of);
        let days_until_expiration = expiration
            .next_expiration
            .map(|date| (date - today).num_days());

        Ok(PointSummary {
            consumer_id: profile.consumer_id,
            market: market.code.clone(),
            tier: profile.tier,
            balance: ledger.balance,
            expiration,
            days_until_expiration,
        })
    }

    /// 兑换预校验，不修改余额
    pub async fn validate_redemption(&self, consumer_id: &str, points: i64) -> Result<RedemptionCheck> {
        let Some((_, ledger)) = self.snapshot(consumer_id).await? else {
            return Ok(RedemptionCheck {
                valid: false,
                message: format!("consumer {} does not exist", consumer_id),
                remaining_after_redemption: 0,
            });
        };
        Ok(check_redemption(&ledger.balance, points))
    }

    /// 回收预校验，年度按 `as_of` 的市场本地自然年
    pub async fn validate_recycling(
        &self,
        consumer_id: &str,
        count: i64,
        as_of: DateTime<Utc>,
    ) -> Result<RecyclingCheck> {
        let Some((profile, ledger)) = self.snapshot(consumer_id).await? else {
            return Ok(RecyclingCheck {
                valid: false,
                message: format!("consumer {} does not exist", consumer_id),
                remaining_quota: 0,
            });
        };

        let market = self.markets.get(&profile.market).ok_or_else(|| {
            PointsError::Config(format!("市场未配置: {}", profile.market))
        })?;
        Ok(check_recycling(&ledger.history, market, count, as_of))
    }

    /// 流水，最新的在前
    pub async fn transaction_history(
        &self,
        consumer_id: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let ledger = self.ledgers.load(consumer_id).await?;
        let mut history = ledger.map(|l| l.history).unwrap_or_default();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history.truncate(limit);
        Ok(history)
    }

    async fn snapshot(&self, consumer_id: &str) -> Result<Option<(ConsumerProfile, LedgerRecord)>> {
        let Some(profile) = self.consumers.get(consumer_id).await? else {
            return Ok(None);
        };
        let ledger = self
            .ledgers
            .load(consumer_id)
            .await?
            .unwrap_or_else(|| LedgerRecord::empty(consumer_id));
        Ok(Some((profile, ledger)))
    }
}
