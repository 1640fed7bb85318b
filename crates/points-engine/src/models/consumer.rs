//! 消费者档案与账本模型

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::EventType;

/// 默认会员等级
pub const DEFAULT_TIER: &str = "STANDARD";

/// 消费者档案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerProfile {
    pub consumer_id: String,
    pub market: String,
    #[serde(default = "default_tier")]
    pub tier: String,
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
}

fn default_tier() -> String {
    DEFAULT_TIER.to_string()
}

impl ConsumerProfile {
    pub fn new(consumer_id: impl Into<String>, market: impl Into<String>) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            market: market.into(),
            tier: default_tier(),
            registration_date: None,
        }
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = tier.into();
        self
    }

    pub fn with_registration_date(mut self, date: NaiveDate) -> Self {
        self.registration_date = Some(date);
        self
    }
}

/// 积分余额
///
/// 稳态下 `total == available + used`；`account_version` 每次成功变更加 1。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub total: i64,
    pub available: i64,
    pub used: i64,
    pub account_version: u64,
}

impl Balance {
    pub fn is_consistent(&self) -> bool {
        self.total == self.available + self.used
    }
}

/// 账本流水
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    pub event_id: String,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    /// 带符号的积分变动
    pub points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recycled_count: Option<i64>,
}

impl TransactionRecord {
    pub fn new(
        event_id: impl Into<String>,
        event_type: EventType,
        timestamp: DateTime<Utc>,
        points: i64,
    ) -> Self {
        Self {
            transaction_id: Uuid::now_v7(),
            event_id: event_id.into(),
            event_type,
            timestamp,
            points,
            amount: None,
            recycled_count: None,
        }
    }

    pub fn with_amount(mut self, amount: Option<f64>) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_recycled_count(mut self, count: Option<i64>) -> Self {
        self.recycled_count = count;
        self
    }
}

/// 账本记录：余额与流水在同一次带版本写入中更新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub consumer_id: String,
    pub balance: Balance,
    #[serde(default)]
    pub history: Vec<TransactionRecord>,
}

impl LedgerRecord {
    /// 尚未建账的消费者，余额为零、版本为 0
    pub fn empty(consumer_id: impl Into<String>) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            balance: Balance::default(),
            history: Vec::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.balance.account_version
    }

    pub fn purchases(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.history
            .iter()
            .filter(|t| t.event_type == EventType::Purchase)
    }
}

/// 种子数据：消费者档案 + 可选的初始账本
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerSeed {
    #[serde(flatten)]
    pub profile: ConsumerProfile,
    #[serde(default)]
    pub balance: Option<Balance>,
    #[serde(default)]
    pub history: Vec<TransactionRecord>,
}

impl ConsumerSeed {
    pub fn ledger(&self) -> Option<LedgerRecord> {
        if self.balance.is_none() && self.history.is_empty() {
            return None;
        }
        Some(LedgerRecord {
            consumer_id: self.profile.consumer_id.clone(),
            balance: self.balance.unwrap_or_default(),
            history: self.history.clone(),
        })
    }
}
