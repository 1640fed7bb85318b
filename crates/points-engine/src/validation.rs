//! 事件校验
//!
//! 在规则匹配之前拒绝结构非法或超出业务限额的事件。
//! 校验结果是值而不是错误：被拒绝的事件不会产生任何账本变更。

use chrono::{DateTime, Datelike, Utc};
use rule_engine::parse_datetime;
use serde_json::Value;

use crate::markets::{MarketProfile, MarketRegistry};
use crate::models::{
    Balance, EventType, LedgerRecord, LoyaltyEvent, RecyclingCheck, RedemptionCheck,
    TransactionRecord,
};

/// 拒绝类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// 缺失或非法的字段
    Structural,
    /// 兑换余额不足、回收年度上限等业务限额
    BusinessLimit,
}

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub code: &'static str,
    pub field: Option<String>,
    pub message: String,
    /// 兑换为扣减后余额，回收为当年剩余件数
    pub remaining: Option<i64>,
}

impl Rejection {
    fn structural(code: &'static str, field: &str, message: impl Into<String>) -> Self {
        Self {
            kind: RejectionKind::Structural,
            code,
            field: Some(field.to_string()),
            message: message.into(),
            remaining: None,
        }
    }

    fn business(code: &'static str, message: impl Into<String>, remaining: i64) -> Self {
        Self {
            kind: RejectionKind::BusinessLimit,
            code,
            field: None,
            message: message.into(),
            remaining: Some(remaining),
        }
    }

    /// 写入响应 `errors` 的文本
    pub fn to_error_string(&self) -> String {
        match &self.field {
            Some(field) => format!("{}: {} ({})", self.code, self.message, field),
            None => format!("{}: {}", self.code, self.message),
        }
    }
}

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

type Check = std::result::Result<(), Rejection>;

/// 校验门
pub struct ValidationGate<'a> {
    markets: &'a MarketRegistry,
}

impl<'a> ValidationGate<'a> {
    pub fn new(markets: &'a MarketRegistry) -> Self {
        Self { markets }
    }

    /// 校验事件
    ///
    /// 结构校验先于业务限额校验；遇到第一个失败立即返回。
    pub fn validate(
        &self,
        event: &LoyaltyEvent,
        consumer_exists: bool,
        ledger: &LedgerRecord,
    ) -> ValidationOutcome {
        match self.run(event, consumer_exists, ledger) {
            Ok(()) => ValidationOutcome::Valid,
            Err(rejection) => ValidationOutcome::Rejected(rejection),
        }
    }

    fn run(&self, event: &LoyaltyEvent, consumer_exists: bool, ledger: &LedgerRecord) -> Check {
        require_non_empty("eventId", &event.event_id)?;
        require_non_empty("consumerId", &event.consumer_id)?;

        let market = self.markets.get(&event.market).ok_or_else(|| {
            Rejection::structural(
                "UNKNOWN_MARKET",
                "market",
                format!("unsupported market {}", event.market),
            )
        })?;

        if !consumer_exists && event.event_type != EventType::Registration {
            return Err(Rejection::structural(
                "CONSUMER_NOT_FOUND",
                "consumerId",
                format!("consumer {} does not exist", event.consumer_id),
            ));
        }

        match event.event_type {
            EventType::Purchase => validate_purchase(event),
            EventType::Consultation => validate_consultation(event),
            EventType::Adjustment => validate_adjustment(event, &ledger.balance),
            EventType::Recycle => validate_recycle(event, ledger, market),
            EventType::Redemption => validate_redemption(event, &ledger.balance),
            EventType::Registration | EventType::Interaction => Ok(()),
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Check {
    if value.trim().is_empty() {
        return Err(Rejection::structural(
            "MISSING_FIELD",
            field,
            format!("{} is required", field),
        ));
    }
    Ok(())
}

fn require_attribute_str<'e>(event: &'e LoyaltyEvent, field: &str) -> Result<&'e str, Rejection> {
    match event.attribute_str(field) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Rejection::structural(
            "MISSING_FIELD",
            field,
            format!("{} is required", field),
        )),
    }
}

/// 正整数属性
fn require_positive_i64(event: &LoyaltyEvent, field: &str) -> Result<i64, Rejection> {
    match event.attribute_i64(field) {
        Some(value) if value > 0 => Ok(value),
        Some(_) => Err(Rejection::structural(
            "INVALID_FIELD",
            field,
            format!("{} must be positive", field),
        )),
        None => Err(Rejection::structural(
            "MISSING_FIELD",
            field,
            format!("{} must be a positive integer", field),
        )),
    }
}

fn validate_purchase(event: &LoyaltyEvent) -> Check {
    match event.attribute_f64("amount") {
        Some(amount) if amount > 0.0 => {}
        Some(_) => {
            return Err(Rejection::structural(
                "INVALID_FIELD",
                "amount",
                "amount must be greater than 0",
            ));
        }
        None => {
            return Err(Rejection::structural(
                "MISSING_FIELD",
                "amount",
                "amount is required",
            ));
        }
    }

    require_attribute_str(event, "currency")?;

    match event.attributes.get("skuList") {
        Some(Value::Array(items)) if !items.is_empty() => Ok(()),
        _ => Err(Rejection::structural(
            "MISSING_FIELD",
            "skuList",
            "skuList must be a non-empty list",
        )),
    }
}

fn validate_consultation(event: &LoyaltyEvent) -> Check {
    require_attribute_str(event, "consultationType")?;
    let date = require_attribute_str(event, "skinTestDate")?;
    if parse_datetime(date).is_none() {
        return Err(Rejection::structural(
            "INVALID_FIELD",
            "skinTestDate",
            format!("skinTestDate is not a valid date: {}", date),
        ));
    }
    Ok(())
}

fn validate_adjustment(event: &LoyaltyEvent, balance: &Balance) -> Check {
    let points = match event.attribute_i64("adjustmentPoints") {
        Some(0) => {
            return Err(Rejection::structural(
                "INVALID_FIELD",
                "adjustmentPoints",
                "adjustmentPoints must not be zero",
            ));
        }
        Some(points) => points,
        None => {
            return Err(Rejection::structural(
                "MISSING_FIELD",
                "adjustmentPoints",
                "adjustmentPoints must be an integer",
            ));
        }
    };
    require_attribute_str(event, "reason")?;

    let (Some(remaining), Some(_)) = (
        balance.available.checked_add(points),
        balance.total.checked_add(points),
    ) else {
        return Err(Rejection::structural(
            "INVALID_FIELD",
            "adjustmentPoints",
            format!("adjustmentPoints {} is out of range", points),
        ));
    };
    if remaining < 0 {
        return Err(Rejection::business(
            "INSUFFICIENT_BALANCE",
            format!(
                "adjustment of {} exceeds available balance {}",
                points, balance.available
            ),
            remaining,
        ));
    }
    Ok(())
}

fn validate_recycle(event: &LoyaltyEvent, ledger: &LedgerRecord, market: &MarketProfile) -> Check {
    let count = require_positive_i64(event, "recycledCount")?;
    let check = check_recycling(&ledger.history, market, count, event.timestamp);
    if !check.valid {
        return Err(Rejection::business(
            "RECYCLE_LIMIT_EXCEEDED",
            check.message,
            check.remaining_quota,
        ));
    }
    if count.checked_mul(market.recycle_points_per_item).is_none() {
        return Err(Rejection::structural(
            "INVALID_FIELD",
            "recycledCount",
            format!("recycled points for {} items are out of range", count),
        ));
    }
    Ok(())
}

fn validate_redemption(event: &LoyaltyEvent, balance: &Balance) -> Check {
    let points = require_positive_i64(event, "redemptionPoints")?;
    let check = check_redemption(balance, points);
    if !check.valid {
        return Err(Rejection::business(
            "INSUFFICIENT_BALANCE",
            check.message,
            check.remaining_after_redemption,
        ));
    }
    Ok(())
}

/// 兑换充足性检查
pub fn check_redemption(balance: &Balance, points: i64) -> RedemptionCheck {
    if points <= 0 {
        return RedemptionCheck {
            valid: false,
            message: "redemption points must be positive".to_string(),
            remaining_after_redemption: balance.available,
        };
    }

    let remaining = balance.available.saturating_sub(points);
    if remaining < 0 {
        return RedemptionCheck {
            valid: false,
            message: format!(
                "insufficient points: requested {}, available {}",
                points, balance.available
            ),
            remaining_after_redemption: remaining,
        };
    }

    RedemptionCheck {
        valid: true,
        message: "redemption allowed".to_string(),
        remaining_after_redemption: remaining,
    }
}

/// 回收年度上限检查
///
/// 年度按 `as_of` 在市场本地时间的自然年计算。
pub fn check_recycling(
    history: &[TransactionRecord],
    market: &MarketProfile,
    count: i64,
    as_of: DateTime<Utc>,
) -> RecyclingCheck {
    let limit = i64::from(market.recycle_yearly_limit);
    let used = recycled_in_year(history, market, market.local_date(as_of).year());
    let remaining_quota = limit.saturating_sub(used).max(0);

    if count <= 0 {
        return RecyclingCheck {
            valid: false,
            message: "recycled count must be positive".to_string(),
            remaining_quota,
        };
    }

    // 溢出视同超限
    if used.checked_add(count).is_none_or(|total| total > limit) {
        return RecyclingCheck {
            valid: false,
            message: format!(
                "yearly recycling limit exceeded: {} of {} used, requested {}",
                used, limit, count
            ),
            remaining_quota,
        };
    }

    RecyclingCheck {
        valid: true,
        message: "recycling allowed".to_string(),
        remaining_quota,
    }
}

fn recycled_in_year(history: &[TransactionRecord], market: &MarketProfile, year: i32) -> i64 {
    history
        .iter()
        .filter(|t| t.event_type == EventType::Recycle)
        .filter(|t| market.local_date(t.timestamp).year() == year)
        .map(|t| t.recycled_count.unwrap_or(0))
        .fold(0i64, i64::saturating_add)
}
