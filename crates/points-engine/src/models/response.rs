//! 对外响应模型

use chrono::NaiveDate;
use serde::Serialize;

use super::consumer::Balance;
use super::event::EventType;

/// 积分明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointBreakdownEntry {
    pub rule_id: String,
    pub description: String,
    pub points: i64,
}

impl PointBreakdownEntry {
    pub fn new(rule_id: impl Into<String>, description: impl Into<String>, points: i64) -> Self {
        Self {
            rule_id: rule_id.into(),
            description: description.into(),
            points,
        }
    }
}

/// 事件处理结果
///
/// `errors` 非空且明细为空表示事件被整体拒绝；两者都非空表示部分成功。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsResponse {
    pub consumer_id: String,
    pub event_id: String,
    pub event_type: EventType,
    pub total_points_awarded: i64,
    pub point_breakdown: Vec<PointBreakdownEntry>,
    pub errors: Vec<String>,
    pub resulting_balance: Balance,
}

impl PointsResponse {
    pub fn is_rejected(&self) -> bool {
        !self.errors.is_empty() && self.point_breakdown.is_empty()
    }
}

/// 兑换预校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionCheck {
    pub valid: bool,
    pub message: String,
    /// 按请求扣减后的剩余可用积分（请求被拒绝时可能为负）
    pub remaining_after_redemption: i64,
}

/// 回收预校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecyclingCheck {
    pub valid: bool,
    pub message: String,
    /// 当年剩余可回收件数（不含本次请求）
    pub remaining_quota: i64,
}

/// 积分过期信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationDetail {
    pub next_expiration: Option<NaiveDate>,
    pub expiration_rule: String,
    pub timezone: String,
    pub expiring_points: i64,
}

/// 积分概览
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointSummary {
    pub consumer_id: String,
    pub market: String,
    pub tier: String,
    pub balance: Balance,
    pub expiration: ExpirationDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_expiration: Option<i64>,
}
