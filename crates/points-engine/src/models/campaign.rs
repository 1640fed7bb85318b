//! 活动模型

use chrono::NaiveDate;
use rule_engine::SCOPE_ALL;
use serde::{Deserialize, Serialize};

/// 营销活动
///
/// 由外部系统维护，引擎只读。`priority` 越小越先考虑，与规则优先级方向相反。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub campaign_id: String,
    pub campaign_code: String,
    pub market: String,
    pub channel: String,
    pub product_line: String,
    /// 起止日期均含当天，按市场本地日期判断
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub rule_ids: Vec<String>,
    pub is_active: bool,
    #[serde(default)]
    pub priority: i32,
}

impl Campaign {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn matches_scope(&self, market: &str, channel: &str, product_line: Option<&str>) -> bool {
        field_matches(&self.market, Some(market))
            && field_matches(&self.channel, Some(channel))
            && field_matches(&self.product_line, product_line)
    }
}

/// 精确匹配或活动声明 `ALL`
fn field_matches(declared: &str, value: Option<&str>) -> bool {
    if declared.eq_ignore_ascii_case(SCOPE_ALL) {
        return true;
    }
    value.is_some_and(|v| v.eq_ignore_ascii_case(declared))
}
