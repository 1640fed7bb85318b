//! 积分事件模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Purchase,
    Registration,
    Recycle,
    Consultation,
    Adjustment,
    Redemption,
    Interaction,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "PURCHASE",
            Self::Registration => "REGISTRATION",
            Self::Recycle => "RECYCLE",
            Self::Consultation => "CONSULTATION",
            Self::Adjustment => "ADJUSTMENT",
            Self::Redemption => "REDEMPTION",
            Self::Interaction => "INTERACTION",
        }
    }

    /// 直接由属性换算积分、不经过规则匹配的事件
    pub fn is_direct_delta(&self) -> bool {
        matches!(self, Self::Redemption | Self::Adjustment | Self::Recycle)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 入站消费者事件
///
/// 由边界 API 构造，一经接受不可变。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyEvent {
    #[serde(default)]
    pub event_id: String,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub market: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub consumer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_line: Option<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl LoyaltyEvent {
    pub fn new(
        event_id: impl Into<String>,
        event_type: EventType,
        timestamp: DateTime<Utc>,
        market: impl Into<String>,
        consumer_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type,
            timestamp,
            market: market.into(),
            channel: String::new(),
            consumer_id: consumer_id.into(),
            product_line: None,
            context: Map::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_product_line(mut self, product_line: impl Into<String>) -> Self {
        self.product_line = Some(product_line.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// 产品线：顶层字段优先，其次 context，最后 attributes
    pub fn resolved_product_line(&self) -> Option<&str> {
        self.product_line
            .as_deref()
            .or_else(|| self.context.get("productLine").and_then(Value::as_str))
            .or_else(|| self.attributes.get("productLine").and_then(Value::as_str))
    }

    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }

    /// 整数属性；带小数部分的数值视为无效
    pub fn attribute_i64(&self, key: &str) -> Option<i64> {
        let value = self.attributes.get(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}
