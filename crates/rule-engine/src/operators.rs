//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
///
/// 线上规则文件使用 camelCase 命名（如 `greaterThanInclusive`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    // 通用比较
    Equal,
    NotEqual,

    // 数值 / 日期比较
    GreaterThan,
    GreaterThanInclusive,
    LessThan,
    LessThanInclusive,

    // 包含检查
    In,
    NotIn,
    Contains,
    DoesNotContain,
}

impl Operator {
    /// 事实缺失时的取值
    ///
    /// 否定类操作符在事实不存在时视为成立，其余一律不成立。
    pub fn missing_fact_result(&self) -> bool {
        matches!(self, Self::NotEqual | Self::NotIn | Self::DoesNotContain)
    }

    /// 期望值是否必须为数组
    pub fn expects_array(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanInclusive => "greaterThanInclusive",
            Self::LessThan => "lessThan",
            Self::LessThanInclusive => "lessThanInclusive",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::Contains => "contains",
            Self::DoesNotContain => "doesNotContain",
        };
        write!(f, "{}", s)
    }
}

/// 逻辑组合子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    All,
    Any,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Any => write!(f, "any"),
        }
    }
}
