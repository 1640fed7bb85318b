//! 条件评估器
//!
//! 实现各操作符的评估逻辑。数值按 f64 比较；日期字符串解析为
//! `DateTime<Utc>` 后比较，不依赖 ISO-8601 的字典序。

use crate::error::{Result, RuleError};
use crate::operators::Operator;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `fact_value` - 从事实图中解析出的值
    /// * `operator` - 操作符
    /// * `expected_value` - 规则中定义的期望值
    pub fn evaluate(
        fact_value: Option<&Value>,
        operator: Operator,
        expected_value: &Value,
    ) -> Result<bool> {
        let fact_value = match fact_value {
            Some(v) => v,
            None => return Ok(operator.missing_fact_result()),
        };

        match operator {
            Operator::Equal => Ok(Self::eq(fact_value, expected_value)),
            Operator::NotEqual => Ok(!Self::eq(fact_value, expected_value)),
            Operator::GreaterThan => Self::compare(fact_value, expected_value, |o| o.is_gt()),
            Operator::GreaterThanInclusive => {
                Self::compare(fact_value, expected_value, |o| o.is_ge())
            }
            Operator::LessThan => Self::compare(fact_value, expected_value, |o| o.is_lt()),
            Operator::LessThanInclusive => {
                Self::compare(fact_value, expected_value, |o| o.is_le())
            }
            Operator::In => Self::in_list(fact_value, expected_value),
            Operator::NotIn => Self::in_list(fact_value, expected_value).map(|r| !r),
            Operator::Contains => Self::contains(fact_value, expected_value),
            Operator::DoesNotContain => Self::contains(fact_value, expected_value).map(|r| !r),
        }
    }

    /// 相等比较
    fn eq(fact: &Value, expected: &Value) -> bool {
        // 100 与 100.0 应视为相等
        if let (Value::Number(a), Value::Number(b)) = (fact, expected) {
            if let (Some(f1), Some(f2)) = (a.as_f64(), b.as_f64()) {
                return (f1 - f2).abs() < f64::EPSILON;
            }
        }
        fact == expected
    }

    /// 有序比较：数值优先，其次日期
    fn compare<F>(fact: &Value, expected: &Value, cmp: F) -> Result<bool>
    where
        F: Fn(std::cmp::Ordering) -> bool,
    {
        if let (Some(a), Some(b)) = (Self::as_f64(fact), Self::as_f64(expected)) {
            return Ok(a.partial_cmp(&b).map(&cmp).unwrap_or(false));
        }

        if let (Some(a), Some(b)) = (Self::as_datetime(fact), Self::as_datetime(expected)) {
            return Ok(cmp(a.cmp(&b)));
        }

        Err(RuleError::TypeMismatch {
            expected: "number or ISO-8601 date".to_string(),
            actual: format!("{} vs {}", Self::type_name(fact), Self::type_name(expected)),
        })
    }

    /// 列表包含检查 (in)
    fn in_list(fact: &Value, expected: &Value) -> Result<bool> {
        let arr = expected.as_array().ok_or_else(|| RuleError::TypeMismatch {
            expected: "array".to_string(),
            actual: Self::type_name(expected).to_string(),
        })?;

        Ok(arr.iter().any(|item| Self::eq(fact, item)))
    }

    /// 字符串子串 / 数组元素包含检查
    fn contains(fact: &Value, expected: &Value) -> Result<bool> {
        match fact {
            Value::String(s) => {
                let needle = match expected {
                    Value::String(n) => n.clone(),
                    Value::Number(n) => n.to_string(),
                    other => {
                        return Err(RuleError::TypeMismatch {
                            expected: "string".to_string(),
                            actual: Self::type_name(other).to_string(),
                        });
                    }
                };
                Ok(s.contains(&needle))
            }
            Value::Array(arr) => Ok(arr.iter().any(|item| Self::eq(item, expected))),
            _ => Err(RuleError::InvalidOperator {
                operator: Operator::Contains.to_string(),
                value_type: Self::type_name(fact).to_string(),
            }),
        }
    }

    /// 尝试将 Value 转换为 f64（数值或数值字符串）
    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// 解析 RFC 3339 时间或 `YYYY-MM-DD` 日期
    fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
        let s = value.as_str()?;
        parse_datetime(s)
    }

    /// 获取值的类型名称
    fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// 解析日期时间字符串
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
