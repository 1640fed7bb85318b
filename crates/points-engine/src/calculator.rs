//! 积分计算
//!
//! 规则命中后触发的事件类型在目录加载时一次性解析为封闭的 `PointsHandler`，
//! 计算阶段只做查表与算术。

use std::collections::HashMap;

use rule_engine::{RuleCatalog, RuleCategory, RuleMatch};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{PointsError, Result};
use crate::models::PointBreakdownEntry;

/// 单笔订单倍数积分上限的事件类型
pub const ORDER_CAP_EVENT: &str = "ORDER_MULTIPLE_POINT_LIMIT";

const BONUS_KEYS: [&str; 3] = ["bonus", "fixedBonus", "registrationBonus"];
const CAP_KEYS: [&str; 2] = ["maxPoints", "limit"];

/// 积分处理器
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointsHandler {
    /// 交易类积分合计上限
    OrderCap { max_points: i64 },
    /// round(baseAmount × multiplier)，各倍数独立基于 base 计算
    Multiplier { multiplier: f64 },
    /// 固定加分
    FixedBonus { points: i64 },
}

impl PointsHandler {
    /// 根据事件类型与参数解析处理器
    pub fn resolve(event_type: &str, params: &Map<String, Value>) -> Option<Self> {
        if event_type == ORDER_CAP_EVENT {
            return param_i64(params, &CAP_KEYS).map(|max_points| Self::OrderCap { max_points });
        }

        if let Some(multiplier) = params.get("multiplier").and_then(Value::as_f64) {
            return Some(Self::Multiplier { multiplier });
        }

        param_i64(params, &BONUS_KEYS).map(|points| Self::FixedBonus { points })
    }
}

fn param_i64(params: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| {
        let value = params.get(*key)?;
        value.as_i64().or_else(|| value.as_f64().map(round_half_up))
    })
}

/// 四舍五入到整数积分（.5 向上），带误差保护
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5 + 1e-9).floor() as i64
}

/// 规则 ID -> 处理器
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, PointsHandler>,
}

impl HandlerTable {
    /// 为目录中每条规则解析处理器，任一规则无法解析即失败
    pub fn build(catalog: &RuleCatalog) -> Result<Self> {
        let mut handlers = HashMap::with_capacity(catalog.len());

        for rule in catalog.iter() {
            let handler = PointsHandler::resolve(rule.event_type(), &rule.rule.event.params)
                .ok_or_else(|| PointsError::UnknownHandler {
                    rule_id: rule.id().to_string(),
                    event_type: rule.event_type().to_string(),
                })?;
            debug!(rule_id = %rule.id(), handler = ?handler, "规则处理器已注册");
            handlers.insert(rule.id().to_string(), handler);
        }

        Ok(Self { handlers })
    }

    pub fn get(&self, rule_id: &str) -> Option<PointsHandler> {
        self.handlers.get(rule_id).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// 一次计算的结果
#[derive(Debug, Clone, Default)]
pub struct Calculation {
    pub breakdown: Vec<PointBreakdownEntry>,
    pub total: i64,
    /// 单条规则计算失败的描述，不影响其他规则
    pub errors: Vec<String>,
}

/// 积分计算器
pub struct PointsCalculator<'a> {
    handlers: &'a HandlerTable,
}

impl<'a> PointsCalculator<'a> {
    pub fn new(handlers: &'a HandlerTable) -> Self {
        Self { handlers }
    }

    /// 按命中顺序计算明细
    ///
    /// 交易类明细先行汇总并按上限截断，之后再追加其他分类的明细。
    pub fn calculate(&self, matches: &[RuleMatch], base_amount: Option<f64>) -> Calculation {
        let mut calc = Calculation::default();
        let mut cap: Option<i64> = None;
        let mut transaction_sum = 0i64;
        let mut deferred = Vec::new();

        for m in matches {
            let Some(handler) = self.handlers.get(&m.rule_id) else {
                warn!(rule_id = %m.rule_id, "命中规则没有对应的积分处理器");
                calc.errors
                    .push(format!("rule {}: no points handler registered", m.rule_id));
                continue;
            };

            let points = match handler {
                PointsHandler::OrderCap { max_points } => {
                    cap = Some(cap.map_or(max_points, |c| c.min(max_points)));
                    continue;
                }
                PointsHandler::FixedBonus { points } => points,
                PointsHandler::Multiplier { multiplier } => match base_amount {
                    Some(base) => round_half_up(base * multiplier),
                    None => {
                        warn!(rule_id = %m.rule_id, "倍数规则缺少 baseAmount 事实");
                        calc.errors
                            .push(format!("rule {}: baseAmount fact is missing", m.rule_id));
                        continue;
                    }
                },
            };

            let entry = PointBreakdownEntry::new(&m.event_type, describe(m), points);
            if m.category == RuleCategory::Transaction {
                transaction_sum += points;
                calc.breakdown.push(entry);
            } else {
                deferred.push(entry);
            }
        }

        if let Some(max_points) = cap {
            if transaction_sum > max_points {
                calc.breakdown.push(PointBreakdownEntry::new(
                    ORDER_CAP_EVENT,
                    format!("order points capped at {}", max_points),
                    max_points - transaction_sum,
                ));
            }
        }

        calc.breakdown.extend(deferred);
        calc.total = calc.breakdown.iter().map(|e| e.points).sum();
        calc
    }
}

/// 明细描述：params.description 优先，否则规则名
fn describe(m: &RuleMatch) -> String {
    m.params
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| m.rule_name.clone())
}
