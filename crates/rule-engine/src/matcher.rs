//! 规则匹配器
//!
//! 对目录中每条启用的规则求值（规则内短路，规则间不短路），
//! 返回全部命中规则。单条规则求值出错时隔离记录，不影响其他规则。

use crate::catalog::RuleCatalog;
use crate::compiler::CompiledRule;
use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::models::{Condition, ConditionNode, EvaluationResult, FactGraph, RuleCategory};
use crate::operators::Combinator;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

/// 作用域预过滤参数
#[derive(Debug, Clone, Copy)]
pub struct MatchScope<'a> {
    pub market: &'a str,
    pub channel: &'a str,
    pub product_line: Option<&'a str>,
    /// 适用活动声明的规则 ID，活动分类规则只有在此集合中才参与评估
    pub campaign_rule_ids: &'a HashSet<String>,
}

/// 命中的规则
#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub rule_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub priority: i32,
    pub event_type: String,
    pub params: Map<String, Value>,
    pub matched_conditions: Vec<String>,
}

/// 求值失败的规则
#[derive(Debug)]
pub struct MatchFailure {
    pub rule_id: String,
    pub error: RuleError,
}

/// 一次匹配的汇总结果
#[derive(Debug, Default)]
pub struct MatchOutcome {
    /// 按目录顺序排列的命中规则
    pub matches: Vec<RuleMatch>,
    pub failures: Vec<MatchFailure>,
    pub evaluated: usize,
    pub skipped: usize,
}

/// 规则匹配器
#[derive(Debug, Clone, Default)]
pub struct RuleMatcher {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleMatcher {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    pub fn with_trace_enabled(mut self, enabled: bool) -> Self {
        self.trace_enabled = enabled;
        self
    }

    /// 对目录中所有适用规则求值
    pub fn match_rules(
        &self,
        catalog: &RuleCatalog,
        facts: &FactGraph,
        scope: &MatchScope<'_>,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        for rule in catalog.iter() {
            if !self.is_eligible(rule, scope) {
                outcome.skipped += 1;
                continue;
            }

            outcome.evaluated += 1;
            match self.execute(rule, facts) {
                Ok(result) => {
                    if self.trace_enabled {
                        debug!(
                            rule_id = %result.rule_id,
                            matched = result.matched,
                            trace = ?result.evaluation_trace,
                            "规则评估追踪"
                        );
                    }
                    if result.matched {
                        outcome.matches.push(RuleMatch {
                            rule_id: rule.id().to_string(),
                            rule_name: rule.name().to_string(),
                            category: rule.category,
                            priority: rule.rule.priority,
                            event_type: rule.event_type().to_string(),
                            params: rule.rule.event.params.clone(),
                            matched_conditions: result.matched_conditions,
                        });
                    }
                }
                Err(error) => {
                    warn!(rule_id = %rule.id(), error = %error, "规则求值失败，已跳过");
                    outcome.failures.push(MatchFailure {
                        rule_id: rule.id().to_string(),
                        error,
                    });
                }
            }
        }

        outcome
    }

    /// 启用状态 + 作用域 + 活动资格的预过滤
    fn is_eligible(&self, rule: &CompiledRule, scope: &MatchScope<'_>) -> bool {
        if !rule.is_active() {
            return false;
        }

        if rule.category == RuleCategory::Campaign
            && !scope.campaign_rule_ids.contains(rule.id())
        {
            return false;
        }

        rule.rule
            .in_scope(scope.market, scope.channel, scope.product_line)
    }

    /// 执行单条规则评估
    pub fn execute(&self, rule: &CompiledRule, facts: &FactGraph) -> Result<EvaluationResult> {
        let mut result = EvaluationResult::new(rule.id().to_string(), rule.name().to_string());
        result.matched = self.evaluate_node(rule.conditions(), facts, &mut result, "conditions")?;
        Ok(result)
    }

    fn evaluate_node(
        &self,
        node: &ConditionNode,
        facts: &FactGraph,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        match node {
            ConditionNode::Leaf(cond) => self.evaluate_condition(cond, facts, result, path),
            ConditionNode::All { all } => {
                self.evaluate_group(Combinator::All, all, facts, result, path)
            }
            ConditionNode::Any { any } => {
                self.evaluate_group(Combinator::Any, any, facts, result, path)
            }
        }
    }

    fn evaluate_condition(
        &self,
        cond: &Condition,
        facts: &FactGraph,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        let fact_value = facts.get(&cond.fact);
        let matched = ConditionEvaluator::evaluate(fact_value, cond.operator, &cond.value)?;

        if self.trace_enabled {
            result.evaluation_trace.push(format!(
                "{}: {} {} {} => {}",
                path,
                cond.fact,
                cond.operator,
                cond.value,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        if matched {
            result
                .matched_conditions
                .push(format!("{} {} {}", cond.fact, cond.operator, cond.value));
        }

        Ok(matched)
    }

    /// 组节点求值（组内短路）
    fn evaluate_group(
        &self,
        combinator: Combinator,
        children: &[ConditionNode],
        facts: &FactGraph,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        for (i, child) in children.iter().enumerate() {
            let child_path = format!("{}.{}[{}]", path, combinator, i);
            let child_matched = self.evaluate_node(child, facts, result, &child_path)?;

            match (combinator, child_matched) {
                (Combinator::All, false) => {
                    if self.trace_enabled {
                        result
                            .evaluation_trace
                            .push(format!("{}: all 短路 - 子节点 {} 不匹配", path, i));
                    }
                    return Ok(false);
                }
                (Combinator::Any, true) => {
                    if self.trace_enabled {
                        result
                            .evaluation_trace
                            .push(format!("{}: any 短路 - 子节点 {} 匹配", path, i));
                    }
                    return Ok(true);
                }
                _ => {}
            }
        }

        Ok(combinator == Combinator::All)
    }
}
