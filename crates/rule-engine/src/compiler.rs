//! 规则编译器
//!
//! 校验规则结构并预提取规则引用的事实名，得到可直接执行的 `CompiledRule`。

use crate::error::{Result, RuleError};
use crate::models::{Condition, ConditionNode, Rule, RuleCategory};
use std::collections::BTreeSet;

/// 编译后的规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// 原始规则
    pub rule: Rule,
    /// 所属分类（由规则文件决定）
    pub category: RuleCategory,
    /// 规则条件引用的全部事实名
    pub required_facts: BTreeSet<String>,
    /// 编译序号，即目录加载顺序
    pub compile_version: u64,
}

impl CompiledRule {
    pub fn id(&self) -> &str {
        &self.rule.id
    }

    pub fn name(&self) -> &str {
        &self.rule.name
    }

    pub fn conditions(&self) -> &ConditionNode {
        &self.rule.conditions
    }

    pub fn event_type(&self) -> &str {
        &self.rule.event.event_type
    }

    pub fn is_active(&self) -> bool {
        self.rule.active
    }
}

/// 规则编译器
#[derive(Default)]
pub struct RuleCompiler {
    compile_version: u64,
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self { compile_version: 0 }
    }

    /// 从 JSON 字符串编译单条规则
    pub fn compile_from_json(&mut self, json: &str, category: RuleCategory) -> Result<CompiledRule> {
        let rule: Rule = serde_json::from_str(json)?;
        self.compile(rule, category)
    }

    /// 编译规则
    pub fn compile(&mut self, mut rule: Rule, category: RuleCategory) -> Result<CompiledRule> {
        if rule.id.is_empty() {
            rule.id = rule.name.clone();
        }

        self.validate_rule(&rule)?;

        let mut required_facts = BTreeSet::new();
        collect_facts(&rule.conditions, &mut required_facts);

        self.compile_version += 1;

        Ok(CompiledRule {
            rule,
            category,
            required_facts,
            compile_version: self.compile_version,
        })
    }

    /// 验证规则结构
    fn validate_rule(&self, rule: &Rule) -> Result<()> {
        if rule.name.is_empty() {
            return Err(RuleError::ParseError("规则名称不能为空".to_string()));
        }

        if rule.event.event_type.is_empty() {
            return Err(self.compile_error(rule, "event.type 不能为空"));
        }

        self.validate_node(rule, &rule.conditions, "conditions")
    }

    fn validate_node(&self, rule: &Rule, node: &ConditionNode, path: &str) -> Result<()> {
        match node {
            ConditionNode::Leaf(cond) => self.validate_condition(rule, cond, path),
            ConditionNode::All { all: children } | ConditionNode::Any { any: children } => {
                if children.is_empty() {
                    return Err(self.compile_error(rule, &format!("条件组 '{}' 不能为空", path)));
                }

                for (i, child) in children.iter().enumerate() {
                    self.validate_node(rule, child, &format!("{}[{}]", path, i))?;
                }
                Ok(())
            }
        }
    }

    fn validate_condition(&self, rule: &Rule, cond: &Condition, path: &str) -> Result<()> {
        if cond.fact.is_empty() {
            return Err(self.compile_error(rule, &format!("条件 '{}' 的 fact 不能为空", path)));
        }

        if cond.operator.expects_array() && !cond.value.is_array() {
            return Err(self.compile_error(
                rule,
                &format!("条件 '{}' 的 {} 操作符需要数组值", path, cond.operator),
            ));
        }

        Ok(())
    }

    fn compile_error(&self, rule: &Rule, message: &str) -> RuleError {
        RuleError::CompileError {
            rule_id: rule.id.clone(),
            message: message.to_string(),
        }
    }
}

fn collect_facts(node: &ConditionNode, facts: &mut BTreeSet<String>) {
    match node {
        ConditionNode::Leaf(cond) => {
            facts.insert(cond.fact.clone());
        }
        ConditionNode::All { all: children } | ConditionNode::Any { any: children } => {
            for child in children {
                collect_facts(child, facts);
            }
        }
    }
}
