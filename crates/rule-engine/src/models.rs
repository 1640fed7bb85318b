//! 规则引擎领域模型

use crate::operators::{Combinator, Operator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// 作用域通配符
pub const SCOPE_ALL: &str = "ALL";

/// 规则分类
///
/// 规则文件按分类拆分，加载顺序即 `RuleCategory::ORDERED` 的顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Transaction,
    Consumer,
    Product,
    Basket,
    Campaign,
}

impl RuleCategory {
    /// 固定的分类加载顺序
    pub const ORDERED: [RuleCategory; 5] = [
        RuleCategory::Transaction,
        RuleCategory::Consumer,
        RuleCategory::Product,
        RuleCategory::Basket,
        RuleCategory::Campaign,
    ];

    /// 对应的规则文件名
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction_rules.json",
            Self::Consumer => "consumer_rules.json",
            Self::Product => "product_rules.json",
            Self::Basket => "basket_rules.json",
            Self::Campaign => "campaign_rules.json",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transaction => "transaction",
            Self::Consumer => "consumer",
            Self::Product => "product",
            Self::Basket => "basket",
            Self::Campaign => "campaign",
        };
        write!(f, "{}", s)
    }
}

/// 规则定义（规则文件中的一条记录）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// 缺省时取 `name`
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// 数值越大优先级越高
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    pub conditions: ConditionNode,
    pub event: RuleEvent,
    #[serde(default)]
    pub markets: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub product_lines: Vec<String>,
}

fn default_active() -> bool {
    true
}

impl Rule {
    pub fn new(name: impl Into<String>, conditions: ConditionNode, event: RuleEvent) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            priority: 0,
            active: true,
            conditions,
            event,
            markets: Vec::new(),
            channels: Vec::new(),
            product_lines: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_markets(mut self, markets: &[&str]) -> Self {
        self.markets = markets.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_channels(mut self, channels: &[&str]) -> Self {
        self.channels = channels.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_product_lines(mut self, lines: &[&str]) -> Self {
        self.product_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// 作用域预过滤：市场 / 渠道 / 产品线任一不匹配即跳过
    pub fn in_scope(&self, market: &str, channel: &str, product_line: Option<&str>) -> bool {
        scope_matches(&self.markets, Some(market))
            && scope_matches(&self.channels, Some(channel))
            && scope_matches(&self.product_lines, product_line)
    }
}

/// 空列表或声明 `ALL` 视为不限制
pub fn scope_matches(scope: &[String], value: Option<&str>) -> bool {
    if scope.is_empty() || scope.iter().any(|s| s.eq_ignore_ascii_case(SCOPE_ALL)) {
        return true;
    }
    match value {
        Some(v) => scope.iter().any(|s| s.eq_ignore_ascii_case(v)),
        None => false,
    }
}

/// 规则命中后触发的事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl RuleEvent {
    pub fn new(event_type: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            event_type: event_type.into(),
            params,
        }
    }
}

/// 条件树节点
///
/// 线上格式：`{"all": [...]}`、`{"any": [...]}` 或叶子 `{fact, operator, value}`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    All { all: Vec<ConditionNode> },
    Any { any: Vec<ConditionNode> },
    Leaf(Condition),
}

impl ConditionNode {
    pub fn all(children: Vec<ConditionNode>) -> Self {
        Self::All { all: children }
    }

    pub fn any(children: Vec<ConditionNode>) -> Self {
        Self::Any { any: children }
    }

    pub fn leaf(fact: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::Leaf(Condition::new(fact, operator, value))
    }

    /// 组合节点的组合子与子节点，叶子返回 None
    pub fn as_group(&self) -> Option<(Combinator, &[ConditionNode])> {
        match self {
            Self::All { all } => Some((Combinator::All, all)),
            Self::Any { any } => Some((Combinator::Any, any)),
            Self::Leaf(_) => None,
        }
    }
}

/// 条件叶子
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub fact: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(fact: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            fact: fact.into(),
            operator,
            value: value.into(),
        }
    }
}

/// 事实图
///
/// 单次事件评估内有效的 “事实名 -> 值” 映射，保持插入顺序。
/// 查找时先按完整名称匹配，再按点号路径进入对象（如 `context.externalId`）。
#[derive(Debug, Clone, Default)]
pub struct FactGraph {
    order: Vec<String>,
    values: HashMap<String, Value>,
}

impl FactGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入事实；同名事实覆盖值但保留原有位置
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value.into());
    }

    /// 仅在值存在时写入
    pub fn insert_opt(&mut self, name: impl Into<String>, value: Option<impl Into<Value>>) {
        if let Some(v) = value {
            self.insert(name, v);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// 解析事实（支持点号路径与数组下标，如 `attributes.skuList.0`）
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(v) = self.values.get(path) {
            return Some(v);
        }

        for (idx, _) in path.match_indices('.') {
            let (root, rest) = (&path[..idx], &path[idx + 1..]);
            if let Some(root_value) = self.values.get(root) {
                return walk_path(root_value, rest);
            }
        }

        None
    }

    /// 按插入顺序返回事实名
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 导出为 JSON 对象（用于调试日志）
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for name in &self.order {
            if let Some(v) = self.values.get(name) {
                map.insert(name.clone(), v.clone());
            }
        }
        Value::Object(map)
    }
}

fn walk_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// 单条规则的评估结果
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub matched: bool,
    pub rule_id: String,
    pub rule_name: String,
    pub matched_conditions: Vec<String>,
    pub evaluation_trace: Vec<String>,
}

impl EvaluationResult {
    pub fn new(rule_id: String, rule_name: String) -> Self {
        Self {
            matched: false,
            rule_id,
            rule_name,
            matched_conditions: Vec::new(),
            evaluation_trace: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_deserialization_with_defaults() {
        let json = r#"
        {
            "name": "INTERACTION_REGISTRY",
            "conditions": {
                "all": [
                    { "fact": "eventType", "operator": "equal", "value": "INTERACTION" },
                    { "fact": "context.externalId", "operator": "contains", "value": "reg" }
                ]
            },
            "event": {
                "type": "INTERACTION_REGISTRY_POINT",
                "params": { "registrationBonus": 150 }
            },
            "markets": ["JP"]
        }
        "#;

        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.name, "INTERACTION_REGISTRY");
        assert!(rule.id.is_empty());
        assert!(rule.active);
        assert_eq!(rule.priority, 0);
        assert_eq!(rule.event.event_type, "INTERACTION_REGISTRY_POINT");
        assert_eq!(rule.event.params["registrationBonus"], json!(150));
        assert!(rule.channels.is_empty());

        let (combinator, children) = rule.conditions.as_group().unwrap();
        assert_eq!(combinator, Combinator::All);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_nested_condition_tree() {
        let json = r#"
        {
            "any": [
                { "fact": "tier", "operator": "equal", "value": "VIP" },
                { "all": [
                    { "fact": "baseAmount", "operator": "greaterThan", "value": 5000 },
                    { "fact": "market", "operator": "in", "value": ["HK", "TW"] }
                ] }
            ]
        }
        "#;

        let node: ConditionNode = serde_json::from_str(json).unwrap();
        let (combinator, children) = node.as_group().unwrap();
        assert_eq!(combinator, Combinator::Any);
        assert!(matches!(children[0], ConditionNode::Leaf(_)));
        assert!(matches!(children[1], ConditionNode::All { .. }));
    }

    #[test]
    fn test_scope_matching() {
        let rule = Rule::new(
            "scoped",
            ConditionNode::leaf("eventType", Operator::Equal, "PURCHASE"),
            RuleEvent::new("BONUS", json!({"bonus": 10})),
        )
        .with_markets(&["HK"])
        .with_channels(&["ALL"])
        .with_product_lines(&["PREMIUM_SERIES"]);

        assert!(rule.in_scope("HK", "LINE", Some("PREMIUM_SERIES")));
        assert!(!rule.in_scope("JP", "LINE", Some("PREMIUM_SERIES")));
        assert!(!rule.in_scope("HK", "LINE", Some("BASIC")));
        // 规则限定了产品线而事件没有产品线
        assert!(!rule.in_scope("HK", "LINE", None));
    }

    #[test]
    fn test_fact_graph_lookup() {
        let mut facts = FactGraph::new();
        facts.insert("eventType", "INTERACTION");
        facts.insert(
            "context",
            json!({"externalId": "reg_new_user_jp_001", "tags": ["a", "b"]}),
        );
        facts.insert("eventType", "PURCHASE");

        assert_eq!(facts.get("eventType"), Some(&json!("PURCHASE")));
        assert_eq!(
            facts.get("context.externalId"),
            Some(&json!("reg_new_user_jp_001"))
        );
        assert_eq!(facts.get("context.tags.1"), Some(&json!("b")));
        assert_eq!(facts.get("context.missing"), None);
        assert_eq!(facts.get("nonexistent"), None);

        // 覆盖写入不改变插入顺序
        let names: Vec<&str> = facts.names().collect();
        assert_eq!(names, vec!["eventType", "context"]);
    }

    #[test]
    fn test_fact_graph_exact_name_wins_over_path() {
        let mut facts = FactGraph::new();
        facts.insert("context", json!({"externalId": "nested"}));
        facts.insert("context.externalId", "flat");

        assert_eq!(facts.get("context.externalId"), Some(&json!("flat")));
    }
}
