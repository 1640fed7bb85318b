//! 积分规则引擎
//!
//! 提供可复用的规则评估能力，支持：
//! - 按分类加载 JSON 规则文件
//! - 规则结构校验与事实预提取
//! - 嵌套 all / any 条件树，组内短路求值
//! - 市场 / 渠道 / 产品线作用域预过滤

pub mod catalog;
pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod models;
pub mod operators;

pub use catalog::{RuleCatalog, RuleCatalogStats};
pub use compiler::{CompiledRule, RuleCompiler};
pub use error::{Result, RuleError};
pub use evaluator::{ConditionEvaluator, parse_datetime};
pub use matcher::{MatchFailure, MatchOutcome, MatchScope, RuleMatch, RuleMatcher};
pub use models::{
    Condition, ConditionNode, EvaluationResult, FactGraph, Rule, RuleCategory, RuleEvent,
    SCOPE_ALL, scope_matches,
};
pub use operators::{Combinator, Operator};
