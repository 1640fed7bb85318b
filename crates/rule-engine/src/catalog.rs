//! 规则目录
//!
//! 按分类文件加载规则，进程启动时加载一次，之后只读共享。
//! 遍历顺序固定为 `RuleCategory::ORDERED`，分类内按 priority 降序，同优先级保持文件中的顺序。

use crate::compiler::{CompiledRule, RuleCompiler};
use crate::error::{Result, RuleError};
use crate::models::{Rule, RuleCategory};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, instrument};

/// 规则目录
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    by_category: HashMap<RuleCategory, Vec<CompiledRule>>,
    /// rule_id -> 分类
    index: HashMap<String, RuleCategory>,
    compile_version: u64,
}

impl RuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从目录加载全部分类文件
    ///
    /// 缺失的分类文件视为该分类没有规则；任一规则非法则整体加载失败。
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut catalog = Self::new();

        for category in RuleCategory::ORDERED {
            let path = dir.join(category.file_name());
            if !path.exists() {
                debug!(category = %category, path = %path.display(), "分类规则文件不存在，跳过");
                continue;
            }

            let json = std::fs::read_to_string(&path).map_err(|source| RuleError::Io {
                path: path.clone(),
                source,
            })?;
            catalog.load_category_json(category, &json)?;
        }

        info!(
            rules_count = catalog.len(),
            active_count = catalog.active_count(),
            "规则目录加载完成"
        );
        Ok(catalog)
    }

    /// 加载一个分类的 JSON 数组
    pub fn load_category_json(&mut self, category: RuleCategory, json: &str) -> Result<Vec<String>> {
        let rules: Vec<Rule> = serde_json::from_str(json)?;
        self.load_category(category, rules)
    }

    /// 加载一个分类的规则，返回加载的规则 ID
    pub fn load_category(&mut self, category: RuleCategory, rules: Vec<Rule>) -> Result<Vec<String>> {
        let mut compiler = RuleCompiler::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            let mut rule = compiler.compile(rule, category)?;
            if self.index.contains_key(rule.id())
                || compiled.iter().any(|r: &CompiledRule| r.id() == rule.id())
            {
                return Err(RuleError::DuplicateRule(rule.id().to_string()));
            }
            self.compile_version += 1;
            rule.compile_version = self.compile_version;
            compiled.push(rule);
        }

        let ids: Vec<String> = compiled.iter().map(|r| r.id().to_string()).collect();
        for id in &ids {
            self.index.insert(id.clone(), category);
        }
        let rules = self.by_category.entry(category).or_default();
        rules.extend(compiled);
        // 优先级高的先评估，同优先级保持加载顺序（稳定排序）
        rules.sort_by_key(|r| Reverse(r.rule.priority));

        debug!(category = %category, count = ids.len(), "分类规则已加载");
        Ok(ids)
    }

    /// 按固定分类顺序遍历全部规则，分类内按优先级降序
    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        RuleCategory::ORDERED
            .iter()
            .filter_map(|c| self.by_category.get(c))
            .flat_map(|rules| rules.iter())
    }

    /// 某分类下的规则
    pub fn category(&self, category: RuleCategory) -> &[CompiledRule] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, rule_id: &str) -> Option<&CompiledRule> {
        let category = self.index.get(rule_id)?;
        self.category(*category).iter().find(|r| r.id() == rule_id)
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.index.contains_key(rule_id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.iter().filter(|r| r.is_active()).count()
    }

    /// 获取规则目录统计信息
    pub fn stats(&self) -> RuleCatalogStats {
        let per_category = RuleCategory::ORDERED
            .iter()
            .map(|c| (*c, self.category(*c).len()))
            .collect();

        let distinct_facts: BTreeSet<&str> = self
            .iter()
            .flat_map(|r| r.required_facts.iter().map(String::as_str))
            .collect();

        RuleCatalogStats {
            rules_count: self.len(),
            active_count: self.active_count(),
            per_category,
            distinct_facts: distinct_facts.len(),
        }
    }
}

/// 规则目录统计信息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCatalogStats {
    pub rules_count: usize,
    pub active_count: usize,
    pub per_category: Vec<(RuleCategory, usize)>,
    /// 所有规则引用的不同事实数
    pub distinct_facts: usize,
}
