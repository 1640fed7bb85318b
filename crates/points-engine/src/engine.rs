//! 引擎装配
//!
//! 从配置构建规则目录、处理器表、活动目录与存储，并组合出
//! 事件处理器与查询服务。两者共享同一份存储。

use std::sync::Arc;

use loyalty_shared::AppConfig;
use rule_engine::RuleCatalog;
use tracing::info;

use crate::calculator::HandlerTable;
use crate::error::Result;
use crate::markets::MarketRegistry;
use crate::models::{ConsumerSeed, LedgerRecord};
use crate::overlay::CampaignOverlay;
use crate::processor::EventProcessor;
use crate::query::PointsQueryService;
use crate::store::MemoryStore;
use crate::store::memory::{load_seed_file, seeded_stores};

/// 已装配的积分引擎
pub struct PointsEngine {
    pub processor: EventProcessor,
    pub query: PointsQueryService,
    ledgers: Arc<MemoryStore<LedgerRecord>>,
}

impl PointsEngine {
    /// 按配置加载规则、活动与种子消费者
    ///
    /// 规则目录加载失败或任一规则没有对应处理器时整体失败。
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let engine = &config.engine;
        let catalog = RuleCatalog::load_from_dir(&engine.rules_dir)?;
        let overlay = CampaignOverlay::load_from_file(&engine.campaigns_file)?;
        let markets = MarketRegistry::from_config(config)?;

        let seeds = if engine.consumers_file.exists() {
            load_seed_file(&engine.consumers_file)?
        } else {
            Vec::new()
        };

        let built = Self::from_parts(catalog, overlay, markets, &seeds)?;
        Ok(Self {
            processor: built.processor.with_rule_trace(engine.trace_rules),
            ..built
        })
    }

    /// 由已加载的组件装配，存储为内存实现
    pub fn from_parts(
        catalog: RuleCatalog,
        overlay: CampaignOverlay,
        markets: MarketRegistry,
        seeds: &[ConsumerSeed],
    ) -> Result<Self> {
        let handlers = HandlerTable::build(&catalog)?;
        let (consumers, ledgers) = seeded_stores(seeds);
        let consumers = Arc::new(consumers);
        let ledgers = Arc::new(ledgers);
        let markets = Arc::new(markets);

        info!(
            rules = catalog.len(),
            handlers = handlers.len(),
            campaigns = overlay.len(),
            consumers = seeds.len(),
            "积分引擎装配完成"
        );

        let processor = EventProcessor::new(
            Arc::new(catalog),
            Arc::new(handlers),
            Arc::new(overlay),
            Arc::clone(&markets),
            consumers.clone(),
            ledgers.clone(),
        );
        let query = PointsQueryService::new(markets, consumers, ledgers.clone());

        Ok(Self {
            processor,
            query,
            ledgers,
        })
    }

    /// 全部账本的快照，按 consumer_id 排序
    pub fn ledger_snapshot(&self) -> Vec<LedgerRecord> {
        let mut records = self.ledgers.list();
        records.sort_by(|a, b| a.consumer_id.cmp(&b.consumer_id));
        records
    }
}
