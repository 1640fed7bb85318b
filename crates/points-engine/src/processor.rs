//! 事件处理器
//!
//! 单个事件的完整处理流程：
//! 校验 -> 事实解析（含活动叠加） -> 规则匹配 -> 积分计算 -> 账本提交 -> 组装响应。
//!
//! 兑换、调整、回收三类事件直接由属性换算积分，不经过规则匹配。
//! 同一消费者的事件在 “读取 -> 计算 -> CAS” 窗口内串行执行；
//! CAS 失败以 `VersionConflict` 返回，由调用方决定是否重试。

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use loyalty_shared::observability::metrics;
use rule_engine::{MatchScope, RuleCatalog, RuleMatcher};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::calculator::{Calculation, HandlerTable, PointsCalculator};
use crate::error::{PointsError, Result};
use crate::facts::{ConsumerSnapshot, FactResolver};
use crate::ledger::{BalanceLedger, Posting, PostingKind};
use crate::markets::{MarketProfile, MarketRegistry};
use crate::models::{
    ConsumerProfile, EventType, LedgerRecord, LoyaltyEvent, PointBreakdownEntry, PointsResponse,
    TransactionRecord,
};
use crate::overlay::CampaignOverlay;
use crate::store::{ConsumerStore, VersionedStore};
use crate::validation::{ValidationGate, ValidationOutcome};

/// 事件处理器
///
/// 规则目录、处理器表、活动目录与市场参数在启动时构建，之后只读共享。
pub struct EventProcessor {
    catalog: Arc<RuleCatalog>,
    handlers: Arc<HandlerTable>,
    overlay: Arc<CampaignOverlay>,
    markets: Arc<MarketRegistry>,
    consumers: Arc<dyn ConsumerStore>,
    ledger: BalanceLedger,
    matcher: RuleMatcher,
    /// consumer_id -> 串行化锁，空闲条目在处理结束后移除
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl EventProcessor {
    pub fn new(
        catalog: Arc<RuleCatalog>,
        handlers: Arc<HandlerTable>,
        overlay: Arc<CampaignOverlay>,
        markets: Arc<MarketRegistry>,
        consumers: Arc<dyn ConsumerStore>,
        ledger_store: Arc<dyn VersionedStore>,
    ) -> Self {
        Self {
            catalog,
            handlers,
            overlay,
            markets,
            consumers,
            ledger: BalanceLedger::new(ledger_store),
            matcher: RuleMatcher::new(),
            locks: DashMap::new(),
        }
    }

    /// 开启规则评估追踪（debug 级别输出）
    pub fn with_rule_trace(mut self, enabled: bool) -> Self {
        self.matcher = self.matcher.with_trace_enabled(enabled);
        self
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// 处理一个事件
    ///
    /// 每次调用都会提交一次账本变更，重复提交同一事件不是幂等的。
    /// 校验失败返回带 `errors` 的响应且不修改余额；存储失败返回 `Err`。
    #[instrument(
        skip(self, event),
        fields(
            event_id = %event.event_id,
            consumer_id = %event.consumer_id,
            event_type = %event.event_type,
        )
    )]
    pub async fn process(&self, event: &LoyaltyEvent) -> Result<PointsResponse> {
        let lock = self.consumer_lock(&event.consumer_id);
        let result = {
            let _guard = lock.lock().await;
            self.process_locked(event).await
        };
        drop(lock);
        // 没有其他任务持有或等待时回收条目，锁表大小只与并发中的消费者数相关
        self.locks.remove_if(&event.consumer_id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    /// 持有消费者锁时执行的处理流程
    async fn process_locked(&self, event: &LoyaltyEvent) -> Result<PointsResponse> {
        let start = Instant::now();

        let profile = self.consumers.get(&event.consumer_id).await?;
        let current = self.ledger.load(&event.consumer_id).await?;

        let gate = ValidationGate::new(&self.markets);
        if let ValidationOutcome::Rejected(rejection) =
            gate.validate(event, profile.is_some(), &current)
        {
            info!(code = rejection.code, message = %rejection.message, "事件校验未通过");
            metrics::record_validation_rejection(event.event_type.as_str(), rejection.code);
            metrics::record_event_processed(
                event.event_type.as_str(),
                &event.market,
                "rejected",
                start.elapsed(),
            );
            return Ok(response(
                event,
                Vec::new(),
                vec![rejection.to_error_string()],
                &current,
            ));
        }

        let market = self.markets.get(&event.market).ok_or_else(|| {
            PointsError::Config(format!("市场未配置: {}", event.market))
        })?;

        let profile = match profile {
            None if event.event_type == EventType::Registration => {
                Some(self.register(event, market).await?)
            }
            other => other,
        };

        let calculation = if event.event_type.is_direct_delta() {
            direct_delta(event, market)
        } else {
            self.evaluate_rules(event, profile.as_ref(), &current, market)
        };

        let posting = Posting {
            kind: if event.event_type == EventType::Redemption {
                PostingKind::Redeem
            } else {
                PostingKind::Earn
            },
            points: calculation.total,
            transaction: transaction_record(event, calculation.total),
        };

        let committed = match self.ledger.apply(&current, posting).await {
            Ok(record) => record,
            Err(e) => {
                if matches!(e, PointsError::VersionConflict { .. }) {
                    metrics::record_version_conflict();
                }
                warn!(error = %e, "账本提交失败");
                metrics::record_event_processed(
                    event.event_type.as_str(),
                    &event.market,
                    "failed",
                    start.elapsed(),
                );
                return Err(e);
            }
        };

        let outcome = if calculation.errors.is_empty() {
            "processed"
        } else {
            "partial"
        };
        metrics::record_points_awarded(&event.market, calculation.total);
        metrics::record_event_processed(
            event.event_type.as_str(),
            &event.market,
            outcome,
            start.elapsed(),
        );

        info!(
            points = calculation.total,
            entries = calculation.breakdown.len(),
            errors = calculation.errors.len(),
            version = committed.version(),
            "事件处理完成"
        );

        Ok(response(
            event,
            calculation.breakdown,
            calculation.errors,
            &committed,
        ))
    }

    /// 注册事件为新消费者建档，注册日取事件的市场本地日期
    async fn register(
        &self,
        event: &LoyaltyEvent,
        market: &MarketProfile,
    ) -> Result<ConsumerProfile> {
        let profile = ConsumerProfile::new(&event.consumer_id, &market.code)
            .with_registration_date(market.local_date(event.timestamp));
        self.consumers.create(profile.clone()).await?;
        info!(market = %market.code, "新消费者已建档");
        Ok(profile)
    }

    fn evaluate_rules(
        &self,
        event: &LoyaltyEvent,
        profile: Option<&ConsumerProfile>,
        current: &LedgerRecord,
        market: &MarketProfile,
    ) -> Calculation {
        let campaigns = self.overlay.applicable_campaigns(event, market);
        let campaign_rule_ids = CampaignOverlay::eligible_rule_ids(&campaigns);

        let snapshot = ConsumerSnapshot {
            profile,
            ledger: current,
        };
        let facts = FactResolver::resolve(event, snapshot, market, &campaigns);

        let scope = MatchScope {
            market: &event.market,
            channel: &event.channel,
            product_line: event.resolved_product_line(),
            campaign_rule_ids: &campaign_rule_ids,
        };

        let eval_start = Instant::now();
        let outcome = self.matcher.match_rules(&self.catalog, &facts, &scope);
        metrics::record_rule_evaluation(!outcome.matches.is_empty(), eval_start.elapsed());

        let base_amount = facts.get("baseAmount").and_then(Value::as_f64);
        let mut calculation =
            PointsCalculator::new(&self.handlers).calculate(&outcome.matches, base_amount);

        let mut errors: Vec<String> = outcome
            .failures
            .iter()
            .map(|f| format!("rule {}: {}", f.rule_id, f.error))
            .collect();
        errors.append(&mut calculation.errors);
        calculation.errors = errors;

        calculation
    }

    fn consumer_lock(&self, consumer_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(consumer_id.to_string())
            .or_default()
            .clone()
    }
}

/// 兑换、调整、回收：单条明细，不经过规则匹配
fn direct_delta(event: &LoyaltyEvent, market: &MarketProfile) -> Calculation {
    let entry = match event.event_type {
        EventType::Redemption => {
            let points = event.attribute_i64("redemptionPoints").unwrap_or_default();
            PointBreakdownEntry::new("REDEMPTION", "points redemption", -points)
        }
        EventType::Adjustment => {
            let points = event.attribute_i64("adjustmentPoints").unwrap_or_default();
            let reason = event.attribute_str("reason").unwrap_or("manual adjustment");
            PointBreakdownEntry::new("ADJUSTMENT", reason, points)
        }
        EventType::Recycle => {
            let count = event.attribute_i64("recycledCount").unwrap_or_default();
            PointBreakdownEntry::new(
                "RECYCLE",
                format!("{} items recycled", count),
                count.saturating_mul(market.recycle_points_per_item),
            )
        }
        _ => return Calculation::default(),
    };

    Calculation {
        total: entry.points,
        breakdown: vec![entry],
        errors: Vec::new(),
    }
}

fn transaction_record(event: &LoyaltyEvent, points: i64) -> TransactionRecord {
    let amount = match event.event_type {
        EventType::Purchase => event.attribute_f64("amount"),
        _ => None,
    };
    let recycled = match event.event_type {
        EventType::Recycle => event.attribute_i64("recycledCount"),
        _ => None,
    };

    TransactionRecord::new(&event.event_id, event.event_type, event.timestamp, points)
        .with_amount(amount)
        .with_recycled_count(recycled)
}

fn response(
    event: &LoyaltyEvent,
    breakdown: Vec<PointBreakdownEntry>,
    errors: Vec<String>,
    ledger: &LedgerRecord,
) -> PointsResponse {
    PointsResponse {
        consumer_id: event.consumer_id.clone(),
        event_id: event.event_id.clone(),
        event_type: event.event_type,
        total_points_awarded: breakdown.iter().map(|e| e.points).sum(),
        point_breakdown: breakdown,
        errors,
        resulting_balance: ledger.balance,
    }
}
