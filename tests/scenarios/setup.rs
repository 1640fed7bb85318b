//! 场景环境
//!
//! 每个测试独立装配一个引擎，存储互不共享。

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use loyalty_shared::AppConfig;
use points_engine::PointsEngine;
use points_engine::models::{EventType, LoyaltyEvent, PointsResponse};
use serde_json::json;

/// 仓库自带的数据目录
pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// 指向 data/ 的默认配置
pub fn scenario_config() -> AppConfig {
    let dir = data_dir();
    let mut config = AppConfig::default();
    config.engine.rules_dir = dir.join("rules");
    config.engine.campaigns_file = dir.join("campaigns.json");
    config.engine.consumers_file = dir.join("consumers.json");
    config
}

pub struct ScenarioEnv {
    pub engine: PointsEngine,
}

impl ScenarioEnv {
    pub fn setup() -> Self {
        let engine = PointsEngine::from_config(&scenario_config()).expect("装配积分引擎失败");
        Self { engine }
    }

    pub async fn process(&self, event: &LoyaltyEvent) -> PointsResponse {
        self.engine
            .processor
            .process(event)
            .await
            .expect("事件处理失败")
    }
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// 香港 LINE 渠道高端系列购买，2025-06-15 22:00 HKT
pub fn hk_premium_purchase(event_id: &str, consumer_id: &str) -> LoyaltyEvent {
    LoyaltyEvent::new(
        event_id,
        EventType::Purchase,
        utc(2025, 6, 15, 14, 0),
        "HK",
        consumer_id,
    )
    .with_channel("LINE")
    .with_product_line("PREMIUM_SERIES")
    .with_attribute("amount", 1000)
    .with_attribute("currency", "HKD")
}

/// 日本 LINE 账号注册互动
pub fn jp_line_registry(event_id: &str, consumer_id: &str) -> LoyaltyEvent {
    LoyaltyEvent::new(
        event_id,
        EventType::Interaction,
        utc(2025, 6, 15, 0, 0),
        "JP",
        consumer_id,
    )
    .with_channel("LINE")
    .with_context("externalId", "reg_new_user_jp_001")
}

pub fn jp_redemption(event_id: &str, consumer_id: &str, points: i64) -> LoyaltyEvent {
    LoyaltyEvent::new(
        event_id,
        EventType::Redemption,
        utc(2025, 6, 16, 1, 0),
        "JP",
        consumer_id,
    )
    .with_channel("STORE")
    .with_attribute("redemptionPoints", points)
}

pub fn jp_recycle(event_id: &str, consumer_id: &str, count: i64) -> LoyaltyEvent {
    LoyaltyEvent::new(
        event_id,
        EventType::Recycle,
        utc(2025, 6, 20, 2, 0),
        "JP",
        consumer_id,
    )
    .with_channel("STORE")
    .with_attribute("recycledCount", count)
}

/// 明细之和等于总积分，余额保持 total = available + used
pub fn assert_consistent(response: &PointsResponse) {
    let sum: i64 = response.point_breakdown.iter().map(|e| e.points).sum();
    assert_eq!(
        sum, response.total_points_awarded,
        "明细之和与总积分不一致: {}",
        json!(response.point_breakdown)
    );
    assert!(response.resulting_balance.is_consistent());
}
