//! 活动叠加测试套件
//!
//! 香港 LINE 渠道 PREMIUM_SERIES 夏季活动（SUMMER25，2025-06-01 至 2025-07-15）
//! 声明了 FLEXIBLE_CAMPAIGN_BONUS 规则。

use crate::setup::*;
use points_engine::facts::{ConsumerSnapshot, FactResolver};
use points_engine::models::{ConsumerProfile, EventType, LedgerRecord, LoyaltyEvent};
use points_engine::{CampaignOverlay, HandlerTable, MarketRegistry, PointsCalculator};
use rule_engine::{MatchScope, RuleCatalog, RuleMatcher};
use serde_json::{Value, json};

#[cfg(test)]
mod campaign_overlay_tests {
    use super::*;

    /// 事实解析 + 匹配 + 计算链路中活动规则命中
    ///
    /// 不经过校验门，购买事件不带 skuList。
    #[test]
    fn test_flexible_campaign_bonus_matches() {
        let dir = data_dir();
        let catalog = RuleCatalog::load_from_dir(dir.join("rules")).unwrap();
        let overlay = CampaignOverlay::load_from_file(dir.join("campaigns.json")).unwrap();
        let markets = MarketRegistry::builtin().unwrap();
        let hk = markets.get("HK").unwrap();

        let event = hk_premium_purchase("evt-hk-a", "c-hk-vip");
        let campaigns = overlay.applicable_campaigns(&event, hk);
        assert_eq!(campaigns.len(), 1);
        assert_eq!(campaigns[0].campaign_code, "SUMMER25");

        let profile = ConsumerProfile::new("c-hk-vip", "HK").with_tier("VIP");
        let ledger = LedgerRecord::empty("c-hk-vip");
        let snapshot = ConsumerSnapshot {
            profile: Some(&profile),
            ledger: &ledger,
        };
        let facts = FactResolver::resolve(&event, snapshot, hk, &campaigns);

        let rule_ids = CampaignOverlay::eligible_rule_ids(&campaigns);
        let scope = MatchScope {
            market: &event.market,
            channel: &event.channel,
            product_line: event.resolved_product_line(),
            campaign_rule_ids: &rule_ids,
        };
        let outcome = RuleMatcher::new().match_rules(&catalog, &facts, &scope);
        assert!(outcome.failures.is_empty());
        assert!(
            outcome
                .matches
                .iter()
                .any(|m| m.rule_id == "FLEXIBLE_CAMPAIGN_BONUS")
        );

        let handlers = HandlerTable::build(&catalog).unwrap();
        let base = facts.get("baseAmount").and_then(Value::as_f64);
        let calc = PointsCalculator::new(&handlers).calculate(&outcome.matches, base);

        let campaign_entry = calc
            .breakdown
            .iter()
            .find(|e| e.rule_id == "FLEXIBLE_CAMPAIGN_BONUS")
            .expect("缺少活动明细");
        assert_eq!(campaign_entry.points, 300);
        // 1000 基础 + 200 首单 + 500 VIP + 1000 高端系列 + 300 活动
        assert_eq!(calc.total, 3000);
    }

    /// 完整处理链路：带 skuList 的购买写入账本
    #[tokio::test]
    async fn test_campaign_purchase_full_pipeline() {
        let env = ScenarioEnv::setup();
        let event = hk_premium_purchase("evt-hk-b", "c-hk-vip")
            .with_attribute("skuList", json!(["PS-SERUM-30ML"]));

        let response = env.process(&event).await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_consistent(&response);
        assert_eq!(response.total_points_awarded, 3000);
        let points_of = |rule_id: &str| {
            response
                .point_breakdown
                .iter()
                .find(|e| e.rule_id == rule_id)
                .map(|e| e.points)
        };
        assert_eq!(points_of("BASE_POINT"), Some(1000));
        assert_eq!(points_of("FIRST_PURCHASE_BONUS"), Some(200));
        assert_eq!(points_of("VIP_MULTIPLIER"), Some(500));
        assert_eq!(points_of("PRODUCT_MULTIPLIER"), Some(1000));
        assert_eq!(points_of("FLEXIBLE_CAMPAIGN_BONUS"), Some(300));
        assert_eq!(points_of("ORDER_MULTIPLE_POINT_LIMIT"), None);

        // 种子余额 500，版本 1
        assert_eq!(response.resulting_balance.total, 3500);
        assert_eq!(response.resulting_balance.available, 3500);
        assert_eq!(response.resulting_balance.account_version, 2);
    }

    /// 缺少 skuList 的购买在校验门被拒绝
    #[tokio::test]
    async fn test_purchase_without_sku_list_rejected() {
        let env = ScenarioEnv::setup();
        let response = env.process(&hk_premium_purchase("evt-hk-c", "c-hk-vip")).await;

        assert!(response.is_rejected());
        assert!(response.errors[0].starts_with("MISSING_FIELD"));
        assert!(response.errors[0].contains("skuList"));
        assert_eq!(response.total_points_awarded, 0);
        assert_eq!(response.resulting_balance.account_version, 1);
    }

    /// 活动结束次日（香港本地日期 2025-07-16）不再叠加
    #[tokio::test]
    async fn test_campaign_window_closed() {
        let env = ScenarioEnv::setup();
        // 2025-07-15 16:30 UTC = 2025-07-16 00:30 HKT
        let event = LoyaltyEvent::new(
            "evt-hk-d",
            EventType::Purchase,
            utc(2025, 7, 15, 16, 30),
            "HK",
            "c-hk-vip",
        )
        .with_channel("LINE")
        .with_product_line("PREMIUM_SERIES")
        .with_attribute("amount", 1000)
        .with_attribute("currency", "HKD")
        .with_attribute("skuList", json!(["PS-SERUM-30ML"]));

        let response = env.process(&event).await;

        assert_consistent(&response);
        assert!(
            response
                .point_breakdown
                .iter()
                .all(|e| e.rule_id != "FLEXIBLE_CAMPAIGN_BONUS")
        );
        assert_eq!(response.total_points_awarded, 2700);
    }

    /// 渠道不在活动范围内
    #[tokio::test]
    async fn test_campaign_channel_mismatch() {
        let env = ScenarioEnv::setup();
        let mut event = hk_premium_purchase("evt-hk-e", "c-hk-vip")
            .with_attribute("skuList", json!(["PS-SERUM-30ML"]));
        event.channel = "WEB".to_string();

        let response = env.process(&event).await;

        assert_consistent(&response);
        assert_eq!(response.total_points_awarded, 2700);
    }

    /// 注册后在台湾周年活动期间首次购买
    #[tokio::test]
    async fn test_registration_then_anniversary_purchase() {
        let env = ScenarioEnv::setup();

        let registration = LoyaltyEvent::new(
            "evt-tw-reg",
            EventType::Registration,
            utc(2025, 10, 2, 0, 0),
            "TW",
            "c-tw-new",
        )
        .with_channel("WEB");
        let response = env.process(&registration).await;
        assert_eq!(response.total_points_awarded, 100);
        assert_eq!(response.resulting_balance.account_version, 1);

        let purchase = LoyaltyEvent::new(
            "evt-tw-buy",
            EventType::Purchase,
            utc(2025, 10, 5, 6, 0),
            "TW",
            "c-tw-new",
        )
        .with_channel("STORE")
        .with_attribute("amount", 500)
        .with_attribute("currency", "TWD")
        .with_attribute("skuList", json!(["BASIC-TONER"]));
        let response = env.process(&purchase).await;

        assert_consistent(&response);
        // 500 基础 + 200 首单 + 88 周年活动
        assert_eq!(response.total_points_awarded, 788);
        assert_eq!(response.resulting_balance.total, 888);
        assert_eq!(response.resulting_balance.account_version, 2);
    }
}
