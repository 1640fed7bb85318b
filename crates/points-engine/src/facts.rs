//! 事实解析
//!
//! `(事件, 消费者状态) -> FactGraph` 的纯函数，不修改任何输入。
//! 历史派生事实各自扫描一次流水，单个消费者的流水量很小。

use rule_engine::FactGraph;
use serde_json::{Value, json};

use crate::markets::MarketProfile;
use crate::models::{Campaign, ConsumerProfile, EventType, LedgerRecord, LoyaltyEvent};

/// 事件评估所需的消费者快照
#[derive(Debug, Clone, Copy)]
pub struct ConsumerSnapshot<'a> {
    pub profile: Option<&'a ConsumerProfile>,
    pub ledger: &'a LedgerRecord,
}

/// 事实解析器
pub struct FactResolver;

impl FactResolver {
    pub fn resolve(
        event: &LoyaltyEvent,
        consumer: ConsumerSnapshot<'_>,
        market: &MarketProfile,
        campaigns: &[&Campaign],
    ) -> FactGraph {
        let mut facts = FactGraph::new();
        let event_date = market.local_date(event.timestamp);

        // 事件直接字段
        facts.insert("eventId", event.event_id.as_str());
        facts.insert("eventType", event.event_type.as_str());
        facts.insert("market", event.market.as_str());
        facts.insert("channel", event.channel.as_str());
        facts.insert("consumerId", event.consumer_id.as_str());
        facts.insert("timestamp", event.timestamp.to_rfc3339());
        facts.insert("eventDate", event_date.format("%Y-%m-%d").to_string());
        facts.insert_opt("productLine", event.resolved_product_line());
        facts.insert("context", Value::Object(event.context.clone()));
        facts.insert("attributes", Value::Object(event.attributes.clone()));

        // 属性同时作为顶层事实，不覆盖上面的核心事实
        for (key, value) in &event.attributes {
            if !facts.contains(key) {
                facts.insert(key.as_str(), value.clone());
            }
        }
        facts.insert_opt("baseAmount", event.attribute_f64("amount"));

        // 消费者历史派生事实
        let ledger = consumer.ledger;
        let purchase_count = ledger.purchases().count();
        facts.insert("purchaseCount", purchase_count);
        facts.insert("isFirstPurchase", is_first_purchase(event, ledger));

        if let Some(first) = ledger.purchases().map(|t| t.timestamp).min() {
            let first_date = market.local_date(first);
            facts.insert("firstPurchaseDate", first_date.format("%Y-%m-%d").to_string());
            facts.insert(
                "daysSinceFirstPurchase",
                (event_date - first_date).num_days(),
            );
        }

        if let Some(profile) = consumer.profile {
            facts.insert("tier", profile.tier.as_str());
            facts.insert_opt(
                "registrationDate",
                profile
                    .registration_date
                    .map(|d| d.format("%Y-%m-%d").to_string()),
            );
        }
        facts.insert("availablePoints", ledger.balance.available);

        // 活动叠加
        let codes: Vec<&str> = campaigns.iter().map(|c| c.campaign_code.as_str()).collect();
        let rule_ids: Vec<&str> = campaigns
            .iter()
            .flat_map(|c| c.rule_ids.iter().map(String::as_str))
            .collect();
        facts.insert("campaignCodes", json!(codes));
        facts.insert("campaignRuleIds", json!(rule_ids));

        facts
    }
}

/// 本次购买之前没有任何购买记录
fn is_first_purchase(event: &LoyaltyEvent, ledger: &LedgerRecord) -> bool {
    event.event_type == EventType::Purchase && ledger.purchases().next().is_none()
}
