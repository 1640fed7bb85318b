//! 活动叠加
//!
//! 筛出对事件生效的活动，并把它们声明的规则 ID 交给规则匹配器，
//! 活动本身不绕过规则评估。

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{PointsError, Result};
use crate::markets::MarketProfile;
use crate::models::{Campaign, LoyaltyEvent};

/// 活动目录（只读）
#[derive(Debug, Clone, Default)]
pub struct CampaignOverlay {
    campaigns: Vec<Campaign>,
}

impl CampaignOverlay {
    pub fn new(campaigns: Vec<Campaign>) -> Self {
        Self { campaigns }
    }

    /// 从 JSON 数组文件加载；文件不存在时视为没有活动
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "活动文件不存在，使用空活动目录");
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path).map_err(|source| PointsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let campaigns: Vec<Campaign> = serde_json::from_str(&json)?;
        info!(count = campaigns.len(), "活动目录加载完成");
        Ok(Self::new(campaigns))
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }

    /// 对事件生效的活动，按 priority 升序（数值小的先考虑）
    pub fn applicable_campaigns(
        &self,
        event: &LoyaltyEvent,
        market: &MarketProfile,
    ) -> Vec<&Campaign> {
        let event_date = market.local_date(event.timestamp);
        let product_line = event.resolved_product_line();

        let mut applicable: Vec<&Campaign> = self
            .campaigns
            .iter()
            .filter(|c| c.is_active)
            .filter(|c| c.covers(event_date))
            .filter(|c| c.matches_scope(&event.market, &event.channel, product_line))
            .collect();

        // 稳定排序，同优先级保持文件顺序
        applicable.sort_by_key(|c| c.priority);
        applicable
    }

    /// 适用活动声明的全部规则 ID
    pub fn eligible_rule_ids(campaigns: &[&Campaign]) -> HashSet<String> {
        campaigns
            .iter()
            .flat_map(|c| c.rule_ids.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::MarketRegistry;
    use crate::models::EventType;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn campaign(id: &str, priority: i32, start: (u32, u32), end: (u32, u32)) -> Campaign {
        Campaign {
            campaign_id: id.to_string(),
            campaign_code: format!("{}_CODE", id),
            market: "HK".to_string(),
            channel: "LINE".to_string(),
            product_line: "PREMIUM_SERIES".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, start.0, start.1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, end.0, end.1).unwrap(),
            rule_ids: vec![format!("{}_RULE", id)],
            is_active: true,
            priority,
        }
    }

    fn event(month: u32, day: u32) -> LoyaltyEvent {
        LoyaltyEvent::new(
            "evt",
            EventType::Purchase,
            Utc.with_ymd_and_hms(2025, month, day, 14, 0, 0).unwrap(),
            "HK",
            "c-1",
        )
        .with_channel("LINE")
        .with_product_line("PREMIUM_SERIES")
    }

    fn hk() -> MarketProfile {
        MarketRegistry::builtin().unwrap().get("HK").unwrap().clone()
    }

    #[test]
    fn test_sorted_by_priority_ascending() {
        let overlay = CampaignOverlay::new(vec![
            campaign("LOW", 5, (6, 1), (7, 15)),
            campaign("HIGH", 1, (6, 1), (7, 15)),
            campaign("MID", 3, (6, 1), (7, 15)),
        ]);

        let ids: Vec<&str> = overlay
            .applicable_campaigns(&event(6, 15), &hk())
            .iter()
            .map(|c| c.campaign_id.as_str())
            .collect();
        assert_eq!(ids, vec!["HIGH", "MID", "LOW"]);
    }

    #[test]
    fn test_inactive_and_out_of_window_excluded() {
        let mut inactive = campaign("OFF", 1, (6, 1), (7, 15));
        inactive.is_active = false;
        let overlay = CampaignOverlay::new(vec![
            inactive,
            campaign("SPRING", 1, (3, 1), (5, 31)),
            campaign("SUMMER", 2, (6, 1), (7, 15)),
        ]);

        let applicable = overlay.applicable_campaigns(&event(6, 15), &hk());
        assert_eq!(applicable.len(), 1);
        assert_eq!(applicable[0].campaign_id, "SUMMER");

        assert!(overlay.applicable_campaigns(&event(8, 1), &hk()).is_empty());
    }

    #[test]
    fn test_scope_mismatch_excluded() {
        let overlay = CampaignOverlay::new(vec![campaign("SUMMER", 1, (6, 1), (7, 15))]);
        let web_event = event(6, 15).with_channel("WEB");
        assert!(overlay.applicable_campaigns(&web_event, &hk()).is_empty());
    }

    #[test]
    fn test_eligible_rule_ids() {
        let a = campaign("A", 1, (6, 1), (7, 15));
        let b = campaign("B", 2, (6, 1), (7, 15));
        let ids = CampaignOverlay::eligible_rule_ids(&[&a, &b]);
        assert!(ids.contains("A_RULE"));
        assert!(ids.contains("B_RULE"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let overlay = CampaignOverlay::load_from_file(dir.path().join("none.json")).unwrap();
        assert!(overlay.is_empty());
    }
}
