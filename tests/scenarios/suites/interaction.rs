//! 互动积分测试套件

use crate::setup::*;

#[cfg(test)]
mod interaction_tests {
    use super::*;

    /// 日本 LINE 注册互动获得 150 积分
    #[tokio::test]
    async fn test_line_registry_points() {
        let env = ScenarioEnv::setup();
        let response = env.process(&jp_line_registry("evt-jp-b", "c-jp-001")).await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_consistent(&response);
        assert_eq!(response.point_breakdown.len(), 1);
        assert_eq!(
            response.point_breakdown[0].rule_id,
            "INTERACTION_REGISTRY_POINT"
        );
        assert_eq!(response.total_points_awarded, 150);

        // 种子余额 800 / 500 / 300，版本 4
        let balance = response.resulting_balance;
        assert_eq!(balance.total, 950);
        assert_eq!(balance.available, 650);
        assert_eq!(balance.used, 300);
        assert_eq!(balance.account_version, 5);
    }

    /// 外部 ID 不含 reg 时不命中，但事件仍然入账
    #[tokio::test]
    async fn test_interaction_without_registry_marker() {
        let env = ScenarioEnv::setup();
        let mut event = jp_line_registry("evt-jp-c", "c-jp-001");
        event
            .context
            .insert("externalId".to_string(), "follow_official_account".into());

        let response = env.process(&event).await;

        assert!(response.errors.is_empty());
        assert!(response.point_breakdown.is_empty());
        assert_eq!(response.total_points_awarded, 0);
        assert_eq!(response.resulting_balance.total, 800);
        assert_eq!(response.resulting_balance.account_version, 5);
    }

    /// 未知消费者的互动被拒绝
    #[tokio::test]
    async fn test_interaction_unknown_consumer() {
        let env = ScenarioEnv::setup();
        let response = env.process(&jp_line_registry("evt-jp-d", "c-nobody")).await;

        assert!(response.is_rejected());
        assert!(response.errors[0].starts_with("CONSUMER_NOT_FOUND"));
        assert_eq!(response.resulting_balance.account_version, 0);
    }
}
