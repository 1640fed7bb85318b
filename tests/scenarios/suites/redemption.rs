//! 兑换测试套件
//!
//! c-jp-001 的可用积分为 500。

use crate::setup::*;

#[cfg(test)]
mod redemption_tests {
    use super::*;

    /// 兑换 600 超出可用余额
    #[tokio::test]
    async fn test_redemption_check_insufficient() {
        let env = ScenarioEnv::setup();
        let check = env
            .engine
            .query
            .validate_redemption("c-jp-001", 600)
            .await
            .unwrap();

        assert!(!check.valid);
        assert_eq!(check.remaining_after_redemption, -100);
        assert!(check.message.contains("insufficient points"));
    }

    /// 余额不足的兑换事件被拒绝，账本不变
    #[tokio::test]
    async fn test_redemption_event_rejected_without_mutation() {
        let env = ScenarioEnv::setup();
        let before = env.engine.ledger_snapshot();

        let response = env.process(&jp_redemption("evt-jp-r1", "c-jp-001", 600)).await;

        assert!(response.is_rejected());
        assert!(response.errors[0].starts_with("INSUFFICIENT_BALANCE"));
        assert!(response.point_breakdown.is_empty());
        assert_eq!(response.total_points_awarded, 0);
        assert_eq!(response.resulting_balance.available, 500);
        assert_eq!(response.resulting_balance.account_version, 4);
        assert_eq!(env.engine.ledger_snapshot(), before);
    }

    /// 全额兑换：可用转为已用，总额不变
    #[tokio::test]
    async fn test_redeem_full_available_balance() {
        let env = ScenarioEnv::setup();
        let check = env
            .engine
            .query
            .validate_redemption("c-jp-001", 500)
            .await
            .unwrap();
        assert!(check.valid);
        assert_eq!(check.remaining_after_redemption, 0);

        let response = env.process(&jp_redemption("evt-jp-r2", "c-jp-001", 500)).await;

        assert!(response.errors.is_empty());
        assert_consistent(&response);
        assert_eq!(response.total_points_awarded, -500);
        assert_eq!(response.point_breakdown[0].rule_id, "REDEMPTION");
        let balance = response.resulting_balance;
        assert_eq!(balance.total, 800);
        assert_eq!(balance.available, 0);
        assert_eq!(balance.used, 800);
        assert_eq!(balance.account_version, 5);
    }

    /// 未知消费者的兑换检查返回无效而不是错误
    #[tokio::test]
    async fn test_redemption_check_unknown_consumer() {
        let env = ScenarioEnv::setup();
        let check = env
            .engine
            .query
            .validate_redemption("c-nobody", 10)
            .await
            .unwrap();

        assert!(!check.valid);
        assert!(check.message.contains("does not exist"));
    }
}
