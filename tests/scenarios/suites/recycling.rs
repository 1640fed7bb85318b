//! 回收测试套件
//!
//! c-jp-recycler 在 2025 年已回收 10 件，日本年度上限 12 件，每件 50 积分。

use crate::setup::*;

#[cfg(test)]
mod recycling_tests {
    use super::*;

    /// 再回收 3 件超出年度上限
    #[tokio::test]
    async fn test_recycling_check_over_yearly_limit() {
        let env = ScenarioEnv::setup();
        let check = env
            .engine
            .query
            .validate_recycling("c-jp-recycler", 3, utc(2025, 6, 20, 2, 0))
            .await
            .unwrap();

        assert!(!check.valid);
        assert_eq!(check.remaining_quota, 2);
        assert!(check.message.contains("yearly recycling limit exceeded"));
    }

    /// 超限的回收事件在匹配前被拒绝
    #[tokio::test]
    async fn test_recycle_event_rejected() {
        let env = ScenarioEnv::setup();
        let response = env.process(&jp_recycle("evt-rc-1", "c-jp-recycler", 3)).await;

        assert!(response.is_rejected());
        assert!(response.errors[0].starts_with("RECYCLE_LIMIT_EXCEEDED"));
        assert!(response.point_breakdown.is_empty());
        assert_eq!(response.resulting_balance.total, 500);
        assert_eq!(response.resulting_balance.account_version, 2);
    }

    /// 用满剩余额度后不再允许回收
    #[tokio::test]
    async fn test_recycle_within_quota_then_exhausted() {
        let env = ScenarioEnv::setup();
        let response = env.process(&jp_recycle("evt-rc-2", "c-jp-recycler", 2)).await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_consistent(&response);
        assert_eq!(response.point_breakdown[0].rule_id, "RECYCLE");
        assert_eq!(response.total_points_awarded, 100);
        assert_eq!(response.resulting_balance.total, 600);
        assert_eq!(response.resulting_balance.account_version, 3);

        let check = env
            .engine
            .query
            .validate_recycling("c-jp-recycler", 1, utc(2025, 6, 21, 0, 0))
            .await
            .unwrap();
        assert!(!check.valid);
        assert_eq!(check.remaining_quota, 0);
    }

    /// 额度按日本本地自然年重置
    #[tokio::test]
    async fn test_quota_resets_in_local_new_year() {
        let env = ScenarioEnv::setup();

        // 2025-12-31 14:59 UTC 仍是日本 2025 年
        let check = env
            .engine
            .query
            .validate_recycling("c-jp-recycler", 3, utc(2025, 12, 31, 14, 59))
            .await
            .unwrap();
        assert!(!check.valid);

        // 2025-12-31 15:00 UTC = 2026-01-01 00:00 JST
        let check = env
            .engine
            .query
            .validate_recycling("c-jp-recycler", 3, utc(2025, 12, 31, 15, 0))
            .await
            .unwrap();
        assert!(check.valid);
        assert_eq!(check.remaining_quota, 12);
    }
}
