//! 账本一致性测试套件

use crate::setup::*;
use chrono::NaiveDate;
use points_engine::cli::CommandRunner;
use points_engine::models::{EventType, LoyaltyEvent};

#[cfg(test)]
mod ledger_tests {
    use super::*;

    /// 同一事件提交两次会入账两次，版本连续递增
    #[tokio::test]
    async fn test_duplicate_submission_is_not_idempotent() {
        let env = ScenarioEnv::setup();
        let event = jp_line_registry("evt-jp-dup", "c-jp-001");

        let first = env.process(&event).await;
        let second = env.process(&event).await;

        assert_eq!(first.resulting_balance.account_version, 5);
        assert_eq!(second.resulting_balance.account_version, 6);
        assert_eq!(second.resulting_balance.total, 1100);

        let history = env
            .engine
            .query
            .transaction_history("c-jp-001", 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_id, "evt-jp-dup");
        assert_eq!(history[1].event_id, "evt-jp-dup");
        assert_ne!(history[0].transaction_id, history[1].transaction_id);
    }

    /// 处理 data/events.json 中的示例事件
    #[tokio::test]
    async fn test_sample_events_file() {
        let env = ScenarioEnv::setup();
        let json = std::fs::read_to_string(data_dir().join("events.json")).unwrap();
        let events: Vec<LoyaltyEvent> = serde_json::from_str(&json).unwrap();

        let runner = CommandRunner::new(env.engine);
        let responses = runner.process_all(&events).await.unwrap();

        assert_eq!(responses.len(), events.len());
        for response in &responses {
            assert_consistent(response);
        }

        let rejected: Vec<&str> = responses
            .iter()
            .filter(|r| r.is_rejected())
            .map(|r| r.event_id.as_str())
            .collect();
        // 互动入账 150 后可用 650，兑换 600 通过；回收超出年度上限
        assert_eq!(rejected, vec!["evt-jp-0003"]);
    }

    /// 注册后积分概览使用注册日作为过期锚点
    #[tokio::test]
    async fn test_summary_after_registration() {
        let env = ScenarioEnv::setup();
        let registration = LoyaltyEvent::new(
            "evt-tw-reg",
            EventType::Registration,
            utc(2025, 10, 2, 0, 0),
            "TW",
            "c-tw-new",
        );
        env.process(&registration).await;

        let summary = env
            .engine
            .query
            .point_summary("c-tw-new", utc(2025, 10, 3, 0, 0))
            .await
            .unwrap();

        assert_eq!(summary.market, "TW");
        assert_eq!(summary.tier, "STANDARD");
        assert_eq!(summary.balance.total, 100);
        assert_eq!(
            summary.expiration.next_expiration,
            NaiveDate::from_ymd_opt(2027, 10, 2)
        );
        // 尚无首单，周年策略退回按月滚动
        assert_eq!(summary.expiration.expiration_rule, "ROLLING_24_MONTHS");
    }
}
