//! 积分引擎场景测试
//!
//! 使用仓库 data/ 下的规则、活动与种子消费者，覆盖：
//! - 活动叠加（香港 LINE 渠道夏季活动）
//! - 互动类积分（日本 LINE 注册）
//! - 兑换余额不足
//! - 回收年度上限
//! - 账本一致性与重复提交

pub mod setup;
pub mod suites;

pub use setup::ScenarioEnv;
