//! 共享库
//!
//! 包含积分引擎各组件共用的配置加载、可观测性初始化与重试策略。

pub mod config;
pub mod observability;
pub mod retry;

pub use config::{AppConfig, EngineConfig, ExpirationPolicyKind, MarketConfig};
pub use retry::{RetryPolicy, retry_with_policy};
