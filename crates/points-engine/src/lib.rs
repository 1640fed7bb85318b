//! 积分引擎
//!
//! 根据声明式规则为消费者事件计算积分并更新账本。
//!
//! ## 处理流程
//!
//! 校验 -> 事实解析 -> 规则匹配（含活动叠加） -> 积分计算 -> 账本提交 -> 响应
//!
//! ## 模块结构
//!
//! - `models`: 事件、消费者、余额、活动与响应模型
//! - `facts`: 事件与消费者状态到事实图的解析
//! - `overlay`: 活动叠加
//! - `calculator`: 规则处理器表与积分计算
//! - `ledger`: 带版本的余额账本
//! - `store`: 存储抽象与内存实现
//! - `validation`: 事件校验门
//! - `expiration`: 积分过期策略
//! - `processor`: 事件处理器
//! - `query`: 积分概览与预校验
//! - `engine`: 组件装配
//! - `cli`: 命令行接口

pub mod calculator;
pub mod cli;
pub mod engine;
pub mod error;
pub mod expiration;
pub mod facts;
pub mod ledger;
pub mod markets;
pub mod models;
pub mod overlay;
pub mod processor;
pub mod query;
pub mod store;
pub mod validation;

pub use calculator::{Calculation, HandlerTable, PointsCalculator, PointsHandler};
pub use engine::PointsEngine;
pub use error::{PointsError, Result};
pub use expiration::{ExpirationInput, expiration_details};
pub use facts::{ConsumerSnapshot, FactResolver};
pub use ledger::{BalanceLedger, Posting, PostingKind};
pub use markets::{MarketProfile, MarketRegistry};
pub use overlay::CampaignOverlay;
pub use processor::EventProcessor;
pub use query::PointsQueryService;
pub use store::{ConsumerStore, MemoryStore, VersionedStore};
pub use validation::{Rejection, RejectionKind, ValidationGate, ValidationOutcome};
