//! CLI 模块
//!
//! 提供命令行接口，支持以下功能：
//!
//! - `process` - 处理事件文件并输出积分响应
//! - `summary` - 查询积分概览
//! - `check-redemption` / `check-recycling` - 兑换与回收预校验
//! - `catalog` - 规则目录统计
//!
//! # 使用示例
//!
//! ```bash
//! points-engine process --events data/events.json --save ledger.json
//! points-engine summary --consumer c-hk-vip
//! points-engine check-redemption --consumer c-hk-vip --points 600
//! points-engine check-recycling --consumer c-jp-001 -n 3
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
