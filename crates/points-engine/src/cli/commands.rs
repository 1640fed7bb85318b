//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// 积分引擎命令行工具
///
/// 使用 `--help` 查看各子命令的详细说明。
#[derive(Parser, Debug)]
#[command(name = "points-engine")]
#[command(version, about = "会员积分规则引擎")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// 配置目录，默认读取 CONFIG_DIR 环境变量或 ./config
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 按顺序处理事件文件（JSON 数组），输出每个事件的积分响应
    Process {
        /// 事件文件路径
        #[arg(short, long)]
        events: PathBuf,

        /// 处理结束后把账本快照写入文件
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// 查询积分概览（含过期信息）
    Summary {
        #[arg(short, long)]
        consumer: String,
    },

    /// 兑换预校验
    CheckRedemption {
        #[arg(short, long)]
        consumer: String,

        /// 兑换积分
        #[arg(short, long)]
        points: i64,
    },

    /// 回收预校验
    CheckRecycling {
        #[arg(short, long)]
        consumer: String,

        /// 回收件数
        #[arg(short = 'n', long)]
        count: i64,
    },

    /// 输出规则目录统计
    Catalog,
}
