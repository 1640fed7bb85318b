//! 积分引擎错误类型
//!
//! 校验失败不是错误：它们以 `ValidationOutcome` 值的形式返回。
//! 这里只包含会中断事件处理的系统错误与配置错误。

use rule_engine::RuleError;
use thiserror::Error;

/// 积分引擎错误类型
#[derive(Debug, Error)]
pub enum PointsError {
    // === 消费者与账户 ===
    #[error("消费者不存在: {0}")]
    ConsumerNotFound(String),

    #[error("积分余额不足: 需要 {required}, 可用 {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("积分变动超出可表示范围: {points}")]
    BalanceOverflow { points: i64 },

    #[error("账户版本冲突: consumer_id={consumer_id}, 期望 {expected}, 实际 {actual}")]
    VersionConflict {
        consumer_id: String,
        expected: u64,
        actual: u64,
    },

    // === 规则与配置 ===
    #[error("规则无法映射到积分处理器: rule_id={rule_id}, event_type={event_type}")]
    UnknownHandler { rule_id: String, event_type: String },

    #[error("配置错误: {0}")]
    Config(String),

    #[error(transparent)]
    Rule(#[from] RuleError),

    // === 系统错误 ===
    #[error("存储错误: {0}")]
    Store(String),

    #[error("读取文件失败: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 积分引擎 Result 类型别名
pub type Result<T> = std::result::Result<T, PointsError>;

impl PointsError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. } | Self::Store(_))
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConsumerNotFound(_) => "CONSUMER_NOT_FOUND",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            Self::VersionConflict { .. } => "VERSION_CONFLICT",
            Self::UnknownHandler { .. } => "UNKNOWN_HANDLER",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Rule(_) => "RULE_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Io { .. } => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
