//! 版本冲突重试
//!
//! 账本写入使用乐观并发控制，冲突时由调用方重新读取并重放事件。
//! 这里只提供退避策略和执行循环，哪些错误可重试由调用方决定。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

/// 重试策略
///
/// 对应配置中的 `[retry]` 段，时间单位为毫秒。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// 不含首次执行
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 10,
            max_delay_ms: 200,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 不重试，冲突直接返回
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// 第 `retry` 次重试前的等待时间（从 0 开始），不超过 `max_delay_ms`
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }
}

/// 按策略执行异步操作
///
/// `is_retryable` 返回 false 的错误立即返回，重试用尽后返回最后一次的错误。
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut run: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retries = 0u32;

    loop {
        let err = match run().await {
            Ok(value) => {
                if retries > 0 {
                    debug!(operation, retries, "重试后成功");
                }
                return Ok(value);
            }
            Err(err) if !is_retryable(&err) => return Err(err),
            Err(err) => err,
        };

        if retries >= policy.max_retries {
            warn!(operation, retries, error = %err, "重试次数用尽");
            return Err(err);
        }

        let delay = policy.backoff(retries);
        warn!(
            operation,
            retry = retries + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "写入冲突，退避后重试"
        );
        tokio::time::sleep(delay).await;
        retries += 1;
    }
}
