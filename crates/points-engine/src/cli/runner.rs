//! 命令执行器
//!
//! 负责执行各 CLI 子命令的具体逻辑，把结果以 JSON 输出到标准输出。

use std::fs;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use loyalty_shared::{RetryPolicy, retry_with_policy};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::engine::PointsEngine;
use crate::error::PointsError;
use crate::models::{LoyaltyEvent, PointsResponse};

/// 命令执行器
///
/// CLI 作为引擎的外部调用方，负责对版本冲突进行重试。
pub struct CommandRunner {
    engine: PointsEngine,
    retry: RetryPolicy,
}

impl CommandRunner {
    pub fn new(engine: PointsEngine) -> Self {
        Self {
            engine,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 执行 process 命令
    pub async fn run_process(&self, events_path: &Path, save: Option<&Path>) -> Result<()> {
        let events = read_events(events_path)?;
        info!(count = events.len(), path = %events_path.display(), "开始处理事件");

        let responses = self.process_all(&events).await?;
        let rejected = responses.iter().filter(|r| r.is_rejected()).count();
        info!(
            processed = responses.len(),
            rejected,
            "事件处理完成"
        );

        print_json(&responses)?;

        if let Some(path) = save {
            let snapshot = self.engine.ledger_snapshot();
            let json = serde_json::to_string_pretty(&snapshot)?;
            fs::write(path, json)
                .with_context(|| format!("写入账本快照失败: {}", path.display()))?;
            info!(path = %path.display(), ledgers = snapshot.len(), "账本快照已保存");
        }

        Ok(())
    }

    /// 依次处理事件，可重试的错误（版本冲突、存储失败）按策略重试
    pub async fn process_all(&self, events: &[LoyaltyEvent]) -> Result<Vec<PointsResponse>> {
        let mut responses = Vec::with_capacity(events.len());

        for event in events {
            let result = retry_with_policy(
                &self.retry,
                "process_event",
                PointsError::is_retryable,
                || self.engine.processor.process(event),
            )
            .await;

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    error!(
                        event_id = %event.event_id,
                        code = err.code(),
                        error = %err,
                        "事件处理失败"
                    );
                    return Err(anyhow::Error::new(err)
                        .context(format!("事件处理失败: {}", event.event_id)));
                }
            };

            if response.is_rejected() {
                warn!(event_id = %event.event_id, errors = ?response.errors, "事件被拒绝");
            }
            responses.push(response);
        }

        Ok(responses)
    }

    /// 执行 summary 命令
    pub async fn run_summary(&self, consumer_id: &str) -> Result<()> {
        let summary = self
            .engine
            .query
            .point_summary(consumer_id, Utc::now())
            .await
            .with_context(|| format!("查询积分概览失败: {}", consumer_id))?;
        print_json(&summary)
    }

    /// 执行 check-redemption 命令
    pub async fn run_check_redemption(&self, consumer_id: &str, points: i64) -> Result<()> {
        let check = self
            .engine
            .query
            .validate_redemption(consumer_id, points)
            .await?;
        print_json(&check)
    }

    /// 执行 check-recycling 命令
    pub async fn run_check_recycling(&self, consumer_id: &str, count: i64) -> Result<()> {
        let check = self
            .engine
            .query
            .validate_recycling(consumer_id, count, Utc::now())
            .await?;
        print_json(&check)
    }

    /// 执行 catalog 命令
    pub fn run_catalog(&self) -> Result<()> {
        print_json(&self.engine.processor.catalog().stats())
    }
}

fn read_events(path: &Path) -> Result<Vec<LoyaltyEvent>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("读取事件文件失败: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("事件文件格式错误: {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
