//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过导出器自带的 HTTP 监听端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    pub addr: SocketAddr,
}

/// 初始化 Prometheus 指标导出
///
/// 在指定端口启动导出器内置的 HTTP 监听器；需要在 tokio 运行时内调用。
pub fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_common_metrics(&config.service_name);
    info!("Metrics exporter listening on {}", addr);

    Ok(MetricsHandle { addr })
}

/// 注册业务指标描述（出现在 HELP 注释中）
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("events_processed_total", "Total number of processed events");
    metrics::describe_histogram!(
        "event_processing_duration_seconds",
        "Event processing duration in seconds"
    );

    metrics::describe_counter!("points_awarded_total", "Total points awarded (net)");

    metrics::describe_counter!("rule_evaluations_total", "Total number of rule evaluations");
    metrics::describe_histogram!(
        "rule_evaluation_duration_seconds",
        "Rule evaluation duration in seconds"
    );

    metrics::describe_counter!(
        "validation_rejections_total",
        "Total number of events rejected by validation"
    );
    metrics::describe_counter!(
        "ledger_version_conflicts_total",
        "Total number of balance version conflicts"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次事件处理
#[inline]
pub fn record_event_processed(event_type: &str, market: &str, outcome: &str, duration: Duration) {
    metrics::counter!(
        "events_processed_total",
        "event_type" => event_type.to_string(),
        "market" => market.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "event_processing_duration_seconds",
        "event_type" => event_type.to_string()
    )
    .record(duration.as_secs_f64());
}

/// 记录发放的积分
///
/// counter 只能递增，扣减部分单独按 direction 统计。
#[inline]
pub fn record_points_awarded(market: &str, points: i64) {
    let direction = if points >= 0 { "earn" } else { "deduct" };
    metrics::counter!(
        "points_awarded_total",
        "market" => market.to_string(),
        "direction" => direction
    )
    .increment(points.unsigned_abs());
}

/// 记录规则评估
#[inline]
pub fn record_rule_evaluation(matched: bool, duration: Duration) {
    metrics::counter!(
        "rule_evaluations_total",
        "matched" => matched.to_string()
    )
    .increment(1);

    metrics::histogram!("rule_evaluation_duration_seconds").record(duration.as_secs_f64());
}

/// 记录校验拒绝
#[inline]
pub fn record_validation_rejection(event_type: &str, reason_code: &str) {
    metrics::counter!(
        "validation_rejections_total",
        "event_type" => event_type.to_string(),
        "reason" => reason_code.to_string()
    )
    .increment(1);
}

/// 记录余额版本冲突
#[inline]
pub fn record_version_conflict() {
    metrics::counter!("ledger_version_conflicts_total").increment(1);
}
