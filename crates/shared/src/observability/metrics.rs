//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集。
//! 记录器安装后可通过 [`render`] 获取文本快照，由宿主进程决定如何暴露。

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 安装 Prometheus 记录器
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle);

    register_common_metrics(&config.service_name);
    Ok(())
}

fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "referral_activations_total",
        "Total number of referral activation attempts"
    );
    metrics::describe_histogram!(
        "referral_activation_duration_seconds",
        "Referral activation duration in seconds"
    );
    metrics::describe_counter!(
        "referral_code_issuances_total",
        "Total number of personal code issuance calls"
    );
    metrics::describe_counter!(
        "referral_codes_issued_total",
        "Total number of personal codes created"
    );
    metrics::describe_counter!(
        "referral_code_collisions_total",
        "Generated personal codes rejected as duplicates"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 渲染当前指标快照，记录器未安装时返回 None
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// 记录一次激活尝试
///
/// `kind` 为 general / personal / none，`outcome` 为 activated 或拒绝原因
#[inline]
pub fn record_activation(kind: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "referral_activations_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "referral_activation_duration_seconds",
        "kind" => kind.to_string()
    )
    .record(duration_secs);
}

/// 记录一次个人码补发调用
#[inline]
pub fn record_code_issuance(outcome: &str, issued: u64) {
    metrics::counter!(
        "referral_code_issuances_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);

    if issued > 0 {
        metrics::counter!("referral_codes_issued_total").increment(issued);
    }
}

/// 记录一次生成碰撞
#[inline]
pub fn record_code_collision() {
    metrics::counter!("referral_code_collisions_total").increment(1);
}
