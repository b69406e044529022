//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志与链路追踪的初始化。

use crate::error::{Result, SyncError};
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// 默认日志过滤规则
pub const DEFAULT_FILTER: &str = "gamesync=info";

/// 初始化日志与 OpenTelemetry Tracing
///
/// 应在进程启动时调用一次。`RUST_LOG` 存在时优先于 `filter`。
///
/// # 参数
///
/// * `service_name` - 服务名称，作为 tracer 名称
/// * `filter` - 默认日志过滤规则
pub fn init_tracing(service_name: &str, filter: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|e| SyncError::Config(format!("invalid log filter '{}': {}", filter, e)))?;

    // 未配置导出器时 span 只在进程内流转
    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .map_err(|e| SyncError::Config(format!("tracing already initialised: {}", e)))
}

/// 关闭全局 tracer provider
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}
