//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存与同步流程的指标收集功能。

use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 指标收集器
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 缓存操作统计
    /// key: "backend:result"
    pub cache_requests: Arc<Mutex<BTreeMap<String, u64>>>,
    /// 批次实体统计
    /// key: "pass:outcome"
    pub pass_entities: Arc<Mutex<BTreeMap<String, u64>>>,
    /// 操作耗时（累积秒数和次数）
    pub operation_duration: Arc<Mutex<BTreeMap<String, (f64, u64)>>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

// 指标写入不应因其他线程panic而失败
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Metrics {
    /// 记录缓存操作
    ///
    /// # 参数
    ///
    /// * `backend` - 后端名称
    /// * `result` - hit / miss / compute / write / invalidate / corrupt
    pub fn record_cache(&self, backend: &str, result: &str) {
        let key = format!("{}:{}", backend, result);
        *lock(&self.cache_requests).entry(key).or_insert(0) += 1;
    }

    /// 记录一个批次的成功与失败数量
    pub fn record_pass(&self, pass: &str, succeeded: usize, failed: usize) {
        let mut map = lock(&self.pass_entities);
        *map.entry(format!("{}:success", pass)).or_insert(0) += succeeded as u64;
        *map.entry(format!("{}:failure", pass)).or_insert(0) += failed as u64;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, op: &str, duration_secs: f64) {
        let mut map = lock(&self.operation_duration);
        let entry = map.entry(op.to_string()).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 读取某个缓存计数
    pub fn cache_count(&self, backend: &str, result: &str) -> u64 {
        lock(&self.cache_requests)
            .get(&format!("{}:{}", backend, result))
            .copied()
            .unwrap_or(0)
    }
}

/// 将所有指标格式化为文本，用于监控系统采集
pub fn render_metrics() -> String {
    let metrics = &GLOBAL_METRICS;
    let mut output = String::new();

    for (k, v) in lock(&metrics.cache_requests).iter() {
        if let Some((backend, result)) = k.split_once(':') {
            output.push_str(&format!(
                "gamesync_cache_requests_total{{backend=\"{}\", result=\"{}\"}} {}\n",
                backend, result, v
            ));
        }
    }
    for (k, v) in lock(&metrics.pass_entities).iter() {
        if let Some((pass, outcome)) = k.split_once(':') {
            output.push_str(&format!(
                "gamesync_pass_entities_total{{pass=\"{}\", outcome=\"{}\"}} {}\n",
                pass, outcome, v
            ));
        }
    }
    for (k, (total, count)) in lock(&metrics.operation_duration).iter() {
        output.push_str(&format!(
            "gamesync_operation_duration_seconds_sum{{operation=\"{}\"}} {}\n",
            k, total
        ));
        output.push_str(&format!(
            "gamesync_operation_duration_seconds_count{{operation=\"{}\"}} {}\n",
            k, count
        ));
    }
    output
}
