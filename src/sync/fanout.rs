//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了有界并发扇出与计数汇聚。

use crate::error::{Result, SyncError};
use crate::metrics::GLOBAL_METRICS;
use futures::{FutureExt, Stream};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 单个实体失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 存储调用返回错误
    Persistence,
    /// 批次超时时仍未完成
    Timeout,
    /// 批次被取消
    Cancelled,
    /// 任务发生panic
    Panicked,
}

/// 单个实体的失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub key: String,
    pub error: String,
    pub kind: FailureKind,
}

/// 一个批次的汇总结果
///
/// 每个输入项恰好出现在 `successes` 或 `failures` 中的一处
#[derive(Debug, Clone)]
pub struct PassReport<T> {
    pub pass: &'static str,
    pub successes: Vec<T>,
    pub failures: Vec<EntityFailure>,
}

impl<T> PassReport<T> {
    pub fn succeeded(&self) -> usize {
        self.successes.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// 没有任何失败
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 批次的结果流
///
/// 每个成功的实体产出一项；所有任务结束（或被超时、取消终止）后流关闭一次。
/// 失败不会出现在流里，只出现在汇总结果中。
pub struct PassStream<T> {
    results: mpsc::UnboundedReceiver<T>,
    report: JoinHandle<PassReport<T>>,
    cancel: CancellationToken,
}

impl<T> PassStream<T> {
    /// 只取消本批次，不影响同一扇出执行器上的其他批次
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 下一个成功结果，流关闭后返回None
    pub async fn next(&mut self) -> Option<T> {
        self.results.recv().await
    }

    /// 等待批次结束并取得汇总结果
    ///
    /// 不要求先把流读完
    pub async fn report(self) -> Result<PassReport<T>> {
        self.report
            .await
            .map_err(|e| SyncError::Cancelled(format!("pass driver stopped: {}", e)))
    }
}

impl<T> Stream for PassStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().results.poll_recv(cx)
    }
}

type TaskOutcome<T> = (usize, std::result::Result<T, (FailureKind, String)>);

/// 有界并发扇出
///
/// 每个输入项一个任务，同时执行中的任务数不超过 `pool_size`。
/// 整个批次共享一个截止时间和一个取消令牌。每个批次使用执行器令牌的子令牌，
/// 执行器令牌被取消后执行器不再可用：之后启动的批次会立即以 `Cancelled` 结束。
#[derive(Debug, Clone)]
pub struct FanOut {
    permits: Arc<Semaphore>,
    pool_size: usize,
    pass_timeout: Duration,
    cancel: CancellationToken,
}

impl FanOut {
    /// 创建扇出执行器
    ///
    /// # 参数
    ///
    /// * `pool_size` - 同时执行的最大任务数
    /// * `pass_timeout` - 单个批次的最长执行时间
    pub fn new(pool_size: usize, pass_timeout: Duration) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(pool_size)),
            pool_size,
            pass_timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn pass_timeout(&self) -> Duration {
        self.pass_timeout
    }

    /// 取消令牌，取消后所有进行中的批次立即结束
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 启动一个批次
    ///
    /// # 参数
    ///
    /// * `pass` - 批次名称，用于日志和指标
    /// * `items` - 输入项
    /// * `key_of` - 失败记录中使用的实体键
    /// * `op` - 对单个输入项执行的操作
    pub fn run<I, T, K, F, Fut>(
        &self,
        pass: &'static str,
        items: Vec<I>,
        key_of: K,
        op: F,
    ) -> PassStream<T>
    where
        I: Send + 'static,
        T: Clone + Send + 'static,
        K: Fn(&I) -> String,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tasks: JoinSet<TaskOutcome<T>> = JoinSet::new();
        let mut pending: Vec<Option<String>> = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            pending.push(Some(key_of(&item)));
            let permits = self.permits.clone();
            let fut = op(item);

            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (index, Err((FailureKind::Cancelled, e.to_string()))),
                };

                let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(SyncError::Timeout(msg))) => Err((FailureKind::Timeout, msg)),
                    Ok(Err(e)) => Err((FailureKind::Persistence, e.to_string())),
                    Err(panic) => Err((FailureKind::Panicked, panic_message(panic))),
                };
                (index, outcome)
            });
        }

        let deadline = tokio::time::Instant::now() + self.pass_timeout;
        let cancel = self.cancel.child_token();
        let report = tokio::spawn(drive(pass, tasks, pending, tx, deadline, cancel.clone()));

        PassStream {
            results: rx,
            report,
            cancel,
        }
    }
}

// 汇聚端：无论任务成功、失败、panic还是被终止，都会从 pending 中移除并计数，
// 返回时 tx 被丢弃，结果流随之关闭
async fn drive<T: Clone + Send + 'static>(
    pass: &'static str,
    mut tasks: JoinSet<TaskOutcome<T>>,
    mut pending: Vec<Option<String>>,
    tx: mpsc::UnboundedSender<T>,
    deadline: tokio::time::Instant,
    cancel: CancellationToken,
) -> PassReport<T> {
    let started = Instant::now();
    let total = pending.len();
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    let mut leftover = FailureKind::Cancelled;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Pass {} cancelled with {} tasks outstanding", pass, tasks.len());
                tasks.abort_all();
                break;
            }
            joined = tokio::time::timeout_at(deadline, tasks.join_next()) => match joined {
                Err(_) => {
                    error!("Pass {} timed out with {} tasks outstanding", pass, tasks.len());
                    tasks.abort_all();
                    leftover = FailureKind::Timeout;
                    break;
                }
                Ok(None) => break,
                Ok(Some(Ok((index, outcome)))) => {
                    let key = pending
                        .get_mut(index)
                        .and_then(Option::take)
                        .unwrap_or_default();
                    match outcome {
                        Ok(value) => {
                            // 接收端可能已被丢弃，汇总结果仍然完整
                            let _ = tx.send(value.clone());
                            successes.push(value);
                        }
                        Err((kind, error)) => {
                            warn!("Pass {} entity failed: key={}, kind={:?}, error={}", pass, key, kind, error);
                            failures.push(EntityFailure { key, error, kind });
                        }
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!("Pass {} task stopped abnormally: {}", pass, e);
                }
            }
        }
    }

    for key in pending.into_iter().flatten() {
        let error = match leftover {
            FailureKind::Timeout => "pass deadline exceeded".to_string(),
            _ => "pass cancelled".to_string(),
        };
        failures.push(EntityFailure {
            key,
            error,
            kind: leftover,
        });
    }
    drop(tx);

    GLOBAL_METRICS.record_pass(pass, successes.len(), failures.len());
    GLOBAL_METRICS.record_duration(pass, started.elapsed().as_secs_f64());
    info!(
        "Pass {} finished: total={}, succeeded={}, failed={}",
        pass,
        total,
        successes.len(),
        failures.len()
    );

    PassReport {
        pass,
        successes,
        failures,
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
