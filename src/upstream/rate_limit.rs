//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块实现了访问上游接口时的令牌桶限流。

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// 令牌桶状态
#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// 令牌桶限流器
///
/// 令牌不足时 `acquire` 会等待，而不是拒绝请求
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<BucketState>,
    capacity: f64,
    /// 每秒补充的令牌数
    refill_rate: f64,
}

impl RateLimiter {
    /// 创建新的令牌桶
    ///
    /// # 参数
    ///
    /// * `capacity` - 桶容量（突发请求数）
    /// * `refill_per_second` - 每秒补充的令牌数
    pub fn new(capacity: u64, refill_per_second: u64) -> Self {
        let capacity = capacity.max(1) as f64;
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_rate: refill_per_second.max(1) as f64,
        }
    }

    /// 每秒请求数限制，突发容量为1
    pub fn per_second(requests: u64) -> Self {
        Self::new(1, requests)
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }

    /// 尝试获取一个令牌
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// 获取一个令牌，必要时等待补充
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_rate)
            };
            debug!("Rate limiter waiting {:?} for a token", wait);
            tokio::time::sleep(wait).await;
        }
    }
}
