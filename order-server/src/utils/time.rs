//! 时钟抽象
//!
//! 延迟判定依赖壁钟时间。通过 [`Clock`] 注入时间来源，
//! 生产环境使用 [`SystemClock`]，测试使用 [`ManualClock`]。

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// 壁钟时间来源（Unix millis）
pub trait Clock: fmt::Debug + Send + Sync {
    fn now_millis(&self) -> i64;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        shared::util::now_millis()
    }
}

/// 手动推进的时钟（测试用）
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, delta: i64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.advance_millis(minutes * 60_000);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);

        clock.advance_minutes(5);
        assert_eq!(clock.now_millis(), 1_000 + 5 * 60_000);

        clock.set(42);
        assert_eq!(clock.now_millis(), 42);
    }
}
