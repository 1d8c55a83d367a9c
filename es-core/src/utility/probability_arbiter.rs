//! 概率仲裁器
//!
//! 以伯努利抽样摊销维护工作（读修复、快照清理）。随机源可注入，便于确定性测试。
//!
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::Arc;

/// [0, 1) 均匀随机源
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

impl<F> RandomSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn next_f64(&self) -> f64 {
        self()
    }
}

/// 线程本地随机源，可安全并发使用
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// 固定种子随机源，用于可复现的运行
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        self.rng.lock().random::<f64>()
    }
}

#[derive(Clone)]
pub struct ProbabilityArbiter {
    source: Arc<dyn RandomSource>,
}

impl ProbabilityArbiter {
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        Self { source }
    }

    /// 抽取 r ∈ [0, 1)，返回 `r <= probability`
    pub fn decide(&self, probability: f64) -> bool {
        self.source.next_f64() <= probability
    }
}

impl Default for ProbabilityArbiter {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decide_compares_draw_inclusively() {
        let arbiter = ProbabilityArbiter::new(Arc::new(|| 0.25));
        assert!(arbiter.decide(0.25));
        assert!(arbiter.decide(1.0));
        assert!(!arbiter.decide(0.2));
        assert!(!arbiter.decide(0.0));
    }

    #[test]
    fn zero_draw_passes_zero_probability() {
        let arbiter = ProbabilityArbiter::new(Arc::new(|| 0.0));
        assert!(arbiter.decide(0.0));
    }

    #[test]
    fn seeded_sources_are_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        for _ in 0..16 {
            let draw = a.next_f64();
            assert_eq!(draw, b.next_f64());
            assert!((0.0..1.0).contains(&draw));
        }
    }

    #[test]
    fn thread_random_stays_in_unit_interval() {
        let arbiter = ProbabilityArbiter::default();
        assert!(arbiter.decide(1.0));
        for _ in 0..64 {
            assert!((0.0..1.0).contains(&ThreadRandom.next_f64()));
        }
    }
}
