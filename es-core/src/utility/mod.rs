//! 通用工具：概率仲裁与时间源
//!
mod probability_arbiter;
mod time_source;

pub use probability_arbiter::{ProbabilityArbiter, RandomSource, SeededRandom, ThreadRandom};
pub use time_source::{SystemTimeSource, TimeSource};
