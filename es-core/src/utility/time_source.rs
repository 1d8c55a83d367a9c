use chrono::{DateTime, Utc};

/// 时间源
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<F> TimeSource for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
