//! Synthetic work: a fixed delay and a deterministic failure pattern.

use std::time::Duration;

use async_trait::async_trait;

use super::WorkFunction;

/// Sleeps `delay` per item and fails items whose index is a multiple of
/// `fail_every` (when set and non-zero).
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticWork {
    pub delay: Duration,
    pub fail_every: Option<u64>,
}

impl SyntheticWork {
    pub fn new(delay: Duration, fail_every: Option<u64>) -> Self {
        Self { delay, fail_every }
    }

    pub fn fails(&self, index: u64) -> bool {
        matches!(self.fail_every, Some(k) if k > 0 && index % k == 0)
    }
}

#[async_trait]
impl WorkFunction<u64> for SyntheticWork {
    async fn call(&self, index: u64) -> anyhow::Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fails(index) {
            anyhow::bail!("synthetic failure for item {}", index);
        }
        Ok(())
    }
}
