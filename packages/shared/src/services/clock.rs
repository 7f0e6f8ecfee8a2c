use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Countdown for one player. Time is only charged while the clock runs.
#[derive(Debug)]
pub struct Clock {
    remaining: Duration,
    started_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl Clock {
    pub fn new(initial: Duration) -> Self {
        Clock {
            remaining: initial,
            started_at: None,
            timer: None,
        }
    }

    /// Starts counting down and schedules `on_expire` to run once when the
    /// remaining time is used up. Restarting a running clock charges the
    /// elapsed time first.
    pub fn start<F>(&mut self, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.stop();

        let remaining = self.remaining;
        self.started_at = Some(Instant::now());
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            on_expire();
        }));
    }

    /// Charges elapsed time and cancels the pending expiry. No-op when stopped.
    pub fn stop(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.remaining = self.remaining.saturating_sub(started_at.elapsed());
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Marks the clock as flagged.
    pub fn expire(&mut self) {
        self.stop();
        self.remaining = Duration::ZERO;
    }

    /// Live remaining time, never negative.
    pub fn remaining(&self) -> Duration {
        match self.started_at {
            Some(started_at) => self.remaining.saturating_sub(started_at.elapsed()),
            None => self.remaining,
        }
    }

    /// Saturates at `u64::MAX`.
    pub fn remaining_ms(&self) -> u64 {
        u64::try_from(self.remaining().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    fn counting_callback() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        (fired, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_started_clock_keeps_initial_time() {
        let clock = Clock::new(Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(10)).await;

        assert_eq!(clock.remaining(), Duration::from_secs(60));
        assert_eq!(clock.remaining_ms(), 60_000);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_remaining_ms_saturates() {
        let clock = Clock::new(Duration::MAX);

        assert_eq!(clock.remaining_ms(), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_clock_counts_down_without_mutation() {
        let mut clock = Clock::new(Duration::from_secs(60));
        let (_fired, on_expire) = counting_callback();

        clock.start(on_expire);
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(clock.remaining(), Duration::from_secs(45));
        assert_eq!(clock.remaining(), Duration::from_secs(45));
        assert!(clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_charges_elapsed_time_and_is_idempotent() {
        let mut clock = Clock::new(Duration::from_secs(60));
        let (fired, on_expire) = counting_callback();

        clock.start(on_expire);
        tokio::time::advance(Duration::from_secs(20)).await;
        clock.stop();
        clock.stop();
        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;

        assert_eq!(clock.remaining(), Duration::from_secs(40));
        assert!(!clock.is_running());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_fires_exactly_once() {
        let mut clock = Clock::new(Duration::from_secs(5));
        let (fired, on_expire) = counting_callback();

        clock.start(on_expire);
        tokio::time::advance(Duration::from_secs(4)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(clock.remaining(), Duration::ZERO);

        clock.expire();
        assert_eq!(clock.remaining(), Duration::ZERO);
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumed_clock_uses_remaining_time() {
        let mut clock = Clock::new(Duration::from_secs(10));
        let (first, on_expire) = counting_callback();
        clock.start(on_expire);
        tokio::time::advance(Duration::from_secs(7)).await;
        clock.stop();

        let (second, on_expire) = counting_callback();
        clock.start(on_expire);
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(second.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(first.load(Ordering::SeqCst), 0);
    }
}
