//! Cancellable scheduling primitives
//!
//! Every delayed step of a match (matchmaking, introduction, reveal pause,
//! opponent thinking, round countdown) runs as a spawned task holding a
//! child of the match's [`CancellationToken`]. Cancelling the match token
//! cancels every outstanding task at once.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Longest tick interval a [`RoundTimer`] will wait for.
pub const MAX_TICK: Duration = Duration::from_secs(24 * 60 * 60);

/// Handle to a scheduled task.
///
/// [`cancel`](Self::cancel) is idempotent and may be called after the task
/// already completed.
#[derive(Debug)]
pub struct Scheduled {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Scheduled {
    /// Cancels the task. A callback that has not started yet never runs.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether [`cancel`](Self::cancel) (or a parent cancellation) happened.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the underlying task has run to completion or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Runs `f` once after `delay` unless `parent` (or the returned handle) is
/// cancelled first.
pub fn schedule_once<F>(parent: &CancellationToken, delay: Duration, f: F) -> Scheduled
where
    F: FnOnce() + Send + 'static,
{
    let token = parent.child_token();
    let task_token = token.clone();
    let task = tokio::spawn(async move {
        tokio::select! {
            biased;
            () = task_token.cancelled() => {}
            () = tokio::time::sleep(delay) => {
                if !task_token.is_cancelled() {
                    f();
                }
            }
        }
    });
    Scheduled { token, task }
}

/// Drives `fut` to completion unless `parent` is cancelled first, in which
/// case the future is dropped mid-flight.
pub fn spawn_cancellable<Fut>(parent: &CancellationToken, fut: Fut) -> Scheduled
where
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = parent.child_token();
    let task_token = token.clone();
    let task = tokio::spawn(async move {
        tokio::select! {
            biased;
            () = task_token.cancelled() => {}
            () = fut => {}
        }
    });
    Scheduled { token, task }
}

// ============================================================================
// RoundTimer
// ============================================================================

/// Per-round countdown.
///
/// Ticks once per `tick` interval, reporting the remaining tick count, and
/// fires `on_expire` once when the count reaches zero. Only one countdown is
/// active at a time: [`start`](Self::start) cancels the previous run.
#[derive(Debug)]
pub struct RoundTimer {
    tick: Duration,
    current: Option<Scheduled>,
}

impl RoundTimer {
    /// Creates an idle timer with the given tick interval.
    ///
    /// Intervals are clamped to between one millisecond and [`MAX_TICK`].
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            tick: tick.clamp(Duration::from_millis(1), MAX_TICK),
            current: None,
        }
    }

    /// Starts a countdown of `ticks` ticks.
    ///
    /// `on_tick` receives the remaining count after each tick (the last call
    /// receives `0`); `on_expire` runs right after that last tick. Neither
    /// runs once the countdown is cancelled.
    pub fn start<T, E>(&mut self, parent: &CancellationToken, ticks: u32, on_tick: T, on_expire: E)
    where
        T: Fn(u32) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        self.cancel();

        let tick = self.tick;
        let now = Instant::now();
        let first_tick = now.checked_add(tick).unwrap_or(now);
        let token = parent.child_token();
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(first_tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut remaining = ticks;
            while remaining > 0 {
                tokio::select! {
                    biased;
                    () = task_token.cancelled() => return,
                    _ = interval.tick() => {}
                }
                if task_token.is_cancelled() {
                    return;
                }
                remaining -= 1;
                on_tick(remaining);
            }

            if task_token.is_cancelled() {
                return;
            }
            trace!(ticks, "round timer expired");
            on_expire();
        });

        self.current = Some(Scheduled { token, task });
    }

    /// Stops the running countdown, if any.
    pub fn cancel(&mut self) {
        if let Some(current) = self.current.take() {
            current.cancel();
        }
    }

    /// Whether a countdown is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| !c.is_cancelled() && !c.is_finished())
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn schedule_once_fires_after_delay() {
        let parent = CancellationToken::new();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let _handle = schedule_once(&parent, Duration::from_millis(500), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_schedule_never_fires() {
        let parent = CancellationToken::new();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let handle = schedule_once(&parent, Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_cascades() {
        let parent = CancellationToken::new();
        let fired = Arc::new(AtomicU32::new(0));
        let a = Arc::clone(&fired);
        let b = Arc::clone(&fired);
        let _h1 = schedule_once(&parent, Duration::from_secs(1), move || {
            a.fetch_add(1, Ordering::SeqCst);
        });
        let _h2 = spawn_cancellable(&parent, async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            b.fetch_add(1, Ordering::SeqCst);
        });

        parent.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_counts_down_and_expires_once() {
        let parent = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let expire_tx = tx.clone();

        let mut timer = RoundTimer::new(Duration::from_secs(1));
        timer.start(
            &parent,
            3,
            move |remaining| {
                let _ = tx.send(Some(remaining));
            },
            move || {
                let _ = expire_tx.send(None);
            },
        );
        assert!(timer.is_running());

        tokio::time::sleep(Duration::from_secs(10)).await;

        let mut seen = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            seen.push(msg);
        }
        assert_eq!(seen, vec![Some(2), Some(1), Some(0), None]);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_expiry_suppresses_callback() {
        let parent = CancellationToken::new();
        let expired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&expired);

        let mut timer = RoundTimer::new(Duration::from_secs(1));
        timer.start(&parent, 15, |_| {}, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(14_500)).await;
        timer.cancel();
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(expired.load(Ordering::SeqCst), 0);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_countdown() {
        let parent = CancellationToken::new();
        let expired = Arc::new(AtomicU32::new(0));

        let mut timer = RoundTimer::new(Duration::from_secs(1));
        let first = Arc::clone(&expired);
        timer.start(&parent, 2, |_| {}, move || {
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = Arc::clone(&expired);
        timer.start(&parent, 4, |_| {}, move || {
            second.fetch_add(10, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(expired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(expired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_tick_is_clamped() {
        let parent = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut timer = RoundTimer::new(Duration::from_secs(u64::MAX / 2));
        timer.start(&parent, 2, move |remaining| {
            let _ = tx.send(remaining);
        }, || {});

        tokio::time::sleep(MAX_TICK + Duration::from_secs(1)).await;
        assert_eq!(rx.try_recv().ok(), Some(1));
        assert!(timer.is_running());
    }
}
