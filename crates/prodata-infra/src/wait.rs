//! Cooperative waiting: a timer raced against a cancellation signal.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::{Error, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_POLL_DEADLINE,
        }
    }
}

/// Fires the paired [`CancelSignal`]s.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by long-running operations; cloning shares the same signal.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if the handle was dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Sleep for `period` unless cancelled first.
pub async fn sleep_or_cancel(period: Duration, cancel: &CancelSignal) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(period) => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEnd {
    Reached,
    TimedOut { waited: Duration },
}

/// Fetch repeatedly until `done` holds, the deadline passes, or the caller
/// cancels. Every fetched value is left in `last`, whatever the outcome.
///
/// The deadline is only checked after a fetch, so a timeout is never
/// reported before `settings.deadline` has fully elapsed.
pub async fn poll_until<T, F, Fut, D>(
    settings: PollSettings,
    cancel: &CancelSignal,
    last: &mut Option<T>,
    mut fetch: F,
    done: D,
) -> Result<PollEnd>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    D: Fn(&T) -> bool,
{
    let started = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let current = last.insert(fetch().await?);
        if done(current) {
            return Ok(PollEnd::Reached);
        }

        let waited = started.elapsed();
        if waited >= settings.deadline {
            return Ok(PollEnd::TimedOut { waited });
        }

        debug!(waited_secs = waited.as_secs(), "poll: not there yet");
        sleep_or_cancel(settings.interval, cancel).await?;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stops_as_soon_as_done() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let mut last = None;

        let end = poll_until(
            PollSettings::default(),
            &CancelSignal::never(),
            &mut last,
            move || async move { Ok::<_, Error>(calls.fetch_add(1, Ordering::SeqCst) + 1) },
            |n| *n == 3,
        )
        .await
        .unwrap();

        assert_eq!(end, PollEnd::Reached);
        assert_eq!(last, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_only_after_deadline() {
        let start = Instant::now();
        let mut last = None;

        let end = poll_until(
            PollSettings::default(),
            &CancelSignal::never(),
            &mut last,
            || async { Ok::<_, Error>("PROVISIONING") },
            |_| false,
        )
        .await
        .unwrap();

        assert!(matches!(end, PollEnd::TimedOut { waited } if waited >= DEFAULT_POLL_DEADLINE));
        assert!(start.elapsed() >= DEFAULT_POLL_DEADLINE);
        assert_eq!(last, Some("PROVISIONING"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_makes_no_fetch() {
        let (handle, signal) = cancellation();
        handle.cancel();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let mut last = None;

        let err = poll_until(
            PollSettings::default(),
            &signal,
            &mut last,
            move || async move { Ok::<_, Error>(calls.fetch_add(1, Ordering::SeqCst)) },
            |_| true,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(last, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_sleep() {
        let (handle, signal) = cancellation();
        let start = Instant::now();

        let sleeper = tokio::spawn(async move { sleep_or_cancel(Duration::from_secs(60), &signal).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();

        let res = sleeper.await.unwrap();
        assert!(matches!(res, Err(Error::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_never_cancels() {
        let (handle, signal) = cancellation();
        drop(handle);

        sleep_or_cancel(Duration::from_secs(5), &signal).await.unwrap();
        assert!(!signal.is_cancelled());
    }
}
