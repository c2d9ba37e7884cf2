//! Cancellable periodic status checks.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Call `tick` every `period` (first call one period from now) until it
/// breaks or `token` is cancelled. A tick still in flight when the token
/// fires is dropped, so its result is never applied.
pub(crate) async fn run_every<F, Fut>(period: Duration, token: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ControlFlow<()>>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let step = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            step = tick() => step,
        };

        if step.is_break() {
            break;
        }
    }
}

/// The one poll a store may have running.
///
/// Dropping it cancels the task; the `epoch` lets a finishing task release
/// its own slot without touching a poll that replaced it.
#[derive(Debug)]
pub(crate) struct ActivePoll {
    pub(crate) epoch: u64,
    pub(crate) content_id: String,
    token: CancellationToken,
    _task: JoinHandle<()>,
}

impl ActivePoll {
    pub(crate) fn new(
        epoch: u64,
        content_id: String,
        token: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            epoch,
            content_id,
            token,
            _task: task,
        }
    }
}

impl Drop for ActivePoll {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
