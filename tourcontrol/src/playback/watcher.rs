//! Position polling while audio plays.
//!
//! One polling task runs per playing session. The controller owns it through
//! a [`PollerGuard`]; dropping the guard cancels the task, so pause,
//! end-of-media, reload, release and controller teardown all stop polling the
//! same way.

use std::sync::Weak;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::controller::ControllerShared;

/// Ownership of the running polling task.
#[derive(Debug)]
pub(crate) struct PollerGuard {
    pub(crate) id: u64,
    token: CancellationToken,
}

impl PollerGuard {
    pub(crate) fn new(id: u64) -> (Self, CancellationToken) {
        let token = CancellationToken::new();
        (
            Self {
                id,
                token: token.clone(),
            },
            token,
        )
    }
}

impl Drop for PollerGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Ticks at `interval` until cancelled, the controller is gone, or a tick
/// asks to stop.
pub(crate) async fn watch_position(
    shared: Weak<ControllerShared>,
    poller_id: u64,
    generation: u64,
    token: CancellationToken,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(shared) = shared.upgrade() else {
            break;
        };
        if !shared.poll_once(poller_id, generation).await {
            break;
        }
    }

    trace!(poller_id, "Position polling stopped");
}
