//! Periodic data channel messages

use crate::config::HeartbeatConfig;
use crate::session::SessionHandle;
use crate::shutdown::Shutdown;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Random alphanumeric text of `len` characters
pub fn random_message(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Start sending heartbeats through `handle`
///
/// The first message goes out one full interval after the call. The task
/// ends on shutdown or on the first failed send.
pub fn spawn(handle: SessionHandle, config: HeartbeatConfig, mut shutdown: Shutdown) -> JoinHandle<()> {
    let period = config.interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::spawn(async move {
        info!(
            "Sending a heartbeat every {}ms over the data channel",
            config.interval_ms
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait() => {
                    debug!("Heartbeat stopped by shutdown");
                    break;
                }

                _ = ticker.tick() => {
                    let message = random_message(config.message_len);
                    info!("Sending '{}'", message);
                    if let Err(e) = handle.send_text(message).await {
                        warn!("Heartbeat send failed, stopping: {}", e);
                        break;
                    }
                }
            }
        }
    })
}
