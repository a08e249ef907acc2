use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::state::SharedState;

/// Delay between two self pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(240);
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// URL pinged to keep a sleeping host awake.
pub fn ping_url(public_host: &str) -> String {
    format!("{}/healthz", public_host.trim_end_matches('/'))
}

/// Ping our own `/healthz` forever. Returns immediately without a public host.
pub async fn run_keepalive(state: SharedState) {
    let Some(host) = state.config().public_host.clone() else {
        info!("no public host configured; keepalive disabled");
        return;
    };
    let client = match reqwest::Client::builder().timeout(PING_TIMEOUT).build() {
        Ok(client) => client,
        Err(err) => {
            warn!(error = %err, "failed to build keepalive client");
            return;
        }
    };

    let url = ping_url(&host);
    info!(%url, every_secs = PING_INTERVAL.as_secs(), "keepalive started");
    let mut ticker = interval(PING_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; the server may not be listening yet.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match client.get(&url).send().await {
            Ok(response) => debug!(status = %response.status(), "keepalive ping"),
            Err(err) => warn!(error = %err, "keepalive ping failed"),
        }
    }
}
