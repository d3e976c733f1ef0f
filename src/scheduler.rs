use std::future::Future;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::lifecycle::SensorHubClient;

/// Refresh the report buffer of every given device once.
///
/// Returns the number of successful reads.
pub fn poll_reports<'a, I>(devices: I) -> usize
where
    I: IntoIterator<Item = &'a mut Device>,
{
    let mut ok = 0;
    for device in devices {
        let kind = device.kind();
        match device.poll_report() {
            Ok(report) => {
                debug!("[{}] report {:02x?}", kind, report);
                ok += 1;
            }
            Err(e) => warn!("[{}] report read failed: {}", kind, e),
        }
    }
    ok
}

/// Poll the client's devices every `period` until `shutdown` resolves.
///
/// Returns the number of polling rounds completed.
pub async fn run_report_loop<F>(client: &mut SensorHubClient, period: Duration, shutdown: F) -> u64
where
    F: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!("[scheduler] polling {} device(s) every {:?}", client.registry().len(), period);
    let mut rounds = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                poll_reports(client.devices_mut());
                rounds += 1;
            }
        }
    }
    info!("[scheduler] stopped after {} round(s)", rounds);
    rounds
}
