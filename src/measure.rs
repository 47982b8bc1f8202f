// measure.rs — periodic telegram decoding into shared state

use std::sync::atomic::Ordering;

use embedded_hal::digital::OutputPin;

use crate::*;

/// Decode a telegram every `poll_interval_secs` and publish good snapshots
/// into `state`. Returns only on a fatal error, after which the device is
/// expected to restart.
pub async fn read_meter<S, P>(
    state: Arc<Pin<Box<MyState>>>,
    mut meter: SmartyMeter<S, P>,
) -> anyhow::Result<()>
where
    S: ByteSource,
    P: OutputPin,
{
    let interval = Duration::from_secs(state.config.read().await.poll_interval_secs);
    info!("Polling smart meter every {}s...", interval.as_secs());

    loop {
        sleep(interval).await;

        let snapshot = match meter.decode_cycle() {
            Ok(snapshot) => snapshot.clone(),
            Err(e) if e.is_fatal() => {
                error!("Smarty: {e}. Giving up.");
                return Err(e.into());
            }
            Err(DecodeError::NoData) => {
                state.cycles_failed.fetch_add(1, Ordering::Relaxed);
                info!("Smarty: No telegram this time");
                continue;
            }
            Err(e) => {
                state.cycles_failed.fetch_add(1, Ordering::Relaxed);
                warn!("Smarty: Telegram rejected: {e}");
                continue;
            }
        };

        state.cycles_ok.fetch_add(1, Ordering::Relaxed);
        if log_enabled!(Level::Debug) {
            snapshot.log_table();
        }
        *state.meter.write().await = Some(snapshot);
        *state.data_updated.write().await = true;
    }
}

// EOF
