use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::output::Sink;
use crate::{Calibration, Connection, Result, Sensor};

// granularity at which a sleeping loop notices a shutdown request
const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Cooperative cancellation. Holds the number of the signal that requested shutdown, 0 if none.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    signal: Arc<AtomicI32>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only performs an atomic store so it may be called from a signal handler.
    pub fn request(&self, signal: i32) {
        self.signal.store(signal, Ordering::SeqCst);
    }

    pub fn requested(&self) -> Option<i32> {
        match self.signal.load(Ordering::SeqCst) {
            0 => None,
            signal => Some(signal),
        }
    }

    /// Sleeps for `duration` or until shutdown is requested, whichever comes first. Returns
    /// whether shutdown was requested. A duration too long to be represented as an `Instant`
    /// sleeps until shutdown.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.requested().is_some() {
                return true;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    SLEEP_SLICE.min(deadline - now)
                }
                None => SLEEP_SLICE,
            };
            std::thread::sleep(slice);
        }
    }
}

/// Measures, calibrates and emits a reading every `interval` until shutdown is requested or an
/// error occurs. The period is fixed: time spent measuring is not subtracted from the sleep.
///
/// Returns the signal that stopped the loop. The sensor is torn down by its owner.
pub fn run<C: Connection>(
    sensor: &Sensor<C>,
    calibration: &Calibration,
    sink: &Sink,
    interval: Duration,
    shutdown: &Shutdown,
) -> Result<i32> {
    debug!("scale value: {}", calibration.scale);
    debug!("offset value: {}", calibration.offset);

    loop {
        if let Some(signal) = shutdown.requested() {
            info!("received signal {}, stopping", signal);
            return Ok(signal);
        }

        let reading = calibration.apply(sensor.measure()?);
        sink.emit(&reading)?;

        shutdown.sleep(interval);
    }
}
