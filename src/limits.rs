//! Per-analysis resource limits.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info};

use crate::config::{ConfigError, Configuration};
use crate::shutdown::ShutdownManager;

/// Wall-time limit in seconds.
pub const WALL_TIME_OPTION: &str = "limits.time.wall";

/// Requests shutdown of one cancellation scope once its wall-time budget is
/// used up.
///
/// The limiter runs on its own thread between [`start`][Self::start] and
/// [`stop`][Self::stop] (or drop).
pub struct ResourceLimitChecker {
    name: String,
    wall_time: Duration,
    manager: Arc<ShutdownManager>,
    running: Option<(Sender<()>, JoinHandle<()>)>,
}

impl ResourceLimitChecker {
    pub fn new(name: impl Into<String>, wall_time: Duration, manager: Arc<ShutdownManager>) -> Self {
        Self {
            name: name.into(),
            wall_time,
            manager,
            running: None,
        }
    }

    /// Build a limiter from [`WALL_TIME_OPTION`]; `None` if no limit is configured.
    pub fn from_configuration(
        config: &Configuration,
        name: &str,
        manager: &Arc<ShutdownManager>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(seconds) = config.get_parsed::<f64>(WALL_TIME_OPTION)? else {
            return Ok(None);
        };
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: WALL_TIME_OPTION.to_string(),
                value: seconds.to_string(),
                reason: "must be a positive number of seconds".to_string(),
            });
        }
        Ok(Some(Self::new(
            name,
            Duration::from_secs_f64(seconds),
            Arc::clone(manager),
        )))
    }

    pub fn wall_time(&self) -> Duration {
        self.wall_time
    }

    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let wall_time = self.wall_time;
        let manager = Arc::clone(&self.manager);
        let name = self.name.clone();

        let handle = thread::spawn(move || match stop_rx.recv_timeout(wall_time) {
            Err(RecvTimeoutError::Timeout) => {
                info!("{}: wall time limit of {:?} reached", name, wall_time);
                manager.request_shutdown(format!("The wall time limit of {:?} has elapsed.", wall_time));
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!("{}: resource limit checker stopped", name);
            }
        });
        self.running = Some((stop_tx, handle));
    }

    pub fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.running.take() {
            drop(stop_tx);
            let _ = handle.join();
        }
    }
}

impl Drop for ResourceLimitChecker {
    fn drop(&mut self) {
        self.stop();
    }
}
