// crates/server/src/state.rs
// Shared application state threaded through the router.

use std::sync::Arc;
use std::time::Instant;

use jobwatch_core::Supervisor;

pub struct AppState {
    start_time: Instant,
    pub supervisor: Supervisor,
}

impl AppState {
    pub fn new(supervisor: Supervisor) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            supervisor,
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
