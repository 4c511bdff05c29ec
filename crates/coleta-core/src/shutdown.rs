//! Cooperative shutdown via a global atomic flag.
//!
//! The flag only stops admission of new page fetches and new
//! downloads; transfers already in flight finish or abort through the
//! partial-file discipline in [`crate::download`].

use std::sync::atomic::{AtomicBool, Ordering};

/// Global shutdown flag, set from the SIGINT/SIGTERM handler.
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

pub fn request_shutdown() {
    shutdown_flag().store(true, Ordering::Relaxed);
}
