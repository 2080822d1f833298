//! System utilities for embedded devices.
//!
//! This module provides the system-level pieces the multiplexer needs from
//! its host: a liveness [`Watchdog`] the scheduler feeds on every tick and
//! every transport event, and (with the `std` feature) the background
//! [`scheduler`] thread itself.
//!
//! # Usage
//!
//! ```rust
//! use httpmux::system::Watchdog;
//!
//! struct TaskWatchdog {
//!     fed: u32,
//! }
//!
//! impl Watchdog for TaskWatchdog {
//!     fn feed(&mut self) {
//!         // Reset the hardware or RTOS task watchdog here.
//!         self.fed += 1;
//!     }
//! }
//! ```

/// Liveness signal for a task watchdog.
pub trait Watchdog {
    /// Arm the watchdog for the calling task with the given timeout.
    ///
    /// Called once, when the scheduler starts.
    fn arm(&mut self, timeout_ms: u32) {
        let _ = timeout_ms;
    }

    /// Signal forward progress.
    fn feed(&mut self);
}

/// A watchdog that ignores every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWatchdog;

impl Watchdog for NoWatchdog {
    fn feed(&mut self) {}
}

/// Background scheduler thread and its command handle.
#[cfg(feature = "std")]
pub mod scheduler;
