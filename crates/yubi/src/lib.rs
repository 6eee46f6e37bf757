//! Finger counting from hand landmarks.
//!
//! Yubi turns a stream of camera frames into a "number of extended fingers" signal (0 to 5) and
//! drives a row of simulated LEDs from it. The hand landmark detector and the camera are external
//! collaborators, plugged in through the [`LandmarkSource`] and [`FrameSource`] traits.
//!
//! # Coordinates
//!
//! Landmark coordinates are normalized to the input frame: X points to the right, Y points *down*
//! (so a smaller Y is higher up in the image), both in range 0.0 to 1.0.
//!
//! # Environment Variables
//!
//! [`PipelineOptions::from_env`] lets some settings be overridden by environment variables:
//!
//! * `YUBI_THUMB_POLICY`: How the thumb is classified. Allowed values are:
//!   * `handedness`: uses the handedness label reported by the detector, if any.
//!   * `fixed`: ignores handedness and treats the thumb as extended when its tip is right of its
//!     lower joint. Only correct for one hand orientation.
//! * `YUBI_POLL_INTERVAL_MS`: Interval at which the consumer polls the result queues.
//! * `YUBI_RETRY_INTERVAL_MS`: Time a frame loop waits before reading again after a failed read.
//! * `YUBI_QUEUE_CAPACITY`: Capacity of the frame and count queues between producer and consumer.
//!
//! [`LandmarkSource`]: hand::source::LandmarkSource
//! [`FrameSource`]: video::FrameSource
//! [`PipelineOptions::from_env`]: pipeline::PipelineOptions::from_env

use log::LevelFilter;

pub mod annotate;
pub mod hand;
pub mod image;
pub mod indicator;
pub mod pipeline;
pub mod sink;
pub mod timer;
pub mod video;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and Yubi will log at *trace* level.
/// Otherwise, they will log at *debug* level. `RUST_LOG` can be used to override this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
