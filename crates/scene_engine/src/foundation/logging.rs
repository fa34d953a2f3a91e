//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Reads `RUST_LOG` as usual. Safe to call more than once; later calls are
/// ignored, which lets every test initialize logging without coordination.
pub fn init() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}
