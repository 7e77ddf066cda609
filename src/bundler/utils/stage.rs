//! Indented stage framing for log output.
//!
//! Each `begin` logs its message and indents subsequent stage lines; `end`
//! un-indents and logs the closing message.

use std::sync::atomic::{AtomicUsize, Ordering};

static DEPTH: AtomicUsize = AtomicUsize::new(0);

fn indent() -> String {
    "  ".repeat(DEPTH.load(Ordering::Relaxed))
}

/// Logs `message` at the current depth and nests one level.
pub fn begin(message: impl AsRef<str>) {
    log::info!("{}{}", indent(), message.as_ref());
    DEPTH.fetch_add(1, Ordering::Relaxed);
}

/// Logs `message` at the current depth.
pub fn info(message: impl AsRef<str>) {
    log::info!("{}{}", indent(), message.as_ref());
}

/// Un-nests one level and logs `message`.
pub fn end(message: impl AsRef<str>) {
    let _ = DEPTH.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| d.checked_sub(1));
    log::info!("{}{}", indent(), message.as_ref());
}

/// Resets nesting after an aborted stage.
pub fn reset() {
    DEPTH.store(0, Ordering::Relaxed);
}
