//! Retry of writes that fail on transient OS-level locks.
//!
//! Concurrent access to the same dataset file can surface as a sharing or
//! lock violation that clears within moments. Such errors are retried a
//! fixed number of times after a fixed delay; every other error is
//! returned immediately.

use std::io;
use std::thread;
use std::time::Duration;

/// How many times, and after what delay, to retry a transient failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: u32,
    delay: Duration,
}

/// Outcome of a [`RetryPolicy::run`] call that did not succeed.
#[derive(Debug)]
pub struct RetryFailure {
    /// The last error returned by the operation.
    pub error: io::Error,
    /// Whether that error was classified as a transient lock.
    pub transient: bool,
    /// Attempts made, including the first.
    pub attempts: u32,
}

impl RetryPolicy {
    /// Retry up to `retries` times, sleeping `delay` before each retry.
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Number of retries after the first attempt.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay before each retry.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op`, retrying while it fails with a transient lock error.
    pub fn run<T>(&self, mut op: impl FnMut() -> io::Result<T>) -> Result<T, RetryFailure> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let transient = is_transient_lock_error(&error);
                    if !transient || attempts > self.retries {
                        return Err(RetryFailure {
                            error,
                            transient,
                            attempts,
                        });
                    }
                    tracing::warn!(
                        attempt = attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %error,
                        "transient lock error, retrying"
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
            }
        }
    }
}

/// Whether `error` is an OS-level lock or sharing violation that may clear
/// on its own.
pub fn is_transient_lock_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    match error.raw_os_error() {
        Some(code) => is_transient_os_code(code),
        None => false,
    }
}

#[cfg(unix)]
fn is_transient_os_code(code: i32) -> bool {
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    const EAGAIN: i32 = 35;
    #[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
    const EAGAIN: i32 = 11;
    const EBUSY: i32 = 16;
    const ETXTBSY: i32 = 26;
    matches!(code, EAGAIN | EBUSY | ETXTBSY)
}

#[cfg(windows)]
fn is_transient_os_code(code: i32) -> bool {
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    matches!(code, 32 | 33)
}

#[cfg(not(any(unix, windows)))]
fn is_transient_os_code(_code: i32) -> bool {
    false
}
