//! Process suspension capability.
//!
//! POSIX builds stop and continue the downloader with `SIGSTOP`/`SIGCONT`.
//! Other platforms get [`UnsupportedSuspender`], which accepts the call and
//! does nothing.

use std::fmt::Debug;

use super::error::DownloadError;

/// Suspends and continues a running process by pid.
pub trait ProcessSuspender: Send + Sync + Debug {
    /// Whether suspension has any effect on this platform.
    fn is_supported(&self) -> bool;

    /// Stops the process. Returns `Ok(false)` when the call was a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Suspend`] if the OS rejects the signal.
    fn suspend(&self, pid: u32) -> Result<bool, DownloadError>;

    /// Continues a stopped process. Returns `Ok(false)` when the call was a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Suspend`] if the OS rejects the signal.
    fn resume(&self, pid: u32) -> Result<bool, DownloadError>;
}

/// Signal-based suspension.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalSuspender;

#[cfg(unix)]
impl SignalSuspender {
    fn send(pid: u32, signal: libc::c_int, action: &'static str) -> Result<bool, DownloadError> {
        let raw = libc::pid_t::try_from(pid).map_err(|_| {
            DownloadError::suspend(
                action,
                pid,
                std::io::Error::from(std::io::ErrorKind::InvalidInput),
            )
        })?;
        // SAFETY: kill(2) takes plain integers; failures are reported through errno.
        let rc = unsafe { libc::kill(raw, signal) };
        if rc == 0 {
            tracing::debug!(pid, action, "signal delivered");
            Ok(true)
        } else {
            Err(DownloadError::suspend(
                action,
                pid,
                std::io::Error::last_os_error(),
            ))
        }
    }
}

#[cfg(unix)]
impl ProcessSuspender for SignalSuspender {
    fn is_supported(&self) -> bool {
        true
    }

    fn suspend(&self, pid: u32) -> Result<bool, DownloadError> {
        Self::send(pid, libc::SIGSTOP, "pause")
    }

    fn resume(&self, pid: u32) -> Result<bool, DownloadError> {
        Self::send(pid, libc::SIGCONT, "resume")
    }
}

/// No-op suspension for platforms without job-control signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSuspender;

impl ProcessSuspender for UnsupportedSuspender {
    fn is_supported(&self) -> bool {
        false
    }

    fn suspend(&self, pid: u32) -> Result<bool, DownloadError> {
        tracing::info!(pid, "pause is not supported on this platform");
        Ok(false)
    }

    fn resume(&self, pid: u32) -> Result<bool, DownloadError> {
        tracing::info!(pid, "resume is not supported on this platform");
        Ok(false)
    }
}

/// The suspender for the build target.
#[cfg(unix)]
#[must_use]
pub fn platform_suspender() -> Box<dyn ProcessSuspender> {
    Box::new(SignalSuspender)
}

/// The suspender for the build target.
#[cfg(not(unix))]
#[must_use]
pub fn platform_suspender() -> Box<dyn ProcessSuspender> {
    Box::new(UnsupportedSuspender)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_suspender_is_noop() {
        let suspender = UnsupportedSuspender;
        assert!(!suspender.is_supported());
        assert!(!suspender.suspend(1).unwrap());
        assert!(!suspender.resume(1).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_suspender_reports_missing_process() {
        // Far above any default pid_max.
        let err = SignalSuspender.suspend(i32::MAX as u32).unwrap_err();
        assert!(matches!(err, DownloadError::Suspend { action: "pause", .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_platform_suspender_is_supported_on_unix() {
        assert!(platform_suspender().is_supported());
    }
}
