//! Neighbor table snapshot acquisition
//!
//! The routing sysctl is a two-step protocol: ask for the size, then fill a
//! buffer of that size. The table may grow between the two calls, in which
//! case the fill fails with ENOMEM and the buffer is grown by an eighth.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - AC-3: Access Enforcement - Kernel enforces sysctl permissions
//! - SC-5: DoS Protection - Allocation failures are reported, not ignored

use crate::error::{ArpdumpError, Result};
use crate::walker::RawSnapshot;
use std::io;
use std::path::Path;
use tracing::{debug, instrument};

/// Result of one fill attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The buffer now holds this many bytes of table data
    Filled(usize),
    /// The table no longer fits; grow and retry
    TooSmall,
}

/// Source of raw neighbor table dumps
pub trait SnapshotSource {
    /// Bytes needed for the current table; 0 means the table is empty
    fn estimate_size(&mut self) -> io::Result<usize>;

    /// Fill `buf` with the table
    fn fetch(&mut self, buf: &mut [u8]) -> io::Result<FetchOutcome>;
}

/// Run the size-then-fill protocol against `source`
#[instrument(skip_all)]
pub fn acquire_snapshot(source: &mut dyn SnapshotSource) -> Result<RawSnapshot> {
    let mut needed = source.estimate_size().map_err(ArpdumpError::SnapshotSize)?;
    if needed == 0 {
        debug!("Neighbor table is empty");
        return Ok(RawSnapshot::empty());
    }

    let mut buf: Vec<u8> = Vec::new();
    let mut attempt = 1u32;
    loop {
        buf.try_reserve_exact(needed.saturating_sub(buf.len()))
            .map_err(|_| ArpdumpError::SnapshotAllocation { bytes: needed })?;
        buf.resize(needed, 0);

        match source.fetch(&mut buf).map_err(ArpdumpError::SnapshotFetch)? {
            FetchOutcome::Filled(len) => {
                buf.truncate(len);
                debug!(bytes = buf.len(), attempt, "Fetched neighbor table");
                return Ok(RawSnapshot::new(buf));
            }
            FetchOutcome::TooSmall => {
                // Always make progress, even on tiny estimates
                needed = needed
                    .checked_add((needed / 8).max(1))
                    .ok_or(ArpdumpError::SnapshotAllocation { bytes: usize::MAX })?;
                debug!(needed, attempt, "Neighbor table grew, retrying");
                attempt += 1;
            }
        }
    }
}

#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
mod sysctl {
    use super::{FetchOutcome, SnapshotSource};
    use std::io;
    use std::ptr;

    const CTL_NET: libc::c_int = 4;
    const PF_ROUTE: libc::c_int = 17;
    const NET_RT_FLAGS: libc::c_int = 2;

    /// { CTL_NET, PF_ROUTE, 0, AF_INET, NET_RT_FLAGS, 0 }
    const MIB: [libc::c_int; 6] = [CTL_NET, PF_ROUTE, 0, libc::AF_INET, NET_RT_FLAGS, 0];

    /// The kernel routing table sysctl
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SysctlSource;

    impl SnapshotSource for SysctlSource {
        fn estimate_size(&mut self) -> io::Result<usize> {
            let mut needed: libc::size_t = 0;
            // SAFETY: a null old pointer asks only for the size, written to `needed`.
            let ret = unsafe {
                libc::sysctl(
                    MIB.as_ptr(),
                    MIB.len() as libc::c_uint,
                    ptr::null_mut(),
                    &mut needed,
                    ptr::null(),
                    0,
                )
            };
            if ret < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(needed)
        }

        fn fetch(&mut self, buf: &mut [u8]) -> io::Result<FetchOutcome> {
            let mut len: libc::size_t = buf.len();
            // SAFETY: `buf` is writable for `len` bytes and the kernel never
            // writes more than `len`.
            let ret = unsafe {
                libc::sysctl(
                    MIB.as_ptr(),
                    MIB.len() as libc::c_uint,
                    buf.as_mut_ptr().cast(),
                    &mut len,
                    ptr::null(),
                    0,
                )
            };
            if ret == 0 {
                return Ok(FetchOutcome::Filled(len.min(buf.len())));
            }

            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ENOMEM) {
                Ok(FetchOutcome::TooSmall)
            } else {
                Err(err)
            }
        }
    }
}

#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
pub use sysctl::SysctlSource;

/// Placeholder for platforms without the BSD routing sysctl
#[cfg(not(any(target_os = "freebsd", target_os = "dragonfly")))]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSource;

#[cfg(not(any(target_os = "freebsd", target_os = "dragonfly")))]
impl SnapshotSource for UnsupportedSource {
    fn estimate_size(&mut self) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "NET_RT_FLAGS routing sysctl is not available on this platform",
        ))
    }

    fn fetch(&mut self, _buf: &mut [u8]) -> io::Result<FetchOutcome> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }
}

/// The live neighbor table of this host
pub fn system_source() -> Box<dyn SnapshotSource> {
    #[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
    {
        Box::new(SysctlSource)
    }
    #[cfg(not(any(target_os = "freebsd", target_os = "dragonfly")))]
    {
        Box::new(UnsupportedSource)
    }
}

/// Serves a previously captured dump
///
/// The first size estimate may be set below the real size to exercise the
/// grow-and-retry path.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    data: Vec<u8>,
    estimate: Option<usize>,
    fetches: usize,
}

impl StaticSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            estimate: None,
            fetches: 0,
        }
    }

    /// Read a raw dump written by `sysctl -b` or a previous capture
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        std::fs::read(path).map(Self::new)
    }

    pub fn with_estimate(mut self, estimate: usize) -> Self {
        self.estimate = Some(estimate);
        self
    }

    /// Number of fill attempts served so far
    pub fn fetches(&self) -> usize {
        self.fetches
    }
}

impl SnapshotSource for StaticSource {
    fn estimate_size(&mut self) -> io::Result<usize> {
        Ok(self.estimate.unwrap_or(self.data.len()))
    }

    fn fetch(&mut self, buf: &mut [u8]) -> io::Result<FetchOutcome> {
        self.fetches += 1;
        if buf.len() < self.data.len() {
            return Ok(FetchOutcome::TooSmall);
        }
        buf[..self.data.len()].copy_from_slice(&self.data);
        Ok(FetchOutcome::Filled(self.data.len()))
    }
}
