//! Interface and hostname resolution
//!
//! Both lookups are best-effort: a miss is reported as a value, never as an
//! error, and the caller prints a placeholder instead.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - CM-8: System Component Inventory - Interface resolution

use crate::error::{ArpdumpError, Result};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use tracing::{debug, trace};

/// Largest host name getnameinfo can return
const NI_MAXHOST: usize = 1025;

/// Outcome of a reverse lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostLookup {
    Found(String),
    NotFound,
    /// Transient resolver failure (EAI_AGAIN / TRY_AGAIN)
    RetryLater,
}

/// Maps interface indices to names
#[cfg_attr(test, mockall::automock)]
pub trait InterfaceResolver {
    fn index_to_name(&self, index: u32) -> Option<String>;
}

/// Reverse-resolves IPv4 addresses
#[cfg_attr(test, mockall::automock)]
pub trait HostnameResolver {
    fn reverse_lookup(&self, addr: Ipv4Addr) -> HostLookup;
}

/// if_indextoname(3)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl InterfaceResolver for SystemInterfaces {
    fn index_to_name(&self, index: u32) -> Option<String> {
        let name = match nix::net::if_::if_indextoname(index) {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(e) => {
                trace!(index, error = %e, "if_indextoname failed");
                return None;
            }
        };
        interface_name(name)
    }
}

/// Some libcs report an unassigned index as an empty name
fn interface_name(name: String) -> Option<String> {
    if name.is_empty() {
        trace!("if_indextoname returned an empty name");
        None
    } else {
        Some(name)
    }
}

/// getnameinfo(3) with NI_NAMEREQD
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHosts;

impl HostnameResolver for SystemHosts {
    fn reverse_lookup(&self, addr: Ipv4Addr) -> HostLookup {
        // SAFETY: sockaddr_in is plain old data; all-zero is a valid value.
        let mut sin: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        sin.sin_family = libc::AF_INET as libc::sa_family_t;
        sin.sin_addr.s_addr = u32::from_ne_bytes(addr.octets());
        #[cfg(any(
            target_os = "freebsd",
            target_os = "dragonfly",
            target_os = "macos",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        {
            sin.sin_len = std::mem::size_of::<libc::sockaddr_in>() as u8;
        }

        let mut host = [0 as libc::c_char; NI_MAXHOST];
        // SAFETY: `sin` outlives the call and `host` is writable for its full
        // length; no service buffer is requested.
        let ret = unsafe {
            libc::getnameinfo(
                &sin as *const libc::sockaddr_in as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                host.as_mut_ptr(),
                host.len() as _,
                std::ptr::null_mut(),
                0,
                libc::NI_NAMEREQD,
            )
        };

        match ret {
            0 => {
                // SAFETY: getnameinfo NUL-terminates the host buffer on success.
                let name = unsafe { std::ffi::CStr::from_ptr(host.as_ptr()) };
                HostLookup::Found(name.to_string_lossy().into_owned())
            }
            libc::EAI_AGAIN => HostLookup::RetryLater,
            code => {
                trace!(%addr, code, "getnameinfo failed");
                HostLookup::NotFound
            }
        }
    }
}

/// Fixed index to name table
#[derive(Debug, Default, Clone)]
pub struct StaticInterfaces {
    names: HashMap<u32, String>,
}

impl StaticInterfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, index: u32, name: &str) -> Self {
        self.names.insert(index, name.to_string());
        self
    }
}

impl InterfaceResolver for StaticInterfaces {
    fn index_to_name(&self, index: u32) -> Option<String> {
        self.names.get(&index).cloned()
    }
}

/// Fixed address to lookup-result table; unknown addresses are `NotFound`
#[derive(Debug, Default, Clone)]
pub struct StaticHosts {
    entries: HashMap<Ipv4Addr, HostLookup>,
}

impl StaticHosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, addr: Ipv4Addr, lookup: HostLookup) -> Self {
        self.entries.insert(addr, lookup);
        self
    }
}

impl HostnameResolver for StaticHosts {
    fn reverse_lookup(&self, addr: Ipv4Addr) -> HostLookup {
        self.entries
            .get(&addr)
            .cloned()
            .unwrap_or(HostLookup::NotFound)
    }
}

/// Turn a command-line host argument into an IPv4 address
///
/// Dotted-decimal literals are taken as is; anything else goes through the
/// system resolver and the first IPv4 answer wins.
pub fn resolve_host(host: &str) -> Result<Ipv4Addr> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    let addrs = (host, 0)
        .to_socket_addrs()
        .map_err(|_| ArpdumpError::HostNotFound(host.to_string()))?;

    addrs
        .filter_map(|sa| match sa {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .next()
        .inspect(|addr| debug!(host, %addr, "Resolved host argument"))
        .ok_or_else(|| ArpdumpError::HostNotFound(host.to_string()))
}
