//! Entry formatter
//!
//! Renders one decoded entry as a single line:
//!
//! ```text
//! 10.0.0.1 (10.0.0.1) at 00:11:22:33:44:55 on em0 expires in 1187 seconds [ethernet]
//! ```
//!
//! The small caches that persist between entries (last interface name,
//! monotonic baseline, hostname-lookup switch) live in a [`FormatContext`]
//! owned by the caller, one per dump.

use crate::resolve::{HostLookup, HostnameResolver, InterfaceResolver};
use crate::types::{ArpRecord, LinkAddress, Medium};
use tracing::warn;

/// Per-dump formatter state
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    resolve_hostnames: bool,
    /// Monotonic seconds captured on first use. Later entries reuse it, so a
    /// long dump reports slightly longer lifetimes for its last entries.
    baseline: Option<i64>,
    last_interface: Option<(u16, String)>,
}

impl FormatContext {
    pub fn new(resolve_hostnames: bool) -> Self {
        Self {
            resolve_hostnames,
            ..Self::default()
        }
    }

    /// Pin the monotonic baseline instead of sampling the clock
    pub fn with_baseline(mut self, secs: i64) -> Self {
        self.baseline = Some(secs);
        self
    }

    /// Whether reverse lookups are still enabled
    pub fn resolve_hostnames(&self) -> bool {
        self.resolve_hostnames
    }

    fn baseline(&mut self) -> i64 {
        *self.baseline.get_or_insert_with(monotonic_secs)
    }

    fn interface_name(&mut self, index: u16, interfaces: &dyn InterfaceResolver) -> Option<&str> {
        let cached = matches!(&self.last_interface, Some((last, _)) if *last == index);
        if !cached {
            let name = interfaces.index_to_name(u32::from(index))?;
            self.last_interface = Some((index, name));
        }
        self.last_interface.as_ref().map(|(_, name)| name.as_str())
    }
}

fn monotonic_secs() -> i64 {
    use nix::time::{ClockId, clock_gettime};

    match clock_gettime(ClockId::CLOCK_MONOTONIC) {
        Ok(ts) => i64::from(ts.tv_sec()),
        Err(e) => {
            warn!(error = %e, "clock_gettime(CLOCK_MONOTONIC) failed");
            0
        }
    }
}

/// Formats decoded entries
pub struct EntryFormatter<'r> {
    hosts: &'r dyn HostnameResolver,
    interfaces: &'r dyn InterfaceResolver,
}

impl<'r> EntryFormatter<'r> {
    pub fn new(hosts: &'r dyn HostnameResolver, interfaces: &'r dyn InterfaceResolver) -> Self {
        Self { hosts, interfaces }
    }

    /// Render one entry, without the trailing newline
    pub fn format(&self, record: &ArpRecord, ctx: &mut FormatContext) -> String {
        let addr = record.proto.addr;
        let mut line = String::with_capacity(96);

        let host = self.display_name(record, ctx);
        line.push_str(&format!("{host} ({addr}) at "));
        line.push_str(&link_text(&record.link));

        if let Some(name) = ctx.interface_name(record.link.index, self.interfaces) {
            line.push_str(&format!(" on {name}"));
        }

        if record.route.is_permanent() {
            line.push_str(" permanent");
        } else {
            let expire = i64::try_from(record.route.expire).unwrap_or(i64::MAX);
            let remaining = expire.saturating_sub(ctx.baseline());
            if remaining > 0 {
                line.push_str(&format!(" expires in {remaining} seconds"));
            } else {
                line.push_str(" expired");
            }
        }

        if record.proto.is_proxy() {
            line.push_str(" published (proxy only)");
        }
        if record.route.is_announced() {
            line.push_str(" published");
        }

        if let Some(tag) = record.link.medium.tag() {
            line.push_str(&format!(" [{tag}]"));
        }
        if let Medium::TokenRing(Some(route)) = &record.link.medium {
            line.push_str(&format!(" rt={:x}", route.rcf));
            for seg in &route.segments {
                line.push_str(&format!(":{seg:x}"));
            }
        }

        line
    }

    fn display_name(&self, record: &ArpRecord, ctx: &mut FormatContext) -> String {
        let addr = record.proto.addr;
        if !ctx.resolve_hostnames {
            return addr.to_string();
        }

        match self.hosts.reverse_lookup(addr) {
            HostLookup::Found(name) => name,
            HostLookup::NotFound => "?".to_string(),
            HostLookup::RetryLater => {
                warn!(%addr, "Resolver asked to retry, disabling hostname lookups");
                ctx.resolve_hostnames = false;
                "?".to_string()
            }
        }
    }
}

/// Link-layer address text
///
/// Ethernet-like six-byte addresses use MAC notation. Everything else uses
/// the address part of the BSD link_ntoa form: each byte in hex without a
/// leading zero, separated by dots.
pub fn link_text(link: &LinkAddress) -> String {
    if link.is_incomplete() {
        return "(incomplete)".to_string();
    }
    if let Some(mac) = link.mac() {
        return mac.to_string();
    }

    let mut out = String::with_capacity(link.addr.len() * 3);
    for (i, byte) in link.addr.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&format!("{byte:x}"));
    }
    out
}
