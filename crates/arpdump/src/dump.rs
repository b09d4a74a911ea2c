//! ArpDump - acquire, walk and print one neighbor table snapshot
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - CM-8: System Component Inventory - Report network neighbors
//! - AU-3: Content of Audit Records - One line per neighbor with full detail

use crate::error::Result;
use crate::format::{EntryFormatter, FormatContext};
use crate::resolve::{HostnameResolver, InterfaceResolver, SystemHosts, SystemInterfaces};
use crate::snapshot::{SnapshotSource, acquire_snapshot, system_source};
use crate::walker::{Filter, RecordWalker, WalkOutcome};
use std::io::Write;
use std::net::Ipv4Addr;
use tracing::{info, instrument};

/// One configured dump of the ARP table
pub struct ArpDump {
    source: Box<dyn SnapshotSource>,
    hosts: Box<dyn HostnameResolver>,
    interfaces: Box<dyn InterfaceResolver>,
    filter: Filter,
    resolve_hostnames: bool,
}

impl ArpDump {
    pub fn new(
        source: Box<dyn SnapshotSource>,
        hosts: Box<dyn HostnameResolver>,
        interfaces: Box<dyn InterfaceResolver>,
    ) -> Self {
        Self {
            source,
            hosts,
            interfaces,
            filter: Filter::default(),
            resolve_hostnames: false,
        }
    }

    /// This host's table with the system resolvers
    pub fn system() -> Self {
        Self::new(
            system_source(),
            Box::new(SystemHosts),
            Box::new(SystemInterfaces),
        )
    }

    /// Replace the snapshot source, e.g. with a captured dump
    pub fn with_source(mut self, source: Box<dyn SnapshotSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_hostname_lookup(mut self, enabled: bool) -> Self {
        self.resolve_hostnames = enabled;
        self
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Print every entry passing the filter to `out`, one per line
    #[instrument(skip_all)]
    pub fn run(&mut self, out: &mut dyn Write) -> Result<WalkOutcome> {
        let snapshot = acquire_snapshot(self.source.as_mut())?;
        let mut ctx = FormatContext::new(self.resolve_hostnames);
        let formatter = EntryFormatter::new(self.hosts.as_ref(), self.interfaces.as_ref());
        let walker = RecordWalker::new(self.interfaces.as_ref());

        let outcome = walker.enumerate(snapshot, &self.filter, |record| {
            let line = formatter.format(record, &mut ctx);
            writeln!(out, "{line}")?;
            Ok(())
        })?;
        out.flush()?;

        info!(entries = outcome.visited, "Dumped ARP table");
        Ok(outcome)
    }

    /// Print the entry for `addr`, returning whether one was found
    pub fn search(&mut self, addr: Ipv4Addr, out: &mut dyn Write) -> Result<bool> {
        self.filter.address = Some(addr);
        let outcome = self.run(out)?;
        Ok(outcome.matched() == 1)
    }
}

/// The line printed when a searched-for host has no entry
pub fn no_entry_line(host: &str, addr: Ipv4Addr, interface: Option<&str>) -> String {
    match interface {
        Some(name) => format!("{host} ({addr}) -- no entry on {name}"),
        None => format!("{host} ({addr}) -- no entry"),
    }
}
