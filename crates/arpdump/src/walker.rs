//! Record walker over a neighbor table snapshot
//!
//! The cursor strides by each message's declared `rtm_msglen`, never by the
//! size of what was decoded: socket addresses are padded and the kernel may
//! append fields. Every stride is checked against the remaining buffer.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - SI-10: Information Input Validation - Bounds-checked cursor
//! - CM-8: System Component Inventory - Enumerate network neighbors

use crate::error::{ArpdumpError, Result};
use crate::resolve::InterfaceResolver;
use crate::types::ArpRecord;
use crate::wire::{self, rtm};
use std::net::Ipv4Addr;
use tracing::{debug, instrument, trace};

/// Owned neighbor table dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSnapshot {
    buf: Vec<u8>,
}

impl RawSnapshot {
    pub fn new(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    /// An empty table
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Lazily decode the records in order
    pub fn records(&self) -> Records<'_> {
        Records::new(&self.buf)
    }
}

/// Iterator over the records of a dump
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug)]
pub struct Records<'a> {
    buf: &'a [u8],
    cursor: usize,
    failed: bool,
}

impl<'a> Records<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            cursor: 0,
            failed: false,
        }
    }

    /// Current cursor position
    pub fn offset(&self) -> usize {
        self.cursor
    }

    /// Slice out the next message and move past it
    fn next_message(&mut self) -> Result<(usize, &'a [u8])> {
        let buf = self.buf;
        let offset = self.cursor;
        let remaining = &buf[offset..];

        let msglen = wire::peek_msglen(remaining)
            .map(usize::from)
            .ok_or_else(|| ArpdumpError::decode(offset, "truncated rtm_msglen"))?;

        if msglen == 0 {
            return Err(ArpdumpError::decode(offset, "zero-length record"));
        }
        if msglen < rtm::LEN {
            return Err(ArpdumpError::decode(
                offset,
                format!("rtm_msglen {msglen} shorter than rt_msghdr"),
            ));
        }
        if msglen > remaining.len() {
            return Err(ArpdumpError::decode(
                offset,
                format!(
                    "rtm_msglen {msglen} overruns buffer ({} bytes left)",
                    remaining.len()
                ),
            ));
        }

        self.cursor += msglen;
        Ok((offset, &remaining[..msglen]))
    }
}

impl Iterator for Records<'_> {
    type Item = Result<ArpRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.buf.len() {
            return None;
        }

        let decoded = self
            .next_message()
            .and_then(|(offset, msg)| wire::decode_record(msg, offset));
        if decoded.is_err() {
            self.failed = true;
        }
        Some(decoded)
    }
}

/// Which records an enumeration reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Only this address; `0.0.0.0` behaves like no filter
    pub address: Option<Ipv4Addr>,
    /// Only entries on this interface
    pub interface: Option<String>,
}

impl Filter {
    pub fn address(mut self, addr: Ipv4Addr) -> Self {
        self.address = Some(addr);
        self
    }

    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interface = Some(name.into());
        self
    }

    fn target(&self) -> Option<Ipv4Addr> {
        self.address.filter(|addr| !addr.is_unspecified())
    }
}

/// Summary of one enumeration pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Records decoded, filtered or not
    pub decoded: usize,
    /// Records handed to the visitor
    pub visited: usize,
    /// Cursor position when the walk ended
    pub end_offset: usize,
    /// The address filter matched at least once
    pub found_entry: bool,
}

impl WalkOutcome {
    /// 1 when the address filter matched, 0 otherwise
    pub fn matched(&self) -> u32 {
        u32::from(self.found_entry)
    }
}

/// Walks a snapshot and applies the filters
pub struct RecordWalker<'r> {
    interfaces: &'r dyn InterfaceResolver,
}

impl<'r> RecordWalker<'r> {
    pub fn new(interfaces: &'r dyn InterfaceResolver) -> Self {
        Self { interfaces }
    }

    /// Visit every record that passes `filter`
    ///
    /// The snapshot is consumed and released when the pass ends. A decode
    /// error or a visitor error stops the walk.
    #[instrument(skip_all, fields(bytes = snapshot.len()))]
    pub fn enumerate<F>(
        &self,
        snapshot: RawSnapshot,
        filter: &Filter,
        mut visit: F,
    ) -> Result<WalkOutcome>
    where
        F: FnMut(&ArpRecord) -> Result<()>,
    {
        let target = filter.target();
        let mut outcome = WalkOutcome::default();
        let mut records = snapshot.records();

        for record in records.by_ref() {
            let record = record?;
            outcome.decoded += 1;

            if let Some(wanted) = filter.interface.as_deref() {
                let index = u32::from(record.link.index);
                match self.interfaces.index_to_name(index) {
                    Some(name) if name == wanted => {}
                    name => {
                        trace!(index, ?name, wanted, "Skipping entry on other interface");
                        continue;
                    }
                }
            }

            if let Some(wanted) = target {
                if record.proto.addr != wanted {
                    continue;
                }
                outcome.found_entry = true;
            }

            visit(&record)?;
            outcome.visited += 1;
        }

        outcome.end_offset = records.offset();
        debug!(
            decoded = outcome.decoded,
            visited = outcome.visited,
            found = outcome.found_entry,
            "Walked neighbor table"
        );
        Ok(outcome)
    }
}
