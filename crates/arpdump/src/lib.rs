//! ARP table dump for SONiC
//!
//! This crate reads the host's IPv4 neighbor cache through the BSD routing
//! sysctl (`NET_RT_FLAGS`), decodes the packed route messages the kernel
//! returns and prints one line per entry, in the format of `arp -a`.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//!
//! | Control | Description | Implementation |
//! |---------|-------------|----------------|
//! | AC-3 | Access Enforcement | Kernel enforces routing sysctl access |
//! | CM-6 | Configuration Settings | TOML configuration file |
//! | CM-8 | System Component Inventory | Enumerate network neighbors |
//! | IA-3 | Device Identification | Link-layer address reporting |
//! | SI-10 | Input Validation | Bounds-checked route message decoding |
//! | SI-11 | Error Handling | Structured error types |
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Kernel         │     │  RecordWalker   │     │ EntryFormatter  │
//! │                 │     │                 │     │                 │
//! │  sysctl         │────▶│  rt_msghdr      │────▶│  addr / lladdr  │──▶ stdout
//! │  NET_RT_FLAGS   │     │  sockaddr_inarp │     │  expiry / flags │
//! │  (RawSnapshot)  │     │  sockaddr_dl    │     │  medium tag     │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!                                  │                       │
//!                          InterfaceResolver       HostnameResolver
//! ```

pub mod config;
pub mod dump;
pub mod error;
pub mod format;
pub mod resolve;
pub mod snapshot;
pub mod types;
pub mod walker;
pub mod wire;

pub use config::ArpdumpConfig;
pub use dump::{ArpDump, no_entry_line};
pub use error::{ArpdumpError, Result};
pub use format::{EntryFormatter, FormatContext, link_text};
pub use resolve::{
    HostLookup, HostnameResolver, InterfaceResolver, StaticHosts, StaticInterfaces, SystemHosts,
    SystemInterfaces, resolve_host,
};
pub use snapshot::{FetchOutcome, SnapshotSource, StaticSource, acquire_snapshot, system_source};
pub use types::{
    ArpRecord, LinkAddress, MacAddress, Medium, ProtocolAddress, RouteRecord, TokenRingRoute,
};
pub use walker::{Filter, RawSnapshot, RecordWalker, Records, WalkOutcome};
