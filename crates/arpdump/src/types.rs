//! Core types for decoded ARP entries
//!
//! Everything here is built while decoding one route message and dropped once
//! that entry has been printed.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - CM-8: System Component Inventory - Neighbor entries as network components
//! - IA-3: Device Identification - Link-layer addresses identify neighbors

use std::net::Ipv4Addr;

/// Interface types (IFT_* values from net/if_types.h)
pub mod ift {
    pub const ETHER: u8 = 0x06;
    pub const ISO88025: u8 = 0x09;
    pub const FDDI: u8 = 0x0f;
    pub const ATM: u8 = 0x25;
    pub const L2VLAN: u8 = 0x87;
    pub const IEEE1394: u8 = 0x90;
    pub const BRIDGE: u8 = 0xd1;
}

/// Ethernet hardware address length
pub const ETHER_ADDR_LEN: usize = 6;

/// `sin_other` bit marking a proxy-only (published) entry
pub const SIN_PROXY: u16 = 0x1;

/// `rtm_flags` bit for an announced (published) entry, RTF_PROTO2
pub const RTF_ANNOUNCE: i32 = 0x4000;

/// MAC address representation
///
/// # NIST Controls
/// - IA-3: Device Identification - MAC addresses for device identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Build from a raw link-layer address, if it is exactly six bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 6]>::try_from(bytes).ok().map(Self)
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Token-ring source routing information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRingRoute {
    /// Route control field, host byte order
    pub rcf: u16,
    /// Ring segment identifiers in record order, host byte order
    pub segments: Vec<u16>,
}

impl TokenRingRoute {
    /// Length of the routing information field encoded in `rcf`
    #[inline]
    pub fn rif_len(rcf: u16) -> usize {
        usize::from((rcf & 0x1f00) >> 8)
    }

    /// Number of segment identifiers that follow the route control field
    #[inline]
    pub fn segment_count(rcf: u16) -> usize {
        Self::rif_len(rcf).saturating_sub(2) / 2
    }
}

/// Link-layer medium of the interface owning an entry
///
/// Token-ring is the only medium with extra per-entry data, so the route
/// information lives on that variant alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Medium {
    Ethernet,
    Vlan,
    Bridge,
    TokenRing(Option<TokenRingRoute>),
    Fddi,
    Atm,
    FireWire,
    Other(u8),
}

impl Medium {
    /// Tag printed at the end of an entry, `None` for unknown media
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Ethernet => Some("ethernet"),
            Self::TokenRing(_) => Some("token-ring"),
            Self::Fddi => Some("fddi"),
            Self::Atm => Some("atm"),
            Self::Vlan => Some("vlan"),
            Self::FireWire => Some("firewire"),
            Self::Bridge => Some("bridge"),
            Self::Other(_) => None,
        }
    }

    /// Media whose six-byte addresses print in MAC notation
    #[inline]
    pub fn is_ethernet_like(&self) -> bool {
        matches!(self, Self::Ethernet | Self::Vlan | Self::Bridge)
    }
}

/// Decoded route message header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRecord {
    /// Total message length, the stride to the next record
    pub msglen: u16,
    pub version: u8,
    pub msg_type: u8,
    pub flags: i32,
    /// Absolute expiry in monotonic seconds, 0 means permanent
    pub expire: u64,
}

impl RouteRecord {
    #[inline]
    pub fn is_announced(&self) -> bool {
        self.flags & RTF_ANNOUNCE != 0
    }

    #[inline]
    pub fn is_permanent(&self) -> bool {
        self.expire == 0
    }
}

/// Protocol address of an entry (sockaddr_inarp)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolAddress {
    pub addr: Ipv4Addr,
    pub other: u16,
}

impl ProtocolAddress {
    #[inline]
    pub fn is_proxy(&self) -> bool {
        self.other & SIN_PROXY != 0
    }
}

/// Link-layer address of an entry (sockaddr_dl)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAddress {
    pub index: u16,
    pub medium: Medium,
    /// Hardware address bytes; empty when the entry is incomplete
    pub addr: Vec<u8>,
}

impl LinkAddress {
    #[inline]
    pub fn is_incomplete(&self) -> bool {
        self.addr.is_empty()
    }

    /// The address as a MAC, when the medium prints it that way
    pub fn mac(&self) -> Option<MacAddress> {
        if self.medium.is_ethernet_like() {
            MacAddress::from_slice(&self.addr)
        } else {
            None
        }
    }
}

/// One decoded ARP table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpRecord {
    pub route: RouteRecord,
    pub proto: ProtocolAddress,
    pub link: LinkAddress,
}
