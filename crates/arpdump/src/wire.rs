//! Kernel route message layout and decoding
//!
//! A `NET_RT_FLAGS` dump is a packed run of messages, each laid out as
//!
//! ```text
//! +----------------+------------------+-----+------------------+-----+---------+
//! | rt_msghdr      | sockaddr_inarp   | pad | sockaddr_dl      | pad | (extra) |
//! | 152 bytes      | sin_len bytes    |     | sdl_len bytes    |     |         |
//! +----------------+------------------+-----+------------------+-----+---------+
//! |<------------------------------ rtm_msglen ---------------------------------->|
//! ```
//!
//! Socket addresses are padded with `SA_SIZE` to `long` alignment. Multi-byte
//! header fields are in host order; token-ring route fields and the IPv4
//! address are in network order. The layout is the LP64 one.
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - SI-10: Information Input Validation - Every field read is bounds-checked

use crate::error::{ArpdumpError, Result};
use crate::types::{
    ArpRecord, LinkAddress, Medium, ProtocolAddress, RouteRecord, TokenRingRoute, ift,
};
use byteorder::{ByteOrder, NativeEndian, NetworkEndian};
use std::net::Ipv4Addr;
use tracing::trace;

type Field = std::ops::Range<usize>;

/// Route message version written by the kernel (RTM_VERSION)
pub const RTM_VERSION: u8 = 5;
/// RTM_GET, the message type of dumped entries
pub const RTM_GET: u8 = 0x4;
/// `long` alignment used by SA_SIZE
const SA_ALIGN: usize = std::mem::size_of::<u64>();

pub const AF_INET: u8 = 2;
pub const AF_LINK: u8 = 18;

/// rt_msghdr fields
pub mod rtm {
    use super::Field;

    pub const MSGLEN: Field = 0..2;
    pub const VERSION: usize = 2;
    pub const TYPE: usize = 3;
    pub const INDEX: Field = 4..6;
    pub const FLAGS: Field = 8..12;
    pub const ADDRS: Field = 12..16;
    /// rtm_rmx.rmx_expire
    pub const EXPIRE: Field = 64..72;
    pub const LEN: usize = 152;
}

/// sockaddr_inarp fields
pub mod sin {
    use super::Field;

    pub const LEN: usize = 0;
    pub const FAMILY: usize = 1;
    pub const ADDR: Field = 4..8;
    pub const OTHER: Field = 14..16;
    pub const SIZE: usize = 16;
}

/// sockaddr_dl fields
pub mod sdl {
    use super::Field;

    pub const LEN: usize = 0;
    pub const FAMILY: usize = 1;
    pub const INDEX: Field = 2..4;
    pub const TYPE: usize = 4;
    pub const NLEN: usize = 5;
    pub const ALEN: usize = 6;
    pub const SLEN: usize = 7;
    pub const DATA: usize = 8;
    /// Capacity of sdl_data
    pub const DATA_LEN: usize = 46;
    pub const SIZE: usize = DATA + DATA_LEN;
    /// Token-ring data never starts further than this into sdl_data
    pub const ISO88025_MAX_SKIP: usize = 12;
}

/// Space a socket address of length `len` occupies, padding included
#[inline]
pub fn sa_size(len: u8) -> usize {
    if len == 0 {
        SA_ALIGN
    } else {
        1 + ((usize::from(len) - 1) | (SA_ALIGN - 1))
    }
}

/// Read the declared length of the message starting at `buf[0]`
pub fn peek_msglen(buf: &[u8]) -> Option<u16> {
    buf.get(rtm::MSGLEN).map(NativeEndian::read_u16)
}

/// Decode one message. `msg` must be exactly the declared `rtm_msglen` span;
/// `offset` is only used for error reporting.
pub fn decode_record(msg: &[u8], offset: usize) -> Result<ArpRecord> {
    let hdr = msg
        .get(..rtm::LEN)
        .ok_or_else(|| ArpdumpError::decode(offset, "message shorter than rt_msghdr"))?;

    let route = RouteRecord {
        msglen: NativeEndian::read_u16(&hdr[rtm::MSGLEN]),
        version: hdr[rtm::VERSION],
        msg_type: hdr[rtm::TYPE],
        flags: NativeEndian::read_i32(&hdr[rtm::FLAGS]),
        expire: NativeEndian::read_u64(&hdr[rtm::EXPIRE]),
    };

    let sin_at = rtm::LEN;
    let sin = msg
        .get(sin_at..sin_at + sin::SIZE)
        .ok_or_else(|| ArpdumpError::decode(offset + sin_at, "protocol address truncated"))?;
    let proto = ProtocolAddress {
        addr: Ipv4Addr::from(NetworkEndian::read_u32(&sin[sin::ADDR])),
        other: NativeEndian::read_u16(&sin[sin::OTHER]),
    };

    let sdl_at = sin_at + sa_size(sin[sin::LEN]);
    let link = decode_link(msg, sdl_at, offset)?;

    trace!(
        offset,
        msglen = route.msglen,
        addr = %proto.addr,
        index = link.index,
        "Decoded route message"
    );

    Ok(ArpRecord { route, proto, link })
}

fn decode_link(msg: &[u8], at: usize, offset: usize) -> Result<LinkAddress> {
    let hdr = msg
        .get(at..at + sdl::DATA)
        .ok_or_else(|| ArpdumpError::decode(offset + at, "link address truncated"))?;

    let nlen = usize::from(hdr[sdl::NLEN]);
    let alen = usize::from(hdr[sdl::ALEN]);
    let slen = usize::from(hdr[sdl::SLEN]);
    if nlen + alen > sdl::DATA_LEN {
        return Err(ArpdumpError::decode(
            offset + at,
            format!("link address length {nlen}+{alen} exceeds sdl_data"),
        ));
    }
    let sdl_len = usize::from(hdr[sdl::LEN]);
    if sdl::DATA + nlen + alen > sdl_len {
        return Err(ArpdumpError::decode(
            offset + at,
            format!("link address length {nlen}+{alen} exceeds sdl_len {sdl_len}"),
        ));
    }

    let data_at = at + sdl::DATA;
    let addr = msg
        .get(data_at + nlen..data_at + nlen + alen)
        .ok_or_else(|| ArpdumpError::decode(offset + at, "link address bytes past message end"))?
        .to_vec();

    let medium = match hdr[sdl::TYPE] {
        ift::ETHER => Medium::Ethernet,
        ift::L2VLAN => Medium::Vlan,
        ift::BRIDGE => Medium::Bridge,
        ift::ISO88025 => {
            let skip = (nlen + alen + slen).min(sdl::ISO88025_MAX_SKIP);
            Medium::TokenRing(decode_token_ring(msg, data_at + skip))
        }
        ift::FDDI => Medium::Fddi,
        ift::ATM => Medium::Atm,
        ift::IEEE1394 => Medium::FireWire,
        other => Medium::Other(other),
    };

    Ok(LinkAddress {
        index: NativeEndian::read_u16(&hdr[sdl::INDEX]),
        medium,
        addr,
    })
}

/// Route information for a token-ring entry. `None` when the route control
/// field is zero or absent. Segments that would run past the message are
/// dropped.
fn decode_token_ring(msg: &[u8], at: usize) -> Option<TokenRingRoute> {
    let rcf = NetworkEndian::read_u16(msg.get(at..at + 2)?);
    if rcf == 0 {
        return None;
    }

    let segments = (0..TokenRingRoute::segment_count(rcf))
        .map_while(|seg| {
            let start = at + 2 + seg * 2;
            msg.get(start..start + 2).map(NetworkEndian::read_u16)
        })
        .collect();

    Some(TokenRingRoute { rcf, segments })
}

/// Encoder for route messages in the kernel layout
///
/// Used to build synthetic dumps for tests, benchmarks and fixtures.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    addr: Ipv4Addr,
    other: u16,
    flags: i32,
    expire: u64,
    index: u16,
    ift: u8,
    name: Vec<u8>,
    lladdr: Vec<u8>,
    token_ring: Option<(u16, Vec<u16>)>,
    trailing: usize,
}

impl RecordBuilder {
    pub fn new(addr: Ipv4Addr) -> Self {
        Self {
            addr,
            other: 0,
            flags: 0,
            expire: 0,
            index: 1,
            ift: ift::ETHER,
            name: Vec::new(),
            lladdr: Vec::new(),
            token_ring: None,
            trailing: 0,
        }
    }

    pub fn other(mut self, other: u16) -> Self {
        self.other = other;
        self
    }

    pub fn flags(mut self, flags: i32) -> Self {
        self.flags = flags;
        self
    }

    pub fn expire(mut self, expire: u64) -> Self {
        self.expire = expire;
        self
    }

    pub fn index(mut self, index: u16) -> Self {
        self.index = index;
        self
    }

    pub fn ift(mut self, ift: u8) -> Self {
        self.ift = ift;
        self
    }

    /// Interface name embedded in sdl_data ahead of the address
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.as_bytes().to_vec();
        self
    }

    pub fn lladdr(mut self, lladdr: &[u8]) -> Self {
        self.lladdr = lladdr.to_vec();
        self
    }

    /// Token-ring route control field and segments, both host order
    pub fn token_ring(mut self, rcf: u16, segments: &[u16]) -> Self {
        self.ift = ift::ISO88025;
        self.token_ring = Some((rcf, segments.to_vec()));
        self
    }

    /// Extra bytes after the link address, covered by `rtm_msglen`
    pub fn trailing(mut self, bytes: usize) -> Self {
        self.trailing = bytes;
        self
    }

    /// Append the encoded message to `buf`
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        let sdl_len = sdl::SIZE;
        let total = rtm::LEN + sa_size(sin::SIZE as u8) + sa_size(sdl_len as u8) + self.trailing;
        buf.resize(start + total, 0);
        let msg = &mut buf[start..];

        NativeEndian::write_u16(&mut msg[rtm::MSGLEN], total as u16);
        msg[rtm::VERSION] = RTM_VERSION;
        msg[rtm::TYPE] = RTM_GET;
        NativeEndian::write_u16(&mut msg[rtm::INDEX], self.index);
        NativeEndian::write_i32(&mut msg[rtm::FLAGS], self.flags);
        // RTA_DST | RTA_GATEWAY
        NativeEndian::write_i32(&mut msg[rtm::ADDRS], 0x3);
        NativeEndian::write_u64(&mut msg[rtm::EXPIRE], self.expire);

        let sin_msg = &mut msg[rtm::LEN..];
        sin_msg[sin::LEN] = sin::SIZE as u8;
        sin_msg[sin::FAMILY] = AF_INET;
        sin_msg[sin::ADDR].copy_from_slice(&self.addr.octets());
        NativeEndian::write_u16(&mut sin_msg[sin::OTHER], self.other);

        let sdl_msg = &mut msg[rtm::LEN + sa_size(sin::SIZE as u8)..];
        sdl_msg[sdl::LEN] = sdl_len as u8;
        sdl_msg[sdl::FAMILY] = AF_LINK;
        NativeEndian::write_u16(&mut sdl_msg[sdl::INDEX], self.index);
        sdl_msg[sdl::TYPE] = self.ift;
        sdl_msg[sdl::NLEN] = self.name.len() as u8;
        sdl_msg[sdl::ALEN] = self.lladdr.len() as u8;

        let data = &mut sdl_msg[sdl::DATA..sdl::SIZE];
        let nlen = self.name.len();
        data[..nlen].copy_from_slice(&self.name);
        data[nlen..nlen + self.lladdr.len()].copy_from_slice(&self.lladdr);

        if let Some((rcf, segments)) = &self.token_ring {
            let at = (nlen + self.lladdr.len()).min(sdl::ISO88025_MAX_SKIP);
            NetworkEndian::write_u16(&mut data[at..at + 2], *rcf);
            for (i, seg) in segments.iter().enumerate() {
                let seg_at = at + 2 + i * 2;
                NetworkEndian::write_u16(&mut data[seg_at..seg_at + 2], *seg);
            }
        }
    }

    /// Encode as a standalone message
    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }
}

/// Concatenate encoded messages into one dump
pub fn encode_dump(records: &[RecordBuilder]) -> Vec<u8> {
    let mut buf = Vec::new();
    for record in records {
        record.encode_into(&mut buf);
    }
    buf
}

/// Offset of the sockaddr_dl inside a message built by [`RecordBuilder`]
pub const BUILT_SDL_OFFSET: usize = rtm::LEN + sin::SIZE;
