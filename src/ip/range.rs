//! CIDR address ranges.
//!
//! An [`AddressRange`] is an aligned power-of-two block of addresses. Both
//! families are stored as a `u128` so the allocation math is shared; the
//! family tag decides the bit width and how addresses are printed.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};

use crate::error::{AllocError, Result};

/// Address family of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Width of an address in bits
    pub fn bits(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }

    /// Largest address representable in this family
    pub fn max_address(self) -> u128 {
        match self {
            AddressFamily::V4 => u32::MAX as u128,
            AddressFamily::V6 => u128::MAX,
        }
    }

    /// Render an integer address in this family
    pub fn format_address(self, addr: u128) -> IpAddr {
        match self {
            AddressFamily::V4 => IpAddr::V4(Ipv4Addr::from(addr as u32)),
            AddressFamily::V6 => IpAddr::V6(Ipv6Addr::from(addr)),
        }
    }
}

/// Mask covering the host bits of a block with the given prefix
fn host_mask(family: AddressFamily, prefix_len: u8) -> u128 {
    let host_bits = u32::from(family.bits() - prefix_len);
    if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    }
}

/// An aligned CIDR block
///
/// The base is always the network address: constructors clear any host bits,
/// so `10.0.0.5/24` becomes `10.0.0.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddressRange {
    family: AddressFamily,
    base: u128,
    prefix_len: u8,
}

impl AddressRange {
    /// Build a range from an integer base, aligning the base down to the block size
    pub fn new(family: AddressFamily, base: u128, prefix_len: u8) -> Result<Self> {
        if prefix_len > family.bits() {
            return Err(AllocError::InvalidAddressFormat {
                input: format!("{}/{}", base, prefix_len),
                reason: format!("prefix length must be at most {}", family.bits()),
            });
        }
        if base > family.max_address() {
            return Err(AllocError::InvalidAddressFormat {
                input: format!("{}/{}", base, prefix_len),
                reason: "address does not fit the address family".to_string(),
            });
        }
        let base = base & !host_mask(family, prefix_len);
        Ok(AddressRange { family, base, prefix_len })
    }

    /// Parse CIDR notation (`10.0.0.0/24`) or a bare address, which gets a host mask
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let invalid = |reason: String| AllocError::InvalidAddressFormat {
            input: trimmed.to_string(),
            reason,
        };

        if trimmed.contains('/') {
            let net: IpNet = trimmed.parse().map_err(|e| invalid(format!("{}", e)))?;
            Ok(Self::from(net))
        } else {
            let addr: IpAddr = trimmed.parse().map_err(|e| invalid(format!("{}", e)))?;
            Ok(Self::host(addr))
        }
    }

    /// Single-address range for `addr`
    pub fn host(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => AddressRange {
                family: AddressFamily::V4,
                base: u32::from(v4) as u128,
                prefix_len: 32,
            },
            IpAddr::V6(v6) => AddressRange {
                family: AddressFamily::V6,
                base: u128::from(v6),
                prefix_len: 128,
            },
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Integer form of the network address
    pub fn base(&self) -> u128 {
        self.base
    }

    /// Integer form of the broadcast address
    pub fn last(&self) -> u128 {
        self.base | host_mask(self.family, self.prefix_len)
    }

    pub fn network_address(&self) -> IpAddr {
        self.family.format_address(self.base)
    }

    pub fn broadcast_address(&self) -> IpAddr {
        self.family.format_address(self.last())
    }

    /// Number of addresses in the block.
    ///
    /// Saturates at `u128::MAX` for `::/0`, the only block whose size does not fit.
    pub fn num_addresses(&self) -> u128 {
        host_mask(self.family, self.prefix_len).saturating_add(1)
    }

    /// Addresses left once the network and broadcast addresses are reserved
    pub fn usable_host_count(&self) -> u128 {
        let size = self.num_addresses();
        if size >= 2 {
            size - 2
        } else {
            0
        }
    }

    /// True if `other` lies entirely within this range
    pub fn contains(&self, other: &AddressRange) -> bool {
        self.family == other.family && self.base <= other.base && other.last() <= self.last()
    }

    /// True if the two ranges share at least one address
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.family == other.family && self.base <= other.last() && other.base <= self.last()
    }

    /// Enclosing block whose prefix is `prefix_growth` bits shorter.
    ///
    /// Used to infer a summary when none is given. The prefix stops at zero.
    pub fn supernet_containing(&self, prefix_growth: u8) -> AddressRange {
        let prefix_len = self.prefix_len.saturating_sub(prefix_growth);
        AddressRange {
            family: self.family,
            base: self.base & !host_mask(self.family, prefix_len),
            prefix_len,
        }
    }

    /// Same prefix length at a new base, floor-aligned to the block size
    pub fn with_base(&self, base: u128) -> Result<AddressRange> {
        AddressRange::new(self.family, base, self.prefix_len)
    }

    /// Same base with a new prefix length.
    ///
    /// Fails if the base is not a network address of the new block size.
    pub fn with_prefix_len(&self, prefix_len: u8) -> Result<AddressRange> {
        let resized = AddressRange::new(self.family, self.base, prefix_len)?;
        if resized.base != self.base {
            return Err(AllocError::MisalignedResize {
                range: self.to_string(),
                prefix_len,
            });
        }
        Ok(resized)
    }
}

impl From<IpNet> for AddressRange {
    fn from(net: IpNet) -> Self {
        match net.trunc() {
            IpNet::V4(v4) => AddressRange {
                family: AddressFamily::V4,
                base: u32::from(v4.network()) as u128,
                prefix_len: v4.prefix_len(),
            },
            IpNet::V6(v6) => AddressRange {
                family: AddressFamily::V6,
                base: u128::from(v6.network()),
                prefix_len: v6.prefix_len(),
            },
        }
    }
}

impl From<AddressRange> for IpNet {
    fn from(range: AddressRange) -> Self {
        // Prefix lengths are bounded by the family width at construction.
        match range.family {
            AddressFamily::V4 => IpNet::V4(Ipv4Net::new_assert(
                Ipv4Addr::from(range.base as u32),
                range.prefix_len,
            )),
            AddressFamily::V6 => {
                IpNet::V6(Ipv6Net::new_assert(Ipv6Addr::from(range.base), range.prefix_len))
            }
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_address(), self.prefix_len)
    }
}

impl FromStr for AddressRange {
    type Err = AllocError;

    fn from_str(s: &str) -> Result<Self> {
        AddressRange::parse(s)
    }
}

impl TryFrom<String> for AddressRange {
    type Error = AllocError;

    fn try_from(value: String) -> Result<Self> {
        AddressRange::parse(&value)
    }
}

impl From<AddressRange> for String {
    fn from(range: AddressRange) -> Self {
        range.to_string()
    }
}
