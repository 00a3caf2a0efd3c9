//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use serde::{Deserialize, Serialize};

// Address Family identifier.
//
// IANA registry:
// http://www.iana.org/assignments/address-family-numbers
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum AddressFamily {
    Ipv4 = 1,
    Ipv6 = 2,
}

// Subsequent Address Family identifier.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum Safi {
    Unicast = 1,
    Multicast = 2,
}

// Container for storing separate values for IPv4 and IPv6.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AddressFamilies<T> {
    pub ipv4: T,
    pub ipv6: T,
}

// Extension methods for IpAddr.
pub trait IpAddrExt {
    // Returns the address family of this address.
    fn address_family(&self) -> AddressFamily;

    // Converts this IP address into a host prefix network.
    fn to_host_prefix(&self) -> IpNetwork;

    // Parses an address of the given address family.
    fn parse_af(af: AddressFamily, s: &str) -> Option<IpAddr>;
}

// Extension methods for IpNetwork.
pub trait IpNetworkExt {
    // Apply mask to prefix.
    #[must_use]
    fn apply_mask(&self) -> IpNetwork;

    // Returns the address family of this prefix.
    fn address_family(&self) -> AddressFamily;

    // Returns true if this prefix covers the other one (equal or shorter,
    // same leading bits).
    fn covers(&self, other: &IpNetwork) -> bool;

    // Parses a prefix of the given address family.
    //
    // A bare address is accepted and yields a host prefix. Host bits are
    // kept as given.
    fn parse_af(af: AddressFamily, s: &str) -> Option<IpNetwork>;
}

// Extension methods for Ipv4Addr.
pub trait Ipv4AddrExt {
    // Returns the prefix length of the given netmask, counting its leading
    // one bits.
    fn mask_len(&self) -> u8;

    // Returns the natural prefix length of the address class, if any.
    //
    // Class D and E addresses have no natural boundary.
    fn classful_prefixlen(&self) -> Option<u8>;
}

// Extension methods for Ipv4Network.
pub trait Ipv4NetworkExt {
    const MAX_PREFIXLEN: u8;

    // Apply mask to prefix.
    #[must_use]
    fn apply_mask(&self) -> Ipv4Network;

    // Returns true if this prefix is shorter than the natural boundary of
    // its address class.
    fn is_supernet(&self) -> bool;
}

// Extension methods for Ipv6Network.
pub trait Ipv6NetworkExt {
    const MAX_PREFIXLEN: u8;

    // Apply mask to prefix.
    #[must_use]
    fn apply_mask(&self) -> Ipv6Network;
}

// ===== impl AddressFamily =====

impl AddressFamily {
    // Returns the keyword used by the command surface for this family.
    pub fn cmd_keyword(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "ip",
            AddressFamily::Ipv6 => "ipv6",
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "IPv4"),
            AddressFamily::Ipv6 => write!(f, "IPv6"),
        }
    }
}

// ===== impl Safi =====

impl std::fmt::Display for Safi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Safi::Unicast => write!(f, "unicast"),
            Safi::Multicast => write!(f, "multicast"),
        }
    }
}

// ===== impl AddressFamilies =====

impl<T> AddressFamilies<T> {
    // Returns a reference to the value corresponding to the given address
    // family.
    pub fn get(&self, af: AddressFamily) -> &T {
        match af {
            AddressFamily::Ipv4 => &self.ipv4,
            AddressFamily::Ipv6 => &self.ipv6,
        }
    }

    // Returns a mutable reference to the value corresponding to the given
    // address family.
    pub fn get_mut(&mut self, af: AddressFamily) -> &mut T {
        match af {
            AddressFamily::Ipv4 => &mut self.ipv4,
            AddressFamily::Ipv6 => &mut self.ipv6,
        }
    }

    // Returns an iterator over immutable references to all address family
    // values.
    pub fn iter(&self) -> impl Iterator<Item = (AddressFamily, &T)> {
        [
            (AddressFamily::Ipv4, &self.ipv4),
            (AddressFamily::Ipv6, &self.ipv6),
        ]
        .into_iter()
    }
}

// ===== impl IpAddr =====

impl IpAddrExt for IpAddr {
    fn address_family(&self) -> AddressFamily {
        match self {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    fn to_host_prefix(&self) -> IpNetwork {
        match self {
            IpAddr::V4(addr) => {
                Ipv4Network::new(*addr, Ipv4Network::MAX_PREFIXLEN)
                    .unwrap()
                    .into()
            }
            IpAddr::V6(addr) => {
                Ipv6Network::new(*addr, Ipv6Network::MAX_PREFIXLEN)
                    .unwrap()
                    .into()
            }
        }
    }

    fn parse_af(af: AddressFamily, s: &str) -> Option<IpAddr> {
        match af {
            AddressFamily::Ipv4 => Ipv4Addr::from_str(s).ok().map(IpAddr::V4),
            AddressFamily::Ipv6 => Ipv6Addr::from_str(s).ok().map(IpAddr::V6),
        }
    }
}

// ===== impl IpNetwork =====

impl IpNetworkExt for IpNetwork {
    fn apply_mask(&self) -> IpNetwork {
        match self {
            IpNetwork::V4(prefix) => {
                IpNetwork::V4(Ipv4NetworkExt::apply_mask(prefix))
            }
            IpNetwork::V6(prefix) => {
                IpNetwork::V6(Ipv6NetworkExt::apply_mask(prefix))
            }
        }
    }

    fn address_family(&self) -> AddressFamily {
        match self {
            IpNetwork::V4(_) => AddressFamily::Ipv4,
            IpNetwork::V6(_) => AddressFamily::Ipv6,
        }
    }

    fn covers(&self, other: &IpNetwork) -> bool {
        match (self.apply_mask(), other) {
            (IpNetwork::V4(a), IpNetwork::V4(b)) => a.is_supernet_of(*b),
            (IpNetwork::V6(a), IpNetwork::V6(b)) => a.is_supernet_of(*b),
            _ => false,
        }
    }

    fn parse_af(af: AddressFamily, s: &str) -> Option<IpNetwork> {
        let prefix = IpNetwork::from_str(s).ok()?;
        (prefix.address_family() == af).then_some(prefix)
    }
}

// ===== impl Ipv4Addr =====

impl Ipv4AddrExt for Ipv4Addr {
    fn mask_len(&self) -> u8 {
        u32::from(*self).leading_ones() as u8
    }

    fn classful_prefixlen(&self) -> Option<u8> {
        let addr = u32::from(*self);
        if addr & 0x8000_0000 == 0 {
            // Class A.
            Some(8)
        } else if addr & 0xc000_0000 == 0x8000_0000 {
            // Class B.
            Some(16)
        } else if addr & 0xe000_0000 == 0xc000_0000 {
            // Class C.
            Some(24)
        } else {
            None
        }
    }
}

// ===== impl Ipv4Network =====

impl Ipv4NetworkExt for Ipv4Network {
    const MAX_PREFIXLEN: u8 = 32;

    fn apply_mask(&self) -> Ipv4Network {
        Ipv4Network::new(self.network(), self.prefix()).unwrap()
    }

    fn is_supernet(&self) -> bool {
        match self.ip().classful_prefixlen() {
            Some(plen) => self.prefix() < plen,
            None => true,
        }
    }
}

// ===== impl Ipv6Network =====

impl Ipv6NetworkExt for Ipv6Network {
    const MAX_PREFIXLEN: u8 = 128;

    fn apply_mask(&self) -> Ipv6Network {
        Ipv6Network::new(self.network(), self.prefix()).unwrap()
    }
}

// ===== unit tests =====
