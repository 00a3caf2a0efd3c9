//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ip::AddressFamily;

// Route origin types known to the RIB.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    System,
    Kernel,
    Connected,
    Static,
    Rip,
    Ripng,
    Ospf,
    Ospf6,
    Isis,
    Bgp,
    Pim,
    Eigrp,
    Nhrp,
    Hsls,
    Olsr,
    Table,
    Ldp,
    Vnc,
    VncDirect,
    Babel,
    Sharp,
}

// ===== impl Protocol =====

impl Protocol {
    pub const ALL: [Protocol; 21] = [
        Protocol::System,
        Protocol::Kernel,
        Protocol::Connected,
        Protocol::Static,
        Protocol::Rip,
        Protocol::Ripng,
        Protocol::Ospf,
        Protocol::Ospf6,
        Protocol::Isis,
        Protocol::Bgp,
        Protocol::Pim,
        Protocol::Eigrp,
        Protocol::Nhrp,
        Protocol::Hsls,
        Protocol::Olsr,
        Protocol::Table,
        Protocol::Ldp,
        Protocol::Vnc,
        Protocol::VncDirect,
        Protocol::Babel,
        Protocol::Sharp,
    ];

    // Single-character code used in the route table legend.
    pub fn route_char(&self) -> char {
        match self {
            Protocol::System => 'X',
            Protocol::Kernel => 'K',
            Protocol::Connected => 'C',
            Protocol::Static => 'S',
            Protocol::Rip => 'R',
            Protocol::Ripng => 'R',
            Protocol::Ospf => 'O',
            Protocol::Ospf6 => 'O',
            Protocol::Isis => 'I',
            Protocol::Bgp => 'B',
            Protocol::Pim => 'P',
            Protocol::Eigrp => 'E',
            Protocol::Nhrp => 'N',
            Protocol::Hsls => 'H',
            Protocol::Olsr => 'o',
            Protocol::Table => 'T',
            Protocol::Ldp => 'L',
            Protocol::Vnc => 'v',
            Protocol::VncDirect => 'V',
            Protocol::Babel => 'A',
            Protocol::Sharp => 'D',
        }
    }

    // Parses a protocol name as accepted by the per-protocol show filter.
    //
    // The set of accepted names depends on the address family.
    pub fn from_redist_name(af: AddressFamily, name: &str) -> Option<Protocol> {
        let protocol = match (af, name) {
            (_, "kernel") => Protocol::Kernel,
            (_, "babel") => Protocol::Babel,
            (_, "connected") => Protocol::Connected,
            (_, "static") => Protocol::Static,
            (_, "isis") => Protocol::Isis,
            (_, "bgp") => Protocol::Bgp,
            (_, "nhrp") => Protocol::Nhrp,
            (_, "table") => Protocol::Table,
            (_, "vnc") => Protocol::Vnc,
            (AddressFamily::Ipv4, "rip") => Protocol::Rip,
            (AddressFamily::Ipv4, "ospf") => Protocol::Ospf,
            (AddressFamily::Ipv4, "pim") => Protocol::Pim,
            (AddressFamily::Ipv4, "eigrp") => Protocol::Eigrp,
            (AddressFamily::Ipv6, "ripng") => Protocol::Ripng,
            (AddressFamily::Ipv6, "ospf6") => Protocol::Ospf6,
            _ => return None,
        };
        Some(protocol)
    }

    // Whether the route age is appended to route table lines.
    pub fn shows_age(&self) -> bool {
        matches!(
            self,
            Protocol::Rip
                | Protocol::Ospf
                | Protocol::Isis
                | Protocol::Nhrp
                | Protocol::Table
                | Protocol::Bgp
        )
    }

    // Whether distance and metric are shown for routes of this type.
    pub fn shows_distance(&self) -> bool {
        !matches!(self, Protocol::Connected | Protocol::Kernel)
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::System => write!(f, "system"),
            Protocol::Kernel => write!(f, "kernel"),
            Protocol::Connected => write!(f, "connected"),
            Protocol::Static => write!(f, "static"),
            Protocol::Rip => write!(f, "rip"),
            Protocol::Ripng => write!(f, "ripng"),
            Protocol::Ospf => write!(f, "ospf"),
            Protocol::Ospf6 => write!(f, "ospf6"),
            Protocol::Isis => write!(f, "isis"),
            Protocol::Bgp => write!(f, "bgp"),
            Protocol::Pim => write!(f, "pim"),
            Protocol::Eigrp => write!(f, "eigrp"),
            Protocol::Nhrp => write!(f, "nhrp"),
            Protocol::Hsls => write!(f, "hsls"),
            Protocol::Olsr => write!(f, "olsr"),
            Protocol::Table => write!(f, "table"),
            Protocol::Ldp => write!(f, "ldp"),
            Protocol::Vnc => write!(f, "vnc"),
            Protocol::VncDirect => write!(f, "vnc-direct"),
            Protocol::Babel => write!(f, "babel"),
            Protocol::Sharp => write!(f, "sharp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Protocol::ALL
            .into_iter()
            .find(|protocol| protocol.to_string() == s)
            .ok_or(())
    }
}

// ===== unit tests =====
