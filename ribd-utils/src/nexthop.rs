//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ip::{AddressFamily, IpAddrExt};
use crate::mpls::LabelStack;

// RIB nexthop.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Nexthop {
    pub kind: NexthopKind,
    // Egress interface. `None` when no interface was given. Static nexthops
    // referencing an interface that doesn't exist yet carry ifindex 0.
    pub ifindex: Option<u32>,
    // Preferred source address.
    pub src: Option<IpAddr>,
    pub labels: LabelStack,
    pub flags: NexthopFlags,
    // Nexthops this one recursively resolves through.
    pub resolved: Vec<Nexthop>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum NexthopKind {
    Address(IpAddr),
    Interface,
    Blackhole,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct NexthopFlags: u8 {
        const ACTIVE = 0x01;
        const FIB = 0x02;
        const ONLINK = 0x04;
        const RECURSIVE = 0x08;
        // Egress interface learned from a connected route.
        const IFINDEX_RESOLVED = 0x10;
    }
}

// Depth-first iterator over a nexthop list and its recursive resolutions.
#[derive(Debug)]
pub struct NexthopIter<'a> {
    stack: Vec<(usize, std::slice::Iter<'a, Nexthop>)>,
}

// ===== impl Nexthop =====

impl Nexthop {
    pub fn address(addr: IpAddr, ifindex: Option<u32>) -> Nexthop {
        Nexthop::from_kind(NexthopKind::Address(addr), ifindex)
    }

    pub fn interface(ifindex: Option<u32>) -> Nexthop {
        Nexthop::from_kind(NexthopKind::Interface, ifindex)
    }

    pub fn blackhole() -> Nexthop {
        Nexthop::from_kind(NexthopKind::Blackhole, None)
    }

    fn from_kind(kind: NexthopKind, ifindex: Option<u32>) -> Nexthop {
        Nexthop {
            kind,
            ifindex,
            src: None,
            labels: Default::default(),
            flags: NexthopFlags::empty(),
            resolved: vec![],
        }
    }

    pub fn with_labels(mut self, labels: LabelStack) -> Nexthop {
        self.labels = labels;
        self
    }

    pub fn with_src(mut self, src: IpAddr) -> Nexthop {
        self.src = Some(src);
        self
    }

    pub fn with_flags(mut self, flags: NexthopFlags) -> Nexthop {
        self.flags = flags;
        self
    }

    // Returns the gateway address, if any.
    pub fn addr(&self) -> Option<IpAddr> {
        match self.kind {
            NexthopKind::Address(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn address_family(&self) -> Option<AddressFamily> {
        self.addr().map(|addr| addr.address_family())
    }

    pub fn is_blackhole(&self) -> bool {
        self.kind == NexthopKind::Blackhole
    }

    pub fn is_active(&self) -> bool {
        self.flags.contains(NexthopFlags::ACTIVE)
    }

    pub fn is_fib(&self) -> bool {
        self.flags.contains(NexthopFlags::FIB)
    }

    pub fn is_recursive(&self) -> bool {
        self.flags.contains(NexthopFlags::RECURSIVE)
    }

    pub fn is_onlink(&self) -> bool {
        self.flags.contains(NexthopFlags::ONLINK)
    }

    // Returns the source address unless it's unset or unspecified.
    pub fn src_specified(&self) -> Option<IpAddr> {
        self.src.filter(|src| !src.is_unspecified())
    }
}

// ===== impl NexthopIter =====

impl<'a> NexthopIter<'a> {
    pub fn new(nexthops: &'a [Nexthop]) -> NexthopIter<'a> {
        NexthopIter {
            stack: vec![(0, nexthops.iter())],
        }
    }
}

impl<'a> Iterator for NexthopIter<'a> {
    // Recursion level and nexthop.
    type Item = (usize, &'a Nexthop);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (level, iter) = self.stack.last_mut()?;
            let level = *level;
            match iter.next() {
                Some(nexthop) => {
                    if nexthop.is_recursive() && !nexthop.resolved.is_empty() {
                        self.stack.push((level + 1, nexthop.resolved.iter()));
                    }
                    return Some((level, nexthop));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

// ===== unit tests =====
