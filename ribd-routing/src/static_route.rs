//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use ribd_utils::ip::{
    AddressFamily, IpAddrExt, IpNetworkExt, Ipv4AddrExt, Ipv6NetworkExt, Safi,
};
use ribd_utils::mpls::LabelStack;
use ribd_utils::nexthop::Nexthop;
use ribd_utils::protocol::Protocol;
use tracing::warn;

use crate::error::Error;
use crate::interface::Interfaces;
use crate::rib::{NodeKey, Route, RouteFlags};

// Default administrative distance of static routes.
pub const STATIC_DISTANCE_DEFAULT: u8 = 1;
// Ifindex used for nexthops whose interface doesn't exist yet.
pub const IFINDEX_UNKNOWN: u32 = 0;

// Raw static route command arguments.
#[derive(Clone, Debug)]
pub struct StaticRouteArgs {
    pub af: AddressFamily,
    pub safi: Safi,
    pub negate: bool,
    pub dest: String,
    pub mask: Option<String>,
    pub src: Option<String>,
    pub gateway: Option<String>,
    pub ifname: Option<String>,
    pub flag: Option<String>,
    pub tag: Option<String>,
    pub distance: Option<String>,
    pub vrf: Option<String>,
    pub labels: Option<String>,
}

// Validated static route descriptor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StaticRoute {
    pub safi: Safi,
    pub prefix: IpNetwork,
    pub src: Option<Ipv6Network>,
    pub nexthop: StaticNexthop,
    pub distance: u8,
    pub tag: u32,
    pub labels: LabelStack,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StaticNexthop {
    Gateway(IpAddr),
    Interface(StaticIfname),
    GatewayInterface(IpAddr, StaticIfname),
    Blackhole,
    Reject,
}

// Canonical static nexthop type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StaticNexthopType {
    Ifindex,
    Ipv4Gateway,
    Ipv4GatewayIfindex,
    Ipv6Gateway,
    Ipv6GatewayIfindex,
    Blackhole,
}

// Interface referenced by a static nexthop. The ifindex is unset while the
// interface doesn't exist.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StaticIfname {
    pub name: String,
    pub ifindex: Option<u32>,
}

// Static nexthop identity. Blackhole and reject nexthops share the same
// identity.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum StaticNexthopKey {
    Gateway(IpAddr),
    Interface(String),
    GatewayInterface(IpAddr, String),
    Blackhole,
}

// Static route descriptors of one VRF.
#[derive(Debug, Default)]
pub struct StaticRoutes {
    tables: BTreeMap<(AddressFamily, Safi), BTreeMap<NodeKey, Vec<StaticRoute>>>,
}

// ===== impl StaticRouteArgs =====

impl StaticRouteArgs {
    pub fn new(af: AddressFamily, safi: Safi, dest: &str) -> StaticRouteArgs {
        StaticRouteArgs {
            af,
            safi,
            negate: false,
            dest: dest.to_owned(),
            mask: None,
            src: None,
            gateway: None,
            ifname: None,
            flag: None,
            tag: None,
            distance: None,
            vrf: None,
            labels: None,
        }
    }
}

// ===== impl StaticRoute =====

impl StaticRoute {
    pub fn af(&self) -> AddressFamily {
        self.prefix.address_family()
    }

    pub fn key(&self) -> NodeKey {
        (self.prefix, self.src)
    }

    // Returns the RIB nexthop corresponding to this descriptor.
    pub(crate) fn rib_nexthop(&self) -> Nexthop {
        let nexthop = match &self.nexthop {
            StaticNexthop::Gateway(addr) => Nexthop::address(*addr, None),
            StaticNexthop::Interface(ifname) => {
                Nexthop::interface(Some(ifname.rib_ifindex()))
            }
            StaticNexthop::GatewayInterface(addr, ifname) => {
                Nexthop::address(*addr, Some(ifname.rib_ifindex()))
            }
            StaticNexthop::Blackhole | StaticNexthop::Reject => {
                Nexthop::blackhole()
            }
        };
        nexthop.with_labels(self.labels.clone())
    }
}

// ===== impl StaticNexthop =====

impl StaticNexthop {
    // Classifies the nexthop part of a static route command.
    //
    // Rules are evaluated in order and the first match wins.
    pub fn classify(
        af: AddressFamily,
        gateway: Option<&str>,
        ifname: Option<&str>,
        flag: Option<&str>,
    ) -> Result<StaticNexthop, Error> {
        // Null0 interface.
        if let Some(ifname) = ifname
            && ifname.eq_ignore_ascii_case("Null0")
        {
            if let Some(flag) = flag {
                return Err(Error::NullInterfaceFlag(flag.to_owned()));
            }
            return Ok(StaticNexthop::Blackhole);
        }

        // Explicit blackhole or reject flag.
        if let Some(flag) = flag {
            return match flag.chars().next() {
                Some('r' | 'R') => Ok(StaticNexthop::Reject),
                Some('b' | 'B') => Ok(StaticNexthop::Blackhole),
                _ => Err(Error::MalformedFlag(flag.to_owned())),
            };
        }

        let gateway = gateway
            .map(|gateway| {
                IpAddr::parse_af(af, gateway).ok_or_else(|| {
                    Error::MalformedNexthopAddress(gateway.to_owned())
                })
            })
            .transpose()?;
        let ifname = ifname.map(StaticIfname::new);
        let nexthop = match (gateway, ifname) {
            (Some(addr), Some(ifname)) => {
                StaticNexthop::GatewayInterface(addr, ifname)
            }
            (None, Some(ifname)) => StaticNexthop::Interface(ifname),
            (Some(addr), None) => StaticNexthop::Gateway(addr),
            (None, None) => StaticNexthop::Blackhole,
        };
        Ok(nexthop)
    }

    // Returns the canonical nexthop type.
    pub fn nexthop_type(&self) -> StaticNexthopType {
        match self {
            StaticNexthop::Gateway(IpAddr::V4(_)) => {
                StaticNexthopType::Ipv4Gateway
            }
            StaticNexthop::Gateway(IpAddr::V6(_)) => {
                StaticNexthopType::Ipv6Gateway
            }
            StaticNexthop::GatewayInterface(IpAddr::V4(_), _) => {
                StaticNexthopType::Ipv4GatewayIfindex
            }
            StaticNexthop::GatewayInterface(IpAddr::V6(_), _) => {
                StaticNexthopType::Ipv6GatewayIfindex
            }
            StaticNexthop::Interface(_) => StaticNexthopType::Ifindex,
            StaticNexthop::Blackhole | StaticNexthop::Reject => {
                StaticNexthopType::Blackhole
            }
        }
    }

    pub fn key(&self) -> StaticNexthopKey {
        match self {
            StaticNexthop::Gateway(addr) => StaticNexthopKey::Gateway(*addr),
            StaticNexthop::Interface(ifname) => {
                StaticNexthopKey::Interface(ifname.name.clone())
            }
            StaticNexthop::GatewayInterface(addr, ifname) => {
                StaticNexthopKey::GatewayInterface(*addr, ifname.name.clone())
            }
            StaticNexthop::Blackhole | StaticNexthop::Reject => {
                StaticNexthopKey::Blackhole
            }
        }
    }

    pub fn ifname(&self) -> Option<&StaticIfname> {
        match self {
            StaticNexthop::Interface(ifname)
            | StaticNexthop::GatewayInterface(_, ifname) => Some(ifname),
            _ => None,
        }
    }

    fn ifname_mut(&mut self) -> Option<&mut StaticIfname> {
        match self {
            StaticNexthop::Interface(ifname)
            | StaticNexthop::GatewayInterface(_, ifname) => Some(ifname),
            _ => None,
        }
    }
}

impl std::fmt::Display for StaticNexthop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaticNexthop::Gateway(addr) => write!(f, "{}", addr),
            StaticNexthop::Interface(ifname) => write!(f, "{}", ifname.name),
            StaticNexthop::GatewayInterface(addr, ifname) => {
                write!(f, "{} {}", addr, ifname.name)
            }
            StaticNexthop::Blackhole => write!(f, "Null0"),
            StaticNexthop::Reject => write!(f, "reject"),
        }
    }
}

// ===== impl StaticIfname =====

impl StaticIfname {
    fn new(name: &str) -> StaticIfname {
        StaticIfname {
            name: name.to_owned(),
            ifindex: None,
        }
    }

    // Resolves the interface name to an ifindex.
    //
    // Unknown interfaces are accepted, the nexthop stays inactive until the
    // interface shows up.
    pub(crate) fn resolve(&mut self, interfaces: &Interfaces) {
        self.ifindex = interfaces
            .get_by_name(&self.name)
            .map(|iface| iface.ifindex);
        if self.ifindex.is_none() {
            warn!(name = %self.name, "interface not found, nexthop deferred");
        }
    }

    fn rib_ifindex(&self) -> u32 {
        self.ifindex.unwrap_or(IFINDEX_UNKNOWN)
    }
}

// ===== impl StaticRoutes =====

impl StaticRoutes {
    // Adds a static route descriptor, replacing the descriptor with the same
    // identity if one exists. Returns whether anything has changed.
    pub(crate) fn add(&mut self, route: StaticRoute) -> bool {
        let routes = self
            .tables
            .entry((route.af(), route.safi))
            .or_default()
            .entry(route.key())
            .or_default();

        let nexthop_key = route.nexthop.key();
        match routes
            .iter_mut()
            .find(|old| old.nexthop.key() == nexthop_key)
        {
            Some(old) if *old == route => false,
            Some(old) => {
                *old = route;
                true
            }
            None => {
                routes.push(route);
                true
            }
        }
    }

    // Removes the static route descriptor with the given identity.
    pub(crate) fn remove(
        &mut self,
        af: AddressFamily,
        safi: Safi,
        key: &NodeKey,
        nexthop_key: &StaticNexthopKey,
    ) -> Option<StaticRoute> {
        let table = self.tables.get_mut(&(af, safi))?;
        let routes = table.get_mut(key)?;
        let pos = routes
            .iter()
            .position(|route| route.nexthop.key() == *nexthop_key)?;
        let route = routes.remove(pos);
        if routes.is_empty() {
            table.remove(key);
        }
        Some(route)
    }

    // Returns the descriptors configured for the given prefix.
    pub fn get(
        &self,
        af: AddressFamily,
        safi: Safi,
        key: &NodeKey,
    ) -> &[StaticRoute] {
        self.tables
            .get(&(af, safi))
            .and_then(|table| table.get(key))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    // Returns an iterator over the descriptors of the given table, in
    // prefix order.
    pub fn iter(
        &self,
        af: AddressFamily,
        safi: Safi,
    ) -> impl Iterator<Item = &StaticRoute> + '_ {
        self.tables
            .get(&(af, safi))
            .into_iter()
            .flat_map(|table| table.values().flatten())
    }

    // Returns an iterator over all descriptors.
    pub fn iter_all(&self) -> impl Iterator<Item = &StaticRoute> + '_ {
        self.tables
            .values()
            .flat_map(|table| table.values().flatten())
    }

    // Returns the tables and prefixes that have at least one descriptor.
    pub(crate) fn keys(&self) -> Vec<(AddressFamily, Safi, NodeKey)> {
        self.tables
            .iter()
            .flat_map(|((af, safi), table)| {
                table.keys().map(move |key| (*af, *safi, *key))
            })
            .collect()
    }

    // Returns the total number of descriptors.
    pub fn len(&self) -> usize {
        self.tables
            .values()
            .flat_map(|table| table.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Updates the ifindex of all nexthops referencing the given interface.
    // Returns the affected prefixes.
    pub(crate) fn update_ifindex(
        &mut self,
        name: &str,
        ifindex: Option<u32>,
    ) -> Vec<(AddressFamily, Safi, NodeKey)> {
        let mut affected = vec![];
        for ((af, safi), table) in self.tables.iter_mut() {
            for (key, routes) in table.iter_mut() {
                let mut found = false;
                for ifname in routes
                    .iter_mut()
                    .filter_map(|route| route.nexthop.ifname_mut())
                    .filter(|ifname| ifname.name == name)
                {
                    ifname.ifindex = ifindex;
                    found = true;
                }
                if found {
                    affected.push((*af, *safi, *key));
                }
            }
        }
        affected
    }
}

// ===== global functions =====

// Validates and normalizes a static route command.
//
// Everything up to the VRF lookup is checked here. The caller resolves the
// VRF and continues with `normalize_nexthop`.
pub fn normalize_prefixes(
    args: &StaticRouteArgs,
) -> Result<(IpNetwork, Option<Ipv6Network>, u8, u32), Error> {
    // Destination prefix.
    let prefix = match &args.mask {
        Some(mask) if args.af == AddressFamily::Ipv4 => {
            let addr = Ipv4Addr::from_str(&args.dest)
                .or_else(|_| {
                    Ipv4Network::from_str(&args.dest).map(|prefix| prefix.ip())
                })
                .map_err(|_| Error::MalformedAddress(args.dest.clone()))?;
            let mask = Ipv4Addr::from_str(mask)
                .map_err(|_| Error::MalformedMask(mask.clone()))?;
            let prefix = Ipv4Network::new(addr, mask.mask_len())
                .map_err(|_| Error::MalformedMask(mask.to_string()))?;
            IpNetwork::V4(prefix)
        }
        _ => IpNetwork::parse_af(args.af, &args.dest)
            .ok_or_else(|| Error::MalformedAddress(args.dest.clone()))?,
    };
    let prefix = prefix.apply_mask();

    // Source prefix.
    let src = match &args.src {
        Some(src) if args.af == AddressFamily::Ipv6 => {
            let src = Ipv6Network::from_str(src)
                .map_err(|_| Error::MalformedSourceAddress(src.clone()))?;
            Some(src.apply_mask()).filter(|src| src.prefix() != 0)
        }
        Some(src) => return Err(Error::MalformedSourceAddress(src.clone())),
        None => None,
    };

    // Distance and tag.
    let distance = match &args.distance {
        Some(distance) => distance
            .parse::<u8>()
            .map_err(|_| Error::MalformedDistance(distance.clone()))?,
        None => STATIC_DISTANCE_DEFAULT,
    };
    let tag = match &args.tag {
        Some(tag) => tag
            .parse::<u32>()
            .map_err(|_| Error::MalformedTag(tag.clone()))?,
        None => 0,
    };

    Ok((prefix, src, distance, tag))
}

// Validates the labels and nexthop part of a static route command.
pub fn normalize_nexthop(
    args: &StaticRouteArgs,
    mpls_enabled: bool,
    interfaces: &Interfaces,
) -> Result<(StaticNexthop, LabelStack), Error> {
    // Labels.
    let labels = match &args.labels {
        Some(labels) => {
            if !mpls_enabled {
                return Err(Error::MplsDisabled);
            }
            LabelStack::parse(labels)?
        }
        None => LabelStack::default(),
    };

    // Nexthop.
    let mut nexthop = StaticNexthop::classify(
        args.af,
        args.gateway.as_deref(),
        args.ifname.as_deref(),
        args.flag.as_deref(),
    )?;
    if let Some(ifname) = nexthop.ifname_mut() {
        ifname.resolve(interfaces);
    }

    Ok((nexthop, labels))
}

// Builds the RIB entries for the static descriptors of one prefix. One entry
// is built per distance.
pub(crate) fn rib_routes(
    routes: &[StaticRoute],
    vrf_id: u32,
) -> BTreeMap<u8, Route> {
    let mut rib_routes: BTreeMap<u8, Route> = BTreeMap::new();
    for route in routes {
        let rib_route = rib_routes.entry(route.distance).or_insert_with(|| {
            let mut rib_route = Route::new(
                Protocol::Static,
                route.distance.into(),
                0,
                vec![],
            );
            rib_route.tag = route.tag;
            rib_route.vrf_id = vrf_id;
            rib_route
        });
        match route.nexthop {
            StaticNexthop::Blackhole => {
                rib_route.flags.insert(RouteFlags::BLACKHOLE)
            }
            StaticNexthop::Reject => rib_route.flags.insert(RouteFlags::REJECT),
            _ => (),
        }
        rib_route.nexthops.push(route.rib_nexthop());
    }
    rib_routes
}
