//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use ribd_utils::ip::AddressFamily;
use ribd_utils::nexthop::{Nexthop, NexthopIter, NexthopKind};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::rib::{Route, RouteFlags, RouteNode};
use crate::show::{format_uptime, ifname, node_prefix};
use crate::vrf::Vrf;

// Structured routing table, keyed by destination prefix in table order.
#[derive(Debug, Default)]
pub struct JsonRouteTable {
    prefixes: Vec<(String, Vec<JsonRoute>)>,
}

// Structured routing tables of several VRFs, keyed by VRF name.
#[derive(Debug, Default)]
pub struct JsonVrfRouteTables {
    vrfs: Vec<(String, JsonRouteTable)>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRoute {
    prefix: String,
    protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vrf_id: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    blackhole: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    reject: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    uptime: Option<String>,
    nexthops: Vec<JsonNexthop>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonNexthop {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    fib: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    afi: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    directly_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    interface_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interface_name: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    blackhole: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    active: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    on_link: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    recursive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<IpAddr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<u32>,
}

// ===== impl JsonRouteTable =====

impl JsonRouteTable {
    // Adds the matching route entries of a node.
    pub fn push(
        &mut self,
        vrf: &Vrf,
        node: &RouteNode,
        routes: &[&Route],
        now: DateTime<Utc>,
    ) {
        let key = node.prefix.to_string();
        let routes = routes
            .iter()
            .map(|route| JsonRoute::new(vrf, node, route, now));
        if let Some((last_key, entries)) = self.prefixes.last_mut()
            && *last_key == key
        {
            entries.extend(routes);
            return;
        }
        self.prefixes.push((key, routes.collect()));
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl Serialize for JsonRouteTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.prefixes.len()))?;
        for (prefix, routes) in &self.prefixes {
            map.serialize_entry(prefix, routes)?;
        }
        map.end()
    }
}

// ===== impl JsonVrfRouteTables =====

impl JsonVrfRouteTables {
    pub fn push(&mut self, vrf_name: &str, table: JsonRouteTable) {
        self.vrfs.push((vrf_name.to_owned(), table));
    }
}

impl Serialize for JsonVrfRouteTables {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.vrfs.len()))?;
        for (vrf_name, table) in &self.vrfs {
            map.serialize_entry(vrf_name, table)?;
        }
        map.end()
    }
}

// ===== impl JsonRoute =====

impl JsonRoute {
    fn new(
        vrf: &Vrf,
        node: &RouteNode,
        route: &Route,
        now: DateTime<Utc>,
    ) -> JsonRoute {
        let shows_distance = route.protocol.shows_distance();
        JsonRoute {
            prefix: node_prefix(node),
            protocol: route.protocol.to_string(),
            instance: (route.instance != 0).then_some(route.instance),
            vrf_id: (route.vrf_id != 0).then_some(route.vrf_id),
            selected: route.is_selected(),
            distance: shows_distance.then_some(route.distance),
            metric: shows_distance.then_some(route.metric),
            blackhole: route.flags.contains(RouteFlags::BLACKHOLE),
            reject: route.flags.contains(RouteFlags::REJECT),
            uptime: route
                .protocol
                .shows_age()
                .then(|| format_uptime(route.last_updated, now)),
            nexthops: NexthopIter::new(&route.nexthops)
                .map(|(_, nexthop)| JsonNexthop::new(vrf, nexthop))
                .collect(),
        }
    }
}

// ===== impl JsonNexthop =====

impl JsonNexthop {
    fn new(vrf: &Vrf, nexthop: &Nexthop) -> JsonNexthop {
        let mut json = JsonNexthop {
            fib: nexthop.is_fib(),
            ip: None,
            afi: None,
            directly_connected: false,
            interface_index: None,
            interface_name: None,
            blackhole: false,
            active: nexthop.is_active(),
            on_link: nexthop.is_onlink(),
            recursive: nexthop.is_recursive(),
            source: None,
            labels: nexthop.labels.values(),
        };

        match nexthop.kind {
            NexthopKind::Address(addr) => {
                json.ip = Some(addr);
                json.afi = nexthop.address_family().map(|af| match af {
                    AddressFamily::Ipv4 => "ipv4",
                    AddressFamily::Ipv6 => "ipv6",
                });
                if let Some(ifindex) = nexthop.ifindex {
                    json.interface_index = Some(ifindex);
                    json.interface_name =
                        Some(ifname(&vrf.interfaces, ifindex).to_owned());
                }
                json.source = nexthop.src_specified();
            }
            NexthopKind::Interface => {
                let ifindex = nexthop.ifindex.unwrap_or_default();
                json.directly_connected = true;
                json.interface_index = Some(ifindex);
                json.interface_name =
                    Some(ifname(&vrf.interfaces, ifindex).to_owned());
            }
            NexthopKind::Blackhole => {
                json.blackhole = true;
            }
        }

        json
    }
}

// ===== global functions =====

// Serializes structured output the way it's printed to the operator.
pub fn to_pretty_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_owned())
}
