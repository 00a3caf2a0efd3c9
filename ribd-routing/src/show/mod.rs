//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod filter;
pub mod json;
pub mod summary;
pub mod text;

use chrono::{DateTime, Utc};
use ribd_utils::ip::AddressFamily;

use crate::interface::Interfaces;
use crate::rib::{Route, RouteNode, RouteTable};
use crate::show::filter::RouteFilter;

const ONE_DAY_SECOND: i64 = 60 * 60 * 24;
const ONE_WEEK_SECOND: i64 = ONE_DAY_SECOND * 7;

pub const SHOW_ROUTE_V4_HEADER: &str = "\
Codes: K - kernel route, C - connected, S - static, R - RIP,
       O - OSPF, I - IS-IS, B - BGP, E - EIGRP, N - NHRP,
       T - Table, v - VNC, V - VNC-Direct, A - Babel, D - SHARP,
       > - selected route, * - FIB route

";

pub const SHOW_ROUTE_V6_HEADER: &str = "\
Codes: K - kernel route, C - connected, S - static, R - RIPng,
       O - OSPFv3, I - IS-IS, B - BGP, N - NHRP,
       T - Table, v - VNC, V - VNC-Direct, A - Babel, D - SHARP,
       > - selected route, * - FIB route

";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// ===== global functions =====

// Returns the legend printed before the first route of a listing.
pub fn legend(af: AddressFamily) -> &'static str {
    match af {
        AddressFamily::Ipv4 => SHOW_ROUTE_V4_HEADER,
        AddressFamily::Ipv6 => SHOW_ROUTE_V6_HEADER,
    }
}

// Walks the table in prefix order, invoking the closure for every node that
// has at least one route entry passing the filter.
//
// Each visited node stays locked while the closure runs.
pub fn walk<F>(table: &RouteTable, filter: &RouteFilter, mut f: F)
where
    F: FnMut(&RouteNode, Vec<&Route>),
{
    for node in table.iter() {
        let routes = node
            .routes
            .iter()
            .filter(|route| filter.matches(&node, route))
            .collect::<Vec<_>>();
        if !routes.is_empty() {
            f(&node, routes);
        }
    }
}

// Formats the time elapsed since the given instant.
//
// Ages under one day are shown as `HH:MM:SS`, ages under one week as
// `DdHHhMMm`, and longer ones as `WWwDdHHh`.
pub fn format_uptime(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let uptime = (now - last_updated).num_seconds().max(0);
    format_age(uptime)
}

pub fn format_age(uptime: i64) -> String {
    let days = uptime / ONE_DAY_SECOND;
    let hours = (uptime % ONE_DAY_SECOND) / 3600;
    let minutes = (uptime % 3600) / 60;
    let seconds = uptime % 60;

    if uptime < ONE_DAY_SECOND {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else if uptime < ONE_WEEK_SECOND {
        format!("{}d{:02}h{:02}m", days, hours, minutes)
    } else {
        format!("{:02}w{}d{:02}h", days / 7, days % 7, hours)
    }
}

// Returns the name of the interface with the given ifindex.
pub(crate) fn ifname(interfaces: &Interfaces, ifindex: u32) -> &str {
    interfaces.ifname(ifindex).unwrap_or("unknown")
}

// Formats the node prefix, including the source prefix when present.
pub(crate) fn node_prefix(node: &RouteNode) -> String {
    match &node.src {
        Some(src) => format!("{} from {}", node.prefix, src),
        None => node.prefix.to_string(),
    }
}
