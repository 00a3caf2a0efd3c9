//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use chrono::{DateTime, Utc};
use ribd_utils::ip::Safi;
use ribd_utils::nexthop::{Nexthop, NexthopIter, NexthopKind};

use crate::rib::{Route, RouteFlags, RouteNode};
use crate::show::{format_uptime, ifname, node_prefix};
use crate::vrf::Vrf;

// ===== global functions =====

// Renders one route entry as a routing table line, followed by one
// continuation line per additional nexthop.
//
// Entries without nexthops produce no output.
pub fn route_lines(
    out: &mut String,
    vrf: &Vrf,
    node: &RouteNode,
    route: &Route,
    now: DateTime<Utc>,
) {
    let mut len = 0;
    for (idx, (level, nexthop)) in NexthopIter::new(&route.nexthops).enumerate()
    {
        if idx == 0 {
            // Prefix information.
            let mut head = String::new();
            head.push(route.protocol.route_char());
            if route.instance != 0 {
                head.push_str(&format!("[{}]", route.instance));
            }
            head.push(if route.is_selected() { '>' } else { ' ' });
            head.push(if nexthop.is_fib() { '*' } else { ' ' });
            head.push(' ');
            head.push_str(&node_prefix(node));

            // Distance and metric.
            if route.protocol.shows_distance() {
                head.push_str(&format!(
                    " [{}/{}]",
                    route.distance, route.metric
                ));
            }
            len = head.chars().count();
            out.push_str(&head);
        } else {
            let width = (len + 2 * level).saturating_sub(3).max(1);
            out.push_str("  ");
            out.push(if nexthop.is_fib() { '*' } else { ' ' });
            out.push_str(&" ".repeat(width));
        }

        match nexthop.kind {
            NexthopKind::Address(addr) => {
                out.push_str(&format!(" via {}", addr));
                if let Some(ifindex) = nexthop.ifindex {
                    out.push_str(&format!(
                        ", {}",
                        ifname(&vrf.interfaces, ifindex)
                    ));
                }
            }
            NexthopKind::Interface => {
                out.push_str(&format!(
                    " is directly connected, {}",
                    nexthop_ifname(vrf, nexthop)
                ));
            }
            NexthopKind::Blackhole => {
                out.push_str(" is directly connected, Null0");
            }
        }
        nexthop_annotations(out, nexthop);

        if route.flags.contains(RouteFlags::BLACKHOLE) {
            out.push_str(", bh");
        }
        if route.flags.contains(RouteFlags::REJECT) {
            out.push_str(", rej");
        }
        if route.protocol.shows_age() {
            out.push_str(&format!(
                ", {}",
                format_uptime(route.last_updated, now)
            ));
        }
        out.push('\n');
    }
}

// Renders the detailed record of all route entries of a node.
//
// `rpf_safi` is set for multicast RPF lookups, where the record notes which
// RIB the entry was found in.
pub fn route_detail(
    out: &mut String,
    vrf: &Vrf,
    node: &RouteNode,
    rpf_safi: Option<Safi>,
    now: DateTime<Utc>,
) {
    let mcast_info = match rpf_safi {
        Some(Safi::Multicast) => " using Multicast RIB",
        Some(Safi::Unicast) => " using Unicast RIB",
        None => "",
    };

    for route in &node.routes {
        out.push_str(&format!(
            "Routing entry for {}{}\n",
            node_prefix(node),
            mcast_info
        ));

        // Summary line.
        out.push_str(&format!("  Known via \"{}", route.protocol));
        if route.instance != 0 {
            out.push_str(&format!("[{}]", route.instance));
        }
        out.push('"');
        out.push_str(&format!(
            ", distance {}, metric {}",
            route.distance, route.metric
        ));
        if route.tag != 0 {
            out.push_str(&format!(", tag {}", route.tag));
        }
        if route.mtu != 0 {
            out.push_str(&format!(", mtu {}", route.mtu));
        }
        if route.vrf_id != 0 {
            out.push_str(&format!(", vrf {}", vrf.name));
        }
        if route.is_selected() {
            out.push_str(", best");
        }
        if route.refcnt != 0 {
            out.push_str(&format!(", refcnt {}", route.refcnt));
        }
        if route.flags.contains(RouteFlags::BLACKHOLE) {
            out.push_str(", blackhole");
        }
        if route.flags.contains(RouteFlags::REJECT) {
            out.push_str(", reject");
        }
        out.push('\n');

        if route.protocol.shows_age() {
            out.push_str(&format!(
                "  Last update {} ago\n",
                format_uptime(route.last_updated, now)
            ));
        }

        for (level, nexthop) in NexthopIter::new(&route.nexthops) {
            out.push_str("  ");
            out.push(if nexthop.is_fib() { '*' } else { ' ' });
            if level > 0 {
                out.push_str("  ");
            }

            match nexthop.kind {
                NexthopKind::Address(addr) => {
                    out.push_str(&format!(" {}", addr));
                    if let Some(ifindex) = nexthop.ifindex {
                        out.push_str(&format!(
                            ", via {}",
                            ifname(&vrf.interfaces, ifindex)
                        ));
                    }
                }
                NexthopKind::Interface => {
                    out.push_str(&format!(
                        " directly connected, {}",
                        nexthop_ifname(vrf, nexthop)
                    ));
                }
                NexthopKind::Blackhole => {
                    out.push_str(" directly connected, Null0");
                }
            }
            nexthop_annotations(out, nexthop);
            out.push('\n');
        }
        out.push('\n');
    }
}

// ===== helper functions =====

fn nexthop_ifname<'a>(vrf: &'a Vrf, nexthop: &Nexthop) -> &'a str {
    ifname(&vrf.interfaces, nexthop.ifindex.unwrap_or_default())
}

// Appends the state, source and label annotations of a nexthop.
fn nexthop_annotations(out: &mut String, nexthop: &Nexthop) {
    if !nexthop.is_active() {
        out.push_str(" inactive");
    }
    if nexthop.is_onlink() {
        out.push_str(" onlink");
    }
    if nexthop.is_recursive() {
        out.push_str(" (recursive)");
    }
    if nexthop.addr().is_some()
        && let Some(src) = nexthop.src_specified()
    {
        out.push_str(&format!(", src {}", src));
    }
    if !nexthop.labels.is_empty() {
        out.push_str(&format!(", label {}", nexthop.labels.to_pretty_string()));
    }
}
