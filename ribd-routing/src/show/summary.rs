//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;

use ribd_utils::protocol::Protocol;

use crate::rib::{RouteFlags, RouteTable};

// Counting mode of the route summary.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SummaryMode {
    // Every route entry counts once.
    #[default]
    PerRoute,
    // Only the first nexthop of every route entry counts, so ECMP routes are
    // counted once.
    PerPrefix,
}

// Per-protocol route counters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RouteSummary {
    pub mode: SummaryMode,
    // RIB and FIB counters per protocol. Under the per-route mode, the BGP
    // counters only account for eBGP routes.
    pub protocols: BTreeMap<Protocol, Counters>,
    pub ibgp: Counters,
    pub total: Counters,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counters {
    pub rib: u32,
    pub fib: u32,
}

// ===== impl RouteSummary =====

impl RouteSummary {
    // Counts the route entries of the given table.
    pub fn new(table: &RouteTable, mode: SummaryMode) -> RouteSummary {
        let mut summary = RouteSummary {
            mode,
            ..Default::default()
        };

        for node in table.iter() {
            for route in &node.routes {
                let is_ibgp = route.protocol == Protocol::Bgp
                    && route.flags.contains(RouteFlags::IBGP);

                match mode {
                    SummaryMode::PerRoute => {
                        let fib = route.is_selected();
                        summary.total.add(fib);
                        if is_ibgp {
                            summary.ibgp.add(fib);
                        } else {
                            summary.counters_mut(route.protocol).add(fib);
                        }
                    }
                    SummaryMode::PerPrefix => {
                        // In case of ECMP, count only once.
                        let Some(nexthop) = route.nexthops.first() else {
                            continue;
                        };
                        let fib = nexthop.is_fib();
                        summary.total.add(fib);
                        summary.counters_mut(route.protocol).add(fib);
                        if is_ibgp {
                            summary.ibgp.add(fib);
                        }
                    }
                }
            }
        }

        summary
    }

    // Returns the counters of the given protocol.
    pub fn get(&self, protocol: Protocol) -> Counters {
        self.protocols.get(&protocol).copied().unwrap_or_default()
    }

    // Returns the eBGP counters.
    pub fn ebgp(&self) -> Counters {
        let bgp = self.get(Protocol::Bgp);
        match self.mode {
            SummaryMode::PerRoute => bgp,
            SummaryMode::PerPrefix => Counters {
                rib: bgp.rib.saturating_sub(self.ibgp.rib),
                fib: bgp.fib.saturating_sub(self.ibgp.fib),
            },
        }
    }

    // Renders the summary table.
    pub fn render(&self, out: &mut String, vrf_name: &str) {
        let routes_title = match self.mode {
            SummaryMode::PerRoute => "Routes",
            SummaryMode::PerPrefix => "Prefix Routes",
        };
        out.push_str(&format!(
            "{:<20} {:<20} {}  (vrf {})\n",
            "Route Source", routes_title, "FIB", vrf_name
        ));

        for protocol in Protocol::ALL {
            let counters = self.get(protocol);
            if protocol == Protocol::Bgp {
                let show = match self.mode {
                    SummaryMode::PerRoute => {
                        counters.rib > 0 || self.ibgp.rib > 0
                    }
                    SummaryMode::PerPrefix => counters.rib > 0,
                };
                if show {
                    row(out, "ebgp", self.ebgp());
                    row(out, "ibgp", self.ibgp);
                }
            } else if counters.rib > 0 {
                row(out, &protocol.to_string(), counters);
            }
        }

        out.push_str("------\n");
        row(out, "Totals", self.total);
        out.push('\n');
    }

    fn counters_mut(&mut self, protocol: Protocol) -> &mut Counters {
        self.protocols.entry(protocol).or_default()
    }
}

// ===== impl Counters =====

impl Counters {
    fn add(&mut self, fib: bool) {
        self.rib += 1;
        if fib {
            self.fib += 1;
        }
    }
}

// ===== helper functions =====

fn row(out: &mut String, name: &str, counters: Counters) {
    out.push_str(&format!(
        "{:<20} {:<20} {:<20} \n",
        name, counters.rib, counters.fib
    ));
}
