//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use ribd_utils::ip::{AddressFamily, IpAddrExt, IpNetworkExt, Safi};

use crate::Master;
use crate::config::MulticastMode;
use crate::error::Error;
use crate::rib::{NodeGuard, RouteTable};
use crate::show::filter::RouteFilter;
use crate::show::json::{self, JsonRouteTable, JsonVrfRouteTables};
use crate::show::summary::{RouteSummary, SummaryMode};
use crate::show::{self, OutputFormat, text};
use crate::vrf::{VRF_DEFAULT_NAME, Vrf, VrfSelector};

// Routing table listing request.
#[derive(Clone, Debug)]
pub struct ShowRouteArgs {
    pub af: AddressFamily,
    pub safi: Safi,
    pub vrf: VrfSelector,
    pub filter: RouteFilter,
    pub format: OutputFormat,
}

// ===== impl ShowRouteArgs =====

impl ShowRouteArgs {
    pub fn new(af: AddressFamily) -> ShowRouteArgs {
        ShowRouteArgs {
            af,
            safi: Safi::Unicast,
            vrf: VrfSelector::Default,
            filter: Default::default(),
            format: Default::default(),
        }
    }
}

// ===== impl Master =====

impl Master {
    // Lists the routes of one or all VRFs.
    //
    // An unknown or inactive VRF isn't an error, the output then says so or
    // is an empty object.
    pub fn show_route(&self, args: &ShowRouteArgs) -> Result<String, Error> {
        let now = Utc::now();

        if args.vrf == VrfSelector::All {
            let mut out = String::new();
            let mut json = JsonVrfRouteTables::default();
            for vrf in self.vrfs.iter() {
                let Some(table) = vrf.table(args.af, args.safi) else {
                    continue;
                };
                match args.format {
                    OutputFormat::Text => {
                        route_table_text(&mut out, vrf, table, args, now)
                    }
                    OutputFormat::Json => json.push(
                        &vrf.name,
                        route_table_json(vrf, table, &args.filter, now),
                    ),
                }
            }
            if args.format == OutputFormat::Json {
                out = format!("{}\n", json::to_pretty_string(&json));
            }
            return Ok(out);
        }

        let vrf_name = args.vrf.name().unwrap_or(VRF_DEFAULT_NAME);
        let empty = |text: String| match args.format {
            OutputFormat::Text => text,
            OutputFormat::Json => "{}\n".to_owned(),
        };
        let Some(vrf) = self.vrfs.get_by_name(vrf_name) else {
            return Ok(empty(format!("vrf {} not defined\n", vrf_name)));
        };
        if !vrf.is_active() {
            return Ok(empty(format!("vrf {} inactive\n", vrf_name)));
        }
        let Some(table) = vrf.table(args.af, args.safi) else {
            return Ok(empty(String::new()));
        };

        let mut out = String::new();
        match args.format {
            OutputFormat::Text => {
                route_table_text(&mut out, vrf, table, args, now);
            }
            OutputFormat::Json => {
                let json = route_table_json(vrf, table, &args.filter, now);
                out = format!("{}\n", json::to_pretty_string(&json));
            }
        }
        Ok(out)
    }

    // Shows the detailed record of the best match for an address, or of the
    // exact match for a prefix.
    pub fn show_route_at(
        &self,
        af: AddressFamily,
        selector: &VrfSelector,
        target: &str,
    ) -> Result<String, Error> {
        let (prefix, exact) = if target.contains('/') {
            let prefix = IpNetwork::parse_af(af, target);
            (prefix, true)
        } else {
            let prefix = IpAddr::parse_af(af, target)
                .map(|addr| addr.to_host_prefix());
            (prefix, false)
        };
        let Some(prefix) = prefix else {
            return Err(Error::MalformedQueryAddress(af, target.to_owned()));
        };
        let now = Utc::now();

        let mut out = String::new();
        match selector {
            VrfSelector::All => {
                for vrf in self.vrfs.iter() {
                    let Some(table) = vrf.table(af, Safi::Unicast) else {
                        continue;
                    };
                    if let Some(node) = lookup_node(table, &prefix, exact) {
                        text::route_detail(&mut out, vrf, &node, None, now);
                    }
                }
            }
            _ => {
                let vrf = self.vrf_selected(selector)?;
                let Some(table) = vrf.table(af, Safi::Unicast) else {
                    return Ok(out);
                };
                let Some(node) = lookup_node(table, &prefix, exact) else {
                    return Err(Error::NetworkNotInTable);
                };
                text::route_detail(&mut out, vrf, &node, None, now);
            }
        }
        Ok(out)
    }

    // Shows the per-protocol route counters of one or all VRFs.
    pub fn show_route_summary(
        &self,
        af: AddressFamily,
        selector: &VrfSelector,
        mode: SummaryMode,
    ) -> Result<String, Error> {
        let mut out = String::new();
        let vrfs = match selector {
            VrfSelector::All => self.vrfs.iter().collect::<Vec<_>>(),
            _ => vec![self.vrf_selected(selector)?],
        };
        for vrf in vrfs {
            let Some(table) = vrf.table(af, Safi::Unicast) else {
                continue;
            };
            RouteSummary::new(table, mode).render(&mut out, &vrf.name);
        }
        Ok(out)
    }

    // Lists the IPv4 multicast RIB used for RPF lookups.
    pub fn show_rpf(&self, format: OutputFormat) -> Result<String, Error> {
        let mut args = ShowRouteArgs::new(AddressFamily::Ipv4);
        args.safi = Safi::Multicast;
        args.format = format;
        self.show_route(&args)
    }

    // Shows the route used for the RPF check of a multicast source.
    pub fn show_rpf_at(&self, addr: &str) -> Result<String, Error> {
        let addr = addr
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::MalformedAddress(addr.to_owned()))?;

        let mut out = String::new();
        match self.rpf_lookup(addr) {
            Some((safi, node)) => {
                let vrf = self.vrfs.default_vrf();
                text::route_detail(&mut out, vrf, &node, Some(safi), Utc::now());
            }
            None => out.push_str("% No match for RPF lookup\n"),
        }
        Ok(out)
    }

    // Looks up the route used for the RPF check of a multicast source,
    // according to the configured lookup mode.
    pub fn rpf_lookup(&self, addr: Ipv4Addr) -> Option<(Safi, NodeGuard<'_>)> {
        let vrf = self.vrfs.default_vrf();
        let addr = IpAddr::V4(addr);
        let mrib = || rpf_table_lookup(vrf, Safi::Multicast, &addr);
        let urib = || rpf_table_lookup(vrf, Safi::Unicast, &addr);

        match self.config.multicast_mode {
            MulticastMode::UribOnly => urib(),
            MulticastMode::MribOnly => mrib(),
            MulticastMode::NoConfig | MulticastMode::MribThenUrib => {
                mrib().or_else(urib)
            }
            MulticastMode::LowerDistance => match (mrib(), urib()) {
                (Some(mrib), Some(urib)) => {
                    let distance = |(_, node): &(Safi, NodeGuard<'_>)| {
                        node.selected().map(|route| route.distance)
                    };
                    if distance(&urib) < distance(&mrib) {
                        Some(urib)
                    } else {
                        Some(mrib)
                    }
                }
                (mrib, urib) => mrib.or(urib),
            },
            MulticastMode::LongerPrefix => match (mrib(), urib()) {
                (Some(mrib), Some(urib)) => {
                    if urib.1.prefix.prefix() > mrib.1.prefix.prefix() {
                        Some(urib)
                    } else {
                        Some(mrib)
                    }
                }
                (mrib, urib) => mrib.or(urib),
            },
        }
    }

    // Shows the nexthop tracking table of one or all VRFs.
    pub fn show_nht(
        &self,
        af: AddressFamily,
        selector: &VrfSelector,
    ) -> Result<String, Error> {
        let mut out = String::new();
        match selector {
            VrfSelector::All => {
                for vrf in self.vrfs.iter() {
                    out.push_str(&format!("\nVRF {}:\n", vrf.name));
                    if let Some(id) = vrf.id {
                        out.push_str(&self.nht.render_table(id, af));
                    }
                }
            }
            _ => {
                let vrf = self.vrf_selected(selector)?;
                if let Some(id) = vrf.id {
                    out.push_str(&self.nht.render_table(id, af));
                }
            }
        }
        Ok(out)
    }

    // Lists the non-default VRFs.
    pub fn show_vrf(&self) -> String {
        let mut out = String::new();
        for vrf in self.vrfs.iter().filter(|vrf| !vrf.is_default()) {
            out.push_str(&format!("vrf {} ", vrf.name));
            match vrf.id {
                Some(id) => out
                    .push_str(&format!("id {} table {}", id, vrf.table_id)),
                None => out.push_str("inactive"),
            }
            out.push('\n');
        }
        out
    }

    // Lists the IPv6 multicast RIB of one or all VRFs.
    pub fn show_ipv6_mroute(
        &self,
        selector: &VrfSelector,
    ) -> Result<String, Error> {
        let vrfs = match selector {
            VrfSelector::All => self.vrfs.iter().collect::<Vec<_>>(),
            _ => vec![self.vrf_selected(selector)?],
        };

        let now = Utc::now();
        let filter = RouteFilter::default();
        let mut out = String::new();
        let mut first = true;
        for vrf in vrfs {
            let Some(table) = vrf.table(AddressFamily::Ipv6, Safi::Multicast)
            else {
                continue;
            };
            show::walk(table, &filter, |node, routes| {
                for route in routes {
                    if first {
                        out.push_str(show::legend(AddressFamily::Ipv6));
                        first = false;
                    }
                    text::route_lines(&mut out, vrf, node, route, now);
                }
            });
        }
        Ok(out)
    }

    // Returns the VRF named by a single-VRF selector.
    fn vrf_selected(&self, selector: &VrfSelector) -> Result<&Vrf, Error> {
        let name = selector.name().unwrap_or(VRF_DEFAULT_NAME);
        self.vrfs
            .get_by_name(name)
            .ok_or_else(|| Error::VrfNotFound(name.to_owned()))
    }
}

// ===== helper functions =====

fn lookup_node<'a>(
    table: &'a RouteTable,
    prefix: &IpNetwork,
    exact: bool,
) -> Option<NodeGuard<'a>> {
    table
        .lookup(prefix)
        .filter(|node| !exact || node.prefix.prefix() == prefix.prefix())
}

fn rpf_table_lookup<'a>(
    vrf: &'a Vrf,
    safi: Safi,
    addr: &IpAddr,
) -> Option<(Safi, NodeGuard<'a>)> {
    vrf.table(AddressFamily::Ipv4, safi)?
        .lookup_selected(addr)
        .map(|node| (safi, node))
}

fn route_table_text(
    out: &mut String,
    vrf: &Vrf,
    table: &RouteTable,
    args: &ShowRouteArgs,
    now: DateTime<Utc>,
) {
    let mut first = true;
    show::walk(table, &args.filter, |node, routes| {
        for route in routes {
            if first {
                out.push_str(show::legend(args.af));
                if !vrf.is_default() {
                    out.push_str(&format!("\nVRF {}:\n", vrf.name));
                }
                first = false;
            }
            text::route_lines(out, vrf, node, route, now);
        }
    });
}

fn route_table_json(
    vrf: &Vrf,
    table: &RouteTable,
    filter: &RouteFilter,
    now: DateTime<Utc>,
) -> JsonRouteTable {
    let mut json = JsonRouteTable::default();
    show::walk(table, filter, |node, routes| {
        json.push(vrf, node, &routes, now);
    });
    json
}
