//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//


use const_addrs::net;
use ribd_routing::Master;
use ribd_routing::config::RibConfig;
use ribd_routing::error::Error;
use ribd_routing::rib::Route;
use ribd_routing::static_route::StaticRouteArgs;
use ribd_utils::ip::{AddressFamily, Safi};
use ribd_utils::nexthop::Nexthop;
use ribd_utils::protocol::Protocol;

//
// Helper functions.
//

// Returns a RIB manager with one interface attached to the default VRF:
// eth0 (ifindex 2) with address 192.0.2.10/24.
fn master() -> Master {
    master_with_config(RibConfig::default())
}

fn master_with_config(config: RibConfig) -> Master {
    let mut master = Master::new(config);
    master
        .interface_add("default", "eth0", 2, &[net!("192.0.2.10/24")])
        .unwrap();
    master
}

// Builds the arguments of an IPv4 unicast static route command.
fn ipv4_route(dest: &str) -> StaticRouteArgs {
    StaticRouteArgs::new(AddressFamily::Ipv4, Safi::Unicast, dest)
}

fn ipv4_route_via(dest: &str, gateway: &str) -> StaticRouteArgs {
    let mut args = ipv4_route(dest);
    args.gateway = Some(gateway.to_owned());
    args
}

fn static_route_add(
    master: &mut Master,
    args: &StaticRouteArgs,
) -> Result<(), Error> {
    master.configure_static_route(args)
}

fn static_route_del(
    master: &mut Master,
    args: &StaticRouteArgs,
) -> Result<(), Error> {
    let mut args = args.clone();
    args.negate = true;
    master.configure_static_route(&args)
}

// Returns the number of static descriptors configured in the given VRF.
fn static_route_count(master: &Master, vrf: &str) -> usize {
    master.vrfs.get_by_name(vrf).unwrap().static_routes.len()
}

// Builds a protocol route with the given nexthops.
fn protocol_route(
    protocol: Protocol,
    distance: u32,
    metric: u32,
    nexthops: Vec<Nexthop>,
) -> Route {
    Route::new(protocol, distance, metric, nexthops)
}
