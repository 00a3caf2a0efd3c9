//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use const_addrs::net;
use ipnetwork::IpNetwork;
use ribd_routing::Master;
use ribd_routing::error::Error;
use ribd_routing::static_route::StaticRouteArgs;
use ribd_utils::ip::{AddressFamily, Safi};

use super::super::{ipv4_route_via, master, static_route_add};

fn mroute_add(master: &mut Master, dest: &str, distance: &str) {
    let mut args =
        StaticRouteArgs::new(AddressFamily::Ipv4, Safi::Multicast, dest);
    args.gateway = Some("192.0.2.1".to_owned());
    args.distance = Some(distance.to_owned());
    static_route_add(master, &args).unwrap();
}

// Unicast 10.1.0.0/16 and 172.16.0.0/12 with distance 1, multicast
// 10.0.0.0/8 with distance 5.
fn rpf_master() -> Master {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("10.1.0.0/16", "192.0.2.1"))
        .unwrap();
    static_route_add(&mut master, &ipv4_route_via("172.16.0.0/12", "192.0.2.1"))
        .unwrap();
    mroute_add(&mut master, "10.0.0.0/8", "5");
    master
}

fn lookup(master: &Master, addr: &str) -> Option<(Safi, IpNetwork)> {
    let addr = addr.parse::<Ipv4Addr>().unwrap();
    master
        .rpf_lookup(addr)
        .map(|(safi, node)| (safi, node.prefix))
}

#[test]
fn test_rpf_lookup_modes() {
    let mut master = rpf_master();
    let mrib = Some((Safi::Multicast, net!("10.0.0.0/8")));
    let urib = Some((Safi::Unicast, net!("10.1.0.0/16")));

    // The multicast RIB is preferred by default.
    assert_eq!(lookup(&master, "10.1.2.3"), mrib);
    assert_eq!(
        lookup(&master, "172.16.1.1"),
        Some((Safi::Unicast, net!("172.16.0.0/12")))
    );

    master.multicast_mode_set("mrib-then-urib").unwrap();
    assert_eq!(lookup(&master, "10.1.2.3"), mrib);

    master.multicast_mode_set("urib-only").unwrap();
    assert_eq!(lookup(&master, "10.1.2.3"), urib);

    master.multicast_mode_set("mrib-only").unwrap();
    assert_eq!(lookup(&master, "10.1.2.3"), mrib);
    assert_eq!(lookup(&master, "172.16.1.1"), None);

    master.multicast_mode_set("lower-distance").unwrap();
    assert_eq!(lookup(&master, "10.1.2.3"), urib);

    master.multicast_mode_set("longer-prefix").unwrap();
    assert_eq!(lookup(&master, "10.1.2.3"), urib);
    assert_eq!(
        lookup(&master, "172.16.1.1"),
        Some((Safi::Unicast, net!("172.16.0.0/12")))
    );

    assert_eq!(
        master.multicast_mode_set("fastest"),
        Err(Error::InvalidMulticastMode("fastest".to_owned()))
    );
}

#[test]
fn test_rpf_lookup_ties() {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("10.0.0.0/8", "192.0.2.1"))
        .unwrap();
    mroute_add(&mut master, "10.0.0.0/8", "1");
    let mrib = Some((Safi::Multicast, net!("10.0.0.0/8")));

    // Equal distances and prefix lengths favor the multicast RIB.
    master.multicast_mode_set("lower-distance").unwrap();
    assert_eq!(lookup(&master, "10.1.2.3"), mrib);
    master.multicast_mode_set("longer-prefix").unwrap();
    assert_eq!(lookup(&master, "10.1.2.3"), mrib);
}

#[test]
fn test_show_rpf_at() {
    let mut master = rpf_master();
    assert_eq!(
        master.show_rpf_at("10.1.2.3").unwrap(),
        "Routing entry for 10.0.0.0/8 using Multicast RIB\n\
         \x20 Known via \"static\", distance 5, metric 0, best\n\
         \x20 * 192.0.2.1, via eth0\n\
         \n"
    );

    master.multicast_mode_set("urib-only").unwrap();
    assert!(
        master
            .show_rpf_at("10.1.2.3")
            .unwrap()
            .starts_with("Routing entry for 10.1.0.0/16 using Unicast RIB\n")
    );

    assert_eq!(
        master.show_rpf_at("198.51.100.1").unwrap(),
        "% No match for RPF lookup\n"
    );
    assert_eq!(
        master.show_rpf_at("10.1.2"),
        Err(Error::MalformedAddress("10.1.2".to_owned()))
    );
}

#[test]
fn test_show_rpf() {
    let master = rpf_master();
    let output = master
        .show_rpf(ribd_routing::show::OutputFormat::Text)
        .unwrap();
    assert!(output.ends_with("S>* 10.0.0.0/8 [5/0] via 192.0.2.1, eth0\n"));
    assert!(!output.contains("10.1.0.0/16"));
}
