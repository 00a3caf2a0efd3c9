//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use const_addrs::{ip, net};
use ribd_routing::Master;
use ribd_routing::error::Error;
use ribd_routing::northbound::state::ShowRouteArgs;
use ribd_routing::show::{OutputFormat, SHOW_ROUTE_V4_HEADER, format_age};
use ribd_routing::vrf::VrfSelector;
use ribd_utils::ip::{AddressFamily, Safi};
use ribd_utils::nexthop::Nexthop;
use ribd_utils::protocol::Protocol;

use super::super::{
    ipv4_route, ipv4_route_via, master, protocol_route, static_route_add,
};

// Adds a blackhole route for 10.0.0.0/8 to the given VRF, enabling it with
// the given id first.
fn red_vrf(master: &mut Master, id: u32) {
    master.vrf_add("red", 10);
    master.vrf_enable("red", id).unwrap();
    let mut args = ipv4_route("10.0.0.0/8");
    args.ifname = Some("Null0".to_owned());
    args.vrf = Some("red".to_owned());
    static_route_add(master, &args).unwrap();
}

#[test]
fn test_show_route() {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("10.0.0.0/8", "192.0.2.1"))
        .unwrap();

    let output = master
        .show_route(&ShowRouteArgs::new(AddressFamily::Ipv4))
        .unwrap();
    assert_eq!(
        output,
        format!(
            "{}{}{}",
            SHOW_ROUTE_V4_HEADER,
            "S>* 10.0.0.0/8 [1/0] via 192.0.2.1, eth0\n",
            "C>* 192.0.2.0/24 is directly connected, eth0\n"
        )
    );
}

#[test]
fn test_show_route_empty() {
    let master = Master::default();
    let output = master
        .show_route(&ShowRouteArgs::new(AddressFamily::Ipv4))
        .unwrap();
    assert_eq!(output, "");
}

#[test]
fn test_show_route_inactive_nexthop() {
    let mut master = master();
    let mut args = ipv4_route("10.0.0.0/8");
    args.ifname = Some("eth1".to_owned());
    static_route_add(&mut master, &args).unwrap();
    static_route_add(&mut master, &ipv4_route_via("172.16.0.0/12", "203.0.113.1"))
        .unwrap();

    let output = master
        .show_route(&ShowRouteArgs::new(AddressFamily::Ipv4))
        .unwrap();
    assert!(output.contains(
        "S   10.0.0.0/8 [1/0] is directly connected, unknown inactive\n"
    ));
    assert!(output.contains("S   172.16.0.0/12 [1/0] via 203.0.113.1 inactive\n"));
}

#[test]
fn test_show_route_recursive() {
    let mut master = master();
    let route = protocol_route(
        Protocol::Bgp,
        20,
        0,
        vec![Nexthop::address(ip!("192.0.2.1"), None)],
    );
    master
        .route_add("default", Safi::Unicast, net!("198.51.100.0/24"), None, route)
        .unwrap();
    static_route_add(&mut master, &ipv4_route_via("10.0.0.0/8", "198.51.100.1"))
        .unwrap();

    let output = master
        .show_route(&ShowRouteArgs::new(AddressFamily::Ipv4))
        .unwrap();
    assert!(output.contains(
        "S>* 10.0.0.0/8 [1/0] via 198.51.100.1 (recursive)\n\
         \x20 *                    via 192.0.2.1, eth0\n"
    ));
    assert!(output.contains("B>* 198.51.100.0/24 [20/0] via 192.0.2.1, eth0, "));

    let output = master
        .show_route_at(AddressFamily::Ipv4, &VrfSelector::Default, "10.0.0.0/8")
        .unwrap();
    assert_eq!(
        output,
        "Routing entry for 10.0.0.0/8\n\
         \x20 Known via \"static\", distance 1, metric 0, best\n\
         \x20 * 198.51.100.1 (recursive)\n\
         \x20 *   192.0.2.1, via eth0\n\
         \n"
    );
}

#[test]
fn test_show_route_at() {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("10.0.0.0/8", "192.0.2.1"))
        .unwrap();
    let expected = "Routing entry for 10.0.0.0/8\n\
                    \x20 Known via \"static\", distance 1, metric 0, best\n\
                    \x20 * 192.0.2.1, via eth0\n\
                    \n";

    // Exact prefix.
    let output = master
        .show_route_at(AddressFamily::Ipv4, &VrfSelector::Default, "10.0.0.0/8")
        .unwrap();
    assert_eq!(output, expected);

    // Longest match of an address.
    let output = master
        .show_route_at(AddressFamily::Ipv4, &VrfSelector::Default, "10.1.2.3")
        .unwrap();
    assert_eq!(output, expected);

    // Prefix lookups require an equal prefix length.
    let error = master
        .show_route_at(AddressFamily::Ipv4, &VrfSelector::Default, "10.0.0.0/16")
        .unwrap_err();
    assert_eq!(error, Error::NetworkNotInTable);
    assert_eq!(error.cli_message(), "% Network not in table");

    let error = master
        .show_route_at(AddressFamily::Ipv4, &VrfSelector::Default, "10.0.0.300")
        .unwrap_err();
    assert_eq!(error.cli_message(), "% Malformed IPv4 address");

    let error = master
        .show_route_at(
            AddressFamily::Ipv4,
            &VrfSelector::Named("green".to_owned()),
            "10.1.2.3",
        )
        .unwrap_err();
    assert_eq!(error, Error::VrfNotFound("green".to_owned()));
}

#[test]
fn test_show_route_at_all_vrfs() {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("10.0.0.0/8", "192.0.2.1"))
        .unwrap();
    red_vrf(&mut master, 5);
    master.vrf_add("blue", 11);

    let output = master
        .show_route_at(AddressFamily::Ipv4, &VrfSelector::All, "10.1.2.3")
        .unwrap();
    assert_eq!(
        output,
        "Routing entry for 10.0.0.0/8\n\
         \x20 Known via \"static\", distance 1, metric 0, best\n\
         \x20 * 192.0.2.1, via eth0\n\
         \n\
         Routing entry for 10.0.0.0/8\n\
         \x20 Known via \"static\", distance 1, metric 0, vrf red, best, blackhole\n\
         \x20 * directly connected, Null0\n\
         \n"
    );

    // VRFs without a match are skipped.
    let output = master
        .show_route_at(AddressFamily::Ipv4, &VrfSelector::All, "192.0.2.77")
        .unwrap();
    assert!(output.starts_with("Routing entry for 192.0.2.0/24\n"));
    assert_eq!(output.matches("Routing entry").count(), 1);
}

#[test]
fn test_show_route_vrf() {
    let mut master = master();
    red_vrf(&mut master, 5);

    let mut args = ShowRouteArgs::new(AddressFamily::Ipv4);
    args.vrf = VrfSelector::Named("red".to_owned());
    assert_eq!(
        master.show_route(&args).unwrap(),
        format!(
            "{}\nVRF red:\n{}",
            SHOW_ROUTE_V4_HEADER,
            "S>* 10.0.0.0/8 [1/0] is directly connected, Null0, bh\n"
        )
    );

    // Unknown and inactive VRFs aren't errors.
    args.vrf = VrfSelector::Named("green".to_owned());
    assert_eq!(master.show_route(&args).unwrap(), "vrf green not defined\n");
    args.format = OutputFormat::Json;
    assert_eq!(master.show_route(&args).unwrap(), "{}\n");

    master.vrf_disable("red").unwrap();
    args.vrf = VrfSelector::Named("red".to_owned());
    assert_eq!(master.show_route(&args).unwrap(), "{}\n");
    args.format = OutputFormat::Text;
    assert_eq!(master.show_route(&args).unwrap(), "vrf red inactive\n");
}

#[test]
fn test_show_route_all_vrfs() {
    let mut master = master();
    red_vrf(&mut master, 5);
    master.vrf_add("blue", 11);

    let mut args = ShowRouteArgs::new(AddressFamily::Ipv4);
    args.vrf = VrfSelector::All;
    assert_eq!(
        master.show_route(&args).unwrap(),
        format!(
            "{}{}{}\nVRF red:\n{}",
            SHOW_ROUTE_V4_HEADER,
            "C>* 192.0.2.0/24 is directly connected, eth0\n",
            SHOW_ROUTE_V4_HEADER,
            "S>* 10.0.0.0/8 [1/0] is directly connected, Null0, bh\n"
        )
    );
}

#[test]
fn test_show_route_ipv6_source() {
    let mut master = master();
    let mut args = ribd_routing::static_route::StaticRouteArgs::new(
        AddressFamily::Ipv6,
        Safi::Unicast,
        "2001:db8::/32",
    );
    args.src = Some("2001:db8:1::/48".to_owned());
    args.ifname = Some("Null0".to_owned());
    static_route_add(&mut master, &args).unwrap();

    let output = master
        .show_route(&ShowRouteArgs::new(AddressFamily::Ipv6))
        .unwrap();
    assert!(output.ends_with(
        "S>* 2001:db8::/32 from 2001:db8:1::/48 [1/0] is directly connected, Null0, bh\n"
    ));
}

#[test]
fn test_show_route_ripng_no_age() {
    let mut master = master();
    let route = protocol_route(
        Protocol::Ripng,
        120,
        2,
        vec![Nexthop::interface(Some(2))],
    );
    master
        .route_add("default", Safi::Unicast, net!("2001:db8:1::/48"), None, route)
        .unwrap();

    let output = master
        .show_route(&ShowRouteArgs::new(AddressFamily::Ipv6))
        .unwrap();
    assert!(output.ends_with(
        "R>* 2001:db8:1::/48 [120/2] is directly connected, eth0\n"
    ));

    let output = master
        .show_route_at(
            AddressFamily::Ipv6,
            &VrfSelector::Default,
            "2001:db8:1::1",
        )
        .unwrap();
    assert!(output.starts_with("Routing entry for 2001:db8:1::/48\n"));
    assert!(!output.contains("Last update"));

    let mut args = ShowRouteArgs::new(AddressFamily::Ipv6);
    args.format = OutputFormat::Json;
    let output = master.show_route(&args).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    let route = &json["2001:db8:1::/48"][0];
    assert_eq!(route["protocol"], "ripng");
    assert!(route.get("uptime").is_none());
}

#[test]
fn test_format_age() {
    assert_eq!(format_age(0), "00:00:00");
    assert_eq!(format_age(3661), "01:01:01");
    assert_eq!(format_age(90000), "1d01h00m");
    assert_eq!(format_age(8 * 86400 + 3 * 3600), "01w1d03h");
}
