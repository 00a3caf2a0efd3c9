//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::{Arc, Mutex};

use const_addrs::{ip, net, net6};
use ribd_routing::config::RibConfig;
use ribd_routing::error::Error;
use ribd_routing::rib::{RouteFlags, RouteTable};
use ribd_routing::static_route::{
    IFINDEX_UNKNOWN, StaticNexthop, StaticNexthopType, StaticRouteArgs,
};
use ribd_routing::vrf::{Vrf, VrfSelector};
use ribd_utils::ip::{AddressFamily, Safi};
use ribd_utils::mpls::LabelError;
use ribd_utils::nexthop::Nexthop;
use ribd_utils::protocol::Protocol;

use super::super::{
    ipv4_route, ipv4_route_via, master, master_with_config, protocol_route,
    static_route_add, static_route_count, static_route_del,
};

fn ipv4_unicast(vrf: &Vrf) -> &RouteTable {
    vrf.table(AddressFamily::Ipv4, Safi::Unicast).unwrap()
}

struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// Returns the debug messages logged while running the given closure.
fn capture_logs(f: impl FnOnce()) -> String {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_target(false)
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || LogWriter(writer.clone()))
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let logs = buf.lock().unwrap().clone();
    String::from_utf8(logs).unwrap()
}

#[test]
fn test_static_route_gateway() {
    let mut master = master();
    let args = ipv4_route_via("10.0.0.0/8", "192.0.2.1");
    static_route_add(&mut master, &args).unwrap();

    let vrf = master.vrfs.default_vrf();
    let descriptors = vrf.static_routes.get(
        AddressFamily::Ipv4,
        Safi::Unicast,
        &(net!("10.0.0.0/8"), None),
    );
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].nexthop, StaticNexthop::Gateway(ip!("192.0.2.1")));
    assert_eq!(
        descriptors[0].nexthop.nexthop_type(),
        StaticNexthopType::Ipv4Gateway
    );
    assert_eq!(descriptors[0].distance, 1);

    let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
    assert_eq!(node.routes.len(), 1);
    let route = &node.routes[0];
    assert_eq!(route.protocol, Protocol::Static);
    assert_eq!(route.distance, 1);
    assert!(route.is_selected());
    assert!(route.is_fib_installed());

    // The gateway is resolved through the connected route of eth0.
    let nexthop = &route.nexthops[0];
    assert_eq!(nexthop.addr(), Some(ip!("192.0.2.1")));
    assert_eq!(nexthop.ifindex, Some(2));
    assert!(nexthop.is_active());
    assert!(!nexthop.is_recursive());
}

#[test]
fn test_static_route_null0_withdraw() {
    let mut master = master();
    let mut args = ipv4_route("10.0.0.0/8");
    args.ifname = Some("Null0".to_owned());

    static_route_add(&mut master, &args).unwrap();
    {
        let vrf = master.vrfs.default_vrf();
        let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
        assert!(node.routes[0].flags.contains(RouteFlags::BLACKHOLE));
        assert!(node.routes[0].is_selected());
        assert!(node.routes[0].nexthops[0].is_blackhole());
    }

    static_route_del(&mut master, &args).unwrap();
    let vrf = master.vrfs.default_vrf();
    assert!(vrf.static_routes.is_empty());
    assert!(ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).is_none());
}

#[test]
fn test_static_route_reject() {
    let mut master = master();
    let mut args = ipv4_route("10.0.0.0/8");
    args.flag = Some("reject".to_owned());
    static_route_add(&mut master, &args).unwrap();
    {
        let vrf = master.vrfs.default_vrf();
        let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
        assert!(node.routes[0].flags.contains(RouteFlags::REJECT));
    }

    // Blackhole and reject nexthops share the same identity.
    args.flag = Some("blackhole".to_owned());
    static_route_add(&mut master, &args).unwrap();
    assert_eq!(static_route_count(&master, "default"), 1);
    let vrf = master.vrfs.default_vrf();
    let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
    assert!(node.routes[0].flags.contains(RouteFlags::BLACKHOLE));
    assert!(!node.routes[0].flags.contains(RouteFlags::REJECT));
}

#[test]
fn test_static_route_labels_mpls_disabled() {
    let config = RibConfig {
        mpls_enabled: false,
        ..Default::default()
    };
    let mut master = master_with_config(config);
    let mut args = ipv4_route_via("10.0.0.0/8", "192.0.2.1");
    args.labels = Some("16,17".to_owned());

    assert_eq!(static_route_add(&mut master, &args), Err(Error::MplsDisabled));
    assert_eq!(static_route_count(&master, "default"), 0);
    let vrf = master.vrfs.default_vrf();
    assert!(ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).is_none());
}

#[test]
fn test_static_route_labels() {
    let mut master = master();
    let mut args = ipv4_route_via("10.0.0.0/8", "192.0.2.1");

    args.labels = Some("16/17/18".to_owned());
    assert_eq!(
        static_route_add(&mut master, &args),
        Err(Error::Label(LabelError::TooMany))
    );
    args.labels = Some("3".to_owned());
    assert_eq!(
        static_route_add(&mut master, &args),
        Err(Error::Label(LabelError::Reserved))
    );
    args.labels = Some("16/foo".to_owned());
    assert_eq!(
        static_route_add(&mut master, &args),
        Err(Error::Label(LabelError::Malformed))
    );
    assert_eq!(static_route_count(&master, "default"), 0);

    args.labels = Some("16/17".to_owned());
    static_route_add(&mut master, &args).unwrap();
    let vrf = master.vrfs.default_vrf();
    let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
    assert_eq!(node.routes[0].nexthops[0].labels.values(), vec![16, 17]);
}

#[test]
fn test_static_route_idempotent() {
    let mut master = master();
    let args = ipv4_route_via("10.0.0.0/8", "192.0.2.1");

    static_route_add(&mut master, &args).unwrap();
    static_route_add(&mut master, &args).unwrap();
    assert_eq!(static_route_count(&master, "default"), 1);

    let vrf = master.vrfs.default_vrf();
    let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
    assert_eq!(node.routes.len(), 1);
    assert_eq!(node.routes[0].nexthops.len(), 1);
}

#[test]
fn test_static_route_install_logged_once() {
    let mut master = master();
    let args = ipv4_route_via("10.0.0.0/8", "192.0.2.1");

    let logs = capture_logs(|| static_route_add(&mut master, &args).unwrap());
    assert_eq!(logs.matches("static route installed").count(), 1);

    // Adding an identical route changes nothing and logs nothing.
    let logs = capture_logs(|| static_route_add(&mut master, &args).unwrap());
    assert!(!logs.contains("static route installed"));
    assert_eq!(static_route_count(&master, "default"), 1);
}

#[test]
fn test_static_route_round_trip() {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("172.16.0.0/12", "192.0.2.1"))
        .unwrap();
    let before = static_route_count(&master, "default");

    let mut args = ipv4_route_via("10.0.0.0/8", "192.0.2.1");
    args.tag = Some("100".to_owned());
    args.distance = Some("20".to_owned());
    static_route_add(&mut master, &args).unwrap();
    assert_eq!(static_route_count(&master, "default"), before + 1);

    static_route_del(&mut master, &args).unwrap();
    assert_eq!(static_route_count(&master, "default"), before);

    // Withdrawing again has no effect.
    static_route_del(&mut master, &args).unwrap();
    assert_eq!(static_route_count(&master, "default"), before);
}

#[test]
fn test_static_route_validation_order() {
    let config = RibConfig {
        mpls_enabled: false,
        ..Default::default()
    };
    let mut master = master_with_config(config);

    // Malformed destination wins over everything else.
    let mut args = ipv4_route("10.0.0.0/33");
    args.vrf = Some("red".to_owned());
    args.labels = Some("16".to_owned());
    assert_eq!(
        static_route_add(&mut master, &args),
        Err(Error::MalformedAddress("10.0.0.0/33".to_owned()))
    );

    // Source prefixes are IPv6-only.
    let mut args = ipv4_route("10.0.0.0/8");
    args.src = Some("10.1.0.0/16".to_owned());
    args.vrf = Some("red".to_owned());
    assert_eq!(
        static_route_add(&mut master, &args),
        Err(Error::MalformedSourceAddress("10.1.0.0/16".to_owned()))
    );

    // Unknown VRF before labels.
    let mut args = ipv4_route("10.0.0.0/8");
    args.vrf = Some("red".to_owned());
    args.labels = Some("16".to_owned());
    assert_eq!(
        static_route_add(&mut master, &args),
        Err(Error::VrfNotDefined("red".to_owned()))
    );

    // Labels before the nexthop.
    let mut args = ipv4_route("10.0.0.0/8");
    args.labels = Some("16".to_owned());
    args.flag = Some("x".to_owned());
    assert_eq!(static_route_add(&mut master, &args), Err(Error::MplsDisabled));

    let mut args = ipv4_route("10.0.0.0/8");
    args.flag = Some("x".to_owned());
    assert_eq!(
        static_route_add(&mut master, &args),
        Err(Error::MalformedFlag("x".to_owned()))
    );

    let args = ipv4_route_via("10.0.0.0/8", "2001:db8::1");
    assert_eq!(
        static_route_add(&mut master, &args),
        Err(Error::MalformedNexthopAddress("2001:db8::1".to_owned()))
    );

    assert_eq!(static_route_count(&master, "default"), 0);
}

#[test]
fn test_static_route_mask() {
    let mut master = master();
    let mut args = ipv4_route_via("10.1.2.3", "192.0.2.1");
    args.mask = Some("255.255.0.0".to_owned());
    static_route_add(&mut master, &args).unwrap();

    let vrf = master.vrfs.default_vrf();
    let route = vrf
        .static_routes
        .iter(AddressFamily::Ipv4, Safi::Unicast)
        .next()
        .unwrap();
    assert_eq!(route.prefix, net!("10.1.0.0/16"));

    args.mask = Some("255.255.0".to_owned());
    assert_eq!(
        static_route_add(&mut master, &args),
        Err(Error::MalformedMask("255.255.0".to_owned()))
    );
}

#[test]
fn test_static_route_host_bits_masked() {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("10.1.2.3/8", "192.0.2.1"))
        .unwrap();

    let vrf = master.vrfs.default_vrf();
    assert!(ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).is_some());
}

#[test]
fn test_nexthop_classifier() {
    let afs = [AddressFamily::Ipv4, AddressFamily::Ipv6];
    let gateways = [None, Some("192.0.2.1"), Some("2001:db8::1")];
    let ifnames = [None, Some("eth0"), Some("null0"), Some("Null0")];
    let flags = [None, Some("reject"), Some("blackhole"), Some("x")];

    for af in afs {
        for gateway in gateways {
            for ifname in ifnames {
                for flag in flags {
                    let result =
                        StaticNexthop::classify(af, gateway, ifname, flag);
                    assert_eq!(
                        result,
                        StaticNexthop::classify(af, gateway, ifname, flag)
                    );

                    let null0 = ifname
                        .is_some_and(|ifname| ifname.eq_ignore_ascii_case("null0"));
                    match (null0, flag) {
                        (true, Some(flag)) => assert_eq!(
                            result,
                            Err(Error::NullInterfaceFlag(flag.to_owned()))
                        ),
                        (true, None) => {
                            assert_eq!(result, Ok(StaticNexthop::Blackhole))
                        }
                        (false, Some("reject")) => {
                            assert_eq!(result, Ok(StaticNexthop::Reject))
                        }
                        (false, Some("blackhole")) => {
                            assert_eq!(result, Ok(StaticNexthop::Blackhole))
                        }
                        (false, Some(flag)) => assert_eq!(
                            result,
                            Err(Error::MalformedFlag(flag.to_owned()))
                        ),
                        (false, None) => (),
                    }
                }
            }
        }
    }

    let nexthop = StaticNexthop::classify(
        AddressFamily::Ipv6,
        Some("2001:db8::1"),
        Some("eth0"),
        None,
    )
    .unwrap();
    assert_eq!(nexthop.nexthop_type(), StaticNexthopType::Ipv6GatewayIfindex);

    let nexthop =
        StaticNexthop::classify(AddressFamily::Ipv4, None, None, None).unwrap();
    assert_eq!(nexthop, StaticNexthop::Blackhole);
}

#[test]
fn test_static_route_distances() {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("10.0.0.0/8", "192.0.2.1"))
        .unwrap();
    let mut args = ipv4_route_via("10.0.0.0/8", "192.0.2.2");
    args.distance = Some("10".to_owned());
    static_route_add(&mut master, &args).unwrap();

    let vrf = master.vrfs.default_vrf();
    let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
    assert_eq!(node.routes.len(), 2);
    assert_eq!(node.selected().unwrap().distance, 1);

    // Withdrawing the preferred entry leaves the backup one selected.
    drop(node);
    static_route_del(&mut master, &ipv4_route_via("10.0.0.0/8", "192.0.2.1"))
        .unwrap();
    let vrf = master.vrfs.default_vrf();
    let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
    assert_eq!(node.routes.len(), 1);
    assert_eq!(node.selected().unwrap().distance, 10);
}

#[test]
fn test_static_route_deferred_interface() {
    let mut master = master();
    let mut args = ipv4_route("10.0.0.0/8");
    args.ifname = Some("eth1".to_owned());
    static_route_add(&mut master, &args).unwrap();
    {
        let vrf = master.vrfs.default_vrf();
        let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
        assert!(node.selected().is_none());
        assert_eq!(node.routes[0].nexthops[0].ifindex, Some(IFINDEX_UNKNOWN));
    }

    // The nexthop becomes active once the interface shows up.
    master.interface_add("default", "eth1", 3, &[]).unwrap();
    {
        let vrf = master.vrfs.default_vrf();
        let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
        assert!(node.selected().is_some());
        assert_eq!(node.routes[0].nexthops[0].ifindex, Some(3));
    }

    master.interface_del("default", "eth1").unwrap();
    let vrf = master.vrfs.default_vrf();
    let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
    assert!(node.selected().is_none());
    assert_eq!(static_route_count(&master, "default"), 1);
}

#[test]
fn test_static_route_recursive() {
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

    let vrf = master.vrfs.default_vrf();
    let node = ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).unwrap();
    let nexthop = &node.selected().unwrap().nexthops[0];
    assert!(nexthop.is_recursive());
    assert_eq!(nexthop.resolved.len(), 1);
    assert_eq!(nexthop.resolved[0].addr(), Some(ip!("192.0.2.1")));
    assert_eq!(nexthop.resolved[0].ifindex, Some(2));
}

#[test]
fn test_static_route_recursive_chain() {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("10.0.0.0/8", "192.168.1.1"))
        .unwrap();
    static_route_add(
        &mut master,
        &ipv4_route_via("192.168.1.0/24", "172.16.0.1"),
    )
    .unwrap();
    {
        let vrf = master.vrfs.default_vrf();
        let table = ipv4_unicast(vrf);
        let node = table.get(&net!("10.0.0.0/8"), None).unwrap();
        assert!(node.selected().is_none());
        drop(node);
        let node = table.get(&net!("192.168.1.0/24"), None).unwrap();
        assert!(node.selected().is_none());
    }

    // Both links of the chain resolve once the last one becomes reachable.
    master
        .interface_add("default", "eth1", 3, &[net!("172.16.0.10/24")])
        .unwrap();
    let vrf = master.vrfs.default_vrf();
    let table = ipv4_unicast(vrf);
    let node = table.get(&net!("192.168.1.0/24"), None).unwrap();
    assert!(node.selected().is_some());
    drop(node);
    let node = table.get(&net!("10.0.0.0/8"), None).unwrap();
    let route = node.selected().unwrap();
    let nexthop = &route.nexthops[0];
    assert!(nexthop.is_recursive());
    assert_eq!(nexthop.resolved[0].addr(), Some(ip!("172.16.0.1")));
    assert_eq!(nexthop.resolved[0].ifindex, Some(3));
}

#[test]
fn test_static_mroute() {
    let mut master = master();
    let mut args =
        StaticRouteArgs::new(AddressFamily::Ipv4, Safi::Multicast, "10.0.0.0/8");
    args.gateway = Some("192.0.2.1".to_owned());
    static_route_add(&mut master, &args).unwrap();

    let vrf = master.vrfs.default_vrf();
    assert!(ipv4_unicast(vrf).get(&net!("10.0.0.0/8"), None).is_none());

    // Multicast gateways resolve through the unicast table.
    let mrib = vrf.table(AddressFamily::Ipv4, Safi::Multicast).unwrap();
    let node = mrib.get(&net!("10.0.0.0/8"), None).unwrap();
    let route = node.selected().unwrap();
    assert_eq!(route.nexthops[0].ifindex, Some(2));
}

#[test]
fn test_static_route_ipv6_source() {
    let mut master = master();
    let mut args =
        StaticRouteArgs::new(AddressFamily::Ipv6, Safi::Unicast, "2001:db8::/32");
    args.src = Some("2001:db8:1::/48".to_owned());
    args.ifname = Some("Null0".to_owned());
    static_route_add(&mut master, &args).unwrap();

    let vrf = master.vrfs.default_vrf();
    let table = vrf.table(AddressFamily::Ipv6, Safi::Unicast).unwrap();
    let src = net6!("2001:db8:1::/48");
    assert!(table.get(&net!("2001:db8::/32"), Some(&src)).is_some());
    assert!(table.get(&net!("2001:db8::/32"), None).is_none());

    // The same source prefix is rejected for IPv4 routes.
    let mut args = ipv4_route("10.0.0.0/8");
    args.src = Some("2001:db8:1::/48".to_owned());
    assert!(matches!(
        static_route_add(&mut master, &args),
        Err(Error::MalformedSourceAddress(_))
    ));
}

#[test]
fn test_traversal_guards_released() {
    let mut master = master();
    static_route_add(&mut master, &ipv4_route_via("10.0.0.0/8", "192.0.2.1"))
        .unwrap();
    master
        .show_route_at(AddressFamily::Ipv4, &VrfSelector::Default, "10.1.1.1")
        .unwrap();
    let _ = master.show_route_at(
        AddressFamily::Ipv4,
        &VrfSelector::Default,
        "203.0.113.1",
    );

    let vrf = master.vrfs.default_vrf();
    assert_eq!(ipv4_unicast(vrf).locked_nodes(), 0);
}
