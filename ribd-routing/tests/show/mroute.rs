//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use const_addrs::net;
use ribd_routing::error::Error;
use ribd_routing::show::SHOW_ROUTE_V6_HEADER;
use ribd_routing::vrf::VrfSelector;
use ribd_utils::ip::Safi;
use ribd_utils::nexthop::Nexthop;
use ribd_utils::protocol::Protocol;

use super::super::{master, protocol_route};

#[test]
fn test_show_ipv6_mroute() {
    let mut master = master();
    master.vrf_add("red", 10);
    master.vrf_enable("red", 5).unwrap();
    for (vrf, prefix) in [
        ("default", net!("2001:db8:1::/48")),
        ("default", net!("2001:db8:2::/48")),
        ("red", net!("2001:db8:3::/48")),
    ] {
        let route = protocol_route(
            Protocol::Static,
            1,
            0,
            vec![Nexthop::interface(Some(2))],
        );
        master
            .route_add(vrf, Safi::Multicast, prefix, None, route)
            .unwrap();
    }

    let output = master.show_ipv6_mroute(&VrfSelector::Default).unwrap();
    assert_eq!(
        output,
        format!(
            "{}{}{}",
            SHOW_ROUTE_V6_HEADER,
            "S>* 2001:db8:1::/48 [1/0] is directly connected, eth0\n",
            "S>* 2001:db8:2::/48 [1/0] is directly connected, eth0\n"
        )
    );

    // The legend is printed once across all VRFs. Red has no interface
    // with ifindex 2.
    let output = master.show_ipv6_mroute(&VrfSelector::All).unwrap();
    assert_eq!(output.matches("Codes:").count(), 1);
    assert!(output.ends_with(
        "S   2001:db8:3::/48 [1/0] is directly connected, unknown inactive\n"
    ));

    assert_eq!(
        master.show_ipv6_mroute(&VrfSelector::Named("green".to_owned())),
        Err(Error::VrfNotFound("green".to_owned()))
    );
}

#[test]
fn test_show_ipv6_mroute_empty() {
    let master = master();
    assert_eq!(master.show_ipv6_mroute(&VrfSelector::All).unwrap(), "");
}
