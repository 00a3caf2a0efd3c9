//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ipnetwork::IpNetwork;
use ribd_utils::ip::AddressFamily;
use ribd_utils::protocol::Protocol;
use tracing::{debug, debug_span};

use crate::config::MulticastMode;
use crate::static_route::StaticNexthop;

// RIB debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    VrfCreate(&'a str),
    VrfDelete(&'a str),
    VrfEnable(&'a str, u32),
    VrfDisable(&'a str),
    InterfaceCreate(&'a str, &'a str, u32),
    InterfaceDelete(&'a str, &'a str),
    StaticRouteInstall(&'a str, &'a IpNetwork, &'a StaticNexthop, u8),
    StaticRouteUninstall(&'a str, &'a IpNetwork, &'a StaticNexthop),
    RouteInstall(&'a IpNetwork, Protocol, u32),
    RouteUninstall(&'a IpNetwork, Protocol),
    MulticastModeChange(MulticastMode),
    NhtResolveViaDefault(AddressFamily, bool),
    ImportTableEnable(u32, u8),
    ImportTableDisable(u32),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::VrfCreate(name)
            | Debug::VrfDelete(name)
            | Debug::VrfDisable(name) => {
                debug_span!("vrf", %name).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::VrfEnable(name, id) => {
                debug_span!("vrf", %name).in_scope(|| {
                    debug!(%id, "{}", self);
                });
            }
            Debug::InterfaceCreate(vrf, name, ifindex) => {
                debug_span!("vrf", name = %vrf).in_scope(|| {
                    debug!(%name, %ifindex, "{}", self);
                });
            }
            Debug::InterfaceDelete(vrf, name) => {
                debug_span!("vrf", name = %vrf).in_scope(|| {
                    debug!(%name, "{}", self);
                });
            }
            Debug::StaticRouteInstall(vrf, prefix, nexthop, distance) => {
                debug_span!("vrf", name = %vrf).in_scope(|| {
                    debug!(%prefix, %nexthop, %distance, "{}", self);
                });
            }
            Debug::StaticRouteUninstall(vrf, prefix, nexthop) => {
                debug_span!("vrf", name = %vrf).in_scope(|| {
                    debug!(%prefix, %nexthop, "{}", self);
                });
            }
            Debug::RouteInstall(prefix, protocol, distance) => {
                debug!(%prefix, %protocol, %distance, "{}", self);
            }
            Debug::RouteUninstall(prefix, protocol) => {
                debug!(%prefix, %protocol, "{}", self);
            }
            Debug::MulticastModeChange(mode) => {
                debug!(%mode, "{}", self);
            }
            Debug::NhtResolveViaDefault(af, enabled) => {
                debug!(address_family = %af, %enabled, "{}", self);
            }
            Debug::ImportTableEnable(table_id, distance) => {
                debug!(%table_id, %distance, "{}", self);
            }
            Debug::ImportTableDisable(table_id) => {
                debug!(%table_id, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::VrfCreate(..) => write!(f, "vrf created"),
            Debug::VrfDelete(..) => write!(f, "vrf deleted"),
            Debug::VrfEnable(..) => write!(f, "vrf enabled"),
            Debug::VrfDisable(..) => write!(f, "vrf disabled"),
            Debug::InterfaceCreate(..) => write!(f, "interface created"),
            Debug::InterfaceDelete(..) => write!(f, "interface deleted"),
            Debug::StaticRouteInstall(..) => {
                write!(f, "static route installed")
            }
            Debug::StaticRouteUninstall(..) => {
                write!(f, "static route uninstalled")
            }
            Debug::RouteInstall(..) => write!(f, "route installed"),
            Debug::RouteUninstall(..) => write!(f, "route uninstalled"),
            Debug::MulticastModeChange(..) => {
                write!(f, "multicast rpf lookup mode changed")
            }
            Debug::NhtResolveViaDefault(..) => {
                write!(f, "nexthop tracking resolve-via-default changed")
            }
            Debug::ImportTableEnable(..) => write!(f, "import table enabled"),
            Debug::ImportTableDisable(..) => {
                write!(f, "import table disabled")
            }
        }
    }
}
