//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ipnetwork::IpNetwork;
use ribd_utils::ip::{AddressFamily, IpNetworkExt, Ipv4NetworkExt};
use ribd_utils::protocol::Protocol;

use crate::error::Error;
use crate::rib::{Route, RouteNode};

// Route filter. An entry is displayed only if it passes all criteria.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RouteFilter {
    // Only show routes installed in the FIB.
    pub fib_only: bool,
    pub criterion: Option<FilterCriterion>,
    // OSPF instance. Implies the OSPF protocol.
    pub ospf_instance: Option<u16>,
}

// Mutually exclusive filter criteria.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterCriterion {
    // Route tag. A zero tag doesn't filter anything.
    Tag(u32),
    // Reference prefix covering the displayed prefixes.
    LongerPrefix(IpNetwork),
    SupernetsOnly,
    Protocol(Protocol),
}

// ===== impl FilterCriterion =====

impl FilterCriterion {
    // Builds a protocol criterion from a route type name valid for the given
    // address family.
    pub fn protocol(
        af: AddressFamily,
        name: &str,
    ) -> Result<FilterCriterion, Error> {
        Protocol::from_redist_name(af, name)
            .map(FilterCriterion::Protocol)
            .ok_or_else(|| Error::UnknownRouteType(name.to_owned()))
    }
}

// ===== impl RouteFilter =====

impl RouteFilter {
    pub fn fib_only(mut self, fib_only: bool) -> RouteFilter {
        self.fib_only = fib_only;
        self
    }

    pub fn criterion(mut self, criterion: FilterCriterion) -> RouteFilter {
        self.criterion = Some(criterion);
        self
    }

    pub fn ospf_instance(mut self, instance: u16) -> RouteFilter {
        self.ospf_instance = Some(instance);
        self
    }

    // Checks whether the route entry passes the filter.
    pub fn matches(&self, node: &RouteNode, route: &Route) -> bool {
        if self.fib_only && !route.is_fib_installed() {
            return false;
        }

        match &self.criterion {
            Some(FilterCriterion::Tag(tag)) => {
                if *tag != 0 && route.tag != *tag {
                    return false;
                }
            }
            Some(FilterCriterion::LongerPrefix(prefix)) => {
                if !prefix.covers(&node.prefix) {
                    return false;
                }
            }
            Some(FilterCriterion::SupernetsOnly) => {
                if let IpNetwork::V4(prefix) = node.prefix
                    && !prefix.is_supernet()
                {
                    return false;
                }
            }
            Some(FilterCriterion::Protocol(protocol)) => {
                if route.protocol != *protocol {
                    return false;
                }
            }
            None => (),
        }

        if let Some(instance) = self.ospf_instance
            && (route.protocol != Protocol::Ospf || route.instance != instance)
        {
            return false;
        }

        true
    }
}
