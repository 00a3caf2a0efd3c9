//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use generational_arena::{Arena, Index};
use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use prefix_trie::map::PrefixMap;
use ribd_utils::ip::{AddressFamily, IpAddrExt, IpNetworkExt, Safi};
use ribd_utils::nexthop::{Nexthop, NexthopFlags, NexthopKind};
use ribd_utils::protocol::Protocol;

use crate::debug::Debug;
use crate::interface::Interfaces;

// Route node key: destination prefix plus optional IPv6 source prefix.
pub type NodeKey = (IpNetwork, Option<Ipv6Network>);

// Prefix-indexed route table for one (AFI, SAFI, VRF).
#[derive(Debug)]
pub struct RouteTable {
    pub af: AddressFamily,
    pub safi: Safi,
    // Route node arena.
    arena: Arena<RouteNode>,
    // Prefix trees mapping destination prefixes to route nodes.
    ipv4: PrefixMap<Ipv4Network, Index>,
    ipv6: PrefixMap<Ipv6Network, BTreeMap<Option<Ipv6Network>, Index>>,
    // Nodes pending best-path selection.
    update_queue: BTreeSet<NodeKey>,
}

#[derive(Debug)]
pub struct RouteNode {
    pub prefix: IpNetwork,
    pub src: Option<Ipv6Network>,
    // Route entries, one per contributing protocol, ordered by distance.
    pub routes: Vec<Route>,
    // Number of outstanding traversal references.
    lock: Cell<usize>,
}

// Scoped traversal reference to a route node.
//
// The node is locked while the guard is alive and can't be removed from the
// table.
#[derive(Debug)]
pub struct NodeGuard<'a> {
    node: &'a RouteNode,
}

#[derive(Clone, Debug)]
pub struct Route {
    pub protocol: Protocol,
    pub instance: u16,
    pub distance: u32,
    pub metric: u32,
    // Route tag. Zero means no tag.
    pub tag: u32,
    pub mtu: u32,
    pub vrf_id: u32,
    pub refcnt: u32,
    pub flags: RouteFlags,
    pub status: RouteStatus,
    pub last_updated: DateTime<Utc>,
    pub nexthops: Vec<Nexthop>,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct RouteFlags: u8 {
        const SELECTED = 0x01;
        const BLACKHOLE = 0x02;
        const REJECT = 0x04;
        const IBGP = 0x08;
        const REMOVED = 0x10;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct RouteStatus: u8 {
        const FIB_INSTALLED = 0x01;
    }
}

// ===== impl RouteTable =====

impl RouteTable {
    pub fn new(af: AddressFamily, safi: Safi) -> RouteTable {
        RouteTable {
            af,
            safi,
            arena: Default::default(),
            ipv4: Default::default(),
            ipv6: Default::default(),
            update_queue: Default::default(),
        }
    }

    // Returns the number of route nodes.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    // Returns the number of route nodes currently referenced by a guard.
    pub fn locked_nodes(&self) -> usize {
        self.arena
            .iter()
            .filter(|(_, node)| node.is_locked())
            .count()
    }

    // Returns the node for the given destination and source prefixes.
    pub fn get(
        &self,
        prefix: &IpNetwork,
        src: Option<&Ipv6Network>,
    ) -> Option<NodeGuard<'_>> {
        self.node_idx(&prefix.apply_mask(), src)
            .map(|node_idx| NodeGuard::new(&self.arena[node_idx]))
    }

    // Returns an iterator visiting all route nodes in prefix order.
    pub fn iter(&self) -> impl Iterator<Item = NodeGuard<'_>> + '_ {
        let ipv4 = self.ipv4.iter().map(|(_, node_idx)| *node_idx);
        let ipv6 = self
            .ipv6
            .iter()
            .flat_map(|(_, srcs)| srcs.values().copied());
        ipv4.chain(ipv6)
            .map(|node_idx| NodeGuard::new(&self.arena[node_idx]))
    }

    // Returns the most specific node covering the given prefix.
    pub fn lookup(&self, prefix: &IpNetwork) -> Option<NodeGuard<'_>> {
        self.covering(prefix)
            .next()
            .map(|node_idx| NodeGuard::new(&self.arena[node_idx]))
    }

    // Returns the most specific node covering the given address that has a
    // selected route. Less specific nodes are tried in turn.
    pub fn lookup_selected(&self, addr: &IpAddr) -> Option<NodeGuard<'_>> {
        self.covering(&addr.to_host_prefix())
            .find(|node_idx| self.arena[*node_idx].selected().is_some())
            .map(|node_idx| NodeGuard::new(&self.arena[node_idx]))
    }

    // Adds a route to the table, replacing any route from the same origin.
    pub(crate) fn route_add(
        &mut self,
        prefix: IpNetwork,
        src: Option<Ipv6Network>,
        route: Route,
    ) {
        let prefix = prefix.apply_mask();
        let node_idx = self.node_idx_or_insert(prefix, src);
        let node = &mut self.arena[node_idx];

        node.routes.retain(|old| !old.same_origin(&route));
        let pos = node
            .routes
            .partition_point(|old| old.distance <= route.distance);
        node.routes.insert(pos, route);

        // Add route node to the update queue.
        self.update_queue.insert((prefix, src));
    }

    // Removes a route from the table.
    //
    // The distance is only taken into account for static routes, which may
    // have one entry per distance.
    pub(crate) fn route_del(
        &mut self,
        prefix: IpNetwork,
        src: Option<Ipv6Network>,
        protocol: Protocol,
        instance: u16,
        distance: u32,
    ) -> bool {
        let prefix = prefix.apply_mask();
        let Some(node_idx) = self.node_idx(&prefix, src.as_ref()) else {
            return false;
        };
        let node = &mut self.arena[node_idx];

        // Find route entry from the same origin.
        let Some(route) = node.routes.iter_mut().find(|route| {
            route.protocol == protocol
                && route.instance == instance
                && (protocol != Protocol::Static || route.distance == distance)
        }) else {
            return false;
        };

        // Mark route as removed.
        route.flags.insert(RouteFlags::REMOVED);

        // Add route node to the update queue.
        self.update_queue.insert((prefix, src));
        true
    }

    // Schedules all route nodes for reprocessing.
    pub(crate) fn requeue_all(&mut self) {
        self.update_queue
            .extend(self.arena.iter().map(|(_, node)| (node.prefix, node.src)));
    }

    // Processes route nodes present in the update queue.
    //
    // Gateways are resolved through `resolver` when given, or through this
    // same table otherwise.
    pub(crate) fn process_update_queue(
        &mut self,
        interfaces: &Interfaces,
        resolver: Option<&RouteTable>,
        resolve_via_default: bool,
    ) {
        let mut changed = false;
        while let Some(key) = self.update_queue.pop_first() {
            changed |= self.process_node(
                &key,
                interfaces,
                resolver,
                resolve_via_default,
            );
        }

        // Gateway resolution depends on the selected routes of other nodes.
        if changed || resolver.is_some() {
            let dependents = self
                .arena
                .iter()
                .filter(|(_, node)| {
                    node.routes.iter().any(Route::has_gateway_nexthops)
                })
                .map(|(_, node)| (node.prefix, node.src))
                .collect::<Vec<_>>();

            // Repeat until no best path changes, so that chains of recursive
            // nexthops settle regardless of arena order.
            for _ in 0..=dependents.len() {
                let mut changed = false;
                for key in &dependents {
                    changed |= self.process_node(
                        key,
                        interfaces,
                        resolver,
                        resolve_via_default,
                    );
                }
                if !changed {
                    break;
                }
            }
        }
    }

    // Selects the best route of the given node and updates the FIB state of
    // all its routes. Returns whether the selected route has changed.
    fn process_node(
        &mut self,
        key: &NodeKey,
        interfaces: &Interfaces,
        resolver: Option<&RouteTable>,
        resolve_via_default: bool,
    ) -> bool {
        let (prefix, src) = key;
        let Some(node_idx) = self.node_idx(prefix, src.as_ref()) else {
            return false;
        };

        // Find the origin of the old best route, if one exists.
        let old_best = self.arena[node_idx]
            .selected()
            .map(|route| (route.protocol, route.instance, route.distance));

        // Remove routes marked with the REMOVED flag.
        self.arena[node_idx]
            .routes
            .retain(|route| !route.flags.contains(RouteFlags::REMOVED));

        // Resolve nexthops.
        let resolver = resolver.unwrap_or(&*self);
        let nexthops = self.arena[node_idx]
            .routes
            .iter()
            .map(|route| {
                route
                    .nexthops
                    .iter()
                    .map(|nexthop| {
                        resolve_nexthop(
                            resolver,
                            prefix,
                            nexthop,
                            interfaces,
                            resolve_via_default,
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let node = &mut self.arena[node_idx];
        for (route, nexthops) in node.routes.iter_mut().zip(nexthops) {
            route.nexthops = nexthops;
        }

        // Select the route with the lowest distance among the routes that
        // have at least one active nexthop.
        let best = node
            .routes
            .iter()
            .enumerate()
            .filter(|(_, route)| route.nexthops.iter().any(Nexthop::is_active))
            .min_by_key(|(_, route)| (route.distance, route.metric))
            .map(|(idx, _)| idx);
        for (idx, route) in node.routes.iter_mut().enumerate() {
            let selected = best == Some(idx);
            route.flags.set(RouteFlags::SELECTED, selected);
            route.status.set(RouteStatus::FIB_INSTALLED, selected);
            for nexthop in route.nexthops.iter_mut() {
                nexthop_set_fib(nexthop, selected);
            }
        }

        let new_best = node
            .selected()
            .map(|route| (route.protocol, route.instance, route.distance));
        if old_best != new_best {
            match (old_best, new_best) {
                (_, Some((protocol, _, distance))) => {
                    Debug::RouteInstall(prefix, protocol, distance).log();
                }
                (Some((protocol, _, _)), None) => {
                    Debug::RouteUninstall(prefix, protocol).log();
                }
                (None, None) => (),
            }
        }

        // Remove route node once it has no routes left and no one is
        // referencing it.
        if node.routes.is_empty() && !node.is_locked() {
            self.node_remove(node_idx);
        }

        old_best != new_best
    }

    // Resolves a gateway address through the routes of this table.
    fn resolve_gateway(
        &self,
        prefix: &IpNetwork,
        addr: IpAddr,
        nexthop: &mut Nexthop,
        resolve_via_default: bool,
    ) -> bool {
        let Some(route_node) = self
            .covering(&addr.to_host_prefix())
            .map(|node_idx| &self.arena[node_idx])
            .filter(|node| node.prefix != *prefix)
            .find(|node| node.selected().is_some())
        else {
            return false;
        };
        if route_node.prefix.prefix() == 0 && !resolve_via_default {
            return false;
        }
        let Some(route) = route_node.selected() else {
            return false;
        };

        if route.protocol == Protocol::Connected {
            nexthop.ifindex = route
                .nexthops
                .iter()
                .find_map(|resolving_nh| resolving_nh.ifindex);
            nexthop.flags.insert(NexthopFlags::IFINDEX_RESOLVED);
            return true;
        }

        nexthop.flags.insert(NexthopFlags::RECURSIVE);
        for resolving_nh in route.nexthops.iter().filter(|nh| nh.is_active()) {
            if resolving_nh.is_recursive() {
                nexthop.resolved.extend(resolving_nh.resolved.iter().cloned());
            } else {
                let mut resolving_nh = resolving_nh.clone();
                resolving_nh.resolved.clear();
                nexthop.resolved.push(resolving_nh);
            }
        }
        !nexthop.resolved.is_empty()
    }

    // Returns an iterator over the nodes covering the given prefix, from the
    // most specific to the least specific one. Only nodes without a source
    // prefix are considered.
    fn covering(&self, prefix: &IpNetwork) -> impl Iterator<Item = Index> + '_ {
        let prefix = *prefix;
        (0..=prefix.prefix()).rev().filter_map(move |plen| match prefix {
            IpNetwork::V4(prefix) => {
                let prefix = Ipv4Network::new(prefix.ip(), plen).ok()?;
                let prefix = Ipv4Network::new(prefix.network(), plen).ok()?;
                self.ipv4.get(&prefix).copied()
            }
            IpNetwork::V6(prefix) => {
                let prefix = Ipv6Network::new(prefix.ip(), plen).ok()?;
                let prefix = Ipv6Network::new(prefix.network(), plen).ok()?;
                self.ipv6
                    .get(&prefix)
                    .and_then(|srcs| srcs.get(&None))
                    .copied()
            }
        })
    }

    fn node_idx(
        &self,
        prefix: &IpNetwork,
        src: Option<&Ipv6Network>,
    ) -> Option<Index> {
        match prefix {
            IpNetwork::V4(prefix) => self.ipv4.get(prefix).copied(),
            IpNetwork::V6(prefix) => self
                .ipv6
                .get(prefix)
                .and_then(|srcs| srcs.get(&src.copied()))
                .copied(),
        }
    }

    fn node_idx_or_insert(
        &mut self,
        prefix: IpNetwork,
        src: Option<Ipv6Network>,
    ) -> Index {
        if let Some(node_idx) = self.node_idx(&prefix, src.as_ref()) {
            return node_idx;
        }

        let node = RouteNode {
            prefix,
            src,
            routes: vec![],
            lock: Cell::new(0),
        };
        let node_idx = self.arena.insert(node);
        match prefix {
            IpNetwork::V4(prefix) => {
                self.ipv4.insert(prefix, node_idx);
            }
            IpNetwork::V6(prefix) => {
                self.ipv6
                    .entry(prefix)
                    .or_default()
                    .insert(src, node_idx);
            }
        }
        node_idx
    }

    fn node_remove(&mut self, node_idx: Index) {
        let Some(node) = self.arena.remove(node_idx) else {
            return;
        };
        match node.prefix {
            IpNetwork::V4(prefix) => {
                self.ipv4.remove(&prefix);
            }
            IpNetwork::V6(prefix) => {
                if let Some(srcs) = self.ipv6.get_mut(&prefix) {
                    srcs.remove(&node.src);
                    if srcs.is_empty() {
                        self.ipv6.remove(&prefix);
                    }
                }
            }
        }
    }
}

// ===== impl RouteNode =====

impl RouteNode {
    // Returns the selected route, if any.
    pub fn selected(&self) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.flags.contains(RouteFlags::SELECTED))
    }

    pub fn is_locked(&self) -> bool {
        self.lock.get() > 0
    }
}

// ===== impl NodeGuard =====

impl<'a> NodeGuard<'a> {
    fn new(node: &'a RouteNode) -> NodeGuard<'a> {
        node.lock.set(node.lock.get() + 1);
        NodeGuard { node }
    }
}

impl std::ops::Deref for NodeGuard<'_> {
    type Target = RouteNode;

    fn deref(&self) -> &RouteNode {
        self.node
    }
}

impl Drop for NodeGuard<'_> {
    fn drop(&mut self) {
        self.node.lock.set(self.node.lock.get() - 1);
    }
}

// ===== impl Route =====

impl Route {
    pub fn new(
        protocol: Protocol,
        distance: u32,
        metric: u32,
        nexthops: Vec<Nexthop>,
    ) -> Route {
        Route {
            protocol,
            instance: 0,
            distance,
            metric,
            tag: 0,
            mtu: 0,
            vrf_id: 0,
            refcnt: 0,
            flags: RouteFlags::empty(),
            status: RouteStatus::empty(),
            last_updated: Utc::now(),
            nexthops,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.flags.contains(RouteFlags::SELECTED)
    }

    pub fn is_fib_installed(&self) -> bool {
        self.status.contains(RouteStatus::FIB_INSTALLED)
    }

    // Checks whether both routes come from the same origin.
    //
    // Static routes may have one entry per distance.
    fn same_origin(&self, other: &Route) -> bool {
        self.protocol == other.protocol
            && self.instance == other.instance
            && (self.protocol != Protocol::Static
                || self.distance == other.distance)
    }

    fn has_gateway_nexthops(&self) -> bool {
        self.nexthops.iter().any(|nexthop| {
            nexthop.addr().is_some()
                && (nexthop.ifindex.is_none()
                    || nexthop.flags.contains(NexthopFlags::IFINDEX_RESOLVED))
        })
    }
}

// ===== helper functions =====

fn nexthop_set_fib(nexthop: &mut Nexthop, selected: bool) {
    let fib = selected && nexthop.is_active();
    nexthop.flags.set(NexthopFlags::FIB, fib);
    for resolved in nexthop.resolved.iter_mut() {
        nexthop_set_fib(resolved, fib);
    }
}

// Computes the state of a nexthop. Gateways are resolved through the
// selected routes of the `resolver` table.
fn resolve_nexthop(
    resolver: &RouteTable,
    prefix: &IpNetwork,
    nexthop: &Nexthop,
    interfaces: &Interfaces,
    resolve_via_default: bool,
) -> Nexthop {
    let mut nexthop = nexthop.clone();
    nexthop.flags.remove(
        NexthopFlags::ACTIVE | NexthopFlags::FIB | NexthopFlags::RECURSIVE,
    );
    if nexthop.flags.contains(NexthopFlags::IFINDEX_RESOLVED) {
        nexthop.ifindex = None;
        nexthop.flags.remove(NexthopFlags::IFINDEX_RESOLVED);
    }
    nexthop.resolved.clear();

    let kind = nexthop.kind;
    let active = match kind {
        NexthopKind::Blackhole => true,
        NexthopKind::Interface => nexthop
            .ifindex
            .is_some_and(|ifindex| interfaces.get_by_ifindex(ifindex).is_some()),
        NexthopKind::Address(_) if nexthop.ifindex.is_some() => nexthop
            .ifindex
            .is_some_and(|ifindex| interfaces.get_by_ifindex(ifindex).is_some()),
        NexthopKind::Address(addr) => resolver.resolve_gateway(
            prefix,
            addr,
            &mut nexthop,
            resolve_via_default,
        ),
    };
    nexthop.flags.set(NexthopFlags::ACTIVE, active);
    nexthop
}
