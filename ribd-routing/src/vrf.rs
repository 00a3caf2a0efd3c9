//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, HashMap};

use generational_arena::{Arena, Index};
use ipnetwork::{IpNetwork, Ipv6Network};
use ribd_utils::ip::{AddressFamilies, AddressFamily, IpNetworkExt, Safi};
use ribd_utils::nexthop::Nexthop;
use ribd_utils::protocol::Protocol;

use crate::config::MAIN_TABLE_ID;
use crate::debug::Debug;
use crate::interface::Interfaces;
use crate::rib::{NodeKey, Route, RouteTable};
use crate::static_route::{self, StaticRoutes};

pub const VRF_DEFAULT_NAME: &str = "default";
pub const VRF_DEFAULT_ID: u32 = 0;

// Tables created for every active VRF.
const VRF_TABLES: [(AddressFamily, Safi); 4] = [
    (AddressFamily::Ipv4, Safi::Unicast),
    (AddressFamily::Ipv4, Safi::Multicast),
    (AddressFamily::Ipv6, Safi::Unicast),
    (AddressFamily::Ipv6, Safi::Multicast),
];

#[derive(Debug)]
pub struct Vrf {
    pub name: String,
    // VRF id. `None` while the VRF is inactive.
    pub id: Option<u32>,
    // Kernel routing table.
    pub table_id: u32,
    pub interfaces: Interfaces,
    // Route tables. They only exist while the VRF is active.
    pub tables: BTreeMap<(AddressFamily, Safi), RouteTable>,
    pub static_routes: StaticRoutes,
}

#[derive(Debug)]
pub struct Vrfs {
    // VRF arena.
    arena: Arena<Vrf>,
    // VRF binary tree keyed by name.
    name_tree: BTreeMap<String, Index>,
    // VRF hash table keyed by id.
    id_tree: HashMap<u32, Index>,
}

// Set of VRFs a query applies to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VrfSelector {
    Default,
    Named(String),
    All,
}

// ===== impl Vrf =====

impl Vrf {
    fn new(name: String, table_id: u32) -> Vrf {
        Vrf {
            name,
            id: None,
            table_id,
            interfaces: Default::default(),
            tables: Default::default(),
            static_routes: Default::default(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == VRF_DEFAULT_NAME
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    pub fn table(&self, af: AddressFamily, safi: Safi) -> Option<&RouteTable> {
        self.tables.get(&(af, safi))
    }

    pub(crate) fn table_mut(
        &mut self,
        af: AddressFamily,
        safi: Safi,
    ) -> Option<&mut RouteTable> {
        self.tables.get_mut(&(af, safi))
    }

    // Activates the VRF, creating its tables and installing its connected and
    // static routes.
    pub(crate) fn enable(
        &mut self,
        id: u32,
        resolve_via_default: &AddressFamilies<bool>,
    ) {
        Debug::VrfEnable(&self.name, id).log();

        self.id = Some(id);
        for (af, safi) in VRF_TABLES {
            self.tables
                .entry((af, safi))
                .or_insert_with(|| RouteTable::new(af, safi));
        }

        let connected = self
            .interfaces
            .iter()
            .map(|iface| (iface.ifindex, iface.addresses.clone()))
            .collect::<Vec<_>>();
        for (ifindex, addresses) in connected {
            for addr in addresses {
                self.connected_route_add(addr, ifindex);
            }
        }
        for (af, safi, key) in self.static_routes.keys() {
            self.static_route_sync(af, safi, &key);
        }
        self.process_update_queue(resolve_via_default);
    }

    // Deactivates the VRF. Its tables are released while the static route
    // descriptors are kept.
    pub(crate) fn disable(&mut self) {
        Debug::VrfDisable(&self.name).log();

        self.id = None;
        self.tables.clear();
    }

    // Adds or updates an interface along with its addresses.
    pub(crate) fn interface_add(
        &mut self,
        name: &str,
        ifindex: u32,
        addresses: &[IpNetwork],
        resolve_via_default: &AddressFamilies<bool>,
    ) {
        Debug::InterfaceCreate(&self.name, name, ifindex).log();

        self.interfaces.update(name.to_owned(), ifindex);
        if let Some(iface) = self.interfaces.get_mut_by_name(name) {
            iface.addresses.extend(addresses.iter().copied());
        }
        for addr in addresses {
            self.connected_route_add(*addr, ifindex);
        }

        // Resolve static nexthops waiting for this interface.
        for (af, safi, key) in
            self.static_routes.update_ifindex(name, Some(ifindex))
        {
            self.static_route_sync(af, safi, &key);
        }
        self.process_update_queue(resolve_via_default);
    }

    // Removes an interface. Static nexthops referencing it become deferred.
    pub(crate) fn interface_del(
        &mut self,
        name: &str,
        resolve_via_default: &AddressFamilies<bool>,
    ) -> bool {
        let Some(iface) = self.interfaces.remove(name) else {
            return false;
        };
        Debug::InterfaceDelete(&self.name, name).log();

        for addr in &iface.addresses {
            let addr = addr.apply_mask();
            if let Some(table) =
                self.table_mut(addr.address_family(), Safi::Unicast)
            {
                table.route_del(addr, None, Protocol::Connected, 0, 0);
            }
        }
        for (af, safi, key) in self.static_routes.update_ifindex(name, None) {
            self.static_route_sync(af, safi, &key);
        }
        self.process_update_queue(resolve_via_default);
        true
    }

    // Adds a route learned from another source to one of the VRF tables.
    pub(crate) fn route_add(
        &mut self,
        safi: Safi,
        prefix: IpNetwork,
        src: Option<Ipv6Network>,
        mut route: Route,
    ) -> bool {
        route.vrf_id = self.id.unwrap_or(VRF_DEFAULT_ID);
        let Some(table) = self.table_mut(prefix.address_family(), safi) else {
            return false;
        };
        table.route_add(prefix, src, route);
        true
    }

    // Removes a route learned from another source.
    pub(crate) fn route_del(
        &mut self,
        safi: Safi,
        prefix: IpNetwork,
        src: Option<Ipv6Network>,
        protocol: Protocol,
        instance: u16,
    ) -> bool {
        let Some(table) = self.table_mut(prefix.address_family(), safi) else {
            return false;
        };
        table.route_del(prefix, src, protocol, instance, 0)
    }

    // Reconciles the RIB entries of a prefix with its static descriptors.
    pub(crate) fn static_route_sync(
        &mut self,
        af: AddressFamily,
        safi: Safi,
        key: &NodeKey,
    ) {
        let vrf_id = self.id.unwrap_or(VRF_DEFAULT_ID);
        let rib_routes = static_route::rib_routes(
            self.static_routes.get(af, safi, key),
            vrf_id,
        );
        let Some(table) = self.tables.get_mut(&(af, safi)) else {
            return;
        };
        let (prefix, src) = *key;

        // Remove entries whose distance is no longer configured.
        let stale = table
            .get(&prefix, src.as_ref())
            .map(|node| {
                node.routes
                    .iter()
                    .filter(|route| route.protocol == Protocol::Static)
                    .map(|route| route.distance)
                    .filter(|distance| {
                        u8::try_from(*distance)
                            .map_or(true, |d| !rib_routes.contains_key(&d))
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        for distance in stale {
            table.route_del(prefix, src, Protocol::Static, 0, distance);
        }

        for (_, route) in rib_routes {
            table.route_add(prefix, src, route);
        }
    }

    // Runs best-path selection on all pending route nodes.
    //
    // Multicast tables resolve their gateways through the unicast table of
    // the same address family, so unicast tables are processed first.
    pub(crate) fn process_update_queue(
        &mut self,
        resolve_via_default: &AddressFamilies<bool>,
    ) {
        for af in [AddressFamily::Ipv4, AddressFamily::Ipv6] {
            let resolve_via_default = *resolve_via_default.get(af);
            if let Some(table) = self.tables.get_mut(&(af, Safi::Unicast)) {
                table.process_update_queue(
                    &self.interfaces,
                    None,
                    resolve_via_default,
                );
            }
            if let Some(mut table) = self.tables.remove(&(af, Safi::Multicast))
            {
                table.process_update_queue(
                    &self.interfaces,
                    self.tables.get(&(af, Safi::Unicast)),
                    resolve_via_default,
                );
                self.tables.insert((af, Safi::Multicast), table);
            }
        }
    }

    fn connected_route_add(&mut self, addr: IpNetwork, ifindex: u32) {
        let prefix = addr.apply_mask();
        let vrf_id = self.id.unwrap_or(VRF_DEFAULT_ID);
        let Some(table) = self.table_mut(prefix.address_family(), Safi::Unicast)
        else {
            return;
        };
        let mut route = Route::new(
            Protocol::Connected,
            0,
            0,
            vec![Nexthop::interface(Some(ifindex))],
        );
        route.vrf_id = vrf_id;
        table.route_add(prefix, None, route);
    }
}

// ===== impl Vrfs =====

impl Vrfs {
    // Creates the VRF list with the default VRF, which is always active.
    pub fn new(main_table_id: u32) -> Vrfs {
        let mut vrfs = Vrfs {
            arena: Default::default(),
            name_tree: Default::default(),
            id_tree: Default::default(),
        };
        vrfs.add(VRF_DEFAULT_NAME, main_table_id);
        vrfs.enable(VRF_DEFAULT_NAME, VRF_DEFAULT_ID, &Default::default());
        vrfs
    }

    // Adds a VRF in the inactive state. Returns false if it already exists.
    pub(crate) fn add(&mut self, name: &str, table_id: u32) -> bool {
        if self.name_tree.contains_key(name) {
            return false;
        }
        Debug::VrfCreate(name).log();

        let vrf = Vrf::new(name.to_owned(), table_id);
        let vrf_idx = self.arena.insert(vrf);
        self.name_tree.insert(name.to_owned(), vrf_idx);
        true
    }

    // Activates a VRF with the given id.
    pub(crate) fn enable(
        &mut self,
        name: &str,
        id: u32,
        resolve_via_default: &AddressFamilies<bool>,
    ) -> bool {
        let Some(vrf_idx) = self.name_tree.get(name).copied() else {
            return false;
        };
        let vrf = &mut self.arena[vrf_idx];
        if let Some(old_id) = vrf.id {
            if old_id == id {
                return true;
            }
            self.id_tree.remove(&old_id);
        }
        vrf.enable(id, resolve_via_default);
        self.id_tree.insert(id, vrf_idx);
        true
    }

    // Deactivates a VRF. The default VRF can't be deactivated.
    pub(crate) fn disable(&mut self, name: &str) -> bool {
        let Some(vrf_idx) = self.name_tree.get(name).copied() else {
            return false;
        };
        let vrf = &mut self.arena[vrf_idx];
        if vrf.is_default() {
            return false;
        }
        if let Some(id) = vrf.id {
            self.id_tree.remove(&id);
        }
        vrf.disable();
        true
    }

    // Deletes a VRF along with its static routes. The default VRF can't be
    // deleted.
    pub(crate) fn delete(&mut self, name: &str) -> bool {
        if name == VRF_DEFAULT_NAME {
            return false;
        }
        let Some(vrf_idx) = self.name_tree.remove(name) else {
            return false;
        };
        let Some(vrf) = self.arena.remove(vrf_idx) else {
            return false;
        };
        if let Some(id) = vrf.id {
            self.id_tree.remove(&id);
        }
        for route in vrf.static_routes.iter_all() {
            Debug::StaticRouteUninstall(&vrf.name, &route.prefix, &route.nexthop)
                .log();
        }
        Debug::VrfDelete(name).log();
        true
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Vrf> {
        self.name_tree
            .get(name)
            .copied()
            .map(|vrf_idx| &self.arena[vrf_idx])
    }

    pub(crate) fn get_mut_by_name(&mut self, name: &str) -> Option<&mut Vrf> {
        self.name_tree
            .get(name)
            .copied()
            .map(move |vrf_idx| &mut self.arena[vrf_idx])
    }

    pub fn get_by_id(&self, id: u32) -> Option<&Vrf> {
        self.id_tree
            .get(&id)
            .copied()
            .map(|vrf_idx| &self.arena[vrf_idx])
    }

    // Returns the default VRF.
    pub fn default_vrf(&self) -> &Vrf {
        let vrf_idx = self.name_tree[VRF_DEFAULT_NAME];
        &self.arena[vrf_idx]
    }

    pub(crate) fn default_vrf_mut(&mut self) -> &mut Vrf {
        let vrf_idx = self.name_tree[VRF_DEFAULT_NAME];
        &mut self.arena[vrf_idx]
    }

    // Returns an iterator visiting all VRFs.
    //
    // VRFs are ordered by their names.
    pub fn iter(&self) -> impl Iterator<Item = &'_ Vrf> + '_ {
        self.name_tree
            .values()
            .map(|vrf_idx| &self.arena[*vrf_idx])
    }
}

impl Default for Vrfs {
    fn default() -> Vrfs {
        Vrfs::new(MAIN_TABLE_ID)
    }
}

// ===== impl VrfSelector =====

impl VrfSelector {
    // Builds a selector from an optional VRF name argument.
    pub fn from_arg(name: Option<&str>) -> VrfSelector {
        match name {
            None | Some(VRF_DEFAULT_NAME) => VrfSelector::Default,
            Some("all") => VrfSelector::All,
            Some(name) => VrfSelector::Named(name.to_owned()),
        }
    }

    // Returns the VRF name for single-VRF selectors.
    pub fn name(&self) -> Option<&str> {
        match self {
            VrfSelector::Default => Some(VRF_DEFAULT_NAME),
            VrfSelector::Named(name) => Some(name),
            VrfSelector::All => None,
        }
    }
}
