//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ipnetwork::{IpNetwork, Ipv6Network};
use ribd_utils::ip::{AddressFamily, Safi};
use ribd_utils::protocol::Protocol;

use crate::Master;
use crate::config::{IMPORT_TABLE_DISTANCE_DEFAULT, ImportTable, MulticastMode};
use crate::debug::Debug;
use crate::error::Error;
use crate::rib::Route;
use crate::static_route::{
    self, STATIC_DISTANCE_DEFAULT, StaticRoute, StaticRouteArgs,
};
use crate::vrf::{VRF_DEFAULT_ID, VRF_DEFAULT_NAME, Vrf, Vrfs};

// Static route tables in configuration dump order.
const STATIC_CONFIG_TABLES: [(AddressFamily, Safi, &str); 3] = [
    (AddressFamily::Ipv4, Safi::Unicast, "ip route"),
    (AddressFamily::Ipv4, Safi::Multicast, "ip mroute"),
    (AddressFamily::Ipv6, Safi::Unicast, "ipv6 route"),
];

// ===== impl Master =====

impl Master {
    // Adds or withdraws a static route.
    //
    // The command is validated in full before anything is changed.
    // Withdrawing a route that doesn't exist succeeds without effect.
    pub fn configure_static_route(
        &mut self,
        args: &StaticRouteArgs,
    ) -> Result<(), Error> {
        let (prefix, src, distance, tag) =
            static_route::normalize_prefixes(args)?;

        let vrf_name = args.vrf.as_deref().unwrap_or(VRF_DEFAULT_NAME);
        let resolve_via_default = &self.config.nht_resolve_via_default;
        let Some(vrf) = self.vrfs.get_mut_by_name(vrf_name) else {
            return Err(Error::VrfNotDefined(vrf_name.to_owned()));
        };

        let (nexthop, labels) = static_route::normalize_nexthop(
            args,
            self.config.mpls_enabled,
            &vrf.interfaces,
        )?;
        let route = StaticRoute {
            safi: args.safi,
            prefix,
            src,
            nexthop,
            distance,
            tag,
            labels,
        };
        let key = route.key();

        if !args.negate {
            let nexthop = route.nexthop.clone();
            if !vrf.static_routes.add(route) {
                return Ok(());
            }
            Debug::StaticRouteInstall(&vrf.name, &prefix, &nexthop, distance)
                .log();
        } else {
            let nexthop_key = route.nexthop.key();
            let Some(route) = vrf.static_routes.remove(
                args.af,
                args.safi,
                &key,
                &nexthop_key,
            ) else {
                return Ok(());
            };
            Debug::StaticRouteUninstall(&vrf.name, &route.prefix, &route.nexthop)
                .log();
        }

        vrf.static_route_sync(args.af, args.safi, &key);
        vrf.process_update_queue(resolve_via_default);
        Ok(())
    }

    // Sets the table used for multicast RPF lookups.
    pub fn multicast_mode_set(&mut self, mode: &str) -> Result<(), Error> {
        let mode = mode.parse::<MulticastMode>()?;
        self.multicast_mode_update(mode);
        Ok(())
    }

    // Restores the default multicast RPF lookup behavior.
    pub fn multicast_mode_unset(&mut self) {
        self.multicast_mode_update(MulticastMode::NoConfig);
    }

    fn multicast_mode_update(&mut self, mode: MulticastMode) {
        if self.config.multicast_mode != mode {
            Debug::MulticastModeChange(mode).log();
            self.config.multicast_mode = mode;
        }
    }

    // Enables or disables the resolution of nexthops through the default
    // route. A change triggers the re-evaluation of the tracked nexthops and
    // of the routes of the default VRF.
    pub fn nht_resolve_via_default_set(
        &mut self,
        af: AddressFamily,
        enable: bool,
    ) {
        let current = self.config.nht_resolve_via_default.get_mut(af);
        if *current == enable {
            return;
        }
        *current = enable;
        Debug::NhtResolveViaDefault(af, enable).log();

        self.nht.evaluate(VRF_DEFAULT_ID, af);

        let resolve_via_default = &self.config.nht_resolve_via_default;
        let vrf = self.vrfs.default_vrf_mut();
        for safi in [Safi::Unicast, Safi::Multicast] {
            if let Some(table) = vrf.table_mut(af, safi) {
                table.requeue_all();
            }
        }
        vrf.process_update_queue(resolve_via_default);
    }

    // Enables the import of routes from a non-main kernel table.
    pub fn import_table_set(
        &mut self,
        table_id: u32,
        distance: Option<u8>,
        route_map: Option<String>,
    ) -> Result<(), Error> {
        self.config.check_import_table_id(table_id)?;

        let distance = distance.unwrap_or(IMPORT_TABLE_DISTANCE_DEFAULT);
        Debug::ImportTableEnable(table_id, distance).log();
        self.config
            .import_tables
            .insert(table_id, ImportTable::new(distance, route_map));
        Ok(())
    }

    // Disables the import of routes from a non-main kernel table.
    pub fn import_table_unset(&mut self, table_id: u32) -> Result<(), Error> {
        self.config.check_import_table_id(table_id)?;

        if self.config.import_tables.remove(&table_id).is_some() {
            Debug::ImportTableDisable(table_id).log();
        }
        Ok(())
    }

    pub fn allow_external_route_update_set(&mut self, allow: bool) {
        self.config.allow_external_route_update = allow;
    }

    // Adds an inactive VRF.
    pub fn vrf_add(&mut self, name: &str, table_id: u32) {
        self.vrfs.add(name, table_id);
    }

    // Activates a VRF with the given id.
    pub fn vrf_enable(&mut self, name: &str, id: u32) -> Result<(), Error> {
        if !self
            .vrfs
            .enable(name, id, &self.config.nht_resolve_via_default)
        {
            return Err(Error::VrfNotFound(name.to_owned()));
        }
        Ok(())
    }

    // Deactivates a VRF.
    pub fn vrf_disable(&mut self, name: &str) -> Result<(), Error> {
        if !self.vrfs.disable(name) {
            return Err(Error::VrfNotFound(name.to_owned()));
        }
        Ok(())
    }

    // Deletes a VRF along with its static routes.
    pub fn vrf_delete(&mut self, name: &str) -> Result<(), Error> {
        if !self.vrfs.delete(name) {
            return Err(Error::VrfNotFound(name.to_owned()));
        }
        Ok(())
    }

    // Adds or updates an interface of the given VRF.
    pub fn interface_add(
        &mut self,
        vrf_name: &str,
        ifname: &str,
        ifindex: u32,
        addresses: &[IpNetwork],
    ) -> Result<(), Error> {
        let resolve_via_default = &self.config.nht_resolve_via_default;
        let vrf = vrf_mut(&mut self.vrfs, vrf_name)?;
        vrf.interface_add(ifname, ifindex, addresses, resolve_via_default);
        Ok(())
    }

    // Removes an interface from the given VRF.
    pub fn interface_del(
        &mut self,
        vrf_name: &str,
        ifname: &str,
    ) -> Result<(), Error> {
        let resolve_via_default = &self.config.nht_resolve_via_default;
        let vrf = vrf_mut(&mut self.vrfs, vrf_name)?;
        vrf.interface_del(ifname, resolve_via_default);
        Ok(())
    }

    // Installs a route learned from a routing protocol.
    pub fn route_add(
        &mut self,
        vrf_name: &str,
        safi: Safi,
        prefix: IpNetwork,
        src: Option<Ipv6Network>,
        route: Route,
    ) -> Result<(), Error> {
        let resolve_via_default = &self.config.nht_resolve_via_default;
        let vrf = vrf_mut(&mut self.vrfs, vrf_name)?;
        if vrf.route_add(safi, prefix, src, route) {
            vrf.process_update_queue(resolve_via_default);
        }
        Ok(())
    }

    // Withdraws a route learned from a routing protocol.
    pub fn route_del(
        &mut self,
        vrf_name: &str,
        safi: Safi,
        prefix: IpNetwork,
        src: Option<Ipv6Network>,
        protocol: Protocol,
        instance: u16,
    ) -> Result<(), Error> {
        let resolve_via_default = &self.config.nht_resolve_via_default;
        let vrf = vrf_mut(&mut self.vrfs, vrf_name)?;
        if vrf.route_del(safi, prefix, src, protocol, instance) {
            vrf.process_update_queue(resolve_via_default);
        }
        Ok(())
    }

    // Returns the configuration in canonical command form.
    pub fn config_write(&self) -> String {
        let mut out = String::new();

        // Static routes.
        for (af, safi, cmd) in STATIC_CONFIG_TABLES {
            for vrf in self.vrfs.iter() {
                for route in vrf.static_routes.iter(af, safi) {
                    static_route_config(&mut out, cmd, vrf, route);
                }
            }
        }

        // Import tables.
        for (table_id, import) in &self.config.import_tables {
            out.push_str(&format!("ip import-table {}", table_id));
            if import.distance != IMPORT_TABLE_DISTANCE_DEFAULT {
                out.push_str(&format!(" distance {}", import.distance));
            }
            if let Some(route_map) = &import.route_map {
                out.push_str(&format!(" route-map {}", route_map));
            }
            out.push('\n');
        }

        // Global settings.
        if self.config.allow_external_route_update {
            out.push_str("allow-external-route-update\n");
        }
        for (af, enabled) in self.config.nht_resolve_via_default.iter() {
            if *enabled {
                out.push_str(&format!(
                    "{} nht resolve-via-default\n",
                    af.cmd_keyword()
                ));
            }
        }
        if self.config.multicast_mode.is_configured() {
            out.push_str(&format!(
                "ip multicast rpf-lookup-mode {}\n",
                self.config.multicast_mode
            ));
        }

        out
    }
}

// ===== helper functions =====

fn vrf_mut<'a>(vrfs: &'a mut Vrfs, name: &str) -> Result<&'a mut Vrf, Error> {
    vrfs.get_mut_by_name(name)
        .ok_or_else(|| Error::VrfNotFound(name.to_owned()))
}

fn static_route_config(
    out: &mut String,
    cmd: &str,
    vrf: &Vrf,
    route: &StaticRoute,
) {
    out.push_str(&format!("{} {}", cmd, route.prefix));
    if let Some(src) = &route.src {
        out.push_str(&format!(" from {}", src));
    }
    out.push_str(&format!(" {}", route.nexthop));
    if route.tag != 0 {
        out.push_str(&format!(" tag {}", route.tag));
    }
    if route.distance != STATIC_DISTANCE_DEFAULT {
        out.push_str(&format!(" {}", route.distance));
    }
    if !vrf.is_default() {
        out.push_str(&format!(" vrf {}", vrf.name));
    }
    if !route.labels.is_empty() {
        out.push_str(&format!(" label {}", route.labels));
    }
    out.push('\n');
}
