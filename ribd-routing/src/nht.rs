//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ribd_utils::ip::AddressFamily;

// Nexthop tracking collaborator.
//
// Reachability evaluation and the tracking table itself live outside the RIB
// manager, which only asks for re-evaluations and renders the table.
pub trait NexthopTracking: std::fmt::Debug {
    // Returns the textual tracking table of the given VRF and address family.
    fn render_table(&self, vrf_id: u32, af: AddressFamily) -> String;

    // Re-evaluates the tracked nexthops of the given VRF and address family.
    fn evaluate(&mut self, vrf_id: u32, af: AddressFamily);
}

// Tracker used when no nexthop tracking collaborator is attached.
#[derive(Debug, Default)]
pub struct NoTracking;

// ===== impl NoTracking =====

impl NexthopTracking for NoTracking {
    fn render_table(&self, _vrf_id: u32, _af: AddressFamily) -> String {
        String::new()
    }

    fn evaluate(&mut self, _vrf_id: u32, _af: AddressFamily) {}
}
