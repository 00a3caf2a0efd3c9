//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![warn(rust_2018_idioms)]

pub mod config;
pub mod debug;
pub mod error;
pub mod interface;
pub mod nht;
pub mod northbound;
pub mod rib;
pub mod show;
pub mod static_route;
pub mod vrf;

use crate::config::RibConfig;
use crate::nht::{NexthopTracking, NoTracking};
use crate::vrf::Vrfs;

// RIB manager command context.
//
// All configuration and query commands run against this structure, one at a
// time.
#[derive(Debug)]
pub struct Master {
    // Process-wide configuration.
    pub config: RibConfig,
    // List of VRFs, including the default one.
    pub vrfs: Vrfs,
    // Nexthop tracking collaborator.
    pub nht: Box<dyn NexthopTracking>,
}

// ===== impl Master =====

impl Master {
    pub fn new(config: RibConfig) -> Master {
        let vrfs = Vrfs::new(config.main_table_id);
        Master {
            config,
            vrfs,
            nht: Box::new(NoTracking),
        }
    }

    // Attaches a nexthop tracking collaborator.
    pub fn with_nht(mut self, nht: Box<dyn NexthopTracking>) -> Master {
        self.nht = nht;
        self
    }
}

impl Default for Master {
    fn default() -> Master {
        Master::new(Default::default())
    }
}
