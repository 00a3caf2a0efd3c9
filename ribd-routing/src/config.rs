//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::str::FromStr;

use derive_new::new;
use ribd_utils::ip::AddressFamilies;

use crate::error::Error;

// Kernel routing table used by the default VRF.
pub const MAIN_TABLE_ID: u32 = 254;
// Valid range of import-table identifiers.
pub const IMPORT_TABLE_RANGE: std::ops::RangeInclusive<u32> = 1..=252;
// Default administrative distance of imported routes.
pub const IMPORT_TABLE_DISTANCE_DEFAULT: u8 = 15;

// Process-wide RIB configuration.
#[derive(Debug)]
pub struct RibConfig {
    pub multicast_mode: MulticastMode,
    pub allow_external_route_update: bool,
    pub nht_resolve_via_default: AddressFamilies<bool>,
    // IPv4 import tables keyed by kernel table id.
    pub import_tables: BTreeMap<u32, ImportTable>,
    pub mpls_enabled: bool,
    pub main_table_id: u32,
}

// Table used for multicast RPF lookups.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MulticastMode {
    #[default]
    NoConfig,
    UribOnly,
    MribOnly,
    MribThenUrib,
    LowerDistance,
    LongerPrefix,
}

#[derive(Clone, Debug, Eq, PartialEq, new)]
pub struct ImportTable {
    pub distance: u8,
    pub route_map: Option<String>,
}

// ===== impl RibConfig =====

impl RibConfig {
    // Validates an import-table id against the allowed range and the main
    // kernel table.
    pub(crate) fn check_import_table_id(&self, table_id: u32) -> Result<(), Error> {
        if !IMPORT_TABLE_RANGE.contains(&table_id) {
            return Err(Error::InvalidTableId(table_id));
        }
        if table_id == self.main_table_id {
            return Err(Error::MainTableId(table_id));
        }
        Ok(())
    }
}

impl Default for RibConfig {
    fn default() -> RibConfig {
        RibConfig {
            multicast_mode: Default::default(),
            allow_external_route_update: false,
            nht_resolve_via_default: Default::default(),
            import_tables: Default::default(),
            mpls_enabled: true,
            main_table_id: MAIN_TABLE_ID,
        }
    }
}

// ===== impl MulticastMode =====

impl MulticastMode {
    pub fn is_configured(&self) -> bool {
        *self != MulticastMode::NoConfig
    }
}

impl std::fmt::Display for MulticastMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MulticastMode::NoConfig => write!(f, "unset"),
            MulticastMode::UribOnly => write!(f, "urib-only"),
            MulticastMode::MribOnly => write!(f, "mrib-only"),
            MulticastMode::MribThenUrib => write!(f, "mrib-then-urib"),
            MulticastMode::LowerDistance => write!(f, "lower-distance"),
            MulticastMode::LongerPrefix => write!(f, "longer-prefix"),
        }
    }
}

impl FromStr for MulticastMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unset" => Ok(MulticastMode::NoConfig),
            "urib-only" => Ok(MulticastMode::UribOnly),
            "mrib-only" => Ok(MulticastMode::MribOnly),
            "mrib-then-urib" => Ok(MulticastMode::MribThenUrib),
            "lower-distance" => Ok(MulticastMode::LowerDistance),
            "longer-prefix" => Ok(MulticastMode::LongerPrefix),
            _ => Err(Error::InvalidMulticastMode(s.to_owned())),
        }
    }
}
