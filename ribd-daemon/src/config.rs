//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![allow(clippy::derivable_impls)]

use ribd_routing::config::{MAIN_TABLE_ID, RibConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: Logging,
    pub mpls_enabled: bool,
    pub main_table_id: u32,
    // File with commands in canonical form, executed at startup.
    pub startup_config: Option<String>,
    #[serde(rename = "vrf")]
    pub vrfs: Vec<VrfInventory>,
    #[serde(rename = "interface")]
    pub interfaces: Vec<InterfaceInventory>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    pub file: LoggingFile,
    pub stdout: LoggingStdout,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingFile {
    pub enabled: bool,
    pub dir: String,
    pub name: String,
    pub rotation: LoggingFileRotation,
    #[serde(flatten)]
    pub fmt: LoggingFmt,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingStdout {
    pub enabled: bool,
    #[serde(flatten)]
    pub fmt: LoggingFmt,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingFmt {
    pub style: LoggingFmtStyle,
    pub colors: bool,
    pub show_thread_id: bool,
    pub show_source: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFileRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFmtStyle {
    Compact,
    Full,
    Json,
    Pretty,
}

// VRF known to the system at startup.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VrfInventory {
    pub name: String,
    pub table: u32,
    // VRF id, present when the VRF is active.
    pub id: Option<u32>,
}

// Interface known to the system at startup.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceInventory {
    pub name: String,
    pub ifindex: u32,
    #[serde(default = "default_vrf")]
    pub vrf: String,
    #[serde(default)]
    pub addresses: Vec<ipnetwork::IpNetwork>,
}

// ===== impl Config =====

impl Config {
    const DFLT_FILEPATH: &'static str = "/etc/ribd.toml";

    pub(crate) fn load(config_file: Option<&str>) -> Config {
        let config_file = config_file.unwrap_or(Config::DFLT_FILEPATH);

        match std::fs::read_to_string(config_file) {
            Ok(config_str) => match toml::from_str(&config_str) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("Failed to parse configuration file: {err}");
                    std::process::exit(1);
                }
            },
            Err(err) => {
                eprintln!("Failed to load configuration file: {err}");
                eprintln!("Falling back to default configuration...");
                Config::default()
            }
        }
    }

    // Returns the initial process-wide RIB configuration.
    pub(crate) fn rib_config(&self) -> RibConfig {
        RibConfig {
            mpls_enabled: self.mpls_enabled,
            main_table_id: self.main_table_id,
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            logging: Default::default(),
            mpls_enabled: true,
            main_table_id: MAIN_TABLE_ID,
            startup_config: None,
            vrfs: Default::default(),
            interfaces: Default::default(),
        }
    }
}

// ===== impl LoggingFile =====

impl Default for LoggingFile {
    fn default() -> LoggingFile {
        LoggingFile {
            enabled: false,
            dir: "/var/log".to_owned(),
            name: "ribd.log".to_owned(),
            rotation: Default::default(),
            fmt: Default::default(),
        }
    }
}

// ===== impl LoggingStdout =====

impl Default for LoggingStdout {
    fn default() -> LoggingStdout {
        LoggingStdout {
            enabled: false,
            fmt: Default::default(),
        }
    }
}

// ===== impl LoggingFmt =====

impl Default for LoggingFmt {
    fn default() -> LoggingFmt {
        LoggingFmt {
            style: LoggingFmtStyle::Full,
            colors: false,
            show_thread_id: false,
            show_source: false,
        }
    }
}

// ===== helper functions =====

fn default_vrf() -> String {
    ribd_routing::vrf::VRF_DEFAULT_NAME.to_owned()
}

// ===== unit tests =====
