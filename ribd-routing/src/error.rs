//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ribd_utils::ip::AddressFamily;
use ribd_utils::mpls::LabelError;
use tracing::warn;

// RIB command errors.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    MalformedAddress(String),
    MalformedMask(String),
    MalformedSourceAddress(String),
    MalformedDistance(String),
    MalformedTag(String),
    VrfNotDefined(String),
    VrfNotFound(String),
    MplsDisabled,
    Label(LabelError),
    NullInterfaceFlag(String),
    MalformedFlag(String),
    MalformedNexthopAddress(String),
    MalformedQueryAddress(AddressFamily, String),
    InvalidMulticastMode(String),
    UnknownRouteType(String),
    NetworkNotInTable,
    InvalidTableId(u32),
    MainTableId(u32),
}

// Result class reported back to the command host.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    // Malformed input or missing object, nothing was changed.
    Warning,
    // Write-path validation failure.
    ConfigRejected,
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::MalformedAddress(input)
            | Error::MalformedMask(input)
            | Error::MalformedSourceAddress(input)
            | Error::MalformedDistance(input)
            | Error::MalformedTag(input)
            | Error::MalformedNexthopAddress(input)
            | Error::MalformedQueryAddress(_, input) => {
                warn!(%input, "{}", self);
            }
            Error::VrfNotDefined(name) | Error::VrfNotFound(name) => {
                warn!(vrf = %name, "{}", self);
            }
            Error::NullInterfaceFlag(flag) | Error::MalformedFlag(flag) => {
                warn!(%flag, "{}", self);
            }
            Error::InvalidMulticastMode(mode) => {
                warn!(%mode, "{}", self);
            }
            Error::UnknownRouteType(name) => {
                warn!(route_type = %name, "{}", self);
            }
            Error::InvalidTableId(table_id) | Error::MainTableId(table_id) => {
                warn!(%table_id, "{}", self);
            }
            Error::Label(error) => {
                warn!(%error, "{}", self);
            }
            Error::MplsDisabled | Error::NetworkNotInTable => {
                warn!("{}", self);
            }
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::VrfNotFound(..)
            | Error::MalformedQueryAddress(..)
            | Error::UnknownRouteType(..)
            | Error::NetworkNotInTable
            | Error::InvalidTableId(..)
            | Error::MainTableId(..) => ErrorClass::Warning,
            _ => ErrorClass::ConfigRejected,
        }
    }

    // Returns the message printed to the operator.
    pub fn cli_message(&self) -> String {
        match self {
            Error::MalformedAddress(..) | Error::MalformedMask(..) => {
                "% Malformed address".to_owned()
            }
            Error::MalformedSourceAddress(..) => {
                "% Malformed source address".to_owned()
            }
            Error::VrfNotDefined(name) => {
                format!("% vrf {} is not defined", name)
            }
            Error::MplsDisabled => {
                "% MPLS not turned on in kernel, ignoring command".to_owned()
            }
            Error::MalformedFlag(flag) => format!("% Malformed flag {} ", flag),
            Error::UnknownRouteType(..)
            | Error::InvalidMulticastMode(..)
            | Error::InvalidTableId(..)
            | Error::MainTableId(..) => self.to_string(),
            _ => format!("% {}", self),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MalformedAddress(..) => write!(f, "Malformed address"),
            Error::MalformedMask(..) => write!(f, "Malformed address mask"),
            Error::MalformedSourceAddress(..) => {
                write!(f, "Malformed source address")
            }
            Error::MalformedDistance(input) => {
                write!(f, "Malformed distance {}", input)
            }
            Error::MalformedTag(input) => write!(f, "Malformed tag {}", input),
            Error::VrfNotDefined(..) => write!(f, "vrf is not defined"),
            Error::VrfNotFound(name) => write!(f, "VRF {} not found", name),
            Error::MplsDisabled => write!(f, "MPLS not turned on in kernel"),
            Error::Label(error) => error.fmt(f),
            Error::NullInterfaceFlag(flag) => {
                write!(f, "can not have flag {} with Null0", flag)
            }
            Error::MalformedFlag(..) => write!(f, "Malformed flag"),
            Error::MalformedNexthopAddress(addr) => {
                write!(f, "Malformed nexthop address {}", addr)
            }
            Error::MalformedQueryAddress(af, _) => {
                write!(f, "Malformed {} address", af)
            }
            Error::InvalidMulticastMode(..) => {
                write!(f, "Invalid mode specified")
            }
            Error::UnknownRouteType(..) => write!(f, "Unknown route type"),
            Error::NetworkNotInTable => write!(f, "Network not in table"),
            Error::InvalidTableId(table_id) => write!(
                f,
                "Invalid routing table ID, {}. Must be in range 1-252",
                table_id
            ),
            Error::MainTableId(table_id) => write!(
                f,
                "Invalid routing table ID, {}. Must be non-default table",
                table_id
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Label(error) => Some(error),
            _ => None,
        }
    }
}

impl From<LabelError> for Error {
    fn from(error: LabelError) -> Error {
        Error::Label(error)
    }
}
