//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ribd_routing::error::{Error as RibError, ErrorClass};
use tracing::warn;

// Command execution errors.
#[derive(Debug)]
pub enum Error {
    Parser(ParserError),
    Rib(RibError),
}

#[derive(Debug, Eq, PartialEq)]
pub enum ParserError {
    NoMatch,
    Incomplete,
    InvalidArgument(String),
}

// ===== impl Error =====

impl Error {
    pub(crate) fn log(&self) {
        match self {
            Error::Parser(error) => {
                warn!(%error, "failed to parse command");
            }
            Error::Rib(error) => error.log(),
        }
    }

    // Returns the result class reported for the failed command.
    pub(crate) fn class(&self) -> ErrorClass {
        match self {
            Error::Parser(..) => ErrorClass::Warning,
            Error::Rib(error) => error.class(),
        }
    }

    // Returns the message printed to the operator.
    pub(crate) fn cli_message(&self) -> String {
        match self {
            Error::Parser(error) => format!("% {}", error),
            Error::Rib(error) => error.cli_message(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parser(error) => write!(f, "{}", error),
            Error::Rib(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parser(error) => Some(error),
            Error::Rib(error) => Some(error),
        }
    }
}

impl From<ParserError> for Error {
    fn from(error: ParserError) -> Error {
        Error::Parser(error)
    }
}

impl From<RibError> for Error {
    fn from(error: RibError) -> Error {
        Error::Rib(error)
    }
}

// ===== impl ParserError =====

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserError::NoMatch => write!(f, "Unknown command"),
            ParserError::Incomplete => write!(f, "Command incomplete"),
            ParserError::InvalidArgument(arg) => {
                write!(f, "Invalid argument: {}", arg)
            }
        }
    }
}

impl std::error::Error for ParserError {}
