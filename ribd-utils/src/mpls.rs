//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use serde::{Deserialize, Serialize};

// MPLS label.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct Label(u32);

// Ordered MPLS label stack. An empty stack means "no labels".
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct LabelStack(Vec<Label>);

// Label stack parsing errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LabelError {
    Malformed,
    Reserved,
    TooMany,
}

// ===== impl Label =====

impl Label {
    // Well-known MPLS labels.
    pub const IPV4_EXPLICIT_NULL: u32 = 0;
    pub const ROUTER_ALERT: u32 = 1;
    pub const IPV6_EXPLICIT_NULL: u32 = 2;
    pub const IMPLICIT_NULL: u32 = 3;
    pub const ELI: u32 = 7;
    pub const GAL: u32 = 13;
    pub const OAM_ALERT: u32 = 14;
    pub const EXTENSION: u32 = 15;

    // MPLS label ranges.
    pub const RESERVED_RANGE: std::ops::RangeInclusive<u32> = 0..=15;
    pub const UNRESERVED_RANGE: std::ops::RangeInclusive<u32> = 16..=1048575;

    pub fn new(label: u32) -> Label {
        if label > *Self::UNRESERVED_RANGE.end() {
            panic!("invalid label value: {label}");
        }
        Label(label)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Label::IPV4_EXPLICIT_NULL => write!(f, "IPv4 Explicit Null"),
            Label::ROUTER_ALERT => write!(f, "Router Alert"),
            Label::IPV6_EXPLICIT_NULL => write!(f, "IPv6 Explicit Null"),
            Label::IMPLICIT_NULL => write!(f, "implicit-null"),
            Label::ELI => write!(f, "Entropy Label Indicator"),
            Label::GAL => write!(f, "Generic Associated Channel"),
            Label::OAM_ALERT => write!(f, "OAM Alert"),
            Label::EXTENSION => write!(f, "Extension"),
            _ => write!(f, "{}", self.0),
        }
    }
}

// ===== impl LabelStack =====

impl LabelStack {
    // Maximum number of labels a static nexthop may carry.
    pub const MAX_LABELS: usize = 2;

    pub fn new(labels: Vec<Label>) -> LabelStack {
        LabelStack(labels)
    }

    // Parses a label stack in command form ("16/17").
    //
    // Labels are consumed in order and the first offending one decides the
    // error. A comma is accepted as separator as well.
    pub fn parse(s: &str) -> Result<LabelStack, LabelError> {
        let mut labels = vec![];
        for (idx, token) in s.split(['/', ',']).enumerate() {
            if idx >= Self::MAX_LABELS {
                return Err(LabelError::TooMany);
            }

            let value = token.parse::<u32>().map_err(|_| LabelError::Malformed)?;
            if Label::RESERVED_RANGE.contains(&value) {
                return Err(LabelError::Reserved);
            }
            if !Label::UNRESERVED_RANGE.contains(&value) {
                return Err(LabelError::Malformed);
            }
            labels.push(Label::new(value));
        }

        Ok(LabelStack(labels))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.0.iter()
    }

    // Returns the raw label values.
    pub fn values(&self) -> Vec<u32> {
        self.0.iter().map(Label::get).collect()
    }

    // Returns the stack in the form used for display, with well-known
    // labels replaced by their names.
    pub fn to_pretty_string(&self) -> String {
        self.0
            .iter()
            .map(|label| label.to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl std::fmt::Display for LabelStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values = self
            .0
            .iter()
            .map(|label| label.get().to_string())
            .collect::<Vec<_>>();
        write!(f, "{}", values.join("/"))
    }
}

// ===== impl LabelError =====

impl std::fmt::Display for LabelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelError::Malformed => write!(f, "Malformed label(s)"),
            LabelError::Reserved => write!(
                f,
                "Cannot use reserved label(s) ({}-{})",
                Label::RESERVED_RANGE.start(),
                Label::RESERVED_RANGE.end()
            ),
            LabelError::TooMany => write!(
                f,
                "Too many labels. Enter {} or fewer",
                LabelStack::MAX_LABELS
            ),
        }
    }
}

impl std::error::Error for LabelError {}

// ===== unit tests =====
