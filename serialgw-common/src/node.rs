//! Radio node addressing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseFailure;

/// Identifier of a radio node behind the serial gateway.
///
/// Node `1` is the gateway device itself; frames addressed to it carry the
/// bare payload without a node prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The local gateway device.
    pub const GATEWAY: NodeId = NodeId(1);

    /// Get the raw numeric id.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Whether this id addresses the gateway device itself.
    pub fn is_gateway(self) -> bool {
        self == Self::GATEWAY
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = ParseFailure;

    /// Parse a node id, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u32>()
            .map(NodeId)
            .map_err(|_| ParseFailure::InvalidNode(trimmed.to_string()))
    }
}
