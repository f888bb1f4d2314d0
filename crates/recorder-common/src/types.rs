//! Core types shared across SRV recorder components.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A lease (session) issued by the coordination service.
///
/// Only `id` carries meaning for leadership; every other field the store
/// returns is kept in `extra` so the cached record round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    /// Store-assigned unique identifier
    #[serde(rename = "ID", default)]
    pub id: String,

    /// Display name given at creation
    #[serde(rename = "Name", default)]
    pub name: String,

    /// Label of the node/process owning the lease
    #[serde(rename = "Node", default)]
    pub node: String,

    /// Store-defined fields (TTL, behavior, indexes, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Lease {
    pub fn new(id: impl Into<String>, name: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node: node.into(),
            extra: Map::new(),
        }
    }

    /// A decoded record with no identifier describes no lease at all
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }
}

/// A live cluster member
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Member {
    /// Member name as reported by the membership source
    pub name: String,

    /// Hostname or IP used as the SRV target
    pub address: String,
}

/// One target of an SRV record.
///
/// `_service._proto.name. TTL class SRV priority weight port target.`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvTarget {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    /// Per RFC 2782 this must resolve through an A or AAAA record
    pub target: String,
}

impl SrvTarget {
    /// Render as the record value `"priority weight port target"`
    pub fn to_record_value(&self) -> String {
        format!(
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
        )
    }
}
