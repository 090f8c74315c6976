use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a monitored resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Host,
}

impl ResourceType {
    pub const ALL: [ResourceType; 1] = [Self::Host];
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "Host"),
        }
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Host" => Ok(Self::Host),
            _ => Err(format!("Invalid resource type: {s}")),
        }
    }
}

/// Identifier of a control-plane node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagementServerId(pub i64);

impl fmt::Display for ManagementServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ManagementServerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Key of a monitored resource: `(resource_id, resource_type)`
pub type ResourceKey = (i64, ResourceType);

/// The subject handed to provider probes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaResource {
    pub resource_id: i64,
    pub resource_type: ResourceType,
    /// Implementation family, e.g. the hypervisor kind
    pub resource_sub_type: String,
    pub name: Option<String>,
}

impl HaResource {
    pub fn new(resource_id: i64, resource_type: ResourceType, sub_type: impl Into<String>) -> Self {
        Self {
            resource_id,
            resource_type,
            resource_sub_type: sub_type.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn key(&self) -> ResourceKey {
        (self.resource_id, self.resource_type)
    }
}

impl fmt::Display for HaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} {} ({name})", self.resource_type, self.resource_id),
            None => write!(f, "{} {}", self.resource_type, self.resource_id),
        }
    }
}
