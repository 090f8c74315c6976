//! # Models
//!
//! Resource identity and the persisted HA record.

pub mod ha_record;
pub mod resource;

pub use ha_record::{HaRecord, NewHaRecord};
pub use resource::{HaResource, ManagementServerId, ResourceKey, ResourceType};
