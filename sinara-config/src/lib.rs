//! Configuration persistence for SinaraML servers.
//!
//! Every server keeps one JSON record with the full set of container
//! creation parameters and the command line that produced them. Removing
//! a server never deletes the record; it is moved into a timestamped
//! trash namespace from which `server create --fromConfig` can rebuild
//! the instance.

pub mod record;
pub mod store;

pub use record::{ContainerSpec, DataId, MountKind, MountSpec, ServerCmd, ServerRecord};
pub use store::{GlobalConfigStore, ServerConfigStore, TRASH_TIMESTAMP_FORMAT};
