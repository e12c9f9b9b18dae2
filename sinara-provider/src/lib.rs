//! Container runtime abstraction and the server lifecycle built on it.
//!
//! The `ContainerRuntime` trait is the seam between the lifecycle state
//! machine and the docker CLI; `DockerRuntime` is the production
//! implementation and `MockRuntime` backs the tests.

use std::collections::BTreeMap;
use std::path::Path;

use sinara_core::error::Result;
pub use sinara_core::error::{Result as ProviderResult, SinaraError};

pub use sinara_config::{ContainerSpec, MountKind, MountSpec};

pub mod docker;
pub mod mounts;
pub mod registry;
pub mod resources;
pub mod server;
pub mod urls;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use docker::DockerRuntime;
pub use registry::{DockerHubResolver, VersionResolver};
pub use server::ServerLifecycle;

/// Captured output of a command executed inside a container, stdout and
/// stderr demuxed.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// One row of `server list`: the cheap per-container facts read in a
/// single `docker ps` pass.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub name: String,
    pub image: String,
    pub status: String,
    pub server_type: Option<String>,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        let status = self.status.to_lowercase();
        status.starts_with("running") || status.starts_with("up")
    }
}

/// A mount as reported by container inspection.
#[derive(Debug, Clone)]
pub struct RuntimeMount {
    pub kind: MountKind,
    pub source: String,
    pub destination: String,
}

/// A managed volume with its disk usage, when the runtime reports one.
#[derive(Debug, Clone)]
pub struct VolumeInfo {
    pub name: String,
    pub size_bytes: Option<u64>,
}

/// The capabilities the lifecycle needs from a container runtime.
pub trait ContainerRuntime {
    /// Probe the runtime daemon, retrying before giving up.
    fn ensure_available(&self) -> Result<()>;

    fn container_exists(&self, name: &str) -> Result<bool>;
    fn create_container(&self, spec: &ContainerSpec) -> Result<()>;
    fn start_container(&self, name: &str) -> Result<()>;
    fn stop_container(&self, name: &str) -> Result<()>;
    /// Forced removal; removing an absent container is not an error.
    fn remove_container(&self, name: &str) -> Result<()>;

    /// Run a command inside the container as root, privileged.
    fn exec(&self, name: &str, command: &str) -> Result<ExecOutput>;
    /// Copy a host file into the container.
    fn copy_in(&self, name: &str, source: &Path, destination: &str) -> Result<()>;

    fn container_labels(&self, name: &str) -> Result<BTreeMap<String, String>>;
    fn container_mounts(&self, name: &str) -> Result<Vec<RuntimeMount>>;
    /// Host port published for a container port, if any.
    fn host_port_for(&self, name: &str, container_port: u16) -> Result<Option<u16>>;
    fn containers_with_label(&self, label: &str) -> Result<Vec<ContainerSummary>>;

    fn volume_exists(&self, name: &str) -> Result<bool>;
    fn create_volume(&self, name: &str) -> Result<()>;
    /// Forced removal; removing an absent volume is not an error.
    fn remove_volume(&self, name: &str) -> Result<()>;
    fn list_volumes(&self) -> Result<Vec<VolumeInfo>>;

    fn pull_image(&self, image: &str) -> Result<()>;
}
