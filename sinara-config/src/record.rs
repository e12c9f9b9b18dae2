//! The on-disk server record: everything needed to recreate an instance.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The four logical data areas every server mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataId {
    Data,
    Work,
    Tmp,
    Raw,
}

impl DataId {
    pub const ALL: [DataId; 4] = [DataId::Data, DataId::Work, DataId::Tmp, DataId::Raw];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataId::Data => "data",
            DataId::Work => "work",
            DataId::Tmp => "tmp",
            DataId::Raw => "raw",
        }
    }
}

/// Backing storage of a single mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    Volume,
    Bind,
}

/// One of the four logical mount points of a server
/// (data, work, tmp, raw).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    #[serde(rename = "type")]
    pub kind: MountKind,
    /// Volume name for managed volumes, host path for binds.
    pub source: String,
    pub destination: String,
}

impl MountSpec {
    pub fn volume(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            kind: MountKind::Volume,
            source: name.into(),
            destination: destination.into(),
        }
    }

    pub fn bind(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            kind: MountKind::Bind,
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl fmt::Display for MountSpec {
    /// Docker `-v` argument form, `source:destination`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.destination)
    }
}

/// Full container creation parameters of a server instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
    /// Image reference with the resolved version tag, exported to the
    /// container as `JUPYTER_IMAGE_SPEC`.
    pub versioned_image: String,
    pub command: String,
    pub working_dir: String,
    pub name: String,
    pub mem_limit_bytes: u64,
    pub cpu_limit: u32,
    pub shm_size_bytes: u64,
    pub gpu_enabled: bool,
    /// Container port to host port, computed at create time and stored
    /// for reproducibility.
    pub ports: BTreeMap<u16, u16>,
    pub mounts: Vec<MountSpec>,
    pub environment: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

/// The invocation that produced a record, kept verbatim for
/// `--fromConfig` replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerCmd {
    pub script: String,
    pub args: String,
    /// Flag-by-flag reconstruction of every non-default argument;
    /// re-running `sinara <calculated_args>` recreates the server.
    pub calculated_args: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub subject_type: String,
    pub cli_version: String,
    pub cmd: ServerCmd,
    pub container: ContainerSpec,
}

impl ServerRecord {
    pub fn new(cmd: ServerCmd, container: ContainerSpec) -> Self {
        Self {
            subject_type: "server".to_string(),
            cli_version: sinara_core::cli_version().to_string(),
            cmd,
            container,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_spec_display_is_docker_volume_arg() {
        let vol = MountSpec::volume("jovyan-data-test1", "/data");
        assert_eq!(vol.to_string(), "jovyan-data-test1:/data");

        let bind = MountSpec::bind("/home/user/work", "/home/jovyan/work");
        assert_eq!(bind.to_string(), "/home/user/work:/home/jovyan/work");
    }

    #[test]
    fn test_mount_kind_serializes_as_lowercase_tag() {
        let json = serde_json::to_value(MountSpec::volume("v", "/data")).unwrap();
        assert_eq!(json["type"], "volume");
        let json = serde_json::to_value(MountSpec::bind("/host", "/raw")).unwrap();
        assert_eq!(json["type"], "bind");
    }
}
