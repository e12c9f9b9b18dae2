//! Mount planning for server containers.
//!
//! Quick mode stores everything in named volumes; basic mode binds host
//! folders under a root the user picked (or provided individually).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use sinara_config::{MountSpec, DataId};
use sinara_core::error::Result;
use sinara_core::fs::expanded_path;

use crate::ContainerRuntime;

/// Container-side destinations, in the order they are always mounted.
pub const MOUNT_POINTS: [(DataId, &str); 4] = [
    (DataId::Data, "/data"),
    (DataId::Work, "/home/jovyan/work"),
    (DataId::Tmp, "/tmp"),
    (DataId::Raw, "/raw"),
];

/// Host folders backing a basic-mode server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderPaths {
    pub data: PathBuf,
    pub work: PathBuf,
    pub tmp: PathBuf,
    pub raw: PathBuf,
}

impl FolderPaths {
    /// Standard folder layout under a single root.
    pub fn under_root(root: &str) -> Self {
        let root = expanded_path(root);
        Self {
            data: root.join("data"),
            work: root.join("work"),
            tmp: root.join("tmp"),
            raw: root.join("raw"),
        }
    }

    /// Individually chosen folders. Nothing is created or checked for
    /// these; the user owns their layout.
    pub fn custom(data: &str, work: &str, tmp: &str, raw: &str) -> Self {
        Self {
            data: expanded_path(data),
            work: expanded_path(work),
            tmp: expanded_path(tmp),
            raw: expanded_path(raw),
        }
    }

    pub fn for_id(&self, id: DataId) -> &Path {
        match id {
            DataId::Data => &self.data,
            DataId::Work => &self.work,
            DataId::Tmp => &self.tmp,
            DataId::Raw => &self.raw,
        }
    }

    /// Create every folder that does not exist yet.
    pub fn create_all(&self) -> Result<()> {
        for (id, _) in MOUNT_POINTS {
            let path = self.for_id(id);
            if !path.exists() {
                debug!(path = %path.display(), "creating mounted folder");
                fs::create_dir_all(path)?;
            }
        }
        Ok(())
    }
}

/// Volume name backing one data id of one server instance.
pub fn volume_name(id: DataId, instance_name: &str) -> String {
    format!("jovyan-{}-{}", id.as_str(), instance_name)
}

/// Quick mode: one named volume per data id, created when missing so a
/// recreated server finds its old data again.
pub fn quick_mode(runtime: &dyn ContainerRuntime, instance_name: &str) -> Result<Vec<MountSpec>> {
    let mut mounts = Vec::with_capacity(MOUNT_POINTS.len());
    for (id, destination) in MOUNT_POINTS {
        let volume = volume_name(id, instance_name);
        if !runtime.volume_exists(&volume)? {
            runtime.create_volume(&volume)?;
        }
        mounts.push(MountSpec::volume(&volume, destination));
    }
    Ok(mounts)
}

/// Basic mode: bind the chosen host folders.
pub fn basic_mode(folders: &FolderPaths) -> Vec<MountSpec> {
    MOUNT_POINTS
        .iter()
        .map(|&(id, destination)| {
            MountSpec::bind(folders.for_id(id).to_string_lossy().into_owned(), destination)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRuntime;

    #[test]
    fn test_volume_names_carry_instance() {
        assert_eq!(volume_name(DataId::Data, "desk"), "jovyan-data-desk");
        assert_eq!(volume_name(DataId::Raw, "desk"), "jovyan-raw-desk");
    }

    #[test]
    fn test_quick_mode_creates_missing_volumes_once() {
        let runtime = MockRuntime::new();
        let mounts = quick_mode(&runtime, "desk").unwrap();
        assert_eq!(mounts.len(), 4);
        assert!(runtime.volume_exists("jovyan-work-desk").unwrap());

        // Re-running keeps the existing volumes
        quick_mode(&runtime, "desk").unwrap();
        assert_eq!(runtime.created_volume_count(), 4);
    }

    #[test]
    fn test_basic_mode_binds_every_mount_point() {
        let folders = FolderPaths::under_root("/srv/sinara");
        let mounts = basic_mode(&folders);
        assert_eq!(mounts[0].to_string(), "/srv/sinara/data:/data");
        assert_eq!(mounts[1].to_string(), "/srv/sinara/work:/home/jovyan/work");
        assert_eq!(mounts[3].to_string(), "/srv/sinara/raw:/raw");
    }

    #[test]
    fn test_folder_creation_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("srv");
        let folders = FolderPaths::under_root(&root.to_string_lossy());
        folders.create_all().unwrap();
        assert!(root.join("data").is_dir());
        assert!(root.join("tmp").is_dir());
    }
}
