// Embedded resources for server provisioning
// These are compiled into the binary for portability

use std::fs;
use std::path::PathBuf;

use sinara_core::error::Result;

/// Organization descriptor exported to every server as `SINARA_ORG`.
pub const MLOPS_ORGANIZATION_JSON: &str = include_str!("resources/mlops_organization.json");

/// Post-start sanity check script run inside the container.
pub const CHECK_SCRIPT: &str = include_str!("resources/check_sinara.py");

/// Host integration Jupyter extension, installed into the server on
/// every start.
pub const HOST_EXT_WHEEL: &[u8] =
    include_bytes!("resources/sinaraml_jupyter_host_ext-0.1.0-py3-none-any.whl");

pub const HOST_EXT_WHEEL_NAME: &str = "sinaraml_jupyter_host_ext-0.1.0-py3-none-any.whl";
pub const CHECK_SCRIPT_NAME: &str = "check_sinara.py";

/// Materialize the embedded files that must be copied into a container,
/// returning their host-side paths. The directory owns the files until
/// it is dropped.
pub fn stage_container_assets(dir: &tempfile::TempDir) -> Result<(PathBuf, PathBuf)> {
    let wheel = dir.path().join(HOST_EXT_WHEEL_NAME);
    fs::write(&wheel, HOST_EXT_WHEEL)?;
    let check = dir.path().join(CHECK_SCRIPT_NAME);
    fs::write(&check, CHECK_SCRIPT)?;
    Ok((wheel, check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_json_is_valid() {
        let org: serde_json::Value = serde_json::from_str(MLOPS_ORGANIZATION_JSON).unwrap();
        assert!(org.get("organization").is_some());
    }

    #[test]
    fn test_staged_assets_exist_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (wheel, check) = stage_container_assets(&dir).unwrap();
        assert!(wheel.exists());
        assert!(check.exists());
        assert_eq!(fs::read(&wheel).unwrap().len(), HOST_EXT_WHEEL.len());
    }
}
