//! Docker implementation of the container runtime.

mod command;

pub use command::DockerCommand;

use std::collections::BTreeMap;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use sinara_core::error::{Result, SinaraError};
use sinara_config::{ContainerSpec, MountKind};

use crate::{ContainerRuntime, ContainerSummary, ExecOutput, RuntimeMount, VolumeInfo};

const DAEMON_CONNECT_ATTEMPTS: u32 = 3;
const DAEMON_CONNECT_RETRY_SECS: u64 = 30;

const PS_FORMAT: &str = "{{.Names}}\t{{.Image}}\t{{.Status}}\t{{.Label \"sinaraml.serverType\"}}";

/// `docker inspect` mount entry.
#[derive(Debug, Deserialize)]
struct InspectMount {
    #[serde(rename = "Type")]
    mount_type: String,
    #[serde(rename = "Source", default)]
    source: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Destination")]
    destination: String,
}

#[derive(Debug, Default, Clone)]
pub struct DockerRuntime;

impl DockerRuntime {
    pub fn new() -> Self {
        Self
    }

    fn inspect_format(name: &str, format: &str) -> Result<String> {
        DockerCommand::new("inspect")
            .args(["--format", format])
            .arg(name)
            .execute_with_output()
    }
}

impl ContainerRuntime for DockerRuntime {
    fn ensure_available(&self) -> Result<()> {
        for attempt in 1..=DAEMON_CONNECT_ATTEMPTS {
            if DockerCommand::new("info").execute().is_ok() {
                return Ok(());
            }
            if attempt < DAEMON_CONNECT_ATTEMPTS {
                debug!(
                    attempt,
                    "docker daemon not reachable, retrying in {}s", DAEMON_CONNECT_RETRY_SECS
                );
                thread::sleep(Duration::from_secs(DAEMON_CONNECT_RETRY_SECS));
            }
        }
        Err(SinaraError::DaemonUnreachable)
    }

    fn container_exists(&self, name: &str) -> Result<bool> {
        let output = DockerCommand::new("ps")
            .args(["-a", "--format", "{{.Names}}"])
            .execute_with_output()?;
        Ok(output.lines().any(|line| line.trim() == name))
    }

    fn create_container(&self, spec: &ContainerSpec) -> Result<()> {
        let mut cmd = DockerCommand::new("create")
            .args(["--name", spec.name.as_str()])
            .args(["--memory".to_string(), format!("{}b", spec.mem_limit_bytes)])
            .args(["--cpus".to_string(), spec.cpu_limit.to_string()])
            .args(["--shm-size".to_string(), format!("{}b", spec.shm_size_bytes)])
            .args(["-w", spec.working_dir.as_str()]);

        if spec.gpu_enabled {
            cmd = cmd.args(["--gpus", "all"]);
        }
        for (container_port, host_port) in &spec.ports {
            cmd = cmd.args(["-p".to_string(), format!("{}:{}", host_port, container_port)]);
        }
        for mount in &spec.mounts {
            cmd = cmd.args(["-v".to_string(), mount.to_string()]);
        }
        for (key, value) in &spec.environment {
            cmd = cmd.args(["-e".to_string(), format!("{}={}", key, value)]);
        }
        for (key, value) in &spec.labels {
            cmd = cmd.args(["-l".to_string(), format!("{}={}", key, value)]);
        }

        cmd = cmd.arg(&spec.versioned_image);
        // docker create pulls a missing image itself
        cmd = cmd.args(spec.command.split_whitespace());
        cmd.execute()
    }

    fn start_container(&self, name: &str) -> Result<()> {
        DockerCommand::new("start").arg(name).execute()
    }

    fn stop_container(&self, name: &str) -> Result<()> {
        DockerCommand::new("stop").arg(name).execute()
    }

    fn remove_container(&self, name: &str) -> Result<()> {
        if !self.container_exists(name)? {
            debug!(name, "container already absent, nothing to remove");
            return Ok(());
        }
        DockerCommand::new("rm").args(["-f", name]).execute()
    }

    fn exec(&self, name: &str, command: &str) -> Result<ExecOutput> {
        let output = DockerCommand::new("exec")
            .args(["--privileged", "-u", "root", name, "sh", "-c", command])
            .execute_raw()?;
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn copy_in(&self, name: &str, source: &Path, destination: &str) -> Result<()> {
        DockerCommand::new("cp")
            .arg(source.to_string_lossy().to_string())
            .arg(format!("{}:{}", name, destination))
            .execute()
    }

    fn container_labels(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let raw = Self::inspect_format(name, "{{json .Config.Labels}}")?;
        if raw == "null" {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn container_mounts(&self, name: &str) -> Result<Vec<RuntimeMount>> {
        let raw = Self::inspect_format(name, "{{json .Mounts}}")?;
        let mounts: Vec<InspectMount> = serde_json::from_str(&raw)?;
        mounts
            .into_iter()
            .map(|m| {
                let kind = match m.mount_type.as_str() {
                    "volume" => MountKind::Volume,
                    "bind" => MountKind::Bind,
                    other => {
                        return Err(SinaraError::Runtime(format!(
                            "Unsupported mount type {} on container {}",
                            other, name
                        )))
                    }
                };
                let source = match kind {
                    MountKind::Volume => m.name,
                    MountKind::Bind => m.source,
                };
                Ok(RuntimeMount {
                    kind,
                    source,
                    destination: m.destination,
                })
            })
            .collect()
    }

    fn host_port_for(&self, name: &str, container_port: u16) -> Result<Option<u16>> {
        let output = DockerCommand::new("port")
            .arg(name)
            .arg(format!("{}/tcp", container_port))
            .execute_raw()?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .next()
            .and_then(|line| line.trim().rsplit(':').next())
            .and_then(|port| port.parse().ok()))
    }

    fn containers_with_label(&self, label: &str) -> Result<Vec<ContainerSummary>> {
        let output = DockerCommand::new("ps")
            .args(["-a", "--filter"])
            .arg(format!("label={}", label))
            .args(["--format", PS_FORMAT])
            .execute_with_output()?;

        Ok(output
            .lines()
            .filter_map(|line| {
                let mut fields = line.split('\t');
                let name = fields.next()?.to_string();
                let image = fields.next()?.to_string();
                let status = fields.next().unwrap_or_default().to_string();
                let server_type = fields.next().map(str::to_string).filter(|t| !t.is_empty());
                Some(ContainerSummary {
                    name,
                    image,
                    status,
                    server_type,
                })
            })
            .collect())
    }

    fn volume_exists(&self, name: &str) -> Result<bool> {
        let output = DockerCommand::object("volume", "inspect")
            .arg(name)
            .execute_raw()?;
        Ok(output.status.success())
    }

    fn create_volume(&self, name: &str) -> Result<()> {
        DockerCommand::object("volume", "create").arg(name).execute()
    }

    fn remove_volume(&self, name: &str) -> Result<()> {
        if !self.volume_exists(name)? {
            debug!(name, "volume already absent, nothing to remove");
            return Ok(());
        }
        DockerCommand::object("volume", "rm")
            .args(["-f", name])
            .execute()
    }

    fn list_volumes(&self) -> Result<Vec<VolumeInfo>> {
        let raw = DockerCommand::new("system")
            .args(["df", "-v", "--format", "{{json .}}"])
            .execute_with_output()?;
        let data: serde_json::Value = serde_json::from_str(&raw)?;
        let Some(volumes) = data.get("Volumes").and_then(|v| v.as_array()) else {
            warn!("docker system df returned no volume section");
            return Ok(Vec::new());
        };
        Ok(volumes
            .iter()
            .filter_map(|vol| {
                let name = vol.get("Name")?.as_str()?.to_string();
                let size_bytes = vol
                    .get("UsageData")
                    .and_then(|u| u.get("Size"))
                    .and_then(|s| s.as_u64());
                Some(VolumeInfo { name, size_bytes })
            })
            .collect())
    }

    fn pull_image(&self, image: &str) -> Result<()> {
        // Stream pull progress straight through to the terminal
        duct::cmd("docker", ["pull", image])
            .run()
            .map_err(|e| SinaraError::Runtime(format!("Failed to pull image {}: {}", image, e)))?;
        Ok(())
    }
}
