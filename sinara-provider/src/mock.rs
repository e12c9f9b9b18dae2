//! In-memory `ContainerRuntime` for tests.
//!
//! Containers and volumes live in a mutex-guarded state table; exec
//! calls return scripted outputs and are recorded for assertions.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use sinara_config::ContainerSpec;
use sinara_core::error::{Result, SinaraError};

use crate::{ContainerRuntime, ContainerSummary, ExecOutput, RuntimeMount, VolumeInfo};

#[derive(Debug, Clone)]
struct MockContainer {
    spec: ContainerSpec,
    running: bool,
}

#[derive(Debug, Default)]
struct MockState {
    containers: BTreeMap<String, MockContainer>,
    volumes: BTreeMap<String, u64>,
    created_volumes: usize,
    scripted_exec: BTreeMap<String, ExecOutput>,
    exec_log: Vec<(String, String)>,
    copied_in: Vec<(String, String)>,
    pulled_images: Vec<String>,
    daemon_available: bool,
}

/// Test double for the docker runtime.
#[derive(Debug)]
pub struct MockRuntime {
    state: Mutex<MockState>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                daemon_available: true,
                ..MockState::default()
            }),
        }
    }

    pub fn with_unavailable_daemon() -> Self {
        let runtime = Self::new();
        runtime.state.lock().unwrap().daemon_available = false;
        runtime
    }

    /// Script the output of one exec command; unscripted commands
    /// succeed with empty output.
    pub fn script_exec(&self, command: &str, exit_code: i32, stdout: &str, stderr: &str) {
        self.state.lock().unwrap().scripted_exec.insert(
            command.to_string(),
            ExecOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
    }

    pub fn exec_commands_for(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .exec_log
            .iter()
            .filter(|(container, _)| container == name)
            .map(|(_, command)| command.clone())
            .collect()
    }

    pub fn copied_files_for(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .copied_in
            .iter()
            .filter(|(container, _)| container == name)
            .map(|(_, file)| file.clone())
            .collect()
    }

    pub fn pulled_images(&self) -> Vec<String> {
        self.state.lock().unwrap().pulled_images.clone()
    }

    pub fn created_volume_count(&self) -> usize {
        self.state.lock().unwrap().created_volumes
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(name)
            .map(|c| c.running)
            .unwrap_or(false)
    }

    pub fn container_spec(&self, name: &str) -> Option<ContainerSpec> {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(name)
            .map(|c| c.spec.clone())
    }

    pub fn set_volume_size(&self, name: &str, size_bytes: u64) {
        self.state
            .lock()
            .unwrap()
            .volumes
            .insert(name.to_string(), size_bytes);
    }
}

impl ContainerRuntime for MockRuntime {
    fn ensure_available(&self) -> Result<()> {
        if self.state.lock().unwrap().daemon_available {
            Ok(())
        } else {
            Err(SinaraError::DaemonUnreachable)
        }
    }

    fn container_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().containers.contains_key(name))
    }

    fn create_container(&self, spec: &ContainerSpec) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.containers.contains_key(&spec.name) {
            return Err(SinaraError::Runtime(format!(
                "container {} already exists",
                spec.name
            )));
        }
        state.containers.insert(
            spec.name.clone(),
            MockContainer {
                spec: spec.clone(),
                running: false,
            },
        );
        Ok(())
    }

    fn start_container(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name) {
            Some(container) => {
                container.running = true;
                Ok(())
            }
            None => Err(SinaraError::Runtime(format!("no such container: {name}"))),
        }
    }

    fn stop_container(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name) {
            Some(container) => {
                container.running = false;
                Ok(())
            }
            None => Err(SinaraError::Runtime(format!("no such container: {name}"))),
        }
    }

    fn remove_container(&self, name: &str) -> Result<()> {
        self.state.lock().unwrap().containers.remove(name);
        Ok(())
    }

    fn exec(&self, name: &str, command: &str) -> Result<ExecOutput> {
        let mut state = self.state.lock().unwrap();
        state.exec_log.push((name.to_string(), command.to_string()));
        Ok(state.scripted_exec.get(command).cloned().unwrap_or_default())
    }

    fn copy_in(&self, name: &str, source: &Path, _destination: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .copied_in
            .push((name.to_string(), source.display().to_string()));
        Ok(())
    }

    fn container_labels(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .get(name)
            .map(|c| c.spec.labels.clone())
            .unwrap_or_default())
    }

    fn container_mounts(&self, name: &str) -> Result<Vec<RuntimeMount>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .get(name)
            .map(|c| {
                c.spec
                    .mounts
                    .iter()
                    .map(|m| RuntimeMount {
                        kind: m.kind,
                        source: m.source.clone(),
                        destination: m.destination.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn host_port_for(&self, name: &str, container_port: u16) -> Result<Option<u16>> {
        let state = self.state.lock().unwrap();
        Ok(state.containers.get(name).and_then(|c| {
            c.spec
                .ports
                .iter()
                .find(|(container, _)| **container == container_port)
                .map(|(_, host)| *host)
        }))
    }

    fn containers_with_label(&self, label: &str) -> Result<Vec<ContainerSummary>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .values()
            .filter(|c| c.spec.labels.contains_key(label))
            .map(|c| ContainerSummary {
                name: c.spec.name.clone(),
                image: c.spec.image.clone(),
                status: if c.running {
                    "Up 5 minutes".to_string()
                } else {
                    "Exited (0) 5 minutes ago".to_string()
                },
                server_type: c.spec.labels.get("sinaraml.serverType").cloned(),
            })
            .collect())
    }

    fn volume_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().volumes.contains_key(name))
    }

    fn create_volume(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.volumes.insert(name.to_string(), 0);
        state.created_volumes += 1;
        Ok(())
    }

    fn remove_volume(&self, name: &str) -> Result<()> {
        self.state.lock().unwrap().volumes.remove(name);
        Ok(())
    }

    fn list_volumes(&self) -> Result<Vec<VolumeInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .volumes
            .iter()
            .map(|(name, size)| VolumeInfo {
                name: name.clone(),
                size_bytes: Some(*size),
            })
            .collect())
    }

    fn pull_image(&self, image: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .pulled_images
            .push(image.to_string());
        Ok(())
    }
}
