//! Server lifecycle: create, start, stop, remove and update.
//!
//! Presentation stays in the CLI layer; this module only talks to the
//! container runtime, the image registry and the config stores, so the
//! whole lifecycle runs against `MockRuntime` in tests.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, info};

use sinara_config::{ContainerSpec, MountKind, ServerCmd, ServerConfigStore, ServerRecord};
use sinara_core::error::{Result, SinaraError};
use sinara_core::fs::delete_folder_contents;
use sinara_core::sinara_warning;

use crate::mounts::{self, FolderPaths, MOUNT_POINTS};
use crate::registry::VersionResolver;
use crate::resources;
use crate::{ContainerRuntime, ContainerSummary};

pub const DEFAULT_INSTANCE_NAME: &str = "personal_public_desktop";
/// Container name used by CLI generations before instance names existed.
pub const LEGACY_INSTANCE_NAME: &str = "jovyan-single-use";

pub const PLATFORM_LABEL: &str = "sinaraml.platform";
pub const SERVER_TYPE_LABEL: &str = "sinaraml.serverType";
pub const CONFIG_PATH_LABEL: &str = "sinaraml.config.path";
pub const CLI_VERSION_LABEL: &str = "sinaraml.cli.version";

pub const DEFAULT_PLATFORM: &str = "desktop";

/// Published images, indexed by `[experimental][server type]`.
const SINARA_IMAGES: [[&str; 2]; 2] = [
    ["buslovaev/sinara-notebook", "buslovaev/sinara-cv"],
    ["buslovaev/sinara-notebook-exp", "buslovaev/sinara-cv-exp"],
];

const SERVER_WORKING_DIR: &str = "/home/jovyan/work";
const CONTAINER_ASSETS_DIR: &str = "/home/sinarian/";

const BASE_SERVER_COMMAND: &str = "start-notebook.sh --ip=0.0.0.0 --port=8888 \
    --NotebookApp.default_url=/lab --ServerApp.allow_password_change=False";
// Bare `=` values survive whitespace splitting, quoted empties would not
const INSECURE_COMMAND_SUFFIX: &str = "--NotebookApp.token= --NotebookApp.password=";

/// Kind of workloads an image is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Ml,
    Cv,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Ml => "ml",
            ServerType::Cv => "cv",
        }
    }

    fn image_index(&self) -> usize {
        match self {
            ServerType::Ml => 0,
            ServerType::Cv => 1,
        }
    }
}

impl FromStr for ServerType {
    type Err = SinaraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ml" => Ok(ServerType::Ml),
            "cv" => Ok(ServerType::Cv),
            other => Err(SinaraError::Config(format!(
                "Unknown server type '{other}', expected 'ml' or 'cv'"
            ))),
        }
    }
}

/// Image type tag exported to the container as `SINARA_IMAGE_TYPE`.
pub fn image_type(server_type: ServerType, experimental: bool) -> String {
    let exp_part = if experimental { "-exp" } else { "" };
    format!("{}{}", server_type.as_str(), exp_part)
}

/// Published image for a server type.
pub fn image_for(server_type: ServerType, experimental: bool) -> &'static str {
    SINARA_IMAGES[experimental as usize][server_type.image_index()]
}

/// Where the four data areas of a new server live.
#[derive(Debug, Clone)]
pub enum MountPlan {
    /// Named volumes managed by the runtime.
    Quick,
    /// Bind mounts from host folders; `create_folders` is false when the
    /// user owns a pre-existing layout that must not be touched.
    Basic {
        folders: FolderPaths,
        create_folders: bool,
    },
}

/// What `remove` did. A server can be removed while its config record
/// is already gone, so the trashed path is separate from the removal
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// No such container; nothing was touched.
    AlreadyAbsent,
    Removed { trashed_config: Option<PathBuf> },
}

/// Everything `create` needs, with prompts and host defaults already
/// resolved by the caller.
#[derive(Debug, Clone)]
pub struct CreateParams {
    pub instance_name: String,
    pub mount_plan: MountPlan,
    pub server_type: ServerType,
    pub experimental: bool,
    /// Overrides the published image table when set; no version lookup
    /// is performed for custom images.
    pub custom_image: Option<String>,
    pub gpu_enabled: bool,
    pub mem_limit_bytes: u64,
    pub cpu_limit: u32,
    pub shm_size_bytes: u64,
    pub insecure: bool,
    pub platform: String,
    pub cmd: ServerCmd,
}

/// When `requested` is the default name but only the legacy container
/// exists, operations target the legacy container.
pub fn reconcile_legacy_name(requested: &str, existing: &[ContainerSummary]) -> String {
    if requested == DEFAULT_INSTANCE_NAME
        && existing.iter().any(|c| c.name == LEGACY_INSTANCE_NAME)
    {
        return LEGACY_INSTANCE_NAME.to_string();
    }
    requested.to_string()
}

/// Server type of a listed container, guessed from the image name for
/// containers created before the type label existed.
pub fn server_type_or_guess(summary: &ContainerSummary) -> String {
    if let Some(server_type) = &summary.server_type {
        if !server_type.is_empty() {
            return server_type.clone();
        }
    }
    if summary.image.contains("notebook") {
        ServerType::Ml.as_str().to_string()
    } else {
        ServerType::Cv.as_str().to_string()
    }
}

pub struct ServerLifecycle<'a> {
    runtime: &'a dyn ContainerRuntime,
    resolver: &'a dyn VersionResolver,
    state_root: Option<PathBuf>,
}

impl<'a> ServerLifecycle<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime, resolver: &'a dyn VersionResolver) -> Self {
        Self {
            runtime,
            resolver,
            state_root: None,
        }
    }

    /// Redirect config persistence, for tests.
    pub fn with_state_root(
        runtime: &'a dyn ContainerRuntime,
        resolver: &'a dyn VersionResolver,
        state_root: PathBuf,
    ) -> Self {
        Self {
            runtime,
            resolver,
            state_root: Some(state_root),
        }
    }

    fn store_for(&self, instance_name: &str) -> Result<ServerConfigStore> {
        match &self.state_root {
            Some(root) => Ok(ServerConfigStore::with_state_root(
                instance_name,
                root.clone(),
            )),
            None => ServerConfigStore::new(instance_name),
        }
    }

    /// The requested name, redirected to the legacy container when that
    /// is what actually exists.
    pub fn reconcile_instance_name(&self, requested: &str) -> Result<String> {
        let existing = self.runtime.containers_with_label(PLATFORM_LABEL)?;
        Ok(reconcile_legacy_name(requested, &existing))
    }

    /// All containers this CLI manages, running or not.
    pub fn running_servers(&self) -> Result<Vec<ContainerSummary>> {
        self.runtime.containers_with_label(PLATFORM_LABEL)
    }

    /// Platform a server was created for, with a fallback for legacy
    /// containers that carry no labels.
    pub fn server_platform(&self, instance_name: &str) -> Result<String> {
        let labels = self.runtime.container_labels(instance_name)?;
        Ok(labels
            .get(PLATFORM_LABEL)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()))
    }

    /// Create the container and persist its record. Creating over an
    /// existing instance is refused; `remove` first.
    pub fn create(&self, params: &CreateParams) -> Result<PathBuf> {
        self.runtime.ensure_available()?;
        if self.runtime.container_exists(&params.instance_name)? {
            return Err(SinaraError::Config(format!(
                "Server {} already exists, remove it and run create again",
                params.instance_name
            )));
        }

        let mounts = match &params.mount_plan {
            MountPlan::Quick => mounts::quick_mode(self.runtime, &params.instance_name)?,
            MountPlan::Basic {
                folders,
                create_folders,
            } => {
                if *create_folders {
                    folders.create_all()?;
                }
                mounts::basic_mode(folders)
            }
        };

        let (image, versioned_image) = match &params.custom_image {
            Some(image) => (image.clone(), image.clone()),
            None => {
                let image = image_for(params.server_type, params.experimental);
                let short_name = image.rsplit('/').next().unwrap_or(image);
                let tag = self.resolver.latest_tag(short_name)?;
                (image.to_string(), format!("{image}:{tag}"))
            }
        };

        let mut command = BASE_SERVER_COMMAND.to_string();
        if params.insecure {
            command = format!("{command} {INSECURE_COMMAND_SUFFIX}");
        }

        let store = self.store_for(&params.instance_name)?;
        let config_path = store.config_path();

        let environment = BTreeMap::from([
            ("DSML_USER".to_string(), "jovyan".to_string()),
            (
                "JUPYTER_ALLOW_INSECURE_WRITES".to_string(),
                "true".to_string(),
            ),
            ("JUPYTER_RUNTIME_DIR".to_string(), "/tmp".to_string()),
            ("INFRA_NAME".to_string(), "local_filesystem".to_string()),
            ("JUPYTER_IMAGE_SPEC".to_string(), versioned_image.clone()),
            (
                "SINARA_SERVER_MEMORY_LIMIT".to_string(),
                params.mem_limit_bytes.to_string(),
            ),
            (
                "SINARA_SERVER_CORES".to_string(),
                params.cpu_limit.to_string(),
            ),
            (
                "SINARA_ORG".to_string(),
                resources::MLOPS_ORGANIZATION_JSON.to_string(),
            ),
            ("SINARA_PLATFORM".to_string(), params.platform.clone()),
            (
                "SINARA_IMAGE_TYPE".to_string(),
                image_type(params.server_type, params.experimental),
            ),
        ]);

        let labels = BTreeMap::from([
            (PLATFORM_LABEL.to_string(), params.platform.clone()),
            (
                CONFIG_PATH_LABEL.to_string(),
                config_path.display().to_string(),
            ),
            (
                SERVER_TYPE_LABEL.to_string(),
                params.server_type.as_str().to_string(),
            ),
            (
                CLI_VERSION_LABEL.to_string(),
                sinara_core::cli_version().to_string(),
            ),
        ]);

        let spec = ContainerSpec {
            image,
            versioned_image,
            command,
            working_dir: SERVER_WORKING_DIR.to_string(),
            name: params.instance_name.clone(),
            mem_limit_bytes: params.mem_limit_bytes,
            cpu_limit: params.cpu_limit,
            shm_size_bytes: params.shm_size_bytes,
            gpu_enabled: params.gpu_enabled,
            ports: sinara_ports::server_ports_mapping(),
            mounts,
            environment,
            labels,
        };

        self.runtime.create_container(&spec)?;
        store.save(&ServerRecord::new(params.cmd.clone(), spec))?;
        info!(instance = %params.instance_name, "server created");
        Ok(config_path)
    }

    /// Start the container and provision it: host extension install,
    /// folder ownership, proxy passthrough, then a restart so the
    /// installed Jupyter extension activates.
    pub fn start(&self, requested_name: &str) -> Result<String> {
        self.runtime.ensure_available()?;
        let instance_name = self.reconcile_instance_name(requested_name)?;
        if !self.runtime.container_exists(&instance_name)? {
            return Err(SinaraError::Config(format!(
                "Server {instance_name} doesn't exist yet, run 'sinara server create' first"
            )));
        }

        let assets_dir = tempfile::tempdir()?;
        let (wheel, check_script) = resources::stage_container_assets(&assets_dir)?;
        self.runtime
            .copy_in(&instance_name, &wheel, CONTAINER_ASSETS_DIR)?;
        self.runtime
            .copy_in(&instance_name, &check_script, CONTAINER_ASSETS_DIR)?;

        self.runtime.start_container(&instance_name)?;
        self.prepare_mounted_folders(&instance_name)?;
        self.ensure_proxy_from_host(&instance_name)?;

        self.runtime
            .exec(&instance_name, "pip install sinaraml_jupyter -U")?;
        self.runtime.exec(
            &instance_name,
            &format!(
                "pip install {}{}",
                CONTAINER_ASSETS_DIR,
                resources::HOST_EXT_WHEEL_NAME
            ),
        )?;
        self.runtime.exec(
            &instance_name,
            &format!("python {}{}", CONTAINER_ASSETS_DIR, resources::CHECK_SCRIPT_NAME),
        )?;

        // Restart to activate the freshly installed extension
        self.runtime.stop_container(&instance_name)?;
        self.runtime.start_container(&instance_name)?;
        info!(instance = %instance_name, "server started");
        Ok(instance_name)
    }

    pub fn stop(&self, requested_name: &str) -> Result<String> {
        self.runtime.ensure_available()?;
        let instance_name = self.reconcile_instance_name(requested_name)?;
        if !self.runtime.container_exists(&instance_name)? {
            return Err(SinaraError::Config(format!(
                "Your server with name {instance_name} doesn't exist"
            )));
        }
        self.runtime.stop_container(&instance_name)?;
        info!(instance = %instance_name, "server stopped");
        Ok(instance_name)
    }

    /// Remove the container and trash its config record. Removing an
    /// already absent server only reports; the previous trash entry is
    /// left alone.
    pub fn remove(&self, requested_name: &str, with_volumes: bool) -> Result<RemoveOutcome> {
        self.runtime.ensure_available()?;
        let instance_name = &self.reconcile_instance_name(requested_name)?;
        if !self.runtime.container_exists(instance_name)? {
            sinara_warning!("Server with name {} has been already removed", instance_name);
            return Ok(RemoveOutcome::AlreadyAbsent);
        }

        if with_volumes {
            let destinations: Vec<&str> = MOUNT_POINTS.iter().map(|&(_, dest)| dest).collect();
            for mount in self.runtime.container_mounts(instance_name)? {
                if mount.kind == MountKind::Bind && destinations.contains(&mount.destination.as_str())
                {
                    debug!(folder = %mount.source, "clearing mounted host folder");
                    delete_folder_contents(&PathBuf::from(&mount.source))?;
                }
            }
            self.runtime.remove_container(instance_name)?;
            // Volumes are removed by name too, in case they are orphaned
            for (id, _) in MOUNT_POINTS {
                self.runtime
                    .remove_volume(&mounts::volume_name(id, instance_name))?;
            }
        } else {
            self.runtime.remove_container(instance_name)?;
        }

        let trashed_config = self.store_for(instance_name)?.trash()?;
        info!(instance = %instance_name, "server removed");
        Ok(RemoveOutcome::Removed { trashed_config })
    }

    /// Pull the newest image for a server type; returns the pulled
    /// image name.
    pub fn update(&self, server_type: ServerType, experimental: bool) -> Result<String> {
        self.runtime.ensure_available()?;
        let image = image_for(server_type, experimental);
        self.runtime.pull_image(image)?;
        Ok(image.to_string())
    }

    /// Notebook user inside the container, `jovyan` on stock images.
    fn notebook_user(&self, instance_name: &str) -> Result<Option<String>> {
        let output = self.runtime.exec(instance_name, "printenv NB_USER")?;
        Ok(output.stdout.lines().next().map(str::to_string))
    }

    /// Fix ownership and permissions of the mounted data areas so the
    /// notebook user can write them regardless of how they were mounted.
    fn prepare_mounted_folders(&self, instance_name: &str) -> Result<()> {
        let Some(user) = self.notebook_user(instance_name)? else {
            sinara_warning!("Cannot determine the notebook user, skipping folder preparation");
            return Ok(());
        };
        let commands = [
            format!("chown -R {user}:users /tmp"),
            format!("chown -R {user}:users /data"),
            format!("chown -R {user}:users /raw"),
            format!("chown {user}:users /home/$NB_USER"),
            format!("chmod 777 /home/{user}"),
            format!("chmod 777 /home/{user}/work"),
            "rm -rf /tmp/*".to_string(),
            "chmod 777 /tmp".to_string(),
        ];
        for command in &commands {
            self.runtime.exec(instance_name, command)?;
        }
        Ok(())
    }

    /// Let sudo keep the host proxy variables so apt works behind
    /// corporate proxies. Failure is reported, not fatal.
    fn ensure_proxy_from_host(&self, instance_name: &str) -> Result<()> {
        let keep_env_in_sudo = "sed -i '/Defaults:%sudo env_keep += \"http_proxy https_proxy \
            ftp_proxy all_proxy no_proxy\"/s/^#//g' /etc/sudoers";
        let output = self.runtime.exec(instance_name, keep_env_in_sudo)?;
        if !output.success() {
            sinara_warning!(
                "Failed to set proxy settings for sudo users, apt / apt-get might not work properly"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRuntime;

    struct FixedResolver(&'static str);

    impl VersionResolver for FixedResolver {
        fn latest_tag(&self, _image_name: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn sample_cmd() -> ServerCmd {
        ServerCmd {
            script: "sinara".to_string(),
            args: "server create".to_string(),
            calculated_args: "server create --runMode=q".to_string(),
        }
    }

    fn quick_params(name: &str) -> CreateParams {
        CreateParams {
            instance_name: name.to_string(),
            mount_plan: MountPlan::Quick,
            server_type: ServerType::Ml,
            experimental: false,
            custom_image: None,
            gpu_enabled: false,
            mem_limit_bytes: 6 * 1024 * 1024 * 1024,
            cpu_limit: 4,
            shm_size_bytes: 1024 * 1024 * 1024,
            insecure: false,
            platform: DEFAULT_PLATFORM.to_string(),
            cmd: sample_cmd(),
        }
    }

    fn lifecycle<'a>(
        runtime: &'a MockRuntime,
        resolver: &'a FixedResolver,
        root: &std::path::Path,
    ) -> ServerLifecycle<'a> {
        ServerLifecycle::with_state_root(runtime, resolver, root.to_path_buf())
    }

    #[test]
    fn test_create_quick_mode_builds_full_spec() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        let config_path = lc.create(&quick_params("desk")).unwrap();
        assert!(config_path.exists());

        let spec = runtime.container_spec("desk").unwrap();
        assert_eq!(spec.image, "buslovaev/sinara-notebook");
        assert_eq!(spec.versioned_image, "buslovaev/sinara-notebook:20240210");
        assert!(spec.command.starts_with("start-notebook.sh"));
        assert!(!spec.command.contains("NotebookApp.token"));
        assert_eq!(spec.working_dir, "/home/jovyan/work");

        // Four managed volumes were created for the data areas
        assert_eq!(runtime.created_volume_count(), 4);
        assert_eq!(spec.mounts.len(), 4);
        assert_eq!(spec.mounts[0].to_string(), "jovyan-data-desk:/data");

        // Ports cover the ui range plus the notebook port itself
        assert!(spec.ports.contains_key(&8888));
        assert!(spec.ports.contains_key(&4040));
        assert!(spec.ports.contains_key(&4060));

        assert_eq!(spec.environment["DSML_USER"], "jovyan");
        assert_eq!(spec.environment["SINARA_IMAGE_TYPE"], "ml");
        assert_eq!(
            spec.environment["JUPYTER_IMAGE_SPEC"],
            "buslovaev/sinara-notebook:20240210"
        );
        assert_eq!(spec.labels[PLATFORM_LABEL], "desktop");
        assert_eq!(spec.labels[SERVER_TYPE_LABEL], "ml");
        assert_eq!(
            spec.labels[CONFIG_PATH_LABEL],
            config_path.display().to_string()
        );
    }

    #[test]
    fn test_create_insecure_appends_empty_token_flags() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        let mut params = quick_params("desk");
        params.insecure = true;
        lc.create(&params).unwrap();

        let spec = runtime.container_spec("desk").unwrap();
        assert!(spec.command.ends_with("--NotebookApp.token= --NotebookApp.password="));
    }

    #[test]
    fn test_create_refuses_existing_instance() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        lc.create(&quick_params("desk")).unwrap();
        let err = lc.create(&quick_params("desk")).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_create_custom_image_skips_version_lookup() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("should-not-appear");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        let mut params = quick_params("desk");
        params.custom_image = Some("registry.local/team/notebook:pinned".to_string());
        lc.create(&params).unwrap();

        let spec = runtime.container_spec("desk").unwrap();
        assert_eq!(spec.image, "registry.local/team/notebook:pinned");
        assert_eq!(spec.versioned_image, spec.image);
    }

    #[test]
    fn test_experimental_cv_image_selection() {
        assert_eq!(image_for(ServerType::Cv, true), "buslovaev/sinara-cv-exp");
        assert_eq!(image_for(ServerType::Ml, false), "buslovaev/sinara-notebook");
        assert_eq!(image_type(ServerType::Cv, true), "cv-exp");
        assert_eq!(image_type(ServerType::Ml, false), "ml");
    }

    #[test]
    fn test_start_provisions_and_restarts() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        lc.create(&quick_params("desk")).unwrap();
        runtime.script_exec("printenv NB_USER", 0, "jovyan\n", "");

        let started = lc.start("desk").unwrap();
        assert_eq!(started, "desk");
        assert!(runtime.is_running("desk"));

        let copied = runtime.copied_files_for("desk");
        assert_eq!(copied.len(), 2);
        assert!(copied[0].ends_with(resources::HOST_EXT_WHEEL_NAME));

        let commands = runtime.exec_commands_for("desk");
        assert!(commands.contains(&"pip install sinaraml_jupyter -U".to_string()));
        assert!(commands.contains(&"chown -R jovyan:users /data".to_string()));
        assert!(commands.contains(&"rm -rf /tmp/*".to_string()));
        assert!(commands
            .iter()
            .any(|c| c.starts_with("pip install /home/sinarian/")));
        assert!(commands
            .iter()
            .any(|c| c.starts_with("python /home/sinarian/check_sinara.py")));
    }

    #[test]
    fn test_start_requires_existing_server() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        let err = lc.start("ghost").unwrap_err();
        assert!(err.to_string().contains("doesn't exist yet"));
    }

    #[test]
    fn test_legacy_name_reconciliation() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        lc.create(&quick_params(LEGACY_INSTANCE_NAME)).unwrap();
        runtime.script_exec("printenv NB_USER", 0, "jovyan\n", "");

        // The default name is redirected to the legacy container
        let started = lc.start(DEFAULT_INSTANCE_NAME).unwrap();
        assert_eq!(started, LEGACY_INSTANCE_NAME);
        let stopped = lc.stop(DEFAULT_INSTANCE_NAME).unwrap();
        assert_eq!(stopped, LEGACY_INSTANCE_NAME);

        // Other names are untouched
        assert_eq!(
            reconcile_legacy_name("other", &lc.running_servers().unwrap()),
            "other"
        );
    }

    #[test]
    fn test_remove_with_volumes_clears_everything() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        lc.create(&quick_params("desk")).unwrap();
        assert!(runtime.volume_exists("jovyan-raw-desk").unwrap());

        let outcome = lc.remove("desk", true).unwrap();
        let RemoveOutcome::Removed {
            trashed_config: Some(trashed),
        } = outcome
        else {
            panic!("config should be trashed, got {outcome:?}");
        };
        assert!(trashed.exists());

        assert!(!runtime.container_exists("desk").unwrap());
        for id in sinara_config::DataId::ALL {
            assert!(!runtime.volume_exists(&mounts::volume_name(id, "desk")).unwrap());
        }
    }

    #[test]
    fn test_remove_without_volumes_keeps_data() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        lc.create(&quick_params("desk")).unwrap();
        lc.remove("desk", false).unwrap();

        assert!(!runtime.container_exists("desk").unwrap());
        assert!(runtime.volume_exists("jovyan-data-desk").unwrap());
    }

    #[test]
    fn test_remove_absent_server_reports_only() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        assert_eq!(lc.remove("ghost", true).unwrap(), RemoveOutcome::AlreadyAbsent);
    }

    #[test]
    fn test_remove_without_config_record_still_removes() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        lc.create(&quick_params("desk")).unwrap();
        let config = lc.store_for("desk").unwrap().config_path();
        std::fs::remove_file(config).unwrap();

        let outcome = lc.remove("desk", false).unwrap();
        assert_eq!(
            outcome,
            RemoveOutcome::Removed {
                trashed_config: None
            }
        );
        assert!(!runtime.container_exists("desk").unwrap());
    }

    #[test]
    fn test_update_pulls_selected_image() {
        let runtime = MockRuntime::new();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        let pulled = lc.update(ServerType::Cv, true).unwrap();
        assert_eq!(pulled, "buslovaev/sinara-cv-exp");
        assert_eq!(runtime.pulled_images(), vec!["buslovaev/sinara-cv-exp"]);
    }

    #[test]
    fn test_server_type_guess_for_unlabeled_containers() {
        let summary = ContainerSummary {
            name: "old".to_string(),
            image: "buslovaev/sinara-notebook".to_string(),
            status: "Up 2 hours".to_string(),
            server_type: None,
        };
        assert_eq!(server_type_or_guess(&summary), "ml");

        let summary = ContainerSummary {
            name: "old-cv".to_string(),
            image: "buslovaev/sinara-cv".to_string(),
            status: "Up 2 hours".to_string(),
            server_type: Some(String::new()),
        };
        assert_eq!(server_type_or_guess(&summary), "cv");
    }

    #[test]
    fn test_daemon_unreachable_surfaces_from_create() {
        let runtime = MockRuntime::with_unavailable_daemon();
        let resolver = FixedResolver("20240210");
        let dir = tempfile::tempdir().unwrap();
        let lc = lifecycle(&runtime, &resolver, dir.path());

        let err = lc.create(&quick_params("desk")).unwrap_err();
        assert!(matches!(err, SinaraError::DaemonUnreachable));
    }
}
