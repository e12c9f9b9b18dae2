//! Turns raw `server create` arguments into a fully resolved request:
//! prompts fill the gaps, host introspection fills the resource
//! defaults, and the result can be serialized back into an equivalent
//! command line for `--fromConfig` replay.

use sinara_core::error::{Result, SinaraError};
use sinara_core::fs::parse_size;
use sinara_core::system;
use sinara_provider::mounts::FolderPaths;
use sinara_provider::server::{CreateParams, MountPlan, ServerType};

use crate::cli::{CreateArgs, RunMode, ServerTypeArg, YesNo};
use crate::prompt::Prompt;

/// Resource defaults derived from the machine running the CLI.
#[derive(Debug, Clone, Copy)]
pub struct HostLimits {
    pub mem_limit_bytes: u64,
    pub cpu_limit: u32,
    pub shm_size_bytes: u64,
}

impl HostLimits {
    pub fn detect() -> Self {
        Self {
            mem_limit_bytes: system::default_memory_limit(),
            cpu_limit: system::default_cpu_limit(),
            shm_size_bytes: system::default_shm_size(),
        }
    }
}

/// A create request with every choice made: no `None` left, every path
/// expanded, every size in bytes.
#[derive(Debug, Clone)]
pub struct ResolvedCreate {
    /// The input arguments with prompt answers written back, ready for
    /// `calculated_args`.
    pub args: CreateArgs,
    pub server_type: ServerType,
    pub gpu_enabled: bool,
    pub mem_limit_bytes: u64,
    pub cpu_limit: u32,
    pub shm_size_bytes: u64,
    pub mount_plan: MountPlan,
}

fn parse_size_arg(flag: &str, value: &str) -> Result<u64> {
    parse_size(value).ok_or_else(|| {
        SinaraError::Config(format!(
            "Cannot parse {flag} value '{value}', expected bytes or a size like 16g"
        ))
    })
}

fn prompt_path(prompt: &mut dyn Prompt, message: &str) -> Result<String> {
    loop {
        let answer = prompt.input_path(message)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
    }
}

fn path_or_prompt(
    value: &Option<String>,
    prompt: &mut dyn Prompt,
    message: &str,
) -> Result<String> {
    match value {
        Some(path) if !path.trim().is_empty() => Ok(path.trim().to_string()),
        _ => prompt_path(prompt, message),
    }
}

/// Resolve every open choice of a create request. Prompting only
/// happens for values the command line left unset.
pub fn resolve_create_request(
    args: &CreateArgs,
    prompt: &mut dyn Prompt,
    host: &HostLimits,
) -> Result<ResolvedCreate> {
    let mut resolved_args = args.clone();

    // --project is the deprecated spelling of --serverType
    let server_type_arg = match args.server_type.or(args.project) {
        Some(arg) => arg,
        None => match prompt.select_server_type()? {
            ServerType::Ml => ServerTypeArg::Ml,
            ServerType::Cv => ServerTypeArg::Cv,
        },
    };
    let server_type: ServerType = server_type_arg.into();
    resolved_args.server_type = Some(server_type_arg);
    resolved_args.project = None;

    // CV images need the GPU, regardless of what was asked for
    let gpu_enabled = match server_type {
        ServerType::Cv => true,
        ServerType::Ml => args.gpu_enabled.map(|v| v.as_bool()).unwrap_or(false),
    };
    resolved_args.gpu_enabled = Some(if gpu_enabled { YesNo::Yes } else { YesNo::No });

    let mem_limit_bytes = match &args.mem_limit {
        Some(value) => parse_size_arg("--memLimit", value)?,
        None => host.mem_limit_bytes,
    };
    let cpu_limit = args.cpu_limit.unwrap_or(host.cpu_limit);
    let shm_size_bytes = match &args.shm_size {
        Some(value) => parse_size_arg("--shmSize", value)?,
        None => host.shm_size_bytes,
    };
    resolved_args.mem_limit = Some(mem_limit_bytes.to_string());
    resolved_args.cpu_limit = Some(cpu_limit);
    resolved_args.shm_size = Some(shm_size_bytes.to_string());

    let mount_plan = match args.run_mode {
        RunMode::Quick => MountPlan::Quick,
        RunMode::Basic if !args.use_custom_folders => {
            let root = path_or_prompt(
                &args.jovyan_root_path,
                prompt,
                "Please, choose jovyan Root folder path (data, work, raw and tmp will be created there)",
            )?;
            resolved_args.jovyan_root_path = Some(root.clone());
            MountPlan::Basic {
                folders: FolderPaths::under_root(&root),
                create_folders: args.create_folders,
            }
        }
        RunMode::Basic => {
            let data = path_or_prompt(&args.jovyan_data_path, prompt, "Please, enter Data path")?;
            let work = path_or_prompt(&args.jovyan_work_path, prompt, "Please, enter Work path")?;
            let tmp = path_or_prompt(&args.jovyan_tmp_path, prompt, "Please, enter Tmp path")?;
            let raw = path_or_prompt(&args.jovyan_raw_path, prompt, "Please, enter Raw path")?;
            resolved_args.jovyan_data_path = Some(data.clone());
            resolved_args.jovyan_work_path = Some(work.clone());
            resolved_args.jovyan_tmp_path = Some(tmp.clone());
            resolved_args.jovyan_raw_path = Some(raw.clone());
            // Custom folders are never created or validated here
            MountPlan::Basic {
                folders: FolderPaths::custom(&data, &work, &tmp, &raw),
                create_folders: false,
            }
        }
    };

    Ok(ResolvedCreate {
        args: resolved_args,
        server_type,
        gpu_enabled,
        mem_limit_bytes,
        cpu_limit,
        shm_size_bytes,
        mount_plan,
    })
}

impl ResolvedCreate {
    pub fn into_create_params(self, cmd: sinara_config::ServerCmd) -> CreateParams {
        CreateParams {
            instance_name: self.args.instance_name.clone(),
            mount_plan: self.mount_plan,
            server_type: self.server_type,
            experimental: self.args.experimental,
            custom_image: self.args.image.clone(),
            gpu_enabled: self.gpu_enabled,
            mem_limit_bytes: self.mem_limit_bytes,
            cpu_limit: self.cpu_limit,
            shm_size_bytes: self.shm_size_bytes,
            insecure: self.args.insecure,
            platform: self.args.platform.clone(),
            cmd,
        }
    }
}

/// Serialize a resolved request back into a command line that recreates
/// the same server. Re-parsing the result must yield an equivalent
/// request.
pub fn calculated_args(verbose: bool, args: &CreateArgs) -> String {
    let mut parts: Vec<String> = Vec::new();
    if verbose {
        parts.push("--verbose".to_string());
    }
    parts.push("server".to_string());
    parts.push("create".to_string());

    let mut flag = |name: &str, value: &str| {
        parts.push(format!("--{name}={value}"));
    };

    flag("instanceName", &args.instance_name);
    flag(
        "runMode",
        match args.run_mode {
            RunMode::Quick => "q",
            RunMode::Basic => "b",
        },
    );
    if let Some(gpu) = args.gpu_enabled {
        flag("gpuEnabled", gpu.as_str());
    }
    if let Some(mem) = &args.mem_limit {
        flag("memLimit", mem);
    }
    if let Some(cpu) = args.cpu_limit {
        flag("cpuLimit", &cpu.to_string());
    }
    for (name, value) in [
        ("jovyanRootPath", &args.jovyan_root_path),
        ("jovyanDataPath", &args.jovyan_data_path),
        ("jovyanWorkPath", &args.jovyan_work_path),
        ("jovyanRawPath", &args.jovyan_raw_path),
        ("jovyanTmpPath", &args.jovyan_tmp_path),
    ] {
        if let Some(path) = value {
            flag(name, path);
        }
    }
    flag("platform", &args.platform);
    if let Some(image) = &args.image {
        flag("image", image);
    }
    if let Some(shm) = &args.shm_size {
        flag("shmSize", shm);
    }
    if let Some(server_type) = args.server_type {
        flag(
            "serverType",
            match server_type {
                ServerTypeArg::Ml => "ml",
                ServerTypeArg::Cv => "cv",
            },
        );
    }

    // Bare flags last; the folder-creation flag is inverted, so it is
    // emitted when creation is off
    if !args.create_folders {
        parts.push("--createFolders".to_string());
    }
    if args.use_custom_folders {
        parts.push("--useCustomFolders".to_string());
    }
    if args.insecure {
        parts.push("--insecure".to_string());
    }
    if args.experimental {
        parts.push("--experimental".to_string());
    }

    parts.join(" ")
}
