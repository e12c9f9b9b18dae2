// CLI argument parsing and definitions

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "sinara")]
#[command(about = "SinaraML Server management")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub subject: Subject,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Subject {
    /// SinaraML Server commands
    #[command(subcommand)]
    Server(ServerAction),
    /// SinaraML volume commands
    #[command(subcommand)]
    Volume(VolumeAction),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ServerAction {
    /// Create SinaraML Server
    Create(CreateArgs),
    /// Start SinaraML Server
    Start {
        /// Server container name
        #[arg(long = "instanceName", default_value = "personal_public_desktop")]
        instance_name: String,
    },
    /// Stop SinaraML Server
    Stop {
        /// Server container name
        #[arg(long = "instanceName", default_value = "personal_public_desktop")]
        instance_name: String,
    },
    /// Remove SinaraML Server
    Remove {
        /// Server container name
        #[arg(long = "instanceName", default_value = "personal_public_desktop")]
        instance_name: String,
        /// y - remove data, work, tmp and raw volumes, n - keep them
        #[arg(long = "withVolumes", default_value = "n")]
        with_volumes: YesNo,
    },
    /// Update the docker image of a SinaraML Server
    Update {
        /// ml - update the ML image, cv - update the CV image
        #[arg(long)]
        image: Option<ServerTypeArg>,
        /// Update experimental server images
        #[arg(long)]
        experimental: bool,
    },
    /// List SinaraML Servers
    List {
        /// Do not show removed servers
        #[arg(long = "hideRemoved")]
        hide_removed: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum VolumeAction {
    /// List SinaraML volumes
    List {
        /// Show volumes of removed servers too
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Data areas live in managed docker volumes
    #[value(name = "q")]
    Quick,
    /// Data areas are bind-mounted from host folders
    #[value(name = "b")]
    Basic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum YesNo {
    #[value(name = "y")]
    Yes,
    #[value(name = "n")]
    No,
}

impl YesNo {
    pub fn as_bool(&self) -> bool {
        matches!(self, YesNo::Yes)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "y",
            YesNo::No => "n",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServerTypeArg {
    #[value(name = "ml")]
    Ml,
    #[value(name = "cv")]
    Cv,
}

impl From<ServerTypeArg> for sinara_provider::server::ServerType {
    fn from(arg: ServerTypeArg) -> Self {
        match arg {
            ServerTypeArg::Ml => Self::Ml,
            ServerTypeArg::Cv => Self::Cv,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    /// Server container name
    #[arg(long = "instanceName", default_value = "personal_public_desktop")]
    pub instance_name: String,

    /// Runmode: quick (q) keeps work, data, tmp and raw in docker
    /// volumes, basic (b) mounts them from host folders
    #[arg(long = "runMode", default_value = "q")]
    pub run_mode: RunMode,

    /// Skip automatic creation of work, data, tmp and raw folders in
    /// basic mode; folders must then exist beforehand
    #[arg(long = "createFolders", action = clap::ArgAction::SetFalse)]
    pub create_folders: bool,

    /// Use individually chosen work, data, raw and tmp folders in basic
    /// mode; folders must exist
    #[arg(long = "useCustomFolders")]
    pub use_custom_folders: bool,

    /// y - let the container use the Nvidia GPU, n - disable GPU
    #[arg(long = "gpuEnabled")]
    pub gpu_enabled: Option<YesNo>,

    /// Maximum amount of memory for the server container, e.g. 16g
    #[arg(long = "memLimit")]
    pub mem_limit: Option<String>,

    /// Number of CPU cores for the server container
    #[arg(long = "cpuLimit")]
    pub cpu_limit: Option<u32>,

    /// Parent folder for data, work, raw and tmp (basic mode)
    #[arg(long = "jovyanRootPath")]
    pub jovyan_root_path: Option<String>,

    /// Data folder on host (basic mode with custom folders)
    #[arg(long = "jovyanDataPath")]
    pub jovyan_data_path: Option<String>,

    /// Work folder on host (basic mode with custom folders)
    #[arg(long = "jovyanWorkPath")]
    pub jovyan_work_path: Option<String>,

    /// Raw folder on host (basic mode with custom folders)
    #[arg(long = "jovyanRawPath")]
    pub jovyan_raw_path: Option<String>,

    /// Tmp folder on host (basic mode with custom folders)
    #[arg(long = "jovyanTmpPath")]
    pub jovyan_tmp_path: Option<String>,

    /// Run the server without password protection
    #[arg(long)]
    pub insecure: bool,

    /// Server platform
    #[arg(long, default_value = "desktop")]
    pub platform: String,

    /// Use experimental server images
    #[arg(long)]
    pub experimental: bool,

    /// Custom server image name
    #[arg(long)]
    pub image: Option<String>,

    /// Docker shared memory size, e.g. 2g
    #[arg(long = "shmSize")]
    pub shm_size: Option<String>,

    /// Create the server from a saved server.json config
    #[arg(long = "fromConfig")]
    pub from_config: Option<String>,

    /// DEPRECATED: use --serverType
    #[arg(long)]
    pub project: Option<ServerTypeArg>,

    /// SinaraML Server type
    #[arg(long = "serverType")]
    pub server_type: Option<ServerTypeArg>,
}
