//! `sinara server ...` actions.

use std::process::Command;

use colored::Colorize;

use sinara_config::{GlobalConfigStore, ServerCmd, ServerRecord};
use sinara_core::error::{Result, SinaraError};
use sinara_core::{sinara_println, sinara_success, sinara_warning};
use sinara_provider::server::{RemoveOutcome, ServerLifecycle, ServerType};
use sinara_provider::{urls, ContainerRuntime, DockerHubResolver, DockerRuntime};

use crate::cli::{CreateArgs, ServerAction};
use crate::prompt::{Prompt, TerminalPrompt};
use crate::resolve::{calculated_args, resolve_create_request, HostLimits};

pub fn execute(action: ServerAction, verbose: bool) -> Result<()> {
    let runtime = DockerRuntime::new();
    let resolver = DockerHubResolver::default();
    let lifecycle = ServerLifecycle::new(&runtime, &resolver);

    match action {
        ServerAction::Create(args) => create(&lifecycle, args, verbose),
        ServerAction::Start { instance_name } => start(&lifecycle, &runtime, &instance_name),
        ServerAction::Stop { instance_name } => stop(&lifecycle, &instance_name),
        ServerAction::Remove {
            instance_name,
            with_volumes,
        } => remove(&lifecycle, &instance_name, with_volumes.as_bool()),
        ServerAction::Update {
            image,
            experimental,
        } => update(&lifecycle, image.map(Into::into), experimental),
        ServerAction::List { hide_removed } => list(&lifecycle, &runtime, hide_removed),
    }
}

fn create(lifecycle: &ServerLifecycle<'_>, args: CreateArgs, verbose: bool) -> Result<()> {
    if let Some(config_path) = &args.from_config {
        return create_from_config(config_path);
    }

    let mut prompt = TerminalPrompt;
    let resolved = resolve_create_request(&args, &mut prompt, &HostLimits::detect())?;

    let argv: Vec<String> = std::env::args().collect();
    let cmd = ServerCmd {
        script: argv.first().cloned().unwrap_or_else(|| "sinara".to_string()),
        args: argv[1..].join(" "),
        calculated_args: calculated_args(verbose, &resolved.args),
    };

    let instance_name = resolved.args.instance_name.clone();
    lifecycle.create(&resolved.into_create_params(cmd))?;
    sinara_success!("Sinara server {} is created", instance_name);
    sinara_println!("Run 'sinara server start --instanceName={}' to start it", instance_name);
    Ok(())
}

/// Replay the saved invocation of a trashed or copied record through a
/// fresh CLI process, so the replayed run resolves defaults against the
/// current host.
fn create_from_config(config_path: &str) -> Result<()> {
    sinara_println!("Using config {} to create the sinara server", config_path);
    let record = GlobalConfigStore::load_record(std::path::Path::new(config_path))?;
    let replay_args = record.cmd.calculated_args;

    let current_exe = std::env::current_exe()?;
    let status = Command::new(current_exe)
        .args(replay_args.split_whitespace())
        .status()?;
    if !status.success() {
        return Err(SinaraError::Config(format!(
            "Replaying '{replay_args}' failed"
        )));
    }
    Ok(())
}

fn start(
    lifecycle: &ServerLifecycle<'_>,
    runtime: &dyn ContainerRuntime,
    instance_name: &str,
) -> Result<()> {
    sinara_println!("Starting sinara server {}...", instance_name);
    let started = lifecycle.start(instance_name)?;
    let platform = lifecycle.server_platform(&started)?;
    let server_urls = urls::clickable_urls(runtime, &started)?;

    sinara_success!("Sinara server {} started, platform: {}", started, platform);
    sinara_println!("To access the server, copy and paste one of these URLs in a browser:");
    for url in &server_urls {
        sinara_println!("  {}", url.white());
    }
    sinara_println!(
        "If the server is not accessible, find your machine's public IP address manually"
    );
    Ok(())
}

fn stop(lifecycle: &ServerLifecycle<'_>, instance_name: &str) -> Result<()> {
    let stopped = lifecycle.stop(instance_name)?;
    sinara_success!("Sinara server {} stopped", stopped);
    Ok(())
}

fn remove(lifecycle: &ServerLifecycle<'_>, instance_name: &str, with_volumes: bool) -> Result<()> {
    if let RemoveOutcome::Removed { trashed_config } =
        lifecycle.remove(instance_name, with_volumes)?
    {
        sinara_success!("Sinara server {} removed", instance_name);
        if let Some(config_path) = trashed_config {
            sinara_println!(
                "To create it again use command:\nsinara server create --fromConfig {}",
                config_path.display()
            );
        }
    }
    Ok(())
}

fn update(
    lifecycle: &ServerLifecycle<'_>,
    image: Option<ServerType>,
    experimental: bool,
) -> Result<()> {
    let server_type = match image {
        Some(server_type) => server_type,
        None => TerminalPrompt.select_server_type()?,
    };
    let pulled = lifecycle.update(server_type, experimental)?;
    sinara_success!("Sinara server image {} updated successfully", pulled);
    Ok(())
}

/// Server type of a trashed record, guessed from the image for records
/// saved before the type label existed.
fn record_server_type(record: &ServerRecord) -> String {
    if let Some(server_type) = record
        .container
        .labels
        .get(sinara_provider::server::SERVER_TYPE_LABEL)
    {
        if !server_type.is_empty() {
            return server_type.clone();
        }
    }
    if record.container.image.contains("notebook") {
        "ml".to_string()
    } else {
        "cv".to_string()
    }
}

fn list(
    lifecycle: &ServerLifecycle<'_>,
    runtime: &dyn ContainerRuntime,
    hide_removed: bool,
) -> Result<()> {
    sinara_println!("Gathering servers info...");

    sinara_println!(
        "{}",
        "\nSinara servers:\n-------------------------------------".magenta()
    );
    for summary in lifecycle.running_servers()? {
        let server_type = sinara_provider::server::server_type_or_guess(&summary);
        sinara_println!(
            "\n{}: {}\n{}: {}\n{}: {}\n{}: {}",
            "Server".cyan(),
            summary.name.white(),
            "Image".cyan(),
            summary.image.white(),
            "Type".cyan(),
            server_type.white(),
            "Status".cyan(),
            summary.status.white()
        );
        if summary.is_running() {
            match urls::clickable_urls(runtime, &summary.name) {
                Ok(server_urls) => {
                    sinara_println!("{}: {}", "Urls".cyan(), server_urls.join(", ").white());
                }
                Err(e) => {
                    sinara_warning!("Cannot resolve urls of server {}: {}", summary.name, e);
                }
            }
        }
    }

    if hide_removed {
        return Ok(());
    }

    sinara_println!(
        "{}",
        "\nSinara removed servers:\n-------------------------------------".magenta()
    );
    let global = GlobalConfigStore::new()?;
    for (trash_key, path) in global.trashed_servers()? {
        let record = match GlobalConfigStore::load_record(&path) {
            Ok(record) => record,
            Err(_) => {
                sinara_warning!(
                    "Server config at {} cannot be read, skipping",
                    path.display()
                );
                continue;
            }
        };

        let removal_time = GlobalConfigStore::removal_time(&trash_key)
            .map(|t| t.format("%d.%m.%Y %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        sinara_println!(
            "\n{}: {}\n{}: {}\n{}: {}\n{}: {}\n{}: {}\n{}:\nsinara server create --fromConfig {}",
            "Server".cyan(),
            record.container.name.white(),
            "Image".cyan(),
            record.container.image.white(),
            "Type".cyan(),
            record_server_type(&record).white(),
            "Status".cyan(),
            "removed".white(),
            "Removed at".cyan(),
            removal_time.white(),
            "To create it again use command".cyan(),
            path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sinara_config::{ContainerSpec, MountSpec};
    use std::collections::BTreeMap;

    fn record_with(image: &str, labels: BTreeMap<String, String>) -> ServerRecord {
        ServerRecord::new(
            ServerCmd {
                script: "sinara".to_string(),
                args: String::new(),
                calculated_args: String::new(),
            },
            ContainerSpec {
                image: image.to_string(),
                versioned_image: image.to_string(),
                command: String::new(),
                working_dir: "/home/jovyan/work".to_string(),
                name: "desk".to_string(),
                mem_limit_bytes: 0,
                cpu_limit: 1,
                shm_size_bytes: 0,
                gpu_enabled: false,
                ports: BTreeMap::new(),
                mounts: vec![MountSpec::volume("jovyan-data-desk", "/data")],
                environment: BTreeMap::new(),
                labels,
            },
        )
    }

    #[test]
    fn test_record_server_type_prefers_label() {
        let labels = BTreeMap::from([(
            sinara_provider::server::SERVER_TYPE_LABEL.to_string(),
            "cv".to_string(),
        )]);
        let record = record_with("buslovaev/sinara-notebook", labels);
        assert_eq!(record_server_type(&record), "cv");
    }

    #[test]
    fn test_record_server_type_guesses_from_image() {
        let record = record_with("buslovaev/sinara-notebook", BTreeMap::new());
        assert_eq!(record_server_type(&record), "ml");
        let record = record_with("buslovaev/sinara-cv", BTreeMap::new());
        assert_eq!(record_server_type(&record), "cv");
    }
}
