//! `sinara volume ...` actions.

use std::collections::BTreeMap;
use std::path::Path;

use colored::Colorize;

use sinara_config::{GlobalConfigStore, MountKind};
use sinara_core::error::Result;
use sinara_core::fs::{folder_size, format_size};
use sinara_core::{sinara_println, sinara_warning};
use sinara_provider::server::PLATFORM_LABEL;
use sinara_provider::{ContainerRuntime, DockerRuntime, RuntimeMount};

use crate::cli::VolumeAction;

pub fn execute(action: VolumeAction) -> Result<()> {
    match action {
        VolumeAction::List { all } => list(all),
    }
}

/// One printed line of `volume list`.
#[derive(Debug, PartialEq)]
struct VolumeRow {
    name: String,
    used: String,
    kind: &'static str,
    /// Only reported for volumes of removed servers.
    exists: Option<bool>,
}

fn mount_kind_description(kind: MountKind) -> &'static str {
    match kind {
        MountKind::Volume => "docker volume",
        MountKind::Bind => "host folder",
    }
}

/// Rows for a live container's mounts; managed volume sizes come from
/// the runtime's usage report, bind sizes from walking the host folder.
fn active_rows(mounts: &[RuntimeMount], volume_sizes: &BTreeMap<String, Option<u64>>) -> Vec<VolumeRow> {
    mounts
        .iter()
        .map(|mount| {
            let used = match mount.kind {
                MountKind::Volume => volume_sizes
                    .get(&mount.source)
                    .and_then(|size| *size)
                    .map(format_size)
                    .unwrap_or_else(|| "N/A".to_string()),
                MountKind::Bind => format_size(folder_size(Path::new(&mount.source))),
            };
            VolumeRow {
                name: mount.source.clone(),
                used,
                kind: mount_kind_description(mount.kind),
                exists: None,
            }
        })
        .collect()
}

/// Rows for a removed server, from its saved record; everything may be
/// gone by now, so each row carries an existence verdict.
fn removed_rows(
    mounts: &[sinara_config::MountSpec],
    volume_sizes: &BTreeMap<String, Option<u64>>,
) -> Vec<VolumeRow> {
    mounts
        .iter()
        .map(|mount| match mount.kind {
            MountKind::Volume => {
                let known = volume_sizes.contains_key(&mount.source);
                let used = volume_sizes
                    .get(&mount.source)
                    .and_then(|size| *size)
                    .map(format_size)
                    .unwrap_or_else(|| "N/A".to_string());
                VolumeRow {
                    name: mount.source.clone(),
                    used,
                    kind: mount_kind_description(mount.kind),
                    exists: Some(known),
                }
            }
            MountKind::Bind => {
                let path = Path::new(&mount.source);
                let exists = path.exists();
                let used = if exists {
                    format_size(folder_size(path))
                } else {
                    "N/A".to_string()
                };
                VolumeRow {
                    name: mount.source.clone(),
                    used,
                    kind: mount_kind_description(mount.kind),
                    exists: Some(exists),
                }
            }
        })
        .collect()
}

fn print_server_rows(server: &str, rows: &[VolumeRow]) {
    sinara_println!("{} {}\n{}", "Server:".cyan(), server.white(), "Volumes:".cyan());
    sinara_println!("{:<45} {:>12}  {:<14} {}", "name", "used", "type", "exists");
    for row in rows {
        let exists = match row.exists {
            Some(true) => "yes",
            Some(false) => "no",
            None => "",
        };
        sinara_println!("{:<45} {:>12}  {:<14} {}", row.name, row.used, row.kind, exists);
    }
    sinara_println!("{}", "************************************".magenta());
}

fn list(all: bool) -> Result<()> {
    let runtime = DockerRuntime::new();
    runtime.ensure_available()?;

    let volume_sizes: BTreeMap<String, Option<u64>> = runtime
        .list_volumes()?
        .into_iter()
        .map(|v| (v.name, v.size_bytes))
        .collect();

    sinara_println!("{}", "Active Servers\n************************************".magenta());
    for summary in runtime.containers_with_label(PLATFORM_LABEL)? {
        let rows = active_rows(&runtime.container_mounts(&summary.name)?, &volume_sizes);
        print_server_rows(&summary.name, &rows);
    }

    if !all {
        return Ok(());
    }

    sinara_println!("{}", "Removed Servers\n************************************".magenta());
    let global = GlobalConfigStore::new()?;
    for (_, path) in global.trashed_servers()? {
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
        let rows = removed_rows(&record.container.mounts, &volume_sizes);
        print_server_rows(&record.container.name, &rows);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sinara_config::MountSpec;

    #[test]
    fn test_active_rows_resolve_volume_sizes() {
        let mounts = vec![RuntimeMount {
            kind: MountKind::Volume,
            source: "jovyan-data-desk".to_string(),
            destination: "/data".to_string(),
        }];
        let sizes = BTreeMap::from([("jovyan-data-desk".to_string(), Some(2048_u64))]);

        let rows = active_rows(&mounts, &sizes);
        assert_eq!(rows[0].name, "jovyan-data-desk");
        assert_eq!(rows[0].used, "2 KB");
        assert_eq!(rows[0].kind, "docker volume");
        assert_eq!(rows[0].exists, None);
    }

    #[test]
    fn test_removed_rows_report_missing_volumes() {
        let mounts = vec![
            MountSpec::volume("jovyan-data-gone", "/data"),
            MountSpec::bind("/no/such/folder", "/raw"),
        ];
        let rows = removed_rows(&mounts, &BTreeMap::new());

        assert_eq!(rows[0].exists, Some(false));
        assert_eq!(rows[0].used, "N/A");
        assert_eq!(rows[1].exists, Some(false));
        assert_eq!(rows[1].used, "N/A");
        assert_eq!(rows[1].kind, "host folder");
    }

    #[test]
    fn test_removed_rows_existing_volume_without_usage_data() {
        let mounts = vec![MountSpec::volume("jovyan-tmp-desk", "/tmp")];
        let sizes = BTreeMap::from([("jovyan-tmp-desk".to_string(), None)]);
        let rows = removed_rows(&mounts, &sizes);
        assert_eq!(rows[0].exists, Some(true));
        assert_eq!(rows[0].used, "N/A");
    }
}
