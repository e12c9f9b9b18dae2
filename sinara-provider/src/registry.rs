//! Image version lookup against the Docker Hub registry API.

use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use sinara_core::error::Result;

const REGISTRY_HOST: &str = "hub.docker.com";
const DEFAULT_REPOSITORY: &str = "buslovaev";
const TAG_PAGE_SIZE: u32 = 50;
const FETCH_ATTEMPTS: u32 = 3;
const FETCH_RETRY_SECS: u64 = 3;

/// Resolves the concrete version tag for an image name.
///
/// Kept behind a trait so the lifecycle can be exercised without network
/// access.
pub trait VersionResolver {
    /// Latest published version tag for `image_name`, falling back to
    /// `"latest"` when the registry gives no better answer.
    fn latest_tag(&self, image_name: &str) -> Result<String>;
}

/// Docker Hub backed resolver.
#[derive(Debug, Clone)]
pub struct DockerHubResolver {
    repository: String,
}

impl Default for DockerHubResolver {
    fn default() -> Self {
        Self {
            repository: DEFAULT_REPOSITORY.to_string(),
        }
    }
}

impl DockerHubResolver {
    pub fn new(repository: &str) -> Self {
        Self {
            repository: repository.to_string(),
        }
    }

    /// One page fetch with bounded retries; `None` means the page stays
    /// unreachable and the caller degrades to whatever it has.
    fn fetch_page(url: &str) -> Option<Value> {
        let client = reqwest::blocking::Client::new();
        for attempt in 1..=FETCH_ATTEMPTS {
            match client.get(url).send().and_then(|r| r.error_for_status()) {
                Ok(response) => match response.json::<Value>() {
                    Ok(page) => return Some(page),
                    Err(e) => debug!(url, %e, "registry page is not valid JSON"),
                },
                Err(e) => debug!(url, attempt, %e, "registry fetch failed"),
            }
            if attempt < FETCH_ATTEMPTS {
                thread::sleep(Duration::from_secs(FETCH_RETRY_SECS));
            }
        }
        None
    }

    /// Among all tags sharing the digest of `latest`, pick the greatest
    /// non-`latest` name; that is the versioned alias of the latest image.
    fn versioned_alias_of_latest(items: &[Value]) -> Option<String> {
        let latest_digest = items
            .iter()
            .find(|item| item.get("digest").is_some() && item["name"] == "latest")?
            .get("digest")?
            .clone();

        let mut aliases: Vec<&str> = items
            .iter()
            .filter(|item| {
                item.get("digest") == Some(&latest_digest) && item["name"] != "latest"
            })
            .filter_map(|item| item["name"].as_str())
            .collect();
        aliases.sort_by_key(|name| std::cmp::Reverse(name.to_lowercase()));
        aliases.first().map(|name| name.to_string())
    }
}

impl VersionResolver for DockerHubResolver {
    fn latest_tag(&self, image_name: &str) -> Result<String> {
        let mut next_url = Some(format!(
            "https://{}/v2/repositories/{}/{}/tags?page=1&page_size={}",
            REGISTRY_HOST, self.repository, image_name, TAG_PAGE_SIZE
        ));

        let mut image_items: Vec<Value> = Vec::new();
        while let Some(url) = next_url.take() {
            let Some(page) = Self::fetch_page(&url) else {
                warn!(image_name, "cannot fetch image versions from the registry");
                break;
            };
            if let Some(results) = page.get("results").and_then(|r| r.as_array()) {
                image_items.extend(results.iter().cloned());
            }
            next_url = page
                .get("next")
                .and_then(|n| n.as_str())
                .map(str::to_string);
        }

        // Fall back to the floating tag when the registry has no version alias
        Ok(Self::versioned_alias_of_latest(&image_items).unwrap_or_else(|| "latest".to_string()))
    }
}
