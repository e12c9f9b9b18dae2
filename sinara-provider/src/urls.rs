//! Discovery of the running Jupyter URL and its access token.
//!
//! The server process prints its URL to the container logs in a format
//! that changed across Jupyter generations, so several listing commands
//! are probed in order.

use std::net::IpAddr;
use std::thread;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use sinara_core::error::Result;

use crate::ContainerRuntime;

/// Listing commands probed in order; newer Jupyter first.
const URL_COMMANDS: [&str; 3] = ["jupyter lab list", "jupyter server list", "jupyter notebook list"];

const REACHABILITY_ATTEMPTS: u32 = 30;
const REACHABILITY_INTERVAL_SECS: u64 = 1;

const PUBLIC_IP_SERVICE_URL: &str = "https://ipinfo.io/ip";
const PUBLIC_IP_ATTEMPTS: u32 = 2;

/// Placeholder printed when the machine's public address cannot be
/// determined; the user substitutes it by hand.
pub const PUBLIC_IP_PLACEHOLDER: &str = "{{vm_public_ip}}";

/// First URL the server advertises in its logs, if any.
pub fn discover_url(runtime: &dyn ContainerRuntime, instance_name: &str) -> Result<Option<String>> {
    let url_re = Regex::new(r"(http[^\s]+)")
        .map_err(|e| sinara_core::error::SinaraError::Internal(e.to_string()))?;
    for command in URL_COMMANDS {
        let output = runtime.exec(instance_name, command)?;
        // Jupyter writes the listing to stderr on older versions
        let lines = output.stderr.lines().chain(output.stdout.lines());
        for line in lines {
            if !line.contains("http://") && !line.contains("https://") {
                continue;
            }
            if let Some(m) = url_re.captures(line).and_then(|c| c.get(1)) {
                return Ok(Some(m.as_str().to_string()));
            }
        }
        debug!(command, "no server url in listing output");
    }
    Ok(None)
}

/// Scheme of a discovered URL, `http` or `https`.
pub fn protocol(server_url: &str) -> Option<&str> {
    let re = Regex::new(r"^(http:|https:)").ok()?;
    re.captures(server_url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches(':'))
}

/// Access token embedded in a discovered URL, absent on insecure
/// servers.
pub fn token(server_url: &str) -> Option<&str> {
    let re = Regex::new(r"token=([a-f0-9-][^\s]+)").ok()?;
    re.captures(server_url).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// A reachability failure the wait loop may treat as success: the
/// server answered, just with a certificate the host does not trust.
/// Rustls reports these as "invalid peer certificate"; older stacks
/// say "certificate verify failed".
pub fn is_ignorable_reachability_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("invalid peer certificate")
        || message.contains("certificate_verify_failed")
        || message.contains("certificate verify failed")
}

/// Block until `url` answers an HTTP request, for up to thirty seconds.
/// The server needs a moment after start before the token shows up in
/// its logs, so one extra second is always waited.
pub fn wait_for_reachable(url: &str) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(REACHABILITY_INTERVAL_SECS))
        .build()
        .map_err(|e| sinara_core::error::SinaraError::Network(e.to_string()))?;

    let mut last_error = None;
    for _ in 0..REACHABILITY_ATTEMPTS {
        match client.get(url).send() {
            Ok(_) => {
                thread::sleep(Duration::from_secs(REACHABILITY_INTERVAL_SECS));
                return Ok(());
            }
            Err(e) => {
                last_error = Some(e.to_string());
                thread::sleep(Duration::from_secs(REACHABILITY_INTERVAL_SECS));
            }
        }
    }
    match last_error {
        Some(message) if is_ignorable_reachability_error(&message) => Ok(()),
        Some(message) => Err(sinara_core::error::SinaraError::Network(message)),
        None => Ok(()),
    }
}

/// Public address of this machine, or the placeholder when the lookup
/// service is unreachable.
pub fn public_ip() -> String {
    for _ in 0..PUBLIC_IP_ATTEMPTS {
        let response = reqwest::blocking::get(PUBLIC_IP_SERVICE_URL)
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text());
        match response {
            Ok(body) => {
                let candidate = body.trim();
                if candidate.parse::<IpAddr>().is_ok() {
                    return candidate.to_string();
                }
                break;
            }
            Err(e) => {
                debug!(%e, "public ip lookup failed");
                thread::sleep(Duration::from_secs(1));
            }
        }
    }
    warn!("cannot determine the public ip address of this machine");
    PUBLIC_IP_PLACEHOLDER.to_string()
}

/// The three browser URLs of a running server: loopback, local DNS
/// name, and public address.
pub fn clickable_urls(runtime: &dyn ContainerRuntime, instance_name: &str) -> Result<Vec<String>> {
    let local_dns = sinara_core::system::host_name();
    let host_port = runtime
        .host_port_for(instance_name, sinara_ports::JUPYTER_UI_PORT)?
        .ok_or_else(|| {
            sinara_core::error::SinaraError::Runtime(format!(
                "server {instance_name} does not publish the notebook port"
            ))
        })?;

    let url = discover_url(runtime, instance_name)?.ok_or_else(|| {
        sinara_core::error::SinaraError::Runtime(format!(
            "server {instance_name} has not advertised its url yet"
        ))
    })?;
    let scheme = protocol(&url).unwrap_or("http");

    let alive_url = format!("{scheme}://{local_dns}:{host_port}");
    wait_for_reachable(&alive_url)?;

    let token_suffix = token(&url)
        .map(|t| format!("?token={t}"))
        .unwrap_or_default();

    Ok(vec![
        format!("{scheme}://127.0.0.1:{host_port}/{token_suffix}"),
        format!("{scheme}://{local_dns}:{host_port}/{token_suffix}"),
        format!("{scheme}://{}:{host_port}/{token_suffix}", public_ip()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRuntime;

    #[test]
    fn test_protocol_extraction() {
        assert_eq!(protocol("http://localhost:8888/?token=ab"), Some("http"));
        assert_eq!(protocol("https://host:8888/"), Some("https"));
        assert_eq!(protocol("ftp://host/"), None);
    }

    #[test]
    fn test_token_extraction() {
        assert_eq!(
            token("http://localhost:8888/?token=0a1b2c3d4e"),
            Some("0a1b2c3d4e")
        );
        assert_eq!(token("http://localhost:8888/"), None);
    }

    #[test]
    fn test_ignorable_reachability_errors() {
        assert!(is_ignorable_reachability_error(
            "error sending request for url (https://host:8888/): client error (Connect): \
             invalid peer certificate: UnknownIssuer"
        ));
        assert!(is_ignorable_reachability_error(
            "SSL: CERTIFICATE_VERIFY_FAILED while reading"
        ));
        assert!(!is_ignorable_reachability_error("connection refused"));
        assert!(!is_ignorable_reachability_error(
            "error sending request: connection refused"
        ));
    }

    #[test]
    fn test_discover_url_prefers_stderr_lines() {
        let runtime = MockRuntime::new();
        runtime.script_exec(
            "jupyter lab list",
            0,
            "http://localhost:9999/?token=from-stdout",
            "Currently running servers:\nhttp://localhost:8888/?token=deadbeef :: /home/jovyan/work",
        );
        let url = discover_url(&runtime, "desk").unwrap();
        assert_eq!(
            url.as_deref(),
            Some("http://localhost:8888/?token=deadbeef")
        );
    }

    #[test]
    fn test_discover_url_falls_through_listing_commands() {
        let runtime = MockRuntime::new();
        runtime.script_exec("jupyter lab list", 1, "", "");
        runtime.script_exec("jupyter server list", 0, "", "");
        runtime.script_exec(
            "jupyter notebook list",
            0,
            "http://0.0.0.0:8888/?token=cafe",
            "",
        );
        let url = discover_url(&runtime, "desk").unwrap();
        assert_eq!(url.as_deref(), Some("http://0.0.0.0:8888/?token=cafe"));
    }

    #[test]
    fn test_discover_url_none_when_nothing_advertised() {
        let runtime = MockRuntime::new();
        assert_eq!(discover_url(&runtime, "desk").unwrap(), None);
    }
}
