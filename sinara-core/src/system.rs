//! Host resource introspection and default resource-limit policy.
//!
//! The policy functions are pure so the sizing rules can be tested without
//! touching the host; the `*_default` wrappers feed them live host values.

use sysinfo::System;

const HOST_MEMORY_RESERVE_BYTES: u64 = 2 * 1024 * 1024 * 1024;
const HOST_CPU_RESERVE_CORES: u32 = 1;
const SHM_HOST_MEMORY_FRACTION: u64 = 6;

/// Total physical memory of the host in bytes.
pub fn total_memory_bytes() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory()
}

/// Number of logical CPU cores on the host.
pub fn cpu_core_count() -> u32 {
    num_cpus::get() as u32
}

/// Host name as reported by the OS, used for the local-DNS access URL.
pub fn host_name() -> String {
    System::host_name().unwrap_or_else(|| "localhost".to_string())
}

/// Memory limit for a server container given the host memory.
///
/// Reserves 2 GiB for the host; when the host itself has 2 GiB or less,
/// the server gets 70% of whatever is there.
pub fn memory_limit_for(host_bytes: u64) -> u64 {
    if host_bytes <= HOST_MEMORY_RESERVE_BYTES {
        (host_bytes as f64 * 0.7) as u64
    } else {
        host_bytes - HOST_MEMORY_RESERVE_BYTES
    }
}

/// CPU core limit for a server container, keeping one core for the host.
pub fn cpu_limit_for(host_cores: u32) -> u32 {
    if host_cores <= HOST_CPU_RESERVE_CORES {
        1
    } else {
        host_cores - HOST_CPU_RESERVE_CORES
    }
}

/// Shared-memory size for a server container: a sixth of host memory.
pub fn shm_size_for(host_bytes: u64) -> u64 {
    host_bytes / SHM_HOST_MEMORY_FRACTION
}

pub fn default_memory_limit() -> u64 {
    memory_limit_for(total_memory_bytes())
}

pub fn default_cpu_limit() -> u32 {
    cpu_limit_for(cpu_core_count())
}

pub fn default_shm_size() -> u64 {
    shm_size_for(total_memory_bytes())
}
