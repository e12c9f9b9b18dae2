pub mod error;
pub mod fs;
pub mod output_macros;
pub mod system;

// Re-export host resource detection for convenience
pub use system::{cpu_core_count, total_memory_bytes};

/// CLI version baked in at compile time, stored in container labels and
/// configuration records.
pub fn cli_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
