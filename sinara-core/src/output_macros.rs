//! User-facing output macros for the SinaraML CLI.
//!
//! Handled conditions (a server that is already gone, a volume that is
//! already present) are reported through these macros rather than raised,
//! so every crate prints in a consistent voice.

#[macro_export]
macro_rules! sinara_println {
    () => {
        println!();
    };
    ($($arg:tt)*) => {
        println!("{}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! sinara_error {
    ($($arg:tt)*) => {
        eprintln!("{}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! sinara_success {
    ($($arg:tt)*) => {
        eprintln!("✓ {}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! sinara_info {
    ($($arg:tt)*) => {
        eprintln!("ℹ {}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! sinara_warning {
    ($($arg:tt)*) => {
        eprintln!("⚠ {}", format!($($arg)*));
    }
}
