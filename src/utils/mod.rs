use std::{fmt::Display, path::Path};

pub(crate) mod io;

/// Program name used to prefix warnings and fatal diagnostics.
pub const PROGRAM: &str = "SRNA-core";

/// Exit-on-error surface for subcommand dispatch.
pub trait OrFail<T> {
    /// Unwraps the value or prints the error with `context` and exits
    /// non-zero.
    fn unwrap_or_die(self, context: &str) -> T;
}

impl<T, E: Display> OrFail<T> for Result<T, E> {
    fn unwrap_or_die(self, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                eprintln!("{PROGRAM} ERROR! {context}: {e}");
                std::process::exit(1);
            }
        }
    }
}

#[inline]
pub fn mkdir<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}
