//! Helpers used by all of the workspace's executables.
mod logging;

pub use logging::{init_logging, LogArgs, LogFormat, LogLevel};

/// A return type indicating that a function cannot return.
pub enum Never {}

/// Executes `run_fn` and exits the process with its outcome. Returning an
/// `Err` logs the error and exits with code `1`. A `run_fn` may also
/// return `Success::Exit` with a non-zero code, to opt out of the default
/// error handling.
pub fn run_cli_main<A, S, F>(args: A, run_fn: F) -> Never
where
    F: FnOnce(A) -> Result<S, anyhow::Error>,
    S: Into<Success>,
{
    match run_fn(args).map(Into::<Success>::into) {
        Ok(Success::Exit(code)) => std::process::exit(code),
        Err(error) => {
            tracing::error!(error = ?error, "execution failed");
            std::process::exit(1);
        }
    }
}

/// Represents the successful execution of a program or subcommand.
#[derive(Debug, PartialEq)]
pub enum Success {
    /// Program should immediately exit with the given code.
    Exit(i32),
}

impl From<()> for Success {
    fn from(_: ()) -> Self {
        Success::Exit(0)
    }
}

impl From<i32> for Success {
    fn from(code: i32) -> Self {
        Success::Exit(code)
    }
}
