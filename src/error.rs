//! Application error type.
//!
//! Every fallible operation returns `AppError`, which carries the process exit
//! code alongside the message:
//!
//! - `2` configuration or I/O (unreadable/malformed catalogs, bad arguments, exports)
//! - `3` no usable data
//! - `4` plus/minus grid alignment failure or another broken invariant

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    /// Prefix the message with extra context, keeping the exit code.
    pub fn context(self, prefix: impl std::fmt::Display) -> Self {
        Self {
            exit_code: self.exit_code,
            message: format!("{prefix}: {}", self.message),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
