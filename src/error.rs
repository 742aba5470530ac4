/*
 * Error type shared by the reconciliation engine, the image cache and the
 * Win32 control adapter. Every fallible operation returns `Result<T>`; the
 * engine never retries, so a `NativeOperationFailed` usually means a stale
 * handle or a destroyed control rather than a transient condition.
 */

use std::fmt;

#[derive(Debug)]
pub enum PlatformError {
    /// The referenced item is not realized in the control, or no item was given
    /// where a concrete one is required.
    InvalidItem(String),
    /// A native call returned its failure sentinel (zero handle, FALSE, ...).
    NativeOperationFailed(String),
    /// A window or control handle could not be resolved.
    InvalidHandle(String),
    /// Generic failure that does not map onto a native call.
    OperationFailed(String),
    #[cfg(target_os = "windows")]
    Win32(windows::core::Error),
}

impl PlatformError {
    pub(crate) fn invalid_item(context: &str) -> Self {
        PlatformError::InvalidItem(format!("invalid item ({context})"))
    }

    pub(crate) fn native_failed(operation: &str) -> Self {
        PlatformError::NativeOperationFailed(format!("{operation} failed"))
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::InvalidItem(msg) => write!(f, "Invalid item: {msg}"),
            PlatformError::NativeOperationFailed(msg) => {
                write!(f, "Native operation failed: {msg}")
            }
            PlatformError::InvalidHandle(msg) => write!(f, "Invalid handle: {msg}"),
            PlatformError::OperationFailed(msg) => write!(f, "Operation failed: {msg}"),
            #[cfg(target_os = "windows")]
            PlatformError::Win32(err) => write!(f, "Win32 error: {err}"),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(target_os = "windows")]
            PlatformError::Win32(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(target_os = "windows")]
impl From<windows::core::Error> for PlatformError {
    fn from(err: windows::core::Error) -> Self {
        PlatformError::Win32(err)
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
