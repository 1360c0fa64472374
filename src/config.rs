//! Error-handling policy

use crate::Result;

/// What to do when a filter operation fails
///
/// `Return` hands the error back to the caller. `Abort` logs the error and
/// terminates the process, matching hosts that expect a failed filter call
/// never to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorPolicy {
    #[default]
    Return,
    Abort,
}

impl ErrorPolicy {
    /// Pass `result` through, or abort on error under [`ErrorPolicy::Abort`]
    pub fn apply<T>(self, result: Result<T>) -> Result<T> {
        match (self, result) {
            (ErrorPolicy::Abort, Err(err)) => {
                tracing::error!(error = %err, "bloom filter operation failed, aborting");
                std::process::abort()
            }
            (_, result) => result,
        }
    }

    pub(crate) fn to_raw(self) -> u8 {
        match self {
            ErrorPolicy::Return => 0,
            ErrorPolicy::Abort => 1,
        }
    }

    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ErrorPolicy::Return),
            1 => Some(ErrorPolicy::Abort),
            _ => None,
        }
    }
}
