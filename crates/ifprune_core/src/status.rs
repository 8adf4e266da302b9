use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Severity and event summary of a run, also the layout of the
    /// process exit code: severity in the low nibble, event summaries
    /// above it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u8 {
        const INFO = 1;
        const WARNING = 2;
        const ERROR = 4;
        const ABEND = 8;
        /// Lines were dropped from the output.
        const DROPPED_LINES = 16;
        /// Lines were changed on output.
        const CHANGED_LINES = 32;
        /// An `#error` directive was inserted in the output.
        const ERRORED_LINES = 64;
        /// An `#error` directive was output unconditionally.
        const ERROR_OUTPUT = 128;
    }
}

impl StatusFlags {
    pub fn exit_code(self) -> u8 {
        self.bits()
    }
}

/// Errors that abandon the current file.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{file}({line}): {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },
    #[error("{file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub fn is_abend(&self) -> bool {
        matches!(self, EngineError::Io { .. })
    }
}
