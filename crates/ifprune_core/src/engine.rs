use std::io::{BufRead, Write};

use crate::chew::Chewer;
use crate::conflict::PendingConflict;
use crate::despatch::Despatch;
use crate::edit::LineEdit;
use crate::eval::LineType;
use crate::ifstate::IfControl;
use crate::settings::Settings;
use crate::source::{Source, SourceLine};
use crate::status::{EngineError, StatusFlags};
use crate::symbols::SymbolTable;

/// Per-file processing state. Construct one per input file and drive it
/// with [`run`](Engine::run).
pub struct Engine<'a> {
    pub(crate) settings: &'a Settings,
    pub(crate) symbols: &'a mut SymbolTable,
    pub(crate) source: Source<'a>,
    pub(crate) out: &'a mut dyn Write,
    pub(crate) line: SourceLine,
    pub(crate) chew: Chewer,
    pub(crate) edit: LineEdit,
    pub(crate) ifctl: IfControl,
    pub(crate) despatch: Despatch,
    pub(crate) conflict: Option<PendingConflict>,
    pub(crate) status: StatusFlags,
    /// Set while evaluating the replacement text of a symbol rather
    /// than input source.
    pub(crate) parsing_sym_def: bool,
}

impl<'a> Engine<'a> {
    pub fn new(
        settings: &'a Settings,
        symbols: &'a mut SymbolTable,
        reader: Box<dyn BufRead + 'a>,
        filename: &str,
        out: &'a mut dyn Write,
    ) -> Self {
        let listing = settings.symbols.is_some();
        Self {
            settings,
            symbols,
            source: Source::new(filename, reader),
            out,
            line: SourceLine::default(),
            chew: Chewer::default(),
            edit: LineEdit::default(),
            ifctl: IfControl::new(),
            despatch: Despatch::new(listing),
            conflict: None,
            status: StatusFlags::empty(),
            parsing_sym_def: false,
        }
    }

    /// Process the whole file, writing the transformed text to the
    /// output. Returns the accumulated status on success; on error the
    /// output is incomplete and must be discarded.
    pub fn run(&mut self) -> Result<StatusFlags, EngineError> {
        loop {
            let line_type = self.eval_line()?;
            if !self.weed_categorical(line_type)? {
                self.transition(line_type)?;
            }
            if line_type == LineType::Eof {
                break;
            }
        }
        if self.despatch.lines_dropped > 0 {
            self.status |= StatusFlags::INFO | StatusFlags::DROPPED_LINES;
        }
        if self.despatch.lines_changed > 0 {
            self.status |= StatusFlags::INFO | StatusFlags::CHANGED_LINES;
        }
        Ok(self.status)
    }

    pub fn lines_dropped(&self) -> usize {
        self.despatch.lines_dropped
    }

    pub fn lines_changed(&self) -> usize {
        self.despatch.lines_changed
    }

    /// Read one more physical line onto the end of the buffer. False at
    /// end of input.
    fn read_physical(&mut self) -> Result<bool, EngineError> {
        let appended = match self.source.read_physical(&mut self.line.buf) {
            Ok(appended) => appended,
            Err(source) => {
                return Err(EngineError::Io {
                    file: self.source.name.clone(),
                    source,
                });
            }
        };
        if appended == 0 {
            return Ok(false);
        }
        self.line.line_num += 1;
        if !self.line.buf.ends_with(b"\n") {
            return Err(self.parse_error("Missing newline at EOF"));
        }
        Ok(true)
    }

    /// Start a fresh logical line. False at end of input.
    pub(crate) fn get_line(&mut self) -> Result<bool, EngineError> {
        self.line.begin();
        self.read_physical()
    }

    /// Extend the current logical line across a newline found inside a
    /// line continuation or C comment.
    pub(crate) fn extend_line(&mut self) -> Result<(), EngineError> {
        if !self.read_physical()? {
            return Err(self.parse_error("Unexpected EOF"));
        }
        self.line.extension_lines += 1;
        Ok(())
    }

    pub(crate) fn parse_error(&self, message: impl Into<String>) -> EngineError {
        EngineError::Parse {
            file: self.source.name.clone(),
            line: self.line.line_num,
            message: message.into(),
        }
    }

    /// Report a warning against the current line and record it in the
    /// exit status.
    pub(crate) fn warn_here(&mut self, message: impl AsRef<str>) {
        log::warn!(
            "{}({}): {}",
            self.source.name,
            self.line.line_num,
            message.as_ref()
        );
        self.status |= StatusFlags::WARNING;
    }
}
