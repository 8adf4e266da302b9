use crate::engine::Engine;
use crate::status::EngineError;
use crate::symbols::{sym_start, symchar};

/// Comment state of the scanner.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CommentState {
    #[default]
    None,
    /// Inside a `/* ... */` comment.
    C,
    /// Inside a `//` comment.
    Cxx,
    /// Seen `/` then a line continuation; the next byte decides the
    /// comment kind.
    Starting,
    /// Seen `*` then a line continuation inside a C comment; a `/`
    /// closes it.
    Finishing,
    /// Inside `#error` text or a `#define` body, where comment and
    /// quote parsing is suspended.
    Pseudo,
}

/// Where the scanner is within the current line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    /// Nothing significant seen yet.
    #[default]
    Neuter,
    /// A `#` introduced a directive.
    Directive,
    /// The line contains ordinary code.
    Code,
}

/// Lexical scanner state. Persists across lines within a file, so a
/// comment or quotation can span lines.
#[derive(Debug, Default)]
pub struct Chewer {
    pub comment_state: CommentState,
    pub line_state: LineState,
    pub last_comment_start_line: usize,
    pub last_quote_start_line: usize,
    escape: bool,
    in_double_quote: bool,
    in_single_quote: bool,
}

impl Chewer {
    pub fn in_quotation(&self) -> bool {
        self.in_single_quote || self.in_double_quote
    }
}

impl Engine<'_> {
    /// Advance `pos` past whitespace, comments and quoted literals,
    /// updating the scanner state. On return the position is either at
    /// the end of the logical line or at the first syntactically
    /// significant byte.
    pub(crate) fn chew_on(&mut self, mut pos: usize) -> Result<usize, EngineError> {
        if self.settings.plaintext {
            while self.line.at(pos).is_ascii_whitespace() && pos < self.line.len() {
                if self.line.is_eol(pos) {
                    self.chew.line_state = LineState::Neuter;
                }
                pos += 1;
            }
            return Ok(pos);
        }
        while pos < self.line.len() {
            let byte = self.line.at(pos);
            if byte == b'\\' {
                self.chew.escape = !self.chew.escape;
                pos += 1;
                continue;
            }
            if byte == b'"' {
                if !self.chew.escape && !self.chew.in_single_quote {
                    self.chew.in_double_quote = !self.chew.in_double_quote;
                    if self.chew.in_double_quote {
                        self.chew.last_quote_start_line = self.line.line_num;
                    }
                }
                pos += 1;
            } else if byte == b'\'' {
                if !self.chew.escape && !self.chew.in_double_quote {
                    self.chew.in_single_quote = !self.chew.in_single_quote;
                    if self.chew.in_single_quote {
                        self.chew.last_quote_start_line = self.line.line_num;
                    }
                }
                pos += 1;
            } else if self.line.is_eol(pos) {
                if self.chew.escape {
                    // Line continuation: absorb the next physical line.
                    self.extend_line()?;
                } else {
                    self.chew.line_state = LineState::Neuter;
                    match self.chew.comment_state {
                        CommentState::Cxx | CommentState::Pseudo => {
                            self.chew.comment_state = CommentState::None;
                            self.chew.in_double_quote = false;
                            self.chew.in_single_quote = false;
                        }
                        CommentState::C => {
                            self.chew.in_double_quote = false;
                            self.chew.in_single_quote = false;
                            self.extend_line()?;
                        }
                        _ => {
                            if self.chew.in_quotation() {
                                return Err(self.parse_error("Newline within quotation"));
                            }
                        }
                    }
                }
                if self.line.at(pos) == b'\r' {
                    pos += 1;
                }
                pos += 1;
            } else if byte == b' ' || byte == b'\t' {
                pos += 1;
            } else if matches!(
                self.chew.comment_state,
                CommentState::None | CommentState::Pseudo
            ) {
                if !self.chew.in_quotation() {
                    if self.line.starts_with_at(pos, b"/\\\r\n") {
                        self.chew.comment_state = CommentState::Starting;
                        self.chew.last_comment_start_line = self.line.line_num;
                        pos += 4;
                    } else if self.line.starts_with_at(pos, b"/\\\n") {
                        self.chew.comment_state = CommentState::Starting;
                        self.chew.last_comment_start_line = self.line.line_num;
                        pos += 3;
                    } else if byte == b'/' && self.line.at(pos + 1) == b'*' {
                        self.chew.comment_state = CommentState::C;
                        self.chew.last_comment_start_line = self.line.line_num;
                        pos += 2;
                    } else if byte == b'/' && self.line.at(pos + 1) == b'/' {
                        self.chew.comment_state = CommentState::Cxx;
                        self.chew.last_comment_start_line = self.line.line_num;
                        pos += 2;
                    } else if self.chew.comment_state == CommentState::Pseudo {
                        pos += 1;
                    } else {
                        // Significant byte; hand it back.
                        self.chew.escape = false;
                        break;
                    }
                } else {
                    pos += 1;
                }
            } else if self.chew.comment_state == CommentState::C {
                if self.line.starts_with_at(pos, b"*\\\r\n") {
                    self.chew.comment_state = CommentState::Finishing;
                    pos += 4;
                } else if self.line.starts_with_at(pos, b"*\\\n") {
                    self.chew.comment_state = CommentState::Finishing;
                    pos += 3;
                } else if byte == b'*' && self.line.at(pos + 1) == b'/' {
                    self.chew.comment_state = CommentState::None;
                    self.chew.in_double_quote = false;
                    self.chew.in_single_quote = false;
                    pos += 2;
                } else {
                    pos += 1;
                }
            } else if self.chew.comment_state == CommentState::Starting {
                if byte == b'*' {
                    self.chew.comment_state = CommentState::C;
                    pos += 1;
                } else if byte == b'/' {
                    self.chew.comment_state = CommentState::Cxx;
                    pos += 1;
                } else {
                    self.chew.comment_state = CommentState::None;
                    self.chew.line_state = LineState::Code;
                }
            } else if self.chew.comment_state == CommentState::Finishing {
                if byte == b'/' {
                    self.chew.comment_state = CommentState::None;
                    pos += 1;
                } else {
                    self.chew.comment_state = CommentState::C;
                }
            } else {
                pos += 1;
            }
            self.chew.escape = false;
        }
        Ok(pos)
    }

    /// Splice out a run of line continuations at `pos`, extending the
    /// logical line as needed. Identifiers and tokens may be split
    /// across physical lines this way.
    fn chew_continuation(&mut self, mut pos: usize) -> Result<usize, EngineError> {
        if self.line.at(pos) == b'\\' && self.line.is_eol(pos + 1) {
            let gap_start = pos;
            loop {
                self.extend_line()?;
                pos += 1;
                if self.line.at(pos) == b'\r' {
                    pos += 1;
                }
                if self.line.at(pos) == b'\n' {
                    pos += 1;
                }
                if !(self.line.at(pos) == b'\\' && self.line.is_eol(pos + 1)) {
                    break;
                }
            }
            self.line.buf.drain(gap_start..pos);
            pos = gap_start;
        }
        Ok(pos)
    }

    /// Advance past an identifier, splicing out any line continuations
    /// inside it. Returns `pos` unchanged if no identifier starts there.
    pub(crate) fn chew_sym(&mut self, mut pos: usize) -> Result<usize, EngineError> {
        if sym_start(self.line.at(pos)) {
            while symchar(self.line.at(pos)) {
                pos += 1;
                pos = self.chew_continuation(pos)?;
            }
        }
        Ok(pos)
    }

    /// Advance past a run of graphic characters.
    pub(crate) fn chew_str(&mut self, mut pos: usize) -> Result<usize, EngineError> {
        while self.line.at(pos).is_ascii_graphic() {
            pos += 1;
            pos = self.chew_continuation(pos)?;
        }
        Ok(pos)
    }
}
