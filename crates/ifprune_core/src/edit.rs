use std::ops::Range;

use bitflags::bitflags;

use crate::engine::Engine;
use crate::status::EngineError;
use crate::symbols::symchar;

/// Sentinel written over bytes cut from the line.
pub(crate) const MARK_DELETED: u8 = 0x01;
/// Sentinel for a provisionally deleted `(`.
pub(crate) const MARK_LPAREN: u8 = 0x02;
/// Sentinel for a provisionally deleted `)`.
pub(crate) const MARK_RPAREN: u8 = 0x03;

pub(crate) fn is_mark(byte: u8) -> bool {
    matches!(byte, MARK_DELETED..=MARK_RPAREN)
}

bitflags! {
    /// How far the current line has been simplified.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Simplification: u8 {
        /// Superfluous parentheses were marked.
        const BRACKETS_PRUNED = 1;
        /// Operators or operands were cut.
        const OPS_CUT = 2;
    }
}

/// Rewriting state for the current line.
#[derive(Debug, Default)]
pub struct LineEdit {
    pub simplification: Simplification,
    /// Span of the directive keyword in the line buffer.
    pub keyword: Range<usize>,
}

impl Engine<'_> {
    /// Mark `[start, end)` as logically deleted. The trailing newline
    /// of the line is never deleted.
    pub(crate) fn cut_text(&mut self, start: usize, end: usize) {
        self.edit.simplification |= Simplification::OPS_CUT;
        for byte in &mut self.line.buf[start..end] {
            *byte = MARK_DELETED;
        }
        if end == self.line.buf.len() {
            self.line.buf[end - 1] = b'\n';
        }
    }

    /// Mark a matched pair of parentheses for deletion, provided that
    /// removing them cannot join two identifier characters.
    pub(crate) fn delete_paren(&mut self, lparen: usize, rparen: usize) {
        if self.line.at(lparen) != b'(' || self.line.at(rparen) != b')' {
            return;
        }
        let clear_of_symchars = |pos: usize| {
            pos == 0 || !symchar(self.line.at(pos - 1)) || !symchar(self.line.at(pos + 1))
        };
        if clear_of_symchars(lparen) && clear_of_symchars(rparen) {
            self.line.buf[lparen] = MARK_LPAREN;
            self.line.buf[rparen] = MARK_RPAREN;
            self.edit.simplification |= Simplification::BRACKETS_PRUNED;
        }
    }

    /// Undo provisional parenthesis deletion, when pruning turned out
    /// not to simplify the line.
    pub(crate) fn restore_parens(&mut self) {
        for byte in &mut self.line.buf {
            if *byte == MARK_LPAREN {
                *byte = b'(';
            } else if *byte == MARK_RPAREN {
                *byte = b')';
            }
        }
    }

    /// Replace the directive keyword and everything after it. Used to
    /// rewrite e.g. `#elif ...` as `#else` once the remainder of the
    /// block is resolved.
    pub(crate) fn keyword_edit(&mut self, replacement: &[u8]) -> Result<(), EngineError> {
        let start = self.edit.keyword.start;
        self.line.buf.truncate(start);
        self.line.buf.extend_from_slice(replacement);
        self.despatch.lines_changed += 1;
        self.print()
    }
}
