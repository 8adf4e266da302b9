use std::io::Write;

use crate::edit::{is_mark, Simplification};
use crate::engine::Engine;
use crate::settings::DiscardPolicy;
use crate::status::EngineError;

/// Prefix for dropped lines kept under the comment discard policy.
pub const DISCARD_COMMENT_PREFIX: &str = "//ifprune < ";

/// Output-side bookkeeping for one file.
#[derive(Debug, Default)]
pub struct Despatch {
    pub lines_dropped: usize,
    pub lines_changed: usize,
    /// Length of the current run of consecutively dropped lines.
    drop_run: usize,
    /// Suppress all line output, for symbol-listing mode.
    listing: bool,
}

impl Despatch {
    pub fn new(listing: bool) -> Self {
        Self {
            listing,
            ..Self::default()
        }
    }
}

pub(crate) fn write_out(out: &mut dyn Write, file: &str, bytes: &[u8]) -> Result<(), EngineError> {
    out.write_all(bytes).map_err(|source| EngineError::Io {
        file: file.to_string(),
        source,
    })
}

/// Render a line buffer dropping marked bytes. A single space is
/// inserted where a deletion would otherwise join two tokens.
pub(crate) fn prune_marks(buf: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::with_capacity(buf.len());
    let mut pos = 0;
    while pos < buf.len() {
        if is_mark(buf[pos]) {
            let joins_left = out.last().is_some_and(|b| !b.is_ascii_whitespace());
            while pos < buf.len() && is_mark(buf[pos]) {
                pos += 1;
            }
            let joins_right = pos < buf.len() && !buf[pos].is_ascii_whitespace();
            if joins_left && joins_right {
                out.push(b' ');
            }
        } else {
            out.push(buf[pos]);
            pos += 1;
        }
    }
    out
}

impl Engine<'_> {
    /// Emit the current line as a kept directive.
    pub(crate) fn print(&mut self) -> Result<(), EngineError> {
        self.print_impl(false)
    }

    /// Emit the current line as kept plain text, subject to the
    /// complement option.
    pub(crate) fn print_plain(&mut self) -> Result<(), EngineError> {
        self.print_impl(true)
    }

    fn print_impl(&mut self, complementable: bool) -> Result<(), EngineError> {
        if self.settings.line_directives {
            if self.despatch.drop_run > 0 {
                let directive = format!("#line {}\n", self.line.start_line_num());
                if !self.despatch.listing {
                    write_out(&mut *self.out, &self.source.name, directive.as_bytes())?;
                }
                self.despatch.lines_dropped = self.despatch.lines_dropped.saturating_sub(1);
                self.despatch.lines_changed += 1;
            }
            self.despatch.drop_run = 0;
        }
        self.flush(true, complementable)
    }

    /// Discard the current line as a directive.
    pub(crate) fn drop_line(&mut self) -> Result<(), EngineError> {
        self.drop_impl(false)
    }

    /// Discard the current line as plain text, subject to the
    /// complement option.
    pub(crate) fn drop_plain(&mut self) -> Result<(), EngineError> {
        self.drop_impl(true)
    }

    fn drop_impl(&mut self, complementable: bool) -> Result<(), EngineError> {
        self.flush(false, complementable)?;
        if self.settings.line_directives {
            self.despatch.drop_run += 1;
        }
        Ok(())
    }

    /// Write `text` in place of the current line.
    pub(crate) fn substitute(&mut self, text: &str) -> Result<(), EngineError> {
        if self.despatch.listing {
            return Ok(());
        }
        write_out(&mut *self.out, &self.source.name, text.as_bytes())?;
        self.despatch.lines_changed += 1;
        Ok(())
    }

    fn flush(&mut self, keep: bool, complementable: bool) -> Result<(), EngineError> {
        if self.despatch.listing {
            return Ok(());
        }
        let keep = if complementable {
            keep != self.settings.complement
        } else {
            keep
        };
        if keep {
            return self.emit_kept();
        }
        match self.settings.discard_policy {
            DiscardPolicy::Blank => {
                self.despatch.lines_changed += 1;
                let blanks = vec![b'\n'; 1 + self.line.extension_lines];
                write_out(&mut *self.out, &self.source.name, &blanks)
            }
            DiscardPolicy::Drop => {
                self.despatch.lines_dropped += 1 + self.line.extension_lines;
                Ok(())
            }
            DiscardPolicy::Comment => {
                self.despatch.lines_changed += 1;
                write_out(
                    &mut *self.out,
                    &self.source.name,
                    DISCARD_COMMENT_PREFIX.as_bytes(),
                )?;
                write_out(&mut *self.out, &self.source.name, &self.line.buf)
            }
        }
    }

    fn emit_kept(&mut self) -> Result<(), EngineError> {
        if self.edit.simplification.is_empty() {
            return write_out(&mut *self.out, &self.source.name, &self.line.buf);
        }
        if self.edit.simplification.contains(Simplification::OPS_CUT) {
            self.despatch.lines_changed += 1;
            let pruned = prune_marks(&self.line.buf);
            return write_out(&mut *self.out, &self.source.name, &pruned);
        }
        // Only parentheses were marked; the line was not materially
        // simplified, so put them back.
        self.restore_parens();
        write_out(&mut *self.out, &self.source.name, &self.line.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pruned(input: &[u8]) -> String {
        String::from_utf8(prune_marks(input)).unwrap()
    }

    #[test]
    fn unmarked_text_is_unchanged() {
        assert_eq!(pruned(b"#if A && B\n"), "#if A && B\n");
    }

    #[test]
    fn marked_run_is_removed() {
        assert_eq!(pruned(b"#if \x01\x01\x01 B\n"), "#if  B\n");
    }

    #[test]
    fn a_space_is_inserted_between_joined_tokens() {
        assert_eq!(pruned(b"#if A\x01\x01B\n"), "#if A B\n");
    }

    #[test]
    fn no_space_next_to_existing_whitespace() {
        assert_eq!(pruned(b"#if A\x01\x01 B\n"), "#if A B\n");
        assert_eq!(pruned(b"#if A \x01\x01B\n"), "#if A B\n");
    }

    #[test]
    fn paren_marks_are_removed_too() {
        assert_eq!(pruned(b"#if \x02A\x03 \x01\x01\n"), "#if A \n");
    }
}
