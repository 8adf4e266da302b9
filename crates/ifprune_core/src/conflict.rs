use crate::engine::Engine;
use crate::eval::LineType;
use crate::settings::ConflictPolicy;
use crate::status::{EngineError, StatusFlags};

/// A deferred diagnosis for an `#undef` that contradicts a `-D`
/// assumption. At most one is ever live: it is either annulled by an
/// immediately following matching `#define`, or discharged by the next
/// significant line.
#[derive(Debug)]
pub struct PendingConflict {
    /// Symbol-table index of the contradicted symbol.
    pub(crate) sym: usize,
    stderr_text: String,
    /// Replacement text for the output, absent under the delete policy.
    insert_text: Option<String>,
    /// Whether warnings had already accrued when this was saved, so a
    /// provisional warning can be rolled back on annulment.
    had_warnings: bool,
}

impl Engine<'_> {
    /// Despatch a categorical `#define`/`#undef` classification.
    /// Returns false when the line type is not categorical and belongs
    /// to the if-state machine instead.
    pub(crate) fn weed_categorical(&mut self, line_type: LineType) -> Result<bool, EngineError> {
        match line_type {
            LineType::ConsistentDefineKeep | LineType::ConsistentUndefKeep => self.print()?,
            LineType::ConsistentDefineDrop | LineType::ConsistentUndefDrop => self.drop_line()?,
            LineType::ContradictoryDefine => self.insert_conflict("contradicts -U")?,
            LineType::DifferingDefine => self.insert_conflict("differently redefines -D")?,
            // Deferred: the diagnosis was saved by the evaluator and may
            // yet be annulled.
            LineType::ContradictoryUndef => self.drop_line()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn compose_conflict(&mut self, sym: usize, complaint: &str) -> PendingConflict {
        let text = if self.line.extension_lines > 0 {
            self.line.flattened()
        } else {
            self.line.display()
        };
        let stderr_text = format!(
            "{}({}): \"{}\" {}",
            self.source.name, self.line.line_num, text, complaint
        );
        let prefix = match self.settings.conflict_policy {
            ConflictPolicy::Delete => None,
            ConflictPolicy::Comment => Some("//"),
            ConflictPolicy::Error => Some("#"),
        };
        let insert_text = prefix.map(|prefix| {
            format!(
                "{}error : inserted by ifprune: \"{}\" {} at {}({})\n",
                prefix, text, complaint, self.source.name, self.line.line_num
            )
        });
        let had_warnings = self.status.contains(StatusFlags::WARNING);
        self.status |= StatusFlags::WARNING;
        PendingConflict {
            sym,
            stderr_text,
            insert_text,
            had_warnings,
        }
    }

    /// Save the diagnosis for a contradictory `#undef` of symbol `sym`
    /// without emitting anything yet.
    pub(crate) fn save_conflict(&mut self, sym: usize) {
        debug_assert!(self.conflict.is_none());
        let pending = self.compose_conflict(sym, "contradicts -D");
        self.conflict = Some(pending);
    }

    /// Diagnose a conflicting `#define` in place of the current line.
    fn insert_conflict(&mut self, complaint: &str) -> Result<(), EngineError> {
        let pending = self.compose_conflict(0, complaint);
        self.discharge_conflict(pending)
    }

    fn discharge_conflict(&mut self, pending: PendingConflict) -> Result<(), EngineError> {
        log::warn!("{}", pending.stderr_text);
        match pending.insert_text {
            Some(text) => {
                self.substitute(&text)?;
                if self.settings.conflict_policy == ConflictPolicy::Error {
                    self.status |= StatusFlags::ERRORED_LINES;
                    if self.ifctl.is_unconditional() {
                        self.status |= StatusFlags::ERROR_OUTPUT;
                        log::warn!(
                            "{}: An unconditional #error directive was output",
                            self.source.name
                        );
                    }
                }
            }
            None => {
                self.despatch.lines_dropped += 1;
            }
        }
        Ok(())
    }

    /// Emit any pending contradiction. Called on reaching a line that
    /// cannot annul it, and at end of file.
    pub(crate) fn flush_conflict(&mut self) -> Result<(), EngineError> {
        if let Some(pending) = self.conflict.take() {
            // The offending #undef was counted as dropped when it was
            // read; the inserted diagnostic takes its place.
            self.despatch.lines_dropped = self.despatch.lines_dropped.saturating_sub(1);
            self.discharge_conflict(pending)?;
        }
        Ok(())
    }

    /// Annul a pending contradiction: a matching `#define` followed the
    /// `#undef`, so the pair was precautionary.
    pub(crate) fn forget_conflict(&mut self) {
        if let Some(pending) = self.conflict.take() {
            if !pending.had_warnings {
                self.status.remove(StatusFlags::WARNING);
            }
        }
    }
}
