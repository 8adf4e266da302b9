use crate::chew::CommentState;
use crate::engine::Engine;
use crate::eval::LineType;
use crate::status::EngineError;

/// Maximum depth of `#if` nesting, matching the minimum translation
/// limit of ISO/IEC 9899:1999 5.2.4.1.
pub const MAX_DEPTH: usize = 64;

/// State of the conditional machine at one nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfState {
    /// Not inside any `#if`.
    Outside,
    /// In the false prefix of an `#if` whose truth is still undecided.
    FalsePrefix,
    /// The `#if` chose true; later branches are dead.
    TruePrefix,
    /// The `#if` could not be resolved; passing the block through.
    PassMiddle,
    /// In a false `#elif` branch after a pass-through prefix.
    FalseMiddle,
    /// In a true `#elif` branch after a pass-through prefix.
    TrueMiddle,
    /// In the `#else` of a pass-through block.
    PassElse,
    /// In a dead `#else` branch.
    FalseElse,
    /// In a live `#else` branch.
    TrueElse,
    /// Everything to the closing `#endif` is dead.
    FalseTrailer,
}

/// What to do with the current line, selected by `(state, line type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Drop the directive and set a new state.
    Strue,
    Sfalse,
    Selse,
    /// Print the directive and set a new state; `Pendif` pops.
    Pelif,
    Pelse,
    Pendif,
    /// Drop the directive and set a new state; `Dendif` pops.
    Dfalse,
    Delif,
    Delse,
    Dendif,
    /// Push a frame, then apply the bracketed inner action.
    Fpass,
    Ftrue,
    Ffalse,
    Fdrop,
    /// Rewrite the directive keyword, then proceed.
    Mpass,
    Mtrue,
    Melif,
    Melse,
    /// Plain-line handling.
    Print,
    Drop,
    /// Terminal handling.
    DoneFile,
    EarlyEof,
    OrphanElif,
    OrphanElse,
    OrphanEndif,
}

use Action::*;

/// Transition table indexed by `[state][line type]`. Line-type columns:
/// If, True, False, Elif, ElTrue, ElFalse, Else, Endif, Plain, Eof.
pub(crate) const TRANSITIONS: [[Action; 10]; 10] = [
    // Outside
    [
        Fpass, Ftrue, Ffalse, OrphanElif, OrphanElif, OrphanElif, OrphanElse, OrphanEndif, Print,
        DoneFile,
    ],
    // FalsePrefix
    [
        Fdrop, Fdrop, Fdrop, Mpass, Strue, Sfalse, Selse, Dendif, Drop, EarlyEof,
    ],
    // TruePrefix
    [
        Fpass, Ftrue, Ffalse, Dfalse, Dfalse, Dfalse, Delse, Dendif, Print, EarlyEof,
    ],
    // PassMiddle
    [
        Fpass, Ftrue, Ffalse, Pelif, Mtrue, Delif, Pelse, Pendif, Print, EarlyEof,
    ],
    // FalseMiddle
    [
        Fdrop, Fdrop, Fdrop, Pelif, Mtrue, Delif, Pelse, Pendif, Drop, EarlyEof,
    ],
    // TrueMiddle
    [
        Fpass, Ftrue, Ffalse, Melif, Melif, Melif, Melse, Pendif, Print, EarlyEof,
    ],
    // PassElse
    [
        Fpass, Ftrue, Ffalse, OrphanElif, OrphanElif, OrphanElif, OrphanElse, Pendif, Print,
        EarlyEof,
    ],
    // FalseElse
    [
        Fdrop, Fdrop, Fdrop, OrphanElif, OrphanElif, OrphanElif, OrphanElse, Dendif, Drop,
        EarlyEof,
    ],
    // TrueElse
    [
        Fpass, Ftrue, Ffalse, OrphanElif, OrphanElif, OrphanElif, OrphanElse, Dendif, Print,
        EarlyEof,
    ],
    // FalseTrailer
    [
        Fdrop, Fdrop, Fdrop, Dfalse, Dfalse, Dfalse, Delse, Dendif, Drop, EarlyEof,
    ],
];

#[derive(Debug, Clone, Copy)]
struct Frame {
    state: IfState,
    start_line: usize,
}

/// The bounded stack of nested conditional states. The bottom frame is
/// a sentinel for the outside of any `#if`.
#[derive(Debug)]
pub struct IfControl {
    stack: Vec<Frame>,
}

impl Default for IfControl {
    fn default() -> Self {
        Self::new()
    }
}

impl IfControl {
    pub fn new() -> Self {
        Self {
            stack: vec![Frame {
                state: IfState::Outside,
                start_line: 0,
            }],
        }
    }

    pub fn state(&self) -> IfState {
        self.stack.last().unwrap().state
    }

    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Line on which the innermost open `#if` started.
    pub fn start_line(&self) -> usize {
        self.stack.last().unwrap().start_line
    }

    fn set_state(&mut self, state: IfState) {
        self.stack.last_mut().unwrap().state = state;
    }

    fn push(&mut self, start_line: usize) -> Result<(), ()> {
        if self.depth() + 1 >= MAX_DEPTH {
            return Err(());
        }
        self.stack.push(Frame {
            state: IfState::Outside,
            start_line,
        });
        Ok(())
    }

    fn pop(&mut self) {
        debug_assert!(self.depth() > 0);
        self.stack.pop();
    }

    /// True while the current branch is being discarded.
    pub fn dropping(&self) -> bool {
        matches!(
            self.state(),
            IfState::FalsePrefix | IfState::FalseMiddle | IfState::FalseElse | IfState::FalseTrailer
        )
    }

    /// True when the current line will appear unconditionally in the
    /// output.
    pub fn is_unconditional(&self) -> bool {
        matches!(
            self.state(),
            IfState::Outside | IfState::TruePrefix | IfState::TrueMiddle | IfState::TrueElse
        )
    }

    /// True when the current line was unconditional in the input too.
    pub fn was_unconditional(&self) -> bool {
        self.state() == IfState::Outside
    }
}

impl Engine<'_> {
    /// Apply the if-state transition for the classified line.
    pub(crate) fn transition(&mut self, line_type: LineType) -> Result<(), EngineError> {
        let state = self.ifctl.state();
        let action = TRANSITIONS[state as usize][line_type.table_index()];
        self.apply(action)
    }

    fn nest(&mut self) -> Result<(), EngineError> {
        self.ifctl
            .push(self.line.line_num)
            .map_err(|()| self.parse_error("Too many levels of nesting"))
    }

    fn apply(&mut self, action: Action) -> Result<(), EngineError> {
        match action {
            Strue => {
                self.drop_line()?;
                self.ifctl.set_state(IfState::TruePrefix);
            }
            Sfalse => {
                self.drop_line()?;
                self.ifctl.set_state(IfState::FalsePrefix);
            }
            Selse => {
                self.drop_line()?;
                self.ifctl.set_state(IfState::TrueElse);
            }
            Pelif => {
                self.print()?;
                self.ifctl.set_state(IfState::PassMiddle);
            }
            Pelse => {
                self.print()?;
                self.ifctl.set_state(IfState::PassElse);
            }
            Pendif => {
                self.print()?;
                self.ifctl.pop();
            }
            Dfalse => {
                self.drop_line()?;
                self.ifctl.set_state(IfState::FalseTrailer);
            }
            Delif => {
                self.drop_line()?;
                self.ifctl.set_state(IfState::FalseMiddle);
            }
            Delse => {
                self.drop_line()?;
                self.ifctl.set_state(IfState::FalseElse);
            }
            Dendif => {
                self.drop_line()?;
                self.ifctl.pop();
            }
            Fpass => {
                self.nest()?;
                self.apply(Pelif)?;
            }
            Ftrue => {
                self.nest()?;
                self.apply(Strue)?;
            }
            Ffalse => {
                self.nest()?;
                self.apply(Sfalse)?;
            }
            Fdrop => {
                self.nest()?;
                self.apply(Dfalse)?;
            }
            Mpass => {
                // Overwrite `elif` in place with `if`, padded to length.
                let keyword = self.edit.keyword.clone();
                self.line.buf[keyword.start..keyword.start + 4].copy_from_slice(b"if  ");
                self.apply(Pelif)?;
            }
            Mtrue => {
                self.keyword_edit(b"else\n")?;
                self.ifctl.set_state(IfState::TrueMiddle);
            }
            Melif => {
                self.keyword_edit(b"endif\n")?;
                self.ifctl.set_state(IfState::FalseTrailer);
            }
            Melse => {
                self.keyword_edit(b"endif\n")?;
                self.ifctl.set_state(IfState::FalseElse);
            }
            Print => self.print_plain()?,
            Drop => self.drop_plain()?,
            DoneFile => self.done_file()?,
            EarlyEof => return Err(self.parse_error("Unexpected EOF")),
            OrphanElif => return Err(self.parse_error("Orphan #elif")),
            OrphanElse => return Err(self.parse_error("Orphan #else")),
            OrphanEndif => return Err(self.parse_error("Orphan #endif")),
        }
        Ok(())
    }

    /// End-of-file checks for constructs left open.
    fn done_file(&mut self) -> Result<(), EngineError> {
        if self.chew.comment_state != CommentState::None {
            return Err(self.parse_error(format!(
                "EOF in comment, #error ... or #define ... commencing line {}",
                self.chew.last_comment_start_line
            )));
        }
        if self.chew.in_quotation() {
            return Err(self.parse_error(format!(
                "EOF in quotation commencing line {}",
                self.chew.last_quote_start_line
            )));
        }
        Ok(())
    }
}
