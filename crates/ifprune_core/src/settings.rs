use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What to do with a `#define` or `#undef` that contradicts the
/// assumptions given on the command line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Remove the offending directive from the output.
    Delete,
    /// Replace it with a `//error : ...` comment.
    #[default]
    Comment,
    /// Replace it with an `#error` directive.
    Error,
}

/// How dropped lines are materialised in the output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscardPolicy {
    /// Dropped lines are removed entirely.
    #[default]
    Drop,
    /// Dropped lines are replaced by blank lines.
    Blank,
    /// Dropped lines are kept, commented out.
    Comment,
}

/// Symbol-listing mode. When active the evaluator only reports the
/// identifiers appearing in conditional directives and no rewriting
/// takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolsPolicy {
    /// List every occurrence.
    All,
    /// List only the first occurrence per file.
    First,
    /// List every occurrence with `file(line)` locations.
    AllLocate,
    /// List first occurrences with `file(line)` locations.
    FirstLocate,
}

impl SymbolsPolicy {
    pub fn first_only(self) -> bool {
        matches!(self, Self::First | Self::FirstLocate)
    }

    pub fn locate(self) -> bool {
        matches!(self, Self::AllLocate | Self::FirstLocate)
    }
}

/// Processing options, fixed for the lifetime of a run.
#[derive(Debug, Default, Clone)]
pub struct Settings {
    pub conflict_policy: ConflictPolicy,
    pub discard_policy: DiscardPolicy,
    /// Keep exactly the plain lines that would otherwise be dropped.
    /// Directive handling is unaffected.
    pub complement: bool,
    /// Evaluate integer literals for truth when simplifying.
    pub eval_consts: bool,
    /// Allow integer literals to be deleted from rewritten expressions.
    pub del_consts: bool,
    /// Emit `#line` directives after runs of dropped lines.
    pub line_directives: bool,
    /// Skip comment and quote parsing, treating input as plain text.
    pub plaintext: bool,
    /// Continue with the next file after a parse error.
    pub keepgoing: bool,
    pub symbols: Option<SymbolsPolicy>,
}
