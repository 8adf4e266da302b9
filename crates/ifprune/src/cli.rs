use std::path::PathBuf;

use clap::{ArgAction, Parser};
use ifprune_core::logging::LogLevel;
use ifprune_core::settings::{ConflictPolicy, DiscardPolicy, SymbolsPolicy};
use ifprune_core::Settings;

#[derive(Debug, Parser)]
#[command(
    author,
    name = "ifprune",
    version,
    about = "Simplify C/C++ preprocessor conditionals under -D/-U assumptions.",
    after_help = "The exit status is a bitfield: 1 info, 2 warnings, 4 errors, 8 aborted, \
                  16 lines dropped, 32 lines changed, 64 #error inserted, \
                  128 unconditional #error output."
)]
pub struct Cli {
    /// Files to process. Directories are searched when --recurse is
    /// given. With no files (or "-"), reads standard input.
    pub files: Vec<PathBuf>,

    /// Assume NAME is defined, optionally with a replacement value.
    #[arg(
        short = 'D',
        long = "define",
        value_name = "NAME[=VALUE]",
        action = ArgAction::Append
    )]
    pub define: Vec<String>,

    /// Assume NAME is undefined.
    #[arg(
        short = 'U',
        long = "undefine",
        value_name = "NAME",
        action = ArgAction::Append
    )]
    pub undefine: Vec<String>,

    /// How to treat a #define or #undef contradicting an assumption.
    #[arg(
        short = 'x',
        long,
        value_enum,
        default_value = "comment",
        value_name = "POLICY"
    )]
    pub conflict: ConflictPolicy,

    /// How dropped lines are materialised in the output.
    #[arg(
        short = 'k',
        long,
        value_enum,
        default_value = "drop",
        value_name = "POLICY"
    )]
    pub discard: DiscardPolicy,

    /// Keep the plain lines that would be dropped, and vice versa.
    #[arg(short = 'c', long)]
    pub complement: bool,

    /// Evaluate integer constants for truth when simplifying.
    #[arg(long)]
    pub eval_consts: bool,

    /// Allow integer constants to be eliminated from rewritten
    /// expressions.
    #[arg(long)]
    pub del_consts: bool,

    /// Emit #line directives to re-anchor line numbers after drops.
    #[arg(short = 'l', long)]
    pub line_directives: bool,

    /// Treat the input as plain text, without comment or quote parsing.
    #[arg(short = 'P', long)]
    pub plaintext: bool,

    /// After a parse error, leave the file alone and continue with the
    /// next one.
    #[arg(short = 'K', long)]
    pub keepgoing: bool,

    /// Rewrite the input files in place.
    #[arg(short = 'r', long)]
    pub replace: bool,

    /// With --replace, first rename each input to FILE<SUFFIX>.
    #[arg(short = 'B', long, value_name = "SUFFIX")]
    pub backup: Option<String>,

    /// Search directories named in FILES. Implies --replace.
    #[arg(short = 'R', long)]
    pub recurse: bool,

    /// With --recurse, only process files with these extensions.
    #[arg(
        short = 'F',
        long,
        value_name = "EXT1[,EXT2...]",
        value_delimiter = ','
    )]
    pub filter: Vec<String>,

    /// List the symbols of conditional directives instead of rewriting.
    #[arg(short = 's', long, value_enum, value_name = "POLICY")]
    pub symbols: Option<SymbolsPolicy>,

    #[clap(flatten)]
    log_level_args: LogLevelArgs,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from(&self.log_level_args)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            conflict_policy: self.conflict,
            discard_policy: self.discard,
            complement: self.complement,
            eval_consts: self.eval_consts,
            del_consts: self.del_consts,
            line_directives: self.line_directives,
            plaintext: self.plaintext,
            keepgoing: self.keepgoing,
            symbols: self.symbols,
        }
    }
}

#[derive(Debug, Default, Clone, clap::Args)]
pub struct LogLevelArgs {
    /// Report progress on each file processed.
    #[arg(
        short,
        long,
        global = true,
        group = "verbosity",
        help_heading = "Log levels"
    )]
    pub verbose: bool,
    /// Report errors, but no warnings.
    #[arg(
        short,
        long,
        global = true,
        group = "verbosity",
        help_heading = "Log levels"
    )]
    pub quiet: bool,
    /// Disable all logging (the exit status still reflects findings).
    #[arg(long, global = true, group = "verbosity", help_heading = "Log levels")]
    pub silent: bool,
}

impl From<&LogLevelArgs> for LogLevel {
    fn from(args: &LogLevelArgs) -> Self {
        if args.silent {
            Self::Silent
        } else if args.quiet {
            Self::Quiet
        } else if args.verbose {
            Self::Verbose
        } else {
            Self::Default
        }
    }
}
