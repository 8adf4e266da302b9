use anyhow::Result;
use colored::Colorize;
use log::Level;

/// Logging verbosity, mapped from the `-v`/`-q`/`--silent` arguments.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// No output at all.
    Silent,
    /// Errors only.
    Quiet,
    /// Warnings and errors.
    #[default]
    Default,
    /// Progress messages as well.
    Verbose,
}

impl LogLevel {
    fn level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Silent => log::LevelFilter::Off,
            LogLevel::Quiet => log::LevelFilter::Error,
            LogLevel::Default => log::LevelFilter::Warn,
            LogLevel::Verbose => log::LevelFilter::Debug,
        }
    }
}

pub fn set_up_logging(level: LogLevel) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| match record.level() {
            Level::Error => out.finish(format_args!(
                "{}{} {}",
                "error".red().bold(),
                ":".bold(),
                message
            )),
            Level::Warn => out.finish(format_args!(
                "{}{} {}",
                "warning".yellow().bold(),
                ":".bold(),
                message
            )),
            level => out.finish(format_args!(
                "{}{} {}",
                level.to_string().to_lowercase().dimmed(),
                ":".dimmed(),
                message
            )),
        })
        .level(level.level_filter())
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
