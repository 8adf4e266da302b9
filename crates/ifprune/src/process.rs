use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Result};
use ifprune_core::{Engine, EngineError, Settings, StatusFlags, SymbolTable};
use log::{error, info};

use crate::cli::Cli;
use crate::fs::resolve_input_files;

/// Process every input, accumulating the status bitfield that becomes
/// the exit code.
pub fn process(args: Cli) -> Result<ExitCode> {
    let settings = args.settings();
    let mut symbols = SymbolTable::new();
    for define in &args.define {
        symbols.assume_defined(define)?;
    }
    for undefine in &args.undefine {
        symbols.assume_undefined(undefine)?;
    }

    // Listing symbols writes a report, never rewritten files.
    let replace = (args.replace || args.recurse) && settings.symbols.is_none();
    if args.backup.is_some() && !replace {
        bail!("--backup is only meaningful with --replace or --recurse");
    }
    let files = resolve_input_files(&args.files, args.recurse, &args.filter)?;
    let use_stdin = files.is_empty() || (files.len() == 1 && files[0].as_os_str() == "-");

    let mut status = StatusFlags::empty();
    if use_stdin {
        if replace {
            bail!("Cannot replace standard input");
        }
        match process_stdin(&settings, &mut symbols) {
            Ok(flags) => status |= flags,
            Err(err) => {
                error!("{err}");
                status |= error_flags(&err);
            }
        }
    } else {
        for file in &files {
            info!("Processing file {}", file.display());
            let result = process_file(file, &settings, &mut symbols, replace, args.backup.as_deref());
            symbols.reset_file_state();
            match result {
                Ok(flags) => status |= flags,
                Err(err) => {
                    error!("{err}");
                    status |= error_flags(&err);
                    if err.is_abend() || !settings.keepgoing {
                        break;
                    }
                }
            }
        }
    }
    Ok(ExitCode::from(status.exit_code()))
}

fn error_flags(err: &EngineError) -> StatusFlags {
    if err.is_abend() {
        StatusFlags::ABEND
    } else {
        StatusFlags::ERROR
    }
}

fn io_error(file: &str, source: io::Error) -> EngineError {
    EngineError::Io {
        file: file.to_string(),
        source,
    }
}

fn process_stdin(settings: &Settings, symbols: &mut SymbolTable) -> Result<StatusFlags, EngineError> {
    let stdin = io::stdin().lock();
    let mut writer = BufWriter::new(io::stdout().lock());
    let flags = {
        let mut engine = Engine::new(settings, symbols, Box::new(stdin), "-", &mut writer);
        engine.run()?
    };
    writer.flush().map_err(|source| io_error("-", source))?;
    Ok(flags)
}

fn process_file(
    path: &Path,
    settings: &Settings,
    symbols: &mut SymbolTable,
    replace: bool,
    backup: Option<&str>,
) -> Result<StatusFlags, EngineError> {
    let name = path.display().to_string();
    let input = File::open(path).map_err(|source| io_error(&name, source))?;
    let reader = BufReader::new(input);

    if replace {
        // Write to a temporary file next to the input, so a rename can
        // finish the job. On any failure the temporary is removed and
        // the input survives untouched.
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = tempfile::Builder::new()
            .prefix("ifprune_out_")
            .tempfile_in(dir)
            .map_err(|source| io_error(&name, source))?;
        let mut writer = BufWriter::new(temp);
        let flags = {
            let mut engine = Engine::new(settings, symbols, Box::new(reader), &name, &mut writer);
            engine.run()?
        };
        let temp = writer
            .into_inner()
            .map_err(|err| io_error(&name, err.into_error()))?;
        if let Some(suffix) = backup {
            back_up(path, suffix)?;
        }
        temp.persist(path)
            .map_err(|err| io_error(&name, err.error))?;
        Ok(flags)
    } else {
        let mut writer = BufWriter::new(io::stdout().lock());
        let flags = {
            let mut engine = Engine::new(settings, symbols, Box::new(reader), &name, &mut writer);
            engine.run()?
        };
        writer.flush().map_err(|source| io_error(&name, source))?;
        Ok(flags)
    }
}

/// Rename `path` out of the way, repeating the suffix until the backup
/// name is unused.
fn back_up(path: &Path, suffix: &str) -> Result<(), EngineError> {
    let mut backup = path.as_os_str().to_os_string();
    loop {
        backup.push(suffix);
        if !Path::new(&backup).exists() {
            break;
        }
    }
    std::fs::rename(path, &backup)
        .map_err(|source| io_error(&path.display().to_string(), source))
}
