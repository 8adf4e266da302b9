use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use ignore::WalkBuilder;
use itertools::Itertools;

/// Expand the command-line file arguments into the list of files to
/// process. Explicit files are taken as given; directories are searched
/// only under `--recurse`, honouring the extension filter.
pub fn resolve_input_files(
    files: &[PathBuf],
    recurse: bool,
    filter: &[String],
) -> Result<Vec<PathBuf>> {
    let mut resolved = Vec::new();
    for file in files {
        if file.is_dir() {
            if !recurse {
                return Err(anyhow!(
                    "\"{}\" is a directory (use --recurse to search it)",
                    file.display()
                ));
            }
            let walker = WalkBuilder::new(file).standard_filters(false).build();
            for entry in walker {
                let entry = entry?;
                if entry.file_type().is_some_and(|file_type| file_type.is_file())
                    && matches_filter(entry.path(), filter)
                {
                    resolved.push(entry.into_path());
                }
            }
        } else {
            resolved.push(file.clone());
        }
    }
    Ok(resolved.into_iter().unique().sorted().collect())
}

fn matches_filter(path: &Path, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            filter
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(extension))
        })
}
