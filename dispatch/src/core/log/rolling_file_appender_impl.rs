// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use miette::{IntoDiagnostic, WrapErr};
use std::path::Path;
use tracing_appender::rolling::{self, RollingFileAppender};

/// Opens (creating if needed) a log file that is appended to and never rotated. Missing
/// parent folders are created.
///
/// The file is written synchronously. Wrapping it in
/// [`tracing_appender::non_blocking`] would need its worker guard to outlive the
/// subscriber, which a boxed layer can't express.
///
/// # Errors
///
/// Returns an error if:
/// - The path has no file name (for example `/` or `..`)
/// - The parent folder can't be created
pub fn try_create(path_str: &str) -> miette::Result<RollingFileAppender> {
    let path = Path::new(path_str);

    let Some(file_name) = path.file_name() else {
        miette::bail!("Log file path {} has no file name.", path.display());
    };
    let folder = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(folder)
        .into_diagnostic()
        .wrap_err_with(|| format!("Can't create log folder {}", folder.display()))?;

    Ok(rolling::never(folder, file_name))
}
