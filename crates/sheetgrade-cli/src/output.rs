// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File helpers for the CLI: loading keys and configuration, writing JSON.

use std::path::Path;

use serde::Serialize;
use sheetgrade_core::config::GradeConfig;
use sheetgrade_core::types::AnswerKey;

use crate::CliResult;

/// Read an answer key: a JSON array of `{"question", "correct_answer"}`.
pub fn load_key(path: &Path) -> CliResult<AnswerKey> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read answer key {}: {}", path.display(), e))?;
    let key: AnswerKey = serde_json::from_str(&data)
        .map_err(|e| format!("invalid answer key {}: {}", path.display(), e))?;
    if key.is_empty() {
        tracing::warn!("Answer key {} is empty", path.display());
    }
    Ok(key)
}

/// Configuration from `path`, or the defaults when no path is given.
///
/// A file is validated as it is parsed.
pub fn load_config(path: Option<&Path>) -> CliResult<GradeConfig> {
    match path {
        Some(p) => Ok(GradeConfig::from_path(p)?),
        None => Ok(GradeConfig::default()),
    }
}

/// Pretty-print `value` as JSON to `out`, or to stdout when `out` is `None`.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
