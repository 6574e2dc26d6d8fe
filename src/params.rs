// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Access to SPECFEM2D `KEY = value` parameter files.
//!
//! Patching rewrites only the value token of the first line whose key matches;
//! every other byte of the file, including trailing comments and line
//! endings, is preserved.

use std::path::Path;

use crate::error::{Result, SolverError};

/// Locate the value token of `key` on `line`, as a byte range.
///
/// Keys are compared case-sensitively after trimming surrounding whitespace.
/// Comment lines never match. The line ending, if any, is never part of the
/// span, so an empty value yields an empty span at the end of the line.
fn value_span(line: &str, key: &str) -> Option<(usize, usize)> {
    let body = line.strip_suffix('\n').unwrap_or(line);
    let body = body.strip_suffix('\r').unwrap_or(body);
    if body.trim_start().starts_with('#') {
        return None;
    }
    let eq = body.find('=')?;
    if body[..eq].trim() != key {
        return None;
    }
    let rest = &body[eq + 1..];
    let lead = rest.len() - rest.trim_start().len();
    let start = eq + 1 + lead;
    let len = body[start..]
        .find(char::is_whitespace)
        .unwrap_or(body.len() - start);
    Some((start, start + len))
}

/// Read the value of `key` from parameter text.
pub fn find_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines()
        .find_map(|line| value_span(line, key).map(|(s, e)| &line[s..e]))
}

/// Return `text` with the value of `key` replaced, or `None` if the key is absent.
pub fn patch_value(text: &str, key: &str, value: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len() + value.len());
    let mut patched = false;
    for line in text.split_inclusive('\n') {
        match (patched, value_span(line, key)) {
            (false, Some((start, end))) => {
                out.push_str(&line[..start]);
                out.push_str(value);
                out.push_str(&line[end..]);
                patched = true;
            }
            _ => out.push_str(line),
        }
    }
    patched.then_some(out)
}

/// Read the value of `key` from the parameter file at `path`.
///
/// # Errors
/// Returns [`SolverError::ParameterNotFound`] if no line carries the key.
pub fn getpar(path: &Path, key: &str) -> Result<String> {
    let text = std::fs::read_to_string(path)?;
    find_value(&text, key)
        .map(str::to_string)
        .ok_or_else(|| SolverError::ParameterNotFound {
            key: key.to_string(),
            path: path.to_path_buf(),
        })
}

/// Rewrite the value of `key` in the parameter file at `path`.
///
/// # Errors
/// Returns [`SolverError::ParameterNotFound`] if no line carries the key; the
/// file is left untouched in that case.
pub fn setpar(path: &Path, key: &str, value: &str) -> Result<()> {
    let text = std::fs::read_to_string(path)?;
    let patched = patch_value(&text, key, value).ok_or_else(|| SolverError::ParameterNotFound {
        key: key.to_string(),
        path: path.to_path_buf(),
    })?;
    tracing::debug!(path = %path.display(), key, value, "patched parameter");
    std::fs::write(path, patched)?;
    Ok(())
}
