//! Project descriptor (`Pulumi.yaml`) normalization.
//!
//! Packaged recipes run from a prebuilt binary, so the descriptor must name
//! it explicitly under `runtime.options.binary`. The short `runtime: go` form
//! is expanded into the mapping form when the option is injected:
//!
//! ```yaml
//! runtime:
//!   name: go
//!   options:
//!     binary: ./main
//! ```
//!
//! Other keys are preserved in their original order. The descriptor is always
//! re-serialized with 2-space indentation, which makes normalization
//! idempotent.

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::LayoutError;

/// Name of the project descriptor inside a recipe directory.
pub const DESCRIPTOR_NAME: &str = "Pulumi.yaml";

/// Binary entry point injected when the descriptor has none.
pub const DEFAULT_BINARY: &str = "./main";

/// Normalizes the descriptor at `path` in place.
///
/// Returns `true` if the binary option was injected.
///
/// # Errors
///
/// Returns [`LayoutError::Descriptor`] if the descriptor is not a YAML
/// mapping with a `runtime`, or [`LayoutError::Io`] on read/write failure.
pub fn normalize_project(path: &Path) -> Result<bool, LayoutError> {
    let content = fs::read_to_string(path).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (normalized, injected) = normalize_str(&content).map_err(|message| {
        LayoutError::Descriptor {
            path: path.to_path_buf(),
            message,
        }
    })?;

    fs::write(path, normalized).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), injected, "Normalized project descriptor");
    Ok(injected)
}

/// Normalizes descriptor content, returning the new content and whether the
/// binary option was injected.
///
/// # Errors
///
/// Returns a message describing why the content is not a valid descriptor.
pub fn normalize_str(content: &str) -> Result<(String, bool), String> {
    let mut project: Value =
        serde_yaml::from_str(content).map_err(|e| format!("unmarshalling: {e}"))?;

    let root = project
        .as_mapping_mut()
        .ok_or_else(|| "descriptor is not a mapping".to_string())?;
    let runtime = root
        .get_mut("runtime")
        .ok_or_else(|| "missing runtime".to_string())?;

    let injected = set_default_binary(runtime)?;

    let out = serde_yaml::to_string(&project).map_err(|e| format!("marshalling: {e}"))?;
    Ok((indent_sequences(&out), injected))
}

/// Indents block sequences by 2 spaces under their parent key.
///
/// The emitter writes `key:\n- item`; the descriptor layout is
/// `key:\n  - item`. Block scalar contents are shifted with their parent but
/// never inspected.
fn indent_sequences(yaml: &str) -> String {
    // (column of the shifted sequence items, shift applied)
    let mut shifts: Vec<(usize, usize)> = Vec::new();
    let mut block_scalar: Option<usize> = None;
    let mut parent_key: Option<usize> = None;
    let mut out = String::with_capacity(yaml.len() + yaml.len() / 8);

    for line in yaml.lines() {
        let body = line.trim_start_matches(' ');
        let indent = line.len() - body.len();

        if body.is_empty() {
            out.push('\n');
            continue;
        }

        if let Some(owner) = block_scalar {
            if indent > owner {
                push_shifted(&mut out, line, total_shift(&shifts));
                continue;
            }
            block_scalar = None;
        }

        let is_item = body == "-" || body.starts_with("- ");
        while let Some(&(column, _)) = shifts.last() {
            if indent < column || (indent == column && !is_item) {
                shifts.pop();
            } else {
                break;
            }
        }
        if is_item && parent_key == Some(indent) {
            shifts.push((indent, 2));
        }

        push_shifted(&mut out, line, total_shift(&shifts));

        let key_column = item_content_column(line);
        parent_key = body.ends_with(':').then_some(key_column);
        if opens_block_scalar(&line[key_column..]) {
            // `- |` content sits at the item content column.
            block_scalar = Some(if line[key_column..].contains(": ") {
                key_column
            } else {
                key_column.saturating_sub(1)
            });
        }
    }

    out
}

/// Column of the first character after any `- ` item markers.
fn item_content_column(line: &str) -> usize {
    let mut column = line.len() - line.trim_start_matches(' ').len();
    let mut rest = &line[column..];
    while let Some(next) = rest.strip_prefix("- ") {
        column += 2;
        rest = next;
    }
    column
}

fn opens_block_scalar(content: &str) -> bool {
    let indicator = content.rsplit(' ').next().unwrap_or_default();
    let mut chars = indicator.chars();
    matches!(chars.next(), Some('|' | '>'))
        && chars.all(|c| c.is_ascii_digit() || c == '+' || c == '-')
}

fn total_shift(shifts: &[(usize, usize)]) -> usize {
    shifts.iter().map(|&(_, shift)| shift).sum()
}

fn push_shifted(out: &mut String, line: &str, shift: usize) {
    out.push_str(&" ".repeat(shift));
    out.push_str(line);
    out.push('\n');
}

fn set_default_binary(runtime: &mut Value) -> Result<bool, String> {
    if let Value::String(name) = runtime {
        let mut expanded = Mapping::new();
        expanded.insert("name".into(), Value::String(std::mem::take(name)));
        *runtime = Value::Mapping(expanded);
    }

    let runtime = runtime
        .as_mapping_mut()
        .ok_or_else(|| "runtime must be a string or a mapping".to_string())?;

    let options = runtime
        .entry("options".into())
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if options.is_null() {
        *options = Value::Mapping(Mapping::new());
    }
    let options = options
        .as_mapping_mut()
        .ok_or_else(|| "runtime.options must be a mapping".to_string())?;

    if options.contains_key("binary") {
        return Ok(false);
    }
    options.insert("binary".into(), DEFAULT_BINARY.into());
    Ok(true)
}
