//! Identity resolution: config path and content to [`InstanceDescriptor`].
//!
//! Only a handful of descriptor keys are read. The rest of the schema
//! belongs to the inference backend and is passed through untouched by
//! binding the file into the container.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::domain::descriptor::DEFAULT_PROVIDER;
use crate::domain::{InstanceDescriptor, InstanceId, InstanceKind};
use crate::error::{ConfigError, Result};

/// Extensions stripped from the file name before canonicalisation.
const KNOWN_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

const MODEL_NAME_KEYS: &[&str] = &["served-model-name", "served_model_name", "model"];
const MODEL_REPOSITORY_KEYS: &[&str] = &["model-repository", "model_repository"];
const CACHE_DIR_KEYS: &[&str] = &["cache-dir", "cache_dir"];
const PROVIDER_KEYS: &[&str] = &["provider"];

/// Derive the canonical instance id for a config path.
///
/// The id depends only on the file name: known extensions are stripped,
/// every character outside `[A-Za-z0-9-]` becomes `_`, runs of `_` collapse
/// and separators are trimmed from both ends.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when nothing usable remains.
pub fn canonical_id(path: &Path) -> std::result::Result<InstanceId, ConfigError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut stem = file_name.as_str();
    while let Some((head, ext)) = stem.rsplit_once('.') {
        if head.is_empty() || !KNOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            break;
        }
        stem = head;
    }

    let mut id = String::with_capacity(stem.len());
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            id.push(c);
        } else if !id.ends_with('_') {
            id.push('_');
        }
    }
    let id = id.trim_matches(|c| c == '_' || c == '-');

    if id.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "config_path",
            reason: format!("cannot derive an instance id from {}", path.display()),
        });
    }
    Ok(InstanceId::new(id))
}

/// Read a model configuration file and build its descriptor.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or lacks
/// a model name.
pub fn resolve(path: &Path) -> Result<InstanceDescriptor> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let descriptor = parse(path, &content)?;
    debug!(
        id = %descriptor.id,
        model = %descriptor.model_name,
        kind = ?descriptor.kind,
        "Resolved descriptor"
    );
    Ok(descriptor)
}

/// Build a descriptor from already-read config content.
///
/// Relative paths inside the descriptor resolve against the config file's
/// directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] for malformed content or a missing model name.
pub fn parse(path: &Path, content: &str) -> Result<InstanceDescriptor> {
    let id = canonical_id(path)?;
    let doc: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Descriptor {
        path: path.to_path_buf(),
        source,
    })?;
    if !doc.is_mapping() {
        return Err(ConfigError::InvalidValue {
            field: "descriptor",
            reason: "expected a mapping at the top level".to_string(),
        }
        .into());
    }

    let model_name =
        model_name(&doc).ok_or(ConfigError::MissingField { field: "model" })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let model_repository = lookup_str(&doc, MODEL_REPOSITORY_KEYS).map(|p| base.join(p));
    let cache_dir = lookup_str(&doc, CACHE_DIR_KEYS).map(|p| base.join(p));
    let provider = lookup_str(&doc, PROVIDER_KEYS).unwrap_or(DEFAULT_PROVIDER);

    let kind = if model_repository.is_some() {
        InstanceKind::Composite
    } else {
        InstanceKind::Single
    };

    Ok(InstanceDescriptor {
        id,
        model_name,
        config_path: path.to_path_buf(),
        kind,
        model_repository,
        cache_dir,
        provider: provider.to_string(),
    })
}

fn lookup<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| doc.get(*key))
}

fn lookup_str<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a str> {
    lookup(doc, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// `served-model-name` may be a string or a list; the first entry wins.
fn model_name(doc: &Value) -> Option<String> {
    let value = lookup(doc, MODEL_NAME_KEYS)?;
    let name = match value {
        Value::Sequence(items) => items.first().and_then(Value::as_str),
        other => other.as_str(),
    }?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Descriptor path as it should appear inside containers.
#[must_use]
pub fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
