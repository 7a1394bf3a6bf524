// SPDX-License-Identifier: MIT

//! Template Store (§4.E): raw JSON documents on disk, resolved through
//! single-parent inheritance by a structural deep merge, cached by id.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use dc_core::{ErrorKind, Template};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("cyclic inheritance detected at: {0}")]
    CyclicInheritance(String),
    #[error("template {0} is a system template and cannot be modified")]
    ImmutableSystemTemplate(String),
    #[error("template {0} is still referenced by: {1:?}")]
    StillReferenced(String, Vec<String>),
    #[error("template {0} already exists")]
    DuplicateId(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("io error: {0}")]
    Io(String),
}

impl TemplateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::NotFound(m) => ErrorKind::NotFound(m.clone()),
            TemplateError::CyclicInheritance(m) => ErrorKind::Conflict(format!("cyclic inheritance: {m}")),
            TemplateError::ImmutableSystemTemplate(m) => ErrorKind::Conflict(format!("immutable system template: {m}")),
            TemplateError::StillReferenced(id, refs) => ErrorKind::Conflict(format!("{id} still referenced by {refs:?}")),
            TemplateError::DuplicateId(m) => ErrorKind::Conflict(format!("duplicate template id: {m}")),
            TemplateError::Validation(m) => ErrorKind::Validation(m.clone()),
            TemplateError::Io(m) => ErrorKind::Internal(m.clone()),
        }
    }
}

struct RawEntry {
    document: Value,
    system: bool,
}

pub struct TemplateStore {
    raw: RwLock<HashMap<String, RawEntry>>,
    resolved: RwLock<HashMap<String, Template>>,
}

impl TemplateStore {
    pub fn empty() -> Self {
        Self { raw: RwLock::new(HashMap::new()), resolved: RwLock::new(HashMap::new()) }
    }

    /// Reads every `*.json` file from `system_dir` (read-only templates)
    /// and `user_dir` (mutable), caching raw documents.
    pub fn load(system_dir: &Path, user_dir: &Path) -> Result<Self, TemplateError> {
        let store = Self::empty();
        store.load_dir(system_dir, true)?;
        store.load_dir(user_dir, false)?;
        Ok(store)
    }

    fn load_dir(&self, dir: &Path, system: bool) -> Result<(), TemplateError> {
        if !dir.exists() {
            return Ok(());
        }
        let entries = std::fs::read_dir(dir).map_err(|e| TemplateError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| TemplateError::Io(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let body = std::fs::read_to_string(&path).map_err(|e| TemplateError::Io(e.to_string()))?;
            let document: Value = serde_json::from_str(&body).map_err(|e| TemplateError::Io(e.to_string()))?;
            let id = document
                .get("id")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| path.file_stem().unwrap().to_string_lossy().to_string());
            info!(%id, system, "loaded template");
            self.raw.write().insert(id, RawEntry { document, system });
        }
        Ok(())
    }

    pub fn is_system(&self, id: &str) -> bool {
        self.raw.read().get(id).map(|e| e.system).unwrap_or(false)
    }

    /// Resolves `id` through its inheritance chain, deep-merging parent
    /// into child (§4.E). Scalars and arrays: child replaces. Objects:
    /// recurse. Caches the resolved result.
    pub fn resolve(&self, id: &str) -> Result<Template, TemplateError> {
        if let Some(cached) = self.resolved.read().get(id) {
            return Ok(cached.clone());
        }

        let mut visited = HashSet::new();
        let merged = self.resolve_value(id, &mut visited)?;
        validate_structure(&merged)?;

        let mut template: Template = serde_json::from_value(merged).map_err(|e| TemplateError::Validation(e.to_string()))?;
        template.system = self.is_system(id);
        self.resolved.write().insert(id.to_string(), template.clone());
        Ok(template)
    }

    fn resolve_value(&self, id: &str, visited: &mut HashSet<String>) -> Result<Value, TemplateError> {
        if !visited.insert(id.to_string()) {
            return Err(TemplateError::CyclicInheritance(id.to_string()));
        }

        let raw = self.raw.read();
        let entry = raw.get(id).ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
        let document = entry.document.clone();
        let extends = document.get("extends").and_then(Value::as_str).map(String::from);
        drop(raw);

        match extends {
            None => Ok(document),
            Some(parent_id) => {
                let parent = self.resolve_value(&parent_id, visited)?;
                Ok(deep_merge(&parent, &document))
            }
        }
    }

    pub fn create(&self, id: String, document: Value) -> Result<Template, TemplateError> {
        if self.raw.read().contains_key(&id) {
            return Err(TemplateError::DuplicateId(id));
        }
        self.raw.write().insert(id.clone(), RawEntry { document, system: false });
        self.resolve(&id)
    }

    pub fn update(&self, id: &str, document: Value) -> Result<Template, TemplateError> {
        if self.is_system(id) {
            return Err(TemplateError::ImmutableSystemTemplate(id.to_string()));
        }
        if !self.raw.read().contains_key(id) {
            return Err(TemplateError::NotFound(id.to_string()));
        }
        self.raw.write().insert(id.to_string(), RawEntry { document, system: false });
        self.invalidate_cache();
        self.resolve(id)
    }

    pub fn delete(&self, id: &str) -> Result<(), TemplateError> {
        if self.is_system(id) {
            return Err(TemplateError::ImmutableSystemTemplate(id.to_string()));
        }
        let referencing: Vec<String> = self
            .raw
            .read()
            .iter()
            .filter(|(other_id, entry)| {
                *other_id != id && entry.document.get("extends").and_then(Value::as_str) == Some(id)
            })
            .map(|(other_id, _)| other_id.clone())
            .collect();
        if !referencing.is_empty() {
            return Err(TemplateError::StillReferenced(id.to_string(), referencing));
        }
        if self.raw.write().remove(id).is_none() {
            return Err(TemplateError::NotFound(id.to_string()));
        }
        self.invalidate_cache();
        Ok(())
    }

    pub fn duplicate(&self, id: &str, new_id: String) -> Result<Template, TemplateError> {
        let mut document = self.raw.read().get(id).ok_or_else(|| TemplateError::NotFound(id.to_string()))?.document.clone();
        if let Value::Object(map) = &mut document {
            map.insert("id".into(), Value::String(new_id.clone()));
        }
        self.create(new_id, document)
    }

    pub fn list_ids(&self) -> Vec<(String, bool)> {
        self.raw.read().iter().map(|(id, entry)| (id.clone(), entry.system)).collect()
    }

    /// The unmerged document as stored, for `Export` (§6): callers that want
    /// the inherited view should use [`TemplateStore::resolve`] instead.
    pub fn raw_document(&self, id: &str) -> Result<Value, TemplateError> {
        self.raw.read().get(id).map(|e| e.document.clone()).ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    fn invalidate_cache(&self) {
        warn!("template cache invalidated");
        self.resolved.write().clear();
    }
}

/// Scalar: child wins. Object: recurse key-by-key. Array: child replaces
/// the parent's array wholesale when present.
fn deep_merge(parent: &Value, child: &Value) -> Value {
    match (parent, child) {
        (Value::Object(p), Value::Object(c)) => {
            let mut merged = p.clone();
            for (key, child_value) in c {
                let next = match merged.get(key) {
                    Some(parent_value) => deep_merge(parent_value, child_value),
                    None => child_value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => child.clone(),
    }
}

fn validate_structure(document: &Value) -> Result<(), TemplateError> {
    let obj = document.as_object().ok_or_else(|| TemplateError::Validation("template is not a JSON object".into()))?;

    for field in ["id", "name", "version"] {
        if !obj.contains_key(field) {
            return Err(TemplateError::Validation(format!("missing required field: {field}")));
        }
    }

    if let Some(config) = obj.get("config") {
        if let Some(max_workers) = config.get("max_workers").and_then(Value::as_i64) {
            if max_workers < 1 {
                return Err(TemplateError::Validation("config.max_workers must be >= 1".into()));
            }
        }
    }

    if let Some(delimiters) = obj.get("delimiters") {
        for field in ["start", "end"] {
            if delimiters.get(field).and_then(Value::as_str).map(str::is_empty).unwrap_or(true) {
                return Err(TemplateError::Validation(format!("delimiters.{field} must be non-empty")));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
