//! Model registry loaded from YAML.
//!
//! Each file under the models directory describes one model. Values support
//! `${VAR}` and `${VAR:-default}` environment substitution so data URLs can
//! be overridden per deployment.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use goods_common::BoundingBox;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SubsetError};
use crate::grid::GridKind;
use crate::mapping::VariableMapping;
use crate::time_window::TimePolicy;
use crate::types::DepthSelection;

/// One model served by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    /// Data URL or path.
    pub url: String,
    /// Separate grid file, when coordinates are not in the data file.
    #[serde(default)]
    pub grid_url: Option<String>,
    pub grid_kind: GridKind,
    pub variables: VariableMapping,
    pub bounding_box: BoundingBox,
    /// A small region inside the domain, handy for smoke tests.
    #[serde(default)]
    pub example_bbox: Option<BoundingBox>,
    #[serde(default)]
    pub time_policy: TimePolicy,
    #[serde(default)]
    pub depth: DepthSelection,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub info: String,
}

impl ModelEntry {
    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SubsetError::config("model id cannot be empty"));
        }
        if self.url.trim().is_empty() {
            return Err(SubsetError::config(format!("model {} has no url", self.id)));
        }
        self.bounding_box
            .validate()
            .map_err(|e| SubsetError::config(format!("model {} bounding_box: {}", self.id, e)))?;
        if let Some(example) = &self.example_bbox {
            example.validate().map_err(|e| {
                SubsetError::config(format!("model {} example_bbox: {}", self.id, e))
            })?;
        }
        if let TimePolicy::Latest { steps: 0 } = self.time_policy {
            return Err(SubsetError::config(format!(
                "model {} time_policy latest steps must be >= 1",
                self.id
            )));
        }
        Ok(())
    }

    /// Location of the grid coordinates.
    pub fn grid_location(&self) -> &str {
        self.grid_url.as_deref().unwrap_or(&self.url)
    }
}

/// Explicitly constructed catalog of models.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelEntry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML sequence of model entries.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let entries: Vec<ModelEntry> = serde_yaml::from_str(&expanded)
            .map_err(|e| SubsetError::config(format!("failed to parse model list: {}", e)))?;

        let mut registry = Self::new();
        for entry in entries {
            registry.insert(entry)?;
        }
        Ok(registry)
    }

    /// Load every `*.yaml`/`*.yml` file in `dir`, one model per file.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            SubsetError::config(format!("failed to read models directory {:?}: {}", dir, e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut registry = Self::new();
        for path in paths {
            registry.insert(load_model_file(&path)?)?;
        }
        info!(dir = %dir.display(), models = registry.len(), "Loaded model registry");
        Ok(registry)
    }

    /// Add a model, rejecting duplicate ids.
    pub fn insert(&mut self, entry: ModelEntry) -> Result<()> {
        entry.validate()?;
        if self.models.contains_key(&entry.id) {
            return Err(SubsetError::config(format!("duplicate model id: {}", entry.id)));
        }
        debug!(model = %entry.id, "Registered model");
        self.models.insert(entry.id.clone(), entry);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&ModelEntry> {
        self.models
            .get(id)
            .ok_or_else(|| SubsetError::ModelNotFound(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelEntry> {
        self.models.values()
    }

    /// Models offering `parameter` (case-insensitive).
    pub fn with_parameter<'a>(&'a self, parameter: &'a str) -> impl Iterator<Item = &'a ModelEntry> {
        self.models.values().filter(move |m| {
            m.parameters
                .iter()
                .any(|p| p.eq_ignore_ascii_case(parameter))
        })
    }

    /// Models whose domain intersects `bbox`.
    pub fn intersecting<'a>(&'a self, bbox: &'a BoundingBox) -> impl Iterator<Item = &'a ModelEntry> {
        self.models
            .values()
            .filter(move |m| bbox.intersects(&m.bounding_box))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn load_model_file(path: &Path) -> Result<ModelEntry> {
    let content = fs::read_to_string(path)
        .map_err(|e| SubsetError::config(format!("failed to read {:?}: {}", path, e)))?;
    let expanded = expand_env_vars(&content)?;
    serde_yaml::from_str(&expanded)
        .map_err(|e| SubsetError::config(format!("failed to parse {:?}: {}", path, e)))
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` in YAML content.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(SubsetError::config(format!(
                            "unclosed variable substitution: ${{{}",
                            var_expr
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .map_err(|_| SubsetError::config(format!("environment variable {} not set", expr)))
    }
}
