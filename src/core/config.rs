//! Run configuration.
//!
//! Every run receives an explicit [`ResolveConfig`]; nothing is read from
//! process-global state. Values layer as defaults, then an optional
//! `resolver.toml`, then CLI flags (applied by the caller).

use crate::core::collision::DEFAULT_SIMILARITY_THRESHOLD;
use crate::core::error::ResolveError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CANONICAL_NAME: &str = "GLOBAL-STATE.yaml";
pub const DEFAULT_CONFIG_NAME: &str = "resolver.toml";
pub const MEMORY_FILE_NAME: &str = "MEMORY.md";
pub const MEMORY_DIR_NAME: &str = "memory";

/// On-disk shape of `resolver.toml`. All keys are optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub global_state: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
    pub advisory: Vec<PathBuf>,
    pub include_memory: Option<bool>,
    pub similarity: Option<f64>,
    pub telemetry: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveConfig {
    pub kit_dir: PathBuf,
    pub global_state: PathBuf,
    /// Directory receiving draft, patch and telemetry artifacts.
    pub workspace: PathBuf,
    pub advisory: Vec<PathBuf>,
    pub include_memory: bool,
    pub similarity_threshold: f64,
    pub telemetry: bool,
}

impl ResolveConfig {
    pub fn new(kit_dir: impl Into<PathBuf>, workspace: impl Into<PathBuf>) -> Self {
        let kit_dir = kit_dir.into();
        Self {
            global_state: kit_dir.join(DEFAULT_CANONICAL_NAME),
            kit_dir,
            workspace: workspace.into(),
            advisory: Vec::new(),
            include_memory: false,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            telemetry: false,
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.kit_dir.join(path)
        }
    }

    /// Layers a parsed config file over the current values. Relative paths
    /// in the file resolve against the kit directory.
    pub fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.global_state {
            self.global_state = self.resolve_path(&path);
        }
        if let Some(path) = file.workspace {
            self.workspace = self.resolve_path(&path);
        }
        let advisory: Vec<PathBuf> = file.advisory.iter().map(|p| self.resolve_path(p)).collect();
        self.advisory.extend(advisory);
        if let Some(include) = file.include_memory {
            self.include_memory = include;
        }
        if let Some(similarity) = file.similarity {
            self.similarity_threshold = similarity;
        }
        if let Some(telemetry) = file.telemetry {
            self.telemetry = telemetry;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ResolveError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ResolveError::ValidationError(format!(
                "similarity threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }

    /// Explicit advisory paths followed by discovered memory files
    /// (`MEMORY.md`, then `memory/*.md` sorted by name).
    pub fn advisory_paths(&self) -> Result<Vec<PathBuf>, ResolveError> {
        let mut paths = self.advisory.clone();
        if !self.include_memory {
            return Ok(paths);
        }

        let memory_file = self.kit_dir.join(MEMORY_FILE_NAME);
        if memory_file.is_file() {
            paths.push(memory_file);
        }

        let memory_dir = self.kit_dir.join(MEMORY_DIR_NAME);
        if memory_dir.is_dir() {
            let mut notes = Vec::new();
            for entry in fs::read_dir(&memory_dir).map_err(ResolveError::IoError)? {
                let path = entry.map_err(ResolveError::IoError)?.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                    notes.push(path);
                }
            }
            notes.sort();
            paths.extend(notes);
        }
        Ok(paths)
    }

    /// Display label for a path: relative to the kit directory when possible.
    pub fn label_for(&self, path: &Path) -> String {
        path.strip_prefix(&self.kit_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

/// Reads a TOML config file. A missing file is `Ok(None)` unless `required`.
pub fn load_config_file(path: &Path, required: bool) -> Result<Option<ConfigFile>, ResolveError> {
    if !path.exists() {
        if required {
            return Err(ResolveError::ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(ResolveError::IoError)?;
    let file: ConfigFile = toml::from_str(&content)
        .map_err(|e| ResolveError::ConfigError(format!("{}: {}", path.display(), e)))?;
    Ok(Some(file))
}
