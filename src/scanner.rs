use crate::inflect::underscore;
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source tree of the host application.
///
/// Ownership of routes and models is decided by the presence of a source file
/// under the host application's own directories: a handler `admin/users` is
/// the host's when `app/controllers/admin/users_controller.rb` exists, a model
/// `Admin::UserProfile` when `app/models/admin/user_profile.rb` exists.
/// Anything else is assumed to come from a library or engine.
///
/// # Example
///
/// ```no_run
/// use rails_map::scanner::SourceTree;
///
/// let source = SourceTree::new("./my-app");
/// assert!(source.has_controller("widgets"));
/// ```
#[derive(Debug, Clone)]
pub struct SourceTree {
    root_path: PathBuf,
}

/// Result of enumerating Ruby files below a directory.
pub struct ScanResult {
    /// Paths to all discovered `.rb` files
    pub ruby_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl SourceTree {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    pub fn controllers_dir(&self) -> PathBuf {
        self.root_path.join("app").join("controllers")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root_path.join("app").join("models")
    }

    /// `admin/users` -> `<root>/app/controllers/admin/users_controller.rb`
    pub fn controller_file(&self, handler_name: &str) -> PathBuf {
        self.controllers_dir()
            .join(format!("{}_controller.rb", handler_name))
    }

    /// `Admin::UserProfile` -> `<root>/app/models/admin/user_profile.rb`
    pub fn model_file(&self, model_name: &str) -> PathBuf {
        self.models_dir()
            .join(format!("{}.rb", underscore(model_name)))
    }

    pub fn has_controller(&self, handler_name: &str) -> bool {
        self.controller_file(handler_name).is_file()
    }

    pub fn has_model(&self, model_name: &str) -> bool {
        self.model_file(model_name).is_file()
    }

    /// Every model source file of the host application.
    pub fn model_files(&self) -> ScanResult {
        Self::ruby_files(&self.models_dir())
    }

    /// Recursively collects `.rb` files below `dir`.
    ///
    /// Hidden directories are skipped. Entries that cannot be accessed are
    /// logged and recorded as warnings; a missing `dir` yields an empty
    /// result.
    pub fn ruby_files(dir: &Path) -> ScanResult {
        let mut ruby_files = Vec::new();
        let mut warnings = Vec::new();

        if !dir.is_dir() {
            return ScanResult {
                ruby_files,
                warnings,
            };
        }

        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == dir {
                    return true;
                }
                !e.file_name().to_string_lossy().starts_with('.')
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rb") {
                        ruby_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        ScanResult {
            ruby_files,
            warnings,
        }
    }
}
