//! Profile context - who the persona is and what we know about them.
//!
//! A profile is loaded once at startup from two optional sources:
//!
//! 1. **Summary** - a short biography (`summary.txt`)
//! 2. **Document** - the structured profile text, e.g. a résumé or
//!    professional-network export already converted to text
//!
//! A missing source is logged and loaded as empty. A source that exists but
//! cannot be read is an error: the caller treats it as fatal at startup.
//! After loading, the profile is read-only and shared behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::ProfileError;

/// Where to load profile text from.
#[derive(Debug, Clone, Default)]
pub struct ProfileSources {
    pub summary_path: Option<PathBuf>,
    pub document_path: Option<PathBuf>,
}

/// Immutable persona data embedded in every prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileContext {
    /// The persona's display name
    pub name: String,

    /// Short biography
    #[serde(default)]
    pub summary: String,

    /// Structured profile text
    #[serde(default)]
    pub document: String,

    /// Which source files were loaded (for diagnostics)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loaded_files: Vec<String>,
}

impl ProfileContext {
    /// Build a profile from in-memory text.
    pub fn new(
        name: impl Into<String>,
        summary: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            summary: summary.into().trim().to_string(),
            document: document.into().trim().to_string(),
            loaded_files: vec![],
        }
    }

    /// Load a profile from disk.
    pub fn load(name: impl Into<String>, sources: &ProfileSources) -> Result<Self, ProfileError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProfileError::MissingName);
        }

        let mut loaded_files = Vec::new();
        let summary = Self::read_source(sources.summary_path.as_deref(), &mut loaded_files)?;
        let document = Self::read_source(sources.document_path.as_deref(), &mut loaded_files)?;

        let profile = Self {
            name,
            summary,
            document,
            loaded_files,
        };

        if profile.is_empty() {
            warn!(name = %profile.name, "Profile has no summary or document; answers will be ungrounded");
        } else {
            info!(
                name = %profile.name,
                summary_chars = profile.summary.len(),
                document_chars = profile.document.len(),
                "Profile loaded"
            );
        }

        Ok(profile)
    }

    /// Read one optional source. Missing files load as empty.
    fn read_source(
        path: Option<&Path>,
        loaded_files: &mut Vec<String>,
    ) -> Result<String, ProfileError> {
        let Some(path) = path else {
            return Ok(String::new());
        };

        if !path.exists() {
            warn!(file = %path.display(), "Profile source not found, skipping");
            return Ok(String::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ProfileError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(file = %path.display(), chars = content.len(), "Loaded profile source");
        loaded_files.push(path.display().to_string());
        Ok(content.trim().to_string())
    }

    /// True when neither summary nor document carry any text.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.document.is_empty()
    }

    /// Estimate the token count of the profile text (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        (self.summary.len() + self.document.len()) / 4
    }

    /// Get a diagnostic summary of the loaded profile.
    pub fn diagnostic_summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Persona: {}\n", self.name));
        summary.push_str(&format!("Summary: {} chars\n", self.summary.len()));
        summary.push_str(&format!("Document: {} chars\n", self.document.len()));
        summary.push_str(&format!("Profile: ~{} tokens\n", self.estimated_tokens()));
        summary.push_str(&format!("Files Loaded: {}\n", self.loaded_files.len()));
        for f in &self.loaded_files {
            summary.push_str(&format!("  - {f}\n"));
        }
        summary
    }
}
