//! Client preferences stored in prefs.kdl.
//!
//! One KDL file in the data directory holds everything the interface
//! remembers between sessions: preferred output format, the active sort
//! mode, and the user's saved views. Loading is deliberately forgiving:
//! a missing file, unparseable KDL, or a malformed value all fall back
//! to defaults so a stale or hand-edited file never blocks startup.
//!
//! # KDL Schema
//!
//! ```kdl
//! // Client preferences - safe to sync across machines
//! output-format "human"  // or "json"
//! sort-mode "due_date"   // "manual", "due_date", or "created_date"
//! // view <id> <name> <filter query string>
//! view "9f0c2f64-58a1-4a3e-9d20-1f6c4a6b2e11" "Errands" "categories=none"
//! ```

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;
use crate::filters::TaskFilters;
use crate::grouping::SortMode;
use crate::views::{SavedView, SavedViews};

/// Preferences file name inside the data directory.
pub const PREFS_FILE: &str = "prefs.kdl";

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the client remembers between sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prefs {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Sort order applied within each task bucket
    pub sort_mode: Option<SortMode>,

    /// User-created saved views
    pub views: SavedViews,
}

impl Prefs {
    /// Create empty preferences with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse preferences from a KDL document.
    ///
    /// Unknown nodes and malformed values are skipped, keeping old files
    /// readable after the schema grows.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut prefs = Self::new();

        if let Some(node) = doc.get("output-format") {
            if let Some(s) = get_string_arg(node) {
                prefs.output_format = OutputFormat::parse(&s);
            }
        }

        if let Some(node) = doc.get("sort-mode") {
            if let Some(s) = get_string_arg(node) {
                prefs.sort_mode = s.parse().ok();
            }
        }

        let mut views = Vec::new();
        for node in doc.nodes() {
            if node.name().value() == "view" {
                if let Some(view) = view_from_node(node) {
                    views.push(view);
                }
            }
        }
        prefs.views = SavedViews::from_views(views);

        prefs
    }

    /// Convert preferences to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref format) = self.output_format {
            let mut node = KdlNode::new("output-format");
            node.push(KdlEntry::new(KdlValue::String(format.as_str().to_string())));
            doc.nodes_mut().push(node);
        }

        if let Some(mode) = self.sort_mode {
            let mut node = KdlNode::new("sort-mode");
            node.push(KdlEntry::new(KdlValue::String(mode.to_string())));
            doc.nodes_mut().push(node);
        }

        for view in self.views.user_views() {
            let mut node = KdlNode::new("view");
            node.push(KdlEntry::new(KdlValue::String(view.id.clone())));
            node.push(KdlEntry::new(KdlValue::String(view.name.clone())));
            node.push(KdlEntry::new(KdlValue::String(
                view.filters.to_query_string(),
            )));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Load preferences from the data directory, falling back to defaults
    /// when the file is missing or unreadable.
    pub fn load(data_dir: &Path) -> Self {
        let path = prefs_path(data_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match content.parse::<KdlDocument>() {
            Ok(doc) => Self::from_kdl(&doc),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unreadable prefs file");
                Self::default()
            }
        }
    }

    /// Write preferences to the data directory.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = prefs_path(data_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_kdl().to_string())?;
        Ok(())
    }

    /// Read a settable preference by key.
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        match key {
            "output-format" => Ok(self.output_format.as_ref().map(|f| f.to_string())),
            "sort-mode" => Ok(self.sort_mode.map(|m| m.to_string())),
            _ => Err(unknown_key(key)),
        }
    }

    /// Set a preference by key, validating the value.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output-format" => {
                let format = OutputFormat::parse(value).ok_or_else(|| {
                    crate::Error::InvalidInput(format!(
                        "output-format must be \"json\" or \"human\", got: {}",
                        value
                    ))
                })?;
                self.output_format = Some(format);
            }
            "sort-mode" => {
                let mode: SortMode = value.parse().map_err(crate::Error::InvalidInput)?;
                self.sort_mode = Some(mode);
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// All settable keys with their current values, for `config list`.
    pub fn entries(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            (
                "output-format",
                self.output_format.as_ref().map(|f| f.to_string()),
            ),
            ("sort-mode", self.sort_mode.map(|m| m.to_string())),
        ]
    }
}

/// Path of the preferences file inside a data directory.
pub fn prefs_path(data_dir: &Path) -> PathBuf {
    data_dir.join(PREFS_FILE)
}

fn unknown_key(key: &str) -> crate::Error {
    crate::Error::InvalidInput(format!(
        "Unknown config key: {} (known keys: output-format, sort-mode)",
        key
    ))
}

/// Get a string argument from a node's first entry.
fn get_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Parse a `view <id> <name> <query>` node. Nodes missing any of the
/// three arguments are dropped.
fn view_from_node(node: &KdlNode) -> Option<SavedView> {
    let entries = node.entries();
    let id = entries.first()?.value().as_string()?;
    let name = entries.get(1)?.value().as_string()?;
    let query = entries.get(2)?.value().as_string()?;
    Some(SavedView {
        id: id.to_string(),
        name: name.to_string(),
        filters: TaskFilters::from_query_string(query),
        is_system: false,
    })
}
