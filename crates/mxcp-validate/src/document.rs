//! Document classes and parsing
//!
//! A document is a YAML or JSON file parsed into a [`serde_json::Value`]
//! tree. Its class decides which schema applies and is resolved from the
//! file location first, then from the top-level keys of the content.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// Category of an MXCP file, one per schema
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DocumentClass {
    /// Project configuration (`mxcp-site.yml`)
    Site,
    /// User configuration and secrets (`config.yml`)
    Config,
    /// Tool definition (`tools/`)
    Tool,
    /// Resource definition (`resources/`)
    Resource,
    /// Prompt definition (`prompts/`)
    Prompt,
    /// Evaluation suite (`evals/`)
    Eval,
}

impl DocumentClass {
    /// Every class, in schema registry order
    pub const ALL: [DocumentClass; 6] = [
        DocumentClass::Site,
        DocumentClass::Config,
        DocumentClass::Tool,
        DocumentClass::Resource,
        DocumentClass::Prompt,
        DocumentClass::Eval,
    ];

    /// Identifier of the schema (file stem) for this class
    pub fn schema_id(self) -> &'static str {
        match self {
            DocumentClass::Site => "mxcp-site-schema-1",
            DocumentClass::Config => "mxcp-config-schema-1",
            DocumentClass::Tool => "tool-schema-1",
            DocumentClass::Resource => "resource-schema-1",
            DocumentClass::Prompt => "prompt-schema-1",
            DocumentClass::Eval => "eval-schema-1",
        }
    }

    /// Short lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentClass::Site => "site",
            DocumentClass::Config => "config",
            DocumentClass::Tool => "tool",
            DocumentClass::Resource => "resource",
            DocumentClass::Prompt => "prompt",
            DocumentClass::Eval => "eval",
        }
    }

    /// Human-readable description
    pub fn description(self) -> &'static str {
        match self {
            DocumentClass::Site => "project configuration",
            DocumentClass::Config => "user configuration and secrets",
            DocumentClass::Tool => "tool definition",
            DocumentClass::Resource => "resource definition",
            DocumentClass::Prompt => "prompt definition",
            DocumentClass::Eval => "evaluation suite",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the path lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    /// Exact file name, compared case-insensitively
    FileName(&'static str),
    /// Name of an ancestor directory
    Directory(&'static str),
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathPattern::FileName(name) => f.write_str(name),
            PathPattern::Directory(name) => write!(f, "{}/", name),
        }
    }
}

/// Path patterns in evaluation order. File names win over directories.
pub const PATH_RULES: &[(PathPattern, DocumentClass)] = &[
    (PathPattern::FileName("mxcp-site.yml"), DocumentClass::Site),
    (PathPattern::FileName("mxcp-site.yaml"), DocumentClass::Site),
    (PathPattern::FileName("config.yml"), DocumentClass::Config),
    (PathPattern::FileName("config.yaml"), DocumentClass::Config),
    (PathPattern::Directory("tools"), DocumentClass::Tool),
    (PathPattern::Directory("resources"), DocumentClass::Resource),
    (PathPattern::Directory("prompts"), DocumentClass::Prompt),
    (PathPattern::Directory("evals"), DocumentClass::Eval),
];

/// Files whose directory is an MXCP project root
pub const PROJECT_MARKERS: &[&str] = &["mxcp-site.yml", "mxcp-site.yaml"];

/// Directory levels above a file that the directory rules look at
const DIRECTORY_DEPTH: usize = 2;

/// Resolve a class from the file location alone.
///
/// Only the parent directory and its parent are considered, nearest first,
/// so `tools/jira/search.yml` is a tool while directories further up (a
/// checkout named `prompts/`, say) never decide.
pub fn class_from_path(path: &Path) -> Option<DocumentClass> {
    if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
        let file_name = file_name.to_lowercase();
        let by_name = PATH_RULES.iter().find_map(|(pattern, class)| match pattern {
            PathPattern::FileName(name) if *name == file_name => Some(*class),
            _ => None,
        });
        if by_name.is_some() {
            return by_name;
        }
    }

    let parent = path.parent()?;
    parent
        .components()
        .rev()
        .take(DIRECTORY_DEPTH)
        .find_map(|component| {
            let Component::Normal(dir) = component else {
                return None;
            };
            let dir = dir.to_str()?;
            PATH_RULES.iter().find_map(|(pattern, class)| match pattern {
                PathPattern::Directory(name) if *name == dir => Some(*class),
                _ => None,
            })
        })
}

/// Nearest ancestor directory of `path` holding an `mxcp-site.yml`
pub fn project_root(path: &Path) -> Option<&Path> {
    path.ancestors()
        .skip(1)
        .find(|dir| PROJECT_MARKERS.iter().any(|marker| dir.join(marker).is_file()))
}

/// Resolve a class from where a file sits on disk.
///
/// Directories above the enclosing project root are ignored, so the result
/// is the same whether the file is validated alone or as part of a batch.
pub fn class_from_location(path: &Path) -> Option<DocumentClass> {
    let within = project_root(path)
        .and_then(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);
    class_from_path(within)
}

/// Resolve a class from the top-level keys of a parsed document.
///
/// Only documents carrying the `mxcp` version key are considered.
pub fn class_from_content(root: &Value) -> Option<DocumentClass> {
    let obj = root.as_object()?;
    if !obj.contains_key("mxcp") {
        return None;
    }

    if obj.contains_key("tool") {
        Some(DocumentClass::Tool)
    } else if obj.contains_key("resource") {
        Some(DocumentClass::Resource)
    } else if obj.contains_key("prompt") {
        Some(DocumentClass::Prompt)
    } else if obj.contains_key("suite") && obj.contains_key("tests") {
        Some(DocumentClass::Eval)
    } else if obj.contains_key("project") {
        Some(DocumentClass::Site)
    } else if obj.contains_key("projects") {
        Some(DocumentClass::Config)
    } else {
        None
    }
}

/// Text format of a document file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// `.json` files are JSON; everything else is read as YAML
    pub fn from_path(path: &Path) -> Self {
        match extension(path).as_deref() {
            Some("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Whether the file extension marks a document the validator understands
pub fn is_document_file(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("yml" | "yaml" | "json"))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Why a document's text could not be turned into a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    /// Parser message
    pub message: String,
    /// 1-based line, when the parser reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based column, when the parser reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl ParseFailure {
    /// Create a failure without a location
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Attach a location
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Parse document text into a tree
pub fn parse_text(format: DocumentFormat, content: &str) -> Result<Value, ParseFailure> {
    let blank = content
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'));
    if blank {
        return Err(ParseFailure::new("document is empty"));
    }

    let value = match format {
        DocumentFormat::Yaml => parse_yaml(content)?,
        DocumentFormat::Json => serde_json::from_str::<Value>(content).map_err(|e| {
            let failure = ParseFailure::new(format!("JSON parsing error: {}", e));
            if e.line() > 0 {
                failure.at(e.line(), e.column())
            } else {
                failure
            }
        })?,
    };

    if value.is_null() {
        return Err(ParseFailure::new("document is empty"));
    }
    Ok(value)
}

/// YAML with `<<` merge keys applied, as a JSON tree
fn parse_yaml(content: &str) -> Result<Value, ParseFailure> {
    let mut yaml = serde_yaml::from_str::<serde_yaml::Value>(content).map_err(yaml_failure)?;
    yaml.apply_merge().map_err(yaml_failure)?;
    serde_json::to_value(yaml)
        .map_err(|e| ParseFailure::new(format!("YAML parsing error: {}", e)))
}

fn yaml_failure(e: serde_yaml::Error) -> ParseFailure {
    let failure = ParseFailure::new(format!("YAML parsing error: {}", e));
    match e.location() {
        Some(loc) => failure.at(loc.line(), loc.column()),
        None => failure,
    }
}

/// A parsed document with its resolved class
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: PathBuf,
    pub class: DocumentClass,
    pub root: Value,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, class: DocumentClass, root: Value) -> Self {
        Self {
            path: path.into(),
            class,
            root,
        }
    }
}
