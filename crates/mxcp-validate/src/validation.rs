//! Validation of MXCP documents against their schemas
//!
//! [`Validator::validate`] checks one file, [`Validator::validate_all`]
//! lazily checks every document below a directory. Neither fails on a bad
//! file: unreadable, unparseable and non-conforming files become
//! [`ValidationResult`]s so that one broken file never hides the others.

use jsonschema::error::{TypeKind, ValidationErrorKind};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config::{ReportMode, ValidatorConfig};
use crate::discovery::{Candidate, Discovery, SkipRules};
use crate::document::{
    class_from_content, class_from_location, parse_text, Document, DocumentClass, DocumentFormat,
    ParseFailure,
};
use crate::error::{Result, ValidationError};
use crate::schema::{SchemaRegistry, SchemaSource};

const UNRECOGNIZED_REASON: &str =
    "could not detect document type (missing 'mxcp' field or unknown structure)";

/// One step of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Location of a value inside a document, rendered `tool.parameters.0.type`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Build from an RFC 6901 JSON pointer such as `/tool/parameters/0`
    pub fn from_pointer(pointer: &str) -> Self {
        let segments = pointer
            .split('/')
            .skip(1)
            .map(|raw| {
                let token = raw.replace("~1", "/").replace("~0", "~");
                match token.parse::<usize>() {
                    Ok(index) if index.to_string() == token => PathSegment::Index(index),
                    _ => PathSegment::Key(token),
                }
            })
            .collect();
        Self(segments)
    }

    /// Path of a named child
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let segments = iter
            .into_iter()
            .map(|s| {
                let s = s.into();
                match s.parse::<usize>() {
                    Ok(index) if index.to_string() == s => PathSegment::Index(index),
                    _ => PathSegment::Key(s),
                }
            })
            .collect();
        Self(segments)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What kind of constraint a document broke
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ViolationKind {
    /// A required field is absent
    Required { property: String },
    /// A value has the wrong JSON type
    Type { expected: String, actual: String },
    /// A value is outside its enumeration
    Enum { allowed: Vec<String> },
    /// Keys the schema does not allow
    AdditionalProperties { unexpected: Vec<String> },
    /// Any other schema keyword
    Constraint { keyword: String },
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Offending field; for missing fields, the field itself
    pub path: FieldPath,
    /// Human-readable message
    pub message: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
    /// JSON pointer to the schema keyword that failed
    pub schema_path: String,
}

impl Violation {
    fn from_schema_error(error: &jsonschema::ValidationError<'_>) -> Self {
        let mut path = FieldPath::from_pointer(&error.instance_path.to_string());
        let schema_path = error.schema_path.to_string();

        let kind = match &error.kind {
            ValidationErrorKind::Required { property } => {
                let property = property
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| property.to_string());
                path = path.child(property.clone());
                ViolationKind::Required { property }
            }
            ValidationErrorKind::Type { kind } => ViolationKind::Type {
                expected: expected_types(kind),
                actual: json_type_name(&error.instance).to_string(),
            },
            ValidationErrorKind::Enum { options } => ViolationKind::Enum {
                allowed: options
                    .as_array()
                    .map(|values| values.iter().map(render_value).collect())
                    .unwrap_or_default(),
            },
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                ViolationKind::AdditionalProperties {
                    unexpected: unexpected.clone(),
                }
            }
            _ => ViolationKind::Constraint {
                keyword: schema_path.rsplit('/').next().unwrap_or_default().to_string(),
            },
        };

        let message = match &kind {
            ViolationKind::Type { actual, .. } => format!("{} (found {})", error, actual),
            _ => error.to_string(),
        };

        Self {
            path,
            message,
            kind,
            schema_path,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "At {}: {}", self.path, self.message)
    }
}

fn expected_types(kind: &TypeKind) -> String {
    match kind {
        TypeKind::Single(ty) => ty.to_string(),
        TypeKind::Multiple(types) => types
            .into_iter()
            .map(|ty| ty.to_string())
            .collect::<Vec<_>>()
            .join(" or "),
    }
}

/// JSON type name, distinguishing integers from other numbers
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Outcome of validating one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Conforms to its schema
    Valid,
    /// Text is not valid YAML/JSON
    ParseError(ParseFailure),
    /// Parsed but breaks the schema; never empty
    Violations(Vec<Violation>),
    /// Class could not be determined
    Unrecognized { reason: String },
    /// File could not be read
    Unreadable { message: String },
}

/// Result of validating one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// File that was validated
    pub path: PathBuf,
    /// Resolved class, when known
    pub class: Option<DocumentClass>,
    pub outcome: Outcome,
}

impl ValidationResult {
    fn new(path: &Path, class: Option<DocumentClass>, outcome: Outcome) -> Self {
        Self {
            path: path.to_path_buf(),
            class,
            outcome,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, Outcome::Valid)
    }

    /// Schema violations; empty unless the outcome is `Violations`
    pub fn violations(&self) -> &[Violation] {
        match &self.outcome {
            Outcome::Violations(violations) => violations,
            _ => &[],
        }
    }

    pub fn parse_failure(&self) -> Option<&ParseFailure> {
        match &self.outcome {
            Outcome::ParseError(failure) => Some(failure),
            _ => None,
        }
    }

    /// Short status label
    pub fn status(&self) -> &'static str {
        match self.outcome {
            Outcome::Valid => "valid",
            Outcome::ParseError(_) => "parse-error",
            Outcome::Violations(_) => "invalid",
            Outcome::Unrecognized { .. } => "unrecognized",
            Outcome::Unreadable { .. } => "unreadable",
        }
    }

    /// One line per problem, suitable for printing under the file name
    pub fn messages(&self) -> Vec<String> {
        match &self.outcome {
            Outcome::Valid => Vec::new(),
            Outcome::ParseError(failure) => vec![failure.message.clone()],
            Outcome::Violations(violations) => violations.iter().map(|v| v.to_string()).collect(),
            Outcome::Unrecognized { reason } => vec![reason.clone()],
            Outcome::Unreadable { message } => vec![message.clone()],
        }
    }
}

/// Validates documents against the schema of their class
#[derive(Debug)]
pub struct Validator {
    registry: SchemaRegistry,
    config: ValidatorConfig,
    skip_rules: SkipRules,
}

impl Validator {
    /// Create a validator from a loaded registry
    pub fn new(registry: SchemaRegistry, config: ValidatorConfig) -> Result<Self> {
        let skip_rules = SkipRules::from_config(&config)?;
        Ok(Self {
            registry,
            config,
            skip_rules,
        })
    }

    /// Load the registry named by the config and create a validator
    pub fn from_config(config: ValidatorConfig) -> Result<Self> {
        let source = SchemaSource::from_option(config.schemas_dir.as_deref());
        let registry = SchemaRegistry::load(&source)?;
        Self::new(registry, config)
    }

    /// Validator over the bundled schemas with default settings
    pub fn builtin() -> Result<Self> {
        Self::new(SchemaRegistry::builtin()?, ValidatorConfig::default())
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate one file, resolving its class from its path and content
    pub fn validate(&self, path: &Path) -> ValidationResult {
        self.check_file(path, None)
    }

    /// Validate one file as the given class
    pub fn validate_as(&self, path: &Path, class: DocumentClass) -> ValidationResult {
        self.check_file(path, Some(class))
    }

    /// Validate in-memory text; `path` drives format and class resolution
    pub fn validate_str(&self, path: &Path, content: &str) -> ValidationResult {
        self.check_text(path, content, None)
    }

    /// Structural check of a parsed tree against a class schema
    pub fn validate_value(&self, class: DocumentClass, root: &Value) -> Vec<Violation> {
        let errors = self.registry.validator(class).iter_errors(root);
        let limit = match self.config.report_mode {
            ReportMode::All => usize::MAX,
            ReportMode::First => 1,
        };
        errors
            .take(limit)
            .map(|error| Violation::from_schema_error(&error))
            .collect()
    }

    /// Structural check of a parsed document
    pub fn validate_document(&self, document: &Document) -> Vec<Violation> {
        self.validate_value(document.class, &document.root)
    }

    /// Lazily validate every document below `root`, in path order
    pub fn validate_all(&self, root: &Path) -> Result<ValidationRun<'_>> {
        if !root.is_dir() {
            return Err(ValidationError::invalid_input(format!(
                "Not a directory: {}",
                root.display()
            )));
        }
        tracing::debug!(root = %root.display(), "starting batch validation");
        Ok(ValidationRun {
            validator: self,
            discovery: Discovery::new(root, self.skip_rules.clone()),
        })
    }

    fn check_file(&self, path: &Path, forced: Option<DocumentClass>) -> ValidationResult {
        match std::fs::read_to_string(path) {
            Ok(content) => self.check_text(path, &content, forced),
            Err(e) => ValidationResult::new(
                path,
                forced.or_else(|| class_from_location(path)),
                Outcome::Unreadable {
                    message: format!("Failed to read file: {}", e),
                },
            ),
        }
    }

    fn check_text(
        &self,
        path: &Path,
        content: &str,
        forced: Option<DocumentClass>,
    ) -> ValidationResult {
        let path_class = forced.or_else(|| class_from_location(path));

        let root = match parse_text(DocumentFormat::from_path(path), content) {
            Ok(root) => root,
            Err(failure) => {
                return ValidationResult::new(path, path_class, Outcome::ParseError(failure))
            }
        };

        let Some(class) = path_class.or_else(|| class_from_content(&root)) else {
            return ValidationResult::new(
                path,
                None,
                Outcome::Unrecognized {
                    reason: UNRECOGNIZED_REASON.to_string(),
                },
            );
        };
        tracing::debug!(path = %path.display(), %class, "resolved document class");

        let document = Document::new(path, class, root);
        let violations = self.validate_document(&document);
        let outcome = if violations.is_empty() {
            Outcome::Valid
        } else {
            Outcome::Violations(violations)
        };
        ValidationResult::new(path, Some(class), outcome)
    }
}

/// Lazy, finite sequence of results produced by [`Validator::validate_all`]
pub struct ValidationRun<'a> {
    validator: &'a Validator,
    discovery: Discovery,
}

impl ValidationRun<'_> {
    pub fn root(&self) -> &Path {
        self.discovery.root()
    }

    fn keep(&self, result: &ValidationResult) -> bool {
        let config = &self.validator.config;
        // JSON files are documents only when their class is known
        if result.class.is_none() && DocumentFormat::from_path(&result.path) == DocumentFormat::Json
        {
            tracing::debug!(path = %result.path.display(), "skipping non-MXCP JSON file");
            return false;
        }
        if matches!(result.outcome, Outcome::Unrecognized { .. }) && !config.report_unrecognized {
            tracing::debug!(path = %result.path.display(), "skipping unrecognized file");
            return false;
        }
        if result.class == Some(DocumentClass::Eval) && !config.include_evals {
            tracing::debug!(path = %result.path.display(), "skipping eval suite");
            return false;
        }
        true
    }
}

impl Iterator for ValidationRun<'_> {
    type Item = ValidationResult;

    fn next(&mut self) -> Option<ValidationResult> {
        loop {
            let result = match self.discovery.next()? {
                Candidate::File { path, .. } => self.validator.check_file(&path, None),
                Candidate::Unreadable { path, message } => {
                    let class = class_from_location(&path);
                    ValidationResult::new(&path, class, Outcome::Unreadable { message })
                }
            };
            if self.keep(&result) {
                return Some(result);
            }
        }
    }
}
