//! Schema registry
//!
//! Loads one JSON Schema (Draft 7) per document class plus the shared
//! common-types schema, resolves cross-file `$ref`s from the loaded set and
//! compiles a validator per class. The registry is immutable once built.

use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::document::DocumentClass;
use crate::error::{Result, ValidationError};

/// Identifier of the schema holding shared definitions
pub const COMMON_SCHEMA_ID: &str = "common-types-schema-1";

const BUILTIN_SCHEMAS: &[(&str, &str)] = &[
    (
        "common-types-schema-1",
        include_str!("../schemas/common-types-schema-1.json"),
    ),
    (
        "mxcp-site-schema-1",
        include_str!("../schemas/mxcp-site-schema-1.json"),
    ),
    (
        "mxcp-config-schema-1",
        include_str!("../schemas/mxcp-config-schema-1.json"),
    ),
    ("tool-schema-1", include_str!("../schemas/tool-schema-1.json")),
    (
        "resource-schema-1",
        include_str!("../schemas/resource-schema-1.json"),
    ),
    ("prompt-schema-1", include_str!("../schemas/prompt-schema-1.json")),
    ("eval-schema-1", include_str!("../schemas/eval-schema-1.json")),
];

/// Where the schema documents came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// Schemas bundled with the binary
    Builtin,
    /// `*-schema-*.json` files in a directory
    Directory(PathBuf),
}

impl SchemaSource {
    /// Directory source when given, bundled schemas otherwise
    pub fn from_option(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => SchemaSource::Directory(dir.to_path_buf()),
            None => SchemaSource::Builtin,
        }
    }
}

impl std::fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaSource::Builtin => f.write_str("bundled schemas"),
            SchemaSource::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Compiled schemas, one per document class
pub struct SchemaRegistry {
    source: SchemaSource,
    documents: BTreeMap<String, Value>,
    // Indexed by `DocumentClass::index`
    validators: Vec<Validator>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("source", &self.source)
            .field("schemas", &self.documents.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaRegistry {
    /// Load the schemas bundled with the binary
    pub fn builtin() -> Result<Self> {
        let mut documents = BTreeMap::new();
        for (id, text) in BUILTIN_SCHEMAS {
            let value: Value = serde_json::from_str(text).map_err(|e| {
                ValidationError::schema_load(format!("bundled schema '{}' is malformed: {}", id, e))
            })?;
            documents.insert((*id).to_string(), value);
        }
        Self::from_documents(SchemaSource::Builtin, documents)
    }

    /// Load every `*-schema-*.json` file in `dir`; the file stem is the id
    pub fn from_directory(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ValidationError::schema_load(format!(
                "schemas directory not found: {}",
                dir.display()
            )));
        }

        let entries = std::fs::read_dir(dir).map_err(|e| {
            ValidationError::schema_load(format!(
                "failed to read schemas directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let mut documents = BTreeMap::new();
        for entry in entries {
            let path = entry
                .map_err(|e| ValidationError::schema_load(e.to_string()))?
                .path();
            let Some(id) = schema_id_for_file(&path) else {
                continue;
            };

            let text = std::fs::read_to_string(&path).map_err(|e| {
                ValidationError::schema_load(format!(
                    "failed to read schema file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                ValidationError::schema_load(format!(
                    "schema file '{}' is malformed: {}",
                    path.display(),
                    e
                ))
            })?;
            tracing::debug!(schema = %id, path = %path.display(), "loaded schema file");
            documents.insert(id, value);
        }

        Self::from_documents(SchemaSource::Directory(dir.to_path_buf()), documents)
    }

    /// Load from the given source
    pub fn load(source: &SchemaSource) -> Result<Self> {
        match source {
            SchemaSource::Builtin => Self::builtin(),
            SchemaSource::Directory(dir) => Self::from_directory(dir),
        }
    }

    /// Compile a registry from already parsed schema documents keyed by id.
    ///
    /// Fails unless the common-types schema and every class schema are
    /// present and compile.
    pub fn from_documents(source: SchemaSource, documents: BTreeMap<String, Value>) -> Result<Self> {
        if !documents.contains_key(COMMON_SCHEMA_ID) {
            return Err(ValidationError::schema_load(format!(
                "common schema '{}' not found in {}",
                COMMON_SCHEMA_ID, source
            )));
        }

        let mut validators = Vec::with_capacity(DocumentClass::ALL.len());
        for class in DocumentClass::ALL {
            let id = class.schema_id();
            let schema = documents.get(id).ok_or_else(|| {
                ValidationError::schema_load(format!(
                    "schema '{}' for {} files not found in {}",
                    id,
                    class.description(),
                    source
                ))
            })?;

            let retriever = RegistryRetriever {
                documents: documents.clone(),
            };
            let validator = jsonschema::options()
                .with_draft(Draft::Draft7)
                .with_retriever(retriever)
                .build(schema)
                .map_err(|e| {
                    ValidationError::schema_load(format!("schema '{}' does not compile: {}", id, e))
                })?;
            validators.push(validator);
        }

        tracing::info!(source = %source, schemas = documents.len(), "schema registry loaded");

        Ok(Self {
            source,
            documents,
            validators,
        })
    }

    /// Compiled validator for a class
    pub fn validator(&self, class: DocumentClass) -> &Validator {
        &self.validators[class.index()]
    }

    /// Raw schema document by id
    pub fn schema(&self, id: &str) -> Option<&Value> {
        self.documents.get(id)
    }

    /// Raw schema document for a class
    pub fn schema_for(&self, class: DocumentClass) -> Option<&Value> {
        self.schema(class.schema_id())
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    /// Ids of all loaded schema documents, sorted
    pub fn schema_ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}

/// Schema id for a file named like `tool-schema-1.json`
fn schema_id_for_file(path: &Path) -> Option<String> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.contains("-schema-").then(|| stem.to_string())
}

/// Serves cross-file `$ref`s by matching the last URI path segment
/// against the loaded schema ids.
struct RegistryRetriever {
    documents: BTreeMap<String, Value>,
}

impl Retrieve for RegistryRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> std::result::Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let without_fragment = uri.as_str().split('#').next().unwrap_or_default();
        let name = without_fragment.rsplit('/').next().unwrap_or_default();
        let id = name.strip_suffix(".json").unwrap_or(name);

        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| format!("schema '{}' is not part of the registry", uri.as_str()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builtin_documents() -> BTreeMap<String, Value> {
        BUILTIN_SCHEMAS
            .iter()
            .map(|(id, text)| (id.to_string(), serde_json::from_str(text).unwrap()))
            .collect()
    }

    #[test]
    fn test_builtin_registry_loads() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert_eq!(registry.source(), &SchemaSource::Builtin);
        assert_eq!(registry.schema_ids().count(), 7);
        for class in DocumentClass::ALL {
            assert!(registry.schema_for(class).is_some(), "{} missing", class);
        }
    }

    #[test]
    fn test_common_refs_resolve() {
        let registry = SchemaRegistry::builtin().unwrap();
        let validator = registry.validator(DocumentClass::Tool);
        let bad = json!({
            "mxcp": 1,
            "tool": {"name": "x", "source": {"code": "SELECT 1"}, "language": "ruby"}
        });
        assert!(!validator.is_valid(&bad));
        let good = json!({
            "mxcp": 1,
            "tool": {"name": "x", "source": {"code": "SELECT 1"}, "language": "sql"}
        });
        assert!(validator.is_valid(&good));
    }

    #[test]
    fn test_missing_common_schema() {
        let mut documents = builtin_documents();
        documents.remove(COMMON_SCHEMA_ID);
        let err = SchemaRegistry::from_documents(SchemaSource::Builtin, documents).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaLoad(_)));
        assert!(err.to_string().contains(COMMON_SCHEMA_ID));
    }

    #[test]
    fn test_missing_class_schema() {
        let mut documents = builtin_documents();
        documents.remove("prompt-schema-1");
        let err = SchemaRegistry::from_documents(SchemaSource::Builtin, documents).unwrap_err();
        assert!(err.to_string().contains("prompt-schema-1"));
    }

    #[test]
    fn test_schema_that_does_not_compile() {
        let mut documents = builtin_documents();
        documents.insert("eval-schema-1".to_string(), json!({"type": 12}));
        let err = SchemaRegistry::from_documents(SchemaSource::Builtin, documents).unwrap_err();
        assert!(err.to_string().contains("does not compile"));
    }

    #[test]
    fn test_schema_id_for_file() {
        assert_eq!(
            schema_id_for_file(Path::new("schemas/tool-schema-1.json")),
            Some("tool-schema-1".to_string())
        );
        assert_eq!(schema_id_for_file(Path::new("schemas/README.json")), None);
        assert_eq!(schema_id_for_file(Path::new("schemas/tool-schema-1.yaml")), None);
    }

    #[test]
    fn test_missing_directory() {
        let err = SchemaRegistry::from_directory(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaLoad(_)));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(SchemaSource::Builtin.to_string(), "bundled schemas");
        assert_eq!(
            SchemaSource::from_option(Some(Path::new("/tmp/s"))),
            SchemaSource::Directory(PathBuf::from("/tmp/s"))
        );
    }
}
