//! # Schema Store
//!
//! Compiles schema documents once and hands out shared references to the
//! compiled form for the life of the store.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde_json::Value;

use super::BASE_URI;
use super::source::{SchemaSource, load_document};
use crate::error::{Error, Result};

/// A schema document compiled and ready for validation.
pub struct CompiledSchema {
    location: String,
    document: Value,
    validator: Validator,
}

impl CompiledSchema {
    /// The location the schema was loaded from.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The schema's declared `$id`, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.document.get("$id").and_then(Value::as_str)
    }

    /// The raw schema document.
    #[must_use]
    pub const fn document(&self) -> &Value {
        &self.document
    }

    pub(crate) const fn validator(&self) -> &Validator {
        &self.validator
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("location", &self.location)
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

/// Memoizing store of compiled schemas, keyed by location.
///
/// Entries are never invalidated. Concurrent requests for the same location
/// compile it once; later callers receive the same [`Arc`].
pub struct SchemaStore {
    source: Arc<dyn SchemaSource>,
    compiled: DashMap<String, Arc<CompiledSchema>>,
}

impl SchemaStore {
    /// Create an empty store backed by `source`.
    #[must_use]
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self {
            source,
            compiled: DashMap::new(),
        }
    }

    /// The source schemas are loaded from.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn SchemaSource> {
        &self.source
    }

    /// Get the compiled schema stored at `location`, compiling it on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`] if the location cannot be loaded
    /// and [`Error::SchemaMalformed`] if the document is not JSON or does not
    /// compile (including unresolvable `$ref`s).
    pub fn get(&self, location: &str) -> Result<Arc<CompiledSchema>> {
        if let Some(schema) = self.compiled.get(location) {
            return Ok(Arc::clone(schema.value()));
        }

        let entry = self
            .compiled
            .entry(location.to_string())
            .or_try_insert_with(|| self.compile(location).map(Arc::new))?;
        Ok(Arc::clone(entry.value()))
    }

    /// Number of compiled schemas held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// Whether no schema has been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    fn compile(&self, location: &str) -> Result<CompiledSchema> {
        tracing::debug!(location, "compiling schema");

        let document = load_document(self.source.as_ref(), location)?;
        let retriever = SourceRetriever {
            source: Arc::clone(&self.source),
        };

        let mut options = jsonschema::options();
        options.with_draft(Draft::Draft202012).with_retriever(retriever);
        let validator = options.build(&with_base_uri(&document, location)).map_err(|e| {
            Error::SchemaMalformed {
                location: location.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(CompiledSchema {
            location: location.to_string(),
            document,
            validator,
        })
    }
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore").field("compiled", &self.compiled.len()).finish()
    }
}

// A schema without an `$id` is compiled as if it declared one under
// `BASE_URI`, so its relative `$ref`s resolve against that base.
fn with_base_uri<'a>(document: &'a Value, location: &str) -> Cow<'a, Value> {
    match document {
        Value::Object(map) if !map.contains_key("$id") => {
            let mut map = map.clone();
            map.insert("$id".to_string(), Value::String(format!("{BASE_URI}/{location}")));
            Cow::Owned(Value::Object(map))
        }
        _ => Cow::Borrowed(document),
    }
}

// Resolves `$ref`s to other schemas through the store's source so that no
// reference is ever fetched over the network.
struct SourceRetriever {
    source: Arc<dyn SchemaSource>,
}

impl Retrieve for SourceRetriever {
    fn retrieve(
        &self, uri: &Uri<&str>,
    ) -> std::result::Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let location = self.source.locate(uri.as_str());
        tracing::debug!(uri = uri.as_str(), location, "resolving schema reference");

        let text = self.source.load(&location).map_err(|e| format!("{}: {e:#}", uri.as_str()))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use serde_json::json;

    use super::*;
    use crate::schema::{BundledSchemas, locations};

    #[derive(Default)]
    struct CountingSource {
        loads: AtomicUsize,
    }

    impl SchemaSource for CountingSource {
        fn load(&self, location: &str) -> anyhow::Result<String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            BundledSchemas.load(location)
        }
    }

    #[test]
    fn compiles_once() {
        let source = Arc::new(CountingSource::default());
        let store = SchemaStore::new(source.clone());

        let schemas: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| store.get(locations::NATURAL_PERSON_MINIMAL)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("should join").expect("should get"))
                .collect()
        });

        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
        assert!(schemas.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn resolves_references() {
        let store = SchemaStore::new(Arc::new(BundledSchemas));
        let schema = store.get(locations::NATURAL_PERSON).expect("should compile");
        assert_eq!(schema.location(), locations::NATURAL_PERSON);
        assert!(schema.id().is_some_and(|id| id.ends_with("natural-person.json")));
    }

    #[test]
    fn missing_schema() {
        let store = SchemaStore::new(Arc::new(BundledSchemas));
        let err = store.get("nowhere.json").expect_err("should fail");
        assert!(matches!(err, Error::ResourceNotFound { .. }));
        assert!(store.is_empty());
    }

    // References in a schema without an `$id` are resolved under the base URI.
    #[test]
    fn relative_reference_base() {
        #[derive(Default)]
        struct Anonymous {
            requested: Mutex<Vec<String>>,
        }
        impl SchemaSource for Anonymous {
            fn load(&self, location: &str) -> anyhow::Result<String> {
                let schema = match location {
                    "root.json" => json!({"$ref": "shared/name.json"}),
                    "name.json" => json!({"type": "string"}),
                    _ => anyhow::bail!("no schema at {location}"),
                };
                Ok(schema.to_string())
            }

            fn locate(&self, uri: &str) -> String {
                self.requested.lock().expect("should lock").push(uri.to_string());
                uri.rsplit('/').next().unwrap_or(uri).to_string()
            }
        }

        let source = Arc::new(Anonymous::default());
        let store = SchemaStore::new(source.clone());
        let schema = store.get("root.json").expect("should compile");
        assert_eq!(schema.id(), None);
        assert!(schema.validator().is_valid(&json!("Erika")));
        assert!(!schema.validator().is_valid(&json!(42)));

        let requested = source.requested.lock().expect("should lock");
        assert!(requested.contains(&format!("{BASE_URI}/shared/name.json")), "{requested:?}");
        assert!(requested.iter().all(|uri| uri.starts_with(BASE_URI)));
    }

    #[test]
    fn malformed_schema() {
        struct Broken;
        impl SchemaSource for Broken {
            fn load(&self, _: &str) -> anyhow::Result<String> {
                Ok(r#"{"type": 12}"#.to_string())
            }
        }

        let store = SchemaStore::new(Arc::new(Broken));
        let err = store.get("broken.json").expect_err("should fail");
        assert!(matches!(err, Error::SchemaMalformed { .. }));
    }
}
