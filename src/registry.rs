//! # Subtype Registry
//!
//! Maps schema identifiers, as carried in a report's `subjectRefType`, to the
//! subject kind they describe. New subject shapes are added by registration;
//! the report decoder never changes.
//!
//! A registry is an ordinary value owned by the application. Built-in kinds
//! are added by an explicit call to [`SubtypeRegistry::seed`].

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::report::subject::{CustomAuthentication, SubjectRef};
use crate::schema::source::load_document;
use crate::schema::{SchemaSource, locations};

/// A concrete subject reference shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    /// Natural person identified by an electronic identity.
    NaturalPerson,

    /// Legal person.
    LegalPerson,

    /// Given and family name only.
    NaturalPersonMinimal,

    /// Natural person authenticated with a German eID card.
    Eid,

    /// Natural person authenticated by a bank.
    FinkBanking,

    /// A caller-defined kind, decoded as a [`CustomAuthentication`].
    Custom(CustomKind),
}

/// A caller-defined subject kind, described by its own schema document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CustomKind {
    /// Name of the kind. Informational only.
    pub name: String,

    /// Location of the kind's schema in the registry's schema source.
    pub schema_location: String,
}

impl CustomKind {
    /// Create a custom kind whose schema lives at `schema_location`.
    pub fn new(name: impl Into<String>, schema_location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_location: schema_location.into(),
        }
    }
}

impl SubjectKind {
    /// The kinds shipped with the crate.
    pub const BUILT_IN: [Self; 5] = [
        Self::NaturalPerson,
        Self::LegalPerson,
        Self::NaturalPersonMinimal,
        Self::Eid,
        Self::FinkBanking,
    ];

    /// Location of the schema describing this kind.
    #[must_use]
    pub fn schema_location(&self) -> &str {
        match self {
            Self::NaturalPerson => locations::NATURAL_PERSON,
            Self::LegalPerson => locations::LEGAL_PERSON,
            Self::NaturalPersonMinimal => locations::NATURAL_PERSON_MINIMAL,
            Self::Eid => locations::EID_AUTHENTICATION,
            Self::FinkBanking => locations::FINK_BANKING,
            Self::Custom(custom) => &custom.schema_location,
        }
    }

    /// Decode a `subjectRef` document as this kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not have the kind's shape.
    pub fn decode(&self, document: Value) -> Result<SubjectRef> {
        let subject = match self {
            Self::NaturalPerson => SubjectRef::NaturalPerson(serde_json::from_value(document)?),
            Self::LegalPerson => SubjectRef::LegalPerson(serde_json::from_value(document)?),
            Self::NaturalPersonMinimal => {
                SubjectRef::NaturalPersonMinimal(serde_json::from_value(document)?)
            }
            Self::Eid => SubjectRef::Eid(serde_json::from_value(document)?),
            Self::FinkBanking => SubjectRef::FinkBanking(serde_json::from_value(document)?),
            Self::Custom(kind) => SubjectRef::Custom(CustomAuthentication {
                kind: kind.clone(),
                fields: serde_json::from_value(document)?,
            }),
        };
        Ok(subject)
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NaturalPerson => write!(f, "NaturalPersonAuthentication"),
            Self::LegalPerson => write!(f, "LegalPersonAuthentication"),
            Self::NaturalPersonMinimal => write!(f, "NaturalPersonMinimalAuthentication"),
            Self::Eid => write!(f, "EidAuthentication"),
            Self::FinkBanking => write!(f, "FinkBankingAuthentication"),
            Self::Custom(custom) => write!(f, "{}", custom.name),
        }
    }
}

/// Registry of subject kinds keyed by schema identifier.
///
/// Safe to share between threads. Registration and lookup may interleave
/// freely; a lookup sees either the old or the new association.
pub struct SubtypeRegistry {
    source: Arc<dyn SchemaSource>,
    subtypes: DashMap<String, SubjectKind>,
    schema_ids: DashMap<SubjectKind, String>,
}

impl SubtypeRegistry {
    /// Create an empty registry reading schema documents from `source`.
    #[must_use]
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self {
            source,
            subtypes: DashMap::new(),
            schema_ids: DashMap::new(),
        }
    }

    /// Create a registry seeded with the built-in kinds.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in schema cannot be read.
    pub fn with_builtins(source: Arc<dyn SchemaSource>) -> Result<Self> {
        let registry = Self::new(source);
        registry.seed()?;
        Ok(registry)
    }

    /// Register every built-in kind under the `$id` declared by its schema.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in schema cannot be read or lacks `$id`.
    pub fn seed(&self) -> Result<()> {
        for kind in SubjectKind::BUILT_IN {
            let id = self.schema_id_of(&kind)?;
            self.register(id, kind);
        }
        Ok(())
    }

    /// Associate `schema_id` with `kind`, replacing any earlier association.
    pub fn register(&self, schema_id: impl Into<String>, kind: SubjectKind) {
        let schema_id = schema_id.into();
        tracing::debug!(schema_id, %kind, "registering subject kind");
        self.subtypes.insert(schema_id, kind);
    }

    /// The kind registered for `schema_id`, if any.
    #[must_use]
    pub fn resolve(&self, schema_id: &str) -> Option<SubjectKind> {
        self.subtypes.get(schema_id).map(|entry| entry.value().clone())
    }

    /// The `$id` declared by the schema of `kind`. Read once per kind and
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMalformed`] if the schema has no string `$id`,
    /// or an error from loading the schema.
    pub fn schema_id_of(&self, kind: &SubjectKind) -> Result<String> {
        if let Some(id) = self.schema_ids.get(kind) {
            return Ok(id.value().clone());
        }

        let entry = self.schema_ids.entry(kind.clone()).or_try_insert_with(|| {
            let location = kind.schema_location();
            let document = load_document(self.source.as_ref(), location)?;
            document.get("$id").and_then(Value::as_str).map(ToString::to_string).ok_or_else(
                || Error::SchemaMalformed {
                    location: location.to_string(),
                    reason: "schema declares no `$id`".to_string(),
                },
            )
        })?;
        Ok(entry.value().clone())
    }

    /// Snapshot of the registered schema identifiers, sorted.
    #[must_use]
    pub fn registered(&self) -> Vec<String> {
        let mut ids = self.subtypes.iter().map(|entry| entry.key().clone()).collect::<Vec<_>>();
        ids.sort();
        ids
    }
}

impl fmt::Debug for SubtypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtypeRegistry").field("subtypes", &self.registered()).finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::schema::{BundledSchemas, ids};

    #[test]
    fn seeds_built_ins() {
        let registry =
            SubtypeRegistry::with_builtins(Arc::new(BundledSchemas)).expect("should seed");

        assert_eq!(registry.resolve(ids::NATURAL_PERSON), Some(SubjectKind::NaturalPerson));
        assert_eq!(registry.resolve(ids::LEGAL_PERSON), Some(SubjectKind::LegalPerson));
        assert_eq!(
            registry.resolve(ids::NATURAL_PERSON_MINIMAL),
            Some(SubjectKind::NaturalPersonMinimal)
        );
        assert_eq!(registry.resolve(ids::EID_AUTHENTICATION), Some(SubjectKind::Eid));
        assert_eq!(registry.resolve(ids::FINK_BANKING), Some(SubjectKind::FinkBanking));
        assert_eq!(registry.registered().len(), 5);
        assert_eq!(registry.resolve("https://example.com/unknown.json"), None);
    }

    #[test]
    fn register_overwrites() {
        let registry = SubtypeRegistry::new(Arc::new(BundledSchemas));
        registry.register("urn:subject", SubjectKind::Eid);
        registry.register("urn:subject", SubjectKind::FinkBanking);
        assert_eq!(registry.resolve("urn:subject"), Some(SubjectKind::FinkBanking));
    }

    #[test]
    fn schema_id_cached() {
        struct Counting(AtomicUsize);
        impl SchemaSource for Counting {
            fn load(&self, location: &str) -> anyhow::Result<String> {
                self.0.fetch_add(1, Ordering::SeqCst);
                BundledSchemas.load(location)
            }
        }

        let source = Arc::new(Counting(AtomicUsize::new(0)));
        let registry = SubtypeRegistry::new(source.clone());

        for _ in 0..3 {
            let id = registry.schema_id_of(&SubjectKind::LegalPerson).expect("should read id");
            assert_eq!(id, ids::LEGAL_PERSON);
        }
        assert_eq!(source.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn schema_without_id() {
        struct Anonymous;
        impl SchemaSource for Anonymous {
            fn load(&self, _: &str) -> anyhow::Result<String> {
                Ok(r#"{"type": "object"}"#.to_string())
            }
        }

        let registry = SubtypeRegistry::new(Arc::new(Anonymous));
        let kind = SubjectKind::Custom(CustomKind::new("Anonymous", "anonymous.json"));
        let err = registry.schema_id_of(&kind).expect_err("should fail");
        assert!(matches!(err, Error::SchemaMalformed { .. }));
    }
}
