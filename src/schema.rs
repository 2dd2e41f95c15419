//! # Schemas
//!
//! Loading, compiling, and evaluating the JSON Schema documents that describe
//! Identification Reports and their subject references.
//!
//! Schema documents are addressed by a logical *location* (for the bundled
//! schemas, the file name) and identified on the wire by their `$id`.

pub(crate) mod source;
mod store;
mod validate;

pub use self::source::{BundledSchemas, DirectorySchemas, SchemaSource, ids, locations};
pub use self::store::{CompiledSchema, SchemaStore};
pub use self::validate::{OutputUnit, SchemaValidator, ValidationResult};

/// Base URI used to resolve relative references in schemas that do not
/// declare an `$id`.
pub const BASE_URI: &str = "https://identification-report.de";
