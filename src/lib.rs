//! # Identification Reports
//!
//! An Identification Report records the outcome of identifying a person or
//! organisation: who did the identifying, when, with what level of assurance,
//! and a reference to the identified subject.
//!
//! This crate provides:
//!
//! - [`SchemaStore`] and [`SchemaValidator`]: compile the JSON Schemas for
//!   reports and their subjects once, and validate documents against them
//!   with a nested error tree.
//! - [`SubtypeRegistry`]: maps the schema identifier carried in
//!   `subjectRefType` to the concrete shape of `subjectRef`.
//! - [`ReportCodec`]: JSON encoding and decoding of [`IdentificationReport`]s,
//!   preserving unknown fields.
//! - [`JwtHandler`]: compact JWS and JWE with algorithms selected from the
//!   counterparty's certificate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use identification_report::{BundledSchemas, ReportCodec, SubtypeRegistry};
//!
//! let registry = SubtypeRegistry::with_builtins(Arc::new(BundledSchemas))?;
//! let codec = ReportCodec::new(Arc::new(registry));
//!
//! let report = codec.decode_str(r#"{"reportId": "42", "levelOfAssurance": "unknown"}"#)?;
//! assert_eq!(report.report_id.as_deref(), Some("42"));
//! # Ok::<(), identification_report::Error>(())
//! ```

pub mod error;
pub mod jose;
pub mod registry;
pub mod report;
pub mod schema;

pub use crate::error::{Error, Result};
pub use crate::jose::{Certificate, JwtHandler, PlainJwt, PrivateKey, TokenFormat};
pub use crate::registry::{CustomKind, SubjectKind, SubtypeRegistry};
pub use crate::report::{
    Extensible, IdentificationReport, LevelOfAssurance, ReportCodec, SubjectRef,
};
pub use crate::schema::{
    BundledSchemas, DirectorySchemas, SchemaSource, SchemaStore, SchemaValidator, ValidationResult,
};
