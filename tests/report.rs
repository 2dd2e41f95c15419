//! Tests for encoding, decoding, validating, and transporting reports.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use identification_report::report::{
    Address, EidAuthentication, FinkBankingAuthentication, LegalPersonAuthentication,
    NaturalPersonAuthentication, NaturalPersonMinimalAuthentication,
};
use identification_report::schema::{ids, locations};
use identification_report::{
    BundledSchemas, Certificate, CustomKind, Error, IdentificationReport, JwtHandler,
    LevelOfAssurance, PrivateKey, ReportCodec, SchemaSource, SchemaStore, SchemaValidator,
    SubjectKind, SubjectRef, SubtypeRegistry,
};
use serde_json::{Map, Value, json};
use test_utils::KeyType;

const LOYALTY_CARD: &str = "loyalty-card.json";
const LOYALTY_CARD_ID: &str = "https://example.com/schema/loyalty-card.json";

// Bundled schemas plus one caller-defined subject schema.
struct WithLoyaltyCard;

impl SchemaSource for WithLoyaltyCard {
    fn load(&self, location: &str) -> anyhow::Result<String> {
        if location != LOYALTY_CARD {
            return BundledSchemas.load(location);
        }
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": LOYALTY_CARD_ID,
            "type": "object",
            "properties": {
                "cardNumber": {"type": "string", "pattern": "^[0-9]{8}$"}
            },
            "required": ["cardNumber"]
        });
        Ok(schema.to_string())
    }
}

struct Context {
    codec: ReportCodec,
    validator: SchemaValidator,
}

fn context() -> Context {
    let source: Arc<dyn SchemaSource> = Arc::new(WithLoyaltyCard);
    let registry = SubtypeRegistry::with_builtins(Arc::clone(&source)).expect("should seed");
    Context {
        codec: ReportCodec::new(Arc::new(registry)),
        validator: SchemaValidator::new(Arc::new(SchemaStore::new(source))),
    }
}

fn report(subject_ref_type: &str, subject: impl Into<SubjectRef>) -> IdentificationReport {
    IdentificationReport {
        report_id: Some(uuid::Uuid::new_v4().to_string()),
        server_identity: Some("https://id.example.com/saml".into()),
        report_time: Some(Utc.with_ymd_and_hms(2024, 5, 3, 10, 15, 0).unwrap()),
        identification_time: Some(Utc.with_ymd_and_hms(2024, 5, 3, 10, 14, 12).unwrap()),
        authentication_method: Some("eID".into()),
        level_of_assurance: LevelOfAssurance::EidasHigh,
        id_status: Some("success".into()),
        subject_ref_type: Some(subject_ref_type.into()),
        subject_ref: Some(subject.into()),
        ..IdentificationReport::default()
    }
}

fn natural_person() -> NaturalPersonAuthentication {
    NaturalPersonAuthentication {
        restricted_id: Some("01A4F6B2C9".into()),
        given_name: Some("Erika".into()),
        family_name: Some("Mustermann".into()),
        date_of_birth: Some("12-08-1964".into()),
        place_of_birth: Some("Berlin".into()),
        birth_name: Some("Gabler".into()),
        place_of_residence: Some(Address {
            street: Some("Heidestraße 17".into()),
            city: Some("Köln".into()),
            country: Some("D".into()),
            zip_code: Some("51147".into()),
            ..Address::default()
        }),
        ..NaturalPersonAuthentication::default()
    }
}

// A report without optional fields misses exactly the required envelope
// fields. `levelOfAssurance` is always written.
#[test]
fn minimal_report() {
    let ctx = context();
    let report = IdentificationReport::default();

    let result = report.validation_result(&ctx.validator).expect("should validate");
    assert!(!result.valid);
    assert_eq!(result.error_count(), 5);
    assert!(result.leaves().iter().all(|unit| unit.keyword == "required"));
    assert!(!report.validate(&ctx.validator).expect("should validate"));
}

#[test]
fn complete_report() {
    let ctx = context();
    let report = report(ids::NATURAL_PERSON, natural_person());

    let result = report.validation_result(&ctx.validator).expect("should validate");
    assert!(result.valid, "{result:?}");
    assert!(report.validate(&ctx.validator).expect("should validate"));
}

// An unexpected field in a document reference is reported at that field.
#[test]
fn document_reference_extra_field() {
    let ctx = context();
    let mut reference = Map::new();
    reference.insert("documentId".into(), json!("passport-1"));
    reference.insert("customField".into(), json!("unexpected"));

    let report = IdentificationReport {
        document_references: Some(vec![reference]),
        ..report(ids::NATURAL_PERSON, natural_person())
    };

    let result = report.validation_result(&ctx.validator).expect("should validate");
    assert!(!result.valid);

    let leaves = result.leaves();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].instance_location, "/documentReferences/0/customField");
}

#[test]
fn date_of_birth_formats() {
    let ctx = context();

    for (date, valid) in
        [("12-08-1964", true), ("08-1964", true), ("1964", true), ("1964-08-12", false)]
    {
        let subject =
            NaturalPersonAuthentication { date_of_birth: Some(date.into()), ..natural_person() };
        let report = report(ids::NATURAL_PERSON, subject);

        let result = report.validation_result(&ctx.validator).expect("should validate");
        assert_eq!(result.valid, valid, "{date}");
        if !valid {
            let leaves = result.leaves();
            assert_eq!(leaves[0].instance_location, "/subjectRef/dateOfBirth");
            assert_eq!(leaves[0].keyword, "pattern");
        }
    }
}

// Every built-in variant survives encode and decode.
#[test]
fn round_trip_built_ins() {
    let ctx = context();

    let mut extra = Map::new();
    extra.insert("nationality".into(), json!("D"));

    let subjects: [(&str, SubjectRef); 5] = [
        (ids::NATURAL_PERSON, natural_person().into()),
        (
            ids::EID_AUTHENTICATION,
            EidAuthentication {
                restricted_id: Some("77C0D1E2".into()),
                given_name: Some("Max".into()),
                place_of_residence: Some(Address {
                    no_place_info: Some("keine Hauptwohnung in Deutschland".into()),
                    ..Address::default()
                }),
                extra: extra.clone(),
                ..EidAuthentication::default()
            }
            .into(),
        ),
        (
            ids::LEGAL_PERSON,
            LegalPersonAuthentication {
                organization_name: Some("Beispiel GmbH".into()),
                register_type: Some("HRB".into()),
                register_number: Some("12345".into()),
                address: Some(Address {
                    free_text_place: Some("Bremen".into()),
                    ..Address::default()
                }),
                ..LegalPersonAuthentication::default()
            }
            .into(),
        ),
        (
            ids::NATURAL_PERSON_MINIMAL,
            NaturalPersonMinimalAuthentication {
                given_name: Some("Erika".into()),
                family_name: Some("Mustermann".into()),
                extra,
            }
            .into(),
        ),
        (
            ids::FINK_BANKING,
            FinkBankingAuthentication {
                first_name: Some("Erika".into()),
                last_name: Some("Mustermann".into()),
                ..FinkBankingAuthentication::default()
            }
            .into(),
        ),
    ];

    for (id, subject) in subjects {
        let kind = subject.kind();
        let mut report = report(id, subject);
        report.extra.insert("vendorBuild".into(), json!(42));

        let result = report.validation_result(&ctx.validator).expect("should validate");
        assert!(result.valid, "{kind}: {result:?}");

        let json = ctx.codec.encode_string(&report).expect("should encode");
        let decoded = ctx.codec.decode_str(&json).expect("should decode");
        assert_eq!(decoded, report, "{kind}");
        assert_eq!(decoded.subject_ref.map(|s| s.kind()), Some(kind));
    }
}

#[test]
fn every_level_of_assurance() {
    let ctx = context();

    for loa in LevelOfAssurance::ALL {
        let json = json!({"levelOfAssurance": loa.as_str()});
        let report = ctx.codec.decode(&json).expect("should decode");
        assert_eq!(report.level_of_assurance, loa);
        assert_eq!(ctx.codec.encode(&report).expect("should encode"), json);
    }
}

#[test]
fn custom_subject_kind() {
    let ctx = context();
    let kind = SubjectKind::Custom(CustomKind::new("LoyaltyCard", LOYALTY_CARD));
    let registry = ctx.codec.registry();
    registry.register(LOYALTY_CARD_ID, kind.clone());
    assert_eq!(registry.schema_id_of(&kind).expect("should read $id"), LOYALTY_CARD_ID);

    let json = json!({
        "reportId": "7d1e5a0c-3b9f-4c2d-8e6a-5f4b3c2d1e0f",
        "levelOfAssurance": "unknown",
        "subjectRefType": LOYALTY_CARD_ID,
        "subjectRef": {"cardNumber": "1234567"}
    });
    let report = ctx.codec.decode(&json).expect("should decode");

    let Some(subject) = &report.subject_ref else {
        panic!("should have a subject");
    };
    assert_eq!(subject.kind(), kind);
    let SubjectRef::Custom(custom) = subject else {
        panic!("should be custom");
    };
    assert_eq!(custom.fields.get("cardNumber"), Some(&json!("1234567")));

    // the subject is checked against its own schema
    let result = subject.validate(&ctx.validator).expect("should validate");
    assert!(!result.valid);
    assert_eq!(result.leaves()[0].keyword, "pattern");

    assert_eq!(ctx.codec.encode(&report).expect("should encode"), json);
}

#[test]
fn unregistered_subject_type() {
    let ctx = context();
    let json = json!({
        "subjectRefType": LOYALTY_CARD_ID,
        "subjectRef": {"cardNumber": "12345678"}
    });
    let err = ctx.codec.decode(&json).expect_err("should fail");
    assert!(matches!(err, Error::UnknownSubjectType(Some(id)) if id == LOYALTY_CARD_ID));
}

#[test]
fn unrecognized_level_of_assurance() {
    let ctx = context();
    let err = ctx.codec.decode(&json!({"levelOfAssurance": 3})).expect_err("should fail");
    assert!(matches!(err, Error::LevelOfAssuranceUnrecognized(_)));
}

// Reports travel as signed and as encrypted tokens.
#[test]
fn token_round_trip() {
    let ctx = context();
    let fixture = test_utils::fixture(KeyType::P256);
    let key = PrivateKey::from_pkcs8_der(&fixture.pkcs8_der).expect("should parse key");
    let cert = Certificate::from_der(&fixture.certificate_der).expect("should parse certificate");
    let handler = JwtHandler::new(Some(key), cert);

    let report = report(ids::NATURAL_PERSON, natural_person());

    let jws = ctx.codec.to_jws(&report, &handler).expect("should sign");
    assert_eq!(ctx.codec.from_token(&jws, &handler).expect("should verify"), report);

    let jwe = ctx.codec.to_jwe(&report, &handler).expect("should encrypt");
    assert_eq!(ctx.codec.from_token(&jwe, &handler).expect("should decrypt"), report);

    // decoding against another kind keeps the same fields in the bag
    let decoded = ctx
        .codec
        .from_token_as(&jws, &handler, &SubjectKind::NaturalPersonMinimal)
        .expect("should decode");
    let Some(SubjectRef::NaturalPersonMinimal(subject)) = decoded.subject_ref else {
        panic!("should be a minimal natural person");
    };
    assert_eq!(subject.given_name.as_deref(), Some("Erika"));
    assert_eq!(subject.extra.get("restrictedId"), Some(&Value::from("01A4F6B2C9")));
}

#[test]
fn validate_by_location() {
    let ctx = context();
    let valid = ctx
        .validator
        .is_valid(locations::LEGAL_PERSON, &json!({"organizationName": "Beispiel GmbH"}))
        .expect("should validate");
    assert!(valid);
}
