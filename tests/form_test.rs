//! Integration tests for normalization, rules, validation and the form store.

use schema_form::{
    evaluate_condition, field_visibility, group_visibility, is_visible, normalize,
    normalize_with_diagnostics, parse_schema, validate_field, Condition, DataType, DisplayRule,
    ElementKind, ElementVisibility, FieldDefinition, FieldTable, FormSession, FormStore,
    FormValues, LoadError, MemorySource, Operator, OutlineNode, ProcessedSchema, ValidationRule,
};
use serde_json::{json, Value};

fn processed(document: Value) -> ProcessedSchema {
    normalize(&parse_schema(document).unwrap()).unwrap()
}

fn values(entries: Value) -> FormValues {
    serde_json::from_value(entries).unwrap()
}

// === Normalization ===

mod normalization {
    use super::*;

    fn document() -> Value {
        json!({
            "schemaVersion": "1.0",
            "FieldDefinition": { "id": "bp", "dataType": "integer" },
            "FieldGroupTemplate": { "id": "vitals", "fields": ["bp", "hr"] },
            "SectionTemplate": { "id": "exam", "fieldGroups": ["vitals", "labs"], "individualFields": [] },
            "FormTemplate": { "id": "visit", "sections": [{ "sectionId": "exam" }] }
        })
    }

    #[test]
    fn idempotent() {
        let raw = parse_schema(document()).unwrap();
        let first = normalize_with_diagnostics(&raw).unwrap();
        let second = normalize_with_diagnostics(&raw).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn dangling_group_is_absent_and_renders_placeholder() {
        let schema = processed(document());
        assert!(schema.field_group_template("labs").is_none());
        assert!(schema.field_group_template("vitals").is_some());

        let outline = schema_form::outline(&schema, &FormValues::new(), &Default::default());
        let missing = outline.missing();
        assert_eq!(missing.len(), 2);
        assert!(missing.contains(&&OutlineNode::NotFound {
            element: ElementKind::Group,
            id: "labs".into(),
            path: "exam.labs".into(),
        }));
        assert!(missing.contains(&&OutlineNode::NotFound {
            element: ElementKind::Field,
            id: "hr".into(),
            path: "exam.vitals.hr".into(),
        }));
        assert_eq!(
            group_visibility(&schema, &FormValues::new(), "labs"),
            ElementVisibility::NotFound
        );
    }

    #[test]
    fn format_errors_are_fatal() {
        let err = parse_schema(json!({ "SectionTemplate": { "id": "s1" } })).unwrap_err();
        assert!(matches!(err, LoadError::MissingFormTemplate));

        let err = parse_schema(json!({ "FormTemplate": { "id": "" } })).unwrap_err();
        assert!(matches!(err, LoadError::MissingFormId));
    }
}

// === Rule evaluation ===

mod rule_evaluation {
    use super::*;

    #[test]
    fn empty_rules_are_visible() {
        assert!(is_visible(&[], &FormValues::new(), &FieldTable::new()));
    }

    #[test]
    fn first_matching_rule_decides() {
        let rules = vec![DisplayRule::new(Condition::equals("fieldA", "yes"), false)];
        let fields = FieldTable::new();

        assert!(!is_visible(&rules, &values(json!({ "fieldA": "yes" })), &fields));
        assert!(is_visible(&rules, &values(json!({ "fieldA": "no" })), &fields));
    }

    #[test]
    fn numeric_operators_coerce_strings() {
        let condition = Condition::new("age", Operator::GreaterOrEqual, 18);
        assert!(evaluate_condition(
            &condition,
            &values(json!({ "age": "20" })),
            &FieldTable::new()
        ));
        assert!(!evaluate_condition(
            &condition,
            &values(json!({ "age": "adult" })),
            &FieldTable::new()
        ));
    }

    #[test]
    fn field_visibility_follows_values() {
        let schema = processed(json!({
            "FieldDefinition": {
                "id": "pregnant",
                "dataType": "boolean",
                "displayRules": [
                    { "condition": { "field": "sex", "operator": "equals", "value": "M" }, "visible": false }
                ]
            },
            "SectionTemplate": { "id": "s1", "individualFields": ["pregnant"] },
            "FormTemplate": { "id": "form", "sections": [{ "sectionId": "s1" }] }
        }));

        assert_eq!(
            field_visibility(&schema, &values(json!({ "sex": "M" })), "pregnant"),
            ElementVisibility::Hidden
        );
        assert_eq!(
            field_visibility(&schema, &values(json!({ "sex": "F" })), "pregnant"),
            ElementVisibility::Visible
        );
    }
}

// === Validation ===

mod validation {
    use super::*;

    #[test]
    fn no_rules_always_valid() {
        let field = FieldDefinition::new("f", DataType::String);
        for value in [json!(""), json!(null), json!("anything"), json!(42)] {
            assert!(validate_field(&field, Some(&value)).is_empty());
        }
        assert!(validate_field(&field, None).is_empty());
    }

    #[test]
    fn required_rule() {
        let field = FieldDefinition::new("f", DataType::String)
            .with_rule(ValidationRule::required().with_message("Required"));

        assert_eq!(validate_field(&field, Some(&json!(""))), vec!["Required"]);
        assert_eq!(validate_field(&field, Some(&json!(null))), vec!["Required"]);
        assert_eq!(validate_field(&field, None), vec!["Required"]);
        assert!(validate_field(&field, Some(&json!("x"))).is_empty());
        assert!(validate_field(&field, Some(&json!(0))).is_empty());
    }

    #[test]
    fn range_rule() {
        let field = FieldDefinition::new("score", DataType::Integer)
            .with_label("Score")
            .with_rule(ValidationRule::range(Some(1.0), Some(5.0)).with_message("Out of range"));

        assert!(validate_field(&field, Some(&json!(3))).is_empty());
        assert_eq!(validate_field(&field, Some(&json!(6))), vec!["Out of range"]);
        assert_eq!(validate_field(&field, Some(&json!("abc"))), vec!["Out of range"]);
        assert!(validate_field(&field, Some(&json!(""))).is_empty());
    }

    #[test]
    fn range_rule_without_message_names_non_numeric_input() {
        let field = FieldDefinition::new("score", DataType::Integer)
            .with_label("Score")
            .with_rule(ValidationRule::range(Some(1.0), Some(5.0)));

        assert_eq!(
            validate_field(&field, Some(&json!("abc"))),
            vec!["Score is not a valid number for range check."]
        );
        assert_eq!(
            validate_field(&field, Some(&json!(9))),
            vec!["Validation failed for Score (range)"]
        );
    }

    #[test]
    fn pattern_rule() {
        let field = FieldDefinition::new("code", DataType::String)
            .with_rule(ValidationRule::pattern("^[0-9]{3}$").with_message("Three digits"));

        assert!(validate_field(&field, Some(&json!("123"))).is_empty());
        assert_eq!(validate_field(&field, Some(&json!("12"))), vec!["Three digits"]);
        assert!(validate_field(&field, Some(&json!(123))).is_empty());
    }
}

// === Form store and session ===

mod end_to_end {
    use super::*;

    fn document() -> Value {
        json!({
            "FieldDefinition": {
                "id": "f1",
                "dataType": "string",
                "required": true,
                "validationRules": [{ "id": "r1", "type": "required", "message": "f1 is required" }]
            },
            "SectionTemplate": { "id": "s1", "fieldGroups": [], "individualFields": ["f1"] },
            "FormTemplate": { "id": "form", "sections": [{ "sectionId": "s1" }] }
        })
    }

    #[test]
    fn store_lifecycle() {
        let schema = processed(document());
        let mut store = FormStore::new();
        store.initialize(FormValues::new());

        assert!(!store.validate_all(&schema));
        assert_eq!(store.errors()["s1.f1"], vec!["f1 is required"]);

        store.set_value("s1.f1", json!("hello"), schema.field_definition("f1"));
        assert!(!store.errors().contains_key("s1.f1"));
        assert!(store.validate_all(&schema));
    }

    #[test]
    fn session_lifecycle() {
        let source = MemorySource::new().with_schema("simple", document());
        let mut session = FormSession::new();
        session.load(&source, "simple").unwrap();

        assert!(!session.validate_all());
        assert_eq!(session.errors()["s1.f1"], vec!["f1 is required"]);

        session.edit("s1.f1", "hello").unwrap();
        assert!(session.errors().is_empty());

        let submitted = session.submit().unwrap();
        assert_eq!(submitted["s1.f1"], json!("hello"));
    }
}
