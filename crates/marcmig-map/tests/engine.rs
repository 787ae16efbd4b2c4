use marcmig_map::{MappingEngine, topic};
use marcmig_model::{MapError, RuleSet, Schema, SourceField, SourceRecord};
use marcmig_transform::TransformRegistry;
use serde_json::json;

fn schema() -> Schema {
    Schema::from_json(&json!({
        "properties": {
            "title": { "type": "string" },
            "source": { "type": "string" },
            "discoverySuppress": { "type": "boolean" },
            "editions": { "type": "array", "items": { "type": "string" } },
            "subjects": { "type": "array", "items": { "type": "string" } },
            "contributors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "date": { "type": "string" }
                    }
                }
            },
            "electronicAccess": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "uri": { "type": "string" },
                        "linkText": { "type": "string" }
                    }
                }
            }
        }
    }))
    .expect("schema")
}

fn rules() -> RuleSet {
    RuleSet::from_json(json!({
        "100": [
            { "target": "contributors.name", "subfield": ["a"], "rules": [] },
            { "target": "contributors.date", "subfield": ["d"], "rules": [] }
        ],
        "245": [
            {
                "target": "title",
                "subfield": ["a", "b"],
                "applyRulesOnConcatenatedData": true,
                "rules": [
                    { "conditions": [ { "type": "remove_ending_punc, trim" } ] }
                ]
            }
        ],
        "250": [
            {
                "target": "editions",
                "subfield": ["a"],
                "ignoreSubsequentFields": true,
                "rules": [ { "conditions": [ { "type": "trim" } ] } ]
            }
        ],
        "043": [
            { "target": "subjects", "subfield": ["a"], "subFieldSplit": true, "rules": [] }
        ],
        "655": [
            {
                "target": "subjects",
                "subfield": ["a"],
                "rules": [ { "conditions": [ { "type": "trim" } ] } ]
            }
        ],
        "856": [
            {
                "entity": [
                    { "target": "electronicAccess.uri", "subfield": ["u"], "rules": [] },
                    { "target": "electronicAccess.linkText", "subfield": ["y"], "rules": [] }
                ]
            }
        ],
        "700": [
            {
                "entity": [
                    { "target": "contributors.name", "subfield": ["a"], "rules": [] },
                    { "target": "contributors.date", "subfield": ["d"], "rules": [] }
                ]
            }
        ],
        "948": [
            { "target": "discoverySuppress", "rules": [ { "value": "true" } ] },
            { "target": "source", "rules": [ { "value": "MARC" } ] }
        ],
        "880": [
            {
                "fieldReplacementRule": [
                    { "sourceDigits": "245", "targetField": "245" }
                ]
            }
        ]
    }))
    .expect("rule document")
}

fn engine() -> MappingEngine {
    MappingEngine::new(schema(), rules(), TransformRegistry::with_defaults())
}

#[test]
fn maps_one_field_into_one_array_row() {
    let record = SourceRecord::new().with_field(
        SourceField::new("100")
            .with_subfield('a', "Smith")
            .with_subfield('d', "1920"),
    );
    let destination = engine().map_record(&record).expect("mapped");
    assert_eq!(
        destination["contributors"],
        json!([{ "name": "Smith", "date": "1920" }])
    );
}

#[test]
fn repeated_fields_open_new_rows() {
    let record = SourceRecord::new()
        .with_field(
            SourceField::new("100")
                .with_subfield('a', "Smith")
                .with_subfield('d', "1920"),
        )
        .with_field(
            SourceField::new("100")
                .with_subfield('a', "Jones")
                .with_subfield('d', "1895"),
        );
    let destination = engine().map_record(&record).expect("mapped");
    assert_eq!(
        destination["contributors"],
        json!([
            { "name": "Smith", "date": "1920" },
            { "name": "Jones", "date": "1895" }
        ])
    );
}

#[test]
fn transforms_run_on_concatenated_data() {
    let record = SourceRecord::new().with_field(
        SourceField::new("245")
            .with_subfield('a', "A title :")
            .with_subfield('b', "a subtitle /"),
    );
    let destination = engine().map_record(&record).expect("mapped");
    assert_eq!(destination["title"], json!("A title : a subtitle"));
}

#[test]
fn constant_rules_coerce_booleans() {
    let record = SourceRecord::new().with_field(SourceField::new("948"));
    let destination = engine().map_record(&record).expect("mapped");
    assert_eq!(destination["discoverySuppress"], json!(true));
    assert_eq!(destination["source"], json!("MARC"));
}

#[test]
fn sub_field_split_extends_string_arrays() {
    let record =
        SourceRecord::new().with_field(SourceField::new("043").with_subfield('a', "n-us-e-uk-"));
    let destination = engine().map_record(&record).expect("mapped");
    assert_eq!(destination["subjects"], json!(["n-u", "s-e", "-uk", "-"]));
}

#[test]
fn genre_headings_take_the_label() {
    let record = SourceRecord::new()
        .with_field(SourceField::new("655").with_subfield('a', "detective fiction"));
    let destination = engine().map_record(&record).expect("mapped");
    assert_eq!(destination["subjects"], json!(["Genre: detective fiction"]));
}

#[test]
fn subsequent_fields_are_suppressed() {
    let record = SourceRecord::new()
        .with_field(SourceField::new("250").with_subfield('a', "2nd ed."))
        .with_field(SourceField::new("250").with_subfield('a', "3rd ed."));
    let mut engine = engine();
    let destination = engine.map_record(&record).expect("mapped");
    assert_eq!(destination["editions"], json!(["2nd ed."]));

    let tally = engine.report().source_fields()["250"];
    assert_eq!(tally.present, 2);
    assert_eq!(tally.mapped, 1);
    assert_eq!(tally.empty, 1);
}

#[test]
fn duplicate_list_values_collapse() {
    let record = SourceRecord::new()
        .with_field(SourceField::new("655").with_subfield('a', "maps"))
        .with_field(SourceField::new("655").with_subfield('a', "maps"));
    let destination = engine().map_record(&record).expect("mapped");
    assert_eq!(destination["subjects"], json!(["Genre: maps"]));
}

#[test]
fn linked_fields_borrow_the_named_tag_rules() {
    let record = SourceRecord::new().with_field(
        SourceField::new("880")
            .with_subfield('6', "245-01")
            .with_subfield('a', "Parallel title"),
    );
    let mut engine = engine();
    let destination = engine.map_record(&record).expect("mapped");
    assert_eq!(destination["title"], json!("Parallel title"));
    assert_eq!(
        engine.report().diagnostic_count(topic::LINKED_FIELD, "245 -> 245"),
        1
    );
}

#[test]
fn linked_field_without_match_maps_nothing() {
    let record = SourceRecord::new().with_field(
        SourceField::new("880")
            .with_subfield('6', "999-01")
            .with_subfield('a', "stray"),
    );
    let mut engine = engine();
    let destination = engine.map_record(&record).expect("mapped");
    assert!(destination.get("title").is_none());
    assert_eq!(
        engine.report().diagnostic_count(topic::UNMAPPED_TAG, "880"),
        1
    );
}

#[test]
fn always_admit_parents_accept_partial_entities() {
    let record = SourceRecord::new()
        .with_field(SourceField::new("856").with_subfield('u', "http://example.org"));
    let destination = engine().map_record(&record).expect("mapped");
    assert_eq!(
        destination["electronicAccess"],
        json!([{ "uri": "http://example.org", "linkText": "" }])
    );
}

#[test]
fn incomplete_entities_only_count() {
    let record = SourceRecord::new().with_field(
        SourceField::new("700")
            .with_subfield('a', "Smith")
            .with_subfield('d', ""),
    );
    let mut engine = engine();
    let destination = engine.map_record(&record).expect("mapped");
    assert!(destination.get("contributors").is_none());
    assert_eq!(
        engine.report().diagnostic_count(
            topic::INCOMPLETE_ENTITY,
            "700 a - d --- contributors date:false - name:true"
        ),
        1
    );
}

#[test]
fn missing_required_property_is_recoverable() {
    let record = SourceRecord::new().with_field(SourceField::new("948"));
    let mut engine = engine().with_required_properties(["title"]);
    let err = engine.map_record(&record).unwrap_err();
    assert!(matches!(err, MapError::CriticalData { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn unresolved_targets_abort_the_record() {
    let rules = RuleSet::from_json(json!({
        "020": [ { "target": "identifiers", "subfield": ["a"], "rules": [] } ]
    }))
    .expect("rule document");
    let mut engine = MappingEngine::new(schema(), rules, TransformRegistry::new());
    let record =
        SourceRecord::new().with_field(SourceField::new("020").with_subfield('a', "12345"));
    let err = engine.map_record(&record).unwrap_err();
    assert!(matches!(err, MapError::UnresolvedTarget { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn statistics_cover_every_schema_property() {
    let record = SourceRecord::new()
        .with_field(SourceField::new("245").with_subfield('a', "A title"))
        .with_field(SourceField::new("999").with_subfield('a', "unmapped tag"));
    let mut engine = engine();
    engine.map_record(&record).expect("mapped");

    let report = engine.finalize();
    assert_eq!(report.records_processed(), 1);
    assert_eq!(report.destination_fields()["title"].mapped, 1);
    assert_eq!(report.destination_fields()["contributors"].mapped, 0);
    assert_eq!(report.source_fields()["245"].mapped, 1);
    let unmapped = report.source_fields()["999"];
    assert_eq!(unmapped.present, 1);
    assert_eq!(unmapped.mapped, 0);
    assert_eq!(unmapped.empty, 1);
}
