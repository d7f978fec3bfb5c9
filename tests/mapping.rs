//! Integration tests for mapping single records into instances.

mod common;

use bibmap::mapper::{DUPLICATE_LEGACY_ID, MAPPED_ATTRIBUTES, RECORD_STATUS};
use bibmap::report::GENERAL_STATISTICS;
use bibmap::resolvers::languages::UNRECOGNIZED_LANGUAGES;
use bibmap::{
    BibsMapper, Field, IlsFlavour, Leader, MapperConfig, MappingError, Record, VariableField,
};
use common::{book, data_field, fixed_field, reference_data, voyager_mapper};
use serde_json::json;

#[test]
fn test_full_instance_from_rules_and_resolvers() {
    let mapper = voyager_mapper();
    let mut record = book("b1001", "Moby Dick /")
        .control_field_str("008", &fixed_field("eng"))
        .field(data_field("020", &[('a', " 9780140390841 ")]))
        .field(data_field("100", &[('a', "Melville, Herman,")]))
        .field(data_field("650", &[('a', "Whales.")]))
        .field(data_field("650", &[('a', "Whaling.")]))
        .field(data_field("337", &[('b', "n")]))
        .field(data_field("338", &[('b', "nc"), ('2', "rdacarrier")]))
        .build();

    let instance = mapper.parse_bib(&mut record).unwrap();

    assert_eq!(instance.title(), Some("Moby Dick"));
    assert_eq!(instance.instance_type_id(), Some("type-txt"));
    assert_eq!(instance.get_str("source"), Some("MARC"));
    assert_eq!(instance.get_str("modeOfIssuanceId"), Some("moi-single"));
    assert_eq!(instance.strings("languages"), vec!["eng"]);
    assert_eq!(instance.strings("instanceFormatIds"), vec!["fmt-nc"]);
    assert_eq!(instance.strings("subjects"), vec!["Whales", "Whaling"]);
    assert_eq!(
        instance.get("identifiers"),
        Some(&json!([{"identifierTypeId": "idt-isbn", "value": "9780140390841"}]))
    );
    assert_eq!(
        instance.get("contributors"),
        Some(&json!([{"name": "Melville, Herman", "contributorNameTypeId": "cnt-personal"}]))
    );
    assert_eq!(instance.get("discoverySuppress"), Some(&json!(false)));
    assert_eq!(instance.get("staffSuppress"), Some(&json!(false)));
    assert_eq!(instance.hrid(), Some("in00000000001"));

    let metadata = instance.get("metadata").unwrap();
    assert_eq!(metadata["createdByUserId"], json!("user-1"));
    assert_eq!(metadata["createdDate"], metadata["updatedDate"]);

    let report = mapper.report();
    assert_eq!(report.count(RECORD_STATUS, "n"), 1);
    assert_eq!(report.count(MAPPED_ATTRIBUTES, "title"), 1);
    assert_eq!(report.count(MAPPED_ATTRIBUTES, "contributors"), 1);
}

#[test]
fn test_hrid_written_back_as_only_001() {
    let mapper = voyager_mapper();
    let mut record = book("b2002", "Title").build();
    record.add_control_field_str("001", "stray second 001");

    let instance = mapper.parse_bib(&mut record).unwrap();

    let control_numbers: Vec<&str> = record
        .fields()
        .filter(|field| field.tag() == "001")
        .filter_map(VariableField::control_data)
        .collect();
    assert_eq!(control_numbers, vec!["in00000000001"]);
    assert_eq!(instance.hrid(), Some("in00000000001"));
    assert_eq!(mapper.id_map().get("b2002").as_deref(), instance.id());
}

#[test]
fn test_hrids_are_sequential_across_records() {
    let mapper = voyager_mapper();
    let hrids: Vec<String> = (0..3)
        .map(|n| {
            let mut record = book(&format!("b{n}"), "Title").build();
            let instance = mapper.parse_bib(&mut record).unwrap();
            instance.hrid().unwrap().to_string()
        })
        .collect();
    assert_eq!(hrids, vec!["in00000000001", "in00000000002", "in00000000003"]);
}

#[test]
fn test_concatenated_language_codes_are_split() {
    let mapper = voyager_mapper();
    let mut record = book("b3", "Title")
        .field(data_field("041", &[('a', "engfre"), ('h', "jap"), ('b', "xyz")]))
        .build();

    let instance = mapper.parse_bib(&mut record).unwrap();

    assert_eq!(instance.strings("languages"), vec!["eng", "fre", "jpn"]);
    assert_eq!(mapper.report().count(UNRECOGNIZED_LANGUAGES, "xyz"), 1);
}

#[test]
fn test_one_character_carrier_code_pairs_with_media_type() {
    let mapper = voyager_mapper();
    let mut record = book("b4", "Title")
        .field(data_field("337", &[('b', "b")]))
        .field(data_field("338", &[('b', "a"), ('2', "rdacarrier")]))
        .build();

    let instance = mapper.parse_bib(&mut record).unwrap();

    assert_eq!(instance.strings("instanceFormatIds"), vec!["fmt-ba"]);
}

#[test]
fn test_serial_leader_codes() {
    let mapper = voyager_mapper();
    let leaders = [("b5", "00000nab a2200000 a 4500"), ("b5s", "00000nas a2200000 a 4500")];
    for (control_number, leader) in leaders {
        let mut record = Record::builder(Leader::new(leader))
            .control_field_str("001", control_number)
            .field(data_field("245", &[('a', "Journal")]))
            .field(data_field("336", &[('b', "txt")]))
            .build();

        let instance = mapper.parse_bib(&mut record).unwrap();

        assert_eq!(instance.get_str("modeOfIssuanceId"), Some("moi-serial"), "leader {leader}");
    }
}

#[test]
fn test_repeated_subject_values_are_deduplicated() {
    let mapper = voyager_mapper();
    let mut record = book("b6", "Title")
        .field(data_field("650", &[('a', "Whales.")]))
        .field(data_field("650", &[('a', "Whales")]))
        .field(data_field("650", &[('a', "Ships.")]))
        .build();

    let instance = mapper.parse_bib(&mut record).unwrap();

    assert_eq!(instance.strings("subjects"), vec!["Whales", "Ships"]);
}

#[test]
fn test_only_first_title_field_is_mapped() {
    let mapper = voyager_mapper();
    let mut record = book("b7", "First title")
        .field(data_field("245", &[('a', "Second title")]))
        .build();

    let instance = mapper.parse_bib(&mut record).unwrap();

    assert_eq!(instance.title(), Some("First title"));
}

#[test]
fn test_missing_type_rejects_without_consuming_hrid() {
    let mapper = voyager_mapper();
    let mut untyped = Record::builder(Leader::default())
        .control_field_str("001", "b8")
        .field(data_field("245", &[('a', "No type")]))
        .build();

    let err = mapper.parse_bib(&mut untyped).unwrap_err();
    assert!(matches!(err, MappingError::Validation(ref message) if message.contains("b8")));
    assert_eq!(untyped.control_number(), Some("b8"));
    assert!(mapper.id_map().is_empty());

    let mut typed = book("b9", "Typed").build();
    let instance = mapper.parse_bib(&mut typed).unwrap();
    assert_eq!(instance.hrid(), Some("in00000000001"));
}

#[test]
fn test_missing_legacy_identifier_is_fatal_for_record() {
    let mapper =
        BibsMapper::new(MapperConfig::new(IlsFlavour::Sierra), reference_data()).unwrap();
    let mut record = book("b10", "Title").build();

    let err = mapper.parse_bib(&mut record).unwrap_err();

    assert!(matches!(err, MappingError::MissingIdentifier { .. }));
}

#[test]
fn test_sierra_legacy_id_and_suppression() {
    let config = MapperConfig::new(IlsFlavour::Sierra).with_suppress(true);
    let mapper = BibsMapper::new(config, reference_data()).unwrap();
    let mut record = book("ocm123", "Title")
        .field(Field::builder("907".to_string(), ' ', ' ').subfield_str('a', ".b1234567").build())
        .build();

    let instance = mapper.parse_bib(&mut record).unwrap();

    assert_eq!(instance.get("discoverySuppress"), Some(&json!(true)));
    assert_eq!(instance.get("staffSuppress"), Some(&json!(true)));
    assert_eq!(mapper.id_map().get(".b1234567").as_deref(), instance.id());
    assert_eq!(mapper.id_map().get("ocm123"), None);
}

#[test]
fn test_duplicate_legacy_id_keeps_first_mapping() {
    let mapper = voyager_mapper();
    let first = mapper.parse_bib(&mut book("dup", "One").build()).unwrap();
    let second = mapper.parse_bib(&mut book("dup", "Two").build()).unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(mapper.id_map().get("dup").as_deref(), first.id());
    assert_eq!(mapper.report().count(GENERAL_STATISTICS, DUPLICATE_LEGACY_ID), 1);
}
