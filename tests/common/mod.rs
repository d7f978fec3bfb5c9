//! Common test helpers shared across the integration suite.

#![allow(dead_code)]

use bibmap::{
    BibsMapper, Field, IlsFlavour, Leader, MapperConfig, Record, RecordBuilder, ReferenceData,
};
use serde_json::{json, Value};

/// Mapping rules covering the fields the fixtures use.
pub fn mapping_rules() -> Value {
    json!({
        "020": [{
            "entity": [
                {"target": "identifiers.identifierTypeId", "subfield": ["a"],
                 "rules": [{"conditions": [{"type": "set_identifier_type_id_by_name",
                                            "parameter": {"name": "ISBN"}}]}]},
                {"target": "identifiers.value", "subfield": ["a"],
                 "rules": [{"conditions": [{"type": "trim"}]}]}
            ]
        }],
        "100": [{
            "entity": [
                {"target": "contributors.name", "subfield": ["a"],
                 "rules": [{"conditions": [{"type": "remove_ending_punc"}]}]},
                {"target": "contributors.contributorNameTypeId", "subfield": ["a"],
                 "rules": [{"conditions": [{"type": "set_contributor_name_type_id"}]}]}
            ]
        }],
        "245": [{"target": "title", "subfield": ["a", "b"],
                 "applyRulesOnConcatenatedData": true,
                 "ignoreSubsequentFields": true,
                 "rules": [{"conditions": [{"type": "remove_ending_punc, trim"}]}]}],
        "336": [{"target": "instanceTypeId", "subfield": ["b"],
                 "rules": [{"conditions": [{"type": "set_instance_type_id"}]}]}],
        "650": [{"target": "subjects", "subfield": ["a"],
                 "rules": [{"conditions": [{"type": "remove_ending_punc"}]}]}]
    })
}

/// A complete reference data snapshot.
pub fn reference_data_json() -> Value {
    json!({
        "mappingRules": mapping_rules(),
        "modesOfIssuance": [
            {"id": "moi-single", "name": "single unit"},
            {"id": "moi-serial", "name": "serial"},
            {"id": "moi-integrating", "name": "integrating resource"},
            {"id": "moi-unspecified", "name": "unspecified"}
        ],
        "instanceFormats": [
            {"id": "fmt-nc", "code": "nc", "name": "unmediated -- volume"},
            {"id": "fmt-cr", "code": "cr", "name": "computer -- online resource"},
            {"id": "fmt-ba", "code": "ba", "name": "audio -- audio belt"}
        ],
        "instanceTypes": [
            {"id": "type-txt", "code": "txt", "name": "text"}
        ],
        "identifierTypes": [{"id": "idt-isbn", "name": "ISBN"}],
        "contributorNameTypes": [{"id": "cnt-personal", "name": "Personal name"}],
        "languageCodes": ["eng", "fre", "ger", "jpn", "swe", "zxx"],
        "hridSettings": {"instances": {"prefix": "in", "startNumber": 1}},
        "userId": "user-1"
    })
}

/// Parsed reference data.
pub fn reference_data() -> ReferenceData {
    ReferenceData::from_json_str(&reference_data_json().to_string())
        .expect("fixture reference data parses")
}

/// A mapper reading legacy identifiers from 001.
pub fn voyager_mapper() -> BibsMapper {
    BibsMapper::new(MapperConfig::new(IlsFlavour::Voyager), reference_data())
        .expect("fixture reference data is valid")
}

/// Builds a data field from (code, value) pairs.
pub fn data_field(tag: &str, subfields: &[(char, &str)]) -> Field {
    let mut field = Field::new(tag.to_string(), ' ', ' ');
    for (code, value) in subfields {
        field.add_subfield_str(*code, value);
    }
    field
}

/// Builder for a monograph with a control number, a title and a text type.
pub fn book(control_number: &str, title: &str) -> RecordBuilder {
    Record::builder(Leader::default())
        .control_field_str("001", control_number)
        .field(data_field("245", &[('a', title)]))
        .field(data_field("336", &[('b', "txt")]))
}

/// MARCXML collection wrapping the given `<record>` bodies.
pub fn marcxml_collection(records: &[String]) -> String {
    let mut xml =
        String::from(r#"<?xml version="1.0" encoding="UTF-8"?><collection xmlns="http://www.loc.gov/MARC21/slim">"#);
    for record in records {
        xml.push_str(record);
    }
    xml.push_str("</collection>");
    xml
}

/// An 008 whose language positions (35-37) hold `language`.
pub fn fixed_field(language: &str) -> String {
    format!("{:<35}{language} d", "200101s2020    xx")
}

/// MARCXML `<record>` for a monograph with a control number and a title.
pub fn marcxml_book(control_number: &str, title: &str) -> String {
    format!(
        r#"<record>
  <leader>00000nam a2200000 a 4500</leader>
  <controlfield tag="001">{control_number}</controlfield>
  <controlfield tag="008">{fixed}</controlfield>
  <datafield tag="245" ind1="1" ind2="0"><subfield code="a">{title}</subfield></datafield>
  <datafield tag="336" ind1=" " ind2=" "><subfield code="b">txt</subfield></datafield>
  <datafield tag="337" ind1=" " ind2=" "><subfield code="b">n</subfield></datafield>
  <datafield tag="338" ind1=" " ind2=" "><subfield code="b">c</subfield><subfield code="2">rdacarrier</subfield></datafield>
</record>"#,
        fixed = fixed_field("eng")
    )
}
