//! MARCXML deserialization of MARC records.
//!
//! This module reads standard MARCXML, as defined by the Library of Congress
//! (<https://www.loc.gov/standards/marcxml/>), into [`Record`]s. It is the XML
//! Record Source for the mapping run.
//!
//! Both default-namespace (`<record xmlns="...">`) and prefix-namespace
//! (`<marc:record xmlns:marc="...">`) forms are accepted, as is a bare
//! `<record>` or a `<collection>` wrapper.
//!
//! # Examples
//!
//! ```
//! use bibmap::marcxml;
//!
//! let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim">
//!   <record>
//!     <leader>00000nam a2200000 a 4500</leader>
//!     <controlfield tag="001">12345</controlfield>
//!     <datafield tag="245" ind1="1" ind2="0">
//!       <subfield code="a">Title</subfield>
//!     </datafield>
//!   </record>
//! </collection>"#;
//!
//! let records = marcxml::marcxml_to_records(xml);
//! let record = records[0].as_ref().unwrap();
//! assert_eq!(record.control_number(), Some("12345"));
//! ```

use crate::error::{MarcError, Result};
use crate::leader::Leader;
use crate::record::{Field, Record};
use lazy_static::lazy_static;
use quick_xml::de::from_str as xml_from_str;
use regex::Regex;
use serde::Deserialize;

lazy_static! {
    static ref XMLNS_DECLARATION: Regex =
        Regex::new(r#"\s+xmlns(?::\w+)?="[^"]*""#).expect("valid xmlns pattern");
    static ref ELEMENT_PREFIX: Regex = Regex::new(r"<(/?)(\w+):").expect("valid prefix pattern");
}

/// MARCXML record representation.
#[derive(Debug, Deserialize)]
#[serde(rename = "record")]
struct MarcxmlRecord {
    #[serde(default)]
    leader: String,
    #[serde(default)]
    controlfield: Vec<MarcxmlControlField>,
    #[serde(default)]
    datafield: Vec<MarcxmlDataField>,
}

#[derive(Debug, Deserialize)]
struct MarcxmlControlField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "$value", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct MarcxmlDataField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "@ind1", default)]
    ind1: String,
    #[serde(rename = "@ind2", default)]
    ind2: String,
    #[serde(default)]
    subfield: Vec<MarcxmlSubfield>,
}

#[derive(Debug, Deserialize)]
struct MarcxmlSubfield {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "$value", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "collection")]
struct MarcxmlCollection {
    #[serde(default, rename = "record")]
    records: Vec<MarcxmlRecord>,
}

/// Strip XML namespace prefixes and declarations from MARCXML input.
fn strip_marcxml_ns(xml: &str) -> String {
    let stripped = XMLNS_DECLARATION.replace_all(xml, "");
    ELEMENT_PREFIX.replace_all(&stripped, "<$1").to_string()
}

/// Convert a single MARCXML `<record>` string to a MARC record.
///
/// # Errors
///
/// Returns an error if the XML is invalid or a subfield has no code.
pub fn marcxml_to_record(xml: &str) -> Result<Record> {
    let cleaned = strip_marcxml_ns(xml);
    let xml_record: MarcxmlRecord = xml_from_str(&cleaned)
        .map_err(|e| MarcError::ParseError(format!("Failed to parse MARCXML: {e}")))?;

    marcxml_record_to_record(xml_record)
}

/// Convert MARCXML to records.
///
/// Accepts either a `<collection>` wrapper or a single `<record>` root. Each
/// record converts on its own, so one bad record yields one `Err` and the
/// rest of the collection is still returned. A document that cannot be
/// parsed at all yields a single `Err`.
pub fn marcxml_to_records(xml: &str) -> Vec<Result<Record>> {
    let cleaned = strip_marcxml_ns(xml);
    if !cleaned.contains("<collection") {
        return vec![marcxml_to_record(&cleaned)];
    }

    match xml_from_str::<MarcxmlCollection>(&cleaned) {
        Ok(collection) => collection
            .records
            .into_iter()
            .map(marcxml_record_to_record)
            .collect(),
        Err(e) => vec![Err(MarcError::ParseError(format!(
            "Failed to parse MARCXML collection: {e}"
        )))],
    }
}

fn marcxml_record_to_record(xml_record: MarcxmlRecord) -> Result<Record> {
    let mut record = Record::new(Leader::new(xml_record.leader));

    for cf in xml_record.controlfield {
        record.add_control_field(cf.tag, cf.value);
    }

    for df in xml_record.datafield {
        let ind1 = df.ind1.chars().next().unwrap_or(' ');
        let ind2 = df.ind2.chars().next().unwrap_or(' ');
        let mut field = Field::new(df.tag, ind1, ind2);

        for sf in df.subfield {
            let code = sf
                .code
                .chars()
                .next()
                .ok_or_else(|| MarcError::InvalidField("Missing subfield code".to_string()))?;
            field.add_subfield(code, sf.value);
        }

        record.add_field(field);
    }

    Ok(record)
}
