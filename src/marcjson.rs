//! MARC-in-JSON serialization of source records.
//!
//! Used for the source-record-storage output, so the stored copy carries the
//! identifier written back into field 001 during mapping.
//!
//! # Format
//!
//! - `{"leader": "...", "fields": [...]}`
//! - Control fields (001-009): `{tag: value}`
//! - Data fields (010+): `{tag: {ind1, ind2, subfields: [{code: value}, ...]}}`

use crate::record::{Record, VariableField};
use serde_json::{json, Map, Value};

/// Convert a MARC record to MARC-in-JSON.
///
/// # Examples
///
/// ```
/// use bibmap::{marcjson, Leader, Record};
///
/// let mut record = Record::new(Leader::default());
/// record.add_control_field_str("001", "in00000000001");
/// let json = marcjson::record_to_marcjson(&record);
/// assert_eq!(json["fields"][0]["001"], "in00000000001");
/// ```
#[must_use]
pub fn record_to_marcjson(record: &Record) -> Value {
    let fields: Vec<Value> = record
        .fields()
        .map(|field| {
            let mut field_obj = Map::new();
            match field {
                VariableField::Control(control) => {
                    field_obj.insert(control.tag.clone(), Value::String(control.data.clone()));
                },
                VariableField::Data(data) => {
                    let subfields: Vec<Value> = data
                        .subfields()
                        .map(|subfield| {
                            let mut sf = Map::new();
                            sf.insert(
                                subfield.code.to_string(),
                                Value::String(subfield.value.clone()),
                            );
                            Value::Object(sf)
                        })
                        .collect();
                    field_obj.insert(
                        data.tag.clone(),
                        json!({
                            "ind1": data.indicator1.to_string(),
                            "ind2": data.indicator2.to_string(),
                            "subfields": subfields,
                        }),
                    );
                },
            }
            Value::Object(field_obj)
        })
        .collect();

    json!({
        "leader": record.leader.as_str(),
        "fields": fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::Leader;
    use crate::record::Field;

    #[test]
    fn test_record_to_marcjson_keeps_field_order() {
        let record = Record::builder(Leader::default())
            .control_field_str("001", "12345")
            .field(
                Field::builder("245".to_string(), '1', '0')
                    .subfield_str('a', "Title")
                    .subfield_str('c', "Author")
                    .build(),
            )
            .build();

        let json = record_to_marcjson(&record);
        assert_eq!(json["leader"], "00000nam a2200000 a 4500");
        assert_eq!(json["fields"][0]["001"], "12345");
        assert_eq!(json["fields"][1]["245"]["ind1"], "1");
        assert_eq!(json["fields"][1]["245"]["subfields"][1]["c"], "Author");
    }
}
