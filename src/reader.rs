//! Reading MARC records from binary streams.
//!
//! This module provides [`MarcReader`] for reading ISO 2709 formatted MARC records
//! from any source that implements [`std::io::Read`]. It is the binary
//! Record Source for the mapping run.
//!
//! # Examples
//!
//! ```no_run
//! use bibmap::MarcReader;
//! use std::fs::File;
//!
//! let file = File::open("records.mrc")?;
//! let mut reader = MarcReader::new(file);
//!
//! while let Some(record) = reader.read_record()? {
//!     println!("Leader: {}", record.leader);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{MarcError, Result};
use crate::leader::{Leader, LEADER_LENGTH};
use crate::record::{is_control_tag, Field, Record};
use std::io::{BufRead, BufReader, Read};
use unicode_normalization::UnicodeNormalization;

const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: u8 = 0x1F;
const RECORD_TERMINATOR: u8 = 0x1D;

/// Strategy for handling malformed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryMode {
    /// Return errors for any malformation (default)
    #[default]
    Strict,
    /// Skip malformed fields and salvage what is readable
    Lenient,
}

/// Reader for ISO 2709 binary MARC format.
///
/// `MarcReader` reads one MARC record at a time. Records are framed by the
/// record terminator, so a record with a broken leader fails on its own and
/// the next read starts on the following record. Text is decoded as UTF-8
/// (lossily) and normalized to NFC.
#[derive(Debug)]
pub struct MarcReader<R: Read> {
    reader: BufReader<R>,
    recovery_mode: RecoveryMode,
}

impl<R: Read> MarcReader<R> {
    /// Create a new MARC reader.
    pub fn new(reader: R) -> Self {
        MarcReader {
            reader: BufReader::new(reader),
            recovery_mode: RecoveryMode::Strict,
        }
    }

    /// Set the recovery mode for handling malformed records.
    ///
    /// # Examples
    ///
    /// ```
    /// use bibmap::{MarcReader, RecoveryMode};
    /// use std::io::Cursor;
    ///
    /// let reader = MarcReader::new(Cursor::new(Vec::new()))
    ///     .with_recovery_mode(RecoveryMode::Lenient);
    /// ```
    #[must_use]
    pub fn with_recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.recovery_mode = mode;
        self
    }

    /// Read a single MARC record.
    ///
    /// Returns `Ok(Some(record))` if a record was read, `Ok(None)` at EOF.
    /// Whitespace between records (such as line breaks) is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The leader is malformed (the record's bytes are consumed either way)
    /// - The binary data is malformed (in strict mode)
    /// - The record is truncated (in strict mode)
    /// - An I/O error occurs
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            let mut bytes = Vec::new();
            if self.reader.read_until(RECORD_TERMINATOR, &mut bytes)? == 0 {
                return Ok(None);
            }
            let start = bytes
                .iter()
                .position(|byte| !byte.is_ascii_whitespace())
                .unwrap_or(bytes.len());
            match &bytes[start..] {
                [] => return Ok(None),
                [RECORD_TERMINATOR] => continue,
                framed => return self.parse_record(framed).map(Some),
            }
        }
    }

    fn parse_record(&self, bytes: &[u8]) -> Result<Record> {
        let leader = Leader::from_bytes(bytes)?;
        leader.validate_for_reading()?;

        let record_length = leader.record_length()?;
        let base_address = leader.data_base_address()?;
        if base_address > record_length {
            return Err(MarcError::InvalidLeader(format!(
                "Base address {base_address} exceeds record length {record_length}"
            )));
        }

        let record_data = &bytes[LEADER_LENGTH..bytes.len().min(record_length)];
        if record_data.len() < record_length - LEADER_LENGTH
            && self.recovery_mode == RecoveryMode::Strict
        {
            return Err(MarcError::TruncatedRecord(
                "Unexpected end of file while reading record data".to_string(),
            ));
        }

        let directory_end = std::cmp::min(base_address - LEADER_LENGTH, record_data.len());
        let directory = &record_data[..directory_end];
        let data = &record_data[directory_end..];

        let mut record = Record::new(leader);

        // Directory entries are 12 bytes: tag(3) + length(4) + start position(5)
        let mut pos = 0;
        while pos < directory.len() && directory[pos] != FIELD_TERMINATOR {
            if pos + 12 > directory.len() {
                if self.recovery_mode == RecoveryMode::Strict {
                    return Err(MarcError::InvalidRecord(
                        "Incomplete directory entry".to_string(),
                    ));
                }
                break;
            }

            let entry = &directory[pos..pos + 12];
            pos += 12;
            let tag = String::from_utf8_lossy(&entry[0..3]).to_string();
            let bounds = parse_number(&entry[3..7])
                .and_then(|length| parse_number(&entry[7..12]).map(|start| (start, length)));
            let (start, length) = match bounds {
                Ok(bounds) => bounds,
                Err(e) if self.recovery_mode == RecoveryMode::Strict => return Err(e),
                Err(_) => continue,
            };

            let end = start + length;
            if end > data.len() {
                if self.recovery_mode == RecoveryMode::Strict {
                    return Err(MarcError::InvalidRecord(format!(
                        "Field {tag} exceeds data area"
                    )));
                }
                continue;
            }

            let field_data = &data[start..end];
            if is_control_tag(&tag) {
                let body = field_data
                    .strip_suffix(&[FIELD_TERMINATOR])
                    .unwrap_or(field_data);
                record.add_control_field(tag, decode(body));
            } else {
                match parse_data_field(field_data, &tag) {
                    Ok(field) => record.add_field(field),
                    Err(e) if self.recovery_mode == RecoveryMode::Strict => {
                        return Err(MarcError::InvalidField(format!("Tag {tag}: {e}")));
                    },
                    Err(_) => {},
                }
            }
        }

        Ok(record)
    }
}

impl<R: Read> Iterator for MarcReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).nfc().collect()
}

/// Parse a data field from raw bytes
fn parse_data_field(data: &[u8], tag: &str) -> Result<Field> {
    if data.len() < 2 {
        return Err(MarcError::InvalidField(
            "Data field too short (needs indicators)".to_string(),
        ));
    }

    let mut field = Field::new(tag.to_string(), data[0] as char, data[1] as char);

    let subfield_data = &data[2..];
    let mut current = 0;
    while current < subfield_data.len() {
        if subfield_data[current] == FIELD_TERMINATOR {
            break;
        }
        if subfield_data[current] != SUBFIELD_DELIMITER {
            return Err(MarcError::InvalidField(
                "Expected subfield delimiter".to_string(),
            ));
        }

        current += 1;
        if current >= subfield_data.len() {
            break;
        }
        let code = subfield_data[current] as char;
        current += 1;

        let mut end = current;
        while end < subfield_data.len()
            && subfield_data[end] != SUBFIELD_DELIMITER
            && subfield_data[end] != FIELD_TERMINATOR
        {
            end += 1;
        }

        field.add_subfield(code, decode(&subfield_data[current..end]));
        current = end;
    }

    Ok(field)
}

/// Parse an ASCII decimal number from directory bytes
fn parse_number(bytes: &[u8]) -> Result<usize> {
    let mut result = 0usize;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(MarcError::InvalidRecord(format!(
                "Invalid numeric field: expected digits, got byte {}",
                byte as char
            )));
        }
        result = result * 10 + (byte - b'0') as usize;
    }
    Ok(result)
}

/// Encode a record as ISO 2709 bytes.
///
/// Only used to build fixtures; the run itself never writes binary MARC.
#[cfg(test)]
pub(crate) fn encode_record(record: &Record) -> Vec<u8> {
    use crate::record::VariableField;

    let mut directory = Vec::new();
    let mut data = Vec::new();
    for field in record.fields() {
        let start = data.len();
        match field {
            VariableField::Control(control) => data.extend_from_slice(control.data.as_bytes()),
            VariableField::Data(field) => {
                data.push(field.indicator1 as u8);
                data.push(field.indicator2 as u8);
                for subfield in field.subfields() {
                    data.push(SUBFIELD_DELIMITER);
                    data.push(subfield.code as u8);
                    data.extend_from_slice(subfield.value.as_bytes());
                }
            },
        }
        data.push(FIELD_TERMINATOR);
        directory.extend_from_slice(field.tag().as_bytes());
        directory.extend_from_slice(format!("{:04}{:05}", data.len() - start, start).as_bytes());
    }
    directory.push(FIELD_TERMINATOR);
    data.push(RECORD_TERMINATOR);

    let base_address = LEADER_LENGTH + directory.len();
    let record_length = base_address + data.len();
    let tail: String = record.leader.as_str().chars().skip(5).take(7).collect();
    let mut bytes = format!("{record_length:05}{tail:<7}{base_address:05} a 4500").into_bytes();
    bytes.extend_from_slice(&directory);
    bytes.extend_from_slice(&data);
    bytes
}
