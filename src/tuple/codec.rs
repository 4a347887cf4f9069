use bytes::{Buf, BufMut};

use crate::common::{HeapDbError, Result};

use super::{DataType, Record, Schema, Value};

const PAD: u8 = b' ';

/// Stateless fixed-layout encoder/decoder between records and slot bytes.
///
/// Values are laid out in column order, each at its column's fixed width:
/// INT and FLOAT as 4 big-endian bytes, CHAR(n) as n space-padded bytes and
/// VARCHAR(n) as a 4-byte length followed by n space-padded bytes.
pub struct RecordCodec;

impl RecordCodec {
    /// Encodes `record` into the first `schema.record_width()` bytes of `buf`.
    pub fn encode(schema: &Schema, record: &Record, buf: &mut [u8]) -> Result<()> {
        if record.len() != schema.column_count() {
            return Err(HeapDbError::SchemaMismatch {
                expected: schema.column_count(),
                actual: record.len(),
            });
        }
        check_span(schema, buf.len())?;

        let mut out = &mut buf[..schema.record_width()];
        for (column, value) in schema.columns().zip(record.values()) {
            let data_type = column.data_type();
            match (value.coerce_to(data_type)?, data_type) {
                (Value::Int(v), _) => out.put_i32(v),
                (Value::Float(v), _) => out.put_f32(v),
                (Value::Text(s), DataType::Char(n)) => {
                    put_padded(&mut out, &s, *n as usize);
                }
                (Value::Text(s), DataType::VarChar(n)) => {
                    let n = *n as usize;
                    let text = truncate_utf8(&s, n);
                    out.put_i32(text.len() as i32);
                    put_padded(&mut out, text, n);
                }
                (Value::Text(s), _) => {
                    return Err(HeapDbError::ValueConversion {
                        value: s,
                        target: data_type.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Encodes `record` into a freshly allocated buffer of the record width.
    pub fn encode_to_vec(schema: &Schema, record: &Record) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; schema.record_width()];
        Self::encode(schema, record, &mut buf)?;
        Ok(buf)
    }

    /// Decodes a record from the first `schema.record_width()` bytes of `buf`.
    pub fn decode(schema: &Schema, buf: &[u8]) -> Result<Record> {
        check_span(schema, buf.len())?;

        let mut input = &buf[..schema.record_width()];
        let mut values = Vec::with_capacity(schema.column_count());
        for column in schema.columns() {
            let value = match column.data_type() {
                DataType::Int => Value::Int(input.get_i32()),
                DataType::Float => Value::Float(input.get_f32()),
                DataType::Char(n) => {
                    let n = *n as usize;
                    let text = String::from_utf8_lossy(&input[..n])
                        .trim_end_matches(' ')
                        .to_string();
                    input.advance(n);
                    Value::Text(text)
                }
                DataType::VarChar(n) => {
                    let n = *n as usize;
                    let len = input.get_i32();
                    if len < 0 || len as usize > n {
                        return Err(HeapDbError::CorruptRecord(format!(
                            "column {} has length {} but holds at most {} bytes",
                            column.name(),
                            len,
                            n
                        )));
                    }
                    let text = String::from_utf8_lossy(&input[..len as usize]).into_owned();
                    input.advance(n);
                    Value::Text(text)
                }
            };
            values.push(value);
        }
        Ok(Record::new(values))
    }
}

fn check_span(schema: &Schema, actual: usize) -> Result<()> {
    if actual < schema.record_width() {
        return Err(HeapDbError::SizeMismatch {
            expected: schema.record_width(),
            actual,
        });
    }
    Ok(())
}

/// Writes at most `width` bytes of `text`, then pads with spaces up to `width`.
fn put_padded(out: &mut &mut [u8], text: &str, width: usize) {
    let bytes = truncate_utf8(text, width).as_bytes();
    out.put_slice(bytes);
    out.put_bytes(PAD, width - bytes.len());
}

/// Longest prefix of `text` that fits in `max_len` bytes without splitting a character.
fn truncate_utf8(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn etudiants() -> Schema {
        Schema::builder()
            .column("id", DataType::Int)
            .column("nom", DataType::Char(10))
            .column("age", DataType::Int)
            .build()
    }

    #[test]
    fn test_encode_layout() {
        let schema = etudiants();
        let record = Record::new(vec![Value::Int(1), Value::from("Alice"), Value::Int(22)]);

        let bytes = RecordCodec::encode_to_vec(&schema, &record).unwrap();
        assert_eq!(bytes.len(), 18);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..14], b"Alice     ");
        assert_eq!(&bytes[14..18], &[0, 0, 0, 22]);
    }

    #[test]
    fn test_round_trip_strips_char_padding() {
        let schema = Schema::builder()
            .column("id", DataType::Int)
            .column("score", DataType::Float)
            .column("code", DataType::Char(4))
            .column("note", DataType::VarChar(8))
            .build();
        let record = Record::new(vec![
            Value::Int(-7),
            Value::Float(3.25),
            Value::from("ab"),
            Value::from("hi there"),
        ]);

        let bytes = RecordCodec::encode_to_vec(&schema, &record).unwrap();
        let decoded = RecordCodec::decode(&schema, &bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_char_truncation() {
        let schema = Schema::builder().column("nom", DataType::Char(3)).build();
        let record = Record::new(vec![Value::from("Charlie")]);

        let bytes = RecordCodec::encode_to_vec(&schema, &record).unwrap();
        assert_eq!(bytes, b"Cha");
        assert_eq!(
            RecordCodec::decode(&schema, &bytes).unwrap(),
            Record::new(vec![Value::from("Cha")])
        );
    }

    #[test]
    fn test_varchar_truncation() {
        let schema = Schema::builder().column("v", DataType::VarChar(5)).build();
        let record = Record::new(vec![Value::from("HelloWorld")]);

        let bytes = RecordCodec::encode_to_vec(&schema, &record).unwrap();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 5]);
        assert_eq!(&bytes[4..9], b"Hello");

        let decoded = RecordCodec::decode(&schema, &bytes).unwrap();
        assert_eq!(decoded.value(0), Some(&Value::from("Hello")));
    }

    #[test]
    fn test_varchar_padding_not_returned() {
        let schema = Schema::builder()
            .column("v", DataType::VarChar(6))
            .column("n", DataType::Int)
            .build();
        let record = Record::new(vec![Value::from("ab "), Value::Int(9)]);

        let bytes = RecordCodec::encode_to_vec(&schema, &record).unwrap();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 3]);
        assert_eq!(&bytes[4..10], b"ab    ");

        // trailing spaces inside the stated length survive
        let decoded = RecordCodec::decode(&schema, &bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_truncation_keeps_utf8_boundaries() {
        let schema = Schema::builder().column("v", DataType::VarChar(3)).build();
        let record = Record::new(vec![Value::from("héllo")]);

        let bytes = RecordCodec::encode_to_vec(&schema, &record).unwrap();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 3]);
        let decoded = RecordCodec::decode(&schema, &bytes).unwrap();
        assert_eq!(decoded.value(0), Some(&Value::from("hé")));
    }

    #[test]
    fn test_text_coerced_into_numeric_columns() {
        let schema = etudiants();
        let record = Record::new(vec![Value::from("4"), Value::from("Dan"), Value::from("30")]);

        let bytes = RecordCodec::encode_to_vec(&schema, &record).unwrap();
        let decoded = RecordCodec::decode(&schema, &bytes).unwrap();
        assert_eq!(
            decoded,
            Record::new(vec![Value::Int(4), Value::from("Dan"), Value::Int(30)])
        );
    }

    #[test]
    fn test_schema_mismatch() {
        let schema = etudiants();
        let record = Record::new(vec![Value::Int(1), Value::from("Alice")]);

        assert!(matches!(
            RecordCodec::encode_to_vec(&schema, &record),
            Err(HeapDbError::SchemaMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_value_conversion_error() {
        let schema = etudiants();
        let record = Record::new(vec![Value::from("one"), Value::from("Alice"), Value::Int(2)]);

        assert!(matches!(
            RecordCodec::encode_to_vec(&schema, &record),
            Err(HeapDbError::ValueConversion { .. })
        ));
    }

    #[test]
    fn test_short_buffer() {
        let schema = etudiants();
        let record = Record::new(vec![Value::Int(1), Value::from("A"), Value::Int(2)]);
        let mut buf = [0u8; 10];

        assert!(matches!(
            RecordCodec::encode(&schema, &record, &mut buf),
            Err(HeapDbError::SizeMismatch { expected: 18, actual: 10 })
        ));
        assert!(matches!(
            RecordCodec::decode(&schema, &buf),
            Err(HeapDbError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupt_varchar_length() {
        let schema = Schema::builder().column("v", DataType::VarChar(2)).build();
        let bytes = [0, 0, 0, 9, b'a', b'b'];

        assert!(matches!(
            RecordCodec::decode(&schema, &bytes),
            Err(HeapDbError::CorruptRecord(_))
        ));
    }
}
