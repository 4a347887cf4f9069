use std::fs;
use std::path::Path;

use bytes::{Buf, BufMut};

use crate::common::{HeapDbError, PageId, Result};
use crate::tuple::{Column, DataType};

/// What the catalog file records about one table: enough to reopen its heap
/// without replaying inserts.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub header_page_id: PageId,
    pub columns: Vec<Column>,
}

/// Catalog file layout, all integers big-endian:
///
/// ```text
/// i32 table_count
/// per table:
///     u16 len + UTF-8 name
///     i32 header.file_idx, i32 header.page_idx
///     i32 column_count
///     per column: u16 len + UTF-8 name, u16 len + UTF-8 type (e.g. "CHAR(10)")
/// ```
pub fn encode_catalog(entries: &[CatalogEntry]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.put_i32(entries.len() as i32);

    for entry in entries {
        put_string(&mut out, &entry.name)?;
        out.put_i32(entry.header_page_id.file_idx as i32);
        out.put_i32(entry.header_page_id.page_idx as i32);
        out.put_i32(entry.columns.len() as i32);
        for column in &entry.columns {
            put_string(&mut out, column.name())?;
            put_string(&mut out, &column.data_type().to_string())?;
        }
    }
    Ok(out)
}

/// Parses bytes produced by [`encode_catalog`].
pub fn decode_catalog(mut input: &[u8]) -> Result<Vec<CatalogEntry>> {
    let table_count = get_count(&mut input, "table count")?;
    let mut entries = Vec::new();

    for _ in 0..table_count {
        let name = get_string(&mut input)?;
        let file_idx = get_count(&mut input, "header file index")?;
        let page_idx = get_count(&mut input, "header page index")?;
        let column_count = get_count(&mut input, "column count")?;

        let mut columns = Vec::new();
        for _ in 0..column_count {
            let column_name = get_string(&mut input)?;
            let type_name = get_string(&mut input)?;
            let data_type = type_name.parse::<DataType>().map_err(|_| {
                HeapDbError::CatalogCorrupted(format!(
                    "table {} column {} has unknown type {}",
                    name, column_name, type_name
                ))
            })?;
            columns.push(Column::new(column_name, data_type));
        }

        entries.push(CatalogEntry {
            name,
            header_page_id: PageId::new(file_idx as u32, page_idx as u32),
            columns,
        });
    }

    if input.has_remaining() {
        return Err(HeapDbError::CatalogCorrupted(format!(
            "{} trailing bytes",
            input.remaining()
        )));
    }
    Ok(entries)
}

/// Writes the catalog file, replacing any previous one.
pub fn write_catalog(path: &Path, entries: &[CatalogEntry]) -> Result<()> {
    let bytes = encode_catalog(entries)?;
    let tmp = path.with_extension("save.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads the catalog file. A missing file is an empty catalog.
pub fn read_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    decode_catalog(&fs::read(path)?)
}

fn put_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    let len = u16::try_from(s.len()).map_err(|_| {
        HeapDbError::CatalogCorrupted(format!("name of {} bytes is too long", s.len()))
    })?;
    out.put_u16(len);
    out.put_slice(s.as_bytes());
    Ok(())
}

fn get_string(input: &mut &[u8]) -> Result<String> {
    ensure(input, 2, "string length")?;
    let len = input.get_u16() as usize;
    ensure(input, len, "string bytes")?;

    let text = std::str::from_utf8(&input[..len])
        .map_err(|e| HeapDbError::CatalogCorrupted(format!("invalid UTF-8 name: {}", e)))?
        .to_string();
    input.advance(len);
    Ok(text)
}

fn get_count(input: &mut &[u8], what: &str) -> Result<usize> {
    ensure(input, 4, what)?;
    let value = input.get_i32();
    usize::try_from(value)
        .map_err(|_| HeapDbError::CatalogCorrupted(format!("negative {}: {}", what, value)))
}

fn ensure(input: &[u8], needed: usize, what: &str) -> Result<()> {
    if input.len() < needed {
        return Err(HeapDbError::CatalogCorrupted(format!(
            "truncated while reading {}",
            what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry {
                name: "Etudiants".to_string(),
                header_page_id: PageId::new(0, 0),
                columns: vec![
                    Column::new("id", DataType::Int),
                    Column::new("nom", DataType::Char(10)),
                ],
            },
            CatalogEntry {
                name: "Notes".to_string(),
                header_page_id: PageId::new(1, 7),
                columns: vec![Column::new("moyenne", DataType::Float)],
            },
        ]
    }

    #[test]
    fn test_encoded_layout() {
        let bytes = encode_catalog(&entries()[1..]).unwrap();
        let mut expected = vec![0, 0, 0, 1];
        expected.extend_from_slice(&[0, 5]);
        expected.extend_from_slice(b"Notes");
        expected.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 7]);
        expected.extend_from_slice(&[0, 0, 0, 1]);
        expected.extend_from_slice(&[0, 7]);
        expected.extend_from_slice(b"moyenne");
        expected.extend_from_slice(&[0, 5]);
        expected.extend_from_slice(b"FLOAT");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_decode_restores_entries() {
        let bytes = encode_catalog(&entries()).unwrap();
        assert_eq!(decode_catalog(&bytes).unwrap(), entries());
    }

    #[test]
    fn test_truncated_catalog() {
        let bytes = encode_catalog(&entries()).unwrap();
        assert!(matches!(
            decode_catalog(&bytes[..bytes.len() - 3]),
            Err(HeapDbError::CatalogCorrupted(_))
        ));
        assert!(matches!(
            decode_catalog(&[0, 0]),
            Err(HeapDbError::CatalogCorrupted(_))
        ));
    }

    #[test]
    fn test_huge_counts_are_corruption() {
        assert!(matches!(
            decode_catalog(&[0x7f, 0xff, 0xff, 0xff]),
            Err(HeapDbError::CatalogCorrupted(_))
        ));

        let mut bytes = vec![0, 0, 0, 1, 0, 1, b'T', 0, 0, 0, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&[0x7f, 0xff, 0xff, 0xff]);
        assert!(matches!(
            decode_catalog(&bytes),
            Err(HeapDbError::CatalogCorrupted(_))
        ));
    }

    #[test]
    fn test_unknown_type_is_corruption() {
        let mut bytes = vec![0, 0, 0, 1, 0, 1, b'T', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        bytes.extend_from_slice(&[0, 1, b'c', 0, 4, b'T', b'E', b'X', b'T']);
        assert!(matches!(
            decode_catalog(&bytes),
            Err(HeapDbError::CatalogCorrupted(_))
        ));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.save");
        assert!(read_catalog(&path).unwrap().is_empty());

        write_catalog(&path, &entries()).unwrap();
        assert_eq!(read_catalog(&path).unwrap(), entries());
    }
}
