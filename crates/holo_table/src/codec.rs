//! Key layout for cell versions inside a group partition.
//!
//! Every version of a cell is one entry keyed by
//! `escaped(row_key) ++ escaped(attribute) ++ !timestamp`, where `escaped`
//! doubles every `0x00` as `0x00 0xFF` and terminates with `0x00 0x01`. The
//! escaping keeps byte order of row keys intact across variable lengths, and
//! the inverted big-endian timestamp makes a prefix scan yield the newest
//! version first.

use crate::clock::Timestamp;

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0xFF;
const TERMINATOR: u8 = 0x01;

/// Decoded form of one version entry key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellKey {
    pub row_key: Vec<u8>,
    pub attribute: Vec<u8>,
    pub timestamp: Timestamp,
}

fn push_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        out.push(b);
        if b == ESCAPE {
            out.push(ESCAPED_ZERO);
        }
    }
    out.push(ESCAPE);
    out.push(TERMINATOR);
}

/// Prefix shared by every version of one cell.
pub fn encode_cell_prefix(row_key: &[u8], attribute: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(row_key.len() + attribute.len() + 4 + 8);
    push_escaped(&mut out, row_key);
    push_escaped(&mut out, attribute);
    out
}

pub fn encode_cell_key(row_key: &[u8], attribute: &[u8], timestamp: Timestamp) -> Vec<u8> {
    let mut out = encode_cell_prefix(row_key, attribute);
    out.extend_from_slice(&(u64::MAX - timestamp.as_micros()).to_be_bytes());
    out
}

pub fn decode_cell_key(data: &[u8]) -> Result<CellKey, &'static str> {
    let mut offset = 0usize;
    let row_key = read_escaped(data, &mut offset)?;
    let attribute = read_escaped(data, &mut offset)?;
    let inverted = read_u64(data, &mut offset)?;
    if offset != data.len() {
        return Err("trailing bytes after timestamp");
    }
    Ok(CellKey {
        row_key,
        attribute,
        timestamp: Timestamp::from_micros(u64::MAX - inverted),
    })
}

fn read_escaped(data: &[u8], offset: &mut usize) -> Result<Vec<u8>, &'static str> {
    let mut out = Vec::new();
    while *offset < data.len() {
        let b = data[*offset];
        *offset += 1;
        if b != ESCAPE {
            out.push(b);
            continue;
        }
        let Some(&next) = data.get(*offset) else {
            return Err("dangling escape byte");
        };
        *offset += 1;
        match next {
            TERMINATOR => return Ok(out),
            ESCAPED_ZERO => out.push(ESCAPE),
            _ => return Err("invalid escape sequence"),
        }
    }
    Err("unterminated key segment")
}

fn read_u64(data: &[u8], offset: &mut usize) -> Result<u64, &'static str> {
    if *offset + 8 > data.len() {
        return Err("short u64");
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[*offset..*offset + 8]);
    *offset += 8;
    Ok(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_prefixes_sort_like_raw_row_keys() {
        let mut raw: Vec<&[u8]> = vec![
            &b"ab"[..],
            &b"a"[..],
            &b"a\x00"[..],
            &b"b"[..],
            &b"a_2020"[..],
            &b"a\x00z"[..],
        ];
        let mut encoded: Vec<(Vec<u8>, &[u8])> =
            raw.iter().map(|k| (encode_cell_prefix(k, b"name"), *k)).collect();
        raw.sort();
        encoded.sort();
        let order: Vec<&[u8]> = encoded.into_iter().map(|(_, k)| k).collect();
        assert_eq!(order, raw);
    }

    #[test]
    fn newer_versions_sort_first() {
        let old = encode_cell_key(b"user", b"description", Timestamp::from_micros(10));
        let new = encode_cell_key(b"user", b"description", Timestamp::from_micros(11));
        assert!(new < old);
        assert!(new.starts_with(&encode_cell_prefix(b"user", b"description")));
    }

    #[test]
    fn decodes_keys_with_embedded_zero_bytes() {
        let key = encode_cell_key(b"a\x00b", b"x", Timestamp::from_micros(42));
        let decoded = decode_cell_key(&key).unwrap();
        assert_eq!(decoded.row_key, b"a\x00b".to_vec());
        assert_eq!(decoded.attribute, b"x".to_vec());
        assert_eq!(decoded.timestamp.as_micros(), 42);
    }

    #[test]
    fn rejects_truncated_keys() {
        let key = encode_cell_key(b"row", b"attr", Timestamp::from_micros(1));
        assert!(decode_cell_key(&key[..key.len() - 3]).is_err());
        assert!(decode_cell_key(b"row").is_err());
    }
}
