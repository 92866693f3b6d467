//! Row-block encoding and decoding.
//!
//! A row block is the unit in which the backend hands result rows to the
//! front end. Most callers forward the encoded payload unchanged to the
//! protocol layer; decoding is lazy and happens only when a caller
//! actually needs the rows.
//!
//! Layout (big-endian):
//!
//! ```text
//! +-------------+----------------------------------+-----------+-------+
//! | ncols (2)   | per column:                      | nrows (4) | cells |
//! |             |   name len (2) + name bytes      |           |       |
//! |             |   logical (1) + physical (1)     |           |       |
//! +-------------+----------------------------------+-----------+-------+
//! ```
//!
//! Each cell is a one-byte kind tag followed by its payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use corvus_common::error::{CorvusError, CorvusResult};

use crate::schema::ColumnSchema;
use crate::types::{LogicalType, PhysicalType, TypePair};
use crate::value::{decode_inet, encode_inet, CqlValue};

const CELL_NULL: u8 = 0;
const CELL_BOOLEAN: u8 = 1;
const CELL_BIGINT: u8 = 2;
const CELL_DOUBLE: u8 = 3;
const CELL_TEXT: u8 = 4;
const CELL_BLOB: u8 = 5;
const CELL_INET: u8 = 6;

/// A decoded block of result rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBlock {
    columns: Vec<ColumnSchema>,
    rows: Vec<Vec<CqlValue>>,
}

impl RowBlock {
    /// Creates an empty row block over the given columns.
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    ///
    /// The cell count must match the column count.
    pub fn push_row(&mut self, row: Vec<CqlValue>) -> CorvusResult<()> {
        if row.len() != self.columns.len() {
            return Err(CorvusError::serialization(format!(
                "row has {} cells, block has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Returns the column schemas in declaration order.
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Vec<CqlValue>] {
        &self.rows
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Serializes this block into its wire form.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u16(self.columns.len() as u16);
        for column in &self.columns {
            buf.put_u16(column.name().len() as u16);
            buf.put_slice(column.name().as_bytes());
            buf.put_u8(column.logical_type().as_u8());
            buf.put_u8(column.physical_type().as_u8());
        }
        buf.put_u32(self.rows.len() as u32);
        for row in &self.rows {
            for cell in row {
                encode_cell(&mut buf, cell);
            }
        }
        buf.freeze()
    }

    /// Deserializes a block from its wire form.
    pub fn decode(mut data: Bytes) -> CorvusResult<Self> {
        let ncols = read_u16(&mut data, "column count")? as usize;
        let mut columns = Vec::with_capacity(ncols);
        for _ in 0..ncols {
            let name_len = read_u16(&mut data, "column name length")? as usize;
            if data.remaining() < name_len {
                return Err(truncated("column name"));
            }
            let name_bytes = data.split_to(name_len);
            let name = std::str::from_utf8(&name_bytes)
                .map_err(|_| CorvusError::serialization("column name is not valid UTF-8"))?
                .to_string();
            let logical = LogicalType::from_u8(read_u8(&mut data, "logical type")?)
                .ok_or_else(|| CorvusError::serialization("unknown logical type tag"))?;
            let physical = PhysicalType::from_u8(read_u8(&mut data, "physical type")?)
                .ok_or_else(|| CorvusError::serialization("unknown physical type tag"))?;
            columns.push(ColumnSchema::new(name, TypePair::new(logical, physical)));
        }

        let nrows = read_u32(&mut data, "row count")? as usize;
        let mut rows = Vec::with_capacity(nrows);
        for _ in 0..nrows {
            let mut row = Vec::with_capacity(ncols);
            for _ in 0..ncols {
                row.push(decode_cell(&mut data)?);
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }
}

fn encode_cell(buf: &mut BytesMut, cell: &CqlValue) {
    match cell {
        CqlValue::Null => buf.put_u8(CELL_NULL),
        CqlValue::Boolean(b) => {
            buf.put_u8(CELL_BOOLEAN);
            buf.put_u8(u8::from(*b));
        }
        CqlValue::BigInt(i) => {
            buf.put_u8(CELL_BIGINT);
            buf.put_i64(*i);
        }
        CqlValue::Double(v) => {
            buf.put_u8(CELL_DOUBLE);
            buf.put_f64(*v);
        }
        CqlValue::Text(s) => {
            buf.put_u8(CELL_TEXT);
            buf.put_u32(s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        CqlValue::Blob(b) => {
            buf.put_u8(CELL_BLOB);
            buf.put_u32(b.len() as u32);
            buf.put_slice(b);
        }
        CqlValue::Inet(addr) => {
            let raw = encode_inet(addr);
            buf.put_u8(CELL_INET);
            buf.put_u8(raw.len() as u8);
            buf.put_slice(&raw);
        }
    }
}

fn decode_cell(data: &mut Bytes) -> CorvusResult<CqlValue> {
    match read_u8(data, "cell tag")? {
        CELL_NULL => Ok(CqlValue::Null),
        CELL_BOOLEAN => Ok(CqlValue::Boolean(read_u8(data, "boolean cell")? != 0)),
        CELL_BIGINT => {
            if data.remaining() < 8 {
                return Err(truncated("bigint cell"));
            }
            Ok(CqlValue::BigInt(data.get_i64()))
        }
        CELL_DOUBLE => {
            if data.remaining() < 8 {
                return Err(truncated("double cell"));
            }
            Ok(CqlValue::Double(data.get_f64()))
        }
        CELL_TEXT => {
            let len = read_u32(data, "text length")? as usize;
            if data.remaining() < len {
                return Err(truncated("text cell"));
            }
            let bytes = data.split_to(len);
            let text = std::str::from_utf8(&bytes)
                .map_err(|_| CorvusError::serialization("text cell is not valid UTF-8"))?;
            Ok(CqlValue::Text(text.to_string()))
        }
        CELL_BLOB => {
            let len = read_u32(data, "blob length")? as usize;
            if data.remaining() < len {
                return Err(truncated("blob cell"));
            }
            Ok(CqlValue::Blob(data.split_to(len).to_vec()))
        }
        CELL_INET => {
            let len = read_u8(data, "inet length")? as usize;
            if data.remaining() < len {
                return Err(truncated("inet cell"));
            }
            let raw = data.split_to(len);
            Ok(CqlValue::Inet(decode_inet(&raw)?))
        }
        tag => Err(CorvusError::serialization(format!(
            "unknown cell tag {:#04x}",
            tag
        ))),
    }
}

fn read_u8(data: &mut Bytes, what: &str) -> CorvusResult<u8> {
    if data.remaining() < 1 {
        return Err(truncated(what));
    }
    Ok(data.get_u8())
}

fn read_u16(data: &mut Bytes, what: &str) -> CorvusResult<u16> {
    if data.remaining() < 2 {
        return Err(truncated(what));
    }
    Ok(data.get_u16())
}

fn read_u32(data: &mut Bytes, what: &str) -> CorvusResult<u32> {
    if data.remaining() < 4 {
        return Err(truncated(what));
    }
    Ok(data.get_u32())
}

fn truncated(what: &str) -> CorvusError {
    CorvusError::serialization(format!("row block truncated reading {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn sample_columns() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema::new("id", TypePair::of(LogicalType::BigInt)),
            ColumnSchema::new("name", TypePair::of(LogicalType::Text)),
            ColumnSchema::new("addr", TypePair::of(LogicalType::Inet)),
        ]
    }

    #[test]
    fn test_round_trip_preserves_columns() {
        let mut block = RowBlock::new(sample_columns());
        let addr: IpAddr = "192.168.1.1".parse().unwrap();
        block
            .push_row(vec![
                CqlValue::BigInt(1),
                CqlValue::Text("alice".to_string()),
                CqlValue::Inet(addr),
            ])
            .unwrap();
        block
            .push_row(vec![CqlValue::BigInt(2), CqlValue::Null, CqlValue::Null])
            .unwrap();

        let decoded = RowBlock::decode(block.encode()).unwrap();

        assert_eq!(decoded.column_count(), block.column_count());
        for (a, b) in decoded.columns().iter().zip(block.columns()) {
            assert_eq!(a, b);
        }
        assert_eq!(decoded.rows(), block.rows());
    }

    #[test]
    fn test_empty_block() {
        let block = RowBlock::new(sample_columns());
        let decoded = RowBlock::decode(block.encode()).unwrap();
        assert_eq!(decoded.row_count(), 0);
        assert_eq!(decoded.column_count(), 3);
    }

    #[test]
    fn test_row_arity_checked() {
        let mut block = RowBlock::new(sample_columns());
        let err = block.push_row(vec![CqlValue::BigInt(1)]).unwrap_err();
        assert!(matches!(err, CorvusError::SerializationFailed { .. }));
    }

    #[test]
    fn test_truncated_payload() {
        let mut block = RowBlock::new(sample_columns());
        block
            .push_row(vec![
                CqlValue::BigInt(1),
                CqlValue::Text("bob".to_string()),
                CqlValue::Null,
            ])
            .unwrap();
        let encoded = block.encode();
        let cut = encoded.slice(..encoded.len() - 2);
        let err = RowBlock::decode(cut).unwrap_err();
        assert!(matches!(err, CorvusError::SerializationFailed { .. }));
    }

    #[test]
    fn test_unknown_cell_tag() {
        let mut block = RowBlock::new(vec![ColumnSchema::new(
            "x",
            TypePair::of(LogicalType::BigInt),
        )]);
        block.push_row(vec![CqlValue::BigInt(9)]).unwrap();
        let mut raw = block.encode().to_vec();
        // Overwrite the first cell tag with garbage.
        let tag_offset = raw.len() - 9;
        raw[tag_offset] = 0xEE;
        let err = RowBlock::decode(Bytes::from(raw)).unwrap_err();
        assert!(err.to_string().contains("unknown cell tag"));
    }
}
