//! Canonical binary encoding
//!
//! Protobuf-compatible stable marshaling: fields are emitted in ascending
//! field-number order, zero and empty values are omitted, nested messages are
//! length-delimited. The store hashes and verifies exactly these bytes, so the
//! output for a given value must never change.

const WIRE_VARINT: u64 = 0;
const WIRE_LEN: u64 = 2;

/// Append-only writer for stable-marshaled messages
///
/// Callers must write fields in ascending field-number order.
#[derive(Debug, Default)]
pub struct StableWriter {
    buf: Vec<u8>,
}

impl StableWriter {
    /// Empty writer
    pub fn new() -> Self {
        Self::default()
    }

    fn varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    fn key(&mut self, field: u32, wire_type: u64) {
        self.varint((u64::from(field) << 3) | wire_type);
    }

    /// Unsigned integer field
    pub fn uint64(&mut self, field: u32, v: u64) -> &mut Self {
        if v != 0 {
            self.key(field, WIRE_VARINT);
            self.varint(v);
        }
        self
    }

    /// Enum field, encoded as its numeric value
    pub fn enumeration(&mut self, field: u32, v: u64) -> &mut Self {
        self.uint64(field, v)
    }

    /// Bytes or string field
    pub fn bytes(&mut self, field: u32, v: &[u8]) -> &mut Self {
        if !v.is_empty() {
            self.key(field, WIRE_LEN);
            self.varint(v.len() as u64);
            self.buf.extend_from_slice(v);
        }
        self
    }

    /// Nested message field built by `f`
    pub fn message(&mut self, field: u32, f: impl FnOnce(&mut StableWriter)) -> &mut Self {
        let mut nested = StableWriter::new();
        f(&mut nested);
        self.bytes(field, &nested.buf)
    }

    /// Nested message that is emitted even when its body is empty
    ///
    /// Repeated message entries keep their position this way.
    pub fn repeated_message(&mut self, field: u32, f: impl FnOnce(&mut StableWriter)) -> &mut Self {
        let mut nested = StableWriter::new();
        f(&mut nested);
        self.key(field, WIRE_LEN);
        self.varint(nested.buf.len() as u64);
        self.buf.extend_from_slice(&nested.buf);
        self
    }

    /// Finished encoding
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
