//! Bit cursor plus tree builder: every read can be recorded as a named field.
use crate::checksum;
use crate::errors::{Error, Result};
use crate::mapper::{Actual, MapEntry, Mapper, Scalar, apply_all};
use crate::modes::TimingMode;
use crate::structs::{BitCursor, BitRange, Endian, Part, Split};
use crate::tree::{Field, Group, Node, Validation};

pub struct DecodeCtx<'a> {
    cursor: BitCursor<'a>,
    stack: Vec<Group>,
    modes: Vec<TimingMode>,
    trim_strings: bool,
}

enum Kind {
    Struct,
    Array,
}

impl<'a> DecodeCtx<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        DecodeCtx {
            cursor: BitCursor::new(data),
            stack: vec![Group::new("")],
            modes: Vec::new(),
            trim_strings: true,
        }
    }

    pub fn set_trim_strings(&mut self, trim: bool) {
        self.trim_strings = trim;
    }

    /// Whether descriptor text drops its newline and space padding.
    pub fn trim_strings(&self) -> bool {
        self.trim_strings
    }

    pub fn record_mode(&mut self, mode: TimingMode) {
        self.modes.push(mode);
    }

    pub fn take_modes(&mut self) -> Vec<TimingMode> {
        std::mem::take(&mut self.modes)
    }

    /// The root group with everything emitted so far.
    pub fn finish(mut self) -> Group {
        while self.stack.len() > 1 {
            self.close(Kind::Struct);
        }
        self.stack.pop().unwrap_or_else(|| Group::new(""))
    }

    pub fn pos(&self) -> usize {
        self.cursor.pos()
    }

    pub fn bits_left(&self) -> usize {
        self.cursor.bits_left()
    }

    pub fn frame_start(&self) -> usize {
        self.cursor.frame_start()
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.cursor.set_endian(endian);
    }

    pub fn read_uint(&mut self, nbits: usize) -> Result<u64> {
        self.cursor.read_uint(nbits)
    }

    pub fn peek_uint(&self, nbits: usize) -> Result<u64> {
        self.cursor.peek_uint(nbits)
    }

    pub fn read_part(&mut self, nbits: usize) -> Result<Part> {
        self.cursor.read_part(nbits)
    }

    pub fn seek_relative(&mut self, delta_bits: i64) -> Result<()> {
        self.cursor.seek_relative(delta_bits)
    }

    /// Bytes of the whole buffer, ignoring frames.
    pub fn bytes_range(&self, first_byte: usize, nbytes: usize) -> Result<&'a [u8]> {
        let data = self.cursor.data();
        data.get(first_byte..first_byte + nbytes)
            .ok_or(Error::OutOfBounds {
                pos: first_byte * 8,
                need: nbytes * 8,
                end: data.len() * 8,
            })
    }

    fn top(&mut self) -> &mut Group {
        if self.stack.is_empty() {
            self.stack.push(Group::new(""));
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn push(&mut self, node: Node) {
        self.top().children.push(node);
    }

    fn close(&mut self, kind: Kind) {
        if let Some(group) = self.stack.pop() {
            let node = match kind {
                Kind::Struct => Node::Struct(group),
                Kind::Array => Node::Array(group),
            };
            self.push(node);
        }
    }

    pub fn emit(
        &mut self,
        name: impl Into<String>,
        ranges: Vec<BitRange>,
        scalar: Scalar,
        validation: Option<Validation>,
    ) {
        self.push(Node::Field(Field {
            name: name.into(),
            ranges,
            scalar,
            validation,
        }));
    }

    /// Record a value decoded elsewhere against explicit bit ranges.
    pub fn field_value_uint(
        &mut self,
        name: impl Into<String>,
        value: u64,
        ranges: Vec<BitRange>,
        mappers: &[Mapper],
    ) {
        let scalar = apply_all(Scalar::uint(value), mappers);
        self.emit(name, ranges, scalar, None);
    }

    pub fn field_split(&mut self, name: impl Into<String>, split: &Split, mappers: &[Mapper]) {
        self.field_value_uint(name, split.value, split.ranges.clone(), mappers);
    }

    pub fn field_value_float(
        &mut self,
        name: impl Into<String>,
        value: f64,
        ranges: Vec<BitRange>,
        mappers: &[Mapper],
    ) {
        let scalar = apply_all(Scalar::float(value), mappers);
        self.emit(name, ranges, scalar, None);
    }

    pub fn field_value_str(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.emit(name, vec![], Scalar::new(Actual::Str(value.into())), None);
    }

    pub fn field_value_bool(&mut self, name: impl Into<String>, value: bool) {
        self.emit(name, vec![], Scalar::new(Actual::Bool(value)), None);
    }

    pub fn field_uint(
        &mut self,
        name: impl Into<String>,
        nbits: usize,
        mappers: &[Mapper],
    ) -> Result<u64> {
        let part = self.cursor.read_part(nbits)?;
        self.field_value_uint(name, part.value, vec![part.range], mappers);
        Ok(part.value)
    }

    /// As [`Self::field_uint`] but big-endian whatever the active byte order.
    pub fn field_uint_be(
        &mut self,
        name: impl Into<String>,
        nbits: usize,
        mappers: &[Mapper],
    ) -> Result<u64> {
        let range = BitRange::new(self.cursor.pos(), nbits);
        let value = self.cursor.read_uint_be(nbits)?;
        self.field_value_uint(name, value, vec![range], mappers);
        Ok(value)
    }

    pub fn field_bool(&mut self, name: impl Into<String>) -> Result<bool> {
        let range = BitRange::new(self.cursor.pos(), 1);
        let value = self.cursor.read_uint(1)? == 1;
        self.emit(name, vec![range], Scalar::new(Actual::Bool(value)), None);
        Ok(value)
    }

    /// Read a field and flag it, without stopping, if it differs from `expected`.
    pub fn field_uint_validate(
        &mut self,
        name: impl Into<String>,
        nbits: usize,
        expected: u64,
        mappers: &[Mapper],
    ) -> Result<u64> {
        let part = self.cursor.read_part(nbits)?;
        let scalar = apply_all(Scalar::uint(part.value), mappers);
        let validation = (part.value != expected).then(|| Validation::Unexpected {
            expected: format!("0x{:02x}", expected),
            found: format!("0x{:02x}", part.value),
        });
        self.emit(name, vec![part.range], scalar, validation);
        Ok(part.value)
    }

    pub fn field_raw(&mut self, name: impl Into<String>, nbytes: usize) -> Result<Vec<u8>> {
        let range = BitRange::new(self.cursor.pos(), nbytes * 8);
        let bytes = self.cursor.read_bytes(nbytes)?;
        self.emit(
            name,
            vec![range],
            Scalar::new(Actual::Bytes(bytes.clone())),
            None,
        );
        Ok(bytes)
    }

    /// Raw bytes the caller marks as failed, e.g. a record that could not be decoded.
    pub fn field_raw_failed(
        &mut self,
        name: impl Into<String>,
        nbytes: usize,
        validation: Validation,
    ) -> Result<()> {
        let range = BitRange::new(self.cursor.pos(), nbytes * 8);
        let bytes = self.cursor.read_bytes(nbytes)?;
        self.emit(
            name,
            vec![range],
            Scalar::new(Actual::Bytes(bytes)),
            Some(validation),
        );
        Ok(())
    }

    /// Raw bytes that should equal `expected`; a mismatch is recorded, not raised.
    pub fn field_raw_validate(&mut self, name: impl Into<String>, expected: &[u8]) -> Result<bool> {
        let range = BitRange::new(self.cursor.pos(), expected.len() * 8);
        let bytes = self.cursor.read_bytes(expected.len())?;
        let ok = bytes == expected;
        let validation = (!ok).then(|| Validation::Unexpected {
            expected: hex(expected),
            found: hex(&bytes),
        });
        self.emit(
            name,
            vec![range],
            Scalar::new(Actual::Bytes(bytes)),
            validation,
        );
        Ok(ok)
    }

    /// Raw bytes that must equal `expected`; a mismatch ends the decode.
    pub fn field_raw_assert(&mut self, name: &str, expected: &[u8]) -> Result<()> {
        let range = BitRange::new(self.cursor.pos(), expected.len() * 8);
        let bytes = self.cursor.read_bytes(expected.len())?;
        if bytes != expected {
            return Err(Error::AssertionFailed {
                name: name.to_string(),
                expected: hex(expected),
                found: hex(&bytes),
            });
        }
        self.emit(name, vec![range], Scalar::new(Actual::Bytes(bytes)), None);
        Ok(())
    }

    /// Fixed-width text in the display descriptor code page.
    pub fn field_text(&mut self, name: impl Into<String>, nbytes: usize, trim: bool) -> Result<String> {
        let range = BitRange::new(self.cursor.pos(), nbytes * 8);
        let bytes = self.cursor.read_bytes(nbytes)?;
        let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(&bytes);
        let text = if trim {
            text.trim_matches(['\n', ' ']).to_string()
        } else {
            text.into_owned()
        };
        self.emit(name, vec![range], Scalar::new(Actual::Str(text.clone())), None);
        Ok(text)
    }

    /// Checksum byte closing the record that starts at `record_start_byte`.
    pub fn field_checksum(&mut self, name: impl Into<String>, record_start_byte: usize) -> Result<bool> {
        let pos = self.cursor.pos();
        let body = self.bytes_range(record_start_byte, (pos / 8).saturating_sub(record_start_byte))?;
        let expected = checksum::expected(body) as u64;
        let part = self.cursor.read_part(8)?;
        let scalar = apply_all(Scalar::uint(part.value), &[Mapper::Hex]);
        let ok = part.value == expected;
        if !ok {
            tracing::warn!(
                record = record_start_byte / 128,
                expected,
                found = part.value,
                "checksum mismatch"
            );
        }
        let validation = (!ok).then_some(Validation::ChecksumMismatch {
            expected,
            found: part.value,
        });
        self.emit(name, vec![part.range], scalar, validation);
        Ok(ok)
    }

    /// One field per set bit of `flags`, most significant first, named through
    /// `table` by bit index (0 = least significant).
    pub fn field_flags(
        &mut self,
        name: &str,
        flags: u64,
        first_bit: usize,
        table: &'static [MapEntry],
    ) {
        for i in (0..8).rev() {
            if flags >> i & 0x1 == 1 {
                let range = BitRange::new(first_bit + (7 - i), 1);
                self.field_value_uint(name, i as u64, vec![range], &[Mapper::Lookup(table)]);
            }
        }
    }

    pub fn field_struct<T>(
        &mut self,
        name: impl Into<String>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.stack.push(Group::new(name));
        let result = f(self);
        self.close(Kind::Struct);
        result
    }

    pub fn field_array<T>(
        &mut self,
        name: impl Into<String>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.stack.push(Group::new(name));
        let result = f(self);
        self.close(Kind::Array);
        result
    }

    /// Run `f` confined to the next `nbits`; afterwards the cursor sits just past them.
    pub fn framed<T>(&mut self, nbits: usize, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let end = self.cursor.pos() + nbits;
        let guard = self.cursor.narrow(end)?;
        let result = f(self);
        self.cursor.restore(guard);
        if result.is_ok() {
            self.cursor.seek(end)?;
        }
        result
    }

    /// Run `f`; on error drop whatever it emitted and rewind the cursor.
    pub fn recover<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.cursor.clone();
        let depth = self.stack.len();
        let emitted = self.top().children.len();
        let modes = self.modes.len();
        let result = f(self);
        if result.is_err() {
            self.modes.truncate(modes);
            while self.stack.len() > depth {
                self.stack.pop();
            }
            self.top().children.truncate(emitted);
            self.cursor = saved;
        }
        result
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
