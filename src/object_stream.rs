use crate::object::{Dictionary, Object, ObjectId};
use crate::parser::{self, ParserInput};
use crate::Result;
use std::collections::BTreeMap;
use std::str::FromStr;

/// The decoded contents of a `/Type /ObjStm` stream: a run of compacted
/// objects addressed by the xref table's `Compressed` entries.
#[derive(Debug, Default)]
pub struct ObjectStream {
    pub objects: BTreeMap<ObjectId, Object>,
}

impl ObjectStream {
    /// `decoded` is the stream's payload after the filter pipeline, not the raw bytes.
    pub fn parse(dict: &Dictionary, decoded: &[u8]) -> Result<ObjectStream> {
        if decoded.is_empty() {
            return Ok(ObjectStream::default());
        }

        let first_offset = dict.get(b"First").and_then(Object::as_i64)? as usize;
        let count = dict.get(b"N").and_then(Object::as_i64)? as usize;

        let index_block = decoded.get(..first_offset).unwrap_or(decoded);
        let numbers_str = std::str::from_utf8(index_block).unwrap_or_default();
        let numbers: Vec<Option<u32>> = numbers_str.split_whitespace().map(|n| u32::from_str(n).ok()).collect();

        let mut objects = BTreeMap::new();
        for pair in numbers.chunks(2).take(count) {
            let (Some(obj_nr), Some(rel_offset)) = (pair.first().copied().flatten(), pair.get(1).copied().flatten()) else {
                continue;
            };
            let offset = first_offset + rel_offset as usize;
            let Some(bytes) = decoded.get(offset..) else { continue };
            if let Some(object) = parser::direct_object(ParserInput::new_extra(bytes, "")) {
                objects.insert((obj_nr, 0), object);
            }
        }
        Ok(ObjectStream { objects })
    }
}
