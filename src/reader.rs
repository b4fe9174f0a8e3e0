//! The XRef Loader (SPEC_FULL §4.2): locate `startxref`, parse the newest xref
//! section, follow `/Prev` (and hybrid-reference `/XRefStm`) chains with a
//! visited-offset cycle guard, and fall back to a brute-force object scan in
//! `ValidationMode::Relaxed` when `startxref` is missing or unreadable.

use crate::config::Config;
use crate::document::Document;
use crate::error::XrefError;
use crate::object::ObjectId;
use crate::parser::{self, LengthResolver, ParserInput};
use crate::xref::{ValidationMode, XrefEntry, XrefTable};
use crate::{Error, Result};
use log::warn;
use std::fs;
use std::path::Path;

/// Used only while parsing the xref section/stream itself, before a `Document`
/// (and its real `LengthResolver`) exists to hand the parser.
struct NoLengthResolver;
impl LengthResolver for NoLengthResolver {
    fn resolve_length(&self, _id: ObjectId) -> Option<i64> {
        None
    }
}

impl Document {
    pub fn load<P: AsRef<Path>>(path: P, config: Config) -> Result<Document> {
        let buffer = fs::read(path)?;
        Self::load_mem(buffer, config)
    }

    pub fn load_mem(buffer: Vec<u8>, config: Config) -> Result<Document> {
        let version = parser::header(ParserInput::new_extra(&buffer, "")).and_then(|v| parse_version(&v)).ok_or(Error::Header)?;

        let (table, sections_followed) = match locate_and_load_xref(&buffer, &config) {
            Ok(result) => result,
            Err(_) if config.validation_mode == ValidationMode::Relaxed => (recover_by_scanning(&buffer)?, 0),
            Err(e) => return Err(e),
        };

        let mut doc = Document::from_parts(version, table, buffer, config)?;
        doc.xref.validation_mode = doc.config.validation_mode;
        if doc.config.collect_stats {
            let mut stats = doc.stats.borrow_mut();
            stats.xref_sections_followed = sections_followed;
            stats.bytes_read = doc.buffer_len() as u64;
            drop(stats);
        }
        Ok(doc)
    }
}

fn parse_version(header: &str) -> Option<(u8, u8)> {
    let (major, minor) = header.split_once('.')?;
    Some((major.trim().parse().ok()?, minor.trim().parse().ok()?))
}

fn locate_and_load_xref(buffer: &[u8], config: &Config) -> Result<(XrefTable, u64)> {
    let tail_start = buffer.len().saturating_sub(2048);
    let keyword_offset = find_last(&buffer[tail_start..], b"startxref").map(|rel| tail_start + rel).ok_or(Error::Xref(XrefError::Start))?;
    let start_offset = parser::xref_start(ParserInput::new_extra(&buffer[keyword_offset..], ""))
        .map(|v| v as u64)
        .ok_or(Error::Xref(XrefError::Start))?;

    let mut table = XrefTable::new(0);
    let mut next_offset = Some(start_offset);
    let mut visited = std::collections::HashSet::new();
    let mut sections_followed = 0u64;

    while let Some(offset) = next_offset {
        if !visited.insert(offset) {
            return Err(Error::Xref(XrefError::Cycle));
        }
        let slice = buffer.get(offset as usize..).ok_or(Error::Xref(XrefError::PrevStart))?;
        let (section, xref_stream) = parser::xref_and_trailer(ParserInput::new_extra(slice, ""), &NoLengthResolver)?;
        sections_followed += 1;

        let section = match xref_stream {
            Some(stream) => decode_xref_stream(&stream, section)?,
            None => section,
        };

        let hybrid_offset = section.trailer.get(b"XRefStm").ok().and_then(|v| v.as_i64().ok());
        let prev_offset = section.trailer.get(b"Prev").ok().and_then(|v| v.as_i64().ok());

        table.merge_prev(section);

        if let Some(hybrid) = hybrid_offset {
            let hybrid = hybrid as u64;
            if visited.insert(hybrid) {
                let slice = buffer.get(hybrid as usize..).ok_or(Error::Xref(XrefError::StreamStart))?;
                let (_, stream) = parser::xref_and_trailer(ParserInput::new_extra(slice, ""), &NoLengthResolver)?;
                if let Some(stream) = stream {
                    let hybrid_table = decode_xref_stream(&stream, XrefTable::new(0))?;
                    table.merge_prev(hybrid_table);
                }
            }
        }

        next_offset = prev_offset.map(|v| v as u64);
    }

    if table.trailer.get(b"Size").is_err() {
        table.trailer.set("Size", table.max_id() as i64 + 1);
    }
    table.size = table.trailer.get(b"Size").and_then(|v| v.as_i64()).unwrap_or(0).max(0) as u32;
    Ok((table, sections_followed))
}

/// Unpack a cross-reference stream's `/W`-widths-packed rows into `XrefEntry`s.
fn decode_xref_stream(stream: &crate::object::Stream, mut into: XrefTable) -> Result<XrefTable> {
    let decoded = crate::filters::decode(stream)?;
    let widths: Vec<usize> = stream
        .dict
        .get(b"W")
        .and_then(crate::object::Object::as_array)?
        .iter()
        .map(|v| v.as_i64().map(|n| n as usize))
        .collect::<Result<_>>()?;
    if widths.len() != 3 {
        return Err(Error::Xref(XrefError::Parse));
    }
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(Error::Xref(XrefError::Parse));
    }

    let size = stream.dict.get(b"Size").and_then(|v| v.as_i64())?;
    let index: Vec<(i64, i64)> = match stream.dict.get(b"Index").and_then(crate::object::Object::as_array) {
        Ok(pairs) => pairs
            .chunks(2)
            .filter_map(|c| Some((c.first()?.as_i64().ok()?, c.get(1)?.as_i64().ok()?)))
            .collect(),
        Err(_) => vec![(0, size)],
    };

    let read_field = |row: &[u8], start: usize, width: usize, default: i64| -> i64 {
        if width == 0 {
            return default;
        }
        row[start..start + width].iter().fold(0i64, |acc, &b| (acc << 8) | b as i64)
    };

    let mut rows = decoded.chunks_exact(row_len);
    for (start, count) in index {
        for i in 0..count {
            let Some(row) = rows.next() else { break };
            let field1 = read_field(row, 0, widths[0], 1);
            let field2 = read_field(row, widths[0], widths[1], 0);
            let field3 = read_field(row, widths[0] + widths[1], widths[2], 0);
            let obj_nr = (start + i) as u32;
            let entry = match field1 {
                0 => XrefEntry::Free { next_free: field2 as u32, gen: field3 as u16 },
                1 => XrefEntry::in_use(field2 as u64, field3 as u16),
                2 => XrefEntry::Compressed { stream_obj_nr: field2 as u32, index_in_stream: field3 as u32 },
                _ => continue,
            };
            into.insert_if_absent(obj_nr, entry);
        }
    }

    for (key, value) in stream.dict.iter() {
        if !into.trailer.has(key) {
            into.trailer.set(key.clone(), value.clone());
        }
    }
    Ok(into)
}

/// Relaxed-mode recovery: `startxref` is missing, corrupt, or points nowhere
/// usable. Scan the whole buffer for `N G obj` headers and rebuild a flat
/// xref table from whatever is found, then locate a trailer dictionary the
/// same way. Loses incremental-update history but recovers a readable file.
fn recover_by_scanning(buffer: &[u8]) -> Result<XrefTable> {
    warn!("startxref unusable; falling back to a full-buffer object scan");
    let mut table = XrefTable::new(0);
    let mut offset = 0usize;
    while offset < buffer.len() {
        let slice = &buffer[offset..];
        if let Ok((id, _)) = parser::indirect_object(ParserInput::new_extra(slice, ""), 0, None, &NoLengthResolver) {
            table.insert_if_absent(id.0, XrefEntry::in_use(offset as u64, id.1));
        }
        match find_next(slice, b" obj") {
            Some(rel) => offset += rel + 1,
            None => break,
        }
    }

    if let Some(trailer_offset) = find_last(buffer, b"trailer") {
        if let Ok((_, trailer)) = parser::xref_and_trailer(ParserInput::new_extra(&buffer[trailer_offset..], ""), &NoLengthResolver) {
            table.trailer = trailer.trailer;
        }
    }
    if table.trailer.get(b"Root").is_err() {
        // No trailer recovered; fall back to the lowest-numbered in-use object
        // and let the Validator report the missing /Root if it's wrong.
        if let Some(&nr) = table.entries.iter().find(|(_, e)| matches!(e, XrefEntry::InUse { .. })).map(|(nr, _)| nr) {
            table.trailer.set("Root", crate::object::Object::IndirectRef((nr, 0)));
        }
    }
    table.size = table.max_id() + 1;
    Ok(table)
}

fn find_next(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
