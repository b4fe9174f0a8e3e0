//! The Writer (SPEC_FULL §4.8): renumber from 1, optionally pack small objects
//! into object streams, emit a classical xref+trailer or a cross-reference
//! stream, and apply the document's `WriteMode` (preserve/encrypt/decrypt).

use crate::config::WriteMode;
use crate::document::Document;
use crate::encryption::{encrypt_object, DecryptionError, EncryptionContext, EncryptionState, EncryptionVersion, Permissions};
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::{dictionary, Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

impl Document {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        self.save_to(&mut file)
    }

    pub fn save_to<W: Write>(&self, target: &mut W) -> Result<()> {
        write_document(self, target, &HashMap::new())
    }

    /// Write with the Optimizer's duplicate-object substitution applied:
    /// every key in `duplicates` is skipped and every reference to it is
    /// rewritten to point at its value (the canonical object) instead.
    pub fn save_optimized<W: Write>(&self, target: &mut W, duplicates: &HashMap<ObjectId, ObjectId>) -> Result<()> {
        write_document(self, target, duplicates)
    }
}

fn write_document<W: Write>(doc: &Document, target: &mut W, duplicates: &HashMap<ObjectId, ObjectId>) -> Result<()> {
    let mut target = CountingWrite { inner: target, bytes_written: 0 };

    let uses_streams = doc.config.write_object_streams && doc.config.write_xref_streams;
    let version = effective_version(doc, uses_streams);

    let renumber = build_renumbering(doc, duplicates);
    let catalog_new_id = resolve_new_id(doc.catalog_ref()?, duplicates, &renumber);
    let info_new_id = doc.xref.info_ref().map(|id| resolve_new_id(id, duplicates, &renumber));

    let encryption = resolve_write_encryption(doc)?;
    let mut next_nr = renumber.len() as u32 + 1;

    // Preserving existing encryption reuses the original (renumbered) /Encrypt
    // object, already part of `bodies` below; encrypting fresh mints a new one.
    let (encrypt_new_id, fresh_encrypt_dict) = match (&encryption, doc.config.write_mode) {
        (Some(_), WriteMode::Preserve) => (doc.xref.encrypt_ref().map(|id| resolve_new_id(id, duplicates, &renumber)), None),
        (Some(state), WriteMode::Encrypt) => {
            let id = next_nr;
            next_nr += 1;
            (Some(id), Some(state.encode().map_err(Error::Encryption)?))
        }
        _ => (None, None),
    };

    let mut bodies: BTreeMap<u32, Object> = BTreeMap::new();
    for id in doc.object_ids() {
        if duplicates.contains_key(&id) {
            continue;
        }
        let new_id = resolve_new_id(id, duplicates, &renumber);
        let mut obj = doc.get_object(id)?;
        remap_refs(&mut obj, duplicates, &renumber);
        if Some(new_id) == info_new_id {
            if let Ok(dict) = obj.as_dict_mut() {
                stamp_info(dict);
            }
        }
        bodies.insert(new_id.0, obj);
    }
    if let (Some(id), Some(dict)) = (encrypt_new_id, fresh_encrypt_dict) {
        bodies.insert(id, Object::Dict(dict));
    }

    let packing_enabled = uses_streams;
    let mut packed: Vec<(u32, Object)> = Vec::new();
    let mut direct: Vec<(u32, Object)> = Vec::new();
    for (nr, obj) in bodies {
        let is_catalog = (nr, 0) == catalog_new_id;
        let is_encrypt_dict = Some(nr) == encrypt_new_id;
        if packing_enabled && !is_catalog && !is_encrypt_dict && !matches!(obj, Object::Stream(_)) {
            packed.push((nr, obj));
        } else {
            direct.push((nr, obj));
        }
    }

    let objstm_id = if packed.is_empty() {
        None
    } else {
        let id = next_nr;
        next_nr += 1;
        Some(id)
    };
    let xref_stream_id = if uses_streams {
        let id = next_nr;
        next_nr += 1;
        Some(id)
    } else {
        None
    };
    let size = next_nr;

    write_header(&mut target, version)?;

    let mut offsets: BTreeMap<u32, u64> = BTreeMap::new();
    let mut compressed: BTreeMap<u32, (u32, u32)> = BTreeMap::new();

    if let Some(objstm_nr) = objstm_id {
        let mut index = String::new();
        let mut body = Vec::new();
        for (position, (nr, obj)) in packed.iter().enumerate() {
            compressed.insert(*nr, (objstm_nr, position as u32));
            index.push_str(&format!("{nr} {} ", body.len()));
            write_object(&mut body, obj)?;
        }
        let first = index.len() as i64;
        let mut content = index.into_bytes();
        content.extend_from_slice(&body);

        let mut dict = dictionary! {
            "Type" => "ObjStm",
            "N" => packed.len() as i64,
            "First" => first,
            "Filter" => "FlateDecode"
        };
        let encoded = crate::filters::encode(&dict, &content)?;
        dict.set("Length", encoded.len() as i64);
        let stream = Stream { dict, raw: encoded, start_position: None, allows_compression: false };
        let mut stream_obj = Object::Stream(stream);
        if let Some(state) = &encryption {
            encrypt_object(state, (objstm_nr, 0), &mut stream_obj).map_err(Error::Encryption)?;
        }
        offsets.insert(objstm_nr, target.bytes_written as u64);
        write_indirect(&mut target, objstm_nr, &stream_obj)?;
    }

    for (nr, mut obj) in direct {
        let is_encrypt_dict = Some(nr) == encrypt_new_id;
        if !is_encrypt_dict {
            if let Some(state) = &encryption {
                encrypt_object(state, (nr, 0), &mut obj).map_err(Error::Encryption)?;
            }
        }
        offsets.insert(nr, target.bytes_written as u64);
        write_indirect(&mut target, nr, &obj)?;
    }

    let mut trailer = build_trailer(doc, catalog_new_id, duplicates, &renumber, size);
    if let Some(id) = encrypt_new_id {
        trailer.set("Encrypt", Object::IndirectRef((id, 0)));
    }
    if let Some(id_bytes) = file_id_bytes(doc) {
        trailer.set("ID", Object::Array(vec![Object::HexLiteral(id_bytes.clone()), Object::HexLiteral(id_bytes)]));
    }

    if let Some(xref_nr) = xref_stream_id {
        let xref_offset = target.bytes_written as u64;
        write_xref_stream(&mut target, xref_nr, size, &offsets, &compressed, &trailer)?;
        writeln!(target, "startxref\n{xref_offset}\n%%EOF")?;
    } else {
        let xref_offset = target.bytes_written as u64;
        write_classical_xref(&mut target, size, &offsets)?;
        target.write_all(b"trailer\n")?;
        write_dictionary(&mut target, &trailer)?;
        writeln!(target, "\nstartxref\n{xref_offset}\n%%EOF")?;
    }

    if doc.config.collect_stats {
        doc.stats.borrow_mut().bytes_written = target.bytes_written as u64;
    }
    Ok(())
}

fn effective_version(doc: &Document, uses_streams: bool) -> (u8, u8) {
    let mut version = doc.version.max(doc.xref.version);
    if uses_streams && version < (1, 5) {
        version = (1, 5);
    }
    version
}

fn write_header<W: Write>(target: &mut CountingWrite<W>, version: (u8, u8)) -> io::Result<()> {
    writeln!(target, "%PDF-{}.{}", version.0, version.1)?;
    target.write_all(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])
}

fn build_renumbering(doc: &Document, duplicates: &HashMap<ObjectId, ObjectId>) -> BTreeMap<u32, u32> {
    let mut live: Vec<u32> = doc.object_ids().into_iter().map(|id| id.0).filter(|nr| !duplicates.contains_key(&(*nr, 0))).collect();
    live.sort_unstable();
    live.dedup();
    live.into_iter().enumerate().map(|(i, nr)| (nr, i as u32 + 1)).collect()
}

fn resolve_new_id(id: ObjectId, duplicates: &HashMap<ObjectId, ObjectId>, renumber: &BTreeMap<u32, u32>) -> ObjectId {
    let canonical = duplicates.get(&id).copied().unwrap_or(id);
    let new_nr = renumber.get(&canonical.0).copied().unwrap_or(canonical.0);
    (new_nr, 0)
}

fn remap_refs(obj: &mut Object, duplicates: &HashMap<ObjectId, ObjectId>, renumber: &BTreeMap<u32, u32>) {
    match obj {
        Object::IndirectRef(id) => *id = resolve_new_id(*id, duplicates, renumber),
        Object::Array(items) => items.iter_mut().for_each(|o| remap_refs(o, duplicates, renumber)),
        Object::Dict(d) => d.iter_mut().for_each(|(_, v)| remap_refs(v, duplicates, renumber)),
        Object::Stream(s) => s.dict.iter_mut().for_each(|(_, v)| remap_refs(v, duplicates, renumber)),
        _ => {}
    }
}

fn build_trailer(doc: &Document, catalog_new_id: ObjectId, duplicates: &HashMap<ObjectId, ObjectId>, renumber: &BTreeMap<u32, u32>, size: u32) -> Dictionary {
    let mut trailer = Dictionary::new();
    trailer.set("Size", size as i64);
    trailer.set("Root", Object::IndirectRef(catalog_new_id));
    if let Some(info_id) = doc.xref.info_ref() {
        trailer.set("Info", Object::IndirectRef(resolve_new_id(info_id, duplicates, renumber)));
    }
    if let Ok(Object::Array(ids)) = doc.xref.trailer.get(b"ID").cloned() {
        trailer.set("ID", Object::Array(ids));
    }
    trailer
}

fn stamp_info(info: &mut Dictionary) {
    info.set("Producer", Object::string_literal(&b"pdfkit"[..]));
    #[cfg(feature = "chrono")]
    {
        let now = crate::datetime::PdfDate::from(chrono::Local::now()).format();
        if info.get(b"CreationDate").is_err() {
            info.set("CreationDate", Object::string_literal(now.clone().into_bytes()));
        }
        info.set("ModDate", Object::string_literal(now.into_bytes()));
    }
}

fn file_id_bytes(doc: &Document) -> Option<Vec<u8>> {
    if let Ok(Object::Array(ids)) = doc.xref.trailer.get(b"ID") {
        if let Some(first) = ids.first().and_then(|o| o.as_string_bytes().ok()) {
            return Some(first.to_vec());
        }
    }
    use rand::Rng as _;
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    Some(bytes.to_vec())
}

struct IdContext {
    trailer: Dictionary,
}

impl EncryptionContext for IdContext {
    fn trailer(&self) -> &Dictionary {
        &self.trailer
    }
    fn encrypted_dict(&self) -> std::result::Result<&Dictionary, DecryptionError> {
        Err(DecryptionError::MissingEncryptDictionary)
    }
    fn is_encrypted(&self) -> bool {
        false
    }
}

fn resolve_write_encryption(doc: &Document) -> Result<Option<EncryptionState>> {
    match doc.config.write_mode {
        WriteMode::Decrypt => Ok(None),
        WriteMode::Preserve => {
            if doc.is_encrypted() {
                let password = doc.config.user_pw.clone().unwrap_or_default();
                doc.encryption_state(&password)
            } else {
                Ok(None)
            }
        }
        WriteMode::Encrypt => Ok(Some(build_new_encryption_state(doc)?)),
    }
}

fn build_new_encryption_state(doc: &Document) -> Result<EncryptionState> {
    use crate::config::EncryptUsing;
    use crate::encryption::crypt_filters::{Aes128CryptFilter, Aes256CryptFilter, IdentityCryptFilter};
    use std::collections::BTreeMap as Map;
    use std::sync::Arc;

    let id_bytes = file_id_bytes(doc).unwrap_or_default();
    let ctx = IdContext { trailer: dictionary! { "ID" => Object::Array(vec![Object::HexLiteral(id_bytes.clone()), Object::HexLiteral(id_bytes)]) } };

    let owner_password = doc.config.owner_pw_new.clone().unwrap_or_default();
    let user_password = doc.config.user_pw_new.clone().unwrap_or_default();
    let permissions = doc.config.permissions;

    let state = match doc.config.encrypt_using {
        EncryptUsing::Rc4_128 => EncryptionState::try_from(EncryptionVersion::V2 {
            document: &ctx,
            owner_password: &owner_password,
            user_password: &user_password,
            key_length: 16,
            permissions,
        })?,
        EncryptUsing::Aes128 => {
            let mut crypt_filters: Map<Vec<u8>, Arc<dyn crate::encryption::crypt_filters::CryptFilter>> = Map::new();
            crypt_filters.insert(b"Identity".to_vec(), Arc::new(IdentityCryptFilter));
            crypt_filters.insert(b"StdCF".to_vec(), Arc::new(Aes128CryptFilter));
            EncryptionState::try_from(EncryptionVersion::V4 {
                document: &ctx,
                encrypt_metadata: true,
                crypt_filters,
                stream_filter: b"StdCF".to_vec(),
                string_filter: b"StdCF".to_vec(),
                owner_password: &owner_password,
                user_password: &user_password,
                permissions,
            })?
        }
        EncryptUsing::Aes256 => {
            use rand::Rng as _;
            let mut file_encryption_key = [0u8; 32];
            rand::rng().fill(&mut file_encryption_key);
            let mut crypt_filters: Map<Vec<u8>, Arc<dyn crate::encryption::crypt_filters::CryptFilter>> = Map::new();
            crypt_filters.insert(b"Identity".to_vec(), Arc::new(IdentityCryptFilter));
            crypt_filters.insert(b"StdCF".to_vec(), Arc::new(Aes256CryptFilter));
            EncryptionState::try_from(EncryptionVersion::V5 {
                encrypt_metadata: true,
                crypt_filters,
                file_encryption_key: &file_encryption_key,
                stream_filter: b"StdCF".to_vec(),
                string_filter: b"StdCF".to_vec(),
                owner_password: &owner_password,
                user_password: &user_password,
                permissions,
            })?
        }
    };
    Ok(state)
}

fn write_classical_xref<W: Write>(target: &mut CountingWrite<W>, size: u32, offsets: &BTreeMap<u32, u64>) -> io::Result<()> {
    // Classical tables cannot represent compressed (type 2) entries; the caller only
    // takes this path when object-stream packing was never enabled, so `offsets`
    // covers every live object directly.
    writeln!(target, "xref\n0 {size}")?;
    writeln!(target, "{:>010} {:>05} f ", 0, 65535)?;
    for nr in 1..size {
        match offsets.get(&nr) {
            Some(&offset) => writeln!(target, "{offset:>010} {:>05} n ", 0)?,
            None => writeln!(target, "{:>010} {:>05} f ", 0, 65535)?,
        }
    }
    Ok(())
}

fn write_xref_stream<W: Write>(
    target: &mut CountingWrite<W>, xref_nr: u32, size: u32, offsets: &BTreeMap<u32, u64>, compressed: &BTreeMap<u32, (u32, u32)>,
    trailer: &Dictionary,
) -> Result<()> {
    let mut rows = Vec::with_capacity(size as usize * 7);
    push_row(&mut rows, 0, 0, 65535);
    let mut self_row_start = None;
    for nr in 1..size {
        if nr == xref_nr {
            self_row_start = Some(rows.len());
            push_row(&mut rows, 1, 0, 0); // fixed up below, once this object's own offset is known
        } else if let Some(&offset) = offsets.get(&nr) {
            push_row(&mut rows, 1, offset as u32, 0);
        } else if let Some(&(stream_nr, index)) = compressed.get(&nr) {
            push_row(&mut rows, 2, stream_nr, index);
        } else {
            push_row(&mut rows, 0, 0, 65535);
        }
    }
    // The xref stream's own entry is written last, so its offset equals the
    // current byte count at the moment we start emitting it.
    if let Some(row_start) = self_row_start {
        let self_offset = target.bytes_written as u32;
        rows[row_start..row_start + 7].copy_from_slice(&encode_row(1, self_offset, 0));
    }

    let mut dict = dictionary! {
        "Type" => "XRef",
        "Size" => size as i64,
        "W" => Object::Array(vec![Object::Integer(1), Object::Integer(4), Object::Integer(2)]),
        "Filter" => "FlateDecode"
    };
    for (key, value) in trailer.iter() {
        dict.set(key.clone(), value.clone());
    }
    let encoded = crate::filters::encode(&dict, &rows)?;
    dict.set("Length", encoded.len() as i64);
    write_indirect(target, xref_nr, &Object::Stream(Stream { dict, raw: encoded, start_position: None, allows_compression: false }))?;
    Ok(())
}

fn push_row(rows: &mut Vec<u8>, field1: u8, field2: u32, field3: u16) {
    rows.extend_from_slice(&encode_row(field1, field2, field3));
}

fn encode_row(field1: u8, field2: u32, field3: u16) -> [u8; 7] {
    let f2 = field2.to_be_bytes();
    let f3 = field3.to_be_bytes();
    [field1, f2[0], f2[1], f2[2], f2[3], f3[0], f3[1]]
}

fn need_separator(object: &Object) -> bool {
    matches!(object, Object::Null | Object::Boolean(_) | Object::Integer(_) | Object::Real(_) | Object::IndirectRef(_))
}

fn need_end_separator(object: &Object) -> bool {
    matches!(
        object,
        Object::Null | Object::Boolean(_) | Object::Integer(_) | Object::Real(_) | Object::Name(_) | Object::IndirectRef(_) | Object::Stream(_)
    )
}

fn write_indirect<W: Write>(file: &mut CountingWrite<W>, nr: u32, object: &Object) -> io::Result<()> {
    write!(file, "{nr} 0 obj{}", if need_separator(object) { " " } else { "" })?;
    write_object(file, object)?;
    writeln!(file, "{}endobj", if need_end_separator(object) { " " } else { "" })
}

fn write_object(file: &mut dyn Write, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => file.write_all(b"null"),
        Object::Boolean(true) => file.write_all(b"true"),
        Object::Boolean(false) => file.write_all(b"false"),
        Object::Integer(value) => write!(file, "{value}"),
        Object::Real(value) => write!(file, "{value:.6}"),
        Object::Name(name) => write_name(file, name),
        Object::StringLiteral(text) => write_literal_string(file, text),
        Object::HexLiteral(text) => write_hex_string(file, text),
        Object::Array(array) => write_array(file, array),
        Object::Dict(dict) => write_dictionary(file, dict),
        Object::Stream(stream) => write_stream(file, stream),
        Object::IndirectRef(id) => write!(file, "{} {} R", id.0, id.1),
    }
}

fn write_name(file: &mut dyn Write, name: &[u8]) -> io::Result<()> {
    file.write_all(b"/")?;
    for &byte in name {
        if b" \t\n\r\x0C()<>[]{}/%#".contains(&byte) || !(33..=126).contains(&byte) {
            write!(file, "#{byte:02X}")?;
        } else {
            file.write_all(&[byte])?;
        }
    }
    Ok(())
}

fn write_literal_string(file: &mut dyn Write, text: &[u8]) -> io::Result<()> {
    file.write_all(b"(")?;
    let mut depth = 0i32;
    for &byte in text {
        match byte {
            b'(' => {
                depth += 1;
                file.write_all(b"(")?;
            }
            b')' => {
                if depth > 0 {
                    depth -= 1;
                    file.write_all(b")")?;
                } else {
                    file.write_all(b"\\)")?;
                }
            }
            b'\\' => file.write_all(b"\\\\")?,
            b'\r' => file.write_all(b"\\r")?,
            _ => file.write_all(&[byte])?,
        }
    }
    file.write_all(b")")
}

fn write_hex_string(file: &mut dyn Write, text: &[u8]) -> io::Result<()> {
    file.write_all(b"<")?;
    for &byte in text {
        write!(file, "{byte:02X}")?;
    }
    file.write_all(b">")
}

fn write_array(file: &mut dyn Write, array: &[Object]) -> io::Result<()> {
    file.write_all(b"[")?;
    let mut first = true;
    for object in array {
        if !first && need_separator(object) {
            file.write_all(b" ")?;
        }
        first = false;
        write_object(file, object)?;
    }
    file.write_all(b"]")
}

fn write_dictionary(file: &mut dyn Write, dictionary: &Dictionary) -> io::Result<()> {
    file.write_all(b"<<")?;
    for (key, value) in dictionary.iter() {
        write_name(file, key)?;
        if need_separator(value) {
            file.write_all(b" ")?;
        }
        write_object(file, value)?;
    }
    file.write_all(b">>")
}

fn write_stream(file: &mut dyn Write, stream: &Stream) -> io::Result<()> {
    write_dictionary(file, &stream.dict)?;
    file.write_all(b"stream\n")?;
    file.write_all(&stream.raw)?;
    file.write_all(b"\nendstream")
}

struct CountingWrite<W: Write> {
    inner: W,
    bytes_written: usize,
}

impl<W: Write> Write for CountingWrite<W> {
    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buffer);
        if let Ok(bytes) = result {
            self.bytes_written += bytes;
        }
        result
    }

    fn write_all(&mut self, buffer: &[u8]) -> io::Result<()> {
        self.bytes_written += buffer.len();
        self.inner.write_all(buffer)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn writes_a_blank_document() {
        let doc = Document::blank(Config::default());
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        let text = String::from_utf8_lossy(&buffer);
        assert!(text.starts_with("%PDF-1.7"));
        assert!(text.contains("%%EOF"));
    }

    #[test]
    fn name_escaping_matches_pdf_rules() {
        let mut out = Vec::new();
        write_name(&mut out, b"a b#c").unwrap();
        assert_eq!(out, b"/a#20b#23c");
    }

    #[test]
    fn literal_string_balances_parentheses() {
        let mut out = Vec::new();
        write_literal_string(&mut out, b"a)b(c").unwrap();
        assert_eq!(out, b"(a\\)b(c)");
    }
}
