use crate::config::Config;
use crate::encryption::{EncryptionContext, EncryptionState};
use crate::object::{Dictionary, Object, ObjectId};
use crate::parser::LengthResolver;
use crate::stats::Stats;
use crate::xref::{XrefEntry, XrefTable};
use crate::{dictionary, Error, Result};
use std::cell::RefCell;
use std::collections::HashSet;

/// Everything the Validator, Optimizer, Writer, and command layer share: the
/// cross-reference table, the raw bytes it was parsed from, the knobs in
/// `Config`, and a running `Stats`. One `Document` per command invocation;
/// independent commands get independent `Document`s rather than sharing one.
pub struct Document {
    pub version: (u8, u8),
    pub xref: XrefTable,
    pub config: Config,
    pub stats: RefCell<Stats>,
    /// The `/Encrypt` dictionary, resolved once at load time. Held as a plain
    /// owned field (not derived through the xref cache) because
    /// `EncryptionContext::encrypted_dict` must return a bare `&Dictionary`.
    encrypt_dict: Option<Dictionary>,
    buffer: Vec<u8>,
}

impl Document {
    /// An empty document seeded with a fresh catalog, for commands that build
    /// output from scratch (Split, Trim, ExtractPages write into one of these).
    pub fn blank(config: Config) -> Self {
        let mut xref = XrefTable::new(3);
        xref.version = (1, 7);
        let pages_id: ObjectId = (1, 0);
        let catalog_id: ObjectId = (2, 0);
        xref.entries.insert(1, XrefEntry::in_use(0, 0));
        xref.entries.insert(2, XrefEntry::in_use(0, 0));
        xref.get(1).unwrap().store(Object::Dict(dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(vec![]),
            "Count" => 0i64
        }));
        xref.get(2).unwrap().store(Object::Dict(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::IndirectRef(pages_id)
        }));
        xref.trailer.set("Root", Object::IndirectRef(catalog_id));
        Document { version: xref.version, xref, config, stats: RefCell::new(Stats::new()), encrypt_dict: None, buffer: Vec::new() }
    }

    pub(crate) fn from_parts(version: (u8, u8), xref: XrefTable, buffer: Vec<u8>, config: Config) -> Result<Self> {
        let mut doc = Document { version, xref, config, stats: RefCell::new(Stats::new()), encrypt_dict: None, buffer };
        if let Some(encrypt_id) = doc.xref.encrypt_ref() {
            let resolved = doc.get_object(encrypt_id)?;
            doc.encrypt_dict = Some(resolved.as_dict()?.clone());
        }
        Ok(doc)
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn catalog_ref(&self) -> Result<ObjectId> {
        self.xref.root_ref()
    }

    pub fn catalog(&self) -> Result<Dictionary> {
        let id = self.catalog_ref()?;
        let obj = self.get_object(id)?;
        Ok(obj.as_dict()?.clone())
    }

    pub fn info(&self) -> Option<Dictionary> {
        let id = self.xref.info_ref()?;
        let obj = self.get_object(id).ok()?;
        obj.as_dict().ok().cloned()
    }

    pub fn encryption_state(&self, password: &str) -> Result<Option<EncryptionState>> {
        if !self.is_encrypted() {
            return Ok(None);
        }
        Ok(Some(EncryptionState::decode(self, password)?))
    }

    /// Dereference one object, following the xref entry's storage kind. The
    /// result is cached in the xref entry so repeated dereferences (a shared
    /// font referenced from ten pages) don't re-parse.
    pub fn get_object(&self, id: ObjectId) -> Result<Object> {
        let entry = self.xref.get(id.0).ok_or(Error::ObjectNotFound(id))?;
        if let Some(obj) = entry.cached() {
            return Ok(obj);
        }
        let obj = self.parse_object(id, entry)?;
        entry.store(obj.clone());
        if self.config.collect_stats {
            self.stats.borrow_mut().objects_read += 1;
        }
        Ok(obj)
    }

    fn parse_object(&self, id: ObjectId, entry: &XrefEntry) -> Result<Object> {
        match entry {
            XrefEntry::Free { .. } => Err(Error::ObjectNotFound(id)),
            XrefEntry::InUse { offset, gen, .. } => {
                let input = crate::parser::ParserInput::new_extra(&self.buffer, "");
                let (_, mut obj) = crate::parser::indirect_object(input, *offset as usize, Some((id.0, *gen)), self)?;
                self.maybe_decrypt(id, &mut obj)?;
                Ok(obj)
            }
            XrefEntry::Compressed { stream_obj_nr, index_in_stream } => {
                let stream_obj = self.get_object((*stream_obj_nr, 0))?;
                let stream = stream_obj.as_stream()?;
                let decoded = crate::filters::decode(stream)?;
                let contained = crate::object_stream::ObjectStream::parse(&stream.dict, &decoded)?;
                contained
                    .objects
                    .into_iter()
                    .nth(*index_in_stream as usize)
                    .map(|(_, obj)| obj)
                    .ok_or(Error::ObjectNotFound(id))
            }
        }
    }

    fn maybe_decrypt(&self, id: ObjectId, obj: &mut Object) -> Result<()> {
        let encrypt_obj_nr = self.xref.encrypt_ref().map(|r| r.0);
        if !self.is_encrypted() || encrypt_obj_nr == Some(id.0) {
            return Ok(());
        }
        let password = self.config.user_pw.clone().unwrap_or_default();
        if let Some(state) = self.encryption_state(&password)? {
            crate::encryption::decrypt_object(&state, id, obj)?;
        }
        Ok(())
    }

    pub fn page_count(&self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    /// Depth-first leaf pages under `/Root /Pages`, in document order. Cycle-safe.
    pub fn pages(&self) -> Result<Vec<ObjectId>> {
        let catalog = self.catalog()?;
        let pages_id = catalog.get(b"Pages").and_then(Object::as_reference)?;
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(pages_id, &mut out, &mut visited)?;
        Ok(out)
    }

    fn collect_pages(&self, id: ObjectId, out: &mut Vec<ObjectId>, visited: &mut HashSet<ObjectId>) -> Result<()> {
        if !visited.insert(id) {
            return Ok(());
        }
        let obj = self.get_object(id)?;
        let dict = obj.as_dict()?;
        if dict.has_type(b"Pages") {
            for kid in dict.get(b"Kids").and_then(Object::as_array)? {
                self.collect_pages(kid.as_reference()?, out, visited)?;
            }
        } else {
            out.push(id);
        }
        Ok(())
    }

    /// A page's own `/Resources`, or the nearest one inherited from `/Parent`.
    pub fn page_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        let mut current = page_id;
        loop {
            let obj = self.get_object(current)?;
            let dict = obj.as_dict()?;
            if let Ok(res) = dict.get(b"Resources") {
                return self.resolve_dict(res);
            }
            match dict.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) if parent != current => current = parent,
                _ => return Ok(Dictionary::new()),
            }
        }
    }

    fn resolve_dict(&self, obj: &Object) -> Result<Dictionary> {
        match obj {
            Object::Dict(d) => Ok(d.clone()),
            Object::IndirectRef(id) => Ok(self.get_object(*id)?.as_dict()?.clone()),
            other => Err(Error::TypeMismatch { path: String::new(), expected: "Dict or IndirectRef", found: other.enum_variant() }),
        }
    }

    pub fn next_object_id(&self) -> ObjectId {
        (self.xref.max_id() + 1, 0)
    }

    pub fn add_object(&mut self, object: Object) -> ObjectId {
        let id = self.next_object_id();
        self.set_object(id, object);
        id
    }

    pub fn set_object(&mut self, id: ObjectId, object: Object) {
        let entry = XrefEntry::in_use(0, id.1);
        entry.store(object);
        self.xref.entries.insert(id.0, entry);
        if self.xref.size <= id.0 {
            self.xref.size = id.0 + 1;
        }
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        let existing = self.xref.get(id.0).and_then(|e| e.cached());
        self.xref.entries.remove(&id.0);
        existing
    }

    /// All live (non-free) object numbers, smallest first.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.xref
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_free())
            .map(|(&nr, entry)| match entry {
                XrefEntry::InUse { gen, .. } => (nr, *gen),
                _ => (nr, 0),
            })
            .collect()
    }
}

impl LengthResolver for Document {
    fn resolve_length(&self, id: ObjectId) -> Option<i64> {
        self.get_object(id).ok()?.as_i64().ok()
    }
}

impl EncryptionContext for Document {
    fn trailer(&self) -> &Dictionary {
        &self.xref.trailer
    }

    fn encrypted_dict(&self) -> std::result::Result<&Dictionary, crate::encryption::DecryptionError> {
        self.encrypt_dict.as_ref().ok_or(crate::encryption::DecryptionError::MissingEncryptDictionary)
    }

    fn is_encrypted(&self) -> bool {
        self.encrypt_dict.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xref::ValidationMode;

    #[test]
    fn blank_document_has_one_empty_page_tree() {
        let doc = Document::blank(Config::default());
        assert_eq!(doc.page_count().unwrap(), 0);
        assert_eq!(doc.xref.validation_mode, ValidationMode::Relaxed);
    }

    #[test]
    fn set_and_get_object_round_trips() {
        let mut doc = Document::blank(Config::default());
        let id = doc.add_object(Object::Integer(42));
        assert_eq!(doc.get_object(id).unwrap().as_i64().unwrap(), 42);
    }

    #[test]
    fn unencrypted_document_reports_not_encrypted() {
        let doc = Document::blank(Config::default());
        assert!(!doc.is_encrypted());
        assert!(doc.encrypted_dict().is_err());
    }
}
