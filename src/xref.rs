use crate::object::{Dictionary, Object};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Validation strictness dial threaded through the Reader and Validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    Strict,
    #[default]
    Relaxed,
}

/// One slot of the cross-reference table.
#[derive(Debug, Clone)]
pub enum XrefEntry {
    Free { next_free: u32, gen: u16 },
    /// `object` is `None` until the first dereference; the Reader never eagerly
    /// parses object bodies, only records their offsets.
    InUse { offset: u64, gen: u16, object: RefCell<Option<Object>> },
    Compressed { stream_obj_nr: u32, index_in_stream: u32 },
}

impl XrefEntry {
    pub fn in_use(offset: u64, gen: u16) -> Self {
        XrefEntry::InUse {
            offset,
            gen,
            object: RefCell::new(None),
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, XrefEntry::Free { .. })
    }

    pub fn cached(&self) -> Option<Object> {
        match self {
            XrefEntry::InUse { object, .. } => object.borrow().clone(),
            _ => None,
        }
    }

    pub fn store(&self, value: Object) {
        if let XrefEntry::InUse { object, .. } = self {
            *object.borrow_mut() = Some(value);
        }
    }
}

/// The master index mapping object numbers to their storage location, plus the
/// merged trailer dictionary. Built by the Reader from one or more xref sections
/// chained through `/Prev`; an arena from which all `IndirectRef`s are resolved.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub trailer: Dictionary,
    /// One past the highest object number; `/Size` in the trailer.
    pub size: u32,
    pub version: (u8, u8),
    pub validation_mode: ValidationMode,
}

impl XrefTable {
    pub fn new(size: u32) -> Self {
        XrefTable {
            entries: BTreeMap::new(),
            trailer: Dictionary::new(),
            size,
            version: (1, 4),
            validation_mode: ValidationMode::Relaxed,
        }
    }

    pub fn get(&self, obj_nr: u32) -> Option<&XrefEntry> {
        self.entries.get(&obj_nr)
    }

    /// Insert an entry unless one is already present. The XRef Loader algorithm
    /// reads the newest section first, so "first-seen wins" implements "latest
    /// update wins" without the loader needing to track recency explicitly.
    pub fn insert_if_absent(&mut self, obj_nr: u32, entry: XrefEntry) {
        self.entries.entry(obj_nr).or_insert(entry);
    }

    /// Merge `other` into `self` using the same first-seen-wins rule, then fold
    /// in its trailer keys that are still missing (root, info, encrypt, ID).
    pub fn merge_prev(&mut self, other: XrefTable) {
        for (obj_nr, entry) in other.entries {
            self.entries.entry(obj_nr).or_insert(entry);
        }
        for (key, value) in other.trailer.iter() {
            if !self.trailer.has(key) {
                self.trailer.set(key.clone(), value.clone());
            }
        }
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().max().copied().unwrap_or(0)
    }

    pub fn root_ref(&self) -> crate::Result<crate::object::ObjectId> {
        self.trailer.get(b"Root").and_then(Object::as_reference)
    }

    pub fn info_ref(&self) -> Option<crate::object::ObjectId> {
        self.trailer.get(b"Info").and_then(Object::as_reference).ok()
    }

    pub fn encrypt_ref(&self) -> Option<crate::object::ObjectId> {
        self.trailer.get(b"Encrypt").and_then(Object::as_reference).ok()
    }
}
