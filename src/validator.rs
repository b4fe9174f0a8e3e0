//! The Validator (SPEC_FULL §4.6): a recursive descent over the Catalog tree
//! that checks required/optional keys and value shapes against ISO 32000-1,
//! in either `Strict` (every deviation is fatal) or `Relaxed` (missing but
//! reconstructible entries are tolerated) mode.

use crate::datetime::PdfDate;
use crate::document::Document;
use crate::object::{Dictionary, Object, ObjectId};
use crate::xref::ValidationMode;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub path: String,
    pub rule: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

struct Validator<'a> {
    doc: &'a Document,
    mode: ValidationMode,
    issues: Vec<ValidationIssue>,
    visited: HashSet<ObjectId>,
}

/// Run the Validator over `doc`'s Catalog tree in `mode`, returning every
/// issue found. In `Strict` mode callers typically treat a non-empty report
/// as a hard failure; in `Relaxed` mode it is informational.
pub fn validate(doc: &Document, mode: ValidationMode) -> ValidationReport {
    let mut validator = Validator { doc, mode, issues: Vec::new(), visited: HashSet::new() };
    validator.run();
    ValidationReport { issues: validator.issues }
}

const CATALOG_REQUIRED: &[&[u8]] = &[b"Type", b"Pages"];
const CATALOG_OPTIONAL: &[&[u8]] = &[b"Version", b"Extensions", b"PageLabels", b"Names", b"Dests", b"ViewerPreferences", b"PageLayout", b"PageMode", b"Outlines", b"Threads", b"OpenAction", b"AA", b"URI", b"AcroForm", b"Metadata", b"StructTreeRoot", b"MarkInfo", b"Lang", b"SpiderInfo", b"OutputIntents", b"PieceInfo", b"OCProperties", b"Perms", b"Legal", b"Requirements", b"Collection", b"NeedsRendering"];

const PAGES_REQUIRED: &[&[u8]] = &[b"Type", b"Kids", b"Count"];
const PAGES_OPTIONAL: &[&[u8]] = &[b"Parent", b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

const PAGE_REQUIRED: &[&[u8]] = &[b"Type", b"Parent"];
const PAGE_OPTIONAL: &[&[u8]] = &[b"LastModified", b"Resources", b"MediaBox", b"CropBox", b"Rotate", b"Annots", b"Contents", b"Group", b"Thumb", b"B", b"Dur", b"Trans", b"AA", b"Metadata", b"PieceInfo", b"StructParents", b"ID", b"PZ", b"SeparationInfo", b"Tabs", b"TemplateInstantiated", b"PresSteps", b"UserUnit", b"VP"];

impl<'a> Validator<'a> {
    fn run(&mut self) {
        match self.doc.catalog_ref() {
            Ok(catalog_id) => self.validate_catalog(catalog_id),
            Err(_) => self.fail(String::new(), "trailer has no /Root"),
        }
    }

    fn fail(&mut self, path: String, rule: impl Into<String>) {
        self.issues.push(ValidationIssue { path, rule: rule.into() });
    }

    fn resolve(&mut self, path: &str, id: ObjectId) -> Option<Object> {
        match self.doc.get_object(id) {
            Ok(obj) => Some(obj),
            Err(_) if self.mode == ValidationMode::Relaxed => None,
            Err(e) => {
                self.fail(path.to_string(), format!("dangling reference: {e}"));
                None
            }
        }
    }

    fn validate_catalog(&mut self, id: ObjectId) {
        let Some(obj) = self.resolve("/Root", id) else { return };
        let Ok(dict) = obj.as_dict().cloned() else {
            self.fail("/Root".into(), "Root must be a dictionary");
            return;
        };
        if !dict.has_type(b"Catalog") {
            self.check_type_strict("/Root", &dict, b"Catalog");
        }
        self.check_keys("/Root", &dict, CATALOG_REQUIRED, CATALOG_OPTIONAL);

        if let Ok(pages_ref) = dict.get(b"Pages").and_then(Object::as_reference) {
            self.validate_pages("/Root/Pages".into(), pages_ref, None);
        } else {
            self.fail("/Root".into(), "/Pages must be an indirect reference");
        }

        self.validate_info();
    }

    fn validate_pages(&mut self, path: String, id: ObjectId, parent: Option<ObjectId>) {
        if !self.visited.insert(id) {
            self.fail(path, "cycle in page tree");
            return;
        }
        let Some(obj) = self.resolve(&path, id) else { return };
        let Ok(dict) = obj.as_dict().cloned() else {
            self.fail(path, "page tree node must be a dictionary");
            return;
        };

        if dict.has_type(b"Pages") {
            self.check_keys(&path, &dict, PAGES_REQUIRED, PAGES_OPTIONAL);
            self.check_parent(&path, &dict, parent);
            let kids = dict.get(b"Kids").and_then(Object::as_array).map(<[Object]>::to_vec).unwrap_or_default();
            for (i, kid) in kids.iter().enumerate() {
                if let Ok(kid_id) = kid.as_reference() {
                    self.validate_pages(format!("{path}/Kids[{i}]"), kid_id, Some(id));
                } else {
                    self.fail(format!("{path}/Kids[{i}]"), "kid entries must be indirect references");
                }
            }
        } else if dict.has_type(b"Page") {
            self.check_keys(&path, &dict, PAGE_REQUIRED, PAGE_OPTIONAL);
            self.check_parent(&path, &dict, parent);
            self.validate_resources(&path, &dict);
        } else {
            self.check_type_strict(&path, &dict, b"Pages or Page");
        }
    }

    fn check_parent(&mut self, path: &str, dict: &Dictionary, parent: Option<ObjectId>) {
        let Some(expected) = parent else { return };
        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(actual) if actual == expected => {}
            Ok(_) => self.fail(path.to_string(), "/Parent does not match the tree it was reached through"),
            Err(_) => self.fail(path.to_string(), "/Parent is required"),
        }
    }

    fn validate_resources(&mut self, path: &str, page: &Dictionary) {
        let Ok(resources_entry) = page.get(b"Resources") else {
            if self.mode == ValidationMode::Strict {
                self.fail(format!("{path}/Resources"), "a Page must have /Resources, inherited or own");
            }
            return;
        };
        let resolved = match resources_entry {
            Object::Dict(d) => Some(d.clone()),
            Object::IndirectRef(id) => self.resolve(&format!("{path}/Resources"), *id).and_then(|o| o.as_dict().ok().cloned()),
            _ => None,
        };
        let Some(resources) = resolved else {
            self.fail(format!("{path}/Resources"), "/Resources must be a dictionary");
            return;
        };
        for key in [&b"Font"[..], b"XObject", b"ExtGState", b"ColorSpace", b"Pattern", b"Shading"] {
            if let Ok(entry) = resources.get(key) {
                if !matches!(entry, Object::Dict(_) | Object::IndirectRef(_)) {
                    self.fail(format!("{path}/Resources/{}", String::from_utf8_lossy(key)), "resource category must be a dictionary");
                }
            }
        }
    }

    fn check_keys(&mut self, path: &str, dict: &Dictionary, required: &[&[u8]], optional: &[&[u8]]) {
        for &key in required {
            if !dict.has(key) {
                self.fail(format!("{path}/{}", String::from_utf8_lossy(key)), "required key is missing");
            }
        }
        if self.mode == ValidationMode::Strict {
            for (key, _) in dict.iter() {
                if !required.contains(&key.as_slice()) && !optional.contains(&key.as_slice()) {
                    self.fail(format!("{path}/{}", String::from_utf8_lossy(key)), "unknown key in a closed dictionary");
                }
            }
        }
    }

    fn check_type_strict(&mut self, path: &str, dict: &Dictionary, expected: &'static str) {
        if self.mode == ValidationMode::Strict {
            let found = dict.get_type().map(|t| String::from_utf8_lossy(t).to_string()).unwrap_or_else(|_| "<missing>".into());
            self.fail(path.to_string(), format!("/Type must be {expected}, found {found}"));
        }
    }

    fn validate_info(&mut self) {
        let Some(info_id) = self.doc.xref.info_ref() else { return };
        let Some(obj) = self.resolve("/Info", info_id) else { return };
        let Ok(info) = obj.as_dict().cloned() else {
            self.fail("/Info".into(), "Info must be a dictionary");
            return;
        };

        for (key, min_version) in [(&b"Title"[..], Some((1, 1))), (b"Subject", Some((1, 1))), (b"Keywords", Some((1, 1))), (b"Author", None), (b"Creator", None), (b"Producer", None)] {
            if let Ok(value) = info.get(key) {
                if value.as_string_bytes().is_err() {
                    self.fail(format!("/Info/{}", String::from_utf8_lossy(key)), "must be a text string");
                }
                if let Some(min) = min_version {
                    if self.mode == ValidationMode::Strict && self.doc.version < min {
                        self.fail(format!("/Info/{}", String::from_utf8_lossy(key)), format!("requires PDF >= {}.{}", min.0, min.1));
                    }
                }
            }
        }

        if let Ok(value) = info.get(b"CreationDate") {
            if let Ok(bytes) = value.as_string_bytes() {
                if self.mode == ValidationMode::Strict && PdfDate::parse(bytes).is_none() {
                    self.fail("/Info/CreationDate".into(), "must be a valid PDF date D:YYYYMMDDHHmmSSOHH'mm'");
                }
            } else {
                self.fail("/Info/CreationDate".into(), "must be a string");
            }
        }

        if let Ok(value) = info.get(b"Trapped") {
            match value.as_name() {
                Ok(name) if matches!(name, b"True" | b"False" | b"Unknown") => {
                    if self.mode == ValidationMode::Strict && self.doc.version < (1, 3) {
                        self.fail("/Info/Trapped".into(), "requires PDF >= 1.3");
                    }
                }
                _ => self.fail("/Info/Trapped".into(), "must be the name True, False, or Unknown"),
            }
        }

        let catalog_has_piece_info = self.doc.catalog().ok().map(|c| c.has(b"PieceInfo")).unwrap_or(false);
        if catalog_has_piece_info && !info.has(b"ModDate") {
            self.fail("/Info/ModDate".into(), "required when the Catalog has /PieceInfo");
        }
        if let Ok(value) = info.get(b"ModDate") {
            if value.as_string_bytes().is_err() {
                self.fail("/Info/ModDate".into(), "must be a string");
            }
        }
    }
}
