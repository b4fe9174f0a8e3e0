//! The Optimizer (SPEC_FULL §4.7): walk the page tree, fingerprint font and
//! image resources, and collapse semantic duplicates to one canonical object
//! each. The Writer consumes the resulting duplicate map to skip re-emitting
//! the duplicates and to rewrite every reference to point at the canonical
//! object instead.

use crate::document::Document;
use crate::object::{Object, ObjectId};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct OptimizationReport {
    /// duplicate object id -> canonical object id it should be rewritten to.
    pub duplicates: HashMap<ObjectId, ObjectId>,
    /// page index (0-based, document order) -> font object ids used on it.
    pub page_fonts: Vec<Vec<ObjectId>>,
    /// page index (0-based, document order) -> image (XObject) object ids used on it.
    pub page_images: Vec<Vec<ObjectId>>,
}

pub fn optimize(doc: &Document) -> crate::Result<OptimizationReport> {
    let pages = doc.pages()?;
    let mut page_fonts = Vec::with_capacity(pages.len());
    let mut page_images = Vec::with_capacity(pages.len());

    let mut font_fingerprints: HashMap<ObjectId, Vec<u8>> = HashMap::new();
    let mut image_fingerprints: HashMap<ObjectId, Vec<u8>> = HashMap::new();

    for &page_id in &pages {
        let resources = doc.page_resources(page_id)?;
        let fonts = resource_category(doc, &resources, b"Font")?;
        let images = resource_category(doc, &resources, b"XObject")?;

        for &font_id in &fonts {
            font_fingerprints.entry(font_id).or_insert_with(|| fingerprint_font(doc, font_id).unwrap_or_default());
        }
        for &image_id in &images {
            if is_image_xobject(doc, image_id) {
                image_fingerprints.entry(image_id).or_insert_with(|| fingerprint_image(doc, image_id).unwrap_or_default());
            }
        }

        page_fonts.push(fonts);
        page_images.push(images.into_iter().filter(|id| image_fingerprints.contains_key(id)).collect());
    }

    let mut duplicates = HashMap::new();
    collapse(&font_fingerprints, &mut duplicates);
    collapse(&image_fingerprints, &mut duplicates);

    if doc.config.collect_stats {
        let (fonts, images) = count_by_kind(&duplicates, &font_fingerprints);
        let mut stats = doc.stats.borrow_mut();
        stats.duplicate_fonts_merged = fonts;
        stats.duplicate_images_merged = images;
    }

    Ok(OptimizationReport { duplicates, page_fonts, page_images })
}

fn count_by_kind(duplicates: &HashMap<ObjectId, ObjectId>, font_fingerprints: &HashMap<ObjectId, Vec<u8>>) -> (u64, u64) {
    let mut fonts = 0u64;
    let mut images = 0u64;
    for dup in duplicates.keys() {
        if font_fingerprints.contains_key(dup) {
            fonts += 1;
        } else {
            images += 1;
        }
    }
    (fonts, images)
}

/// Group object ids by fingerprint; within each group, the lowest object
/// number (first encountered in a stable walk) is canonical and the rest
/// are recorded as duplicates pointing at it.
fn collapse(fingerprints: &HashMap<ObjectId, Vec<u8>>, duplicates: &mut HashMap<ObjectId, ObjectId>) {
    let mut groups: HashMap<&[u8], Vec<ObjectId>> = HashMap::new();
    for (id, fp) in fingerprints {
        if fp.is_empty() {
            continue;
        }
        groups.entry(fp.as_slice()).or_default().push(*id);
    }
    for members in groups.values_mut() {
        members.sort_unstable();
        let canonical = members[0];
        for &dup in &members[1..] {
            duplicates.insert(dup, canonical);
        }
    }
}

fn resource_category(doc: &Document, resources: &crate::object::Dictionary, category: &[u8]) -> crate::Result<Vec<ObjectId>> {
    let Ok(entry) = resources.get(category) else { return Ok(Vec::new()) };
    let dict = match entry {
        Object::Dict(d) => d.clone(),
        Object::IndirectRef(id) => doc.get_object(*id)?.as_dict()?.clone(),
        _ => return Ok(Vec::new()),
    };
    let mut ids = Vec::new();
    for (_, value) in dict.iter() {
        if let Ok(id) = value.as_reference() {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn is_image_xobject(doc: &Document, id: ObjectId) -> bool {
    doc.get_object(id).ok().and_then(|o| o.as_stream().ok().cloned()).is_some_and(|s| s.dict.has_type(b"XObject") && s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Image"[..]))
}

fn fingerprint_font(doc: &Document, id: ObjectId) -> crate::Result<Vec<u8>> {
    let obj = doc.get_object(id)?;
    let dict = obj.as_dict()?;
    let mut hasher = Sha256::new();
    if let Ok(name) = dict.get(b"BaseFont").and_then(Object::as_name) {
        hasher.update(name);
    }
    if let Ok(descriptor_id) = dict.get(b"FontDescriptor").and_then(Object::as_reference) {
        if let Ok(descriptor) = doc.get_object(descriptor_id) {
            hash_descriptor(doc, &descriptor, &mut hasher);
        }
    }
    match dict.get(b"Encoding") {
        Ok(Object::Name(n)) => hasher.update(n),
        Ok(Object::IndirectRef(enc_id)) => {
            if let Ok(enc) = doc.get_object(*enc_id) {
                hasher.update(format!("{enc:?}"));
            }
        }
        _ => {}
    }
    Ok(hasher.finalize().to_vec())
}

fn hash_descriptor(doc: &Document, descriptor: &Object, hasher: &mut Sha256) {
    let Ok(dict) = descriptor.as_dict() else { return };
    for key in [&b"FontFile"[..], b"FontFile2", b"FontFile3"] {
        if let Ok(file_id) = dict.get(key).and_then(Object::as_reference) {
            if let Ok(file_obj) = doc.get_object(file_id) {
                if let Ok(stream) = file_obj.as_stream() {
                    if let Ok(decoded) = crate::filters::decode(stream) {
                        hasher.update(&decoded);
                    }
                }
            }
        }
    }
}

fn fingerprint_image(doc: &Document, id: ObjectId) -> crate::Result<Vec<u8>> {
    let obj = doc.get_object(id)?;
    let stream = obj.as_stream()?;
    let mut hasher = Sha256::new();
    for key in [&b"Width"[..], b"Height", b"BitsPerComponent"] {
        if let Ok(value) = stream.dict.get(key).and_then(Object::as_i64) {
            hasher.update(value.to_le_bytes());
        }
    }
    match stream.dict.get(b"ColorSpace") {
        Ok(Object::Name(n)) => hasher.update(n),
        Ok(other) => hasher.update(format!("{other:?}")),
        Err(_) => {}
    }
    for filter in stream.filters().unwrap_or_default() {
        hasher.update(filter);
    }
    hasher.update(&stream.raw);
    Ok(hasher.finalize().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dictionary;

    fn page_with_image(doc: &mut Document, pages_id: ObjectId, image_id: ObjectId) -> ObjectId {
        let resources = doc.add_object(Object::Dict(dictionary! { "XObject" => Object::Dict(dictionary! { "Im0" => Object::IndirectRef(image_id) }) }));
        doc.add_object(Object::Dict(dictionary! {
            "Type" => "Page",
            "Parent" => Object::IndirectRef(pages_id),
            "Resources" => Object::IndirectRef(resources)
        }))
    }

    #[test]
    fn identical_images_collapse_to_one_canonical_object() {
        let mut doc = Document::blank(Config::default());
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();

        let image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 10i64,
            "Height" => 10i64,
            "BitsPerComponent" => 8i64,
            "ColorSpace" => "DeviceGray"
        };
        let image_a = doc.add_object(Object::Stream(crate::object::Stream::new(image_dict.clone(), vec![1, 2, 3])));
        let image_b = doc.add_object(Object::Stream(crate::object::Stream::new(image_dict, vec![1, 2, 3])));

        let page1 = page_with_image(&mut doc, pages_id, image_a);
        let page2 = page_with_image(&mut doc, pages_id, image_b);
        let mut pages = doc.get_object(pages_id).unwrap();
        let dict = pages.as_dict_mut().unwrap();
        dict.set("Kids", Object::Array(vec![Object::IndirectRef(page1), Object::IndirectRef(page2)]));
        dict.set("Count", 2i64);
        doc.set_object(pages_id, pages);

        let report = optimize(&doc).unwrap();
        assert_eq!(report.duplicates.len(), 1);
        let (dup, canonical) = report.duplicates.iter().next().unwrap();
        assert_ne!(dup, canonical);
        assert!([image_a, image_b].contains(canonical));
    }

    #[test]
    fn distinct_images_are_not_merged() {
        let mut doc = Document::blank(Config::default());
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        let dict_a = dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 10i64, "Height" => 10i64, "BitsPerComponent" => 8i64, "ColorSpace" => "DeviceGray" };
        let dict_b = dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 20i64, "Height" => 20i64, "BitsPerComponent" => 8i64, "ColorSpace" => "DeviceGray" };
        let image_a = doc.add_object(Object::Stream(crate::object::Stream::new(dict_a, vec![1, 2, 3])));
        let image_b = doc.add_object(Object::Stream(crate::object::Stream::new(dict_b, vec![4, 5, 6])));
        let page1 = page_with_image(&mut doc, pages_id, image_a);
        let page2 = page_with_image(&mut doc, pages_id, image_b);
        let mut pages = doc.get_object(pages_id).unwrap();
        let dict = pages.as_dict_mut().unwrap();
        dict.set("Kids", Object::Array(vec![Object::IndirectRef(page1), Object::IndirectRef(page2)]));
        dict.set("Count", 2i64);
        doc.set_object(pages_id, pages);

        let report = optimize(&doc).unwrap();
        assert!(report.duplicates.is_empty());
    }
}
