//! The Orchestrator (SPEC_FULL §4.9 / §6): the command surface built on top
//! of `Read -> Validate -> Optimize -> Mutate? -> Write`. Each function here
//! is one row of the command table — merge, split, trim, extract, watermark,
//! attach, and the encryption-mode commands — taking file paths and a
//! `Config`, doing its one mutation, and writing the result.

use crate::config::{Config, WriteMode};
use crate::document::Document;
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::optimizer::{optimize, OptimizationReport};
use crate::page_selection::pages_for;
use crate::validator::{validate, ValidationReport};
use crate::xref::ValidationMode;
use crate::{dictionary, Error, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// `Validate`: load `path` under `mode` and report every deviation found.
pub fn validate_file<P: AsRef<Path>>(path: P, mode: ValidationMode) -> Result<ValidationReport> {
    let config = Config::builder().validation_mode(mode).build();
    let doc = Document::load(path, config)?;
    Ok(validate(&doc, mode))
}

/// `Optimize`: load, collapse duplicate fonts/images, write the rewritten file.
pub fn optimize_file<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, out_file: Q, config: Config) -> Result<OptimizationReport> {
    let doc = Document::load(in_file, config)?;
    let report = optimize(&doc)?;
    let mut file = BufWriter::new(File::create(out_file)?);
    doc.save_optimized(&mut file, &report.duplicates)?;
    Ok(report)
}

/// `Split`: one file per page, written to `out_dir/page-<n>.pdf`.
pub fn split<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, out_dir: Q, config: Config) -> Result<Vec<PathBuf>> {
    let doc = Document::load(in_file, config.clone())?;
    let pages = doc.pages()?;
    std::fs::create_dir_all(&out_dir)?;
    let mut written = Vec::with_capacity(pages.len());
    for (i, &page_id) in pages.iter().enumerate() {
        let single = extract_subset(&doc, &[page_id], config.clone())?;
        let path = out_dir.as_ref().join(format!("page-{}.pdf", i + 1));
        single.save(&path)?;
        written.push(path);
    }
    Ok(written)
}

/// `Trim`: one file containing exactly the selected pages, input order.
pub fn trim<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, selection: &str, out_file: Q, config: Config) -> Result<()> {
    let doc = Document::load(in_file, config.clone())?;
    let all_pages = doc.pages()?;
    let chosen: Vec<ObjectId> = pages_for(all_pages.len(), selection).into_iter().map(|n| all_pages[n - 1]).collect();
    let trimmed = extract_subset(&doc, &chosen, config)?;
    trimmed.save(out_file)
}

/// `ExtractPages`: one file per selected page, written to `out_dir`.
pub fn extract_pages<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, selection: &str, out_dir: Q, config: Config) -> Result<Vec<PathBuf>> {
    let doc = Document::load(in_file, config.clone())?;
    let all_pages = doc.pages()?;
    let chosen = pages_for(all_pages.len(), selection);
    std::fs::create_dir_all(&out_dir)?;
    let mut written = Vec::with_capacity(chosen.len());
    for n in chosen {
        let single = extract_subset(&doc, &[all_pages[n - 1]], config.clone())?;
        let path = out_dir.as_ref().join(format!("page-{n}.pdf"));
        single.save(&path)?;
        written.push(path);
    }
    Ok(written)
}

/// `ExtractImages`: every distinct image XObject reachable from the selected
/// pages, written as its still-filtered (or raw) sample bytes.
pub fn extract_images<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, selection: &str, out_dir: Q, config: Config) -> Result<Vec<PathBuf>> {
    let doc = Document::load(in_file, config)?;
    let pages = doc.pages()?;
    let chosen = pages_for(pages.len(), selection);
    std::fs::create_dir_all(&out_dir)?;
    let mut written = Vec::new();
    let mut seen = HashSet::new();
    for n in chosen {
        let resources = doc.page_resources(pages[n - 1])?;
        let Ok(xobjects) = resources.get(b"XObject") else { continue };
        let xobjects = as_dict(&doc, xobjects)?;
        for (name, value) in xobjects.iter() {
            let Ok(id) = value.as_reference() else { continue };
            if !seen.insert(id) {
                continue;
            }
            let obj = doc.get_object(id)?;
            let Ok(stream) = obj.as_stream() else { continue };
            let is_image = stream.dict.has_type(b"XObject") && stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Image"[..]);
            if !is_image {
                continue;
            }
            let data = crate::filters::decode(stream)?;
            let ext = image_extension(stream);
            let path = out_dir.as_ref().join(format!("page-{n}-{}.{ext}", String::from_utf8_lossy(name)));
            std::fs::write(&path, data)?;
            written.push(path);
        }
    }
    Ok(written)
}

fn image_extension(stream: &Stream) -> &'static str {
    match stream.filters().unwrap_or_default().last().copied() {
        Some(b"DCTDecode") | Some(b"DCT") => "jpg",
        Some(b"JBIG2Decode") => "jbig2",
        Some(b"CCITTFaxDecode") | Some(b"CCF") => "ccitt",
        _ => "raw",
    }
}

/// `ExtractFonts`: every embedded font program reachable from the selected pages.
pub fn extract_fonts<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, selection: &str, out_dir: Q, config: Config) -> Result<Vec<PathBuf>> {
    let doc = Document::load(in_file, config)?;
    let pages = doc.pages()?;
    let chosen = pages_for(pages.len(), selection);
    std::fs::create_dir_all(&out_dir)?;
    let mut written = Vec::new();
    let mut seen = HashSet::new();
    for n in chosen {
        let resources = doc.page_resources(pages[n - 1])?;
        let Ok(fonts_obj) = resources.get(b"Font") else { continue };
        let fonts = as_dict(&doc, fonts_obj)?;
        for (name, value) in fonts.iter() {
            let Ok(font_id) = value.as_reference() else { continue };
            if !seen.insert(font_id) {
                continue;
            }
            let font_obj = doc.get_object(font_id)?;
            let Ok(font_dict) = font_obj.as_dict() else { continue };
            let Ok(descriptor_id) = font_dict.get(b"FontDescriptor").and_then(Object::as_reference) else { continue };
            let descriptor = doc.get_object(descriptor_id)?;
            let Ok(descriptor_dict) = descriptor.as_dict() else { continue };
            for (key, ext) in [(&b"FontFile"[..], "pfb"), (b"FontFile2", "ttf"), (b"FontFile3", "otf")] {
                let Ok(file_id) = descriptor_dict.get(key).and_then(Object::as_reference) else { continue };
                let file_obj = doc.get_object(file_id)?;
                let Ok(stream) = file_obj.as_stream() else { continue };
                let data = crate::filters::decode(stream)?;
                let path = out_dir.as_ref().join(format!("page-{n}-{}.{ext}", String::from_utf8_lossy(name)));
                std::fs::write(&path, data)?;
                written.push(path);
            }
        }
    }
    Ok(written)
}

/// `ExtractContent`: the decoded content stream bytes of each selected page.
pub fn extract_content<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, selection: &str, out_dir: Q, config: Config) -> Result<Vec<PathBuf>> {
    let doc = Document::load(in_file, config)?;
    let pages = doc.pages()?;
    let chosen = pages_for(pages.len(), selection);
    std::fs::create_dir_all(&out_dir)?;
    let mut written = Vec::new();
    for n in chosen {
        let page_obj = doc.get_object(pages[n - 1])?;
        let page_dict = page_obj.as_dict()?;
        let Ok(contents) = page_dict.get(b"Contents") else { continue };
        let mut bytes = Vec::new();
        match contents {
            Object::IndirectRef(id) => {
                if let Ok(stream) = doc.get_object(*id)?.as_stream() {
                    bytes.extend(crate::filters::decode(stream)?);
                }
            }
            Object::Array(items) => {
                for item in items {
                    if let Ok(id) = item.as_reference() {
                        if let Ok(stream) = doc.get_object(id)?.as_stream() {
                            bytes.extend(crate::filters::decode(stream)?);
                            bytes.push(b'\n');
                        }
                    }
                }
            }
            _ => {}
        }
        let path = out_dir.as_ref().join(format!("page-{n}.content"));
        std::fs::write(&path, &bytes)?;
        written.push(path);
    }
    Ok(written)
}

/// `Merge`: splice every source's selected pages under the destination's page
/// tree, in input order, renumbering each source's objects into the
/// destination's object space as they're grafted in.
pub fn merge<P: AsRef<Path>, Q: AsRef<Path>>(in_files: &[P], out_file: Q, config: Config) -> Result<()> {
    if in_files.len() < 2 {
        return Err(Error::UnsupportedFeature("merge requires at least two input files"));
    }
    let mut dst = Document::load(&in_files[0], config.clone())?;
    let dst_pages_id = dst.catalog()?.get(b"Pages").and_then(Object::as_reference)?;

    for path in &in_files[1..] {
        let src = Document::load(path, config.clone())?;
        let mut mapped = HashMap::new();
        let mut new_kids = Vec::new();
        for page_id in src.pages()? {
            let new_page_id = graft_page(&src, &mut dst, page_id, dst_pages_id, &mut mapped)?;
            new_kids.push(new_page_id);
        }
        append_kids(&mut dst, dst_pages_id, new_kids)?;
    }

    if dst.version < (1, 5) {
        dst.version = (1, 5);
    }
    dst.save(out_file)
}

/// Clone one source page (its own dict, plus a flattened `/Resources` if it
/// only had an inherited one) into `dst`, remapping every reference reachable
/// from it through `mapped`, and reparenting it under `new_parent`.
fn graft_page(src: &Document, dst: &mut Document, page_id: ObjectId, new_parent: ObjectId, mapped: &mut HashMap<ObjectId, ObjectId>) -> Result<ObjectId> {
    let mut page_dict = src.get_object(page_id)?.as_dict()?.clone();
    if !page_dict.has(b"Resources") {
        let resources = src.page_resources(page_id)?;
        if !resources.is_empty() {
            page_dict.set("Resources", Object::Dict(resources));
        }
    }
    let mut page_value = Object::Dict(page_dict);
    graft_refs(src, dst, &mut page_value, mapped)?;
    page_value.as_dict_mut()?.set("Parent", Object::IndirectRef(new_parent));
    Ok(dst.add_object(page_value))
}

/// Deep-copy the object graph reachable from `id` in `src` into `dst`,
/// reusing `mapped` so a shared object (a font used by ten pages) is only
/// copied once. The destination id is reserved before recursing so a cycle
/// back to `id` resolves to the same slot instead of copying forever.
fn graft(src: &Document, dst: &mut Document, id: ObjectId, mapped: &mut HashMap<ObjectId, ObjectId>) -> Result<ObjectId> {
    if let Some(&existing) = mapped.get(&id) {
        return Ok(existing);
    }
    let new_id = dst.next_object_id();
    mapped.insert(id, new_id);
    dst.set_object(new_id, Object::Null);
    let mut obj = src.get_object(id)?;
    graft_refs(src, dst, &mut obj, mapped)?;
    dst.set_object(new_id, obj);
    Ok(new_id)
}

fn graft_refs(src: &Document, dst: &mut Document, obj: &mut Object, mapped: &mut HashMap<ObjectId, ObjectId>) -> Result<()> {
    match obj {
        Object::IndirectRef(id) => *id = graft(src, dst, *id, mapped)?,
        Object::Array(items) => {
            for item in items {
                graft_refs(src, dst, item, mapped)?;
            }
        }
        Object::Dict(d) => {
            for (_, v) in d.iter_mut() {
                graft_refs(src, dst, v, mapped)?;
            }
        }
        Object::Stream(s) => {
            for (_, v) in s.dict.iter_mut() {
                graft_refs(src, dst, v, mapped)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn append_kids(doc: &mut Document, pages_id: ObjectId, new_kids: Vec<ObjectId>) -> Result<()> {
    let mut pages_obj = doc.get_object(pages_id)?;
    let pages_dict = pages_obj.as_dict_mut()?;
    let mut kids = pages_dict.get(b"Kids").and_then(Object::as_array).map(<[Object]>::to_vec).unwrap_or_default();
    kids.extend(new_kids.into_iter().map(Object::IndirectRef));
    let count = kids.len() as i64;
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", count);
    doc.set_object(pages_id, pages_obj);
    Ok(())
}

/// Build a fresh, minimal document containing exactly `page_ids`, in order,
/// grounding Split/Trim/ExtractPages on the same grafting primitive Merge uses.
fn extract_subset(src: &Document, page_ids: &[ObjectId], config: Config) -> Result<Document> {
    let mut dst = Document::blank(config);
    let pages_id = dst.catalog()?.get(b"Pages").and_then(Object::as_reference)?;
    let mut mapped = HashMap::new();
    let mut kids = Vec::with_capacity(page_ids.len());
    for &page_id in page_ids {
        kids.push(graft_page(src, &mut dst, page_id, pages_id, &mut mapped)?);
    }
    append_kids(&mut dst, pages_id, kids)?;
    Ok(dst)
}

/// A text watermark to stamp onto one or more pages (SPEC_FULL §4.9 Watermark).
#[derive(Debug, Clone)]
pub struct Watermark {
    pub text: String,
    pub font_size: f64,
    /// 0.0 (invisible) ..= 1.0 (opaque), applied through an `/ExtGState /ca`.
    pub opacity: f64,
    pub rotation_degrees: f64,
}

impl Default for Watermark {
    fn default() -> Self {
        Watermark { text: String::new(), font_size: 48.0, opacity: 0.3, rotation_degrees: 45.0 }
    }
}

/// `AddWatermarks`: draw `mark` into an isolated graphics state on each
/// selected page, appended to its content stream so existing content is
/// unaffected.
pub fn add_watermarks<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, selection: &str, mark: &Watermark, out_file: Q, config: Config) -> Result<()> {
    let mut doc = Document::load(in_file, config)?;
    let pages = doc.pages()?;
    let chosen = pages_for(pages.len(), selection);

    let font_id = doc.add_object(Object::Dict(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica"
    }));
    let gstate_id = doc.add_object(Object::Dict(dictionary! {
        "Type" => "ExtGState",
        "ca" => mark.opacity
    }));

    for n in chosen {
        watermark_page(&mut doc, pages[n - 1], font_id, gstate_id, mark)?;
    }
    doc.save(out_file)
}

fn watermark_page(doc: &mut Document, page_id: ObjectId, font_id: ObjectId, gstate_id: ObjectId, mark: &Watermark) -> Result<()> {
    let media_box = page_media_box(doc, page_id)?;
    let cx = (media_box[0] + media_box[2]) / 2.0;
    let cy = (media_box[1] + media_box[3]) / 2.0;
    let (sin, cos) = mark.rotation_degrees.to_radians().sin_cos();

    let mut content = Vec::new();
    content.extend_from_slice(b"q\n/GS0 gs\n");
    content.extend_from_slice(format!("{cos:.6} {sin:.6} {:.6} {cos:.6} {cx:.2} {cy:.2} cm\n", -sin).as_bytes());
    content.extend_from_slice(format!("BT\n/F0 {:.2} Tf\n0.6 0.6 0.6 rg\n0 0 Td\n(", mark.font_size).as_bytes());
    content.extend_from_slice(&escape_pdf_text(&mark.text));
    content.extend_from_slice(b") Tj\nET\nQ\n");

    let stream_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));
    add_watermark_resources(doc, page_id, font_id, gstate_id)?;
    append_content_stream(doc, page_id, stream_id)
}

fn escape_pdf_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for byte in text.bytes() {
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out
}

fn page_media_box(doc: &Document, page_id: ObjectId) -> Result<[f64; 4]> {
    let mut current = page_id;
    loop {
        let obj = doc.get_object(current)?;
        let dict = obj.as_dict()?;
        if let Ok(Object::Array(arr)) = dict.get(b"MediaBox") {
            if arr.len() == 4 {
                let mut sides = [0.0; 4];
                for (i, value) in arr.iter().enumerate() {
                    sides[i] = value.as_float()?;
                }
                return Ok(sides);
            }
        }
        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) if parent != current => current = parent,
            _ => return Ok([0.0, 0.0, 612.0, 792.0]),
        }
    }
}

/// Give the page its own inline `/Resources`, merging whatever it already
/// had (own or inherited) with the watermark's font and graphics state, so
/// mutating it never disturbs a dictionary shared with sibling pages.
fn add_watermark_resources(doc: &mut Document, page_id: ObjectId, font_id: ObjectId, gstate_id: ObjectId) -> Result<()> {
    let mut resources = doc.page_resources(page_id)?;
    insert_into_subdict(&mut resources, b"Font", "F0", font_id);
    insert_into_subdict(&mut resources, b"ExtGState", "GS0", gstate_id);
    let mut page_obj = doc.get_object(page_id)?;
    page_obj.as_dict_mut()?.set("Resources", Object::Dict(resources));
    doc.set_object(page_id, page_obj);
    Ok(())
}

fn insert_into_subdict(resources: &mut Dictionary, category: &[u8], name: &str, id: ObjectId) {
    let mut sub = match resources.get(category) {
        Ok(Object::Dict(d)) => d.clone(),
        _ => Dictionary::new(),
    };
    sub.set(name, Object::IndirectRef(id));
    resources.set(category, Object::Dict(sub));
}

fn append_content_stream(doc: &mut Document, page_id: ObjectId, stream_id: ObjectId) -> Result<()> {
    let mut page_obj = doc.get_object(page_id)?;
    let dict = page_obj.as_dict_mut()?;
    let new_contents = match dict.get(b"Contents").cloned() {
        Ok(Object::Array(mut items)) => {
            items.push(Object::IndirectRef(stream_id));
            Object::Array(items)
        }
        Ok(existing) => Object::Array(vec![existing, Object::IndirectRef(stream_id)]),
        Err(_) => Object::Array(vec![Object::IndirectRef(stream_id)]),
    };
    dict.set("Contents", new_contents);
    doc.set_object(page_id, page_obj);
    Ok(())
}

fn as_dict(doc: &Document, obj: &Object) -> Result<Dictionary> {
    match obj {
        Object::Dict(d) => Ok(d.clone()),
        Object::IndirectRef(id) => Ok(doc.get_object(*id)?.as_dict()?.clone()),
        other => Err(Error::TypeMismatch { path: String::new(), expected: "Dict or IndirectRef", found: other.enum_variant() }),
    }
}

/// `Attach.List`: the names currently under `/Names /EmbeddedFiles`.
pub fn attach_list<P: AsRef<Path>>(in_file: P, config: Config) -> Result<Vec<String>> {
    let doc = Document::load(in_file, config)?;
    Ok(embedded_file_names(&doc)?.into_iter().map(|(name, _)| name).collect())
}

/// `Attach.Extract`: decode one embedded file's bytes to `out_dir/<name>`.
pub fn attach_extract<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, name: &str, out_dir: Q, config: Config) -> Result<PathBuf> {
    let doc = Document::load(in_file, config)?;
    let (_, filespec_id) = embedded_file_names(&doc)?.into_iter().find(|(n, _)| n == name).ok_or_else(|| Error::DictKey(name.to_string()))?;
    let filespec = doc.get_object(filespec_id)?;
    let ef = filespec.as_dict()?.get(b"EF").and_then(Object::as_dict)?;
    let stream_id = ef.get(b"F").and_then(Object::as_reference)?;
    let stream_obj = doc.get_object(stream_id)?;
    let data = crate::filters::decode(stream_obj.as_stream()?)?;
    std::fs::create_dir_all(&out_dir)?;
    let path = out_dir.as_ref().join(name);
    std::fs::write(&path, data)?;
    Ok(path)
}

/// `Attach.Add`: embed `data` under `name`, replacing any existing entry of
/// the same name.
pub fn attach_add<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, name: &str, data: &[u8], out_file: Q, config: Config) -> Result<()> {
    let mut doc = Document::load(in_file, config)?;
    let stream_id = doc.add_object(Object::Stream(Stream::new(dictionary! { "Type" => "EmbeddedFile" }, data.to_vec())));
    let filespec_id = doc.add_object(Object::Dict(dictionary! {
        "Type" => "Filespec",
        "F" => Object::string_literal(name.as_bytes().to_vec()),
        "EF" => Object::Dict(dictionary! { "F" => Object::IndirectRef(stream_id) })
    }));
    insert_embedded_file(&mut doc, name, filespec_id)?;
    doc.save(out_file)
}

/// `Attach.Remove`: drop the named entry from the embedded-files name tree.
pub fn attach_remove<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, name: &str, out_file: Q, config: Config) -> Result<()> {
    let mut doc = Document::load(in_file, config)?;
    remove_embedded_file(&mut doc, name)?;
    doc.save(out_file)
}

fn embedded_file_names(doc: &Document) -> Result<Vec<(String, ObjectId)>> {
    let catalog = doc.catalog()?;
    let Ok(names_obj) = catalog.get(b"Names") else { return Ok(Vec::new()) };
    let names_dict = as_dict(doc, names_obj)?;
    let Ok(ef_obj) = names_dict.get(b"EmbeddedFiles") else { return Ok(Vec::new()) };
    let ef_dict = as_dict(doc, ef_obj)?;
    let Ok(arr) = ef_dict.get(b"Names").and_then(Object::as_array) else { return Ok(Vec::new()) };
    let mut out = Vec::new();
    for pair in arr.chunks(2) {
        if let [name_obj, Object::IndirectRef(id)] = pair {
            if let Ok(bytes) = name_obj.as_string_bytes() {
                out.push((String::from_utf8_lossy(bytes).into_owned(), *id));
            }
        }
    }
    Ok(out)
}

fn existing_name_tree(doc: &Document, catalog: &Dictionary) -> Result<(Dictionary, Dictionary, Vec<Object>)> {
    let names_dict = match catalog.get(b"Names") {
        Ok(obj) => as_dict(doc, obj)?,
        Err(_) => Dictionary::new(),
    };
    let ef_dict = match names_dict.get(b"EmbeddedFiles") {
        Ok(obj) => as_dict(doc, obj)?,
        Err(_) => Dictionary::new(),
    };
    let entries = ef_dict.get(b"Names").and_then(Object::as_array).map(<[Object]>::to_vec).unwrap_or_default();
    Ok((names_dict, ef_dict, entries))
}

fn insert_embedded_file(doc: &mut Document, name: &str, filespec_id: ObjectId) -> Result<()> {
    let catalog_ref = doc.catalog_ref()?;
    let mut catalog_obj = doc.get_object(catalog_ref)?;
    {
        let catalog = catalog_obj.as_dict_mut()?;
        let (mut names_dict, mut ef_dict, entries) = existing_name_tree(doc, catalog)?;
        let mut filtered = remove_name(entries, name);
        filtered.push(Object::string_literal(name.as_bytes().to_vec()));
        filtered.push(Object::IndirectRef(filespec_id));
        ef_dict.set("Names", Object::Array(filtered));
        names_dict.set("EmbeddedFiles", Object::Dict(ef_dict));
        catalog.set("Names", Object::Dict(names_dict));
    }
    doc.set_object(catalog_ref, catalog_obj);
    Ok(())
}

fn remove_embedded_file(doc: &mut Document, name: &str) -> Result<()> {
    let catalog_ref = doc.catalog_ref()?;
    let mut catalog_obj = doc.get_object(catalog_ref)?;
    {
        let catalog = catalog_obj.as_dict_mut()?;
        let (mut names_dict, mut ef_dict, entries) = existing_name_tree(doc, catalog)?;
        ef_dict.set("Names", Object::Array(remove_name(entries, name)));
        names_dict.set("EmbeddedFiles", Object::Dict(ef_dict));
        catalog.set("Names", Object::Dict(names_dict));
    }
    doc.set_object(catalog_ref, catalog_obj);
    Ok(())
}

fn remove_name(entries: Vec<Object>, name: &str) -> Vec<Object> {
    let mut filtered = Vec::with_capacity(entries.len());
    let mut iter = entries.into_iter();
    while let (Some(n), Some(v)) = (iter.next(), iter.next()) {
        if n.as_string_bytes().ok() != Some(name.as_bytes()) {
            filtered.push(n);
            filtered.push(v);
        }
    }
    filtered
}

/// `Encrypt`: write a fresh `/Encrypt` dictionary using `Config::encrypt_using`
/// and the `*_new` password fields.
pub fn encrypt<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, out_file: Q, mut config: Config) -> Result<()> {
    config.write_mode = WriteMode::Encrypt;
    Document::load(in_file, config)?.save(out_file)
}

/// `Decrypt`: strip encryption and write plaintext.
pub fn decrypt<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, out_file: Q, mut config: Config) -> Result<()> {
    config.write_mode = WriteMode::Decrypt;
    Document::load(in_file, config)?.save(out_file)
}

/// `ChangeUserPassword`: re-encrypt with a new user password, carrying the
/// owner password through unchanged unless the caller also set a new one.
pub fn change_user_password<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, old: &str, new: &str, out_file: Q, mut config: Config) -> Result<()> {
    config.user_pw = Some(old.to_string());
    config.user_pw_new = Some(new.to_string());
    if config.owner_pw_new.is_none() {
        config.owner_pw_new = config.owner_pw.clone();
    }
    config.write_mode = WriteMode::Encrypt;
    Document::load(in_file, config)?.save(out_file)
}

/// `ChangeOwnerPassword`: the owner-password mirror of [`change_user_password`].
pub fn change_owner_password<P: AsRef<Path>, Q: AsRef<Path>>(in_file: P, old: &str, new: &str, out_file: Q, mut config: Config) -> Result<()> {
    config.owner_pw = Some(old.to_string());
    config.owner_pw_new = Some(new.to_string());
    if config.user_pw_new.is_none() {
        config.user_pw_new = config.user_pw.clone();
    }
    config.write_mode = WriteMode::Encrypt;
    Document::load(in_file, config)?.save(out_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Stream as ObjStream;
    use tempfile::tempdir;

    fn sample_doc_with_two_pages() -> Document {
        let mut doc = Document::blank(Config::default());
        let pages_id = doc.catalog().unwrap().get(b"Pages").and_then(Object::as_reference).unwrap();
        let content_a = doc.add_object(Object::Stream(ObjStream::new(Dictionary::new(), b"BT ET".to_vec())));
        let content_b = doc.add_object(Object::Stream(ObjStream::new(Dictionary::new(), b"BT ET".to_vec())));
        let page_a = doc.add_object(Object::Dict(dictionary! {
            "Type" => "Page",
            "Parent" => Object::IndirectRef(pages_id),
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            "Contents" => Object::IndirectRef(content_a)
        }));
        let page_b = doc.add_object(Object::Dict(dictionary! {
            "Type" => "Page",
            "Parent" => Object::IndirectRef(pages_id),
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            "Contents" => Object::IndirectRef(content_b)
        }));
        append_kids(&mut doc, pages_id, vec![page_a, page_b]).unwrap();
        doc
    }

    #[test]
    fn extract_subset_keeps_only_the_chosen_page() {
        let doc = sample_doc_with_two_pages();
        let all = doc.pages().unwrap();
        let subset = extract_subset(&doc, &[all[1]], Config::default()).unwrap();
        assert_eq!(subset.page_count().unwrap(), 1);
    }

    #[test]
    fn merge_orders_pages_destination_then_source() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.pdf");
        let b_path = dir.path().join("b.pdf");
        sample_doc_with_two_pages().save(&a_path).unwrap();
        sample_doc_with_two_pages().save(&b_path).unwrap();

        let out_path = dir.path().join("merged.pdf");
        merge(&[a_path, b_path], &out_path, Config::default()).unwrap();

        let merged = Document::load(&out_path, Config::default()).unwrap();
        assert_eq!(merged.page_count().unwrap(), 4);
    }

    #[test]
    fn watermark_adds_a_content_stream_and_resources() {
        let mut doc = sample_doc_with_two_pages();
        let page_id = doc.pages().unwrap()[0];
        let before_contents = doc.get_object(page_id).unwrap().as_dict().unwrap().get(b"Contents").cloned().unwrap();
        let before_count = match before_contents {
            Object::Array(items) => items.len(),
            _ => 1,
        };

        let font_id = doc.add_object(Object::Dict(dictionary! { "Subtype" => "Type1", "BaseFont" => "Helvetica" }));
        let gstate_id = doc.add_object(Object::Dict(dictionary! { "ca" => 0.3 }));
        let mark = Watermark { text: "DRAFT".into(), ..Watermark::default() };
        watermark_page(&mut doc, page_id, font_id, gstate_id, &mark).unwrap();

        let after_obj = doc.get_object(page_id).unwrap();
        let after = after_obj.as_dict().unwrap();
        let contents = after.get(b"Contents").and_then(Object::as_array).unwrap();
        assert_eq!(contents.len(), before_count + 1);
        assert!(after.get(b"Resources").and_then(Object::as_dict).unwrap().has(b"Font"));
    }

    #[test]
    fn attach_add_then_list_then_extract_round_trips() {
        let dir = tempdir().unwrap();
        let src_path = dir.path().join("src.pdf");
        Document::blank(Config::default()).save(&src_path).unwrap();

        let with_attachment = dir.path().join("with.pdf");
        attach_add(&src_path, "notes.txt", b"hello", &with_attachment, Config::default()).unwrap();

        let names = attach_list(&with_attachment, Config::default()).unwrap();
        assert_eq!(names, vec!["notes.txt".to_string()]);

        let extract_dir = dir.path().join("out");
        let extracted = attach_extract(&with_attachment, "notes.txt", &extract_dir, Config::default()).unwrap();
        assert_eq!(std::fs::read(extracted).unwrap(), b"hello");
    }

    #[test]
    fn attach_remove_drops_the_entry() {
        let dir = tempdir().unwrap();
        let src_path = dir.path().join("src.pdf");
        Document::blank(Config::default()).save(&src_path).unwrap();
        let with_attachment = dir.path().join("with.pdf");
        attach_add(&src_path, "a.bin", b"x", &with_attachment, Config::default()).unwrap();

        let removed = dir.path().join("removed.pdf");
        attach_remove(&with_attachment, "a.bin", &removed, Config::default()).unwrap();
        assert!(attach_list(&removed, Config::default()).unwrap().is_empty());
    }
}
