//! Decoding (and, where needed, encoding) of stream filter pipelines.
//!
//! A stream's `/Filter` may be a single name or an array; `/DecodeParms` follows
//! the same shape, one entry per filter, and may be `null` for filters that take
//! no parameters. Filters are applied in `/Filter` array order when decoding, and
//! must be undone in reverse when encoding.

mod png;

use crate::error::Error;
use crate::object::{Dictionary, Object, Stream};
use crate::Result;
use std::io::Read;

/// CCITTFaxDecode, DCTDecode, and JBIG2Decode payloads are passed through
/// undecoded: re-encoding image samples is out of scope, and nothing downstream
/// of the filter pipeline needs the decoded raster.
const PASSTHROUGH_FILTERS: &[&[u8]] = &[b"CCITTFaxDecode", b"DCTDecode", b"JBIG2Decode", b"CCF", b"DCT"];

/// Decode `stream.raw` through its full `/Filter` chain, honoring per-filter
/// `/DecodeParms`. A `/Crypt` entry is skipped here; decryption happens earlier,
/// in the Reader, before the filter pipeline ever sees the bytes.
pub fn decode(stream: &Stream) -> Result<Vec<u8>> {
    let filters = stream.filters()?;
    if filters.is_empty() {
        return Ok(stream.raw.clone());
    }

    let parms = decode_parms(&stream.dict, filters.len())?;
    let mut data = stream.raw.clone();
    for (filter, parms) in filters.iter().zip(parms.iter()) {
        data = decode_one(filter, &data, parms.as_ref())?;
    }
    Ok(data)
}

/// Encode `content` through the filters already recorded on `stream.dict`, for
/// round-tripping streams the Writer must re-emit compressed (object streams,
/// freshly-compressed content streams). Filters without a known encoder (the
/// passthrough image formats, `Crypt`) are rejected; callers should not ask to
/// re-encode what they never decoded.
pub fn encode(dict: &Dictionary, content: &[u8]) -> Result<Vec<u8>> {
    let filters = match dict.get(b"Filter") {
        Ok(obj) if obj.as_name().is_ok() => vec![obj.as_name().unwrap()],
        Ok(obj) => obj.as_array()?.iter().map(Object::as_name).collect::<Result<Vec<_>>>()?,
        Err(_) => return Ok(content.to_vec()),
    };
    let mut data = content.to_vec();
    for filter in filters.iter().rev() {
        data = encode_one(filter, &data)?;
    }
    Ok(data)
}

fn decode_parms(dict: &Dictionary, filter_count: usize) -> Result<Vec<Option<Dictionary>>> {
    match dict.get(b"DecodeParms").or_else(|_| dict.get(b"DP")) {
        Ok(Object::Dict(d)) => Ok(vec![Some(d.clone())]),
        Ok(Object::Array(a)) => Ok(a
            .iter()
            .map(|o| match o {
                Object::Dict(d) => Some(d.clone()),
                _ => None,
            })
            .collect()),
        Ok(Object::Null) | Err(_) => Ok(vec![None; filter_count]),
        Ok(other) => Err(Error::TypeMismatch { path: "DecodeParms".into(), expected: "Dict, Array, or null", found: other.enum_variant() }),
    }
}

fn decode_one(filter: &[u8], data: &[u8], parms: Option<&Dictionary>) -> Result<Vec<u8>> {
    match filter {
        b"FlateDecode" | b"Fl" => apply_predictor(inflate(data)?, parms),
        b"LZWDecode" | b"LZW" => apply_predictor(lzw_decode(data, parms)?, parms),
        b"ASCII85Decode" | b"A85" => ascii85_decode(data),
        b"ASCIIHexDecode" | b"AHx" => ascii_hex_decode(data),
        b"RunLengthDecode" | b"RL" => run_length_decode(data),
        f if PASSTHROUGH_FILTERS.contains(&f) => Ok(data.to_vec()),
        b"Crypt" => Ok(data.to_vec()),
        other => Err(Error::Filter { filter: "unknown", cause: format!("unsupported filter {}", String::from_utf8_lossy(other)) }),
    }
}

fn encode_one(filter: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match filter {
        b"FlateDecode" | b"Fl" => Ok(deflate(data)),
        b"ASCII85Decode" | b"A85" => Ok(ascii85_encode(data)),
        b"ASCIIHexDecode" | b"AHx" => Ok(ascii_hex_encode(data)),
        b"RunLengthDecode" | b"RL" => Ok(run_length_encode(data)),
        other => Err(Error::Filter {
            filter: "unknown",
            cause: format!("cannot re-encode filter {}", String::from_utf8_lossy(other)),
        }),
    }
}

fn filter_error(name: &'static str, cause: impl std::fmt::Display) -> Error {
    Error::Filter { filter: name, cause: cause.to_string() }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out).map_err(|e| filter_error("FlateDecode", e))?;
    Ok(out)
}

fn deflate(data: &[u8]) -> Vec<u8> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("writing to an in-memory encoder cannot fail");
    encoder.finish().expect("finishing an in-memory encoder cannot fail")
}

fn lzw_decode(data: &[u8], parms: Option<&Dictionary>) -> Result<Vec<u8>> {
    use weezl::decode::Decoder;
    let early_change = parms
        .and_then(|d| d.get(b"EarlyChange").ok())
        .and_then(|v| v.as_i64().ok())
        .unwrap_or(1);
    let mut decoder = if early_change == 0 {
        Decoder::new(weezl::BitOrder::Msb, 8)
    } else {
        Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
    };
    decoder.decode(data).map_err(|e| filter_error("LZWDecode", e))
}

fn predictor_params(parms: Option<&Dictionary>) -> (i64, usize, usize, usize) {
    let get = |key: &[u8], default: i64| parms.and_then(|d| d.get(key).ok()).and_then(|v| v.as_i64().ok()).unwrap_or(default);
    (get(b"Predictor", 1), get(b"Colors", 1) as usize, get(b"BitsPerComponent", 8) as usize, get(b"Columns", 1) as usize)
}

fn apply_predictor(data: Vec<u8>, parms: Option<&Dictionary>) -> Result<Vec<u8>> {
    let (predictor, colors, bpc, columns) = predictor_params(parms);
    if predictor <= 1 {
        return Ok(data);
    }
    let bpp = (colors * bpc).div_ceil(8).max(1);
    if predictor == 2 {
        return Ok(tiff_predictor_decode(data, colors, bpc, columns));
    }
    let bytes_per_row = (colors * bpc).div_ceil(8) * columns;
    png::decode_frame(&data, bpp.max(1), bytes_per_row / bpp.max(1).max(1)).map_err(|e| filter_error("FlateDecode", e))
}

fn tiff_predictor_decode(mut data: Vec<u8>, colors: usize, bpc: usize, columns: usize) -> Vec<u8> {
    if bpc != 8 {
        // Sub-byte TIFF prediction is rare in practice; pass through unchanged
        // rather than risk corrupting data we can't correctly unpack.
        return data;
    }
    let stride = colors * columns;
    for row in data.chunks_mut(stride) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    data
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u32; 5];
    let mut len = 0;
    let mut iter = data.iter().copied().filter(|b| !b.is_ascii_whitespace());
    loop {
        match iter.next() {
            Some(b'~') => break,
            Some(b'z') if len == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            Some(c) => {
                if !(b'!'..=b'u').contains(&c) {
                    return Err(filter_error("ASCII85Decode", "byte outside the valid range"));
                }
                group[len] = (c - b'!') as u32;
                len += 1;
                if len == 5 {
                    let mut value: u32 = 0;
                    for g in group {
                        value = value.wrapping_mul(85).wrapping_add(g);
                    }
                    out.extend_from_slice(&value.to_be_bytes());
                    len = 0;
                }
            }
            None => break,
        }
    }
    if len > 0 {
        for slot in group.iter_mut().take(5).skip(len) {
            *slot = 84;
        }
        let mut value: u32 = 0;
        for g in group {
            value = value.wrapping_mul(85).wrapping_add(g);
        }
        let bytes = value.to_be_bytes();
        out.extend_from_slice(&bytes[..len - 1]);
    }
    Ok(out)
}

fn ascii85_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(4) {
        let mut buf = [0u8; 4];
        buf[..chunk.len()].copy_from_slice(chunk);
        let value = u32::from_be_bytes(buf);
        if chunk.len() == 4 && value == 0 {
            out.push(b'z');
            continue;
        }
        let mut digits = [0u8; 5];
        let mut v = value;
        for d in digits.iter_mut().rev() {
            *d = (v % 85) as u8 + b'!';
            v /= 85;
        }
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }
    out.push(b'~');
    out.push(b'>');
    out
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut hi = None;
    for &b in data {
        if b == b'>' {
            break;
        }
        if b.is_ascii_whitespace() {
            continue;
        }
        let v = (b as char).to_digit(16).ok_or_else(|| filter_error("ASCIIHexDecode", "non-hex byte"))? as u8;
        match hi {
            None => hi = Some(v),
            Some(h) => {
                out.push((h << 4) | v);
                hi = None;
            }
        }
    }
    if let Some(h) = hi {
        out.push(h << 4);
    }
    Ok(out)
}

fn ascii_hex_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2 + 1);
    for b in data {
        out.extend_from_slice(format!("{b:02X}").as_bytes());
    }
    out.push(b'>');
    out
}

fn run_length_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let length = data[i];
        i += 1;
        if length == 128 {
            break;
        } else if length < 128 {
            let n = length as usize + 1;
            let end = (i + n).min(data.len());
            out.extend_from_slice(&data[i..end]);
            i = end;
        } else {
            let n = 257 - length as usize;
            if i >= data.len() {
                return Err(filter_error("RunLengthDecode", "truncated run"));
            }
            out.extend(std::iter::repeat_n(data[i], n));
            i += 1;
        }
    }
    Ok(out)
}

fn run_length_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let run_len = data[i..].iter().take_while(|&&b| b == data[i]).count();
        if run_len >= 2 {
            let n = run_len.min(128);
            out.push((257 - n) as u8);
            out.push(data[i]);
            i += n;
        } else {
            let start = i;
            while i < data.len() && i - start < 128 {
                let next_run = data[i..].iter().take_while(|&&b| b == data[i]).count();
                if next_run >= 2 {
                    break;
                }
                i += 1;
            }
            out.push((i - start - 1) as u8);
            out.extend_from_slice(&data[start..i]);
        }
    }
    out.push(128);
    out
}
