use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::xref::{XrefEntry, XrefTable};
use crate::{Error, Result};
use std::str::{self, FromStr};

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1, take_while_m_n};
use nom::character::complete::{digit0, digit1, one_of, space0};
use nom::character::{AsChar, is_hex_digit, is_oct_digit};
use nom::combinator::{map, map_opt, map_res, opt, verify};
use nom::error::{ErrorKind, ParseError};
use nom::multi::{fold_many0, fold_many1, many0, many0_count};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::{AsBytes, IResult, Input, Parser};
use nom_locate::LocatedSpan;

/// Resolves the `/Length` of a stream when it is an indirect reference, so the
/// parser can read the raw bytes without re-entering the xref loader. The
/// reader supplies this as a thin closure over its own lazily-populated cache.
pub trait LengthResolver {
    fn resolve_length(&self, id: ObjectId) -> Option<i64>;
}

impl<F: Fn(ObjectId) -> Option<i64>> LengthResolver for F {
    fn resolve_length(&self, id: ObjectId) -> Option<i64> {
        self(id)
    }
}

pub(crate) type ParserInput<'a> = LocatedSpan<&'a [u8], &'a str>;
pub(crate) type NomError<'a> = nom::error::Error<ParserInput<'a>>;
pub(crate) type NomResult<'a, O, E = NomError<'a>> = IResult<ParserInput<'a>, O, E>;

/// How many bytes of resync-skip the loader tolerates around a malformed
/// object before giving up, in `ValidationMode::Relaxed`.
pub const MAX_RESYNC: usize = 4096;
/// Maximum nesting depth for literal strings with parenthesised content.
pub const MAX_BRACKET: usize = 100;

#[inline]
fn strip_nom<O>(r: NomResult<O>) -> Option<O> {
    r.ok().map(|(_, o)| o)
}

#[inline]
fn convert_result<O, E>(result: std::result::Result<O, E>, input: ParserInput, kind: ErrorKind) -> NomResult<O> {
    result.map(|o| (input, o)).map_err(|_| {
        let err: NomError = nom::error::Error::from_error_kind(input, kind);
        nom::Err::Error(err)
    })
}

#[inline]
fn offset_stream(object: &mut Object, offset: usize) {
    if let Object::Stream(stream) = object {
        stream.start_position = stream.start_position.and_then(|sp| sp.checked_add(offset));
    }
}

pub(crate) fn eol(input: ParserInput) -> NomResult<ParserInput> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

pub(crate) fn comment(input: ParserInput) -> NomResult<()> {
    map((tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), eol), |_| ()).parse(input)
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    b" \t\n\r\0\x0C".contains(&c)
}

#[inline]
fn is_delimiter(c: u8) -> bool {
    b"()<>[]{}/%".contains(&c)
}

#[inline]
fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

#[inline]
fn is_direct_literal_string(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

fn white_space(input: ParserInput) -> NomResult<()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

fn space(input: ParserInput) -> NomResult<()> {
    fold_many0(alt((map(take_while1(is_whitespace), |_| ()), comment)), || {}, |_, _| ()).parse(input)
}

fn integer(input: ParserInput) -> NomResult<i64> {
    let (i, _) = pair(opt(one_of("+-")), digit1).parse(input)?;
    let int_input = &input[..input.len() - i.len()];
    convert_result(i64::from_str(str::from_utf8(int_input).unwrap()), i, ErrorKind::Digit)
}

fn real(input: ParserInput) -> NomResult<f64> {
    let (i, _) = pair(
        opt(one_of("+-")),
        alt((map((digit1, tag(&b"."[..]), digit0), |_| ()), map(pair(tag(&b"."[..]), digit1), |_| ()))),
    )
    .parse(input)?;
    let float_input = &input[..input.len() - i.len()];
    convert_result(f64::from_str(str::from_utf8(float_input).unwrap()), i, ErrorKind::Digit)
}

pub(crate) fn hex_char(input: ParserInput) -> NomResult<u8> {
    map_res(
        verify(take(2usize), |h: &ParserInput| h.as_bytes().iter().copied().all(is_hex_digit)),
        |x: ParserInput| u8::from_str_radix(str::from_utf8(&x).unwrap(), 16),
    )
    .parse(input)
}

fn oct_char(input: ParserInput) -> NomResult<u8> {
    map_res(take_while_m_n(1, 3, is_oct_digit), |x: ParserInput| {
        u16::from_str_radix(str::from_utf8(&x).unwrap(), 8).map(|o| o as u8)
    })
    .parse(input)
}

pub(crate) fn name(input: ParserInput) -> NomResult<Vec<u8>> {
    preceded(
        tag(&b"/"[..]),
        many0(alt((
            preceded(tag(&b"#"[..]), hex_char),
            map_opt(take(1usize), |c: ParserInput| if c[0] != b'#' && is_regular(c[0]) { Some(c[0]) } else { None }),
        ))),
    )
    .parse(input)
}

fn escape_sequence(input: ParserInput) -> NomResult<Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(b'\x08')),
            map(tag(&b"f"[..]), |_| Some(b'\x0C')),
            map(take(1usize), |c: ParserInput| Some(c[0])),
        )),
    )
    .parse(input)
}

enum InnerLiteralString<'a> {
    Direct(ParserInput<'a>),
    Escape(Option<u8>),
    Eol(ParserInput<'a>),
    Nested(Vec<u8>),
}

impl InnerLiteralString<'_> {
    fn push(&self, output: &mut Vec<u8>) {
        match self {
            InnerLiteralString::Direct(s) | InnerLiteralString::Eol(s) => output.extend_from_slice(s),
            InnerLiteralString::Escape(e) => output.extend(e),
            InnerLiteralString::Nested(n) => output.extend_from_slice(n),
        }
    }
}

fn inner_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        fold_many0(
            alt((
                map(take_while1(is_direct_literal_string), InnerLiteralString::Direct),
                map(escape_sequence, InnerLiteralString::Escape),
                map(eol, InnerLiteralString::Eol),
                map(nested_literal_string(depth), InnerLiteralString::Nested),
            )),
            Vec::new,
            |mut out: Vec<u8>, value| {
                value.push(&mut out);
                out
            },
        )
        .parse(input)
    }
}

fn nested_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        if depth == 0 {
            map(verify(tag(&b"too deep"[..]), |_| false), |_| vec![]).parse(input)
        } else {
            map(delimited(tag(&b"("[..]), inner_literal_string(depth - 1), tag(&b")"[..])), |mut content| {
                content.insert(0, b'(');
                content.push(b')');
                content
            })
            .parse(input)
        }
    }
}

fn literal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    delimited(tag(&b"("[..]), inner_literal_string(MAX_BRACKET), tag(&b")"[..])).parse(input)
}

#[inline]
fn hex_digit(input: ParserInput) -> NomResult<u8> {
    map_opt(take(1usize), |c: ParserInput| str::from_utf8(&c).ok().and_then(|c| u8::from_str_radix(c, 16).ok())).parse(input)
}

fn hexadecimal_string(input: ParserInput) -> NomResult<Object> {
    map(
        delimited(
            tag(&b"<"[..]),
            terminated(
                fold_many0(
                    preceded(white_space, hex_digit),
                    || -> (Vec<u8>, bool) { (Vec::new(), false) },
                    |state, c| match state {
                        (mut out, false) => {
                            out.push(c << 4);
                            (out, true)
                        }
                        (mut out, true) => {
                            *out.last_mut().unwrap() |= c;
                            (out, false)
                        }
                    },
                ),
                white_space,
            ),
            tag(&b">"[..]),
        ),
        |(bytes, _)| Object::hex_literal(bytes),
    )
    .parse(input)
}

fn boolean(input: ParserInput) -> NomResult<Object> {
    alt((map(tag(&b"true"[..]), |_| Object::Boolean(true)), map(tag(&b"false"[..]), |_| Object::Boolean(false)))).parse(input)
}

fn null(input: ParserInput) -> NomResult<Object> {
    map(tag(&b"null"[..]), |_| Object::Null).parse(input)
}

fn array(input: ParserInput) -> NomResult<Vec<Object>> {
    delimited(pair(tag(&b"["[..]), space), many0(_direct_object), tag(&b"]"[..])).parse(input)
}

pub(crate) fn dictionary(input: ParserInput) -> NomResult<Dictionary> {
    delimited(pair(tag(&b"<<"[..]), space), inner_dictionary, tag(&b">>"[..])).parse(input)
}

fn inner_dictionary(input: ParserInput) -> NomResult<Dictionary> {
    fold_many0(
        pair(terminated(name, space), _direct_object),
        Dictionary::new,
        |mut dict, (key, value)| {
            dict.set(key, value);
            dict
        },
    )
    .parse(input)
}

fn stream<'a>(input: ParserInput<'a>, resolver: &dyn LengthResolver) -> NomResult<'a, Object> {
    let (i, dict) = terminated(dictionary, (space, tag(&b"stream"[..]), space0, eol)).parse(input)?;

    let length = dict.get(b"Length").ok().and_then(|value| {
        if let Ok(id) = value.as_reference() {
            resolver.resolve_length(id)
        } else {
            value.as_i64().ok()
        }
    });

    if let Some(length) = length {
        if length < 0 {
            return Err(nom::Err::Failure(NomError::from_error_kind(i, ErrorKind::LengthValue)));
        }
        let (i, data) = terminated(take(length as usize), pair(opt(eol), tag(&b"endstream"[..]))).parse(i)?;
        Ok((i, Object::Stream(Stream::new(dict, data.to_vec()))))
    } else {
        // Unresolved /Length: caller re-parses later once the xref table is complete.
        Ok((i, Object::Stream(Stream::with_position(dict, input.len() - i.len()))))
    }
}

fn unsigned_int<I: FromStr>(input: ParserInput) -> NomResult<I> {
    map_res(digit1, |digits: ParserInput| I::from_str(str::from_utf8(&digits).unwrap())).parse(input)
}

fn object_id(input: ParserInput) -> NomResult<ObjectId> {
    pair(terminated(unsigned_int, space), terminated(unsigned_int, space)).parse(input)
}

fn reference(input: ParserInput) -> NomResult<Object> {
    map(terminated(object_id, tag(&b"R"[..])), Object::IndirectRef).parse(input)
}

fn _direct_objects(input: ParserInput) -> NomResult<Object> {
    alt((
        null,
        boolean,
        reference,
        map(real, Object::Real),
        map(integer, Object::Integer),
        map(name, Object::Name),
        map(literal_string, Object::string_literal),
        hexadecimal_string,
        map(array, Object::Array),
        map(dictionary, Object::Dict),
    ))
    .parse(input)
}

fn _direct_object(input: ParserInput) -> NomResult<Object> {
    terminated(_direct_objects, space).parse(input)
}

pub fn direct_object(input: ParserInput) -> Option<Object> {
    strip_nom(_direct_object.parse(input))
}

fn object<'a>(input: ParserInput<'a>, resolver: &dyn LengthResolver) -> NomResult<'a, Object> {
    terminated(alt((|input| stream(input, resolver), _direct_objects)), space).parse(input)
}

/// Parse one `N G obj ... endobj` block at `input[offset..]`.
pub fn indirect_object(
    input: ParserInput, offset: usize, expected_id: Option<ObjectId>, resolver: &dyn LengthResolver,
) -> Result<(ObjectId, Object)> {
    let (id, mut object) = _indirect_object(input.take_from(offset), offset, expected_id, resolver)?;
    offset_stream(&mut object, offset);
    Ok((id, object))
}

fn _indirect_object<'a>(
    input: ParserInput<'a>, offset: usize, expected_id: Option<ObjectId>, resolver: &dyn LengthResolver,
) -> Result<(ObjectId, Object)> {
    let (i, (_, found_id)) =
        terminated((space, object_id), pair(tag(&b"obj"[..]), space)).parse(input).map_err(|_| Error::Parse {
            offset,
            expected: "N G obj",
            got: String::from_utf8_lossy(&input[..input.len().min(16)]).into_owned(),
        })?;
    if let Some(expected_id) = expected_id {
        if found_id != expected_id {
            return Err(Error::Parse { offset, expected: "matching object id", got: format!("{found_id:?}") });
        }
    }

    let object_offset = input.len() - i.len();
    let (_, mut object) =
        terminated(|i: ParserInput<'a>| object(i, resolver), (space, opt(tag(&b"endobj"[..])), space))
            .parse(i)
            .map_err(|_| Error::Parse { offset, expected: "object body", got: String::new() })?;

    offset_stream(&mut object, object_offset);
    Ok((found_id, object))
}

pub fn header(input: ParserInput) -> Option<String> {
    strip_nom(
        map_res(
            delimited(tag(&b"%PDF-"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), pair(eol, many0_count(comment))),
            |v: ParserInput| str::from_utf8(&v).map(Into::into),
        )
        .parse(input),
    )
}

fn xref(input: ParserInput) -> NomResult<XrefTable> {
    let xref_eol = map(alt((tag(&b" \r"[..]), tag(&b" \n"[..]), tag(&b"\r\n"[..]))), |_| ());
    let xref_entry = pair(
        separated_pair(unsigned_int, tag(&b" "[..]), unsigned_int::<u32>),
        delimited(tag(&b" "[..]), map(one_of("nf"), |k| k == 'n'), xref_eol),
    );

    let xref_section = pair(
        separated_pair(unsigned_int::<u32>, tag(&b" "[..]), unsigned_int::<u32>),
        preceded(pair(opt(tag(&b" "[..])), eol), many0(xref_entry)),
    );

    delimited(
        pair(tag(&b"xref"[..]), eol),
        fold_many1(
            xref_section,
            || XrefTable::new(0),
            |mut table, ((start, _count), entries)| {
                for (index, ((offset, generation), is_normal)) in entries.into_iter().enumerate() {
                    if is_normal {
                        if let Ok(gen) = generation.try_into() {
                            table.insert_if_absent(start + index as u32, XrefEntry::in_use(offset, gen));
                        }
                    }
                }
                table
            },
        ),
        space,
    )
    .parse(input)
}

fn trailer(input: ParserInput) -> NomResult<Dictionary> {
    delimited(pair(tag(&b"trailer"[..]), space), dictionary, space).parse(input)
}

/// Parse either a classical `xref`/`trailer` pair, or a cross-reference stream
/// object at the same offset (PDF 1.5+). The stream's raw bytes are returned
/// undecoded; the caller runs them through the filter pipeline.
pub fn xref_and_trailer(input: ParserInput, resolver: &dyn LengthResolver) -> Result<(XrefTable, Option<Stream>)> {
    if let Ok((_, (mut table, trailer))) = pair(xref, trailer).parse(input) {
        let size = trailer.get(b"Size").and_then(|v| v.as_i64()).unwrap_or(table.max_id() as i64 + 1);
        table.size = size.max(0) as u32;
        table.trailer = trailer;
        return Ok((table, None));
    }

    match _indirect_object(input, 0, None, resolver) {
        Ok((_, Object::Stream(stream))) => Ok((XrefTable::new(0), Some(stream))),
        _ => Err(Error::Xref(crate::error::XrefError::Parse)),
    }
}

pub fn xref_start(input: ParserInput) -> Option<i64> {
    strip_nom(
        delimited(pair(tag(&b"startxref"[..]), eol), trim_spaces(integer), (eol, tag(&b"%%EOF"[..]), space)).parse(input),
    )
}

fn trim_spaces<'a, O>(
    p: impl Parser<ParserInput<'a>, Output = O, Error = nom::error::Error<ParserInput<'a>>>,
) -> impl Parser<ParserInput<'a>, Output = O, Error = nom::error::Error<ParserInput<'a>>> {
    delimited(many0(tag(" ")), p, many0(tag(" ")))
}

// --- content stream operators, used by the watermark/content mutators ---

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Object>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub operations: Vec<Operation>,
}

fn content_space(input: ParserInput) -> NomResult<()> {
    map(take_while(|c| b" \t\r\n".contains(&c)), |_| ()).parse(input)
}

fn operator(input: ParserInput) -> NomResult<String> {
    map_res(take_while1(|c: u8| c.is_ascii_alphabetic() || b"*'\"".contains(&c)), |op: ParserInput| {
        str::from_utf8(&op).map(Into::into)
    })
    .parse(input)
}

fn operand(input: ParserInput) -> NomResult<Object> {
    terminated(
        alt((
            null,
            boolean,
            map(real, Object::Real),
            map(integer, Object::Integer),
            map(name, Object::Name),
            map(literal_string, Object::string_literal),
            hexadecimal_string,
            map(array, Object::Array),
            map(dictionary, Object::Dict),
        )),
        content_space,
    )
    .parse(input)
}

fn operation(input: ParserInput) -> NomResult<Operation> {
    map(preceded(many0(comment), terminated(pair(many0(operand), operator), content_space)), |(operands, operator)| {
        Operation { operator, operands }
    })
    .parse(input)
}

fn _content(input: ParserInput) -> NomResult<Content> {
    preceded(content_space, map(many0(operation), |operations| Content { operations })).parse(input)
}

pub fn content(input: ParserInput) -> Option<Content> {
    strip_nom(_content.parse(input))
}
