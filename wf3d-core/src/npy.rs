/// NPY reader and writer for frame records
///
/// Only what a frame record needs is supported: little-endian `f64` data in
/// C order with shape `(frames, vertices, 6)`.
use std::io::{self, Write};

use nom::{
    branch::alt,
    bytes::complete::{tag, take, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, opt},
    multi::separated_list0,
    number::complete::{le_u16, le_u32, le_u8},
    sequence::{delimited, separated_pair, tuple},
    IResult,
};

use crate::error::NpyError;
use crate::recorder::{FrameRecord, COLUMNS};

const MAGIC: &[u8] = b"\x93NUMPY";
/// Magic, two version bytes and the version 1.0 header length.
const PREAMBLE_LEN: usize = MAGIC.len() + 2 + 2;
const ALIGNMENT: usize = 64;

/// Write `record` as an NPY version 1.0 file.
pub fn write_npy<W: Write>(record: &FrameRecord, mut writer: W) -> io::Result<()> {
    let [frames, vertices, columns] = record.shape();
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({frames}, {vertices}, {columns}), }}"
    );
    // Pad with spaces so that the data starts on an aligned offset; the
    // header always ends with a newline.
    let unpadded = PREAMBLE_LEN + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "NPY header too long"))?;

    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(header.as_bytes())?;
    for value in record.as_slice() {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()
}

/// Read a frame record from the contents of an NPY file.
pub fn read_npy(data: &[u8]) -> Result<FrameRecord, NpyError> {
    if !data.starts_with(MAGIC) {
        return Err(NpyError::Magic);
    }
    let (payload, (major, header)) = parse_preamble(data)
        .map_err(|e| NpyError::Header(format!("truncated preamble: {:?}", e)))?;
    if !(1..=3).contains(&major) {
        return Err(NpyError::Header(format!("unsupported version {major}")));
    }
    let header = std::str::from_utf8(header)
        .map_err(|e| NpyError::Header(format!("header is not text: {e}")))?;
    let (_, entries) = parse_dict(header.trim_end())
        .map_err(|e| NpyError::Header(format!("{:?}", e)))?;

    let mut descr = None;
    let mut fortran_order = None;
    let mut shape = None;
    for (key, value) in entries {
        match (key, value) {
            ("descr", HeaderValue::Str(s)) => descr = Some(s),
            ("fortran_order", HeaderValue::Bool(b)) => fortran_order = Some(b),
            ("shape", HeaderValue::Tuple(dims)) => shape = Some(dims),
            (key, _) => return Err(NpyError::Header(format!("unexpected entry {key:?}"))),
        }
    }

    let descr = descr.ok_or_else(|| NpyError::Header("missing 'descr'".to_string()))?;
    if descr != "<f8" {
        return Err(NpyError::UnsupportedDtype(descr.to_string()));
    }
    if fortran_order.ok_or_else(|| NpyError::Header("missing 'fortran_order'".to_string()))? {
        return Err(NpyError::FortranOrder);
    }
    let shape = shape.ok_or_else(|| NpyError::Header("missing 'shape'".to_string()))?;
    let (frames, vertices) = match *shape.as_slice() {
        [frames, vertices, COLUMNS] => (frames, vertices),
        _ => return Err(NpyError::Shape(shape.clone())),
    };

    let expected = frames
        .checked_mul(vertices)
        .and_then(|n| n.checked_mul(COLUMNS * 8))
        .ok_or_else(|| NpyError::Shape(shape.clone()))?;
    if payload.len() < expected {
        return Err(NpyError::Truncated {
            expected,
            found: payload.len(),
        });
    }
    let values = payload[..expected]
        .chunks_exact(8)
        .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .collect();

    Ok(FrameRecord::from_values(frames, vertices, values))
}

#[derive(Debug, Clone, PartialEq)]
enum HeaderValue<'a> {
    Str(&'a str),
    Bool(bool),
    Tuple(Vec<usize>),
}

fn parse_preamble(input: &[u8]) -> IResult<&[u8], (u8, &[u8])> {
    let (input, _) = tag(MAGIC)(input)?;
    let (input, major) = le_u8(input)?;
    let (input, _minor) = le_u8(input)?;
    let (input, len) = if major == 1 {
        map(le_u16, u32::from)(input)?
    } else {
        le_u32(input)?
    };
    let (input, header) = take(len)(input)?;
    Ok((input, (major, header)))
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn parse_dict(input: &str) -> IResult<&str, Vec<(&str, HeaderValue<'_>)>> {
    delimited(
        ws(char('{')),
        separated_list0(ws(char(',')), parse_entry),
        tuple((opt(ws(char(','))), multispace0, char('}'))),
    )(input)
}

fn parse_entry(input: &str) -> IResult<&str, (&str, HeaderValue<'_>)> {
    separated_pair(parse_quoted, ws(char(':')), parse_value)(input)
}

fn parse_quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
    ))(input)
}

fn parse_value(input: &str) -> IResult<&str, HeaderValue<'_>> {
    alt((
        map(parse_quoted, HeaderValue::Str),
        map(tag("True"), |_| HeaderValue::Bool(true)),
        map(tag("False"), |_| HeaderValue::Bool(false)),
        map(parse_shape, HeaderValue::Tuple),
    ))(input)
}

fn parse_shape(input: &str) -> IResult<&str, Vec<usize>> {
    delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), map_res(digit1, |s: &str| s.parse::<usize>())),
        tuple((opt(ws(char(','))), multispace0, char(')'))),
    )(input)
}
