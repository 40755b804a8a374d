use crate::boxes::{BoxHeader, FourCC, Jp2Box};
use crate::error::{BoxError, Result};
use crate::options::{EncodeOptions, ParseOptions};
use crate::registry::{Registry, default_registry};
use byteorder::{BigEndian, ReadBytesExt};
use log::trace;
use std::io::{Cursor, Read, Seek, SeekFrom};

pub fn read_box_header<R: Read + Seek>(r: &mut R) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let end = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(start))?;
    let available = end.saturating_sub(start);

    if available < 8 {
        return Err(BoxError::TruncatedBox { typ: None, needed: 8, available });
    }
    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;
    let typ = FourCC(typ);

    let (size, header_size) = match size32 {
        1 => {
            if available < 16 {
                return Err(BoxError::TruncatedBox { typ: Some(typ), needed: 16, available });
            }
            let xl = r.read_u64::<BigEndian>()?;
            if xl < 16 {
                return Err(BoxError::InvalidLength { typ, length: xl });
            }
            (xl, 16)
        }
        0 => (0, 8),
        n if n < 8 => return Err(BoxError::InvalidLength { typ, length: n as u64 }),
        n => (n as u64, 8),
    };

    trace!("`{typ}` at {start}: size={size} header={header_size}");
    Ok(BoxHeader { size, typ, header_size, start })
}

/// Header size needed for a payload of `payload_len` bytes.
pub fn header_len(payload_len: u64) -> u64 {
    if payload_len.saturating_add(8) <= u32::MAX as u64 { 8 } else { 16 }
}

pub fn write_box_header(
    out: &mut Vec<u8>,
    typ: FourCC,
    payload_len: u64,
    options: &EncodeOptions,
) -> Result<()> {
    if header_len(payload_len) == 8 {
        out.extend_from_slice(&((payload_len + 8) as u32).to_be_bytes());
        out.extend_from_slice(&typ.0);
        return Ok(());
    }
    let total = payload_len
        .checked_add(16)
        .filter(|_| options.allow_extended_length)
        .ok_or(BoxError::EncodingOverflow { typ, len: payload_len })?;
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&typ.0);
    out.extend_from_slice(&total.to_be_bytes());
    Ok(())
}

/// Slice out the payload a header declares. `open_ended` allows a size of
/// 0, meaning the box runs to the end of `data`.
fn payload_of<'a>(data: &'a [u8], hdr: &BoxHeader, open_ended: bool) -> Result<&'a [u8]> {
    let available = data.len() as u64 - hdr.start;
    let size = match hdr.size {
        0 if open_ended => available,
        0 => return Err(BoxError::InvalidLength { typ: hdr.typ, length: 0 }),
        n => n,
    };
    if size > available {
        return Err(BoxError::TruncatedBox { typ: Some(hdr.typ), needed: size, available });
    }
    let begin = (hdr.start + hdr.header_size) as usize;
    let end = (hdr.start + size) as usize;
    Ok(&data[begin..end])
}

/// Parse the payload of a container: a run of complete boxes that must fill
/// `data` exactly.
pub fn parse_children(
    data: &[u8],
    registry: &Registry,
    options: &ParseOptions,
    depth: usize,
) -> Result<Vec<Jp2Box>> {
    parse_children_partial(data, registry, options, depth).into_result()
}

/// Like [`parse_children`], but keeps the children read before a failure.
///
/// A failing child container is kept too, holding whatever of its own
/// children parsed before the error.
pub fn parse_children_partial(
    data: &[u8],
    registry: &Registry,
    options: &ParseOptions,
    depth: usize,
) -> PartialParse {
    scan(data, false, |typ, payload| {
        registry.parse_partial_at_depth(typ, payload, options, depth)
    })
}

/// Walk consecutive boxes in `data`, stopping at the first error.
fn scan<F>(data: &[u8], open_ended: bool, mut parse: F) -> PartialParse
where
    F: FnMut(FourCC, &[u8]) -> (Option<Jp2Box>, Option<BoxError>),
{
    let mut cur = Cursor::new(data);
    let mut boxes = Vec::new();
    while (cur.position() as usize) < data.len() {
        let step = read_box_header(&mut cur)
            .and_then(|h| payload_of(data, &h, open_ended).map(|payload| (h, payload)));
        let (h, payload) = match step {
            Ok(found) => found,
            Err(e) => return PartialParse { boxes, error: Some(e) },
        };
        let (parsed, error) = parse(h.typ, payload);
        boxes.extend(parsed);
        if error.is_some() {
            return PartialParse { boxes, error };
        }
        cur.set_position(h.start + h.header_size + payload.len() as u64);
    }
    PartialParse { boxes, error: None }
}

/// Iterator over the top-level boxes of a buffer.
///
/// The last box may declare a length of 0, extending to the end of the
/// buffer. Iteration stops after the first error.
pub struct BoxReader<'a> {
    data: &'a [u8],
    pos: u64,
    registry: &'a Registry,
    options: ParseOptions,
    done: bool,
}

impl<'a> BoxReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, default_registry(), ParseOptions::default())
    }

    pub fn with_options(data: &'a [u8], registry: &'a Registry, options: ParseOptions) -> Self {
        Self { data, pos: 0, registry, options, done: false }
    }

    /// Like `next`, but also hands back the header as found in the buffer.
    pub fn next_entry(&mut self) -> Option<Result<(BoxHeader, Jp2Box)>> {
        if self.done || self.pos as usize >= self.data.len() {
            return None;
        }
        let res = self.read_one();
        if res.is_err() {
            self.done = true;
        }
        Some(res)
    }

    fn read_one(&mut self) -> Result<(BoxHeader, Jp2Box)> {
        let mut cur = Cursor::new(self.data);
        cur.set_position(self.pos);
        let h = read_box_header(&mut cur)?;
        let payload = payload_of(self.data, &h, true)?;
        let b = self.registry.parse_at_depth(h.typ, payload, &self.options, 0)?;
        self.pos = h.start + h.header_size + payload.len() as u64;
        Ok((h, b))
    }
}

impl Iterator for BoxReader<'_> {
    type Item = Result<Jp2Box>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().map(|r| r.map(|(_, b)| b))
    }
}

/// Best-effort parse result: everything read before `error` is valid.
///
/// When `error` is set and the last box is a container, that container holds
/// only the children (recursively) read before the failure.
#[derive(Debug)]
pub struct PartialParse {
    pub boxes: Vec<Jp2Box>,
    pub error: Option<BoxError>,
}

impl PartialParse {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<Jp2Box>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.boxes),
        }
    }
}

pub fn parse_boxes(data: &[u8]) -> Result<Vec<Jp2Box>> {
    BoxReader::new(data).collect()
}

pub fn parse_boxes_with(
    data: &[u8],
    registry: &Registry,
    options: ParseOptions,
) -> Result<Vec<Jp2Box>> {
    BoxReader::with_options(data, registry, options).collect()
}

pub fn parse_boxes_partial(data: &[u8]) -> PartialParse {
    parse_boxes_partial_with(data, default_registry(), ParseOptions::default())
}

pub fn parse_boxes_partial_with(
    data: &[u8],
    registry: &Registry,
    options: ParseOptions,
) -> PartialParse {
    scan(data, true, |typ, payload| {
        registry.parse_partial_at_depth(typ, payload, &options, 0)
    })
}

/// Read a whole stream into memory and parse its top-level boxes.
pub fn read_boxes<R: Read>(r: &mut R, options: ParseOptions) -> Result<Vec<Jp2Box>> {
    let mut data = Vec::new();
    r.read_to_end(&mut data)?;
    parse_boxes_with(&data, default_registry(), options)
}

pub fn encode_boxes(boxes: &[Jp2Box]) -> Result<Vec<u8>> {
    encode_boxes_with(boxes, &EncodeOptions::default())
}

pub fn encode_boxes_with(boxes: &[Jp2Box], options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for b in boxes {
        b.encode_into(&mut out, options)?;
    }
    Ok(out)
}
