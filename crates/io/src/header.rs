//! Textual header parsing.
//!
//! The header is read line by line straight from the underlying `BufRead`,
//! counting every byte consumed (terminators included), so that when parsing
//! returns the reader sits exactly on the first byte of the binary body and
//! [`PlyHeader::body_offset`] names that position.

use std::io::{BufRead, Read};

use tracing::{debug, warn};

use crate::error::{PlyError, PlyResult};
use crate::schema::{FieldTag, ResolveError, Schema};

pub const MAGIC: &str = "ply";
pub const FORMAT_LINE: &str = "format binary_little_endian 1.0";
pub const END_HEADER: &str = "end_header";

/// Longest header line kept, terminator included. Longer `comment` and
/// `obj_info` lines are cut here; any other longer line is an error.
const MAX_LINE_LEN: u64 = 4096;

/// Header keywords whose text is never parsed.
const FREE_TEXT_KEYWORDS: [&[u8]; 2] = [b"comment", b"obj_info"];

fn is_free_text(line: &[u8]) -> bool {
    FREE_TEXT_KEYWORDS.iter().any(|kw| {
        line.starts_with(kw) && line.get(kw.len()).map_or(true, |b| b.is_ascii_whitespace())
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyHeader {
    pub schema: Schema,
    /// Absolute byte offset of the first body byte.
    pub body_offset: u64,
}

struct LineReader<'a, R> {
    reader: &'a mut R,
    consumed: u64,
    buf: Vec<u8>,
}

impl<'a, R: BufRead> LineReader<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            reader,
            consumed: 0,
            buf: Vec::with_capacity(128),
        }
    }

    /// Next line without its `\n` or `\r\n`, or `None` at end of input.
    fn next_line(&mut self) -> PlyResult<Option<String>> {
        self.buf.clear();
        let n = (&mut *self.reader)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.consumed += n as u64;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        } else if n as u64 == MAX_LINE_LEN {
            if !is_free_text(&self.buf) {
                return Err(PlyError::MalformedLine {
                    line: String::from_utf8_lossy(&self.buf[..64]).into_owned(),
                    reason: "line too long",
                });
            }
            let skipped = self.skip_rest_of_line()?;
            debug!(kept = n, skipped, "truncated long free-text header line");
            // the cut may land inside a multi-byte character
            return Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()));
        }

        match std::str::from_utf8(&self.buf) {
            Ok(s) => Ok(Some(s.to_owned())),
            Err(_) => Err(PlyError::MalformedLine {
                line: String::from_utf8_lossy(&self.buf).into_owned(),
                reason: "not valid UTF-8",
            }),
        }
    }

    /// Consume input up to and including the next `\n` without buffering
    /// it. Returns the number of bytes dropped.
    fn skip_rest_of_line(&mut self) -> PlyResult<u64> {
        let mut skipped = 0u64;
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(skipped);
            }
            let (used, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };
            self.reader.consume(used);
            self.consumed += used as u64;
            skipped += used as u64;
            if done {
                return Ok(skipped);
            }
        }
    }
}

/// Parse a PLY header from the start of `reader`.
///
/// Only `binary_little_endian 1.0` files are accepted. Properties of
/// elements other than `vertex` are skipped; their data is assumed to follow
/// the vertex block.
///
/// Header lines are limited to 4 KiB. `comment` and `obj_info` lines may be
/// longer; their text past the limit is dropped unread.
pub fn parse_header<R: BufRead>(reader: &mut R) -> PlyResult<PlyHeader> {
    let mut lines = LineReader::new(reader);

    let magic = lines.next_line()?.unwrap_or_default();
    if magic != MAGIC {
        return Err(PlyError::MagicMismatch { found: magic });
    }

    let format = lines.next_line()?.ok_or(PlyError::MissingEndHeader)?;
    if format != FORMAT_LINE {
        return Err(PlyError::UnsupportedFormat { found: format });
    }

    let mut vertex_count: Option<u64> = None;
    let mut fields = Vec::new();
    let mut in_vertex = false;

    loop {
        let line = lines.next_line()?.ok_or(PlyError::MissingEndHeader)?;
        if line == END_HEADER {
            break;
        }

        let cols: Vec<&str> = line.split_whitespace().collect();
        match cols.first().copied() {
            Some("element") => {
                if cols.len() < 3 {
                    return Err(PlyError::MalformedLine {
                        line,
                        reason: "element needs a name and a count",
                    });
                }
                if cols[1] == "vertex" {
                    let count = cols[2].parse::<u64>().map_err(|_| {
                        PlyError::InvalidVertexCount {
                            found: cols[2].to_string(),
                        }
                    })?;
                    vertex_count = Some(count);
                    in_vertex = true;
                } else {
                    in_vertex = false;
                    let count = cols[2].parse::<u64>().unwrap_or(0);
                    if vertex_count.is_none() && count > 0 {
                        warn!(
                            element = cols[1],
                            count, "element declared before vertex, body offsets will be wrong"
                        );
                    } else {
                        debug!(element = cols[1], count, "skipping non-vertex element");
                    }
                }
            }
            Some("property") => {
                if cols.len() < 3 {
                    return Err(PlyError::MalformedLine {
                        line,
                        reason: "property needs a type and a name",
                    });
                }
                if !in_vertex {
                    continue;
                }
                match FieldTag::resolve(cols[1], cols[2]) {
                    Ok(tag) => fields.push(tag),
                    Err(ResolveError::UnsupportedType) => {
                        return Err(PlyError::UnsupportedPropertyType { line });
                    }
                    Err(ResolveError::WidthMismatch) => {
                        return Err(PlyError::PropertyWidthMismatch { line });
                    }
                }
            }
            // comment, obj_info and blank lines carry nothing we need
            _ => {}
        }
    }

    let vertex_count = vertex_count.ok_or(PlyError::MissingVertexCount)?;
    let schema = Schema {
        fields,
        vertex_count,
    };

    debug!(
        vertex_count,
        fields = schema.fields.len(),
        stride = schema.stride(),
        body_offset = lines.consumed,
        "parsed ply header"
    );

    Ok(PlyHeader {
        schema,
        body_offset: lines.consumed,
    })
}
