//! The CSV stream reader: owns a 128 KiB refill buffer, skips the header
//! line, and yields one [`RouteStep`] per [`RouteStream::read`] call as
//! borrowed field slices.
//!
//! Unlike the original C `RouteStream` (`original_source/progc/src/route.c`),
//! which parses byte-by-byte with `fgetc`, this reader delegates delimiter
//! discovery to [`crate::delim::scan`] (scalar or AVX2) and field conversion
//! to [`crate::parse`]. Fields are returned as `(pointer, length)` pairs —
//! here, ordinary `&str` slices — rather than null-terminated C strings,
//! since there is no C-string API to support on the Rust side.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::delim;
use crate::error::IoError;
use crate::parse;

/// 128 KiB live data per refill.
const BUFFER_SIZE: usize = 128 * 1024;
/// One byte of slack (for an EOF-appended newline) plus 64 zeroed bytes so
/// the AVX2 delimiter scanner can always read a full vector past the
/// buffer's logical end.
const TAIL: usize = 64;
const BUFFER_CAPACITY: usize = BUFFER_SIZE + 1 + TAIL;

/// Bit flags selecting which fields [`RouteStream::read`] should actually
/// parse; unrequested fields still have their delimiters located (to keep
/// the cursor correct) but are not converted, so skipping a field costs
/// nothing beyond finding its delimiter.
pub mod fields {
    pub const ROUTE_ID: u8 = 1 << 0;
    pub const STEP_ID: u8 = 1 << 1;
    pub const TOWN_A: u8 = 1 << 2;
    pub const TOWN_B: u8 = 1 << 3;
    pub const DISTANCE: u8 = 1 << 4;
    pub const DRIVER_NAME: u8 = 1 << 5;
    pub const ALL: u8 = ROUTE_ID | STEP_ID | TOWN_A | TOWN_B | DISTANCE | DRIVER_NAME;
}

pub type FieldsMask = u8;

/// One parsed (or partially parsed) route step. Unrequested fields are
/// left at their default value (`0` / `""`) rather than wrapped in
/// `Option`, mirroring the original's zero-initialised `RouteStep`.
///
/// Borrowed string fields are valid only until the next call to
/// [`RouteStream::read`] — the borrow checker enforces this directly,
/// since `read` takes `&mut self` and returns a step borrowing `self`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteStep<'a> {
    pub route_id: u32,
    pub step_id: u32,
    pub town_a: &'a str,
    pub town_b: &'a str,
    pub distance: f32,
    pub driver_name: &'a str,
}

/// Opens, buffers, and tokenises a route-step CSV.
pub struct RouteStream {
    file: File,
    buf: Vec<u8>,
    /// Bytes `buf[0..len]` hold live, line-aligned data.
    len: usize,
    /// Cursor into `buf`; `buf[pos..len]` is unconsumed.
    pos: usize,
    /// Set once a `read` past the final line has returned `None`.
    eof: bool,
    io_error: Option<IoError>,
}

impl RouteStream {
    /// Opens `path`, consumes the header line, and primes the first buffer
    /// refill. Fails with [`IoError`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let file = File::open(path)?;
        let buf = vec![0u8; BUFFER_CAPACITY];

        let mut stream = RouteStream {
            file,
            buf,
            len: 0,
            pos: 0,
            eof: false,
            io_error: None,
        };
        stream.refill()?;
        stream.skip_header();
        Ok(stream)
    }

    pub fn io_error(&self) -> Option<&IoError> {
        self.io_error.as_ref()
    }

    fn skip_header(&mut self) {
        match self.buf[..self.len].iter().position(|&b| b == b'\n') {
            Some(nl) => self.pos = nl + 1,
            None => self.pos = self.len,
        }
    }

    /// Refills `buf` so that it ends exactly on a line boundary: reads up
    /// to `BUFFER_SIZE` bytes, finds the last `\n` in what was read, and
    /// rolls the file cursor back to just after it, truncating `len`
    /// accordingly. At true EOF without a trailing newline, appends one
    /// into the reserved slack byte.
    fn refill(&mut self) -> Result<(), IoError> {
        if self.eof {
            self.len = 0;
            self.pos = 0;
            return Ok(());
        }

        let n = self.file.read(&mut self.buf[..BUFFER_SIZE])?;
        if n == 0 {
            self.eof = true;
            self.len = 0;
            self.pos = 0;
            return Ok(());
        }

        match self.buf[..n].iter().rposition(|&b| b == b'\n') {
            Some(last_nl) => {
                let consumed = last_nl + 1;
                if consumed < n {
                    let rollback = (n - consumed) as i64;
                    self.file.seek(SeekFrom::Current(-rollback))?;
                }
                self.len = consumed;
            }
            None if n < BUFFER_SIZE => {
                // Final, newline-less chunk at EOF: append the missing
                // terminator into the slack byte.
                self.buf[n] = b'\n';
                self.len = n + 1;
                self.eof = true;
            }
            None => {
                panic!(
                    "schema error: row exceeds the {BUFFER_SIZE}-byte refill buffer without a newline"
                );
            }
        }

        self.pos = 0;
        for b in &mut self.buf[self.len..self.len + TAIL] {
            *b = 0;
        }
        Ok(())
    }

    /// Yields the next row's requested fields, or `None` once the stream is
    /// exhausted (or a refill hit an I/O error).
    pub fn read(&mut self, requested: FieldsMask) -> Option<RouteStep<'_>> {
        if self.pos >= self.len {
            if let Err(e) = self.refill() {
                self.io_error = Some(e);
                return None;
            }
            if self.len == 0 {
                return None;
            }
        }

        let line = &self.buf[self.pos..];
        let delims = delim::scan(line);

        let mut step = RouteStep::default();
        let mut field_start = 0usize;
        let field_flags = [
            fields::ROUTE_ID,
            fields::STEP_ID,
            fields::TOWN_A,
            fields::TOWN_B,
            fields::DISTANCE,
            fields::DRIVER_NAME,
        ];

        for (idx, &flag) in field_flags.iter().enumerate() {
            let field_end = delims[idx];
            if requested & flag != 0 {
                let raw = &line[field_start..field_end];
                match flag {
                    fields::ROUTE_ID => step.route_id = parse::parse_u32(raw),
                    fields::STEP_ID => step.step_id = parse::parse_u32(raw),
                    fields::TOWN_A => step.town_a = parse::parse_str(raw),
                    fields::TOWN_B => step.town_b = parse::parse_str(raw),
                    fields::DISTANCE => step.distance = parse::parse_ufloat(raw),
                    fields::DRIVER_NAME => step.driver_name = parse::parse_str(raw),
                    _ => unreachable!(),
                }
            }
            field_start = field_end + 1;
        }

        self.pos += delims[5] + 1;
        Some(step)
    }
}
