//! The five top-K computations, each a three-phase pipeline
//! — ingest into a keyed aggregate, rank into a value-ordered tree, extract
//! a bounded reverse-in-order slice — composed from [`crate::arena`],
//! [`crate::map`], [`crate::partition`], and [`crate::avl`].
//!
//! Grounded module-for-module on `original_source/progc/src/computations/`:
//! `computation_d1_ex.c`, `computation_d2_ex.c`, `computation_l_ex.c`,
//! `computation_s_ex.c`, `computation_t_ex.c`.

pub mod d1;
pub mod d2;
pub mod l;
pub mod s;
pub mod t;

use crate::error::IoError;
use crate::stream::RouteStream;
use std::io::{self, Write};

/// Runs `stream` to exhaustion through `run`, then converts any I/O error
/// the stream accumulated along the way into a propagated [`IoError`] —
/// every computation entry point below ends with this same check, since
/// none of them otherwise has an opportunity to observe a failed refill.
fn finish(stream: &RouteStream) -> Result<(), IoError> {
    match stream.io_error() {
        Some(e) => Err(IoError(e.to_string())),
        None => Ok(()),
    }
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<()> {
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")
}
