//! Route-step analytics: a batch top-K engine over a semicolon-delimited CSV
//! of vehicle route legs. The binary entry point lives in
//! `main.rs`; this library exposes the parse-and-aggregate substrate and the
//! five computations so benches and integration tests can drive them
//! directly, the same way this crate's `benches/benchmark.rs` drives the
//! computations without going through the binary.

pub mod arena;
pub mod avl;
pub mod cli;
pub mod computations;
pub mod delim;
pub mod error;
pub mod logging;
pub mod map;
pub mod parse;
pub mod partition;
pub mod stream;

use std::io::{self, Write};

use cli::Computation;
use error::IoError;
use stream::RouteStream;

/// Opens `path` and runs `computation` against it, writing the ranked
/// output to `out`. Shared by `main.rs` and the integration/benchmark
/// harnesses so there is exactly one dispatch table for the five
/// computations.
pub fn run_computation(
    computation: Computation,
    path: &str,
    out: &mut impl Write,
) -> Result<(), IoError> {
    let mut stream = RouteStream::open(path)?;
    match computation {
        Computation::D1 => computations::d1::run(&mut stream, out),
        Computation::D2 => computations::d2::run(&mut stream, out),
        Computation::L => computations::l::run(&mut stream, out),
        Computation::S => computations::s::run(&mut stream, out),
        Computation::T => computations::t::run(&mut stream, out),
    }
}

/// Convenience used by `benches/benchmark.rs`: runs a computation and
/// discards its output, isolating I/O-to-stdout cost from the measurement.
pub fn run_computation_discarding_output(computation: Computation, path: &str) -> Result<(), IoError> {
    run_computation(computation, path, &mut io::sink())
}
