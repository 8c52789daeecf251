//! Driver: selects the computation, wires the stream, exits. Mirrors
//! `original_source/progc/src/main.c`'s shape (`setlocale(LC_ALL, "C")` →
//! parse options → open stream → dispatch) minus the original's
//! disconnected "no computation" debug branch — exactly one computation
//! flag is required here instead.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::io::{stdout, BufWriter};
use std::process::ExitCode;

use route_step_analytics::cli;
use route_step_analytics::error::AnalyticsError;
use route_step_analytics::{logging, run_computation};

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run() -> Result<(), AnalyticsError> {
    let args = cli::parse(std::env::args().skip(1))?;

    let stdout = stdout();
    let mut out = BufWriter::new(stdout.lock());

    let _span = tracing::info_span!("computation", flag = ?args.computation).entered();
    run_computation(args.computation, &args.path, &mut out)?;

    Ok(())
}
