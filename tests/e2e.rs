//! End-to-end scenarios: each writes a small CSV body (header prepended) to
//! a temp file and asserts on the exact stdout a computation entry point
//! produces, exercising the full stream → aggregate → rank → extract
//! pipeline per computation.

use std::io::Write;

use route_step_analytics::cli::Computation;
use route_step_analytics::run_computation;

fn write_csv(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("failed to create temp file");
    write!(f, "a;b;c;d;e;f\n{body}").unwrap();
    f.flush().unwrap();
    f
}

fn run(computation: Computation, body: &str) -> String {
    let csv = write_csv(body);
    let mut out = Vec::new();
    run_computation(computation, csv.path().to_str().unwrap(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn scenario_d1_tiny() {
    let body = "1;1;X;Y;10;A\n1;2;Y;Z;5;A\n2;1;X;Y;2;B\n2;2;Y;X;2;A\n";
    assert_eq!(run(Computation::D1, body), "A;2\nB;1\n");
}

#[test]
fn scenario_d2_tiny() {
    let body = "1;1;X;Y;10;A\n1;2;Y;Z;5;A\n2;1;X;Y;2;B\n2;2;Y;X;2;A\n";
    assert_eq!(run(Computation::D2, body), "A;17.000000\nB;2.000000\n");
}

#[test]
fn scenario_l_tiny() {
    let body = "1;1;X;Y;10;A\n1;2;Y;Z;5;A\n2;1;X;Y;2;B\n";
    assert_eq!(run(Computation::L, body), "1;15.000000\n2;2.000000\n");
}

#[test]
fn scenario_s_tiny() {
    let body = "1;1;X;Y;10;A\n1;2;Y;Z;4;A\n1;3;Z;W;6;A\n2;1;X;Y;5;B\n";
    assert_eq!(
        run(Computation::S, body),
        "1;1;4.000000;6.666667;10.000000;6.000000\n2;2;5.000000;5.000000;5.000000;0.000000\n"
    );
}

#[test]
fn scenario_t_tiny() {
    let body = "1;1;X;Y;3;A\n1;2;Y;Z;3;A\n2;1;Y;W;4;B\n";
    assert_eq!(run(Computation::T, body), "Y;2;1\nW;1;0\nX;1;1\nZ;1;0\n");
}

#[test]
fn scenario_header_only_file_produces_no_output_for_every_computation() {
    for computation in [
        Computation::D1,
        Computation::D2,
        Computation::L,
        Computation::S,
        Computation::T,
    ] {
        assert_eq!(run(computation, ""), "");
    }
}
