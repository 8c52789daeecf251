//! Argument parsing, hand-rolled rather than built on `clap` so the exact
//! French error strings and exit codes are reproduced literally.
//!
//! Grounded on `original_source/progc/src/options.c`'s `parseOptions`: the
//! same single left-to-right argv scan, the same "first bare argument is the
//! file path, any flag after the first `-flag` match wins the computation
//! slot" shape. The original's `COMPUTATION_NONE` fallback into a disconnected
//! debug routine has no counterpart here — exactly one computation flag is
//! required, full stop.

use crate::error::ArgError;

/// Which of the five computations to run, selected by exactly one CLI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Computation {
    D1,
    D2,
    L,
    S,
    T,
}

impl Computation {
    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-s" => Some(Computation::S),
            "-t" => Some(Computation::T),
            "-d1" => Some(Computation::D1),
            "-d2" => Some(Computation::D2),
            "-l" => Some(Computation::L),
            _ => None,
        }
    }
}

/// The fully parsed invocation: which computation to run, and the CSV path.
#[derive(Debug, Clone)]
pub struct Args {
    pub computation: Computation,
    pub path: String,
}

/// Parses `argv[1..]`: `prog [-s | -t | -d1 | -d2 | -l] <csv-path>`.
///
/// Exactly one computation flag is required; double-specifying, an unknown
/// option, or a missing path all fail with the documented French message.
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Args, ArgError> {
    let mut computation: Option<Computation> = None;
    let mut path: Option<String> = None;

    for arg in args {
        if arg.starts_with('-') {
            match Computation::from_flag(&arg) {
                Some(c) => {
                    if computation.is_some() {
                        return Err(ArgError(format!(
                            "« {arg} » invalide : traitement déjà spécifié"
                        )));
                    }
                    computation = Some(c);
                }
                None => {
                    return Err(ArgError(format!("Option inconnue : « {arg} »")));
                }
            }
        } else if path.is_none() {
            path = Some(arg);
        } else {
            return Err(ArgError(format!("Argument inattendu : « {arg} »")));
        }
    }

    let computation = computation
        .ok_or_else(|| ArgError("Aucun traitement spécifié".to_string()))?;
    let path = path.ok_or_else(|| ArgError("Aucun fichier spécifié".to_string()))?;

    Ok(Args { computation, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_each_flag() {
        for (flag, expected) in [
            ("-s", Computation::S),
            ("-t", Computation::T),
            ("-d1", Computation::D1),
            ("-d2", Computation::D2),
            ("-l", Computation::L),
        ] {
            let parsed = parse(args(&[flag, "data.csv"])).unwrap();
            assert_eq!(parsed.computation, expected);
            assert_eq!(parsed.path, "data.csv");
        }
    }

    #[test]
    fn flag_order_does_not_matter() {
        let parsed = parse(args(&["data.csv", "-l"])).unwrap();
        assert_eq!(parsed.computation, Computation::L);
        assert_eq!(parsed.path, "data.csv");
    }

    #[test]
    fn double_specified_computation_is_an_error() {
        let err = parse(args(&["-s", "-t", "data.csv"])).unwrap_err();
        assert_eq!(err.0, "« -t » invalide : traitement déjà spécifié");
    }

    #[test]
    fn unknown_option_is_an_error() {
        let err = parse(args(&["--bogus", "data.csv"])).unwrap_err();
        assert_eq!(err.0, "Option inconnue : « --bogus »");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = parse(args(&["-s"])).unwrap_err();
        assert_eq!(err.0, "Aucun fichier spécifié");
    }

    #[test]
    fn missing_computation_is_an_error() {
        let err = parse(args(&["data.csv"])).unwrap_err();
        assert_eq!(err.0, "Aucun traitement spécifié");
    }
}
