//! Delimiter scanner: locates the five `;` and the terminating `\n` in one
//! CSV row.
//!
//! Two strategies, selected at runtime by CPU feature detection rather than
//! at build time as the original C did with `USE_AVX_DELIM_SEARCH`/`-mavx2`:
//! a scalar byte-at-a-time scan, and an AVX2 vectorised scan
//! (`original_source/progc/src/delimiter_search.h`) that loads 64 bytes,
//! builds a bitmask of delimiter positions, and repeatedly takes the lowest
//! set bit.
//!
//! # Safety contract
//!
//! Callers must guarantee that `line` has at least 64 zeroed bytes of valid
//! memory *past* its logical end: the stream buffer reserves one byte of
//! slack plus a 64-byte zeroed tail for exactly this purpose. This lets the
//! AVX2 path read 64-byte chunks unconditionally without special-casing the
//! final partial chunk.

const SEMICOLON: u8 = b';';
const NEWLINE: u8 = b'\n';

/// Six strictly increasing byte offsets (relative to the start of `line`):
/// the first five are `;` positions, the sixth is `\n`.
pub type Delimiters = [usize; 6];

/// Scans one row starting at `line[0]` for its six delimiters.
///
/// # Panics
///
/// Panics (a schema violation — malformed rows abort the run) if fewer than
/// five `;` are found before the `\n`, or if no `\n` is found within the
/// scanned region.
pub fn scan(line: &[u8]) -> Delimiters {
    if is_x86_feature_detected() {
        // SAFETY: `scan_avx2` requires AVX2 support (checked above) and a
        // 64-byte zeroed tail past `line`, guaranteed by the stream
        // reader's buffer layout.
        unsafe { scan_avx2(line) }
    } else {
        scan_scalar(line)
    }
}

#[cfg(target_arch = "x86_64")]
fn is_x86_feature_detected() -> bool {
    std::is_x86_feature_detected!("avx2")
}

#[cfg(not(target_arch = "x86_64"))]
fn is_x86_feature_detected() -> bool {
    false
}

/// Byte-at-a-time fallback: five successive `;` scans, then one `\n` scan,
/// validating that the newline lies after the fifth semicolon.
fn scan_scalar(line: &[u8]) -> Delimiters {
    let mut out: Delimiters = [0; 6];
    let mut cursor = 0usize;

    for slot in out.iter_mut().take(5) {
        let found = memchr(SEMICOLON, &line[cursor..])
            .unwrap_or_else(|| schema_error("missing ';' delimiter in row"));
        *slot = cursor + found;
        cursor = *slot + 1;
    }

    let newline = memchr(NEWLINE, &line[cursor..])
        .unwrap_or_else(|| schema_error("missing terminating '\\n' in row"));
    out[5] = cursor + newline;

    out
}

fn memchr(needle: u8, haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

/// AVX2-vectorised scan: builds a 64-bit bitmask of `;`/`\n` positions per
/// 64-byte chunk and repeatedly extracts the lowest set bit, mirroring
/// `original_source/progc/src/delimiter_search.h`'s `makeNewMask64` loop.
///
/// # Safety
///
/// The caller must ensure AVX2 is available and that `line` has at least 64
/// bytes of valid (zero-initialised past EOF) memory beyond its logical
/// content, for every 64-byte chunk this function may read.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn scan_avx2(line: &[u8]) -> Delimiters {
    use std::arch::x86_64::*;

    let semicolon = _mm256_set1_epi8(SEMICOLON as i8);
    let newline = _mm256_set1_epi8(NEWLINE as i8);

    let mut out: Delimiters = [0; 6];
    let mut chunk_base = 0usize;
    let mut mask = mask64_at(line, 0, semicolon, newline);

    for slot in out.iter_mut() {
        while mask == 0 {
            chunk_base += 64;
            assert!(
                chunk_base < line.len() + 64,
                "schema violation: row has no terminating '\\n' within bounds"
            );
            mask = mask64_at(line, chunk_base, semicolon, newline);
        }
        let bit = mask.trailing_zeros() as usize;
        *slot = chunk_base + bit;
        mask &= mask - 1; // clear lowest set bit
    }

    out
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn mask64_at(
    line: &[u8],
    base: usize,
    semicolon: std::arch::x86_64::__m256i,
    newline: std::arch::x86_64::__m256i,
) -> u64 {
    let lo = mask32_at(line, base, semicolon, newline);
    let hi = mask32_at(line, base + 32, semicolon, newline);
    (hi as u64) << 32 | lo as u64
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn mask32_at(
    line: &[u8],
    offset: usize,
    semicolon: std::arch::x86_64::__m256i,
    newline: std::arch::x86_64::__m256i,
) -> u32 {
    use std::arch::x86_64::*;

    // Relies on the 64-byte zeroed tail past the buffer's logical content
    // (the stream reader's buffering contract), so this is always a valid
    // 32-byte read even for the last, partial chunk of a row.
    let ptr = line.as_ptr().add(offset) as *const __m256i;
    let v = _mm256_loadu_si256(ptr);
    let semi_eq = _mm256_cmpeq_epi8(v, semicolon);
    let nl_eq = _mm256_cmpeq_epi8(v, newline);
    let any = _mm256_or_si256(semi_eq, nl_eq);
    _mm256_movemask_epi8(any) as u32
}

fn schema_error(msg: &str) -> ! {
    panic!("schema error: {msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(line: &str) -> Vec<u8> {
        let mut v = line.as_bytes().to_vec();
        v.resize(v.len() + 64, 0);
        v
    }

    #[test]
    fn scalar_finds_six_delimiters() {
        let buf = padded("1;2;X;Y;10.5;A\n");
        let d = scan_scalar(&buf);
        assert_eq!(d, [1, 3, 5, 7, 12, 14]);
    }

    #[test]
    fn scan_agrees_between_scalar_and_dispatch() {
        let buf = padded("123;45;town one;town two;99.99;driver name\n");
        let scalar = scan_scalar(&buf);
        let dispatched = scan(&buf);
        assert_eq!(scalar, dispatched);
    }

    #[test]
    #[should_panic(expected = "schema error")]
    fn scalar_panics_on_missing_semicolon() {
        let buf = padded("12345X\n");
        let _ = scan_scalar(&buf);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn avx2_matches_scalar_when_available() {
        if !is_x86_feature_detected() {
            return;
        }
        let buf = padded("7;8;alpha;beta;3.14;carl\n");
        let scalar = scan_scalar(&buf);
        let avx = unsafe { scan_avx2(&buf) };
        assert_eq!(scalar, avx);
    }
}
