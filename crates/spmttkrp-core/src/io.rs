//! Text form of dense matrices
//!
//! The dump format is a shape header followed by one line per row, every
//! value printed with one decimal digit and followed by a tab, and a final
//! blank line:
//!
//! ```text
//! 2 x 3 matrix
//! 1.0	2.0	3.0
//! 4.0	5.0	6.0
//!
//! ```
//!
//! [`compare_dumps`] checks two dumps for equality while tolerating the
//! last-digit jitter that reordered floating-point summation produces.
//!
//! # Examples
//!
//! ```
//! use spmttkrp_core::{io, DenseMatrix};
//!
//! let m = DenseMatrix::from_row_major(2, 2, &[1.04, 2.0, 3.0, 4.26]).unwrap();
//! let mut out = Vec::new();
//! io::dump_matrix(&m, &mut out).unwrap();
//! assert_eq!(String::from_utf8(out.clone()).unwrap(), "2 x 2 matrix\n1.0\t2.0\t\n3.0\t4.3\t\n\n");
//!
//! let back = io::parse_matrix(out.as_slice()).unwrap();
//! assert_eq!(back.rows(), 2);
//! assert!((back[(1, 1)] - 4.3).abs() < 1e-6);
//! ```

use crate::error::{CoreResult, ErrorCode, ErrorInfo};
use crate::matrix::DenseMatrix;
use crate::types::Value;
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

const DUMP_MODULE: &str = "Mtx Dump";
const PARSE_MODULE: &str = "Mtx Parse";

/// Write `mtx` in dump format.
pub fn dump_matrix<W: Write>(mtx: &DenseMatrix, writer: &mut W) -> CoreResult<()> {
    let io_err = |e: std::io::Error| ErrorInfo::from_io(DUMP_MODULE, &e);

    writeln!(writer, "{} x {} matrix", mtx.rows(), mtx.cols()).map_err(io_err)?;
    for i in 0..mtx.rows() {
        for v in mtx.row(i) {
            write!(writer, "{:.1}\t", v).map_err(io_err)?;
        }
        writeln!(writer).map_err(io_err)?;
    }
    writeln!(writer).map_err(io_err)?;
    Ok(())
}

/// Write `mtx` in dump format to a new file at `path`.
pub fn dump_matrix_to_file(mtx: &DenseMatrix, path: impl AsRef<Path>) -> CoreResult<()> {
    let file = fs::File::create(path.as_ref()).map_err(|e| ErrorInfo::from_io(DUMP_MODULE, &e))?;
    let mut writer = std::io::BufWriter::new(file);
    dump_matrix(mtx, &mut writer)?;
    writer
        .flush()
        .map_err(|e| ErrorInfo::from_io(DUMP_MODULE, &e))
}

/// Read a matrix in dump format.
///
/// Values come back with the one-decimal precision of the dump.
pub fn parse_matrix<R: BufRead>(reader: R) -> CoreResult<DenseMatrix> {
    let mut lines = reader.lines();
    let mut next_line = || -> CoreResult<Option<String>> {
        lines
            .next()
            .transpose()
            .map_err(|e| ErrorInfo::from_io(PARSE_MODULE, &e))
    };

    let header = next_line()?
        .ok_or_else(|| ErrorInfo::new(PARSE_MODULE, ErrorCode::NoMore, "missing header"))?;
    let (rows, cols) = parse_header(&header)?;

    let mut mtx = DenseMatrix::new(rows, cols);
    for i in 0..rows {
        let line = next_line()?.ok_or_else(|| {
            ErrorInfo::new(
                PARSE_MODULE,
                ErrorCode::NoMore,
                format!("expected {} rows, found {}", rows, i),
            )
        })?;
        let row = mtx.row_mut(i);
        let mut fields = line.split('\t').filter(|f| !f.trim().is_empty());
        for (j, slot) in row.iter_mut().enumerate() {
            let field = fields.next().ok_or_else(|| {
                ErrorInfo::shape_mismatch(
                    PARSE_MODULE,
                    format!("row {} has {} values, expected {}", i, j, cols),
                )
            })?;
            *slot = field.trim().parse::<Value>().map_err(|e| {
                ErrorInfo::value_error(PARSE_MODULE, format!("row {}: {:?}: {}", i, field, e))
            })?;
        }
        if fields.next().is_some() {
            return Err(ErrorInfo::shape_mismatch(
                PARSE_MODULE,
                format!("row {} has more than {} values", i, cols),
            ));
        }
    }
    Ok(mtx)
}

fn parse_header(line: &str) -> CoreResult<(usize, usize)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [rows, "x", cols, "matrix"] => {
            let parse = |s: &str| {
                s.parse::<usize>().map_err(|e| {
                    ErrorInfo::value_error(PARSE_MODULE, format!("bad header {:?}: {}", line, e))
                })
            };
            Ok((parse(rows)?, parse(cols)?))
        }
        _ => Err(ErrorInfo::value_error(
            PARSE_MODULE,
            format!("bad header {:?}", line),
        )),
    }
}

/// Compare two dumps byte by byte, tolerating last-digit jitter.
///
/// Two differing bytes are accepted when their codes are at most one apart,
/// or when they are the `0`/`9` pair of a decimal carry. Dumps of different
/// lengths never match.
///
/// ```
/// use spmttkrp_core::io::compare_dumps;
///
/// assert!(compare_dumps(b"1.4\t", b"1.5\t"));
/// assert!(compare_dumps(b"2.0\t", b"1.9\t"));
/// assert!(!compare_dumps(b"1.4\t", b"1.7\t"));
/// assert!(!compare_dumps(b"1.4\t", b"1.4\t\n"));
/// ```
pub fn compare_dumps(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| !bytes_really_differ(x, y))
}

fn bytes_really_differ(a: u8, b: u8) -> bool {
    let carry_pair = (a == b'0' && b == b'9') || (a == b'9' && b == b'0');
    !carry_pair && a.abs_diff(b) > 1
}

/// Compare two dump files with [`compare_dumps`].
pub fn compare_dump_files(a: impl AsRef<Path>, b: impl AsRef<Path>) -> CoreResult<bool> {
    let read = |p: &Path| fs::read(p).map_err(|e| ErrorInfo::from_io("Mtx Compare", &e));
    Ok(compare_dumps(&read(a.as_ref())?, &read(b.as_ref())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_layout() {
        let m = DenseMatrix::from_row_major(1, 3, &[0.24, -1.0, 10.0]).unwrap();
        let mut out = Vec::new();
        dump_matrix(&m, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1 x 3 matrix\n0.2\t-1.0\t10.0\t\n\n"
        );
    }

    #[test]
    fn test_dump_empty_matrix() {
        let m = DenseMatrix::new(0, 4);
        let mut out = Vec::new();
        dump_matrix(&m, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 x 4 matrix\n\n");
    }

    #[test]
    fn test_round_trip_within_one_decimal() {
        let mut m = DenseMatrix::new(5, 9);
        m.fill_random(false);
        for i in 0..5 {
            for j in 0..9 {
                m[(i, j)] *= 100.0;
            }
        }

        let mut out = Vec::new();
        dump_matrix(&m, &mut out).unwrap();
        let back = parse_matrix(out.as_slice()).unwrap();

        assert_eq!(back.rows(), 5);
        assert_eq!(back.cols(), 9);
        for i in 0..5 {
            for j in 0..9 {
                assert!((back[(i, j)] - m[(i, j)]).abs() <= 0.05 + 1e-4);
            }
        }
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let err = parse_matrix("3 by 2 matrix\n".as_bytes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueError);

        let err = parse_matrix("2 x 2 matrix\n1.0\t2.0\t\n".as_bytes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoMore);

        let err = parse_matrix("1 x 2 matrix\n1.0\t\n".as_bytes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShapeMismatch);

        let err = parse_matrix("1 x 1 matrix\n1.0\t2.0\t\n".as_bytes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShapeMismatch);

        let err = parse_matrix("1 x 1 matrix\nabc\t\n".as_bytes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueError);

        let err = parse_matrix("".as_bytes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoMore);
    }

    #[test]
    fn test_compare_dumps_tolerance() {
        assert!(compare_dumps(b"12.3\t", b"12.3\t"));
        assert!(compare_dumps(b"12.3\t", b"12.4\t"));
        assert!(compare_dumps(b"10.0\t", b"09.9\t"));
        assert!(!compare_dumps(b"12.3\t", b"12.5\t"));
        assert!(!compare_dumps(b"1\n", b"1"));
    }

    #[test]
    fn test_dump_write_failure_is_os_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "broken pipe"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let m = DenseMatrix::new(1, 1);
        let err = dump_matrix(&m, &mut Broken).unwrap_err();
        assert!(err.code().is_os());
        assert_eq!(err.module(), "Mtx Dump");
    }
}
