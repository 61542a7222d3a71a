//! `.tns` text format support
//!
//! Two layouts are accepted on input:
//!
//! - **Headered**: the first line holds the number of modes N, the second
//!   line the N mode extents, then one nonzero per line.
//! - **Headerless** (FROSTT): one nonzero per line only. N is taken from the
//!   first line and every extent is the largest coordinate seen in that mode.
//!
//! A nonzero line is N coordinates followed by the value, separated by any
//! whitespace. Coordinates are offset by `start_index` (1 for the usual
//! 1-based files). Blank lines and lines starting with `#` are ignored.
//!
//! Output is always headered.
//!
//! # Examples
//!
//! ```
//! use spmttkrp_sparse::io;
//!
//! let text = "3\n2 3 2\n1 1 1 0.5\n2 3 1 -1.5\n";
//! let x = io::load_tns(text.as_bytes(), 1).unwrap();
//! assert_eq!(x.dims(), &[2, 3, 2]);
//! assert_eq!(x.coords(1), vec![1, 2, 0]);
//!
//! // The same nonzeros without a header infer the extents
//! let y = io::load_tns("1 1 1 0.5\n2 3 1 -1.5\n".as_bytes(), 1).unwrap();
//! assert_eq!(y.dims(), &[2, 3, 1]);
//!
//! let mut out = Vec::new();
//! io::dump_tns(&x, 1, &mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "3\n2 3 2\n1\t1\t1\t0.5\n2\t3\t1\t-1.5\n");
//! ```

use crate::coo::SparseTensor;
use crate::error::{ErrorCode, ErrorInfo, SparseResult};
use spmttkrp_core::{Index, Value};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const LOAD_MODULE: &str = "SpTns Load";
const DUMP_MODULE: &str = "SpTns Dump";

/// Read a tensor in `.tns` format, headered or headerless.
///
/// # Errors
///
/// - `NoMore` when the input holds no nonzero line and no header
/// - `ShapeMismatch` when a line has the wrong number of fields
/// - `ValueError` for unparsable fields, zero modes, or coordinates outside
///   `[start_index, start_index + extent)`
/// - `Os` when reading fails
pub fn load_tns<R: BufRead>(reader: R, start_index: Index) -> SparseResult<SparseTensor> {
    let mut lines = DataLines::new(reader);

    let (first_no, first) = lines
        .next_fields()?
        .ok_or_else(|| ErrorInfo::new(LOAD_MODULE, ErrorCode::NoMore, "no data in tensor file"))?;

    let tensor = if first.len() == 1 {
        load_headered(&mut lines, first_no, &first[0], start_index)?
    } else {
        load_headerless(&mut lines, first_no, first, start_index)?
    };

    tracing::debug!(
        nmodes = tensor.nmodes(),
        nnz = tensor.nnz(),
        dims = ?tensor.dims(),
        "loaded sparse tensor"
    );
    Ok(tensor)
}

/// Read a `.tns` file from `path`.
pub fn load_tns_file(path: impl AsRef<Path>, start_index: Index) -> SparseResult<SparseTensor> {
    let file = fs::File::open(path.as_ref()).map_err(|e| ErrorInfo::from_io(LOAD_MODULE, &e))?;
    load_tns(BufReader::new(file), start_index)
}

fn load_headered<R: BufRead>(
    lines: &mut DataLines<R>,
    header_no: usize,
    header: &str,
    start_index: Index,
) -> SparseResult<SparseTensor> {
    let nmodes: usize = parse_field(header, header_no)?;
    if nmodes == 0 {
        return Err(ErrorInfo::value_error(
            LOAD_MODULE,
            format!("line {}: a tensor needs at least one mode", header_no),
        ));
    }

    let (dims_no, dim_fields) = lines.next_fields()?.ok_or_else(|| {
        ErrorInfo::new(LOAD_MODULE, ErrorCode::NoMore, "missing mode extents line")
    })?;
    if dim_fields.len() != nmodes {
        return Err(ErrorInfo::shape_mismatch(
            LOAD_MODULE,
            format!(
                "line {}: {} extents for {} modes",
                dims_no,
                dim_fields.len(),
                nmodes
            ),
        ));
    }
    let dims = dim_fields
        .iter()
        .map(|f| parse_field::<Index>(f, dims_no))
        .collect::<SparseResult<Vec<_>>>()?;

    let mut tensor = SparseTensor::new(&dims)?;
    let mut coords = vec![0; nmodes];
    while let Some((line_no, fields)) = lines.next_fields()? {
        let value = parse_entry(&fields, nmodes, start_index, line_no, &mut coords)?;
        if let Some(m) = (0..nmodes).find(|&m| coords[m] >= dims[m]) {
            return Err(ErrorInfo::value_error(
                LOAD_MODULE,
                format!(
                    "line {}: coordinate {} out of range for mode {} of extent {}",
                    line_no,
                    coords[m] + start_index,
                    m,
                    dims[m]
                ),
            ));
        }
        tensor.append(&coords, value)?;
    }
    Ok(tensor)
}

fn load_headerless<R: BufRead>(
    lines: &mut DataLines<R>,
    first_no: usize,
    first: Vec<String>,
    start_index: Index,
) -> SparseResult<SparseTensor> {
    let nmodes = first.len() - 1;
    let mut columns: Vec<Vec<Index>> = vec![Vec::new(); nmodes];
    let mut values: Vec<Value> = Vec::new();
    let mut coords = vec![0; nmodes];

    let mut next = Some((first_no, first));
    while let Some((line_no, fields)) = next {
        let value = parse_entry(&fields, nmodes, start_index, line_no, &mut coords)?;
        for (column, &i) in columns.iter_mut().zip(&coords) {
            column.push(i);
        }
        values.push(value);
        next = lines.next_fields()?;
    }

    let dims = columns
        .iter()
        .map(|column| {
            let max = column.iter().copied().max().unwrap_or(0);
            max.checked_add(1).ok_or_else(|| {
                ErrorInfo::value_error(LOAD_MODULE, "coordinate does not fit the index type")
            })
        })
        .collect::<SparseResult<Vec<_>>>()?;

    SparseTensor::from_parts(&dims, columns, values)
}

/// Parse one nonzero line into `coords` (offset removed) and return its value.
fn parse_entry(
    fields: &[String],
    nmodes: usize,
    start_index: Index,
    line_no: usize,
    coords: &mut [Index],
) -> SparseResult<Value> {
    if fields.len() != nmodes + 1 {
        return Err(ErrorInfo::shape_mismatch(
            LOAD_MODULE,
            format!(
                "line {}: {} fields, expected {} coordinates and a value",
                line_no,
                fields.len(),
                nmodes
            ),
        ));
    }
    for (slot, field) in coords.iter_mut().zip(fields) {
        let raw: Index = parse_field(field, line_no)?;
        *slot = raw.checked_sub(start_index).ok_or_else(|| {
            ErrorInfo::value_error(
                LOAD_MODULE,
                format!(
                    "line {}: coordinate {} below start index {}",
                    line_no, raw, start_index
                ),
            )
        })?;
    }
    parse_field(&fields[nmodes], line_no)
}

fn parse_field<T: std::str::FromStr>(field: &str, line_no: usize) -> SparseResult<T>
where
    T::Err: std::fmt::Display,
{
    field.parse::<T>().map_err(|e| {
        ErrorInfo::value_error(
            LOAD_MODULE,
            format!("line {}: {:?}: {}", line_no, field, e),
        )
    })
}

/// Non-blank, non-comment lines split into whitespace-separated fields
struct DataLines<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> DataLines<R> {
    fn new(reader: R) -> Self {
        DataLines {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    /// Next data line as `(1-based line number, fields)`
    fn next_fields(&mut self) -> SparseResult<Option<(usize, Vec<String>)>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line.map_err(|e| ErrorInfo::from_io(LOAD_MODULE, &e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields = trimmed.split_whitespace().map(str::to_owned).collect();
            return Ok(Some((self.line_no, fields)));
        }
        Ok(None)
    }
}

/// Write `tensor` in headered `.tns` format with coordinates offset by
/// `start_index`.
///
/// Values use the shortest representation that reads back to the same
/// `f32`, so a dump/load pair reproduces the tensor exactly.
pub fn dump_tns<W: Write>(
    tensor: &SparseTensor,
    start_index: Index,
    writer: &mut W,
) -> SparseResult<()> {
    let io_err = |e: std::io::Error| ErrorInfo::from_io(DUMP_MODULE, &e);

    writeln!(writer, "{}", tensor.nmodes()).map_err(io_err)?;
    let dims: Vec<String> = tensor.dims().iter().map(|d| d.to_string()).collect();
    writeln!(writer, "{}", dims.join(" ")).map_err(io_err)?;

    for (x, &v) in tensor.values().iter().enumerate() {
        for m in 0..tensor.nmodes() {
            let i = u64::from(tensor.mode_indices(m)[x]) + u64::from(start_index);
            write!(writer, "{}\t", i).map_err(io_err)?;
        }
        writeln!(writer, "{}", v).map_err(io_err)?;
    }
    Ok(())
}

/// Write `tensor` to a new `.tns` file at `path`.
pub fn dump_tns_file(
    tensor: &SparseTensor,
    start_index: Index,
    path: impl AsRef<Path>,
) -> SparseResult<()> {
    let file = fs::File::create(path.as_ref()).map_err(|e| ErrorInfo::from_io(DUMP_MODULE, &e))?;
    let mut writer = BufWriter::new(file);
    dump_tns(tensor, start_index, &mut writer)?;
    writer
        .flush()
        .map_err(|e| ErrorInfo::from_io(DUMP_MODULE, &e))
}
