use crate::core::linalg::block_matrix::BlockMatrix;
use nalgebra::DMatrix;
use std::io::{self, Write};

/// Significant digits written for every value.
pub const SIGNIFICANT_DIGITS: usize = 10;

/// Writes every entry of `matrix` as a `row col value` line, 1-based.
pub fn write_matrix<W: Write>(out: &mut W, matrix: &DMatrix<f64>) -> io::Result<()> {
    write_offset(out, matrix, 0, 0)
}

/// Writes a tile in global coordinates: entries are offset by the tile's
/// row and column start before being made 1-based.
pub fn write_block<W: Write>(out: &mut W, block: &BlockMatrix) -> io::Result<()> {
    write_offset(out, block.data(), block.row_start(), block.column_start())
}

/// Writes eigenvalues as diagonal triples `i i value`, 1-based.
pub fn write_eigenvalues<W: Write>(out: &mut W, values: &[f64]) -> io::Result<()> {
    for (i, &value) in values.iter().enumerate() {
        writeln!(out, "{} {} {}", i + 1, i + 1, format_value(value))?;
    }
    Ok(())
}

fn write_offset<W: Write>(
    out: &mut W,
    matrix: &DMatrix<f64>,
    row_start: usize,
    column_start: usize,
) -> io::Result<()> {
    for r in 0..matrix.nrows() {
        for c in 0..matrix.ncols() {
            writeln!(
                out,
                "{} {} {}",
                row_start + r + 1,
                column_start + c + 1,
                format_value(matrix[(r, c)])
            )?;
        }
    }
    Ok(())
}

/// Formats like C's `%.10g`: fixed notation for moderate exponents,
/// scientific otherwise, with trailing zeros removed.
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value);
    let exponent: i32 = scientific
        .rsplit_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
        let (mantissa, exp) = scientific.split_at(scientific.find('e').unwrap_or(scientific.len()));
        format!("{}{}", trim_zeros(mantissa), exp)
    } else {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
