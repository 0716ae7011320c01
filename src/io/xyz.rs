use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use super::open_file;
use crate::error::{Error, Result};
use crate::pointcloud::PointCloud;

/// Column layout of whitespace separated point files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XyzLayout {
    /// `x y z` per line.
    Points,
    /// `x y z nx ny nz` per line.
    PointsNormals,
    /// `x y z r g b` per line, colors as floats in [0, 1].
    PointsColors,
}

impl XyzLayout {
    fn columns(&self) -> usize {
        match self {
            XyzLayout::Points => 3,
            XyzLayout::PointsNormals | XyzLayout::PointsColors => 6,
        }
    }
}

/// Reads a plain text point file. Blank lines and `#` comments are skipped;
/// values past the layout's columns are ignored. Commas are accepted as
/// separators.
pub fn read_xyz<P: AsRef<Path>>(filepath: P, layout: XyzLayout) -> Result<PointCloud> {
    let filepath = filepath.as_ref();
    let reader = BufReader::new(open_file(filepath)?);
    let num_columns = layout.columns();

    let mut values = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let row = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .take(num_columns)
            .map(|token| token.parse::<f32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::format(filepath, format!("{}: {err}: `{line}`", line_number + 1))
            })?;
        if row.len() != num_columns {
            return Err(Error::format(
                filepath,
                format!(
                    "{}: expected {num_columns} values, got `{line}`",
                    line_number + 1
                ),
            ));
        }
        values.extend(row);
    }

    let len = values.len() / num_columns;
    let table = Array2::from_shape_vec((len, num_columns), values)
        .map_err(|err| Error::format(filepath, err.to_string()))?;
    let points = table.slice(ndarray::s![.., 0..3]).to_owned();
    let pcl = PointCloud::from_points(points);

    Ok(match layout {
        XyzLayout::Points => pcl,
        XyzLayout::PointsNormals => pcl.with_normals(table.slice(ndarray::s![.., 3..6]).to_owned()),
        XyzLayout::PointsColors => pcl.with_colors(
            table
                .slice(ndarray::s![.., 3..6])
                .mapv(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8),
        ),
    })
}
