use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use ndarray::{ArrayView1, Axis};

use crate::error::Result;
use crate::pointcloud::{PointCloud, ScalarValues};

/// One column of a [`PointTable`], borrowed from the point cloud.
#[derive(Debug, Clone)]
pub enum Column<'a> {
    Float(ArrayView1<'a, f32>),
    Double(ArrayView1<'a, f64>),
    Int(ArrayView1<'a, i64>),
    UChar(ArrayView1<'a, u8>),
}

impl<'a> Column<'a> {
    /// Cell text as written to CSV. Floats use the shortest representation
    /// that reads back to the same value.
    pub fn cell(&self, row: usize) -> String {
        match self {
            Column::Float(values) => format!("{:?}", values[row]),
            Column::Double(values) => format!("{:?}", values[row]),
            Column::Int(values) => values[row].to_string(),
            Column::UChar(values) => values[row].to_string(),
        }
    }

    /// Cell text for the console preview, floats with six decimals.
    fn preview_cell(&self, row: usize) -> String {
        match self {
            Column::Float(values) => format!("{:.6}", values[row]),
            Column::Double(values) => format!("{:.6}", values[row]),
            _ => self.cell(row),
        }
    }
}

impl<'a> From<&'a ScalarValues> for Column<'a> {
    fn from(values: &'a ScalarValues) -> Self {
        match values {
            ScalarValues::Float(values) => Column::Float(values.view()),
            ScalarValues::Double(values) => Column::Double(values.view()),
            ScalarValues::Int(values) => Column::Int(values.view()),
        }
    }
}

/// Row/column view of a point cloud: one row per point, columns
/// `x, y, z`, then `nx, ny, nz`, `red, green, blue` and the scalar fields
/// when the cloud has them.
pub struct PointTable<'a> {
    names: Vec<String>,
    columns: Vec<Column<'a>>,
    len: usize,
}

impl<'a> PointTable<'a> {
    pub fn from_pointcloud(pcl: &'a PointCloud) -> Self {
        let mut table = Self {
            names: Vec::new(),
            columns: Vec::new(),
            len: pcl.len(),
        };

        for (name, column) in ["x", "y", "z"].iter().zip(pcl.points.axis_iter(Axis(1))) {
            table.push(name, Column::Float(column));
        }
        if let Some(normals) = &pcl.normals {
            for (name, column) in ["nx", "ny", "nz"].iter().zip(normals.axis_iter(Axis(1))) {
                table.push(name, Column::Float(column));
            }
        }
        if let Some(colors) = &pcl.colors {
            for (name, column) in ["red", "green", "blue"]
                .iter()
                .zip(colors.axis_iter(Axis(1)))
            {
                table.push(name, Column::UChar(column));
            }
        }
        for field in pcl.scalars.iter() {
            table.push(&field.name, Column::from(&field.values));
        }

        table
    }

    fn push(&mut self, name: &str, column: Column<'a>) {
        self.names.push(name.to_string());
        self.columns.push(column);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&Column<'a>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|index| &self.columns[index])
    }

    pub fn record(&self, row: usize) -> Vec<String> {
        self.columns.iter().map(|column| column.cell(row)).collect()
    }

    /// The first `rows` rows, for printing.
    pub fn head(&self, rows: usize) -> TablePreview<'_, 'a> {
        TablePreview {
            table: self,
            rows: rows.min(self.len),
        }
    }

    /// Writes a header row with the column names and one record per point.
    /// No row index column is written.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.names)?;
        for row in 0..self.len {
            csv_writer.write_record(self.columns.iter().map(|column| column.cell(row)))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv<P: AsRef<Path>>(&self, filepath: P) -> Result<()> {
        self.write_csv(BufWriter::new(File::create(filepath)?))
    }
}

/// Aligned text rendering of the first rows of a table, with the row index
/// on the left.
pub struct TablePreview<'t, 'a> {
    table: &'t PointTable<'a>,
    rows: usize,
}

impl<'t, 'a> fmt::Display for TablePreview<'t, 'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let index_width = self.rows.saturating_sub(1).to_string().len();
        let cells: Vec<Vec<String>> = self
            .table
            .columns
            .iter()
            .map(|column| (0..self.rows).map(|row| column.preview_cell(row)).collect())
            .collect();
        let widths: Vec<usize> = self
            .table
            .names
            .iter()
            .zip(cells.iter())
            .map(|(name, column)| {
                column
                    .iter()
                    .map(String::len)
                    .chain(std::iter::once(name.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        writeln!(
            f,
            "{:index_width$}  {}",
            "",
            self.table
                .names
                .iter()
                .zip(widths.iter())
                .map(|(name, &width)| format!("{name:>width$}"))
                .join("  ")
        )?;
        for row in 0..self.rows {
            writeln!(
                f,
                "{row:<index_width$}  {}",
                cells
                    .iter()
                    .zip(widths.iter())
                    .map(|(column, &width)| format!("{:>width$}", column[row]))
                    .join("  ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array1};
    use rstest::*;

    use super::PointTable;
    use crate::pointcloud::{PointCloud, ScalarField, ScalarValues};
    use crate::unit_test::sample_cube_pointcloud;

    #[rstest]
    fn test_columns_follow_attributes(sample_cube_pointcloud: PointCloud) {
        let table = PointTable::from_pointcloud(&sample_cube_pointcloud);
        assert_eq!(
            table.column_names(),
            ["x", "y", "z", "nx", "ny", "nz", "red", "green", "blue", "intensity"]
        );
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn test_points_only() {
        let pcl = PointCloud::from_points(array![[0.5f32, 1.0, -2.25]]);
        let table = PointTable::from_pointcloud(&pcl);
        assert_eq!(table.column_names(), ["x", "y", "z"]);
        assert_eq!(table.record(0), vec!["0.5", "1.0", "-2.25"]);
    }

    #[test]
    fn test_write_csv_has_header_and_no_index() {
        let pcl = PointCloud::from_points(array![[0.0f32, 1.0, 2.0], [3.0, 4.0, 5.0]])
            .with_colors(array![[1u8, 2, 3], [4, 5, 6]])
            .with_scalar(ScalarField::new("label", ScalarValues::Int(Array1::from(vec![7, 8]))));

        let mut buffer = Vec::new();
        PointTable::from_pointcloud(&pcl)
            .write_csv(&mut buffer)
            .unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "x,y,z,red,green,blue,label\n0.0,1.0,2.0,1,2,3,7\n3.0,4.0,5.0,4,5,6,8\n"
        );
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let pcl = PointCloud::zeros(0);
        let mut buffer = Vec::new();
        PointTable::from_pointcloud(&pcl)
            .write_csv(&mut buffer)
            .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "x,y,z\n");
    }

    #[rstest]
    fn test_head_preview(sample_cube_pointcloud: PointCloud) {
        let table = PointTable::from_pointcloud(&sample_cube_pointcloud);
        let preview = table.head(5).to_string();
        let lines: Vec<&str> = preview.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(lines[0].trim_start().starts_with('x'));
        assert!(lines[1].starts_with('0'));
        assert!(lines[5].starts_with('4'));
        assert!(lines[2].contains("1.000000"));
    }

    #[test]
    fn test_head_is_capped_by_length() {
        let pcl = PointCloud::zeros(2);
        let table = PointTable::from_pointcloud(&pcl);
        assert_eq!(table.head(10).to_string().lines().count(), 3);
    }
}
