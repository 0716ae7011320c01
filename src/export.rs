use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::io::read_point_cloud;
use crate::pointcloud::PointCloud;
use crate::table::PointTable;

/// Output path for an input cloud: the input path with `.csv` appended,
/// so `scan.ply` gives `scan.ply.csv`.
pub fn csv_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let mut path = OsString::from(input.as_ref().as_os_str());
    path.push(".csv");
    PathBuf::from(path)
}

/// What an export run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Blocking viewer called with the loaded cloud.
pub type Viewer = fn(&PointCloud) -> Result<()>;

/// Loads a point cloud once, shows it, prints a preview and writes it as CSV.
pub struct PointCloudExporter {
    preview_rows: usize,
    show_viewer: bool,
    viewer: Viewer,
    output: Option<PathBuf>,
}

impl Default for PointCloudExporter {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            show_viewer: true,
            viewer: visualize,
            output: None,
        }
    }
}

impl PointCloudExporter {
    pub fn preview_rows(mut self, value: usize) -> Self {
        self.preview_rows = value;
        self
    }

    pub fn show_viewer(mut self, value: bool) -> Self {
        self.show_viewer = value;
        self
    }

    /// Replaces the window viewer, e.g. with one drawing elsewhere.
    pub fn viewer(mut self, value: Viewer) -> Self {
        self.viewer = value;
        self
    }

    /// Overrides the default `<input>.csv` output path.
    pub fn output(mut self, value: Option<PathBuf>) -> Self {
        self.output = value;
        self
    }

    /// Runs the whole export. The cloud is loaded before anything is
    /// written, so a missing or malformed input leaves no output file.
    /// A viewer that fails is logged and the export goes on.
    ///
    /// # Arguments
    ///
    /// * `input` - Point cloud file.
    /// * `preview` - Where the preview table goes, usually stdout.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, mut preview: W) -> Result<ExportSummary> {
        let input = input.as_ref();
        let pcl = read_point_cloud(input)?;

        let sphere = pcl.bounding_sphere();
        if !sphere.is_empty() {
            info!(
                center = ?[sphere.center.x, sphere.center.y, sphere.center.z],
                radius = sphere.radius,
                "point cloud bounds"
            );
        }

        if self.show_viewer {
            if let Err(err) = (self.viewer)(&pcl) {
                warn!("{err}, continuing without the viewer");
            }
        }

        let table = PointTable::from_pointcloud(&pcl);
        write!(preview, "{}", table.head(self.preview_rows))?;
        preview.flush()?;

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| csv_output_path(input));
        table.to_csv(&output)?;
        info!(output = %output.display(), rows = table.len(), "wrote CSV");

        Ok(ExportSummary {
            output,
            rows: table.len(),
            columns: table.column_names().to_vec(),
        })
    }
}

#[cfg(feature = "viz")]
fn visualize(pcl: &PointCloud) -> Result<()> {
    crate::viz::show_point_cloud(pcl)
}

#[cfg(not(feature = "viz"))]
fn visualize(_pcl: &PointCloud) -> Result<()> {
    warn!("built without the `viz` feature, skipping the viewer");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rstest::*;

    use super::{csv_output_path, PointCloudExporter};
    use crate::error::{Error, Result};
    use crate::pointcloud::PointCloud;

    fn unavailable_viewer(_pcl: &PointCloud) -> Result<()> {
        Err(Error::viewer("no Vulkan device found"))
    }

    #[rstest]
    #[case("cloud.ply", "cloud.ply.csv")]
    #[case("data/scan.PCD", "data/scan.PCD.csv")]
    #[case("noext", "noext.csv")]
    fn test_csv_output_path_appends_suffix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(csv_output_path(input), PathBuf::from(expected));
    }

    #[test]
    fn test_export_cube() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cube.ply");
        std::fs::copy("tests/data/cube.ply", &input).unwrap();

        let mut preview = Vec::new();
        let summary = PointCloudExporter::default()
            .show_viewer(false)
            .run(&input, &mut preview)
            .unwrap();

        assert_eq!(summary.output, dir.path().join("cube.ply.csv"));
        assert_eq!(summary.rows, 8);
        assert_eq!(summary.columns[0], "x");

        let csv = std::fs::read_to_string(&summary.output).unwrap();
        assert_eq!(csv.lines().count(), 9);
        assert!(csv.starts_with("x,y,z,nx,ny,nz,red,green,blue,intensity\n"));

        let preview = String::from_utf8(preview).unwrap();
        assert_eq!(preview.lines().count(), 6);
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.ply");

        let result = PointCloudExporter::default()
            .show_viewer(false)
            .run(&input, std::io::sink());

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(!csv_output_path(&input).exists());
    }

    #[test]
    fn test_output_override() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("points.csv");

        let summary = PointCloudExporter::default()
            .show_viewer(false)
            .preview_rows(0)
            .output(Some(output.clone()))
            .run("tests/data/cube.xyz", std::io::sink())
            .unwrap();

        assert_eq!(summary.output, output);
        assert_eq!(summary.columns, vec!["x", "y", "z"]);
        assert!(output.exists());
    }

    #[test]
    fn test_viewer_failure_still_exports() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cube.xyz");
        std::fs::copy("tests/data/cube.xyz", &input).unwrap();

        let mut preview = Vec::new();
        let summary = PointCloudExporter::default()
            .viewer(unavailable_viewer)
            .run(&input, &mut preview)
            .unwrap();

        assert_eq!(summary.rows, 8);
        assert!(csv_output_path(&input).exists());
        assert_eq!(String::from_utf8(preview).unwrap().lines().count(), 6);
    }
}
