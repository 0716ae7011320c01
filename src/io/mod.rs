use std::fs::File;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pointcloud::PointCloud;

mod off;
pub use off::read_off;
mod pcd;
pub use pcd::read_pcd;
mod ply;
pub use ply::read_ply;
mod xyz;
pub use xyz::{read_xyz, XyzLayout};

/// Point cloud file formats recognised by [`read_point_cloud`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointCloudFormat {
    Ply,
    Pcd,
    Off,
    Xyz(XyzLayout),
}

impl PointCloudFormat {
    /// Detects the format from the file extension, ignoring case.
    pub fn from_path<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let filepath = filepath.as_ref();
        let extension = filepath
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!("{} has no extension", filepath.display()))
            })?;

        match extension.as_str() {
            "ply" => Ok(PointCloudFormat::Ply),
            "pcd" => Ok(PointCloudFormat::Pcd),
            "off" => Ok(PointCloudFormat::Off),
            "xyz" | "pts" | "txt" => Ok(PointCloudFormat::Xyz(XyzLayout::Points)),
            "xyzn" => Ok(PointCloudFormat::Xyz(XyzLayout::PointsNormals)),
            "xyzrgb" => Ok(PointCloudFormat::Xyz(XyzLayout::PointsColors)),
            _ => Err(Error::UnsupportedFormat(format!(
                "`.{extension}` ({})",
                filepath.display()
            ))),
        }
    }
}

/// Opens a file for reading, reporting a missing path as [`Error::NotFound`].
pub(crate) fn open_file(filepath: &Path) -> Result<File> {
    File::open(filepath).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(filepath.to_path_buf()),
        _ => Error::Io(err),
    })
}

/// Loads a point cloud, picking the reader by file extension.
///
/// Fails with [`Error::NotFound`] when the path does not exist, before the
/// extension is looked at.
pub fn read_point_cloud<P: AsRef<Path>>(filepath: P) -> Result<PointCloud> {
    let filepath = filepath.as_ref();
    if !filepath.exists() {
        return Err(Error::NotFound(filepath.to_path_buf()));
    }

    let format = PointCloudFormat::from_path(filepath)?;
    debug!(path = %filepath.display(), ?format, "reading point cloud");

    let pcl = match format {
        PointCloudFormat::Ply => read_ply(filepath)?,
        PointCloudFormat::Pcd => read_pcd(filepath)?,
        PointCloudFormat::Off => read_off(filepath)?,
        PointCloudFormat::Xyz(layout) => read_xyz(filepath, layout)?,
    };
    pcl.validate()
        .map_err(|err| Error::format(filepath, err.to_string()))?;

    info!(
        path = %filepath.display(),
        points = pcl.len(),
        normals = pcl.normals.is_some(),
        colors = pcl.colors.is_some(),
        scalars = pcl.scalars.len(),
        "loaded point cloud"
    );
    Ok(pcl)
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::{read_point_cloud, PointCloudFormat, XyzLayout};
    use crate::error::Error;

    #[rstest]
    #[case("cloud.ply", PointCloudFormat::Ply)]
    #[case("scan.PCD", PointCloudFormat::Pcd)]
    #[case("teapot.off", PointCloudFormat::Off)]
    #[case("dir.with.dots/points.xyz", PointCloudFormat::Xyz(XyzLayout::Points))]
    #[case("points.pts", PointCloudFormat::Xyz(XyzLayout::Points))]
    #[case("points.xyzn", PointCloudFormat::Xyz(XyzLayout::PointsNormals))]
    #[case("points.xyzrgb", PointCloudFormat::Xyz(XyzLayout::PointsColors))]
    fn test_format_from_extension(#[case] path: &str, #[case] expected: PointCloudFormat) {
        assert_eq!(PointCloudFormat::from_path(path).unwrap(), expected);
    }

    #[rstest]
    #[case("mesh.obj")]
    #[case("no_extension")]
    fn test_unsupported_format(#[case] path: &str) {
        assert!(matches!(
            PointCloudFormat::from_path(path),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        assert!(matches!(
            read_point_cloud("tests/data/does-not-exist.ply"),
            Err(Error::NotFound(_))
        ));
    }

    #[rstest]
    #[case("tests/data/cube.ply")]
    #[case("tests/data/cube.pcd")]
    #[case("tests/data/cube.off")]
    #[case("tests/data/cube.xyz")]
    #[case("tests/data/cube.xyzrgb")]
    fn test_every_format_loads_the_cube(#[case] path: &str) {
        let pcl = read_point_cloud(path).unwrap();
        assert_eq!(pcl.len(), 8);
    }

    #[test]
    fn test_garbage_is_format_error() {
        assert!(matches!(
            read_point_cloud("tests/data/not_a_cloud.ply"),
            Err(Error::Format { .. })
        ));
    }
}
