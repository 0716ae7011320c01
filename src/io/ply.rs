use std::io::BufReader;
use std::path::Path;

use ndarray::{Array1, Array2};
use ply_rs::parser;
use ply_rs::ply::{DefaultElement, Property, PropertyType, ScalarType};
use tracing::{debug, warn};

use super::open_file;
use crate::error::{Error, Result};
use crate::pointcloud::{PointCloud, ScalarField, ScalarValues};

const POINT_KEYS: [&str; 3] = ["x", "y", "z"];
const NORMAL_KEYS: [&str; 3] = ["nx", "ny", "nz"];
const COLOR_KEYS: [&str; 3] = ["red", "green", "blue"];

fn scalar_as_f64(property: &Property) -> Option<f64> {
    match *property {
        Property::Char(v) => Some(v as f64),
        Property::UChar(v) => Some(v as f64),
        Property::Short(v) => Some(v as f64),
        Property::UShort(v) => Some(v as f64),
        Property::Int(v) => Some(v as f64),
        Property::UInt(v) => Some(v as f64),
        Property::Float(v) => Some(v as f64),
        Property::Double(v) => Some(v),
        _ => None,
    }
}

fn scalar_as_i64(property: &Property) -> Option<i64> {
    match *property {
        Property::Char(v) => Some(v as i64),
        Property::UChar(v) => Some(v as i64),
        Property::Short(v) => Some(v as i64),
        Property::UShort(v) => Some(v as i64),
        Property::Int(v) => Some(v as i64),
        Property::UInt(v) => Some(v as i64),
        _ => None,
    }
}

/// Walks the vertex payload and collects one property for every vertex.
fn collect_property<T, F>(
    filepath: &Path,
    vertices: &[DefaultElement],
    key: &str,
    convert: F,
) -> Result<Vec<T>>
where
    F: Fn(&Property) -> Option<T>,
{
    vertices
        .iter()
        .enumerate()
        .map(|(i, vertex)| {
            vertex.get(key).and_then(&convert).ok_or_else(|| {
                Error::format(filepath, format!("vertex {i}: invalid value for `{key}`"))
            })
        })
        .collect()
}

fn collect_triplet<T, F>(
    filepath: &Path,
    vertices: &[DefaultElement],
    keys: &[&str; 3],
    convert: F,
) -> Result<Array2<T>>
where
    T: Clone,
    F: Fn(&Property) -> Option<T>,
{
    let mut values = Vec::with_capacity(vertices.len() * 3);
    for (i, vertex) in vertices.iter().enumerate() {
        for key in keys {
            let value = vertex.get(*key).and_then(&convert).ok_or_else(|| {
                Error::format(filepath, format!("vertex {i}: invalid value for `{key}`"))
            })?;
            values.push(value);
        }
    }

    Array2::from_shape_vec((vertices.len(), 3), values)
        .map_err(|err| Error::format(filepath, err.to_string()))
}

/// Reads the `vertex` element of a PLY file (ascii or binary).
///
/// `x`, `y` and `z` are required. `nx`, `ny`, `nz` become normals and
/// `red`, `green`, `blue` become colors when all three are present, the
/// latter only when stored as `uchar`. Any other scalar property is kept as
/// a [`ScalarField`]. List properties and other elements (faces, edges)
/// are ignored.
pub fn read_ply<P>(filepath: P) -> Result<PointCloud>
where
    P: AsRef<Path>,
{
    let filepath = filepath.as_ref();
    let mut f = BufReader::new(open_file(filepath)?);

    let vertex_parser = parser::Parser::<DefaultElement>::new();
    let ply = vertex_parser
        .read_ply(&mut f)
        .map_err(|err| Error::format(filepath, err))?;

    for name in ply.header.elements.keys().filter(|name| *name != "vertex") {
        debug!(element = %name, "skipping PLY element");
    }

    let vertex_def = ply
        .header
        .elements
        .get("vertex")
        .ok_or_else(|| Error::format(filepath, "missing `vertex` element"))?;
    let vertices: &[DefaultElement] = ply
        .payload
        .get("vertex")
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let has_all = |keys: &[&str; 3]| keys.iter().all(|k| vertex_def.properties.contains_key(*k));
    let is_uchar = |key: &str| {
        matches!(
            vertex_def.properties.get(key).map(|def| &def.data_type),
            Some(PropertyType::Scalar(ScalarType::UChar))
        )
    };

    if !has_all(&POINT_KEYS) {
        return Err(Error::format(
            filepath,
            "vertex element must have `x`, `y` and `z` properties",
        ));
    }
    let points = collect_triplet(filepath, vertices, &POINT_KEYS, |p| {
        scalar_as_f64(p).map(|v| v as f32)
    })?;
    let mut pcl = PointCloud::from_points(points);

    let with_normals = has_all(&NORMAL_KEYS);
    if with_normals {
        pcl.normals = Some(collect_triplet(filepath, vertices, &NORMAL_KEYS, |p| {
            scalar_as_f64(p).map(|v| v as f32)
        })?);
    }

    let with_colors = has_all(&COLOR_KEYS) && COLOR_KEYS.iter().all(|k| is_uchar(*k));
    if with_colors {
        pcl.colors = Some(collect_triplet(
            filepath,
            vertices,
            &COLOR_KEYS,
            |p| match p {
                Property::UChar(v) => Some(*v),
                _ => None,
            },
        )?);
    }

    for (name, def) in vertex_def.properties.iter() {
        let name = name.as_str();
        if POINT_KEYS.contains(&name)
            || (with_normals && NORMAL_KEYS.contains(&name))
            || (with_colors && COLOR_KEYS.contains(&name))
        {
            continue;
        }

        let values = match &def.data_type {
            PropertyType::Scalar(ScalarType::Float) => {
                ScalarValues::Float(Array1::from(collect_property(
                    filepath,
                    vertices,
                    name,
                    |p| scalar_as_f64(p).map(|v| v as f32),
                )?))
            }
            PropertyType::Scalar(ScalarType::Double) => ScalarValues::Double(Array1::from(
                collect_property(filepath, vertices, name, scalar_as_f64)?,
            )),
            PropertyType::Scalar(_) => ScalarValues::Int(Array1::from(collect_property(
                filepath,
                vertices,
                name,
                scalar_as_i64,
            )?)),
            PropertyType::List(_, _) => {
                warn!(property = %name, "skipping PLY list property on vertices");
                continue;
            }
        };
        pcl.scalars.push(ScalarField::new(name, values));
    }

    Ok(pcl)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rstest::*;

    use super::read_ply;
    use crate::pointcloud::{PointCloud, ScalarValues};
    use crate::unit_test::sample_cube_pointcloud;

    #[test]
    fn test_read_cube_attributes() {
        let pcl = read_ply("tests/data/cube.ply").unwrap();
        assert_eq!(pcl.len(), 8);
        assert!(pcl.normals.is_some());
        assert_eq!(pcl.colors.as_ref().unwrap().row(1).to_vec(), vec![255, 0, 0]);
        assert_eq!(pcl.scalars.len(), 1);
        assert_eq!(pcl.scalars[0].name, "intensity");
        assert!(matches!(pcl.scalars[0].values, ScalarValues::Float(_)));
    }

    const HEADER_TAIL: &str = "element vertex 2\n\
        property float x\nproperty float y\nproperty float z\n\
        property uchar red\nproperty uchar green\nproperty uchar blue\n\
        property int label\nend_header\n";

    fn binary_body(big_endian: bool) -> Vec<u8> {
        let mut body = Vec::new();
        for (xyz, rgb, label) in [
            ([0.0f32, 0.5, 1.0], [255u8, 0, 0], 3i32),
            ([1.0f32, 2.0, 3.0], [0u8, 0, 255], -1i32),
        ] {
            for v in xyz {
                body.extend(if big_endian { v.to_be_bytes() } else { v.to_le_bytes() });
            }
            body.extend(rgb);
            body.extend(if big_endian { label.to_be_bytes() } else { label.to_le_bytes() });
        }
        body
    }

    #[rstest]
    #[case("ascii", b"0 0.5 1 255 0 0 3\n1 2 3 0 0 255 -1\n".to_vec())]
    #[case("binary_little_endian", binary_body(false))]
    #[case("binary_big_endian", binary_body(true))]
    fn test_read_all_encodings(#[case] format: &str, #[case] body: Vec<u8>) {
        let mut raw = format!("ply\nformat {format} 1.0\n{HEADER_TAIL}").into_bytes();
        raw.extend(body);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two-points.ply");
        std::fs::write(&path, raw).unwrap();

        let pcl = read_ply(&path).unwrap();
        assert_eq!(pcl.points, array![[0.0f32, 0.5, 1.0], [1.0, 2.0, 3.0]]);
        assert!(pcl.normals.is_none());
        assert_eq!(pcl.colors.unwrap(), array![[255u8, 0, 0], [0, 0, 255]]);
        assert_eq!(pcl.scalars.len(), 1);
        assert_eq!(pcl.scalars[0].name, "label");
        assert_eq!(pcl.scalars[0].values, ScalarValues::Int(array![3, -1]));
    }

    #[rstest]
    fn test_cube_matches_fixture(sample_cube_pointcloud: PointCloud) {
        let pcl = read_ply("tests/data/cube.ply").unwrap();
        assert_eq!(pcl.points, sample_cube_pointcloud.points);
        assert_eq!(pcl.colors, sample_cube_pointcloud.colors);
        let (normals, expected) = (pcl.normals.unwrap(), sample_cube_pointcloud.normals.unwrap());
        for (value, expected) in normals.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*value, *expected, epsilon = 1e-6);
        }
        assert_eq!(pcl.scalars, sample_cube_pointcloud.scalars);
    }

    #[test]
    fn test_float_colors_stay_scalar_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float-colors.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 1\n\
             property float x\nproperty float y\nproperty float z\n\
             property float red\nproperty float green\nproperty float blue\n\
             end_header\n0 0 0 0.5 0.25 1\n",
        )
        .unwrap();

        let pcl = read_ply(&path).unwrap();
        assert!(pcl.colors.is_none());
        let names: Vec<_> = pcl.scalars.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["red", "green", "blue"]);
        assert_eq!(pcl.points, array![[0.0f32, 0.0, 0.0]]);
    }

    #[test]
    fn test_missing_coordinates_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-z.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 1\n\
             property float x\nproperty float y\nend_header\n0 0\n",
        )
        .unwrap();

        assert!(read_ply(&path).is_err());
    }
}
