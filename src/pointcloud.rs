use ndarray::prelude::*;

use crate::bounds::Sphere3Df;
use crate::error::{Error, Result};

/// Values of one extra per-point field, kept in the type the file declared.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValues {
    Float(Array1<f32>),
    Double(Array1<f64>),
    Int(Array1<i64>),
}

impl ScalarValues {
    pub fn len(&self) -> usize {
        match self {
            ScalarValues::Float(values) => values.len(),
            ScalarValues::Double(values) => values.len(),
            ScalarValues::Int(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named per-point field that is not a coordinate, normal or color, like
/// `intensity` or `label`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub name: String,
    pub values: ScalarValues,
}

impl ScalarField {
    pub fn new<S: Into<String>>(name: S, values: ScalarValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PointCloud {
    /// The 3D points. Shape is (Nx3).
    pub points: Array2<f32>,
    /// Per point normals. Shape is (Nx3).
    pub normals: Option<Array2<f32>>,
    /// The RGB colors. Shape is (Nx3).
    pub colors: Option<Array2<u8>>,
    /// Remaining per point fields, in file order.
    pub scalars: Vec<ScalarField>,
}

impl PointCloud {
    pub fn from_points(points: Array2<f32>) -> Self {
        Self {
            points,
            normals: None,
            colors: None,
            scalars: Vec::new(),
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self::from_points(Array2::<f32>::zeros((len, 3)))
    }

    pub fn with_normals(mut self, normals: Array2<f32>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_colors(mut self, colors: Array2<u8>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_scalar(mut self, field: ScalarField) -> Self {
        self.scalars.push(field);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Checks that every attribute has one entry per point.
    pub fn validate(&self) -> Result<()> {
        let len = self.len();
        if self.points.ncols() != 3 {
            return Err(Error::invalid_parameter(format!(
                "points must have 3 columns, got {}",
                self.points.ncols()
            )));
        }
        if let Some(normals) = &self.normals {
            if normals.dim() != (len, 3) {
                return Err(Error::invalid_parameter(format!(
                    "normals shape {:?} does not match {len} points",
                    normals.dim()
                )));
            }
        }
        if let Some(colors) = &self.colors {
            if colors.dim() != (len, 3) {
                return Err(Error::invalid_parameter(format!(
                    "colors shape {:?} does not match {len} points",
                    colors.dim()
                )));
            }
        }
        for field in self.scalars.iter() {
            if field.values.len() != len {
                return Err(Error::invalid_parameter(format!(
                    "field `{}` has {} values for {len} points",
                    field.name,
                    field.values.len()
                )));
            }
        }
        Ok(())
    }

    pub fn bounding_sphere(&self) -> Sphere3Df {
        Sphere3Df::from_points(&self.points.view())
    }
}

#[cfg(test)]
mod tests {
    use super::{PointCloud, ScalarField, ScalarValues};
    use crate::unit_test::sample_cube_pointcloud;
    use ndarray::{array, Array1, Array2};
    use rstest::*;

    #[rstest]
    fn test_cube_is_consistent(sample_cube_pointcloud: PointCloud) {
        assert_eq!(sample_cube_pointcloud.len(), 8);
        assert!(sample_cube_pointcloud.validate().is_ok());
    }

    #[test]
    fn test_empty_cloud() {
        let pcl = PointCloud::zeros(0);
        assert!(pcl.is_empty());
        assert!(pcl.bounding_sphere().is_empty());
    }

    #[test]
    fn test_validate_rejects_short_attributes() {
        let pcl = PointCloud::from_points(array![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]])
            .with_colors(Array2::<u8>::zeros((1, 3)));
        assert!(pcl.validate().is_err());

        let pcl = PointCloud::zeros(2).with_scalar(ScalarField::new(
            "intensity",
            ScalarValues::Float(Array1::zeros(3)),
        ));
        assert!(pcl.validate().is_err());
    }
}
