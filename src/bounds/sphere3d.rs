use nalgebra::Vector3;
use ndarray::{ArrayView2, Axis};

/// Bounding sphere. An empty sphere has a negative radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere3Df {
    pub center: Vector3<f32>,
    pub radius: f32,
}

impl Sphere3Df {
    pub fn empty() -> Self {
        Self {
            center: Vector3::zeros(),
            radius: -1.0,
        }
    }

    /// Sphere centered at the points' centroid that encloses all of them.
    ///
    /// # Arguments
    ///
    /// * `points`: Array with shape (Nx3).
    pub fn from_points(points: &ArrayView2<f32>) -> Self {
        if points.is_empty() {
            return Self::empty();
        }

        let center: Vector3<f32> = nalgebra::convert(
            points
                .axis_iter(Axis(0))
                .fold(Vector3::<f64>::zeros(), |accum, point| {
                    accum + Vector3::new(point[0] as f64, point[1] as f64, point[2] as f64)
                })
                / points.nrows() as f64,
        );

        let radius = points
            .axis_iter(Axis(0))
            .map(|point| {
                let sub = Vector3::new(point[0], point[1], point[2]) - center;
                sub.dot(&sub)
            })
            .fold(0.0f32, f32::max)
            .sqrt();

        Self { center, radius }
    }

    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;
    use ndarray::array;

    use super::Sphere3Df;

    #[test]
    fn test_from_points() {
        let points = array![[-1.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, -2.0, 0.0]];
        let sphere = Sphere3Df::from_points(&points.view());

        assert_abs_diff_eq!(sphere.center, Vector3::zeros(), epsilon = 1e-6);
        assert_abs_diff_eq!(sphere.radius, 2.0, epsilon = 1e-6);
    }
}
