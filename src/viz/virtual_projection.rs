use nalgebra_glm::Mat4;

/// Perspective frustum. The matrix maps view space depth `[-near, -far]`
/// to Vulkan's `[0, 1]` depth range.
#[derive(Clone, Copy, Debug)]
pub struct VirtualProjection {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
}

impl VirtualProjection {
    pub fn new(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        VirtualProjection {
            left,
            right,
            top,
            bottom,
            near,
            far,
        }
    }

    /// Widens or narrows the horizontal extent to match a viewport's
    /// width/height ratio, keeping the vertical field of view.
    pub fn with_aspect_ratio(&self, aspect_ratio: f32) -> Self {
        let half_height = (self.top - self.bottom) * 0.5;
        let half_width = half_height * aspect_ratio;
        Self::new(
            -half_width,
            half_width,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }

    pub fn matrix(&self) -> Mat4 {
        let mut matrix = Mat4::zeros();

        matrix[(0, 0)] = 2.0 * self.near / (self.right - self.left);
        matrix[(0, 2)] = (self.right + self.left) / (self.right - self.left);

        matrix[(1, 1)] = 2.0 * self.near / (self.top - self.bottom);
        matrix[(1, 2)] = (self.top + self.bottom) / (self.top - self.bottom);

        matrix[(2, 2)] = self.far / (self.near - self.far);
        matrix[(2, 3)] = (self.near * self.far) / (self.near - self.far);

        matrix[(3, 2)] = -1.0;

        matrix
    }
}

impl Default for VirtualProjection {
    fn default() -> VirtualProjection {
        VirtualProjection::new(-1.0, 1.0, -1.0, 1.0, 1.0, 100.0)
    }
}

pub struct PerspectiveVirtualProjectionBuilder {
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl PerspectiveVirtualProjectionBuilder {
    pub fn build(self) -> VirtualProjection {
        let top = (self.fov_y / 2.0).tan() * self.near_plane;
        let right = top * self.aspect_ratio;

        VirtualProjection::new(-right, right, -top, top, self.near_plane, self.far_plane)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use nalgebra_glm::Vec4;

    use super::{PerspectiveVirtualProjectionBuilder, VirtualProjection};

    fn ndc(projection: &VirtualProjection, point: Vec4) -> Vec4 {
        let clip = projection.matrix() * point;
        clip / clip[3]
    }

    #[test]
    fn test_depth_range_is_zero_to_one() {
        let projection = PerspectiveVirtualProjectionBuilder {
            fov_y: std::f32::consts::FRAC_PI_2,
            aspect_ratio: 1.0,
            near_plane: 0.5,
            far_plane: 20.0,
        }
        .build();

        assert_abs_diff_eq!(ndc(&projection, Vec4::new(0.0, 0.0, -0.5, 1.0))[2], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(ndc(&projection, Vec4::new(0.0, 0.0, -20.0, 1.0))[2], 1.0, epsilon = 1e-5);

        // 90 degrees fov: the frustum's top edge at depth 2 is y = 2.
        assert_abs_diff_eq!(ndc(&projection, Vec4::new(0.0, 2.0, -2.0, 1.0))[1], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_aspect_ratio_keeps_vertical_extent() {
        let projection = VirtualProjection::default().with_aspect_ratio(2.0);
        assert_abs_diff_eq!(projection.right, 2.0);
        assert_abs_diff_eq!(projection.left, -2.0);
        assert_abs_diff_eq!(projection.top, 1.0);
    }
}
