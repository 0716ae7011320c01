use nalgebra::Vector3;
use nalgebra_glm::Vec3;

use crate::bounds::Sphere3Df;

use super::{virtual_projection::PerspectiveVirtualProjectionBuilder, VirtualProjection};

// Vulkan's clip space points y down, so the world's +y ends up on top.
const VULKAN_UP: Vector3<f32> = Vector3::new(0.0, -1.0, 0.0);

/// Virtual camera to move around in the visualization.
pub struct VirtualCamera {
    /// Camera position point.
    pub eye: Vec3,
    /// Viewing vector. Always normalized.
    pub view: Vec3,
    /// Up vector. Always normalized.
    pub up: Vec3,
    /// Projection parameters.
    pub projection: VirtualProjection,
}

impl Default for VirtualCamera {
    fn default() -> VirtualCamera {
        Self {
            eye: Vec3::new(0.0, 0.0, -1.0),
            view: Vec3::new(0.0, 0.0, 1.0),
            up: VULKAN_UP,
            projection: VirtualProjection::default(),
        }
    }
}

impl VirtualCamera {
    pub fn right_vector(&self) -> Vec3 {
        self.view.cross(&self.up).normalize()
    }

    pub fn rotate_right_axis(&mut self, rad_angle: f32) {
        let right_vec = self.right_vector();
        self.view = nalgebra_glm::quat_rotate_vec3(
            &nalgebra_glm::quat_angle_axis(rad_angle, &right_vec),
            &self.view,
        )
        .normalize();
        self.up = right_vec.cross(&self.view).normalize();
    }

    pub fn rotate_up_axis(&mut self, rad_angle: f32) {
        self.view = nalgebra_glm::quat_rotate_vec3(
            &nalgebra_glm::quat_angle_axis(rad_angle, &self.up),
            &self.view,
        )
        .normalize();
    }

    pub fn translate_eye(&mut self, amount: f32) {
        self.eye += self.view * amount;
    }

    pub fn translate_right(&mut self, amount: f32) {
        self.eye += self.right_vector() * amount;
    }

    pub fn matrix(&self) -> nalgebra_glm::Mat4 {
        nalgebra_glm::look_at(&self.eye, &(self.eye + self.view), &self.up)
    }
}

/// Places a camera on a sphere around a target, looking at its center.
pub struct VirtualCameraSphericalBuilder {
    pub sphere: Sphere3Df,
    elevation: f32,
    azimuth: f32,
    distance: f32,
    fov_y: f32,
    aspect_ratio: f32,
    near_plane_distance: f32,
    far_plane_distance: f32,
}

impl Default for VirtualCameraSphericalBuilder {
    fn default() -> Self {
        Self {
            sphere: Sphere3Df {
                center: Vector3::zeros(),
                radius: 1.0,
            },
            elevation: 0.0,
            azimuth: 0.0,
            distance: 1.0,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect_ratio: 1.0,
            near_plane_distance: 0.1,
            far_plane_distance: 10.0,
        }
    }
}

impl VirtualCameraSphericalBuilder {
    /// Camera distance and clip planes so that `sphere` fills the vertical
    /// field of view `fov_y` (radians). Empty or zero radius spheres are
    /// treated as a unit sphere.
    pub fn fit(sphere: &Sphere3Df, fov_y: f32) -> Self {
        let sphere = if sphere.is_empty() || sphere.radius <= f32::EPSILON {
            Sphere3Df {
                center: if sphere.is_empty() {
                    Vector3::zeros()
                } else {
                    sphere.center
                },
                radius: 1.0,
            }
        } else {
            *sphere
        };

        let distance = sphere.radius / (fov_y / 2.0).sin();

        Self {
            sphere,
            distance,
            fov_y,
            near_plane_distance: (distance - sphere.radius).max(sphere.radius * 0.01),
            far_plane_distance: distance + sphere.radius * 10.0,
            ..Default::default()
        }
    }

    pub fn elevation(mut self, value: f32) -> Self {
        self.elevation = value;
        self
    }

    pub fn azimuth(mut self, value: f32) -> Self {
        self.azimuth = value;
        self
    }

    pub fn aspect_ratio(mut self, value: f32) -> Self {
        self.aspect_ratio = value;
        self
    }

    pub fn build(self) -> VirtualCamera {
        let theta = self.elevation;
        let phi = self.azimuth + std::f32::consts::PI * 1.5;

        let position = Vec3::new(
            phi.cos() * self.distance * theta.cos(),
            theta.sin() * self.distance,
            phi.sin() * self.distance * theta.cos(),
        ) + self.sphere.center;

        let view = (self.sphere.center - position).normalize();
        let right = view.cross(&VULKAN_UP).normalize();
        let up = right.cross(&view).normalize();

        VirtualCamera {
            eye: position,
            view,
            up,
            projection: PerspectiveVirtualProjectionBuilder {
                fov_y: self.fov_y,
                aspect_ratio: self.aspect_ratio,
                near_plane: self.near_plane_distance,
                far_plane: self.far_plane_distance,
            }
            .build(),
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;
    use nalgebra_glm::Vec4;

    use crate::bounds::Sphere3Df;

    use super::VirtualCameraSphericalBuilder;

    #[test]
    pub fn test_should_fit_view_bounds() {
        let sphere = Sphere3Df {
            center: Vector3::new(2.0, 3.0, 4.0),
            radius: 3.4,
        };
        let camera = VirtualCameraSphericalBuilder::fit(&sphere, std::f32::consts::FRAC_PI_2)
            .azimuth(0.3)
            .elevation(0.2)
            .build();

        assert_abs_diff_eq!((camera.eye - sphere.center).norm(), 3.4 * 2f32.sqrt(), epsilon = 1e-4);

        let center = Vec4::new(2.0, 3.0, 4.0, 1.0);
        let clip = camera.projection.matrix() * camera.matrix() * center;
        let ndc = clip / clip[3];
        assert_abs_diff_eq!(ndc[0], 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(ndc[1], 0.0, epsilon = 1e-4);
        assert!(ndc[2] > 0.0 && ndc[2] < 1.0);
    }

    #[test]
    pub fn test_world_up_is_screen_top() {
        let camera = VirtualCameraSphericalBuilder::fit(&Sphere3Df::empty(), 1.0).build();
        let clip = camera.projection.matrix() * camera.matrix() * Vec4::new(0.0, 0.5, 0.0, 1.0);
        // Vulkan's y axis points down.
        assert!(clip[1] / clip[3] < 0.0);
    }
}
