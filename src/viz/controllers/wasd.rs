use nalgebra_glm::{Mat4, Vec2};
use winit::event::{MouseButton, VirtualKeyCode};

use crate::viz::{virtual_camera::VirtualCameraSphericalBuilder, VirtualCamera};

use super::{FrameStepInfo, SceneState};

pub trait VirtualCameraControl {
    fn key_event(&mut self, frame_info: &FrameStepInfo, scene_state: &SceneState);
    fn cursor_moved(&mut self, x: f64, y: f64, frame_info: &FrameStepInfo, scene_state: &SceneState);
    fn mouse_wheel(&mut self, lines: f32, scene_state: &SceneState);
    fn view_matrix(&self) -> Mat4;
    fn projection_matrix(&self, frame_info: &FrameStepInfo) -> Mat4;
}

/// First person camera: WASD moves, left drag looks around, the wheel
/// moves along the view direction. Speeds scale with the scene radius.
pub struct WASDVirtualCameraControl {
    pub camera: VirtualCamera,
    /// Scene radii per second.
    pub velocity: f32,
    /// Radians per viewport width dragged.
    pub rotation_sensitivity: Vec2,
    /// Scene radii per wheel line.
    pub wheel_step: f32,
    cursor_last_position: Option<Vec2>,
}

impl WASDVirtualCameraControl {
    pub fn fit_sphere_in_frustum(camera_builder: VirtualCameraSphericalBuilder, velocity: f32) -> Self {
        Self {
            camera: camera_builder.build(),
            velocity,
            ..Default::default()
        }
    }
}

impl Default for WASDVirtualCameraControl {
    fn default() -> Self {
        Self {
            camera: VirtualCamera::default(),
            velocity: 0.5,
            rotation_sensitivity: Vec2::new(std::f32::consts::PI, std::f32::consts::PI),
            wheel_step: 0.1,
            cursor_last_position: None,
        }
    }
}

impl VirtualCameraControl for WASDVirtualCameraControl {
    fn key_event(&mut self, frame_info: &FrameStepInfo, scene_state: &SceneState) {
        let move_increment = self.velocity
            * scene_state.world_bounds.radius.max(f32::EPSILON)
            * frame_info.elapsed_time.as_secs_f32();

        if frame_info.is_key_pressed(VirtualKeyCode::W) {
            self.camera.translate_eye(move_increment);
        }
        if frame_info.is_key_pressed(VirtualKeyCode::S) {
            self.camera.translate_eye(-move_increment);
        }
        if frame_info.is_key_pressed(VirtualKeyCode::A) {
            self.camera.translate_right(-move_increment);
        }
        if frame_info.is_key_pressed(VirtualKeyCode::D) {
            self.camera.translate_right(move_increment);
        }
    }

    fn cursor_moved(&mut self, x: f64, y: f64, frame_info: &FrameStepInfo, _: &SceneState) {
        let current_position = Vec2::new(x as f32, y as f32);
        let last_position = self.cursor_last_position.replace(current_position);

        if let (Some(last_position), true) =
            (last_position, frame_info.is_mouse_pressed(MouseButton::Left))
        {
            let width = frame_info.viewport_size[0].max(1.0);
            let difference = last_position - current_position;
            self.camera
                .rotate_up_axis(difference[0] / width * self.rotation_sensitivity[0]);
            self.camera
                .rotate_right_axis(difference[1] / width * self.rotation_sensitivity[1]);
        }
    }

    fn mouse_wheel(&mut self, lines: f32, scene_state: &SceneState) {
        self.camera
            .translate_eye(lines * self.wheel_step * scene_state.world_bounds.radius.max(f32::EPSILON));
    }

    fn view_matrix(&self) -> Mat4 {
        self.camera.matrix()
    }

    fn projection_matrix(&self, frame_info: &FrameStepInfo) -> Mat4 {
        self.camera
            .projection
            .with_aspect_ratio(frame_info.aspect_ratio())
            .matrix()
    }
}
