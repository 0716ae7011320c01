use std::sync::Arc;

use nalgebra_glm::Mat4;
use ndarray::Axis;
use vulkano::{
    buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer},
    command_buffer::{AutoCommandBufferBuilder, PrimaryAutoCommandBuffer},
    device::Device,
    memory::allocator::{AllocationCreateInfo, MemoryAllocator, MemoryUsage},
    pipeline::{
        graphics::{
            depth_stencil::DepthStencilState,
            input_assembly::{InputAssemblyState, PrimitiveTopology},
            vertex_input::Vertex,
            viewport::ViewportState,
        },
        GraphicsPipeline, Pipeline,
    },
    render_pass::{RenderPass, Subpass},
};

use crate::{
    error::{Error, Result},
    pointcloud::PointCloud,
};

#[derive(BufferContents, Vertex, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct PointVertex {
    #[format(R32G32B32_SFLOAT)]
    pub position: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub color: [f32; 3],
}

/// Blue to green to red ramp over `t` in [0, 1].
pub fn height_color(t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        (2.0 * t - 1.0).max(0.0),
        1.0 - (2.0 * t - 1.0).abs(),
        (1.0 - 2.0 * t).max(0.0),
    ]
}

/// One vertex per point. Points without colors are colored by their
/// height (y coordinate) relative to the cloud's extent.
pub fn point_vertices(pcl: &PointCloud) -> Vec<PointVertex> {
    let positions = pcl.points.axis_iter(Axis(0)).map(|p| [p[0], p[1], p[2]]);

    match &pcl.colors {
        Some(colors) => positions
            .zip(colors.axis_iter(Axis(0)))
            .map(|(position, color)| PointVertex {
                position,
                color: [
                    color[0] as f32 / 255.0,
                    color[1] as f32 / 255.0,
                    color[2] as f32 / 255.0,
                ],
            })
            .collect(),
        None => {
            let heights = pcl.points.column(1);
            let min = heights.fold(f32::INFINITY, |acc, v| acc.min(*v));
            let max = heights.fold(f32::NEG_INFINITY, |acc, v| acc.max(*v));
            let extent = max - min;

            positions
                .map(|position| {
                    let t = if extent > 0.0 {
                        (position[1] - min) / extent
                    } else {
                        0.5
                    };
                    PointVertex {
                        position,
                        color: height_color(t),
                    }
                })
                .collect()
        }
    }
}

mod vs {
    vulkano_shaders::shader! {
        ty: "vertex",
        src: r"
            #version 450

            layout(location = 0) in vec3 position;
            layout(location = 1) in vec3 color;

            layout(location = 0) out vec3 v_color;

            layout(push_constant) uniform PushConstants {
                mat4 mvp;
            } pc;

            void main() {
                gl_Position = pc.mvp * vec4(position, 1.0);
                gl_PointSize = 1.0;
                v_color = color;
            }
        ",
    }
}

mod fs {
    vulkano_shaders::shader! {
        ty: "fragment",
        src: r"
            #version 450

            layout(location = 0) in vec3 v_color;
            layout(location = 0) out vec4 f_color;

            void main() {
                f_color = vec4(v_color, 1.0);
            }
        ",
    }
}

/// Point cloud uploaded into a vertex buffer.
pub struct VkPointCloud {
    pub vertices: Subbuffer<[PointVertex]>,
    number_of_points: usize,
}

impl VkPointCloud {
    pub fn from_pointcloud(
        memory_allocator: &(impl MemoryAllocator + ?Sized),
        pointcloud: &PointCloud,
    ) -> Result<Arc<Self>> {
        let vertices = point_vertices(pointcloud);
        let number_of_points = vertices.len();

        let vertices = Buffer::from_iter(
            memory_allocator,
            BufferCreateInfo {
                usage: BufferUsage::VERTEX_BUFFER,
                ..Default::default()
            },
            AllocationCreateInfo {
                usage: MemoryUsage::Upload,
                ..Default::default()
            },
            vertices,
        )
        .map_err(Error::viewer)?;

        Ok(Arc::new(Self {
            vertices,
            number_of_points,
        }))
    }

    pub fn len(&self) -> usize {
        self.number_of_points
    }

    pub fn is_empty(&self) -> bool {
        self.number_of_points == 0
    }

    /// Point list pipeline for the first subpass of `render_pass`. The
    /// viewport is dynamic, so it survives window resizes.
    pub fn pipeline(
        device: Arc<Device>,
        render_pass: Arc<RenderPass>,
    ) -> Result<Arc<GraphicsPipeline>> {
        let vs = vs::load(device.clone()).map_err(Error::viewer)?;
        let fs = fs::load(device.clone()).map_err(Error::viewer)?;
        let subpass =
            Subpass::from(render_pass, 0).ok_or_else(|| Error::viewer("render pass has no subpass"))?;

        GraphicsPipeline::start()
            .render_pass(subpass)
            .vertex_input_state(PointVertex::per_vertex())
            .input_assembly_state(InputAssemblyState::new().topology(PrimitiveTopology::PointList))
            .vertex_shader(
                vs.entry_point("main")
                    .ok_or_else(|| Error::viewer("vertex shader has no main"))?,
                (),
            )
            .viewport_state(ViewportState::viewport_dynamic_scissor_irrelevant())
            .fragment_shader(
                fs.entry_point("main")
                    .ok_or_else(|| Error::viewer("fragment shader has no main"))?,
                (),
            )
            .depth_stencil_state(DepthStencilState::simple_depth_test())
            .build(device)
            .map_err(Error::viewer)
    }

    /// Records the draw into a builder that is inside a render pass.
    pub fn draw(
        &self,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        pipeline: Arc<GraphicsPipeline>,
        mvp: &Mat4,
    ) -> Result<()> {
        builder
            .bind_pipeline_graphics(pipeline.clone())
            .push_constants(
                pipeline.layout().clone(),
                0,
                vs::PushConstants { mvp: (*mvp).into() },
            )
            .bind_vertex_buffers(0, self.vertices.clone())
            .draw(self.number_of_points as u32, 1, 0, 0)
            .map_err(Error::viewer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rstest::*;

    use super::{height_color, point_vertices};
    use crate::pointcloud::PointCloud;
    use crate::unit_test::sample_cube_pointcloud;

    #[rstest]
    #[case(0.0, [0.0, 0.0, 1.0])]
    #[case(0.5, [0.0, 1.0, 0.0])]
    #[case(1.0, [1.0, 0.0, 0.0])]
    #[case(7.0, [1.0, 0.0, 0.0])]
    fn test_height_color(#[case] t: f32, #[case] expected: [f32; 3]) {
        let color = height_color(t);
        for (value, expected) in color.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*value, *expected);
        }
    }

    #[rstest]
    fn test_vertices_keep_point_colors(sample_cube_pointcloud: PointCloud) {
        let vertices = point_vertices(&sample_cube_pointcloud);
        assert_eq!(vertices.len(), 8);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[1].color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_uncolored_points_use_height() {
        let pcl = PointCloud::from_points(array![[0.0f32, 0.0, 0.0], [0.0, 2.0, 0.0]]);
        let vertices = point_vertices(&pcl);
        assert_eq!(vertices[0].color, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[1].color, [1.0, 0.0, 0.0]);

        let flat = PointCloud::from_points(array![[0.0f32, 1.0, 0.0], [3.0, 1.0, 0.0]]);
        assert_eq!(point_vertices(&flat)[0].color, [0.0, 1.0, 0.0]);
    }
}
