use std::{sync::Arc, time::Instant};

use vulkano::{
    command_buffer::{
        allocator::StandardCommandBufferAllocator, AutoCommandBufferBuilder, CommandBufferUsage,
        PrimaryAutoCommandBuffer, RenderPassBeginInfo, SubpassContents,
    },
    device::{Device, Queue},
    format::Format,
    image::{view::ImageView, AttachmentImage, ImageAccess, ImageUsage, SwapchainImage},
    memory::allocator::StandardMemoryAllocator,
    pipeline::{graphics::viewport::Viewport, GraphicsPipeline},
    render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass},
    swapchain::{
        acquire_next_image, AcquireError, Surface, Swapchain, SwapchainCreateInfo,
        SwapchainCreationError, SwapchainPresentInfo,
    },
    sync::{self, FlushError, GpuFuture},
};
use vulkano_win::VkSurfaceBuild;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, MouseScrollDelta, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::run_return::EventLoopExtRunReturn,
    window::{Window as WWindow, WindowBuilder},
};

use super::{
    controllers::{FrameStepInfo, SceneState, VirtualCameraControl, WASDVirtualCameraControl},
    manager::Manager,
    virtual_camera::VirtualCameraSphericalBuilder,
    vkpointcloud::VkPointCloud,
};
use crate::{
    bounds::Sphere3Df,
    error::{Error, Result},
};

/// Window showing a single point cloud. [`Window::show`] blocks until the
/// window is closed, by the window manager or with Escape.
pub struct Window {
    surface: Arc<Surface>,
    event_loop: Option<EventLoop<()>>,
    device: Arc<Device>,
    queue: Arc<Queue>,
    memory_allocator: StandardMemoryAllocator,
    command_buffer_allocator: StandardCommandBufferAllocator,
    pointcloud: Arc<VkPointCloud>,
    bounds: Sphere3Df,
}

fn window_size_dependent_setup(
    memory_allocator: &StandardMemoryAllocator,
    images: &[Arc<SwapchainImage>],
    render_pass: Arc<RenderPass>,
    viewport: &mut Viewport,
) -> Result<Vec<Arc<Framebuffer>>> {
    let dimensions = images
        .first()
        .ok_or_else(|| Error::viewer("swapchain has no images"))?
        .dimensions()
        .width_height();
    viewport.dimensions = [dimensions[0] as f32, dimensions[1] as f32];

    let depth_buffer = ImageView::new_default(
        AttachmentImage::transient(memory_allocator, dimensions, Format::D16_UNORM)
            .map_err(Error::viewer)?,
    )
    .map_err(Error::viewer)?;

    images
        .iter()
        .map(|image| {
            let view = ImageView::new_default(image.clone()).map_err(Error::viewer)?;
            Framebuffer::new(
                render_pass.clone(),
                FramebufferCreateInfo {
                    attachments: vec![view, depth_buffer.clone()],
                    ..Default::default()
                },
            )
            .map_err(Error::viewer)
        })
        .collect()
}

impl Window {
    pub fn create(
        manager: &Manager,
        pointcloud: Arc<VkPointCloud>,
        bounds: Sphere3Df,
    ) -> Result<Self> {
        let event_loop = EventLoop::new();
        let surface = WindowBuilder::new()
            .with_title("pcdtools")
            .with_inner_size(PhysicalSize::new(1024, 768))
            .build_vk_surface(&event_loop, manager.instance.clone())
            .map_err(Error::viewer)?;

        let supported = manager
            .physical_device
            .surface_support(manager.queue.queue_family_index(), &surface)
            .map_err(Error::viewer)?;
        if !supported {
            return Err(Error::viewer("the graphics queue cannot present to the window"));
        }

        Ok(Self {
            surface,
            event_loop: Some(event_loop),
            device: manager.device.clone(),
            queue: manager.queue.clone(),
            memory_allocator: StandardMemoryAllocator::new_default(manager.device.clone()),
            command_buffer_allocator: StandardCommandBufferAllocator::new(
                manager.device.clone(),
                Default::default(),
            ),
            pointcloud,
            bounds,
        })
    }

    fn inner_size(&self) -> Result<PhysicalSize<u32>> {
        self.surface
            .object()
            .and_then(|object| object.downcast_ref::<WWindow>())
            .map(|window| window.inner_size())
            .ok_or_else(|| Error::viewer("surface is not backed by a window"))
    }

    fn command_buffer(
        &self,
        framebuffer: Arc<Framebuffer>,
        viewport: &Viewport,
        pipeline: Arc<GraphicsPipeline>,
        camera_control: &WASDVirtualCameraControl,
        frame_info: &FrameStepInfo,
    ) -> Result<PrimaryAutoCommandBuffer> {
        let mut builder = AutoCommandBufferBuilder::primary(
            &self.command_buffer_allocator,
            self.queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )
        .map_err(Error::viewer)?;

        builder
            .begin_render_pass(
                RenderPassBeginInfo {
                    clear_values: vec![Some([0.1, 0.1, 0.12, 1.0].into()), Some(1f32.into())],
                    ..RenderPassBeginInfo::framebuffer(framebuffer)
                },
                SubpassContents::Inline,
            )
            .map_err(Error::viewer)?
            .set_viewport(0, [viewport.clone()]);

        let mvp = camera_control.projection_matrix(frame_info) * camera_control.view_matrix();
        self.pointcloud.draw(&mut builder, pipeline, &mvp)?;

        builder.end_render_pass().map_err(Error::viewer)?;
        builder.build().map_err(Error::viewer)
    }

    /// Runs the event loop until the window is closed. Mouse drag rotates
    /// the view; WASD and the wheel move the camera.
    pub fn show(&mut self) -> Result<()> {
        let dimensions = self.inner_size()?;

        let (mut swapchain, images) = {
            let physical_device = self.device.physical_device();
            let surface_capabilities = physical_device
                .surface_capabilities(&self.surface, Default::default())
                .map_err(Error::viewer)?;
            let image_format = physical_device
                .surface_formats(&self.surface, Default::default())
                .map_err(Error::viewer)?
                .first()
                .map(|(format, _)| *format);
            let composite_alpha = surface_capabilities
                .supported_composite_alpha
                .into_iter()
                .next()
                .ok_or_else(|| Error::viewer("surface has no composite alpha mode"))?;

            Swapchain::new(
                self.device.clone(),
                self.surface.clone(),
                SwapchainCreateInfo {
                    min_image_count: surface_capabilities.min_image_count,
                    image_format,
                    image_extent: dimensions.into(),
                    image_usage: ImageUsage::COLOR_ATTACHMENT,
                    composite_alpha,
                    ..Default::default()
                },
            )
            .map_err(Error::viewer)?
        };

        let render_pass = vulkano::single_pass_renderpass!(
            self.device.clone(),
            attachments: {
                color: {
                    load: Clear,
                    store: Store,
                    format: swapchain.image_format(),
                    samples: 1,
                },
                depth: {
                    load: Clear,
                    store: DontCare,
                    format: Format::D16_UNORM,
                    samples: 1,
                }
            },
            pass: {
                color: [color],
                depth_stencil: {depth}
            }
        )
        .map_err(Error::viewer)?;
        let pipeline = VkPointCloud::pipeline(self.device.clone(), render_pass.clone())?;

        let mut viewport = Viewport {
            origin: [0.0, 0.0],
            dimensions: [dimensions.width as f32, dimensions.height as f32],
            depth_range: 0.0..1.0,
        };
        let mut framebuffers = window_size_dependent_setup(
            &self.memory_allocator,
            &images,
            render_pass.clone(),
            &mut viewport,
        )?;

        let mut camera_control = WASDVirtualCameraControl::fit_sphere_in_frustum(
            VirtualCameraSphericalBuilder::fit(&self.bounds, std::f32::consts::FRAC_PI_3)
                .elevation(0.3)
                .azimuth(0.5),
            0.5,
        );
        let mut frame_info = FrameStepInfo::new([dimensions.width as f32, dimensions.height as f32]);
        let scene_state = SceneState {
            world_bounds: self.bounds,
        };

        let mut recreate_swapchain = false;
        let mut previous_frame_end = Some(sync::now(self.device.clone()).boxed());
        let mut failure: Option<Error> = None;
        let mut instant = Instant::now();

        let mut event_loop = self
            .event_loop
            .take()
            .ok_or_else(|| Error::viewer("the window was already shown"))?;

        event_loop.run_return(|event, _, control_flow| {
            frame_info.elapsed_time = instant.elapsed();
            match event {
                Event::WindowEvent {
                    event: WindowEvent::CloseRequested,
                    ..
                } => {
                    *control_flow = ControlFlow::Exit;
                }
                Event::WindowEvent {
                    event: WindowEvent::Resized(_),
                    ..
                } => {
                    recreate_swapchain = true;
                }
                Event::WindowEvent {
                    event: WindowEvent::MouseInput { state, button, .. },
                    ..
                } => {
                    frame_info.mouse_state.insert(button, state);
                }
                Event::WindowEvent {
                    event: WindowEvent::CursorMoved { position, .. },
                    ..
                } => {
                    camera_control.cursor_moved(position.x, position.y, &frame_info, &scene_state);
                }
                Event::WindowEvent {
                    event: WindowEvent::MouseWheel { delta, .. },
                    ..
                } => {
                    let lines = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(position) => position.y as f32 / 40.0,
                    };
                    camera_control.mouse_wheel(lines, &scene_state);
                }
                Event::WindowEvent {
                    event: WindowEvent::KeyboardInput { input, .. },
                    ..
                } => {
                    if let Some(keycode) = input.virtual_keycode {
                        if keycode == VirtualKeyCode::Escape && input.state == ElementState::Pressed
                        {
                            *control_flow = ControlFlow::Exit;
                            return;
                        }
                        frame_info.keyboard_state.insert(keycode, input.state);
                    }
                    camera_control.key_event(&frame_info, &scene_state);
                }
                Event::RedrawEventsCleared => {
                    let dimensions = match self.inner_size() {
                        Ok(dimensions) => dimensions,
                        Err(err) => {
                            failure = Some(err);
                            *control_flow = ControlFlow::Exit;
                            return;
                        }
                    };
                    // Minimized windows have a zero sized surface.
                    if dimensions.width == 0 || dimensions.height == 0 {
                        return;
                    }
                    frame_info.viewport_size = [dimensions.width as f32, dimensions.height as f32];

                    if let Some(previous) = previous_frame_end.as_mut() {
                        previous.cleanup_finished();
                    }

                    if recreate_swapchain {
                        let new_images = match swapchain.recreate(SwapchainCreateInfo {
                            image_extent: dimensions.into(),
                            ..swapchain.create_info()
                        }) {
                            Ok((new_swapchain, new_images)) => {
                                swapchain = new_swapchain;
                                new_images
                            }
                            // Happens while the user is resizing, retry on the next frame.
                            Err(SwapchainCreationError::ImageExtentNotSupported { .. }) => return,
                            Err(err) => {
                                failure = Some(Error::viewer(err));
                                *control_flow = ControlFlow::Exit;
                                return;
                            }
                        };

                        match window_size_dependent_setup(
                            &self.memory_allocator,
                            &new_images,
                            render_pass.clone(),
                            &mut viewport,
                        ) {
                            Ok(new_framebuffers) => framebuffers = new_framebuffers,
                            Err(err) => {
                                failure = Some(err);
                                *control_flow = ControlFlow::Exit;
                                return;
                            }
                        }
                        recreate_swapchain = false;
                    }

                    let (image_index, suboptimal, acquire_future) =
                        match acquire_next_image(swapchain.clone(), None) {
                            Ok(r) => r,
                            Err(AcquireError::OutOfDate) => {
                                recreate_swapchain = true;
                                return;
                            }
                            Err(err) => {
                                failure = Some(Error::viewer(err));
                                *control_flow = ControlFlow::Exit;
                                return;
                            }
                        };
                    if suboptimal {
                        recreate_swapchain = true;
                    }

                    let command_buffer = match self.command_buffer(
                        framebuffers[image_index as usize].clone(),
                        &viewport,
                        pipeline.clone(),
                        &camera_control,
                        &frame_info,
                    ) {
                        Ok(command_buffer) => command_buffer,
                        Err(err) => {
                            failure = Some(err);
                            *control_flow = ControlFlow::Exit;
                            return;
                        }
                    };

                    let future = previous_frame_end
                        .take()
                        .unwrap_or_else(|| sync::now(self.device.clone()).boxed())
                        .join(acquire_future)
                        .then_execute(self.queue.clone(), command_buffer)
                        .map_err(Error::viewer)
                        .map(|future| {
                            future
                                .then_swapchain_present(
                                    self.queue.clone(),
                                    SwapchainPresentInfo::swapchain_image_index(
                                        swapchain.clone(),
                                        image_index,
                                    ),
                                )
                                .then_signal_fence_and_flush()
                        });

                    match future {
                        Ok(Ok(future)) => {
                            previous_frame_end = Some(future.boxed());
                        }
                        Ok(Err(FlushError::OutOfDate)) => {
                            recreate_swapchain = true;
                            previous_frame_end = Some(sync::now(self.device.clone()).boxed());
                        }
                        Ok(Err(err)) => {
                            failure = Some(Error::viewer(err));
                            *control_flow = ControlFlow::Exit;
                        }
                        Err(err) => {
                            failure = Some(err);
                            *control_flow = ControlFlow::Exit;
                        }
                    }
                }
                _ => (),
            }
            instant = Instant::now();
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
