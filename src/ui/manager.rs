//! Dear ImGui overlay
//!
//! Owns the ImGui context, its winit platform glue and the wgpu renderer that
//! draws the panel on top of the donut field.

use imgui::{Context, FontConfig, FontSource, MouseCursor};
use imgui_wgpu::{Renderer, RendererConfig};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use std::time::Instant;
use wgpu::{CommandEncoder, Device, Queue, TextureFormat, TextureView};
use winit::{
    event::{Event, WindowEvent},
    window::{Window, WindowId},
};

const BASE_FONT_SIZE: f32 = 15.0;

pub struct UiManager {
    context: Context,
    platform: WinitPlatform,
    renderer: Renderer,
    last_frame: Instant,
    last_cursor: Option<MouseCursor>,
}

impl UiManager {
    /// # Arguments
    /// * `output_color_format` - Format of the surface the overlay is drawn onto
    /// * `max_pixel_ratio` - Same cap the surface uses, so text stays in proportion
    pub fn new(
        device: &Device,
        queue: &Queue,
        output_color_format: TextureFormat,
        window: &Window,
        max_pixel_ratio: f64,
    ) -> Self {
        let mut context = Context::create();
        context.set_ini_filename(None);

        let mut platform = WinitPlatform::new(&mut context);
        // Locked so display_size stays in physical pixels
        platform.attach_window(context.io_mut(), window, HiDpiMode::Locked(1.0));

        let pixel_ratio = window.scale_factor().min(max_pixel_ratio).max(1.0) as f32;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: BASE_FONT_SIZE * pixel_ratio,
                ..Default::default()
            }),
        }]);

        let style = context.style_mut();
        style.use_dark_colors();
        style.window_rounding = 4.0;
        style.frame_rounding = 2.0;
        style.scale_all_sizes(pixel_ratio);

        let renderer = Renderer::new(
            &mut context,
            device,
            queue,
            RendererConfig {
                texture_format: output_color_format,
                ..Default::default()
            },
        );
        log::debug!("ImGui overlay ready at pixel ratio {:.2}", pixel_ratio);

        Self {
            context,
            platform,
            renderer,
            last_frame: Instant::now(),
            last_cursor: None,
        }
    }

    /// Whether ImGui is hovering or dragging; camera drags should be ignored
    pub fn wants_mouse(&self) -> bool {
        self.context.io().want_capture_mouse
    }

    pub fn wants_keyboard(&self) -> bool {
        self.context.io().want_capture_keyboard
    }

    /// Forwards pointer and keyboard events to ImGui
    ///
    /// Returns true if ImGui consumed the event and it should go no further.
    pub fn handle_window_event(
        &mut self,
        window: &Window,
        window_id: WindowId,
        event: &WindowEvent,
    ) -> bool {
        let is_input = matches!(
            event,
            WindowEvent::CursorMoved { .. }
                | WindowEvent::MouseInput { .. }
                | WindowEvent::MouseWheel { .. }
                | WindowEvent::KeyboardInput { .. }
                | WindowEvent::ModifiersChanged(_)
                | WindowEvent::Focused(_)
        );
        if !is_input {
            return false;
        }

        let wrapped: Event<()> = Event::WindowEvent {
            window_id,
            event: event.clone(),
        };
        self.platform
            .handle_event(self.context.io_mut(), window, &wrapped);

        match event {
            WindowEvent::KeyboardInput { .. } => self.wants_keyboard(),
            WindowEvent::Focused(_) | WindowEvent::ModifiersChanged(_) => false,
            _ => self.wants_mouse(),
        }
    }

    /// Builds this frame's UI with `run_ui` and records it into `encoder`,
    /// loading (not clearing) whatever is already in `color_attachment`
    pub fn draw<F>(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        window: &Window,
        color_attachment: &TextureView,
        run_ui: F,
    ) where
        F: FnOnce(&imgui::Ui),
    {
        let now = Instant::now();
        self.context
            .io_mut()
            .update_delta_time(now - self.last_frame);
        self.last_frame = now;

        if let Err(err) = self.platform.prepare_frame(self.context.io_mut(), window) {
            log::warn!("Skipping UI frame: {}", err);
            return;
        }

        let ui = self.context.frame();
        run_ui(ui);

        let cursor = ui.mouse_cursor();
        if self.last_cursor != cursor {
            self.last_cursor = cursor;
            self.platform.prepare_render(ui, window);
        }

        let draw_data = self.context.render();
        if draw_data.display_size[0] <= 0.0 || draw_data.display_size[1] <= 0.0 {
            return;
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("UI Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_attachment,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Err(err) = self.renderer.render(draw_data, queue, device, &mut pass) {
            log::error!("Failed to render UI overlay: {}", err);
        }
    }
}
