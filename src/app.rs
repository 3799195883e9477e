use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    assets::AssetLoader,
    clock::{Clock, SystemClock},
    config::AppConfig,
    error::{DonutError, Result},
    gfx::{
        camera::{OrbitControls, PerspectiveCamera},
        geometry::generate_torus,
        render_engine::RenderEngine,
        scene::{shared_material, GeometryId, Scene, SharedMaterial, VariantHandle},
    },
    scheduler::{CancellationToken, FrameContext, FrameScheduler, RedrawTarget, TickOutcome},
    simulation::{traits::Simulation, ParticlePool},
    ui::{PanelStatus, ParameterPanel, UiManager},
};

/// Surface size for a window, with the device pixel ratio capped at `max_ratio`
pub fn surface_size(physical: PhysicalSize<u32>, scale_factor: f64, max_ratio: f64) -> (u32, u32) {
    if scale_factor <= max_ratio || scale_factor <= 0.0 {
        return (physical.width, physical.height);
    }
    let ratio = max_ratio / scale_factor;
    let scale = |v: u32| ((v as f64 * ratio).round() as u32).max(1);
    (scale(physical.width), scale(physical.height))
}

/// Window host for the donut field
pub struct DonutApp {
    event_loop: EventLoop<()>,
    app_state: AppState,
}

struct AppState {
    config: AppConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    loader: Option<AssetLoader>,

    scene: Scene,
    torus: GeometryId,
    material: SharedMaterial,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    pool: ParticlePool,
    panel: ParameterPanel,
    scheduler: FrameScheduler<SystemClock>,

    fatal: Option<DonutError>,
}

/// Status values captured before the tick borrows the simulation
struct StatusSnapshot {
    title: String,
    elapsed: f64,
    entity_count: usize,
    falling_count: usize,
}

/// Renders a finished frame with the panel on top
struct FrameRenderer<'a> {
    engine: &'a mut RenderEngine,
    ui_manager: Option<&'a mut UiManager>,
    window: &'a Window,
    panel: &'a mut ParameterPanel,
    status: StatusSnapshot,
    reset_requested: bool,
}

impl RedrawTarget for FrameRenderer<'_> {
    fn request_redraw(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        let Some(ui_manager) = self.ui_manager.as_deref_mut() else {
            self.engine.render_frame(
                scene,
                camera,
                None::<fn(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView)>,
            );
            return;
        };

        let window = self.window;
        let panel = &mut *self.panel;
        let status = PanelStatus {
            title: &self.status.title,
            elapsed: self.status.elapsed,
            entity_count: self.status.entity_count,
            falling_count: self.status.falling_count,
        };
        let mut reset = false;

        self.engine
            .render_frame_with_ui(scene, camera, |device, queue, encoder, color_attachment| {
                ui_manager.draw(device, queue, encoder, window, color_attachment, |ui| {
                    reset = panel.render_ui(ui, &status);
                });
            });

        self.reset_requested |= reset;
    }
}

impl DonutApp {
    /// Builds the scene and particle field; no window is opened until `run`
    pub fn new(config: AppConfig) -> Result<Self> {
        let event_loop = EventLoop::new()?;

        let mut scene = Scene::new();
        let shape = config.torus;
        let torus = scene.add_geometry(generate_torus(
            shape.radius,
            shape.tube,
            shape.radial_segments,
            shape.tubular_segments,
        ));

        // Texture slots follow variant order; real handles arrive with the upload
        let variants: Vec<VariantHandle> = (0..config.variant_count).map(VariantHandle).collect();
        let material = shared_material("matcap", VariantHandle(0));
        let panel = ParameterPanel::new(variants, material.clone());

        let pool = ParticlePool::new(config.field.clone());
        log::info!("Created {} donuts", pool.len());

        Ok(Self {
            event_loop,
            app_state: AppState {
                config,
                window: None,
                render_engine: None,
                ui_manager: None,
                loader: None,
                scene,
                torus,
                material,
                camera: PerspectiveCamera::default(),
                controls: OrbitControls::default(),
                pool,
                panel,
                scheduler: FrameScheduler::new(SystemClock::new()),
                fatal: None,
            },
        })
    }

    /// Token that stops the frame loop and closes the window when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.app_state.scheduler.token()
    }

    /// Runs the event loop until the window closes or the token is cancelled
    pub fn run(mut self) -> Result<()> {
        self.event_loop.set_control_flow(ControlFlow::Poll);
        self.event_loop.run_app(&mut self.app_state)?;

        match self.app_state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: DonutError) {
        log::error!("{}", err);
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (width, height) = self.config.window_size;
        let window = Arc::new(
            event_loop.create_window(
                WindowAttributes::default()
                    .with_title(self.config.window_title.clone())
                    .with_inner_size(LogicalSize::new(width, height)),
            )?,
        );

        let (width, height) = surface_size(
            window.inner_size(),
            window.scale_factor(),
            self.config.max_pixel_ratio,
        );
        let vsync = self.config.vsync;
        let renderer =
            pollster::block_on(RenderEngine::new(window.clone(), width, height, vsync))?;
        self.camera.resize(width, height);

        let ui_manager = UiManager::new(
            renderer.device(),
            renderer.queue(),
            renderer.surface_format(),
            &window,
            self.config.max_pixel_ratio,
        );

        self.loader = Some(AssetLoader::spawn(&self.config)?);
        self.ui_manager = Some(ui_manager);
        self.render_engine = Some(renderer);
        self.window = Some(window);
        self.scheduler.start();
        Ok(())
    }

    /// Picks up loaded assets: uploads matcaps, then spawns the donuts if the font resolved
    fn poll_assets(&mut self) {
        let Some(assets) = self.loader.as_mut().and_then(AssetLoader::poll) else {
            return;
        };
        self.loader = None;

        if let Some(engine) = self.render_engine.as_mut() {
            let handles = engine.upload_matcaps(&assets.matcaps);
            self.panel.set_variants(handles);
        }

        if assets.font.is_some() {
            let spawned = self
                .pool
                .spawn_into(&mut self.scene, self.torus, &self.material);
            log::info!("Added {} donuts to the scene", spawned);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.poll_assets();

        let (Some(window), Some(engine)) = (self.window.as_deref(), self.render_engine.as_mut())
        else {
            return;
        };

        let params = *self.panel.params();
        let status = StatusSnapshot {
            title: self.pool.name().to_string(),
            elapsed: self.scheduler.clock().elapsed(),
            entity_count: self.pool.entity_count(),
            falling_count: self.pool.falling_count(),
        };

        let mut frame = FrameRenderer {
            engine,
            ui_manager: self.ui_manager.as_mut(),
            window,
            panel: &mut self.panel,
            status,
            reset_requested: false,
        };

        let outcome = self.scheduler.tick(FrameContext {
            simulation: &mut self.pool,
            params: &params,
            scene: &mut self.scene,
            camera: &mut self.camera,
            controls: &mut self.controls,
            redraw: &mut frame,
        });

        if frame.reset_requested {
            self.panel.reset_positions(&mut self.pool);
        }
        if outcome == TickOutcome::Stopped {
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.init_window(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            if ui_manager.handle_window_event(&window, window_id, &event) {
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            }
            | WindowEvent::CloseRequested => {
                self.scheduler.token().cancel();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let (width, height) =
                    surface_size(size, window.scale_factor(), self.config.max_pixel_ratio);
                self.camera.resize(width, height);
                if let Some(engine) = self.render_engine.as_mut() {
                    engine.resize(width, height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        // Dragging a slider must not spin the camera
        if let Some(ui_manager) = self.ui_manager.as_ref() {
            if ui_manager.wants_mouse() {
                return;
            }
        }

        self.controls.process_events(&event);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.scheduler.token().is_cancelled() {
            event_loop.exit();
            return;
        }
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size_below_cap_is_unchanged() {
        let size = PhysicalSize::new(1600, 1000);
        assert_eq!(surface_size(size, 1.0, 2.0), (1600, 1000));
        assert_eq!(surface_size(size, 2.0, 2.0), (1600, 1000));
    }

    #[test]
    fn test_surface_size_caps_pixel_ratio() {
        // 3x display: 800x500 logical
        let size = PhysicalSize::new(2400, 1500);
        assert_eq!(surface_size(size, 3.0, 2.0), (1600, 1000));
    }

    #[test]
    fn test_surface_size_never_zero() {
        assert_eq!(surface_size(PhysicalSize::new(1, 1), 4.0, 2.0), (1, 1));
    }
}
