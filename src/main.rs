use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};
use xrpanel_config::{AppConfig, ControlLayout};
use xrpanel_input::controller::InteractionController;
use xrpanel_input::PointerEvent;
use xrpanel_paint::control::ControlPanelPainter;
use xrpanel_paint::placeholder::CheckerboardPainter;
use xrpanel_paint::worker::RepaintWorker;
use xrpanel_paint::MAIN_PANEL_SIZE;
use xrpanel_renderer::camera::Camera;
use xrpanel_renderer::frame::{FrameOrchestrator, FrameSkip, PanelKind};
use xrpanel_renderer::stereo::StereoRenderer;
use xrpanel_tracking::{DesktopTracker, PoseSource};

/// Application state.
struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    frames: FrameOrchestrator,
    tracker: DesktopTracker,
    repaint: RepaintWorker,
    camera: Camera,
    /// Side-by-side stereo output (true) or a single mono view (false).
    stereo_mode: bool,
    /// Pointer events that arrived on skipped frames, replayed against the
    /// last known hits on the next drawn frame.
    deferred_events: Vec<PointerEvent>,
    last_frame: Instant,
    frame_count: u64,
    /// Set when GPU setup failed; returned from `main` after the loop exits.
    fatal: Option<anyhow::Error>,
}

struct GpuState {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: StereoRenderer,
}

impl App {
    fn new(config: AppConfig, repaint: RepaintWorker) -> Self {
        let layout = ControlLayout::default();
        let controller = InteractionController::new(layout, config.ray_length);
        let frames = FrameOrchestrator::new(config.panel, config.settle_frames, controller);
        let camera = Camera::new(config.ipd_mm, config.fov_y_degrees);
        let tracker = DesktopTracker::new(1280.0, 720.0, camera.projection_matrix(1280.0 / 720.0));

        Self {
            stereo_mode: config.stereo,
            config,
            window: None,
            gpu: None,
            frames,
            tracker,
            repaint,
            camera,
            deferred_events: Vec::new(),
            last_frame: Instant::now(),
            frame_count: 0,
            fatal: None,
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let size = if self.stereo_mode {
            PhysicalSize::new(2560, 720)
        } else {
            PhysicalSize::new(1280, 720)
        };

        let attrs = Window::default_attributes()
            .with_title("XR Panel")
            .with_inner_size(size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );
        self.window = Some(window.clone());

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let (device, queue, adapter) = pollster::block_on(async {
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                })
                .await
                .context("No suitable GPU adapter found")?;

            info!(name = adapter.get_info().name, "Using GPU");

            let (device, queue) = adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("xrpanel_device"),
                        required_features: wgpu::Features::empty(),
                        required_limits: wgpu::Limits::default(),
                        memory_hints: Default::default(),
                    },
                    None,
                )
                .await
                .context("Failed to create device")?;

            anyhow::Ok((device, queue, adapter))
        })?;

        let win_size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("Surface reports no texture formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: win_size.width.max(1),
            height: win_size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let layout = self.frames.controller().layout();
        let renderer = StereoRenderer::new(
            &device,
            format,
            surface_config.width,
            surface_config.height,
            MAIN_PANEL_SIZE,
            (layout.width, layout.height),
        )
        .context("Failed to create render pipelines")?;

        self.on_surface_resized(surface_config.width, surface_config.height);

        self.gpu = Some(GpuState {
            device,
            queue,
            surface,
            surface_config,
            renderer,
        });

        info!(
            stereo = self.stereo_mode,
            distance = self.config.panel.distance,
            width = self.config.panel.width,
            "Application initialized"
        );
        Ok(())
    }

    /// Keep the mouse pointer's projection in step with the output size.
    fn on_surface_resized(&mut self, width: u32, height: u32) {
        self.tracker
            .pointer
            .set_window_size(width as f32, height as f32);
        self.tracker
            .set_projection(self.camera.projection_matrix(width as f32 / height.max(1) as f32));
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode, state: ElementState) {
        if self.tracker.head.on_key(key, state) || state != ElementState::Pressed {
            return;
        }

        match key {
            KeyCode::F5 => {
                self.frames.request_recenter();
                info!("Recenter requested");
            }
            KeyCode::F9 => {
                self.stereo_mode = !self.stereo_mode;
                info!(stereo = self.stereo_mode, "Stereo mode toggled");
            }
            KeyCode::Digit1 => self.frames.update_config(|c| c.adjust_distance(-1)),
            KeyCode::Digit2 => self.frames.update_config(|c| c.adjust_distance(1)),
            KeyCode::Digit3 => self.frames.update_config(|c| c.adjust_width(-1)),
            KeyCode::Digit4 => self.frames.update_config(|c| c.adjust_width(1)),
            KeyCode::KeyC => self.frames.update_config(|c| c.toggle_curved()),
            KeyCode::Escape => {
                self.frames.end_session();
                event_loop.exit();
            }
            _ => {}
        }
    }

    fn redraw(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let input = self.tracker.poll(dt);
        let viewer = match self.frames.begin_frame(input.viewer) {
            Ok(start) => start.viewer,
            Err(FrameSkip::SessionEnded) => return,
            Err(skip) => {
                // Keep the last presented image and pointer state.
                tracing::trace!(%skip, "Frame skipped");
                self.deferred_events.extend(input.events);
                upload_repaints(gpu, &mut self.repaint);
                return;
            }
        };

        gpu.renderer.sync_meshes(&gpu.device, self.frames.scene());

        for event in self.deferred_events.drain(..) {
            self.frames.handle_event(event);
        }

        // Select events resolve against this frame's hits; changes they
        // cause are applied when the next frame begins.
        let overlay = self.frames.update_pointers(&input.pointers);
        gpu.renderer.write_overlay(&gpu.queue, overlay);
        for event in input.events {
            self.frames.handle_event(event);
        }

        if let Some(config) = self.frames.take_repaint() {
            if let Err(e) = self.repaint.request_all(config) {
                error!(?e, "Failed to queue panel repaint");
            }
        }
        upload_repaints(gpu, &mut self.repaint);

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                warn!(?e, "Failed to get surface texture");
                return;
            }
        };
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (width, height) = (gpu.surface_config.width, gpu.surface_config.height);
        let eyes = self
            .camera
            .eye_views(&viewer, self.stereo_mode, width, height);
        let commands = self.frames.plan_eye();

        let cmd = gpu
            .renderer
            .render_frame(&gpu.device, &gpu.queue, &target, &eyes, &commands);
        gpu.queue.submit(std::iter::once(cmd));
        output.present();

        self.frame_count += 1;
        if self.frame_count % 300 == 0 {
            tracing::debug!(
                frames = self.frame_count,
                state = ?self.frames.state(),
                "Render heartbeat"
            );
        }
    }
}

/// Move finished panel bitmaps into their textures.
fn upload_repaints(gpu: &mut GpuState, repaint: &mut RepaintWorker) {
    let repainted = repaint.poll();
    if let Some(bitmap) = repainted.main {
        gpu.renderer.upload_bitmap(
            &gpu.device,
            &gpu.queue,
            PanelKind::Main,
            &bitmap.data,
            bitmap.width,
            bitmap.height,
        );
    }
    if let Some(bitmap) = repainted.control {
        gpu.renderer.upload_bitmap(
            &gpu.device,
            &gpu.queue,
            PanelKind::Control,
            &bitmap.data,
            bitmap.width,
            bitmap.height,
        );
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.init_gpu(event_loop) {
            error!(?e, "GPU setup failed");
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.frames.end_session();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(gpu) = &mut self.gpu {
                        gpu.surface_config.width = size.width;
                        gpu.surface_config.height = size.height;
                        gpu.surface.configure(&gpu.device, &gpu.surface_config);
                        gpu.renderer.resize(&gpu.device, size.width, size.height);
                    }
                    self.on_surface_resized(size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.on_key(event_loop, key, event.state);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.tracker.pointer.on_cursor_moved(position.x, position.y);
            }

            WindowEvent::CursorLeft { .. } => {
                self.tracker.pointer.on_cursor_left();
            }

            WindowEvent::MouseInput { button, state, .. } => {
                self.tracker.pointer.on_mouse_button(button, state);
            }

            WindowEvent::RedrawRequested => {
                self.redraw();

                // Request next frame.
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "xrpanel=info,xrpanel_renderer=info,xrpanel_input=info,xrpanel_paint=info".into()
            }),
        )
        .init();

    info!("XR panel starting");

    let config = xrpanel_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    info!(?config.panel, settle_frames = config.settle_frames, "Config loaded");

    let repaint = RepaintWorker::spawn(
        Box::new(CheckerboardPainter::default()),
        Box::new(ControlPanelPainter::new(ControlLayout::default())),
    );

    // Run the application.
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, repaint);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
