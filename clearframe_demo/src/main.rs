//! Clearframe demo: opens a fixed-size window and clears it every frame
//! until the window is closed or Escape is pressed.
//!
//! Run: cargo run --bin clearframe_demo

use clearframe::cf::scene::Scene;
use clearframe::cf::{Config, GameTimer, Renderer};
use clearframe::{engine_error, engine_info};
use clearframe_renderer_vulkan::{print_validation_stats_report, VulkanGraphicsDevice};
use native_dialog::{MessageDialog, MessageType};
use std::process::ExitCode;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

/// Log a fatal failure with file:line, remember it for the exit dialog and stop the loop
macro_rules! fatal {
    ($app:expr, $event_loop:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        engine_error!("clearframe::demo", "{}", message);
        $app.fail(message);
        $event_loop.exit();
    }};
}

/// Scene that reports the frame rate once per second
#[derive(Debug, Default)]
struct FrameRateScene {
    elapsed: f32,
    frames: u32,
}

impl Scene for FrameRateScene {
    fn on_init(&mut self) -> bool {
        engine_info!("clearframe::demo", "Scene initialized");
        true
    }

    fn on_update(&mut self, dt: f32) {
        self.elapsed += dt;
        if self.elapsed >= 1.0 {
            engine_info!(
                "clearframe::demo",
                "{} fps ({:.3} ms/frame)",
                self.frames,
                1000.0 * self.elapsed / self.frames.max(1) as f32
            );
            self.elapsed = 0.0;
            self.frames = 0;
        }
    }

    fn on_render(&mut self) {
        self.frames += 1;
    }

    fn on_close(&mut self) -> i32 {
        0
    }
}

struct App {
    config: Config,
    // Dropped before the window it presents to
    renderer: Renderer,
    window: Option<Window>,
    scene: Box<dyn Scene>,
    scene_initialized: bool,
    timer: GameTimer,
    failure: Option<String>,
}

impl App {
    fn new(config: Config, scene: Box<dyn Scene>) -> Self {
        Self {
            renderer: Renderer::new(&config),
            config,
            window: None,
            scene,
            scene_initialized: false,
            timer: GameTimer::new(),
            failure: None,
        }
    }

    /// First failure wins; later ones are consequences
    fn fail(&mut self, message: String) {
        if self.failure.is_none() {
            self.failure = Some(message);
        }
    }

    fn is_running(&self) -> bool {
        self.window.is_some() && self.failure.is_none()
    }

    /// Window, then device, renderer and scene
    fn start(&mut self, event_loop: &ActiveEventLoop) {
        let attributes = Window::default_attributes()
            .with_title(self.config.window_title.clone())
            .with_inner_size(PhysicalSize::new(self.config.window_width, self.config.window_height))
            .with_resizable(false);
        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(e) => return fatal!(self, event_loop, "Failed to create window: {}", e),
        };

        let device = match VulkanGraphicsDevice::new(&window, self.config.clone()) {
            Ok(device) => device,
            Err(e) => return fatal!(self, event_loop, "Failed to create graphics device: {}", e),
        };
        self.window = Some(window);

        if let Err(e) = self.renderer.initialize(Box::new(device), &self.config) {
            return fatal!(self, event_loop, "Failed to initialize renderer: {}", e);
        }

        if !self.scene.on_init() {
            return fatal!(self, event_loop, "Scene initialization failed");
        }
        self.scene_initialized = true;

        self.timer.reset();
        engine_info!("clearframe::demo", "Running, press Escape to quit");
    }

    /// Renderer shutdown (drains the GPU), then scene close
    fn stop(&mut self) {
        if let Err(e) = self.renderer.shutdown() {
            engine_error!("clearframe::demo", "Renderer shutdown failed: {}", e);
            self.fail(format!("Renderer shutdown failed: {}", e));
        }

        if self.scene_initialized {
            self.scene_initialized = false;
            let code = self.scene.on_close();
            if code != 0 {
                engine_error!("clearframe::demo", "Scene closed with code {}", code);
                self.fail(format!("Scene closed with code {}", code));
            }
        }

        self.window = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.failure.is_some() {
            return;
        }
        self.start(event_loop);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.is_running() || event_loop.exiting() {
            return;
        }

        self.timer.tick();
        self.scene.on_update(self.timer.delta_time());

        if let Err(e) = self.renderer.render_frame(self.scene.as_mut()) {
            fatal!(self, event_loop, "Frame {} failed: {}", self.renderer.frames_rendered(), e);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.stop();
    }
}

/// Blocking error dialog naming the failure
fn show_fatal_dialog(title: &str, message: &str) {
    let shown = MessageDialog::new()
        .set_type(MessageType::Error)
        .set_title(title)
        .set_text(message)
        .show_alert();
    if let Err(e) = shown {
        engine_error!("clearframe::demo", "Could not show error dialog: {}", e);
    }
}

fn main() -> ExitCode {
    let config = Config::default();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            engine_error!("clearframe::demo", "Failed to create event loop: {}", e);
            show_fatal_dialog(&config.app_name, &format!("Failed to create event loop: {}", e));
            return ExitCode::FAILURE;
        }
    };
    // Render continuously instead of waiting for input
    event_loop.set_control_flow(ControlFlow::Poll);

    let validation = config.enable_validation;
    let title = config.app_name.clone();
    let mut app = App::new(config, Box::new(FrameRateScene::default()));

    if let Err(e) = event_loop.run_app(&mut app) {
        engine_error!("clearframe::demo", "Event loop error: {}", e);
        app.fail(format!("Event loop error: {}", e));
    }
    // Covers run_app returning without an exiting() call
    app.stop();

    if validation {
        print_validation_stats_report();
    }

    match app.failure {
        Some(message) => {
            show_fatal_dialog(&title, &message);
            ExitCode::FAILURE
        }
        None => {
            engine_info!("clearframe::demo", "Clean shutdown after {} frames", app.renderer.frames_rendered());
            ExitCode::SUCCESS
        }
    }
}
