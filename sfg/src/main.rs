use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use sfg_app::{App, Delegate, Settings};
use sfg_gfx::{GpuDevice, RenderFrame};
use sfg_gfx_vulkan::VulkanDevice;
use sfg_overlay::{Console, OverlayController};
use sfg_resources::{ResourceManager, ResourceManagerCapacities, Texture};
use sfg_world::{World, WorldCapacities};

/// Ticks the world forward, draws a debug overlay reporting the live entity count, and logs
/// whatever the console accumulates. Stands in for a real game/editor delegate the way
/// `examples/fairywreath-eclale/eclale/src/main.rs`'s `main` stands in for a real track renderer.
struct DemoDelegate {
    world: World,
    resources: ResourceManager,
    overlay: OverlayController,
    console: Console,
    elapsed_seconds: f64,
}

impl DemoDelegate {
    fn new() -> Self {
        DemoDelegate {
            world: World::new(WorldCapacities::default()),
            resources: ResourceManager::new(ResourceManagerCapacities::default()),
            overlay: OverlayController::new(),
            console: Console::new(256, 16 * 1024),
            elapsed_seconds: 0.0,
        }
    }
}

impl Delegate for DemoDelegate {
    fn on_initialize(&mut self, _app: &mut App) -> Result<()> {
        self.world.entities.create_entity("demo_root");

        let placeholder_hash = sfg_resources::hash_key(b"sfg::demo::placeholder_texture");
        let placeholder = self.resources.create_resource::<Texture>(placeholder_hash, || Texture {
            width: 1,
            height: 1,
            mip_level_count: 1,
            gpu: sfg_gfx::TextureId::NULL,
            flags: sfg_resources::ResourceFlags::empty(),
        });

        log::info!(
            "sfg demo initialized: {} live entities, placeholder texture handle {placeholder:?}",
            self.world.entities.live_count(),
        );
        Ok(())
    }

    fn on_tick(&mut self, delta_seconds: f64) {
        self.elapsed_seconds += delta_seconds;
    }

    fn on_generate_frame(&mut self, frame: &mut RenderFrame, _interpolation: f64) {
        let entity_count = self.world.entities.live_count();
        let elapsed = self.elapsed_seconds;
        let console_lines = self.console.lines();

        let input = egui::RawInput::default();
        let overlay_frame = self.overlay.run(input, |ctx| {
            egui::Window::new("sfg").show(ctx, |ui| {
                ui.label(format!("elapsed: {elapsed:.2}s"));
                ui.label(format!("entities: {entity_count}"));
                ui.separator();
                for line in console_lines.iter().rev().take(8) {
                    ui.monospace(line);
                }
            });
        });

        // Recording the overlay into a real command stream needs a GPU pipeline, a vertex/index
        // buffer, and a render target, none of which this demo creates: it has no shader asset
        // pipeline to compile the overlay's SPIR-V from. A host with real assets would create
        // those once up front and pass their ids here instead of skipping the call.
        if !overlay_frame.draw_calls.is_empty() {
            log::trace!("overlay produced {} draw call(s), not recorded (no overlay pipeline loaded)", overlay_frame.draw_calls.len());
        }
        let _ = frame;
    }

    fn on_window_event(&mut self, event: &sfg_app::WindowEvent) {
        if let sfg_app::WindowEvent::Key(key_event) = event {
            if key_event.action == sfg_app::ButtonAction::Pressed
                && key_event.button == winit::keyboard::KeyCode::Backquote
            {
                self.console.toggle();
            }
        }
    }
}

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("SFG_LOG_LEVEL", "info")
        .write_style_or("SFG_LOG_STYLE", "always");
    env_logger::init_from_env(env);

    let settings = Settings {
        window_title: "sfg".to_string(),
        window_size: (1280, 720),
        ..Settings::default()
    };

    let app = App::new(settings);
    let delegate = Box::new(DemoDelegate::new());

    app.run(delegate, |window| {
        let window_handle = window.window_handle().expect("window has no handle").as_raw();
        let display_handle = window.display_handle().expect("window has no display handle").as_raw();
        Box::new(VulkanDevice::new(window_handle, display_handle, "sfg")) as Box<dyn GpuDevice + Send>
    })
}
