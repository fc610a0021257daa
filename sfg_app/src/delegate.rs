use sfg_gfx::RenderFrame;

use crate::app::App;
use crate::events::{KeyEvent, MouseButtonEvent, WindowEvent};

/// The embedding application's hook set (§6 Delegate contract). Mirrors `AppDelegate`'s virtual
/// interface; every hook but `on_tick`/`on_generate_frame` has a no-op default, since most
/// delegates only care about a handful of events.
pub trait Delegate: Send {
    fn on_initialize(&mut self, app: &mut App) -> anyhow::Result<()> {
        let _ = app;
        Ok(())
    }

    fn on_shutdown(&mut self) {}

    /// Called at the fixed update rate (`Settings::fixed_update_rate`).
    fn on_tick(&mut self, delta_seconds: f64);

    /// Called once per fixed update alongside `on_tick`, before interpolation; default no-op.
    fn on_simulate(&mut self, delta_seconds: f64) {
        let _ = delta_seconds;
    }

    /// Called once per produced render frame, after the fixed-update loop has caught the
    /// accumulator up; `interpolation` is the fractional position between the last two ticks.
    fn on_generate_frame(&mut self, frame: &mut RenderFrame, interpolation: f64);

    fn on_mouse(&mut self, event: MouseButtonEvent) {
        let _ = event;
    }

    fn on_key(&mut self, event: KeyEvent) {
        let _ = event;
    }

    fn on_mouse_delta(&mut self, delta_x: f64, delta_y: f64) {
        let _ = (delta_x, delta_y);
    }

    fn on_mouse_wheel(&mut self, delta: f64) {
        let _ = delta;
    }

    fn on_window_event(&mut self, event: &WindowEvent) {
        let _ = event;
    }
}
