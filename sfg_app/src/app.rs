use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use winit::dpi;
use winit::event::{DeviceEvent, ElementState, Event, MouseScrollDelta, WindowEvent as WinitWindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowBuilder;

use sfg_gfx::{GpuDevice, RenderFrame};

use crate::delegate::Delegate;
use crate::events::{ButtonAction, EventQueue, KeyEvent, MouseButtonEvent, WindowEvent};
use crate::semaphore::BinarySemaphore;
use crate::settings::Settings;

/// Owns the three threads described in §4.1/§5: the calling thread pumps OS messages, a spawned
/// update thread drives the fixed-timestep delegate tick and records render frames, a spawned
/// render thread walks submissions through the backend. Only the handful of fields every thread
/// must see cross the thread boundary; the render frames, device, and delegate are each moved
/// into exactly the one thread that owns them.
pub struct App {
    settings: Settings,
    should_close: Arc<AtomicBool>,
    current_render_frame_index: Arc<AtomicUsize>,
    frame_available: Arc<BinarySemaphore>,
    event_queue: Arc<EventQueue>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        App {
            should_close: Arc::new(AtomicBool::new(false)),
            current_render_frame_index: Arc::new(AtomicUsize::new(0)),
            frame_available: Arc::new(BinarySemaphore::new()),
            event_queue: Arc::new(EventQueue::default()),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Cooperative shutdown request: polled by both worker threads every iteration (§5).
    pub fn request_close(&self) {
        self.should_close.store(true, Ordering::Release);
    }

    pub fn should_close(&self) -> bool {
        self.should_close.load(Ordering::Acquire)
    }

    /// Builds the window, initializes the device `make_device` constructs from it, spawns the
    /// update and render threads, then pumps OS events on the calling thread until the window is
    /// closed or `request_close` is called. Blocks until both worker threads have joined.
    ///
    /// `make_device` takes the window rather than `run` taking a ready-built device because a
    /// backend like `sfg_gfx_vulkan`'s `VulkanDevice` needs the window's raw handles to
    /// construct its surface, and the window does not exist until `run` creates it.
    pub fn run(
        mut self,
        mut delegate: Box<dyn Delegate>,
        make_device: impl FnOnce(&winit::window::Window) -> Box<dyn GpuDevice + Send>,
    ) -> anyhow::Result<()> {
        delegate
            .on_initialize(&mut self)
            .map_err(|err| anyhow::anyhow!("delegate failed to initialize: {err}"))?;

        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(self.settings.window_title.clone())
            .with_inner_size(dpi::PhysicalSize::new(
                self.settings.window_size.0,
                self.settings.window_size.1,
            ))
            .build(&event_loop)?;

        let mut device = make_device(&window);
        device
            .initialize()
            .map_err(|err| anyhow::anyhow!("gpu device init failed: {err}"))?;

        let render_frames = Arc::new([
            Mutex::new(RenderFrame::new(self.settings.render_frame)),
            Mutex::new(RenderFrame::new(self.settings.render_frame)),
        ]);

        let fixed_update_rate = self.settings.fixed_update_rate;
        let max_accumulated_updates = self.settings.max_accumulated_updates;

        let update_thread = {
            let render_frames = render_frames.clone();
            let should_close = self.should_close.clone();
            let render_frame_index = self.current_render_frame_index.clone();
            let frame_available = self.frame_available.clone();
            let event_queue = self.event_queue.clone();
            thread::Builder::new().name("sfg-update".into()).spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    run_update_loop(
                        delegate.as_mut(),
                        &render_frames,
                        &should_close,
                        &render_frame_index,
                        &frame_available,
                        &event_queue,
                        fixed_update_rate,
                        max_accumulated_updates,
                    );
                }));
                if let Err(panic) = result {
                    log::error!("update thread panicked: {panic:?}");
                    should_close.store(true, Ordering::Release);
                }
                delegate.on_shutdown();
            })?
        };

        let render_thread = {
            let render_frames = render_frames.clone();
            let should_close = self.should_close.clone();
            let render_frame_index = self.current_render_frame_index.clone();
            let frame_available = self.frame_available.clone();
            thread::Builder::new().name("sfg-render".into()).spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    run_render_loop(device.as_mut(), &render_frames, &should_close, &render_frame_index, &frame_available);
                }));
                if let Err(panic) = result {
                    log::error!("render thread panicked: {panic:?}");
                    should_close.store(true, Ordering::Release);
                }
            })?
        };

        pump_os_events(event_loop, window, self.event_queue.clone(), self.should_close.clone())?;

        update_thread.join().expect("update thread panicked while joining");
        render_thread.join().expect("render thread panicked while joining");
        Ok(())
    }
}

/// Main-thread OS message pump: translates `winit` events into `WindowEvent`s on the bounded
/// queue the update thread drains, and paces itself to roughly 1 kHz (§4.1, §5). Takes owned
/// `Arc` handles rather than `&App` since `EventLoop::run`'s closure must be `'static`.
fn pump_os_events(
    event_loop: EventLoop<()>,
    _window: winit::window::Window,
    event_queue: Arc<EventQueue>,
    should_close: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    const TARGET_INTERVAL: Duration = Duration::from_micros(1000);
    let mut accumulator = Duration::ZERO;
    let mut previous = Instant::now();

    event_loop.run(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WinitWindowEvent::CloseRequested => {
                    event_queue.push(WindowEvent::Close);
                    should_close.store(true, Ordering::Release);
                    target.exit();
                }
                WinitWindowEvent::Resized(size) => {
                    event_queue.push(WindowEvent::Resize {
                        new_size: (size.width, size.height),
                    });
                }
                WinitWindowEvent::KeyboardInput { event: key, .. } => {
                    if let PhysicalKey::Code(code) = key.physical_key {
                        let action = if key.repeat {
                            ButtonAction::Repeated
                        } else if key.state == ElementState::Pressed {
                            ButtonAction::Pressed
                        } else {
                            ButtonAction::Released
                        };
                        event_queue.push(WindowEvent::Key(KeyEvent {
                            button: code,
                            action,
                            scan_code: 0,
                        }));
                    }
                }
                WinitWindowEvent::MouseInput { state, button, .. } => {
                    let action = if state == ElementState::Pressed {
                        ButtonAction::Pressed
                    } else {
                        ButtonAction::Released
                    };
                    event_queue.push(WindowEvent::MouseButton(MouseButtonEvent {
                        button,
                        action,
                        position: (0.0, 0.0),
                    }));
                }
                WinitWindowEvent::MouseWheel { delta, .. } => {
                    let delta = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y as f64,
                        MouseScrollDelta::PixelDelta(pos) => pos.y,
                    };
                    event_queue.push(WindowEvent::MouseWheel { delta });
                }
                _ => {}
            },
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                event_queue.push(WindowEvent::MouseDelta {
                    delta_x: delta.0,
                    delta_y: delta.1,
                });
            }
            Event::AboutToWait => {
                if should_close.load(Ordering::Acquire) {
                    target.exit();
                    return;
                }
                let now = Instant::now();
                accumulator += now - previous;
                previous = now;
                if accumulator < TARGET_INTERVAL {
                    std::thread::sleep(TARGET_INTERVAL - accumulator);
                } else {
                    accumulator -= TARGET_INTERVAL;
                }
            }
            _ => {}
        }
    })?;
    Ok(())
}

/// Fixed-timestep update loop run on the update thread. Drains the window-event queue once per
/// simulated tick (matching the original's per-tick event drain), calls `on_tick`/`on_simulate`,
/// then records one render frame and hands it to the render thread via the atomic index + binary
/// semaphore protocol (§5).
#[allow(clippy::too_many_arguments)]
fn run_update_loop(
    delegate: &mut dyn Delegate,
    render_frames: &Arc<[Mutex<RenderFrame>; 2]>,
    should_close: &Arc<AtomicBool>,
    current_render_frame_index: &Arc<AtomicUsize>,
    frame_available: &Arc<BinarySemaphore>,
    event_queue: &Arc<EventQueue>,
    fixed_update_rate: u32,
    max_accumulated_updates: u32,
) {
    let interval = Duration::from_micros(1_000_000 / fixed_update_rate.max(1) as u64);
    let mut accumulator = Duration::ZERO;
    let mut previous = Instant::now();
    let mut update_render_frame_index = 0usize;

    while !should_close.load(Ordering::Acquire) {
        let now = Instant::now();
        accumulator += now - previous;
        previous = now;

        let mut updates_this_iteration: u32 = 0;
        while accumulator >= interval && updates_this_iteration < max_accumulated_updates {
            accumulator -= interval;
            updates_this_iteration += 1;

            while let Some(event) = event_queue.pop() {
                dispatch_window_event(delegate, &event);
            }

            let delta_seconds = interval.as_secs_f64();
            delegate.on_tick(delta_seconds);
            delegate.on_simulate(delta_seconds);
        }

        if updates_this_iteration > 0 {
            let interpolation = accumulator.as_secs_f64() / interval.as_secs_f64();
            {
                let mut frame = render_frames[update_render_frame_index].lock();
                delegate.on_generate_frame(&mut frame, interpolation);
            }
            current_render_frame_index.store(update_render_frame_index, Ordering::Release);
            update_render_frame_index ^= 1;
            frame_available.signal();
        } else {
            std::thread::sleep(Duration::from_micros(100));
        }
    }
}

fn dispatch_window_event(delegate: &mut dyn Delegate, event: &WindowEvent) {
    delegate.on_window_event(event);
    match *event {
        WindowEvent::Key(key_event) => delegate.on_key(key_event),
        WindowEvent::MouseButton(mouse_event) => delegate.on_mouse(mouse_event),
        WindowEvent::MouseDelta { delta_x, delta_y } => delegate.on_mouse_delta(delta_x, delta_y),
        WindowEvent::MouseWheel { delta } => delegate.on_mouse_wheel(delta),
        WindowEvent::Resize { .. } | WindowEvent::Close => {}
    }
}

/// Render thread loop: blocks (with a short poll interval so `should_close` is still observed)
/// on the frame-available semaphore, then walks the most recently produced render frame through
/// the backend and resets it once consumed (§5).
fn run_render_loop(
    device: &mut dyn GpuDevice,
    render_frames: &Arc<[Mutex<RenderFrame>; 2]>,
    should_close: &Arc<AtomicBool>,
    current_render_frame_index: &Arc<AtomicUsize>,
    frame_available: &Arc<BinarySemaphore>,
) {
    while !should_close.load(Ordering::Acquire) {
        if !frame_available.wait_timeout(Duration::from_millis(1)) {
            continue;
        }

        let index = current_render_frame_index.load(Ordering::Acquire);
        let mut frame = render_frames[index].lock();
        if let Err(lost) = device.render(&frame) {
            log::error!("{lost}");
            should_close.store(true, Ordering::Release);
        }
        frame.reset();
    }

    device.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfg_gfx::RenderFrameDefinition;

    struct CountingDelegate {
        should_close: Arc<AtomicBool>,
        ticks: u32,
        frames_generated: u32,
    }

    impl Delegate for CountingDelegate {
        fn on_tick(&mut self, _delta_seconds: f64) {
            self.ticks += 1;
        }

        fn on_generate_frame(&mut self, _frame: &mut RenderFrame, _interpolation: f64) {
            self.frames_generated += 1;
            if self.frames_generated == 2 {
                self.should_close.store(true, Ordering::Release);
            }
        }
    }

    #[test]
    fn update_loop_signals_a_frame_per_tick_and_stops_on_close() {
        let render_frames = Arc::new([
            Mutex::new(RenderFrame::new(RenderFrameDefinition::default())),
            Mutex::new(RenderFrame::new(RenderFrameDefinition::default())),
        ]);
        let should_close = Arc::new(AtomicBool::new(false));
        let current_render_frame_index = Arc::new(AtomicUsize::new(0));
        let frame_available = Arc::new(BinarySemaphore::new());
        let event_queue = Arc::new(EventQueue::default());

        let mut delegate = CountingDelegate {
            should_close: should_close.clone(),
            ticks: 0,
            frames_generated: 0,
        };

        run_update_loop(
            &mut delegate,
            &render_frames,
            &should_close,
            &current_render_frame_index,
            &frame_available,
            &event_queue,
            // A very high fixed-update rate keeps this test fast: each iteration's accumulator
            // easily exceeds one tick's interval.
            1_000_000,
            4,
        );

        assert!(delegate.ticks >= 2);
        assert_eq!(delegate.frames_generated, 2);
        assert!(frame_available.wait_timeout(Duration::from_millis(0)));
    }

    #[test]
    fn dispatch_routes_each_event_kind() {
        struct RecordingDelegate {
            keys: u32,
            mouse_buttons: u32,
            wheel: u32,
        }
        impl Delegate for RecordingDelegate {
            fn on_tick(&mut self, _delta_seconds: f64) {}
            fn on_generate_frame(&mut self, _frame: &mut RenderFrame, _interpolation: f64) {}
            fn on_key(&mut self, _event: KeyEvent) {
                self.keys += 1;
            }
            fn on_mouse(&mut self, _event: MouseButtonEvent) {
                self.mouse_buttons += 1;
            }
            fn on_mouse_wheel(&mut self, _delta: f64) {
                self.wheel += 1;
            }
        }

        let mut delegate = RecordingDelegate {
            keys: 0,
            mouse_buttons: 0,
            wheel: 0,
        };
        dispatch_window_event(&mut delegate, &WindowEvent::MouseWheel { delta: 1.0 });
        dispatch_window_event(&mut delegate, &WindowEvent::Close);
        assert_eq!(delegate.wheel, 1);
        assert_eq!(delegate.keys, 0);
        assert_eq!(delegate.mouse_buttons, 0);
    }
}
