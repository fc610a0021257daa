use std::collections::VecDeque;

use parking_lot::Mutex;

/// Key/mouse-button press, release, or (key-repeat only) continued-hold state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    Pressed,
    Released,
    Repeated,
}

/// A physical key, reusing `winit`'s scan-code-independent identifier rather than inventing a
/// parallel enum the pump would just have to translate into.
pub type InputCode = winit::keyboard::KeyCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub button: InputCode,
    pub action: ButtonAction,
    pub scan_code: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseButtonEvent {
    pub button: winit::event::MouseButton,
    pub action: ButtonAction,
    pub position: (f64, f64),
}

/// Window-level events the main thread's OS pump enqueues for the update thread to drain at its
/// own fixed rate (§6 Window events).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowEvent {
    Key(KeyEvent),
    MouseButton(MouseButtonEvent),
    MouseDelta { delta_x: f64, delta_y: f64 },
    MouseWheel { delta: f64 },
    Resize { new_size: (u32, u32) },
    Close,
}

/// Bounded SPSC queue: the main thread pushes, the update thread drains. Drops the oldest entry on
/// overflow rather than blocking the producer, per §5's ordering guarantees.
pub struct EventQueue {
    capacity: usize,
    events: Mutex<VecDeque<WindowEvent>>,
}

impl EventQueue {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        EventQueue {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, event: WindowEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn pop(&self) -> Option<WindowEvent> {
        self.events.lock().pop_front()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        EventQueue::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_drops_oldest() {
        let queue = EventQueue::new(2);
        queue.push(WindowEvent::MouseWheel { delta: 1.0 });
        queue.push(WindowEvent::MouseWheel { delta: 2.0 });
        queue.push(WindowEvent::MouseWheel { delta: 3.0 });

        assert_eq!(queue.pop(), Some(WindowEvent::MouseWheel { delta: 2.0 }));
        assert_eq!(queue.pop(), Some(WindowEvent::MouseWheel { delta: 3.0 }));
        assert_eq!(queue.pop(), None);
    }
}
