use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use sfg_memory::{TextAllocator, TextHandle};

/// Console visibility, toggled by a key event (backtick, by convention) on the host side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleState {
    Invisible,
    Visible,
}

/// A registered console command. Receives the raw argument string following the command name.
pub type ConsoleCommandFn = fn(&str);

/// Hashes a command name the same way resource loading hashes a content key, so the console's
/// dispatch table and a resource path never need to agree on a hash function by convention alone.
pub fn hash_key(bytes: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

struct ConsoleInner {
    state: ConsoleState,
    lines: VecDeque<TextHandle>,
    max_lines: usize,
    text: TextAllocator,
    commands: HashMap<u64, ConsoleCommandFn>,
}

impl ConsoleInner {
    fn push_line(&mut self, line: &str) {
        if self.lines.len() == self.max_lines {
            if let Some(oldest) = self.lines.pop_front() {
                self.text.free(oldest);
            }
        }
        self.lines.push_back(self.text.allocate(line));
    }
}

/// Debug console: visibility state machine, a ring of log lines in its own text arena, and a
/// string-id keyed command dispatch table. Also installable as the process-wide `log::Log` sink
/// (§4.7, §6 Log) so operators see engine output inside the overlay as well as on stderr.
pub struct Console {
    inner: Mutex<ConsoleInner>,
}

impl Console {
    pub fn new(max_lines: usize, text_capacity: usize) -> Self {
        Console {
            inner: Mutex::new(ConsoleInner {
                state: ConsoleState::Invisible,
                lines: VecDeque::with_capacity(max_lines),
                max_lines,
                text: TextAllocator::new(text_capacity),
                commands: HashMap::new(),
            }),
        }
    }

    pub fn toggle(&self) {
        let mut inner = self.inner.lock();
        inner.state = match inner.state {
            ConsoleState::Invisible => ConsoleState::Visible,
            ConsoleState::Visible => ConsoleState::Invisible,
        };
    }

    pub fn state(&self) -> ConsoleState {
        self.inner.lock().state
    }

    pub fn register_command(&self, name: &str, command: ConsoleCommandFn) {
        self.inner.lock().commands.insert(hash_key(name.as_bytes()), command);
    }

    /// Splits `input` on the first whitespace run; the head names the command, the rest is
    /// handed to it verbatim. Unknown commands are logged and otherwise ignored.
    pub fn execute(&self, input: &str) {
        let mut parts = input.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("").trim();
        if name.is_empty() {
            return;
        }
        let args = parts.next().unwrap_or("").trim();

        let command = self.inner.lock().commands.get(&hash_key(name.as_bytes())).copied();
        match command {
            Some(command) => command(args),
            None => log::warn!("unknown console command: {name}"),
        }
    }

    /// Copies the currently buffered lines out as owned strings, oldest first, for the overlay
    /// controller to lay out as text widgets.
    pub fn lines(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner
            .lines
            .iter()
            .map(|&handle| inner.text.get(handle).to_owned())
            .collect()
    }
}

impl log::Log for Console {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!("[{}] {}", record.level(), record.args());
        self.inner.lock().push_line(&line);
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn toggle_flips_visibility() {
        let console = Console::new(16, 1024);
        assert_eq!(console.state(), ConsoleState::Invisible);
        console.toggle();
        assert_eq!(console.state(), ConsoleState::Visible);
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);
    fn noop_command(_args: &str) {
        CALLS.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn execute_dispatches_registered_command() {
        let console = Console::new(16, 1024);
        console.register_command("echo", noop_command);
        let before = CALLS.load(Ordering::Relaxed);
        console.execute("echo hello world");
        assert_eq!(CALLS.load(Ordering::Relaxed), before + 1);
    }

    #[test]
    fn ring_drops_oldest_line_past_capacity() {
        let console = Console::new(2, 1024);
        console.inner.lock().push_line("a");
        console.inner.lock().push_line("b");
        console.inner.lock().push_line("c");
        assert_eq!(console.lines(), vec!["b".to_string(), "c".to_string()]);
    }
}
