pub mod app;
pub mod delegate;
pub mod events;
pub mod plugin;
pub mod semaphore;
pub mod settings;

pub use app::App;
pub use delegate::Delegate;
pub use events::{ButtonAction, EventQueue, InputCode, KeyEvent, MouseButtonEvent, WindowEvent};
pub use plugin::{LoadedPlugin, PluginHandle, PluginVTable};
pub use semaphore::BinarySemaphore;
pub use settings::Settings;
