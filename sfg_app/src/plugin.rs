use std::ffi::{c_char, c_void, CString};

use libloading::{Library, Symbol};

use crate::app::App;

/// Two-hook vtable every plugin dynamic library's `create_plugin` must return a pointer
/// compatible with (§6 Plugin ABI). Kept `#[repr(C)]` rather than a Rust trait object since the
/// vtable crosses a dynamic-library boundary.
#[repr(C)]
pub struct PluginVTable {
    pub on_loaded: unsafe extern "C" fn(*mut c_void),
    pub on_unloaded: unsafe extern "C" fn(*mut c_void),
}

/// A plugin instance as handed back by its library: an opaque state pointer plus its vtable.
#[repr(C)]
pub struct PluginHandle {
    pub state: *mut c_void,
    pub vtable: PluginVTable,
}

type CreatePluginFn =
    unsafe extern "C" fn(path: *const c_char, app: *mut App, platform_handle: *mut c_void) -> *mut PluginHandle;
type DestroyPluginFn = unsafe extern "C" fn(plugin: *mut PluginHandle);

/// A loaded plugin library plus the instance it constructed. The `Library` must outlive every call
/// into `handle`, so it is kept alongside it rather than dropped once loading completes.
pub struct LoadedPlugin {
    library: Library,
    handle: *mut PluginHandle,
}

impl LoadedPlugin {
    /// Loads `path`, resolves `create_plugin`/`destroy_plugin`, and calls `create_plugin` with
    /// `app` and `platform_handle`. `app` must stay valid for the lifetime of the returned
    /// `LoadedPlugin` (§6: plugins receive a live `*mut App`).
    ///
    /// # Safety
    /// `path` must name a dynamic library exporting the two ABI symbols with the exact signatures
    /// above; a mismatched ABI is undefined behavior the loader cannot detect.
    pub unsafe fn load(path: &str, app: *mut App, platform_handle: *mut c_void) -> anyhow::Result<Self> {
        let library = Library::new(path)
            .map_err(|err| anyhow::anyhow!("failed to load plugin library {path}: {err}"))?;
        let create: Symbol<CreatePluginFn> = library
            .get(b"create_plugin")
            .map_err(|err| anyhow::anyhow!("plugin {path} missing create_plugin: {err}"))?;

        let c_path = CString::new(path)?;
        let handle = create(c_path.as_ptr(), app, platform_handle);
        if handle.is_null() {
            anyhow::bail!("plugin {path} create_plugin returned a null handle");
        }

        ((*handle).vtable.on_loaded)((*handle).state);
        Ok(LoadedPlugin { library, handle })
    }
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        unsafe {
            ((*self.handle).vtable.on_unloaded)((*self.handle).state);
            if let Ok(destroy) = self.library.get::<DestroyPluginFn>(b"destroy_plugin") {
                destroy(self.handle);
            } else {
                log::error!("plugin library missing destroy_plugin at unload time");
            }
        }
    }
}
