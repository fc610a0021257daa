pub mod bump;
pub mod chunk;
pub mod handle;
pub mod pool;
pub mod text;

pub use bump::BumpAllocator;
pub use chunk::{ChunkAllocator, ChunkHandle};
pub use handle::Handle;
pub use pool::Pool;
pub use text::{TextAllocator, TextHandle};
