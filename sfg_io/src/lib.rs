pub mod compressor;
pub mod container;
pub mod istream;
pub mod log;
pub mod ostream;

pub use compressor::{compress_file_container, decompress_file_container, DecompressError};
pub use container::{read_container, write_container};
pub use istream::IStream;
pub use log::{LogLevel, LogSink};
pub use ostream::OStream;
