use byteorder::{WriteBytesExt, LE};
use std::io::Write;

/// Grow-on-demand byte writer. Arithmetic writes go through `byteorder` and are always
/// little-endian; `write_raw` bypasses endianness handling entirely for blobs the caller has
/// already encoded (compressed payloads, pre-packed vertex data).
#[derive(Default)]
pub struct OStream {
    buffer: Vec<u8>,
}

impl OStream {
    pub fn new() -> OStream {
        OStream { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> OStream {
        OStream {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.write_u8(value).expect("write to Vec<u8> cannot fail");
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.write_u16::<LE>(value).expect("write to Vec<u8> cannot fail");
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.write_u32::<LE>(value).expect("write to Vec<u8> cannot fail");
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.write_u64::<LE>(value).expect("write to Vec<u8> cannot fail");
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.write_i32::<LE>(value).expect("write to Vec<u8> cannot fail");
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.write_f32::<LE>(value).expect("write to Vec<u8> cannot fail");
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buffer.write_f64::<LE>(value).expect("write to Vec<u8> cannot fail");
    }

    /// `[u32 bytes][utf-8 bytes]`, per the container string layout.
    pub fn write_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.write_raw(value.as_bytes());
    }
}

impl Write for OStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_layout_is_length_prefixed() {
        let mut os = OStream::new();
        os.write_string("hi");
        assert_eq!(os.bytes(), &[2, 0, 0, 0, b'h', b'i']);
    }
}
