use byteorder::{ReadBytesExt, LE};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Reader over a borrowed or owned byte buffer. Mirrors [`crate::ostream::OStream`]'s
/// little-endian arithmetic reads plus raw copies, seek and skip.
pub struct IStream<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> IStream<'a> {
    pub fn new(bytes: &'a [u8]) -> IStream<'a> {
        IStream {
            cursor: Cursor::new(bytes),
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        (len - self.cursor.position()) as usize
    }

    pub fn seek(&mut self, position: u64) {
        self.cursor
            .seek(SeekFrom::Start(position))
            .expect("seek past end of buffer");
    }

    pub fn skip(&mut self, count: usize) {
        self.cursor
            .seek(SeekFrom::Current(count as i64))
            .expect("skip past end of buffer");
    }

    pub fn read_raw(&mut self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.cursor.read_exact(&mut out).expect("short read");
        out
    }

    pub fn read_u8(&mut self) -> u8 {
        self.cursor.read_u8().expect("short read")
    }

    pub fn read_u16(&mut self) -> u16 {
        self.cursor.read_u16::<LE>().expect("short read")
    }

    pub fn read_u32(&mut self) -> u32 {
        self.cursor.read_u32::<LE>().expect("short read")
    }

    pub fn read_u64(&mut self) -> u64 {
        self.cursor.read_u64::<LE>().expect("short read")
    }

    pub fn read_i32(&mut self) -> i32 {
        self.cursor.read_i32::<LE>().expect("short read")
    }

    pub fn read_f32(&mut self) -> f32 {
        self.cursor.read_f32::<LE>().expect("short read")
    }

    pub fn read_f64(&mut self) -> f64 {
        self.cursor.read_f64::<LE>().expect("short read")
    }

    pub fn read_string(&mut self) -> String {
        let len = self.read_u32() as usize;
        let bytes = self.read_raw(len);
        String::from_utf8(bytes).expect("stream string was not valid utf-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ostream::OStream;

    #[test]
    fn reads_back_what_was_written() {
        let mut os = OStream::new();
        os.write_u32(0xDEADBEEF);
        os.write_string("hello");
        os.write_f32(1.5);

        let bytes = os.into_bytes();
        let mut is = IStream::new(&bytes);
        assert_eq!(is.read_u32(), 0xDEADBEEF);
        assert_eq!(is.read_string(), "hello");
        assert_eq!(is.read_f32(), 1.5);
    }
}
