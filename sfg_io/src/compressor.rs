use thiserror::Error;

/// Payload sizes in this range get LZ4-compressed when written to a file container; anything
/// smaller isn't worth the framing overhead, anything larger is assumed to already be compressed
/// (video, audio, texture block formats) or is large enough that compression time matters more
/// than the size win.
const COMPRESSION_MIN_BYTES: usize = 750_000;
const COMPRESSION_MAX_BYTES: usize = 150_000_000;

const TRAILER_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum DecompressError {
    #[error("container is too short to contain a trailer")]
    TooShort,
    #[error("lz4 decompression failed: {0}")]
    Lz4(#[from] lz4_flex::block::DecompressError),
}

/// Appends the `[u8 is_compressed][u32 uncompressed_size]` trailer this module's file containers
/// use, compressing the payload with LZ4 first when it falls in the configured size window.
pub fn compress_file_container(data: &[u8]) -> Vec<u8> {
    let should_compress = data.len() >= COMPRESSION_MIN_BYTES && data.len() <= COMPRESSION_MAX_BYTES;

    let mut out = if should_compress {
        lz4_flex::block::compress(data)
    } else {
        data.to_vec()
    };

    out.push(should_compress as u8);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out
}

/// Reverses [`compress_file_container`].
pub fn decompress_file_container(data: &[u8]) -> Result<Vec<u8>, DecompressError> {
    if data.len() < TRAILER_LEN {
        return Err(DecompressError::TooShort);
    }

    let trailer_start = data.len() - TRAILER_LEN;
    let is_compressed = data[trailer_start] != 0;
    let uncompressed_size = u32::from_le_bytes(
        data[trailer_start + 1..trailer_start + TRAILER_LEN]
            .try_into()
            .unwrap(),
    ) as usize;
    let payload = &data[..trailer_start];

    if is_compressed {
        Ok(lz4_flex::block::decompress(payload, uncompressed_size)?)
    } else {
        Ok(payload.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payload_round_trips_uncompressed() {
        let data = b"hello world".to_vec();
        let framed = compress_file_container(&data);
        let restored = decompress_file_container(&framed).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn large_payload_round_trips_compressed() {
        let data = vec![7u8; 1_000_000];
        let framed = compress_file_container(&data);
        assert!(framed.len() < data.len(), "compressible payload should shrink");
        let restored = decompress_file_container(&framed).unwrap();
        assert_eq!(restored, data);
    }
}
