//! SHA-256 message padding to a fixed circuit capacity.

/// SHA-256 block size in bytes.
pub const BLOCK_BYTES: usize = 64;

/// Apply SHA-256 padding and zero-fill to `capacity` bytes.
///
/// Returns `None` when the padded message does not fit. `capacity` must be a
/// multiple of [`BLOCK_BYTES`].
pub fn sha256_pad(message: &[u8], capacity: usize) -> Option<Vec<u8>> {
    debug_assert_eq!(capacity % BLOCK_BYTES, 0);

    let bit_len = (message.len() as u64).checked_mul(8)?;
    let padded_len = padded_len(message.len());
    if padded_len > capacity {
        return None;
    }

    let mut padded = Vec::with_capacity(capacity);
    padded.extend_from_slice(message);
    padded.push(0x80);
    padded.resize(padded_len - 8, 0);
    padded.extend_from_slice(&bit_len.to_be_bytes());
    padded.resize(capacity, 0);
    Some(padded)
}

/// Length after SHA-256 padding, before zero-fill.
pub fn padded_len(message_len: usize) -> usize {
    // message, 0x80, length suffix, rounded up to a whole block
    (message_len + 1 + 8).div_ceil(BLOCK_BYTES) * BLOCK_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_empty_message() {
        let padded = sha256_pad(&[], 64).unwrap();
        assert_eq!(padded.len(), 64);
        assert_eq!(padded[0], 0x80);
        assert!(padded[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pad_abc() {
        let padded = sha256_pad(b"abc", 128).unwrap();
        assert_eq!(&padded[..4], &[b'a', b'b', b'c', 0x80]);
        assert_eq!(&padded[56..64], &24u64.to_be_bytes());
        // zero-filled second block
        assert!(padded[64..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_length_suffix_spills_into_next_block() {
        assert_eq!(padded_len(55), 64);
        assert_eq!(padded_len(56), 128);
        assert_eq!(padded_len(150), 192);
    }

    #[test]
    fn test_capacity_exceeded() {
        assert!(sha256_pad(&[0u8; 56], 64).is_none());
        assert!(sha256_pad(&[0u8; 55], 64).is_some());
    }
}
