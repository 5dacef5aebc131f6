//! Linear volume scaling for PCM16 LE sample buffers.

/// Scale every 16-bit sample in `chunk` by `volume`.
///
/// A trailing odd byte (half a sample) is passed through untouched. Full
/// volume returns the input unchanged.
pub fn apply_volume(chunk: &[u8], volume: f32) -> Vec<u8> {
    if volume >= 1.0 {
        return chunk.to_vec();
    }
    let volume = volume.max(0.0);

    let mut scaled = Vec::with_capacity(chunk.len());
    let mut samples = chunk.chunks_exact(2);
    for pair in &mut samples {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        let value = (f32::from(sample) * volume) as i16;
        scaled.extend_from_slice(&value.to_le_bytes());
    }
    scaled.extend_from_slice(samples.remainder());
    scaled
}
