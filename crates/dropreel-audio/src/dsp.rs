//! Mono sample-buffer primitives used by the offline compositor.

/// Average interleaved channels into a single channel.
pub fn fold_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Add `src * gain` into `dst` starting at `offset`.
///
/// Samples past the end of `dst` are dropped. Returns how many samples were
/// written.
pub fn mix_at(dst: &mut [f32], src: &[f32], offset: usize, gain: f32) -> usize {
    if offset >= dst.len() {
        return 0;
    }
    let n = src.len().min(dst.len() - offset);
    for (d, s) in dst[offset..offset + n].iter_mut().zip(&src[..n]) {
        *d += s * gain;
    }
    n
}

/// Add `src * gain` repeated end to end over the whole of `dst`, from sample 0.
pub fn tile_into(dst: &mut [f32], src: &[f32], gain: f32) {
    if src.is_empty() {
        return;
    }
    for chunk in dst.chunks_mut(src.len()) {
        for (d, s) in chunk.iter_mut().zip(src) {
            *d += s * gain;
        }
    }
}

/// Compress every sample above `threshold` in magnitude:
/// `sign * (threshold + (|x| - threshold) * ratio)`.
pub fn soft_limit(buf: &mut [f32], threshold: f32, ratio: f32) {
    for s in buf.iter_mut() {
        let mag = s.abs();
        if mag > threshold {
            *s = s.signum() * (threshold + (mag - threshold) * ratio);
        }
    }
}

/// Largest absolute sample, 0 for an empty buffer.
pub fn peak(buf: &[f32]) -> f32 {
    buf.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Scale so the peak magnitude becomes exactly 1.
///
/// Silent buffers are left untouched. Returns the peak that was divided out.
pub fn normalize_peak(buf: &mut [f32]) -> Option<f32> {
    let p = peak(buf);
    if p <= 0.0 || !p.is_finite() {
        return None;
    }
    // Divide so the peak sample lands on exactly 1.0.
    for s in buf.iter_mut() {
        *s /= p;
    }
    Some(p)
}
