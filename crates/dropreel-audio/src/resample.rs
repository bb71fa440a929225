//! Offline sample-rate conversion.

use dropreel_core::{DropReelError, Result};
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

const CHUNK_SIZE: usize = 1024;
const MAX_FLUSHES: usize = 16;

fn audio_err(err: impl std::fmt::Display) -> DropReelError {
    DropReelError::Audio(format!("Resampler: {}", err))
}

/// Sinc resampler for `src_rate -> dst_rate`, or `None` when the rates match.
pub fn build_resampler(
    src_rate: u32,
    dst_rate: u32,
    channels: usize,
) -> Result<Option<SincFixedIn<f32>>> {
    if src_rate == dst_rate {
        return Ok(None);
    }
    if src_rate == 0 || dst_rate == 0 {
        return Err(DropReelError::InvalidParameter(format!(
            "Cannot resample {} Hz -> {} Hz",
            src_rate, dst_rate
        )));
    }
    let ratio = dst_rate as f64 / src_rate as f64;
    let sinc_len = 256usize;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    let resampler =
        SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, channels).map_err(audio_err)?;
    Ok(Some(resampler))
}

/// Resample a mono clip. The result has `round(len * dst / src)` samples with
/// the filter delay removed, so sample offsets keep their meaning in time.
pub fn resample_mono(input: &[f32], src_rate: u32, dst_rate: u32) -> Result<Vec<f32>> {
    let Some(mut resampler) = build_resampler(src_rate, dst_rate, 1)? else {
        return Ok(input.to_vec());
    };
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let expected =
        (input.len() as f64 * dst_rate as f64 / src_rate as f64).round() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    let mut pos = 0;
    while input.len() - pos >= resampler.input_frames_next() {
        let need = resampler.input_frames_next();
        let block: [&[f32]; 1] = [&input[pos..pos + need]];
        let out = resampler
            .process(&block[..], None)
            .map_err(audio_err)?;
        output.extend_from_slice(&out[0]);
        pos += need;
    }
    if pos < input.len() {
        let tail: [&[f32]; 1] = [&input[pos..]];
        let out = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(audio_err)?;
        output.extend_from_slice(&out[0]);
    }

    let mut flushes = 0;
    while output.len() < delay + expected && flushes < MAX_FLUSHES {
        let out = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(audio_err)?;
        output.extend_from_slice(&out[0]);
        flushes += 1;
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);
    Ok(output)
}
