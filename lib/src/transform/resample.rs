//! Band-limited resampling to an exact output length

use crate::error::AudioError;
use crate::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

fn sinc_parameters() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Resample a whole signal so it has exactly `target_len` samples.
///
/// The sinc resampler's output is already aligned with its input, so the
/// result is only flushed and trimmed, never shifted.
pub fn resample_to_length(signal: &[f64], target_len: usize) -> Result<Vec<f64>> {
    if signal.is_empty() || target_len == 0 {
        return Ok(vec![0.0; target_len]);
    }
    if signal.len() == target_len {
        return Ok(signal.to_vec());
    }

    let ratio = target_len as f64 / signal.len() as f64;
    let mut resampler = SincFixedIn::<f64>::new(ratio, 1.0, sinc_parameters(), signal.len(), 1)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let input: [&[f64]; 1] = [signal];
    let mut output = resampler
        .process(&input[..], None)
        .map_err(|e| AudioError::Resample(e.to_string()))?
        .swap_remove(0);

    // Flush the filter tail with silence until the output is complete
    while output.len() < target_len {
        let tail = resampler
            .process_partial(None::<&[&[f64]]>, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?
            .swap_remove(0);
        if tail.is_empty() {
            break;
        }
        output.extend_from_slice(&tail);
    }

    output.resize(target_len, 0.0);

    log::debug!(
        "Resampled {} -> {} samples (ratio {:.5})",
        signal.len(),
        target_len,
        ratio
    );

    Ok(output)
}
