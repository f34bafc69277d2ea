#[cfg(feature = "symphonia")]
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

#[cfg(feature = "symphonia")]
use crate::error::Error;

/// Longitud del filtro sinc para cada nivel de calidad (0 = mejor, 4 = más rápido).
const SINC_LEN_BY_QUALITY: [usize; 5] = [256, 128, 64, 32, 16];

pub fn sinc_len_for_quality(quality: u8) -> usize {
    SINC_LEN_BY_QUALITY[usize::from(quality.min(4))]
}

/// Remuestrea una señal mono de `from_hz` a `to_hz` en una sola pasada.
#[cfg(feature = "symphonia")]
pub fn resample_mono(samples: Vec<f32>, from_hz: u32, to_hz: u32, quality: u8) -> Result<Vec<f32>, Error> {
    if from_hz == to_hz || samples.is_empty() {
        return Ok(samples);
    }
    if from_hz == 0 || to_hz == 0 {
        return Err(Error::Resample(format!("invalid rates {from_hz} -> {to_hz}")));
    }

    let interpolation = if quality <= 1 {
        SincInterpolationType::Cubic
    } else {
        SincInterpolationType::Linear
    };
    let params = SincInterpolationParameters {
        sinc_len: sinc_len_for_quality(quality),
        f_cutoff: 0.95,
        interpolation,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_hz as f64 / from_hz as f64;
    let frames = samples.len();
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, 1)
        .map_err(|e| Error::Resample(e.to_string()))?;

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| Error::Resample(e.to_string()))?;

    let resampled = output.pop().unwrap_or_default();
    tracing::trace!(from_hz, to_hz, frames, out = resampled.len(), "remuestreado");
    Ok(resampled)
}
