use apodize::hanning_iter;
use ndarray::{Array2, Array3, s};
use rustfft::{FftPlanner, num_complex::Complex};

// =================== Config / Constantes ===================

/// Parámetros de entrada de los extractores tipo EffNet/MusiCNN.
pub const FRAME_SIZE: usize = 512;
pub const HOP_SIZE: usize = 256;
pub const MEL_BANDS: usize = 96;
/// Frames por parche y salto entre parches.
pub const PATCH_FRAMES: usize = 128;
pub const PATCH_HOP: usize = 62;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    pub bands: usize,
    pub patch_frames: usize,
    pub patch_hop: usize,
}

impl Default for MelConfig {
    fn default() -> Self {
        MelConfig {
            frame_size: FRAME_SIZE,
            hop_size: HOP_SIZE,
            bands: MEL_BANDS,
            patch_frames: PATCH_FRAMES,
            patch_hop: PATCH_HOP,
        }
    }
}

// ============== API pública ==============

/// Espectrograma mel log-comprimido (`log10(1 + 10000 x)`), frames × bandas.
///
/// Señales más cortas que un frame se rellenan con ceros para producir al menos uno.
pub fn mel_spectrogram(samples: &[f32], sample_rate: u32, cfg: &MelConfig) -> Array2<f32> {
    let n = cfg.frame_size;
    let bins = n / 2 + 1;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); n];
    let mut scratch: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    let hann: Vec<f32> = hanning_iter(n).map(|x| x as f32).collect();
    let filters = mel_filterbank(cfg.bands, n, sample_rate as f32);

    let num_frames = if samples.len() <= n {
        1
    } else {
        (samples.len() - n) / cfg.hop_size + 1
    };

    let mut mel = Array2::<f32>::zeros((num_frames, cfg.bands));
    let mut power = vec![0.0_f32; bins];

    for frame in 0..num_frames {
        let start = frame * cfg.hop_size;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = samples.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * hann[i], 0.0);
        }

        if scratch.is_empty() {
            fft.process(&mut buffer);
        } else {
            fft.process_with_scratch(&mut buffer, &mut scratch);
        }

        for (p, bin) in power.iter_mut().zip(buffer.iter()) {
            *p = bin.norm_sqr() / n as f32;
        }

        for (band, filter) in filters.iter().enumerate() {
            let energy: f32 = filter.iter().zip(power.iter()).map(|(w, p)| w * p).sum();
            mel[[frame, band]] = (1.0 + 10_000.0 * energy.max(0.0)).log10();
        }
    }

    mel
}

/// Corta el espectrograma en parches solapados de `patch_frames` frames
/// (parches × frames × bandas). El último parche incompleto se descarta salvo
/// que sea el único, en cuyo caso se rellena con ceros.
pub fn patches(mel: &Array2<f32>, cfg: &MelConfig) -> Array3<f32> {
    let (frames, bands) = mel.dim();
    let size = cfg.patch_frames;

    if frames < size {
        let mut single = Array3::<f32>::zeros((1, size, bands));
        single.slice_mut(s![0, ..frames, ..]).assign(mel);
        return single;
    }

    let count = (frames - size) / cfg.patch_hop + 1;
    let mut out = Array3::<f32>::zeros((count, size, bands));
    for p in 0..count {
        let start = p * cfg.patch_hop;
        out.slice_mut(s![p, .., ..])
            .assign(&mel.slice(s![start..start + size, ..]));
    }
    out
}

// =================== Internos ===================

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Banco de filtros triangulares, `bands` filtros de `frame_size / 2 + 1` coeficientes.
fn mel_filterbank(bands: usize, frame_size: usize, sample_rate: f32) -> Vec<Vec<f32>> {
    let bins = frame_size / 2 + 1;
    let mel_max = hz_to_mel(sample_rate / 2.0);
    let points: Vec<f32> = (0..bands + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (bands + 1) as f32) * frame_size as f32 / sample_rate)
        .collect();

    (0..bands)
        .map(|b| {
            let (left, center, right) = (points[b], points[b + 1], points[b + 2]);
            (0..bins)
                .map(|k| {
                    let k = k as f32;
                    if k >= left && k <= center && center > left {
                        (k - left) / (center - left)
                    } else if k > center && k <= right && right > center {
                        (right - k) / (right - center)
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}
