//! Log-mel front end for the classifier.
//!
//! One segment goes through a band-stop filter, a power mel spectrogram in
//! decibels relative to its own peak, and an image-style resize to the
//! classifier's 128 x 128 input.

use std::sync::Arc;

use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};

use crate::{
    core::{
        dsp::{frame_count, HOP, N_BINS, N_FFT},
        filter::BandStop,
    },
    error::{DetectError, Result},
};

pub const N_MELS: usize = 128;
pub const TARGET_SIZE: (usize, usize) = (128, 128);
pub const BANDSTOP_LOW_HZ: f64 = 150.0;
pub const BANDSTOP_HIGH_HZ: f64 = 5500.0;
pub const BANDSTOP_ORDER: usize = 5;
pub const TOP_DB: f64 = 80.0;
const AMIN: f64 = 1e-10;

pub struct FeatureExtractor {
    sample_rate: u32,
    bandstop: BandStop,
    mel_basis: Array2<f64>,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32) -> Result<Self> {
        let fs = sample_rate as f64;
        let bandstop = BandStop::butterworth(BANDSTOP_ORDER, BANDSTOP_LOW_HZ, BANDSTOP_HIGH_HZ, fs)?;
        let mel_basis = mel_filterbank(fs, N_FFT, N_MELS, 0.0, fs / 2.0);
        let fft = FftPlanner::<f64>::new().plan_fft_forward(N_FFT);
        let window = (0..N_FFT)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / N_FFT as f64).cos())
            .collect();

        Ok(Self {
            sample_rate,
            bandstop,
            mel_basis,
            fft,
            window,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Turns one segment of exactly `sample_rate` samples into a
    /// (128, 128, 1) tensor.
    pub fn extract(&self, segment: &[f32]) -> Result<Array3<f32>> {
        if segment.len() != self.sample_rate as usize {
            return Err(DetectError::Feature(format!(
                "segment has {} samples, expected {}",
                segment.len(),
                self.sample_rate
            )));
        }

        let x: Vec<f64> = segment.iter().map(|&v| v as f64).collect();
        let filtered = self.bandstop.filter(&x);
        let mel = self.mel_spectrogram(&filtered);
        let db = power_to_db(&mel, TOP_DB);
        let resized = resize(&db, TARGET_SIZE);

        if resized.iter().any(|v| !v.is_finite()) {
            return Err(DetectError::Feature("non-finite value in log-mel features".into()));
        }

        Ok(resized.mapv(|v| v as f32).insert_axis(Axis(2)))
    }

    /// Power mel spectrogram, shaped (n_mels, frames).
    pub fn mel_spectrogram(&self, signal: &[f64]) -> Array2<f64> {
        self.mel_basis.dot(&self.power_spectrogram(signal))
    }

    /// |STFT|^2 with zero-padded centering, shaped (bins, frames).
    fn power_spectrogram(&self, signal: &[f64]) -> Array2<f64> {
        let pad = N_FFT / 2;
        let mut padded = vec![0.0f64; pad + signal.len() + pad];
        padded[pad..pad + signal.len()].copy_from_slice(signal);

        let frames = frame_count(signal.len());
        let mut out = Array2::<f64>::zeros((N_BINS, frames));
        let mut buf = vec![Complex64::zero(); N_FFT];

        for fr in 0..frames {
            let frame = &padded[fr * HOP..fr * HOP + N_FFT];
            for (b, (s, w)) in buf.iter_mut().zip(frame.iter().zip(&self.window)) {
                *b = Complex64::new(s * w, 0.0);
            }
            self.fft.process(&mut buf);
            for (bin, c) in buf.iter().take(N_BINS).enumerate() {
                out[(bin, fr)] = c.norm_sqr();
            }
        }
        out
    }
}

// Slaney mel scale: linear below 1 kHz, logarithmic above.
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters with area normalization, shaped (n_mels, bins).
pub fn mel_filterbank(sr: f64, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Array2<f64> {
    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|i| i as f64 * (sr / 2.0) / (n_bins - 1) as f64)
        .collect();

    let (mel_lo, mel_hi) = (hz_to_mel(fmin), hz_to_mel(fmax));
    let mel_f: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_lo + (mel_hi - mel_lo) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut weights = Array2::<f64>::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let (f0, f1, f2) = (mel_f[m], mel_f[m + 1], mel_f[m + 2]);
        let enorm = 2.0 / (f2 - f0);
        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - f0) / (f1 - f0);
            let upper = (f2 - f) / (f2 - f1);
            weights[(m, k)] = lower.min(upper).max(0.0) * enorm;
        }
    }
    weights
}

/// Decibels relative to the peak, floored at `peak - top_db`.
///
/// An all-zero input maps to all zeros.
pub fn power_to_db(power: &Array2<f64>, top_db: f64) -> Array2<f64> {
    let peak = power.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ref_db = 10.0 * peak.max(AMIN).log10();

    let mut db = power.mapv(|p| 10.0 * p.max(AMIN).log10() - ref_db);
    let max_db = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let floor = max_db - top_db;
    db.mapv_inplace(|v| v.max(floor));
    db
}

/// Bilinear image resize with Gaussian anti-aliasing on downsampled axes.
/// Samples outside the image read as zero.
pub fn resize(image: &Array2<f64>, (rows, cols): (usize, usize)) -> Array2<f64> {
    let (in_rows, in_cols) = image.dim();
    if in_rows == 0 || in_cols == 0 {
        return Array2::zeros((rows, cols));
    }

    let sigma_r = ((in_rows as f64 / rows as f64) - 1.0).max(0.0) / 2.0;
    let sigma_c = ((in_cols as f64 / cols as f64) - 1.0).max(0.0) / 2.0;

    let mut smoothed = image.clone();
    if sigma_r > 1e-15 {
        smoothed = map_lanes(&smoothed, Axis(0), in_rows, |lane| gaussian_1d(lane, sigma_r));
    }
    if sigma_c > 1e-15 {
        smoothed = map_lanes(&smoothed, Axis(1), in_cols, |lane| gaussian_1d(lane, sigma_c));
    }

    let tall = map_lanes(&smoothed, Axis(0), rows, |lane| linear_zoom(lane, rows));
    map_lanes(&tall, Axis(1), cols, |lane| linear_zoom(lane, cols))
}

/// Applies `f` to every 1-D lane along `axis`, producing lanes of `out_len`.
fn map_lanes(
    a: &Array2<f64>,
    axis: Axis,
    out_len: usize,
    f: impl Fn(&[f64]) -> Vec<f64>,
) -> Array2<f64> {
    let shape = match axis.index() {
        0 => (out_len, a.len_of(Axis(1))),
        _ => (a.len_of(Axis(0)), out_len),
    };
    let mut out = Array2::<f64>::zeros(shape);
    for (src, mut dst) in a.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        let lane: Vec<f64> = src.iter().copied().collect();
        for (d, v) in dst.iter_mut().zip(f(&lane)) {
            *d = v;
        }
    }
    out
}

fn gaussian_1d(x: &[f64], sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|i| (-0.5 * (i as f64 / sigma).powi(2)).exp())
        .collect();
    let norm: f64 = kernel.iter().sum();

    let n = x.len() as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let j = i + k as isize - radius;
                    if (0..n).contains(&j) {
                        w * x[j as usize]
                    } else {
                        0.0
                    }
                })
                .sum::<f64>()
                / norm
        })
        .collect()
}

/// Linear resampling of one lane on pixel-centered coordinates.
fn linear_zoom(x: &[f64], out_len: usize) -> Vec<f64> {
    let n = x.len();
    let scale = n as f64 / out_len as f64;
    let at = |j: isize| -> f64 {
        if j >= 0 && (j as usize) < n {
            x[j as usize]
        } else {
            0.0
        }
    };

    (0..out_len)
        .map(|o| {
            let pos = (o as f64 + 0.5) * scale - 0.5;
            let j0 = pos.floor();
            let t = pos - j0;
            let j0 = j0 as isize;
            (1.0 - t) * at(j0) + t * at(j0 + 1)
        })
        .collect()
}
