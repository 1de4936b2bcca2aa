use ndarray::{Array2, Array3, ArrayView2, Axis};
use num_complex::Complex32;
use once_cell::sync::Lazy;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// STFT window length shared by the separator and the mel front end.
pub const N_FFT: usize = 2048;
pub const HOP: usize = 1024;
pub const N_BINS: usize = N_FFT / 2 + 1;

struct FftCache {
    fft_forward: Arc<dyn Fft<f32>>,
    fft_inverse: Arc<dyn Fft<f32>>,
    hann_window: Vec<f32>,
}

static FFT_CACHE_2048: Lazy<FftCache> = Lazy::new(|| {
    let mut planner = FftPlanner::new();
    FftCache {
        fft_forward: planner.plan_fft_forward(N_FFT),
        fft_inverse: planner.plan_fft_inverse(N_FFT),
        hann_window: hann_periodic(N_FFT),
    }
});

/// Periodic Hann window (the DFT-even variant used for spectral analysis).
pub fn hann_periodic(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos())
        .collect()
}

pub fn to_planar_stereo(interleaved: &[f32], channels: u16) -> Vec<[f32; 2]> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.iter().map(|&x| [x, x]).collect(),
        ch => interleaved
            .chunks_exact(ch as usize)
            .map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Number of frames a centered STFT produces for `len` samples.
pub fn frame_count(len: usize) -> usize {
    1 + len / HOP
}

/// Centered, zero-padded STFT of one channel.
/// Returns a (bins = 1025, frames = 1 + len / 1024) complex matrix.
pub fn stft(signal: &[f32]) -> Array2<Complex32> {
    let t = signal.len();
    let pad = N_FFT / 2;

    let mut padded = vec![0.0f32; pad + t + pad];
    padded[pad..pad + t].copy_from_slice(signal);

    let frames = frame_count(t);
    let cache = &*FFT_CACHE_2048;
    let window = &cache.hann_window;

    let mut out = Array2::<Complex32>::zeros((N_BINS, frames));
    let mut buf = vec![Complex32::zero(); N_FFT];

    for fr in 0..frames {
        let start = fr * HOP;
        let frame = &padded[start..start + N_FFT];
        for i in 0..N_FFT {
            buf[i] = Complex32::new(frame[i] * window[i], 0.0);
        }

        cache.fft_forward.process(&mut buf);

        for fi in 0..N_BINS {
            out[(fi, fr)] = buf[fi];
        }
    }

    out
}

/// STFT of both channels, shape (2, bins, frames).
pub fn stft_stereo(left: &[f32], right: &[f32]) -> Array3<Complex32> {
    assert_eq!(left.len(), right.len(), "L/R length mismatch");
    let l = stft(left);
    let r = stft(right);
    let mut out = Array3::<Complex32>::zeros((2, l.nrows(), l.ncols()));
    out.index_axis_mut(Axis(0), 0).assign(&l);
    out.index_axis_mut(Axis(0), 1).assign(&r);
    out
}

/// Inverse of [`stft`]: windowed overlap-add normalized by the squared
/// window sum, with the centering pad removed.
/// Output length is `hop * (frames - 1)`.
pub fn istft(spec: ArrayView2<Complex32>) -> Vec<f32> {
    let frames = spec.ncols();
    if frames == 0 {
        return Vec::new();
    }
    assert_eq!(spec.nrows(), N_BINS, "istft expects {} bins", N_BINS);

    let cache = &*FFT_CACHE_2048;
    let ifft = &cache.fft_inverse;
    let window = &cache.hann_window;

    let padded_length = N_FFT + HOP * (frames - 1);
    let mut out = vec![0.0f32; padded_length];
    let mut window_sum = vec![0.0f32; padded_length];

    let mut buf = vec![Complex32::zero(); N_FFT];
    let scale = 1.0 / (N_FFT as f32);

    for fr in 0..frames {
        buf.fill(Complex32::zero());

        for fi in 0..N_BINS {
            buf[fi] = spec[(fi, fr)];
        }
        // Hermitian mirror so the inverse is real.
        for fi in 1..N_BINS - 1 {
            buf[N_FFT - fi] = buf[fi].conj();
        }
        buf[0].im = 0.0;
        buf[N_FFT / 2].im = 0.0;

        ifft.process(&mut buf);

        let start = fr * HOP;
        for i in 0..N_FFT {
            let w = window[i];
            out[start + i] += buf[i].re * w * scale;
            window_sum[start + i] += w * w;
        }
    }

    for (sample, &sum) in out.iter_mut().zip(&window_sum) {
        if sum > f32::MIN_POSITIVE {
            *sample /= sum;
        }
    }

    let pad = N_FFT / 2;
    out[pad..padded_length - pad].to_vec()
}
