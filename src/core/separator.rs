//! Vocal/background separation with a tiled mask-prediction network.
//!
//! The full-length spectrogram is padded so that tiles of `crop_size` frames,
//! spaced `roi = crop_size - 2 * offset` frames apart, cover it exactly. Each
//! tile's magnitude goes through the network; the returned masks cover the
//! central `roi` frames of their tile and are stitched back together in tile
//! order.

use std::sync::Arc;

use ndarray::{s, Array3, Array4, Axis};
use num_complex::Complex32;

use crate::{
    core::dsp::{istft, stft_stereo},
    error::{DetectError, Result},
    io::progress::Progress,
    types::{AudioData, DetectProgress, SAMPLE_RATE},
};

pub const DEFAULT_CROP_SIZE: usize = 256;
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// Vocal and background masks for one batch, each shaped
/// (batch, channels, bins, roi).
#[derive(Debug, Clone)]
pub struct MaskPair {
    pub vocal: Array4<f32>,
    pub background: Array4<f32>,
}

/// Seam to the separation network.
pub trait MaskModel: Send + Sync {
    /// Context frames the network consumes on each side of a tile.
    fn offset(&self) -> usize;

    /// `batch` holds normalized magnitudes shaped (batch, 2, bins, crop).
    fn predict_masks(&self, batch: &Array4<f32>) -> Result<MaskPair>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub left: usize,
    pub right: usize,
    pub roi: usize,
}

impl Padding {
    pub fn padded_len(&self, width: usize) -> usize {
        self.left + width + self.right
    }

    pub fn tiles(&self, width: usize) -> usize {
        (self.padded_len(width) - 2 * self.left) / self.roi
    }
}

/// Zero padding that makes `(padded - 2 * offset)` a multiple of the ROI.
pub fn make_padding(width: usize, crop_size: usize, offset: usize) -> Result<Padding> {
    if crop_size == 0 || 2 * offset > crop_size {
        return Err(DetectError::Separation(format!(
            "offset {offset} does not fit in crop size {crop_size}"
        )));
    }
    let left = offset;
    let roi = match crop_size - 2 * left {
        0 => crop_size,
        r => r,
    };
    let right = roi - (width % roi) + left;
    Ok(Padding { left, right, roi })
}

#[derive(Debug, Clone)]
pub struct SeparatedSpectra {
    pub vocal: Array3<Complex32>,
    pub background: Array3<Complex32>,
}

#[derive(Debug, Clone)]
pub struct Stems {
    pub vocal: AudioData,
    pub background: AudioData,
}

pub struct Separator {
    model: Arc<dyn MaskModel>,
    crop_size: usize,
    batch_size: usize,
    progress: Progress,
}

impl Separator {
    pub fn new(model: Arc<dyn MaskModel>) -> Self {
        Self {
            model,
            crop_size: DEFAULT_CROP_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            progress: Progress::none(),
        }
    }

    pub fn with_crop_size(mut self, crop_size: usize) -> Self {
        self.crop_size = crop_size;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Isolates the vocal track of a stereo 44.1 kHz waveform.
    pub fn separate(&self, wave: &AudioData) -> Result<AudioData> {
        let spectra = self.separate_spectrogram(&self.spectrogram(wave)?)?;
        Ok(invert(&spectra.vocal))
    }

    /// Like [`Separator::separate`] but also inverts the background.
    pub fn separate_stems(&self, wave: &AudioData) -> Result<Stems> {
        let spectra = self.separate_spectrogram(&self.spectrogram(wave)?)?;
        Ok(Stems {
            vocal: invert(&spectra.vocal),
            background: invert(&spectra.background),
        })
    }

    fn spectrogram(&self, wave: &AudioData) -> Result<Array3<Complex32>> {
        if wave.channels != 2 || wave.sample_rate != SAMPLE_RATE {
            return Err(DetectError::Separation(format!(
                "expected 2 channels at {} Hz, got {} channels at {} Hz",
                SAMPLE_RATE, wave.channels, wave.sample_rate
            )));
        }
        let (left, right) = wave.split_stereo();
        Ok(stft_stereo(&left, &right))
    }

    /// Applies the network to a (2, bins, frames) spectrogram and rebuilds
    /// the vocal and background spectra with the input's phase.
    pub fn separate_spectrogram(&self, spec: &Array3<Complex32>) -> Result<SeparatedSpectra> {
        let n_frame = spec.len_of(Axis(2));
        let (mask_v, mask_b) = self.predict_full_masks(spec)?;

        let mask_v = mask_v.slice(s![.., .., ..n_frame]);
        let mask_b = mask_b.slice(s![.., .., ..n_frame]);

        // mask * |X| * e^{i phase(X)}: scaling X keeps its phase.
        let mut vocal = spec.clone();
        vocal.zip_mut_with(&mask_v, |x, &m| *x = x.scale(m));
        let mut background = spec.clone();
        background.zip_mut_with(&mask_b, |x, &m| *x = x.scale(m));

        Ok(SeparatedSpectra { vocal, background })
    }

    fn predict_full_masks(&self, spec: &Array3<Complex32>) -> Result<(Array3<f32>, Array3<f32>)> {
        let (channels, bins, n_frame) = spec.dim();
        let offset = self.model.offset();
        let padding = make_padding(n_frame, self.crop_size, offset)?;
        let padded_len = padding.padded_len(n_frame);
        let tiles = padding.tiles(n_frame);
        let roi = padding.roi;

        let max = spec.iter().map(|c| c.norm()).fold(0.0f32, f32::max);
        // A silent input has nothing to normalize against.
        let scale = if max > 0.0 { 1.0 / max } else { 1.0 };

        let mut mag = Array3::<f32>::zeros((channels, bins, padded_len));
        mag.slice_mut(s![.., .., padding.left..padding.left + n_frame])
            .assign(&spec.mapv(|c| c.norm() * scale));

        log::debug!(
            "separator: {} frames padded to {} (l={}, r={}), {} tiles of {} (roi {})",
            n_frame,
            padded_len,
            padding.left,
            padding.right,
            tiles,
            self.crop_size,
            roi
        );

        let mut mask_v = Array3::<f32>::zeros((channels, bins, tiles * roi));
        let mut mask_b = Array3::<f32>::zeros((channels, bins, tiles * roi));

        for start in (0..tiles).step_by(self.batch_size) {
            let end = (start + self.batch_size).min(tiles);
            let mut batch = Array4::<f32>::zeros((end - start, channels, bins, self.crop_size));
            for (j, tile) in (start..end).enumerate() {
                let t0 = tile * roi;
                batch
                    .slice_mut(s![j, .., .., ..])
                    .assign(&mag.slice(s![.., .., t0..t0 + self.crop_size]));
            }

            let masks = self.model.predict_masks(&batch)?;
            let expected = (end - start, channels, bins, roi);
            for (name, m) in [("vocal", &masks.vocal), ("background", &masks.background)] {
                if m.dim() != expected {
                    return Err(DetectError::Separation(format!(
                        "{name} mask has shape {:?}, expected {:?}",
                        m.dim(),
                        expected
                    )));
                }
            }

            for (j, tile) in (start..end).enumerate() {
                let t0 = tile * roi;
                mask_v
                    .slice_mut(s![.., .., t0..t0 + roi])
                    .assign(&masks.vocal.slice(s![j, .., .., ..]));
                mask_b
                    .slice_mut(s![.., .., t0..t0 + roi])
                    .assign(&masks.background.slice(s![j, .., .., ..]));
            }

            self.progress.emit(DetectProgress::Tiles { done: end, total: tiles });
        }

        Ok((mask_v, mask_b))
    }
}

/// Inverse STFT of a (2, bins, frames) spectrogram into stereo audio.
pub fn invert(spec: &Array3<Complex32>) -> AudioData {
    let left = istft(spec.index_axis(Axis(0), 0));
    let right = istft(spec.index_axis(Axis(0), 1));
    AudioData::from_stereo(&left, &right, SAMPLE_RATE)
}
