use serde::{Deserialize, Serialize};

/// Sample rate every pipeline stage runs at.
pub const SAMPLE_RATE: u32 = 44_100;

#[derive(Clone, Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioData {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Splits interleaved stereo into (left, right).
    pub fn split_stereo(&self) -> (Vec<f32>, Vec<f32>) {
        let mut left = Vec::with_capacity(self.frames());
        let mut right = Vec::with_capacity(self.frames());
        for frame in self.samples.chunks_exact(2) {
            left.push(frame[0]);
            right.push(frame[1]);
        }
        (left, right)
    }

    pub fn from_stereo(left: &[f32], right: &[f32], sample_rate: u32) -> Self {
        let mut samples = Vec::with_capacity(left.len() * 2);
        for (l, r) in left.iter().zip(right) {
            samples.push(*l);
            samples.push(*r);
        }
        Self {
            samples,
            sample_rate,
            channels: 2,
        }
    }

    /// Channel mean, one sample per frame.
    pub fn downmix_to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        let ch = self.channels as usize;
        self.samples
            .chunks(ch)
            .map(|chunk| chunk.iter().copied().sum::<f32>() / ch as f32)
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Fake,
    Real,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Fake => "Fake",
            Label::Real => "Real",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notifications emitted while a recording is analysed.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectProgress {
    Stage(&'static str),
    Tiles { done: usize, total: usize },
    Segments { done: usize, total: usize },
    Download { done: u64, total: u64 },
}
