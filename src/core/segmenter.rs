/// Slices a mono waveform into consecutive windows of exactly `sr` samples.
///
/// A waveform shorter than one window is zero padded on the right. Otherwise
/// there are `ceil(len / sr)` windows; a short first window is zero padded,
/// while a short later window borrows its missing leading samples from the
/// tail of the previous window, so it ends up equal to the last `sr` samples.
pub fn segment(samples: &[f32], sr: usize) -> Vec<Vec<f32>> {
    assert!(sr > 0, "segment length must be positive");

    if samples.len() < sr {
        let mut only = samples.to_vec();
        only.resize(sr, 0.0);
        return vec![only];
    }

    let num_segments = samples.len().div_ceil(sr);
    let mut segments = Vec::with_capacity(num_segments);

    for i in 0..num_segments {
        let start = i * sr;
        let end = (start + sr).min(samples.len());
        let window = &samples[start..end];

        if window.len() == sr {
            segments.push(window.to_vec());
        } else if i == 0 {
            let mut padded = window.to_vec();
            padded.resize(sr, 0.0);
            segments.push(padded);
        } else {
            let missing = sr - window.len();
            let previous = &samples[start - sr..start];
            let mut filled = Vec::with_capacity(sr);
            filled.extend_from_slice(&previous[sr - missing..]);
            filled.extend_from_slice(window);
            segments.push(filled);
        }
    }

    segments
}
