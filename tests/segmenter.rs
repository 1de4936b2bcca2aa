use deep_voice_detector::segment;

const SR: usize = 44_100;

#[test]
fn every_segment_has_exactly_one_second() {
    for len in [0, 1, SR - 1, SR, SR + 1, 2 * SR, (2.5 * SR as f64) as usize] {
        let samples: Vec<f32> = (0..len).map(|i| i as f32).collect();
        let segs = segment(&samples, SR);
        let expected = if len < SR { 1 } else { len.div_ceil(SR) };
        assert_eq!(segs.len(), expected, "len {len}");
        assert!(segs.iter().all(|s| s.len() == SR));
    }
}

#[test]
fn short_input_is_zero_padded() {
    let samples = vec![0.5f32; SR / 2];
    let segs = segment(&samples, SR);
    assert_eq!(segs.len(), 1);
    assert!(segs[0][..SR / 2].iter().all(|&v| v == 0.5));
    assert!(segs[0][SR / 2..].iter().all(|&v| v == 0.0));
}

#[test]
fn empty_input_gives_one_silent_segment() {
    let segs = segment(&[], SR);
    assert_eq!(segs.len(), 1);
    assert!(segs[0].iter().all(|&v| v == 0.0));
}

#[test]
fn short_tail_is_backfilled_from_previous_second() {
    let len = (2.5 * SR as f64) as usize;
    let samples: Vec<f32> = (0..len).map(|i| i as f32).collect();
    let segs = segment(&samples, SR);

    assert_eq!(segs.len(), 3);
    assert_eq!(segs[0], samples[..SR]);
    assert_eq!(segs[1], samples[SR..2 * SR]);
    // The last window equals the final second of the input.
    assert_eq!(segs[2], samples[len - SR..]);
}

#[test]
fn exact_multiple_needs_no_fill() {
    let samples: Vec<f32> = (0..2 * SR).map(|i| i as f32).collect();
    let segs = segment(&samples, SR);
    assert_eq!(segs.len(), 2);
    assert_eq!(segs[1], samples[SR..]);
}
