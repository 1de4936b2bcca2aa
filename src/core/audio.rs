use std::{fs::File, path::Path};

use anyhow::{Context, Result as AnyResult};
use hound::WavWriter;
use rubato::{FftFixedIn, Resampler};
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use crate::{
    core::dsp::to_planar_stereo,
    error::{DetectError, Result},
    types::{AudioData, SAMPLE_RATE},
};

const RESAMPLE_CHUNK: usize = 1024;

pub fn read_audio<P: AsRef<Path>>(path: P) -> AnyResult<AudioData> {
    let path: &Path = path.as_ref();

    let file: File =
        File::open(path).with_context(|| format!("Failed to open audio file: {:?}", path))?;

    let mss: MediaSourceStream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint: Hint = Hint::new();

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("Unrecognised audio container: {:?}", path))?;

    let mut format = probed.format;
    let track = format.default_track().context("No default track found")?;
    let track_id = track.id;

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate: u32 = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels: u16 = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // A corrupt packet is skipped; anything else ends decoding.
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("skipping undecodable packet: {msg}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        sample_rate = decoded.spec().rate;
        channels = decoded.spec().channels.count() as u16;

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buffer.copy_interleaved_ref(decoded);

        samples.extend_from_slice(buffer.samples());
    }

    log::debug!(
        "read audio {:?}: sample_rate={}, channels={}, samples={}",
        path,
        sample_rate,
        channels,
        samples.len()
    );

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
    })
}

/// Decodes `path` into the pipeline's waveform: two channels at 44.1 kHz.
///
/// Mono sources are duplicated to both channels, sources with more than two
/// channels keep the first two, and any other rate is resampled.
pub fn load_waveform<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    let path = path.as_ref();
    let audio = read_audio(path).map_err(|e| DetectError::Decode(format!("{e:#}")))?;

    if audio.channels == 0 || audio.sample_rate == 0 || audio.samples.is_empty() {
        return Err(DetectError::Decode(format!(
            "{} contains no audio samples",
            path.display()
        )));
    }

    let stereo = to_planar_stereo(&audio.samples, audio.channels);
    let left: Vec<f32> = stereo.iter().map(|f| f[0]).collect();
    let right: Vec<f32> = stereo.iter().map(|f| f[1]).collect();

    let (left, right) = if audio.sample_rate != SAMPLE_RATE {
        log::info!(
            "resampling {} Hz -> {} Hz ({} frames)",
            audio.sample_rate,
            SAMPLE_RATE,
            left.len()
        );
        resample_stereo(&left, &right, audio.sample_rate, SAMPLE_RATE)?
    } else {
        (left, right)
    };

    Ok(AudioData::from_stereo(&left, &right, SAMPLE_RATE))
}

/// Resamples a planar stereo pair, compensating the resampler delay so the
/// output is aligned with the input and `ceil(n * to / from)` frames long.
pub fn resample_stereo(
    left: &[f32],
    right: &[f32],
    from: u32,
    to: u32,
) -> Result<(Vec<f32>, Vec<f32>)> {
    if left.len() != right.len() {
        return Err(DetectError::Decode("L/R length mismatch".into()));
    }
    let n = left.len();
    let expected = (n as u64 * to as u64).div_ceil(from as u64) as usize;

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, RESAMPLE_CHUNK, 2, 2)
        .map_err(|e| DetectError::Decode(format!("resampler setup failed: {e}")))?;
    let delay = resampler.output_delay();

    let mut out = [
        Vec::with_capacity(expected + delay),
        Vec::with_capacity(expected + delay),
    ];
    let append = |chunk: Vec<Vec<f32>>, out: &mut [Vec<f32>; 2]| {
        for (dst, src) in out.iter_mut().zip(chunk) {
            dst.extend_from_slice(&src);
        }
    };

    let mut pos = 0usize;
    loop {
        let need = resampler.input_frames_next();
        if pos + need > n {
            break;
        }
        let chunk = [&left[pos..pos + need], &right[pos..pos + need]];
        let res = resampler
            .process(&chunk[..], None)
            .map_err(|e| DetectError::Decode(format!("resampling failed: {e}")))?;
        append(res, &mut out);
        pos += need;
    }

    if pos < n {
        let chunk = [&left[pos..], &right[pos..]];
        let res = resampler
            .process_partial(Some(&chunk[..]), None)
            .map_err(|e| DetectError::Decode(format!("resampling failed: {e}")))?;
        append(res, &mut out);
    }

    while out[0].len() < expected + delay {
        let res = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| DetectError::Decode(format!("resampling failed: {e}")))?;
        if res[0].is_empty() {
            break;
        }
        append(res, &mut out);
    }

    let [mut l, mut r] = out;
    for ch in [&mut l, &mut r] {
        let skip = delay.min(ch.len());
        ch.drain(..skip);
        ch.resize(expected, 0.0);
    }
    Ok((l, r))
}

pub fn write_audio<P: AsRef<Path>>(path: P, audio: &AudioData) -> Result<()> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec).context("create wav")?;
    for sample in &audio.samples {
        let s = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(s).context("write wav sample")?;
    }

    writer.finalize().context("finalize wav")?;
    Ok(())
}
