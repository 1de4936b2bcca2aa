//! # deep-voice-detector
//!
//! Classifies a speech recording as synthetic or authentic: the vocal
//! track is isolated with a tiled mask network, sliced into one-second
//! segments, turned into log-mel images and scored by a classifier whose
//! per-segment scores are aggregated into a verdict.

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod model;
pub mod types;

pub use crate::{
    api::{
        access::AccessList,
        request::AnalyzeRequest,
        service::{status, ApiResponse, PredictResponse, Service},
    },
    config::DetectorConfig,
    core::{
        audio::{load_waveform, read_audio, write_audio},
        classifier::{Classifier, Scorer},
        detector::Detector,
        engine::{Device, DevicePreference, Models},
        features::FeatureExtractor,
        segmenter::segment,
        separator::{MaskModel, MaskPair, Separator},
        verdict::{DecisionPolicy, Verdict},
    },
    error::{DetectError, InferenceError, Result},
    io::{
        fetch::{DefaultFetcher, Fetch, Source},
        progress::Progress,
    },
    model::model_manager::{ensure_models, ModelFiles},
    types::{AudioData, DetectProgress, Label, SAMPLE_RATE},
};
