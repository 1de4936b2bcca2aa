//! ONNX Runtime backends for the separation and classification networks.

use crate::{
    core::{
        classifier::Scorer,
        separator::{MaskModel, MaskPair},
    },
    error::{DetectError, InferenceError, Result},
    model::model_manager::ModelFiles,
};

use ndarray::{Array3, Array4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

/// Requested execution device. `Auto` picks the best available one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Auto,
    Cpu,
    Cuda,
    Coreml,
}

impl std::str::FromStr for DevicePreference {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "coreml" => Ok(Self::Coreml),
            other => Err(DetectError::Validation(format!("unknown device {other:?}"))),
        }
    }
}

/// Execution device both sessions are built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Cuda,
    CoreMl,
    Cpu,
}

impl Device {
    /// Resolves a preference to a device that can actually be used. An
    /// unavailable explicit choice falls back to CPU with a warning.
    pub fn detect(pref: DevicePreference) -> Device {
        let wanted = match pref {
            DevicePreference::Cpu => return Device::Cpu,
            DevicePreference::Cuda => Device::Cuda,
            DevicePreference::Coreml => Device::CoreMl,
            DevicePreference::Auto => {
                return Self::by_priority()
                    .into_iter()
                    .find(|d| d.is_available())
                    .unwrap_or(Device::Cpu)
            }
        };
        if wanted.is_available() {
            wanted
        } else {
            log::warn!("{wanted} requested but not available, using CPU");
            Device::Cpu
        }
    }

    pub fn by_priority() -> [Device; 3] {
        [Device::Cuda, Device::CoreMl, Device::Cpu]
    }

    pub fn is_available(&self) -> bool {
        match self {
            Device::Cpu => true,
            #[cfg(feature = "cuda")]
            Device::Cuda => {
                std::env::var("CUDA_PATH").is_ok() || Path::new("/usr/local/cuda").exists()
            }
            #[cfg(not(feature = "cuda"))]
            Device::Cuda => false,
            #[cfg(all(feature = "coreml", target_os = "macos"))]
            Device::CoreMl => true,
            #[cfg(not(all(feature = "coreml", target_os = "macos")))]
            Device::CoreMl => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::CoreMl => "coreml",
            Device::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn load_err(path: &Path, e: impl std::fmt::Display) -> DetectError {
    DetectError::ModelLoad(format!("{}: {e}", path.display()))
}

pub fn build_session(path: &Path, device: Device) -> Result<Session> {
    let mut builder = Session::builder()
        .map_err(|e| load_err(path, e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| load_err(path, e))?;

    match device {
        #[cfg(feature = "cuda")]
        Device::Cuda => {
            use ort::execution_providers::CUDAExecutionProvider;
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| load_err(path, e))?;
        }
        #[cfg(feature = "coreml")]
        Device::CoreMl => {
            use ort::execution_providers::CoreMLExecutionProvider;
            builder = builder
                .with_execution_providers([CoreMLExecutionProvider::default().build()])
                .map_err(|e| load_err(path, e))?;
        }
        _ => {
            let threads = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| load_err(path, e))?;
        }
    }

    let session = builder.commit_from_file(path).map_err(|e| load_err(path, e))?;
    log::info!("loaded {} on {device}", path.display());
    Ok(session)
}

/// Separation network: normalized magnitude tiles in, vocal and background
/// masks covering each tile's central ROI out.
pub struct OrtMaskModel {
    session: Mutex<Session>,
    offset: usize,
    input: String,
    vocal_output: String,
    background_output: String,
}

impl OrtMaskModel {
    pub fn new(
        session: Session,
        offset: usize,
        input: String,
        vocal_output: String,
        background_output: String,
    ) -> Self {
        Self {
            session: Mutex::new(session),
            offset,
            input,
            vocal_output,
            background_output,
        }
    }
}

impl MaskModel for OrtMaskModel {
    fn offset(&self) -> usize {
        self.offset
    }

    fn predict_masks(&self, batch: &Array4<f32>) -> Result<MaskPair> {
        let (b, ch, bins, _) = batch.dim();
        let shape: Vec<usize> = batch.shape().to_vec();
        let data: Vec<f32> = batch.iter().copied().collect();
        let tensor = Tensor::from_array((shape, data))
            .map_err(|e| DetectError::Separation(format!("mask input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::Separation("separator session poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![self.input.as_str() => tensor])
            .map_err(|e| DetectError::Separation(format!("separator inference: {e}")))?;

        let extract = |name: &str| -> Result<Array4<f32>> {
            let (_, value) = outputs
                .iter()
                .find(|(n, _)| *n == name)
                .ok_or_else(|| DetectError::Separation(format!("separator has no output {name:?}")))?;
            let (_shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectError::Separation(format!("{name}: {e}")))?;
            let roi = data.len() / (b * ch * bins).max(1);
            Array4::from_shape_vec((b, ch, bins, roi), data.to_vec())
                .map_err(|e| DetectError::Separation(format!("{name}: {e}")))
        };

        let vocal = extract(&self.vocal_output)?;
        let background = extract(&self.background_output)?;
        Ok(MaskPair { vocal, background })
    }
}

/// Classification network: one (1, 128, 128, 1) tensor in, first scalar out.
pub struct OrtScorer {
    session: Mutex<Session>,
    input: String,
    output: Option<String>,
}

impl OrtScorer {
    pub fn new(session: Session, input: String, output: Option<String>) -> Self {
        Self {
            session: Mutex::new(session),
            input,
            output,
        }
    }
}

impl Scorer for OrtScorer {
    fn score(&self, features: &Array3<f32>) -> std::result::Result<f32, InferenceError> {
        let mut shape = vec![1usize];
        shape.extend_from_slice(features.shape());
        let data: Vec<f32> = features.iter().copied().collect();
        let tensor = Tensor::from_array((shape, data))
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Runtime("classifier session poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![self.input.as_str() => tensor])
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        let (_, value) = match &self.output {
            Some(name) => outputs.iter().find(|(n, _)| *n == name.as_str()),
            None => outputs.iter().next(),
        }
        .ok_or(InferenceError::EmptyOutput)?;

        let (_shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        data.first().copied().ok_or(InferenceError::EmptyOutput)
    }
}

/// Both networks, loaded once and shared by every request.
pub struct Models {
    pub device: Device,
    pub separator: Arc<OrtMaskModel>,
    pub classifier: Arc<OrtScorer>,
    pub crop_size: usize,
    pub batch_size: usize,
}

impl Models {
    pub fn load(files: &ModelFiles, device: Device) -> Result<Self> {
        let m = &files.manifest;
        let separator = Arc::new(OrtMaskModel::new(
            build_session(&files.separator, device)?,
            m.separator.offset,
            m.separator.input.clone(),
            m.separator.vocal_output.clone(),
            m.separator.background_output.clone(),
        ));
        let classifier = Arc::new(OrtScorer::new(
            build_session(&files.classifier, device)?,
            m.classifier.input.clone(),
            m.classifier.output.clone(),
        ));
        Ok(Self {
            device,
            separator,
            classifier,
            crop_size: m.separator.crop_size,
            batch_size: m.separator.batch_size,
        })
    }
}
