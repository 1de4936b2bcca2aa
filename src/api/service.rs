//! Transport-independent request handling.

use std::{fs, path::PathBuf};

use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    api::{access::AccessList, request::AnalyzeRequest},
    core::{detector::Detector, verdict::Verdict},
    error::{DetectError, Result},
    io::fetch::Fetch,
    types::Label,
};

/// Status code and JSON body a transport should send back.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn error(err: &DetectError) -> Self {
        Self {
            status: err.status_code(),
            body: json!({ "error": err.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<Option<f32>>,
    pub fake_count: usize,
    pub real_count: usize,
    pub analysis_result: Label,
}

impl From<Verdict> for PredictResponse {
    fn from(v: Verdict) -> Self {
        Self {
            predictions: v.predictions,
            fake_count: v.fake_count,
            real_count: v.real_count,
            analysis_result: v.label,
        }
    }
}

pub struct Service {
    detector: Detector,
    fetcher: Box<dyn Fetch>,
    access: AccessList,
    work_dir: PathBuf,
}

impl Service {
    pub fn new(detector: Detector, fetcher: Box<dyn Fetch>, access: AccessList, work_dir: PathBuf) -> Self {
        Self {
            detector,
            fetcher,
            access,
            work_dir,
        }
    }

    pub fn handle_predict(&self, caller: &str, body: &[u8]) -> ApiResponse {
        match self.predict(caller, body) {
            Ok(resp) => ApiResponse {
                status: 200,
                body: json!(resp),
            },
            Err(e) => {
                log::error!("{e} -- {caller}");
                ApiResponse::error(&e)
            }
        }
    }

    pub fn handle_status(&self) -> ApiResponse {
        status()
    }

    /// Runs one request. Everything acquired or derived lives in a scratch
    /// directory that is removed when this returns.
    pub fn predict(&self, caller: &str, body: &[u8]) -> Result<PredictResponse> {
        self.access.check(caller)?;
        let req = AnalyzeRequest::from_body(body)?;
        log::info!("{} request accepted -- {caller}", req.source.kind());

        fs::create_dir_all(&self.work_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("request-")
            .tempdir_in(&self.work_dir)?;

        let path = self.fetcher.fetch(&req.source, scratch.path())?;
        let verdict = self.detector.analyze_file(&path)?;
        log::info!("{} -- {caller}", verdict.label);

        Ok(verdict.into())
    }
}

/// Health check body.
pub fn status() -> ApiResponse {
    ApiResponse {
        status: 200,
        body: json!({ "status": "OK", "detail": "Server is healthy" }),
    }
}
