//! Pipeline artifacts
//!
//! Layout of a binary artifact: the four magic bytes `DXPL`, then a bincode
//! [`Envelope`]. A JSON artifact is a single object carrying the same fields,
//! with the magic as a string. Either way the payload is the serialized
//! pipeline and the checksum is the hex SHA-256 digest of the payload bytes.

use crate::error::{PipelineError, Result};
use crate::evaluation::ClassificationReport;
use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const MAGIC: [u8; 4] = *b"DXPL";
const FORMAT_VERSION: u32 = 1;

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationFormat {
    /// bincode (compact)
    #[default]
    Binary,
    /// JSON (portable, human-readable)
    Json,
}

/// Descriptive data stored next to the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    /// Version of the crate that wrote the artifact
    pub version: String,
    /// RFC 3339 timestamp
    pub trained_at: String,
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub model_family: String,
    pub hyperparameters: BTreeMap<String, String>,
    /// Mean cross-validation score of the selected candidate
    pub cv_score: Option<f64>,
    pub scoring: Option<String>,
    pub test_metrics: Option<ClassificationReport>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: "model".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now().to_rfc3339(),
            feature_names: Vec::new(),
            target_name: "target".to_string(),
            model_family: "unknown".to_string(),
            hyperparameters: BTreeMap::new(),
            cv_score: None,
            scoring: None,
            test_metrics: None,
        }
    }
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.feature_names = features;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_name = target.into();
        self
    }

    pub fn with_model_family(mut self, family: impl Into<String>) -> Self {
        self.model_family = family.into();
        self
    }

    pub fn with_hyperparameters(mut self, params: BTreeMap<String, String>) -> Self {
        self.hyperparameters = params;
        self
    }

    pub fn with_cv_score(mut self, scoring: impl Into<String>, score: f64) -> Self {
        self.scoring = Some(scoring.into());
        self.cv_score = Some(score);
        self
    }

    pub fn with_test_metrics(mut self, report: ClassificationReport) -> Self {
        self.test_metrics = Some(report);
        self
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    metadata: ModelMetadata,
    payload: Vec<u8>,
    checksum: String,
}

#[derive(Serialize, Deserialize)]
struct JsonEnvelope {
    magic: String,
    format_version: u32,
    metadata: ModelMetadata,
    payload: String,
    checksum: String,
}

/// Hex SHA-256 digest
fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn encode(pipeline: &Pipeline, metadata: &ModelMetadata, format: SerializationFormat) -> Result<Vec<u8>> {
    match format {
        SerializationFormat::Binary => {
            let payload = bincode::serialize(pipeline)?;
            let envelope = Envelope {
                format_version: FORMAT_VERSION,
                metadata: metadata.clone(),
                checksum: checksum(&payload),
                payload,
            };
            let mut bytes = MAGIC.to_vec();
            bytes.extend(bincode::serialize(&envelope)?);
            Ok(bytes)
        }
        SerializationFormat::Json => {
            let payload = serde_json::to_string(pipeline)?;
            let envelope = JsonEnvelope {
                magic: String::from_utf8_lossy(&MAGIC).into_owned(),
                format_version: FORMAT_VERSION,
                metadata: metadata.clone(),
                checksum: checksum(payload.as_bytes()),
                payload,
            };
            Ok(serde_json::to_vec_pretty(&envelope)?)
        }
    }
}

fn decode(bytes: &[u8]) -> Result<(Pipeline, ModelMetadata)> {
    let (format_version, metadata, payload, expected, format) = if let Some(rest) = bytes.strip_prefix(&MAGIC) {
        let envelope: Envelope = bincode::deserialize(rest)?;
        (
            envelope.format_version,
            envelope.metadata,
            envelope.payload,
            envelope.checksum,
            SerializationFormat::Binary,
        )
    } else if bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{') {
        let envelope: JsonEnvelope = serde_json::from_slice(bytes)?;
        if envelope.magic.as_bytes() != MAGIC {
            return Err(PipelineError::SerializationError(format!(
                "bad magic '{}'",
                envelope.magic
            )));
        }
        (
            envelope.format_version,
            envelope.metadata,
            envelope.payload.into_bytes(),
            envelope.checksum,
            SerializationFormat::Json,
        )
    } else {
        return Err(PipelineError::SerializationError(
            "not a pipeline artifact".to_string(),
        ));
    };

    if format_version != FORMAT_VERSION {
        return Err(PipelineError::SerializationError(format!(
            "unsupported format version {} (expected {})",
            format_version, FORMAT_VERSION
        )));
    }
    if checksum(&payload) != expected {
        return Err(PipelineError::SerializationError(
            "checksum verification failed, artifact may be corrupted".to_string(),
        ));
    }

    let pipeline: Pipeline = match format {
        SerializationFormat::Binary => bincode::deserialize(&payload)?,
        SerializationFormat::Json => serde_json::from_slice(&payload)?,
    };
    Ok((pipeline, metadata))
}

/// Write a fitted pipeline and its metadata to `path`.
///
/// Missing parent directories are created. Any filesystem failure is an
/// `ArtifactWriteFailure` naming the path.
pub fn save_pipeline(
    pipeline: &Pipeline,
    metadata: &ModelMetadata,
    path: impl AsRef<Path>,
    format: SerializationFormat,
) -> Result<()> {
    let path = path.as_ref();
    if !pipeline.is_fitted() {
        return Err(PipelineError::ModelNotFitted);
    }

    let bytes = encode(pipeline, metadata, format)?;
    let write_failure = |source: std::io::Error| PipelineError::ArtifactWriteFailure {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_failure)?;
    }
    let file = File::create(path).map_err(write_failure)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes).map_err(write_failure)?;
    writer.flush().map_err(write_failure)?;

    info!(path = %path.display(), bytes = bytes.len(), format = ?format, "Pipeline saved");
    Ok(())
}

/// Read an artifact written by [`save_pipeline`]; the format is detected
/// from its leading bytes.
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<(Pipeline, ModelMetadata)> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| PipelineError::DataUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    decode(&bytes)
}
