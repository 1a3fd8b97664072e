/// Utterance recognizer module
///
/// Ties the feature extractor and the example classifier together behind a
/// single train/predict surface: an energy gate filters silence before any
/// extraction, per-frame MFCCs are averaged into one utterance vector, and
/// the outcome is a tagged result rather than a bare label string.

use crate::classifier::{ClassifierError, ExampleClassifier};
use crate::mfcc::{average_frames, MfccExtractor, FRAME_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default neighbor count for classification
pub const DEFAULT_K: usize = 10;

/// Default silence threshold on the mean-squared-sample scale
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 500.0;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Audio too short: need at least {0} samples for one frame")]
    InsufficientSamples(usize),
}

/// Recognizer configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Number of nearest neighbors consulted per classification
    pub k: usize,

    /// Mean squared sample energy below which input is treated as silence
    pub silence_threshold: f32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
        }
    }
}

impl RecognizerConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), RecognizerError> {
        if self.k == 0 {
            return Err(RecognizerError::InvalidConfig(
                "k must be at least 1".to_string(),
            ));
        }

        if !self.silence_threshold.is_finite() || self.silence_threshold < 0.0 {
            return Err(RecognizerError::InvalidConfig(
                "silence_threshold must be finite and non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// Outcome of a prediction
///
/// Silence, missing data, and a missing database are distinct outcomes,
/// never conflated with a real label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    /// Majority label among the k nearest stored examples
    Label(String),

    /// Energy gate triggered; extraction and classification were skipped
    Silence,

    /// Buffer yielded no analysis frames (shorter than one frame)
    NoSpeechData,

    /// No training examples have been stored
    NoExamples,
}

/// Utterance recognizer combining MFCC extraction and k-NN classification
pub struct UtteranceRecognizer {
    config: RecognizerConfig,
    extractor: MfccExtractor,
    classifier: ExampleClassifier,
}

impl UtteranceRecognizer {
    /// Create a recognizer with default configuration
    pub fn new() -> Self {
        Self {
            config: RecognizerConfig::default(),
            extractor: MfccExtractor::new(),
            classifier: ExampleClassifier::new(),
        }
    }

    /// Create a recognizer with custom configuration
    pub fn with_config(config: RecognizerConfig) -> Result<Self, RecognizerError> {
        config.validate()?;

        info!(
            "Initializing utterance recognizer: k={}, silence_threshold={}",
            config.k, config.silence_threshold
        );

        Ok(Self {
            config,
            extractor: MfccExtractor::new(),
            classifier: ExampleClassifier::new(),
        })
    }

    /// Record one labeled training utterance
    ///
    /// Extracts per-frame MFCCs, averages them into a single utterance
    /// vector, and appends it to the example database under `label`.
    pub fn train(&mut self, label: &str, pcm: &[i16]) -> Result<(), RecognizerError> {
        let frames = self.extractor.extract(pcm);
        let features =
            average_frames(&frames).ok_or(RecognizerError::InsufficientSamples(FRAME_SIZE))?;

        self.classifier.add_example(label, features);
        debug!(
            "Trained '{}' from {} frames ({} examples total)",
            label,
            frames.len(),
            self.classifier.example_count()
        );

        Ok(())
    }

    /// Classify one utterance
    pub fn predict(&self, pcm: &[i16]) -> Prediction {
        if pcm.is_empty() {
            return Prediction::NoSpeechData;
        }

        let energy = mean_squared_energy(pcm);
        if energy < self.config.silence_threshold {
            debug!("Silence detected (energy = {:.2}), skipping prediction", energy);
            return Prediction::Silence;
        }

        let frames = self.extractor.extract(pcm);
        let query = match average_frames(&frames) {
            Some(query) => query,
            None => return Prediction::NoSpeechData,
        };

        match self.classifier.recognize(&query, self.config.k) {
            Ok(result) => {
                debug!(
                    "Predicted '{}' ({}/{} votes)",
                    result.label, result.votes, result.neighbors
                );
                Prediction::Label(result.label)
            }
            Err(ClassifierError::EmptyDatabase) => {
                debug!("Prediction requested with no training examples");
                Prediction::NoExamples
            }
            Err(ClassifierError::ZeroNeighbors) => {
                // Config validation keeps k >= 1
                warn!("Classifier rejected neighbor count {}", self.config.k);
                Prediction::NoExamples
            }
        }
    }

    /// Total number of stored training examples
    pub fn example_count(&self) -> usize {
        self.classifier.example_count()
    }

    /// Number of distinct trained labels
    pub fn label_count(&self) -> usize {
        self.classifier.label_count()
    }

    /// Get current configuration
    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }
}

impl Default for UtteranceRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean of squared samples over the whole buffer
fn mean_squared_energy(pcm: &[i16]) -> f32 {
    let sum_squares: f64 = pcm
        .iter()
        .map(|&s| {
            let s = s as f64;
            s * s
        })
        .sum();

    (sum_squares / pcm.len() as f64) as f32
}
