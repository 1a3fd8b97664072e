/// Utterance recognizer library
///
/// This library extracts MFCC feature vectors from raw 16kHz mono PCM and
/// classifies utterances against a labeled example set using k-nearest-
/// neighbor voting.

pub mod classifier;
pub mod mfcc;
pub mod recognizer;

// Re-export main types
pub use classifier::{Classification, ClassifierError, ExampleClassifier};
pub use mfcc::{
    average_frames, MfccExtractor, MfccVector, FRAME_SHIFT, FRAME_SIZE, NUM_MEL_BANDS, NUM_MFCC,
    SAMPLE_RATE,
};
pub use recognizer::{Prediction, RecognizerConfig, RecognizerError, UtteranceRecognizer};
