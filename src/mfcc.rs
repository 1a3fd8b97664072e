/// MFCC feature extraction module
///
/// Converts raw 16-bit mono PCM into mel-frequency cepstral coefficient
/// vectors, one per overlapping analysis frame. The filterbank, Hamming
/// window, and DCT basis are precomputed once at construction.

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;
use tracing::{debug, trace};

/// Expected input sample rate (16kHz mono PCM)
pub const SAMPLE_RATE: usize = 16_000;

/// Analysis frame length in samples (~32ms at 16kHz)
pub const FRAME_SIZE: usize = 512;

/// Stride between frames (50% overlap)
pub const FRAME_SHIFT: usize = 256;

/// Number of cepstral coefficients per frame
pub const NUM_MFCC: usize = 13;

/// Number of triangular mel filters
pub const NUM_MEL_BANDS: usize = 26;

/// One-sided spectrum size for a real FFT of FRAME_SIZE samples
pub const NUM_SPECTRUM_BINS: usize = FRAME_SIZE / 2 + 1;

/// MFCC feature vector for a single frame
pub type MfccVector = [f32; NUM_MFCC];

/// Stabilizing floor added to mel energies before log compression
const LOG_FLOOR: f32 = 1e-6;

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// MFCC feature extractor
///
/// All derived tables are built once in `new` and shared (read-only) across
/// every extraction performed by this instance.
pub struct MfccExtractor {
    filterbank: Vec<[f32; NUM_SPECTRUM_BINS]>,
    window: [f32; FRAME_SIZE],
    dct_basis: [[f32; NUM_MEL_BANDS]; NUM_MFCC],
    fft: Arc<dyn RealToComplex<f32>>,
}

impl MfccExtractor {
    /// Create a new extractor with precomputed filterbank, window, and FFT plan
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FRAME_SIZE);

        debug!(
            "Initializing MFCC extractor: frame_size={}, frame_shift={}, mel_bands={}, coeffs={}",
            FRAME_SIZE, FRAME_SHIFT, NUM_MEL_BANDS, NUM_MFCC
        );

        Self {
            filterbank: Self::mel_filterbank(),
            window: Self::hamming_window(),
            dct_basis: Self::dct_basis(),
            fft,
        }
    }

    /// Extract one MFCC vector per analysis frame, in chronological order
    ///
    /// Returns an empty sequence if `pcm` holds fewer than `FRAME_SIZE`
    /// samples. Trailing partial frames are dropped, never padded. Samples
    /// are taken as-is (no scaling), matching the fixed-point input range
    /// the example database was trained on.
    pub fn extract(&self, pcm: &[i16]) -> Vec<MfccVector> {
        let mut features = Vec::new();
        if pcm.len() < FRAME_SIZE {
            trace!(
                "Buffer too short for one frame: {} < {}",
                pcm.len(),
                FRAME_SIZE
            );
            return features;
        }

        let signal: Vec<f32> = pcm.iter().map(|&s| s as f32).collect();
        let mut spectrum = vec![Complex::new(0.0f32, 0.0f32); NUM_SPECTRUM_BINS];
        let mut frame = [0.0f32; FRAME_SIZE];

        let mut start = 0;
        while start + FRAME_SIZE <= signal.len() {
            frame.copy_from_slice(&signal[start..start + FRAME_SIZE]);
            for (sample, coef) in frame.iter_mut().zip(self.window.iter()) {
                *sample *= coef;
            }

            self.fft
                .process(&mut frame, &mut spectrum)
                .expect("FFT processing failed");

            let mut power = [0.0f32; NUM_SPECTRUM_BINS];
            for (p, c) in power.iter_mut().zip(spectrum.iter()) {
                *p = c.re * c.re + c.im * c.im;
            }

            let mut log_mel = [0.0f32; NUM_MEL_BANDS];
            for (energy, filter) in log_mel.iter_mut().zip(self.filterbank.iter()) {
                let banded: f32 = power
                    .iter()
                    .zip(filter.iter())
                    .map(|(&p, &w)| p * w)
                    .sum();
                *energy = (banded + LOG_FLOOR).ln();
            }

            let mut coeffs = [0.0f32; NUM_MFCC];
            for (coeff, basis) in coeffs.iter_mut().zip(self.dct_basis.iter()) {
                *coeff = log_mel
                    .iter()
                    .zip(basis.iter())
                    .map(|(&e, &b)| e * b)
                    .sum();
            }

            features.push(coeffs);
            start += FRAME_SHIFT;
        }

        trace!("Extracted {} MFCC frames from {} samples", features.len(), pcm.len());
        features
    }

    /// Hamming window coefficients for one frame
    fn hamming_window() -> [f32; FRAME_SIZE] {
        let mut window = [0.0f32; FRAME_SIZE];
        for (i, coef) in window.iter_mut().enumerate() {
            *coef = 0.54 - 0.46 * (2.0 * PI * i as f32 / (FRAME_SIZE - 1) as f32).cos();
        }
        window
    }

    /// FFT bin index for each of the NUM_MEL_BANDS + 2 mel points
    ///
    /// Indices are truncated, not rounded, to stay bit-compatible with
    /// feature vectors produced by the original fixed-point extractor.
    fn mel_bin_points() -> Vec<usize> {
        let mel_low = hz_to_mel(0.0);
        let mel_high = hz_to_mel(SAMPLE_RATE as f32 / 2.0);

        (0..NUM_MEL_BANDS + 2)
            .map(|i| {
                let mel = mel_low + (mel_high - mel_low) * i as f32 / (NUM_MEL_BANDS + 1) as f32;
                (mel_to_hz(mel) * FRAME_SIZE as f32 / SAMPLE_RATE as f32) as usize
            })
            .collect()
    }

    /// Triangular mel filterbank (NUM_MEL_BANDS rows over the one-sided spectrum)
    ///
    /// Filter m rises linearly from 0 at bin_points[m] to 1 at
    /// bin_points[m+1], then falls back to 0 at bin_points[m+2]; weights are
    /// zero outside that range.
    fn mel_filterbank() -> Vec<[f32; NUM_SPECTRUM_BINS]> {
        let bin_points = Self::mel_bin_points();
        let mut filters = vec![[0.0f32; NUM_SPECTRUM_BINS]; NUM_MEL_BANDS];

        for (m, filter) in filters.iter_mut().enumerate() {
            let lower = bin_points[m];
            let peak = bin_points[m + 1];
            let upper = bin_points[m + 2];

            for k in lower..peak {
                filter[k] = (k - lower) as f32 / (peak - lower) as f32;
            }
            for k in peak..upper {
                filter[k] = (upper - k) as f32 / (upper - peak) as f32;
            }
        }

        filters
    }

    /// Type-II DCT basis, one row per output coefficient (raw sum, no scaling)
    fn dct_basis() -> [[f32; NUM_MEL_BANDS]; NUM_MFCC] {
        let mut basis = [[0.0f32; NUM_MEL_BANDS]; NUM_MFCC];
        for (k, row) in basis.iter_mut().enumerate() {
            for (m, b) in row.iter_mut().enumerate() {
                *b = (PI * k as f32 * (m as f32 + 0.5) / NUM_MEL_BANDS as f32).cos();
            }
        }
        basis
    }
}

impl Default for MfccExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Element-wise arithmetic mean across per-frame MFCC vectors
///
/// Returns `None` when no frames were produced; callers must treat that as
/// a distinct no-data outcome rather than a zero vector.
pub fn average_frames(frames: &[MfccVector]) -> Option<MfccVector> {
    if frames.is_empty() {
        return None;
    }

    let mut avg = [0.0f32; NUM_MFCC];
    for frame in frames {
        for (a, &c) in avg.iter_mut().zip(frame.iter()) {
            *a += c;
        }
    }
    for a in avg.iter_mut() {
        *a /= frames.len() as f32;
    }

    Some(avg)
}
