use image::DynamicImage;
use log::{error, info, warn};

use super::image::ImageProcessor;
use super::ocr::{PreprocessedImage, RecognitionConfig, RecognitionEngine};
use crate::models::RecognitionAttempt;
use crate::utils::ExtractionError;

/// Result of a round of repeated recognition passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleOutcome {
    /// Winning transcription, empty when no pass produced text.
    pub text: String,
    pub attempted: usize,
    pub failed: usize,
}

impl EnsembleOutcome {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed
    }
}

pub struct EnsembleVoter;

impl EnsembleVoter {
    /// Majority text wins; ties go to the text seen first. When every text is
    /// unique the most confident attempt wins instead.
    pub fn vote(attempts: &[RecognitionAttempt]) -> Option<String> {
        let usable: Vec<&RecognitionAttempt> = attempts.iter().filter(|a| a.has_text()).collect();
        if usable.is_empty() {
            return None;
        }

        // (text, count) in order of first appearance
        let mut tallies: Vec<(&str, usize)> = Vec::new();
        for attempt in &usable {
            match tallies.iter_mut().find(|(text, _)| *text == attempt.text) {
                Some((_, count)) => *count += 1,
                None => tallies.push((attempt.text.as_str(), 1)),
            }
        }

        let (majority, votes) = tallies
            .iter()
            .fold((None, 0), |(best, best_votes), &(text, count)| {
                if count > best_votes {
                    (Some(text), count)
                } else {
                    (best, best_votes)
                }
            });

        if votes > 1 {
            info!("Ensemble majority: {} of {} attempts agree", votes, usable.len());
            return majority.map(str::to_string);
        }

        let best = usable.iter().fold(None::<&RecognitionAttempt>, |best, attempt| match best {
            Some(b) if b.confidence >= attempt.confidence => Some(b),
            _ => Some(*attempt),
        })?;
        info!(
            "Ensemble attempts all differ, taking highest confidence ({:.1})",
            best.confidence
        );
        Some(best.text.clone())
    }

    /// Run `runs` passes over the brightness-normalised image and vote. An
    /// unrecoverable engine error ends the round early.
    pub fn run<E: RecognitionEngine + ?Sized>(
        engine: &E,
        img: &DynamicImage,
        runs: usize,
    ) -> Result<EnsembleOutcome, ExtractionError> {
        let prepared = PreprocessedImage::new("ensemble", ImageProcessor::normalize_brightness(img));
        let config = RecognitionConfig::default();

        let mut attempts = Vec::with_capacity(runs);
        let mut failed = 0;
        for run in 0..runs {
            match engine.recognize(&prepared, &config) {
                Ok(raw) => attempts.push(RecognitionAttempt::from(raw)),
                Err(e) if !e.is_recoverable() => {
                    error!("Aborting ensemble at run {}: {}", run + 1, e);
                    return Err(e);
                }
                Err(e) => {
                    failed += 1;
                    warn!("Ensemble run {} failed: {}", run + 1, e);
                }
            }
        }

        Ok(EnsembleOutcome {
            text: Self::vote(&attempts).unwrap_or_default(),
            attempted: runs,
            failed,
        })
    }
}
