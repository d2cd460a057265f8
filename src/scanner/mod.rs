pub mod discovery;
pub mod hashing;

use anyhow::Result;
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use crate::geo::Coordinates;
use crate::listing::VerifiedPhoto;
use crate::metadata::{self, CaptureMethod, ImageSource, PhotoMetadata};
use crate::verify::{Clock, Verifier};

pub use discovery::discover_images;
pub use hashing::fingerprint;

/// One photo submitted for processing.
#[derive(Debug, Clone)]
pub struct PhotoInput {
    pub source: ImageSource,
    pub capture_method: CaptureMethod,
    /// Device geolocation taken at capture time, used when the file has no GPS.
    pub fallback_location: Option<Coordinates>,
}

impl PhotoInput {
    pub fn new(source: ImageSource, capture_method: CaptureMethod) -> Self {
        Self {
            source,
            capture_method,
            fallback_location: None,
        }
    }

    pub fn with_fallback_location(mut self, location: Option<Coordinates>) -> Self {
        self.fallback_location = location;
        self
    }
}

#[derive(Debug, Clone)]
pub enum ProcessProgress {
    Started { total: usize },
    Processed { completed: usize, total: usize, file_name: String },
    Completed { total: usize },
}

/// Processes batches of photos in parallel.
pub struct PhotoProcessor<C: Clock> {
    verifier: Verifier<C>,
}

impl<C: Clock> PhotoProcessor<C> {
    pub fn new(verifier: Verifier<C>) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &Verifier<C> {
        &self.verifier
    }

    /// Extract and verify a single photo.
    pub fn process(&self, input: &PhotoInput, reference: Option<&Coordinates>) -> VerifiedPhoto {
        let file_name = input.source.file_name();

        let (metadata, fingerprint) = match input.source.read() {
            Ok(data) => (
                metadata::extract(&data, &file_name, input.capture_method),
                Some(fingerprint(&data)),
            ),
            Err(e) => {
                tracing::warn!("Could not load image {}: {}", file_name, e);
                (PhotoMetadata::empty(&file_name, input.capture_method), None)
            }
        };
        let metadata = metadata.with_fallback_location(input.fallback_location);

        VerifiedPhoto::new(image_ref(&input.source), fingerprint, metadata, reference, &self.verifier)
    }

    /// Process every input, returning results in input order regardless of
    /// completion order.
    pub fn process_batch(
        &self,
        inputs: &[PhotoInput],
        reference: Option<&Coordinates>,
        progress_tx: Option<mpsc::Sender<ProcessProgress>>,
    ) -> Vec<VerifiedPhoto> {
        let total = inputs.len();
        if let Some(ref tx) = progress_tx {
            let _ = tx.send(ProcessProgress::Started { total });
        }

        let completed = AtomicUsize::new(0);
        let photos: Vec<VerifiedPhoto> = inputs
            .par_iter()
            .map_with(progress_tx.clone(), |tx, input| {
                let photo = self.process(input, reference);
                if let Some(tx) = tx {
                    let _ = tx.send(ProcessProgress::Processed {
                        completed: completed.fetch_add(1, Ordering::SeqCst) + 1,
                        total,
                        file_name: photo.metadata.file_name.clone(),
                    });
                }
                photo
            })
            .collect();

        if let Some(ref tx) = progress_tx {
            let _ = tx.send(ProcessProgress::Completed { total });
        }

        photos
    }

    /// Discover images under `directory` and process them as one batch.
    pub fn process_directory(
        &self,
        directory: &Path,
        extensions: &[String],
        capture_method: CaptureMethod,
        reference: Option<&Coordinates>,
        progress_tx: Option<mpsc::Sender<ProcessProgress>>,
    ) -> Result<Vec<VerifiedPhoto>> {
        let inputs: Vec<PhotoInput> = discover_images(directory, extensions)?
            .into_iter()
            .map(|path| PhotoInput::new(ImageSource::Path(path), capture_method))
            .collect();

        tracing::info!("Processing {} photos from {}", inputs.len(), directory.display());
        Ok(self.process_batch(&inputs, reference, progress_tx))
    }
}

fn image_ref(source: &ImageSource) -> String {
    match source {
        ImageSource::Path(path) => path.to_string_lossy().to_string(),
        ImageSource::DataUrl { url, .. } => url.clone(),
        ImageSource::Bytes { file_name, .. } => file_name.clone(),
    }
}
