//! Organ detection from an uploaded image

use crate::organ::OrganKey;

/// Maps image bytes to the organ they most likely show
pub trait Classifier {
    fn classify(&self, image: &[u8]) -> OrganKey;
}

/// Stand-in classifier that always reports the same organ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockClassifier {
    pub organ: OrganKey,
}

impl MockClassifier {
    pub fn new(organ: OrganKey) -> Self {
        Self { organ }
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new(OrganKey::Liver)
    }
}

impl Classifier for MockClassifier {
    fn classify(&self, image: &[u8]) -> OrganKey {
        tracing::debug!(bytes = image.len(), organ = %self.organ, "Mock classification");
        self.organ
    }
}
