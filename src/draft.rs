use thiserror::Error;

use crate::models::{KnownHospital, NewReview};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("Hospital name is required")]
    MissingHospital,

    #[error("Review text is required")]
    MissingText,
}

/// The review form as typed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDraft {
    pub hospital_name: String,
    pub hospital_address: String,
    pub review_text: String,
}

impl ReviewDraft {
    pub fn pick_hospital(&mut self, h: &KnownHospital) {
        self.hospital_name = h.name.clone();
        self.hospital_address = h.address.clone();
    }

    /// Blank text has nothing worth analysing.
    pub fn preview_needed(&self) -> bool {
        !self.review_text.trim().is_empty()
    }

    pub fn validate(&self) -> Result<NewReview, DraftError> {
        let hospital_name = self.hospital_name.trim();
        if hospital_name.is_empty() {
            return Err(DraftError::MissingHospital);
        }
        let review_text = self.review_text.trim();
        if review_text.is_empty() {
            return Err(DraftError::MissingText);
        }
        Ok(NewReview {
            hospital_name: hospital_name.to_string(),
            hospital_address: self.hospital_address.trim().to_string(),
            review_text: review_text.to_string(),
        })
    }
}
