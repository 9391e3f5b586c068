use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TourError {
    // Raised by AudioBackend::acquire
    #[error("Audio asset '{0}' could not be loaded: {1}")]
    AudioUnavailable(String, String),
    #[error("Audio operation '{0}' failed: {1}")]
    AudioOperation(String, String),
    #[error("No audio is loaded for the active point of interest")]
    NoActiveAudio,
    #[error("No point of interest is bound to the player")]
    NoActivePoi,
    #[error("Seek fraction {0} is not a number between 0 and 1")]
    InvalidFraction(f64),
    #[error("Skip offset {0} is not a finite number of seconds")]
    InvalidSkip(f64),
    #[error("Playback speed must be a positive number, got {0}")]
    InvalidSpeed(f64),
    #[error("Unknown point of interest: {0}")]
    UnknownPoi(String),
    #[error("Duplicate point of interest id in catalog: {0}")]
    DuplicatePoi(String),
    #[error("Catalog Error: {0}")]
    CatalogError(String),
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),
}

impl TourError {
    pub fn audio_unavailable(asset: &str, reason: impl std::fmt::Display) -> Self {
        TourError::AudioUnavailable(asset.to_string(), reason.to_string())
    }

    pub fn audio_operation(operation: &str, reason: impl std::fmt::Display) -> Self {
        TourError::AudioOperation(operation.to_string(), reason.to_string())
    }

    pub fn catalog_error(message: impl std::fmt::Display) -> Self {
        TourError::CatalogError(message.to_string())
    }

    /// True when repeating the same action may succeed (the player shows a retry hint).
    pub fn is_retryable(&self) -> bool {
        match self {
            TourError::AudioUnavailable(..) => true,
            TourError::AudioOperation(..) => true,
            TourError::LocationUnavailable(_) => true,
            TourError::NoActiveAudio => false,
            TourError::NoActivePoi => false,
            TourError::InvalidFraction(_) => false,
            TourError::InvalidSkip(_) => false,
            TourError::InvalidSpeed(_) => false,
            TourError::UnknownPoi(_) => false,
            TourError::DuplicatePoi(_) => false,
            TourError::CatalogError(_) => false,
            TourError::InvalidTimeFormat(_) => false,
        }
    }
}
