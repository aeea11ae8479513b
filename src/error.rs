use thiserror::Error;

#[derive(Debug, Error)]
pub enum CohortError {
    #[error("export document unreadable: {0}")]
    DocumentUnreadable(String),
    #[error("export is {bytes} bytes, above the {limit} byte ingest ceiling")]
    InputTooLarge { bytes: usize, limit: usize },
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
}

impl CohortError {
    pub fn code(&self) -> CohortErrorCode {
        match self {
            Self::DocumentUnreadable(_) => CohortErrorCode::E001DocumentUnreadable,
            Self::InputTooLarge { .. } => CohortErrorCode::E002InputTooLarge,
            Self::InvalidConfig(_) => CohortErrorCode::E003ConfigInvalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortErrorCode {
    E001DocumentUnreadable,
    E002InputTooLarge,
    E003ConfigInvalid,
}

impl CohortErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001DocumentUnreadable => "E001_DOCUMENT_UNREADABLE",
            Self::E002InputTooLarge => "E002_INPUT_TOO_LARGE",
            Self::E003ConfigInvalid => "E003_CONFIG_INVALID",
        }
    }
}
