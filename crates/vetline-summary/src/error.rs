use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    /// The analysis request never produced a usable HTTP response.
    #[error("analysis request failed: {0}")]
    Http(String),

    /// The analysis service answered, but not with a parseable summary.
    #[error("unusable analysis response: {0}")]
    BadResponse(String),
}
