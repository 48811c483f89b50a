use crate::error::HistoryError;

/// Result alias for history index operations
pub type HistoryResult<T> = Result<T, HistoryError>;
