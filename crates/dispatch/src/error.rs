use courier_core::CoreError;
use courier_db::DbError;

/// Errors surfaced by the admission path.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// A batch item failed validation; the whole batch is rejected and the
    /// offending position is reported.
    #[error("notification {index}: {source}")]
    BatchItem {
        index: usize,
        #[source]
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Attach a batch position to an item-level error.
    pub fn at_index(self, index: usize) -> Self {
        ServiceError::BatchItem {
            index,
            source: Box::new(self),
        }
    }
}
