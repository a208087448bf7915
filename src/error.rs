use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("{0}")]
    Validation(String),
    #[error("item {index} is out of range (ledger has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed quotation file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("PDF rendering failed: {0}")]
    Render(String),
}
