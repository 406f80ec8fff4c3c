mod ingestor;
pub mod lifecycle;

pub use ingestor::{BatchStats, IngestError, Ingestor};
