//! Event discovery: records, validation, extraction and orchestration.
//!
//! - [`record`]: the canonical event record and event types
//! - [`title`]: title sanity checks
//! - [`dates`]: date normalization
//! - [`extractor`]: LLM field extraction
//! - [`pipeline`]: the per-query orchestrator
//! - [`format`]: chat rendering
//! - [`archive`]: archive lookup capability

pub mod archive;
pub mod dates;
pub mod extractor;
pub mod format;
pub mod pipeline;
pub mod record;
pub mod title;

pub use archive::ArchiveSearch;
pub use dates::DateNormalizer;
pub use extractor::{ExtractionError, FieldExtractor};
pub use pipeline::{EventBatch, EventPipeline, PipelineConfig, PipelineError, PipelineStats, UrlOutcome};
pub use record::{EventRecord, EventType};
pub use title::is_valid_title;
