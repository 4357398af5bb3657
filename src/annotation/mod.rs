pub mod biotypes;
pub mod mirbase;
pub mod retrieve;

pub use biotypes::{AnnotationSource, prepare_biotypes};
pub use mirbase::{CuratedFilter, filter_curated_reference};
pub use retrieve::{Fetched, HttpRetriever, Retriever};
