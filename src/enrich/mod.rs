pub mod genre;
pub mod record;
pub mod style;
pub mod taxonomy;

pub use genre::{classify, Classification};
pub use record::{assemble, EnrichedRecord};
pub use style::{analyze, StyleMetrics};
pub use taxonomy::Taxonomy;
