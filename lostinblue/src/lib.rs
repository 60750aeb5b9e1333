pub mod cache;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod search;

pub use cache::{ContentCache, FileData};
pub use catalog::{discover, Corpus};
pub use config::{ConfigOverrides, EncodingMode, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use filters::PathFilter;
pub use results::{FileError, FileResult, MatchResult, SearchOutput};
pub use search::{search, FailurePolicy, SearchOptions};
