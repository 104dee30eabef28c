pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod project;
pub mod publish;
pub mod query;
pub mod results;
pub mod search;

pub use config::{ConfigProvider, EncodingMode, FileConfigProvider, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use filters::ExclusionRules;
pub use metrics::{SearchMetrics, SessionStats};
pub use project::{Project, ProjectList, ProjectRegistry};
pub use publish::{channel, EventReceiver, NavigateTo, ResultPublisher, ResultTree, SearchEvent};
pub use query::{SearchQuery, SearchScope};
pub use results::{LineMatch, ProjectBatch, SearchFile};
pub use search::{SearchSession, SessionId, SessionOutcome, SessionState};
