pub mod access;
pub mod aggregate;
pub mod count_key;
pub mod error;
pub mod form;
pub mod metrics;
pub mod model;
pub mod schema;

pub use access::Capabilities;
pub use aggregate::{AnnotatedResult, DateWindow, PeriodReport, ResultDetail, TrendSeries};
pub use count_key::{CategoryKey, CountKey, CountsMap};
pub use error::ValidationError;
pub use metrics::{ItemShare, Metrics, Rank, compute_metrics};
pub use model::{
    InstanceStatus, NewResult, Preset, ResultRecord, Role, SurveyInstance, SurveyTemplate, User,
    WorkListsPayload,
};
pub use schema::period;
