pub mod category;
pub mod diff;
pub mod hours;
pub mod service;
pub mod status_update;

pub use category::ServiceCategory;
pub use diff::ServiceDiff;
pub use hours::{DailyWindow, OperatingHours};
pub use service::{OperatingStatus, PublicationState, Service};
pub use status_update::{ChangeKind, StatusUpdateRecord};
