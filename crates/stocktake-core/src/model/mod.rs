pub mod component;
pub mod event;
pub mod period;
pub mod snapshot;

pub use component::ComponentRecord;
pub use event::{EventOrigin, ExternalEvent, SourceStatus};
pub use period::{PeriodKey, TimeRange};
pub use snapshot::{
    AnnotationPatch, Annotations, Classification, Snapshot, SnapshotRow, SnapshotState, Summary,
    TransitionSource,
};
