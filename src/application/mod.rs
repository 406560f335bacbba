mod filter;
mod merge;
mod snapshot;

pub use filter::{project, select_columns, ProjectedRow, Projection, RowFilter};
pub use snapshot::{SnapshotOptions, SnapshotService};
