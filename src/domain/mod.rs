pub mod device;
pub mod health;
pub mod identity;
pub mod mount;
pub mod row;
pub mod throughput;
pub mod units;

pub use device::{device_name, BlockDevice, DiscardSupport, HardwareIdentity};
pub use health::Health;
pub use identity::{decode_hex_escapes, DeviceIdentity, IdentityMaps, SymlinkEntry};
pub use mount::{aggregate_usage_percent, FsUsage, MountEntry, MountTable, SourceToken};
pub use row::{Column, ColumnSet, DeviceRow};
pub use throughput::{IoCounters, SamplerCache, ThroughputSample};
pub use units::{parse_size, SizeFormat, UnitBase};
