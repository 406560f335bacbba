pub mod lsblk;
pub mod process;
pub mod procfs;
pub mod smartctl;

pub use lsblk::LsblkEnumerator;
pub use process::TokioCommandRunner;
pub use procfs::{ProcfsAdapter, ProcfsConfig};
pub use smartctl::SmartctlProbe;
