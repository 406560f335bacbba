mod probe;

pub use probe::SmartctlProbe;
