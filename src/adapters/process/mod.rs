mod runner;

pub use runner::TokioCommandRunner;
