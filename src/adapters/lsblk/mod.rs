mod enumerator;

pub use enumerator::LsblkEnumerator;
