use serde::{Deserialize, Serialize};

/// One record of the live mount table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    /// Raw source as reported, canonicalized when it is a path
    pub source: String,
    pub mount_point: String,
    pub filesystem: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_minor: Option<String>,
}

impl MountEntry {
    pub fn new(source: impl Into<String>, mount_point: impl Into<String>, filesystem: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mount_point: mount_point.into(),
            filesystem: filesystem.into(),
            options: Vec::new(),
            major_minor: None,
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_major_minor(mut self, major_minor: impl Into<String>) -> Self {
        self.major_minor = Some(major_minor.into());
        self
    }

    /// Identity token carried by the source, if any (`UUID=...` / `LABEL=...`)
    pub fn source_token(&self) -> Option<SourceToken<'_>> {
        if let Some(uuid) = self.source.strip_prefix("UUID=") {
            Some(SourceToken::Uuid(uuid))
        } else {
            self.source.strip_prefix("LABEL=").map(SourceToken::Label)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceToken<'a> {
    Uuid(&'a str),
    Label(&'a str),
}

/// Mount entries in encounter order
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

impl MountTable {
    pub fn new(entries: Vec<MountEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    pub fn by_major_minor(&self, major_minor: &str) -> Vec<&MountEntry> {
        self.entries
            .iter()
            .filter(|m| m.major_minor.as_deref() == Some(major_minor))
            .collect()
    }

    pub fn has_source_tokens(&self) -> (bool, bool) {
        let mut uuid = false;
        let mut label = false;
        for entry in &self.entries {
            match entry.source_token() {
                Some(SourceToken::Uuid(_)) => uuid = true,
                Some(SourceToken::Label(_)) => label = true,
                None => {}
            }
        }
        (uuid, label)
    }
}

/// Filesystem capacity as reported by statvfs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl FsUsage {
    pub fn new(total_bytes: u64, available_bytes: u64) -> Self {
        Self {
            total_bytes,
            available_bytes,
        }
    }

    /// `total - available`, so blocks reserved for root count as used
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    pub fn usage_percent(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some(self.used_bytes() as f64 / self.total_bytes as f64 * 100.0)
    }
}

/// Usage of a parent aggregated over its mounted children.
///
/// Children with zero capacity are ignored; `None` when nothing remains.
pub fn aggregate_usage_percent<'a>(children: impl IntoIterator<Item = &'a FsUsage>) -> Option<f64> {
    let (total, available) = children
        .into_iter()
        .filter(|u| u.total_bytes > 0)
        .fold((0u128, 0u128), |(t, a), u| {
            (t + u.total_bytes as u128, a + u.available_bytes as u128)
        });
    if total == 0 {
        return None;
    }
    Some((1.0 - available as f64 / total as f64) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_uses_available() {
        let usage = FsUsage::new(100_000_000, 40_000_000);
        assert_eq!(usage.used_bytes(), 60_000_000);
        assert_eq!(usage.usage_percent().map(|p| p.round()), Some(60.0));
        assert_eq!(FsUsage::new(0, 0).usage_percent(), None);
    }

    #[test]
    fn test_aggregate_skips_empty_children() {
        let children = [
            FsUsage::new(100, 50),
            FsUsage::new(300, 50),
            FsUsage::new(0, 0),
        ];
        let pct = aggregate_usage_percent(children.iter()).unwrap();
        assert!((pct - 75.0).abs() < 1e-9);
        assert_eq!(aggregate_usage_percent(std::iter::empty()), None);
        assert_eq!(aggregate_usage_percent([FsUsage::new(0, 0)].iter()), None);
    }

    #[test]
    fn test_table_lookups_keep_order() {
        let table = MountTable::new(vec![
            MountEntry::new("/dev/sda1", "/mnt/b", "ext4").with_major_minor("8:1"),
            MountEntry::new("UUID=abcd", "/boot", "vfat"),
            MountEntry::new("/dev/sda1", "/", "ext4").with_major_minor("8:1"),
        ]);
        let by_mm: Vec<_> = table.by_major_minor("8:1").iter().map(|m| m.mount_point.as_str()).collect();
        assert_eq!(by_mm, vec!["/mnt/b", "/"]);
        assert_eq!(table.has_source_tokens(), (true, false));
        assert_eq!(table.entries()[1].source_token(), Some(SourceToken::Uuid("abcd")));
    }
}
