use std::fmt;

use super::{DiscardSupport, FsUsage, Health, SizeFormat, ThroughputSample};

/// Output columns in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    FsType,
    Size,
    FsUse,
    MountPoint,
    Smart,
    Label,
    Uuid,
    Model,
    Serial,
    Discard,
    ReadThroughput,
    WriteThroughput,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::Name,
        Column::FsType,
        Column::Size,
        Column::FsUse,
        Column::MountPoint,
        Column::Smart,
        Column::Label,
        Column::Uuid,
        Column::Model,
        Column::Serial,
        Column::Discard,
        Column::ReadThroughput,
        Column::WriteThroughput,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::FsType => "FSTYPE",
            Self::Size => "SIZE",
            Self::FsUse => "FSUSE%",
            Self::MountPoint => "MOUNTPOINT",
            Self::Smart => "SMART",
            Self::Label => "LABEL",
            Self::Uuid => "UUID",
            Self::Model => "MODEL",
            Self::Serial => "SERIAL",
            Self::Discard => "DISCARD",
            Self::ReadThroughput => "RTPUT",
            Self::WriteThroughput => "WTPUT",
        }
    }

    /// Case-insensitive lookup by header name
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_uppercase();
        match wanted.as_str() {
            "HEALTH" => return Some(Self::Smart),
            "FSUSE" | "USE%" => return Some(Self::FsUse),
            _ => {}
        }
        Self::ALL.into_iter().find(|c| c.header() == wanted)
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Set of selected columns, as a mask over [`Column::ALL`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSet(u16);

impl ColumnSet {
    pub fn all() -> Self {
        Self(Column::ALL.iter().fold(0, |mask, c| mask | c.bit()))
    }

    pub fn empty() -> Self {
        Self(0)
    }

    /// Build a selection from allow/deny lists of names.
    ///
    /// An empty allow-list selects every column. Unknown names are returned
    /// alongside the set and otherwise ignored.
    pub fn select<S: AsRef<str>>(include: &[S], exclude: &[S]) -> (Self, Vec<String>) {
        let mut unknown = Vec::new();
        let mut resolve = |names: &[S]| {
            let mut set = Self::empty();
            for name in names {
                match Column::from_name(name.as_ref()) {
                    Some(c) => set.insert(c),
                    None => unknown.push(name.as_ref().to_string()),
                }
            }
            set
        };

        let included = resolve(include);
        let excluded = resolve(exclude);
        let base = if include.is_empty() { Self::all() } else { included };
        (Self(base.0 & !excluded.0), unknown)
    }

    pub fn insert(&mut self, column: Column) {
        self.0 |= column.bit();
    }

    pub fn contains(&self, column: Column) -> bool {
        self.0 & column.bit() != 0
    }

    pub fn contains_any(&self, columns: &[Column]) -> bool {
        columns.iter().any(|c| self.contains(*c))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Column> + '_ {
        Column::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl Default for ColumnSet {
    fn default() -> Self {
        Self::all()
    }
}

/// One output row: a device paired with at most one mount
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRow {
    pub name: String,
    pub path: String,
    pub filesystem: String,
    pub size_bytes: u64,
    pub usage_percent: Option<f64>,
    pub mount_point: String,
    pub health: Health,
    pub label: String,
    pub uuid: String,
    pub model: String,
    pub serial: String,
    pub discard: DiscardSupport,
    pub throughput: ThroughputSample,
    pub fs_usage: Option<FsUsage>,
    pub parent_path: Option<String>,
    /// Mount without a backing block device (tmpfs, overlay, ...)
    pub pseudo: bool,
}

impl DeviceRow {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            filesystem: String::new(),
            size_bytes: 0,
            usage_percent: None,
            mount_point: String::new(),
            health: Health::NotAvailable,
            label: String::new(),
            uuid: String::new(),
            model: String::new(),
            serial: String::new(),
            discard: DiscardSupport::NotAvailable,
            throughput: ThroughputSample::zero(),
            fs_usage: None,
            parent_path: None,
            pseudo: false,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_mount(mut self, mount_point: impl Into<String>, usage: Option<FsUsage>) -> Self {
        self.mount_point = mount_point.into();
        self.usage_percent = usage.and_then(|u| u.usage_percent());
        self.fs_usage = usage.filter(|u| u.total_bytes > 0);
        self
    }

    pub fn is_mounted(&self) -> bool {
        !self.mount_point.is_empty()
    }

    pub fn is_formatted(&self) -> bool {
        !self.filesystem.is_empty()
    }

    /// Rendered text of one cell
    pub fn cell(&self, column: Column, sizes: &SizeFormat) -> String {
        match column {
            Column::Name => self.name.clone(),
            Column::FsType => self.filesystem.clone(),
            Column::Size => sizes.format(self.size_bytes as f64),
            Column::FsUse => self
                .usage_percent
                .map(|p| format!("{:.0}%", p))
                .unwrap_or_default(),
            Column::MountPoint => self.mount_point.clone(),
            Column::Smart => self.health.to_string(),
            Column::Label => self.label.clone(),
            Column::Uuid => self.uuid.clone(),
            Column::Model => self.model.clone(),
            Column::Serial => self.serial.clone(),
            Column::Discard => self.discard.to_string(),
            Column::ReadThroughput => sizes.format(self.throughput.read_bytes_per_sec),
            Column::WriteThroughput => sizes.format(self.throughput.write_bytes_per_sec),
        }
    }

    /// Rendered cells for the selected columns, in column order
    pub fn cells(&self, columns: &ColumnSet, sizes: &SizeFormat) -> Vec<String> {
        columns.iter().map(|c| self.cell(c, sizes)).collect()
    }
}
