use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::SourceToken;

/// Identity attributes reported for one device by a bulk enumeration source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub path: String,
    pub uuid: Option<String>,
    pub label: Option<String>,
    pub filesystem: Option<String>,
}

impl DeviceIdentity {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_uuid(mut self, uuid: Option<String>) -> Self {
        self.uuid = uuid.filter(|u| !u.is_empty());
        self
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label.filter(|l| !l.is_empty());
        self
    }

    pub fn with_filesystem(mut self, filesystem: Option<String>) -> Self {
        self.filesystem = filesystem.filter(|f| !f.is_empty());
        self
    }
}

/// A `by-uuid` / `by-label` symlink: link name and resolved target path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkEntry {
    pub name: String,
    pub target: String,
}

impl SymlinkEntry {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
        }
    }
}

/// devname -> UUID / label / filesystem type
#[derive(Debug, Clone, Default)]
pub struct IdentityMaps {
    uuid_of: HashMap<String, String>,
    label_of: HashMap<String, String>,
    fstype_of: HashMap<String, String>,
}

impl IdentityMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed UUIDs from symlinks in listing order; the first link per target wins.
    pub fn seed_uuids(&mut self, links: impl IntoIterator<Item = SymlinkEntry>) {
        seed_first_wins(&mut self.uuid_of, links);
    }

    /// Seed labels from symlinks in listing order; the first link per target wins.
    pub fn seed_labels(&mut self, links: impl IntoIterator<Item = SymlinkEntry>) {
        seed_first_wins(&mut self.label_of, links);
    }

    /// Fill gaps from a secondary source without touching existing values.
    pub fn fill_missing(&mut self, identity: &DeviceIdentity) {
        fill(&mut self.uuid_of, &identity.path, identity.uuid.as_ref());
        fill(&mut self.label_of, &identity.path, identity.label.as_ref());
        fill(&mut self.fstype_of, &identity.path, identity.filesystem.as_ref());
    }

    /// Apply the authoritative source. Present values overwrite unconditionally.
    pub fn overlay<'a>(&mut self, identities: impl IntoIterator<Item = &'a DeviceIdentity>) {
        for identity in identities {
            if let Some(uuid) = &identity.uuid {
                self.uuid_of.insert(identity.path.clone(), uuid.clone());
            }
            if let Some(label) = &identity.label {
                self.label_of.insert(identity.path.clone(), label.clone());
            }
            if let Some(fs) = &identity.filesystem {
                self.fstype_of.insert(identity.path.clone(), fs.clone());
            }
        }
    }

    pub fn uuid(&self, path: &str) -> Option<&str> {
        self.uuid_of.get(path).map(String::as_str)
    }

    pub fn label(&self, path: &str) -> Option<&str> {
        self.label_of.get(path).map(String::as_str)
    }

    pub fn filesystem(&self, path: &str) -> Option<&str> {
        self.fstype_of.get(path).map(String::as_str)
    }

    /// Device path owning a `UUID=` / `LABEL=` token (lowest path on ties)
    pub fn resolve_token(&self, token: SourceToken<'_>) -> Option<&str> {
        let (map, value) = match token {
            SourceToken::Uuid(v) => (&self.uuid_of, v),
            SourceToken::Label(v) => (&self.label_of, v),
        };
        map.iter()
            .filter(|(_, v)| v.as_str() == value)
            .map(|(path, _)| path.as_str())
            .min()
    }
}

fn seed_first_wins(map: &mut HashMap<String, String>, links: impl IntoIterator<Item = SymlinkEntry>) {
    for link in links {
        map.entry(link.target).or_insert(link.name);
    }
}

fn fill(map: &mut HashMap<String, String>, path: &str, value: Option<&String>) {
    if let Some(value) = value {
        map.entry(path.to_string()).or_insert_with(|| value.clone());
    }
}

/// Decode `\xHH` escapes as written by udev link names and `lsblk -P`
pub fn decode_hex_escapes(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1] == b'x' {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 2]), hex_digit(bytes[i + 3])) {
                out.push(hi << 4 | lo);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
