use thiserror::Error;

/// Unit base for human-readable sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitBase {
    /// KiB, MiB, ...
    Binary,
    /// KB, MB, ...
    Decimal,
}

impl UnitBase {
    fn factor(self) -> f64 {
        match self {
            Self::Binary => 1024.0,
            Self::Decimal => 1000.0,
        }
    }

    fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Binary => &["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"],
            Self::Decimal => &["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"],
        }
    }
}

/// How byte quantities are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFormat {
    pub base: UnitBase,
    pub raw: bool,
}

impl SizeFormat {
    pub fn new(base: UnitBase, raw: bool) -> Self {
        Self { base, raw }
    }

    pub fn human(base: UnitBase) -> Self {
        Self::new(base, false)
    }

    pub fn format(&self, bytes: f64) -> String {
        if self.raw {
            return format!("{}", bytes.round() as u64);
        }
        format_bytes(bytes, self.base)
    }
}

impl Default for SizeFormat {
    fn default() -> Self {
        Self::human(UnitBase::Binary)
    }
}

/// `500107862016` -> `465.76 GiB` (binary) or `500.11 GB` (decimal)
pub fn format_bytes(bytes: f64, base: UnitBase) -> String {
    let factor = base.factor();
    let labels = base.labels();
    let mut size = bytes.max(0.0);
    let mut n = 0;
    // A value equal to the factor stays in the smaller unit
    while size > factor && n + 1 < labels.len() {
        size /= factor;
        n += 1;
    }
    format!("{:.2} {}", size, labels[n])
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid size '{0}': expected 'number [unit]', e.g. '1.5 GiB'")]
pub struct ParseSizeError(String);

/// Parse a human-readable size back into bytes.
///
/// An `i` in the unit (`GiB`, `Gi`) forces base 1024; otherwise `default_base` applies.
pub fn parse_size(input: &str, default_base: UnitBase) -> Result<u64, ParseSizeError> {
    let s = input.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|_| ParseSizeError(input.to_string()))?;

    let unit = unit.trim().to_lowercase();
    let unit = unit.strip_suffix('b').unwrap_or(&unit);
    let (unit, base) = match unit.strip_suffix('i') {
        Some(u) => (u, UnitBase::Binary),
        None => (unit, default_base),
    };
    let power = match unit {
        "" => 0,
        "k" => 1,
        "m" => 2,
        "g" => 3,
        "t" => 4,
        "p" => 5,
        "e" => 6,
        _ => return Err(ParseSizeError(input.to_string())),
    };
    Ok((number * base.factor().powi(power)) as u64)
}
