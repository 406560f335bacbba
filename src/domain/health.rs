use std::fmt;

/// Normalized result of a disk health probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Ok,
    /// Any other self-assessment the drive reported (e.g. `FAILED!`)
    Reported(String),
    /// The device node is not readable with current privileges
    Denied,
    /// Probe tool absent, timed out, or gave no verdict
    NotAvailable,
}

impl Health {
    /// Parse `smartctl -H` style output.
    ///
    /// The verdict is the text after the last colon of a line mentioning
    /// "health"; a verdict containing "passed" normalizes to `OK`.
    pub fn from_probe_output<S: AsRef<str>>(lines: &[S]) -> Option<Self> {
        let mut verdict = None;
        for line in lines {
            let line = line.as_ref();
            if !line.to_lowercase().contains("health") {
                continue;
            }
            let Some((_, tail)) = line.rsplit_once(':') else {
                continue;
            };
            let tail = tail.trim().to_uppercase();
            if tail.is_empty() {
                continue;
            }
            verdict = Some(if tail.contains("PASSED") {
                Self::Ok
            } else {
                Self::Reported(tail)
            });
        }
        verdict
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::Reported(s) => s,
            Self::Denied => "DENIED",
            Self::NotAvailable => "N/A",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
