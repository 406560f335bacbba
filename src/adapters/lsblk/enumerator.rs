use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::domain::{decode_hex_escapes, DeviceIdentity};
use crate::ports::{BlockEnumerator, CommandRunner, CommandSpec};

/// Bulk enumeration through `lsblk -P` (one `KEY="value"` record per line)
pub struct LsblkEnumerator {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl LsblkEnumerator {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    fn command() -> CommandSpec {
        CommandSpec::new("lsblk")
            .arg("-P")
            .arg("-p")
            .arg("-o")
            .arg("NAME,UUID,LABEL,FSTYPE")
    }
}

#[async_trait]
impl BlockEnumerator for LsblkEnumerator {
    async fn enumerate(&self) -> Result<Vec<DeviceIdentity>, Box<dyn std::error::Error + Send + Sync>> {
        let output = Arc::clone(&self.runner).spawn(Self::command(), self.timeout).await??;
        if output.timed_out {
            return Err("lsblk timed out".into());
        }
        if !output.success() {
            return Err(format!("lsblk exited with {}: {}", output.exit_code, output.stderr.join(" ")).into());
        }

        let identities: Vec<DeviceIdentity> = output
            .stdout
            .iter()
            .filter_map(|line| {
                let identity = parse_record(line);
                if identity.is_none() {
                    trace!("Skipping unparsable lsblk line: {}", line);
                }
                identity
            })
            .collect();
        debug!("lsblk reported {} devices", identities.len());
        Ok(identities)
    }
}

/// Parse one `lsblk -P` line into an identity keyed by canonical device path
fn parse_record(line: &str) -> Option<DeviceIdentity> {
    let mut fields = parse_pairs(line)?;
    let name = fields.remove("NAME").filter(|n| !n.is_empty())?;
    let path = fs::canonicalize(&name)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or(name);

    Some(
        DeviceIdentity::new(path)
            .with_uuid(fields.remove("UUID"))
            .with_label(fields.remove("LABEL"))
            .with_filesystem(fields.remove("FSTYPE")),
    )
}

/// Split `KEY="value" KEY2="value"` into a map; `None` on any syntax error
fn parse_pairs(line: &str) -> Option<HashMap<String, String>> {
    let mut fields = HashMap::new();
    let mut rest = line.trim();
    while !rest.is_empty() {
        let (key, after_key) = rest.split_once('=')?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        let after_quote = after_key.strip_prefix('"')?;
        let (value, after_value) = after_quote.split_once('"')?;
        fields.insert(key.to_string(), decode_hex_escapes(value));
        rest = after_value.trim_start();
    }
    if fields.is_empty() {
        return None;
    }
    Some(fields)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::ports::{CommandError, CommandOutput};

    struct ScriptedRunner {
        output: CommandOutput,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, command: &CommandSpec, _timeout: Duration) -> Result<CommandOutput, CommandError> {
            self.seen.lock().unwrap().push(command.to_string());
            Ok(self.output.clone())
        }
    }

    fn runner(stdout: &[&str], exit_code: i32, timed_out: bool) -> Arc<ScriptedRunner> {
        Arc::new(ScriptedRunner {
            output: CommandOutput {
                exit_code,
                stdout: stdout.iter().map(|s| s.to_string()).collect(),
                stderr: Vec::new(),
                timed_out,
            },
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_parse_pairs() {
        let fields = parse_pairs(r#"NAME="/dev/sda1" UUID="1111-AAAA" LABEL="My\x20Disk" FSTYPE="vfat""#).unwrap();
        assert_eq!(fields["NAME"], "/dev/sda1");
        assert_eq!(fields["LABEL"], "My Disk");
        assert_eq!(fields["FSTYPE"], "vfat");
    }

    #[test]
    fn test_parse_pairs_rejects_garbage() {
        assert!(parse_pairs("lsblk: failed to access sysfs directory").is_none());
        assert!(parse_pairs(r#"NAME="/dev/sda"#).is_none());
        assert!(parse_pairs("").is_none());
    }

    #[test]
    fn test_parse_record_drops_empty_values() {
        let id = parse_record(r#"NAME="/nonexistent/sdb" UUID="" LABEL="" FSTYPE="""#).unwrap();
        assert_eq!(id.path, "/nonexistent/sdb");
        assert_eq!(id.uuid, None);
        assert_eq!(id.filesystem, None);
    }

    #[tokio::test]
    async fn test_enumerate_skips_bad_lines() {
        let runner = runner(
            &[
                r#"NAME="/nonexistent/sda" UUID="" LABEL="" FSTYPE="""#,
                "garbage",
                r#"NAME="/nonexistent/sda1" UUID="1111-AAAA" LABEL="boot" FSTYPE="vfat""#,
            ],
            0,
            false,
        );
        let enumerator = LsblkEnumerator::new(runner.clone(), Duration::from_secs(1));
        let ids = enumerator.enumerate().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[1].uuid.as_deref(), Some("1111-AAAA"));
        assert_eq!(
            runner.seen.lock().unwrap().as_slice(),
            ["lsblk -P -p -o NAME,UUID,LABEL,FSTYPE"]
        );
    }

    #[tokio::test]
    async fn test_enumerate_failure_is_error() {
        let timed_out = LsblkEnumerator::new(runner(&[], 124, true), Duration::from_secs(1));
        assert!(timed_out.enumerate().await.is_err());
        let failed = LsblkEnumerator::new(runner(&[], 1, false), Duration::from_secs(1));
        assert!(failed.enumerate().await.is_err());
    }
}
