use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Migration lifecycle status as reported by the daemon.
///
/// Only four statuses are spelled out on the wire. Anything else means the
/// migration is still in progress and decodes as `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    None,
    Completed,
    Failed,
    Interrupted,
    #[serde(other)]
    Running,
}

impl MigrationStatus {
    /// `completed`, `failed` and `interrupted` end a migration.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Interrupted)
    }

    /// True when no further progress is expected from the daemon, which
    /// includes `none` (nothing to watch).
    pub fn is_settled(&self) -> bool {
        self.is_terminal() || *self == Self::None
    }
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Transfer progress of one resource (a disk, or the VM memory state).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatInfo {
    /// Completion in percent. Nominally 0..=100, but the daemon is not
    /// trusted to stay inside that range.
    #[serde(default)]
    pub percent: i64,
}

impl StatInfo {
    pub fn new(percent: i64) -> Self {
        Self { percent }
    }
}

/// One snapshot of a migration, as returned by `GetMigrationStat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStat {
    pub status: MigrationStatus,
    /// Destination host name, set once the migration has been started.
    #[serde(default)]
    pub dst_server: String,
    /// Failure description, populated on `failed`.
    #[serde(default)]
    pub desc: String,
    /// Per-disk progress keyed by disk path.
    #[serde(default)]
    pub disks: BTreeMap<String, StatInfo>,
    /// Progress of the hypervisor in-memory state.
    #[serde(default)]
    pub qemu: StatInfo,
}

impl MigrationStat {
    /// A snapshot with no disks and no progress.
    pub fn with_status(status: MigrationStatus) -> Self {
        Self {
            status,
            dst_server: String::new(),
            desc: String::new(),
            disks: BTreeMap::new(),
            qemu: StatInfo::default(),
        }
    }

    pub fn with_disk(mut self, path: &str, percent: i64) -> Self {
        self.disks.insert(path.to_string(), StatInfo::new(percent));
        self
    }

    pub fn with_vm_state(mut self, percent: i64) -> Self {
        self.qemu = StatInfo::new(percent);
        self
    }

    pub fn with_dst_server(mut self, host: &str) -> Self {
        self.dst_server = host.to_string();
        self
    }

    pub fn with_desc(mut self, desc: &str) -> Self {
        self.desc = desc.to_string();
        self
    }
}

/// Parameters of `StartMigrationProcess` and `CopyConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationParams {
    pub dst_server: String,
    /// Disks to migrate live. Empty means memory state only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<String>,
    #[serde(default)]
    pub overrides: MigrationOverrides,
}

/// Renames applied on the destination host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOverrides {
    /// Source disk path -> destination disk path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub disks: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_decodes_known_names() {
        for (raw, expected) in [
            ("\"none\"", MigrationStatus::None),
            ("\"completed\"", MigrationStatus::Completed),
            ("\"failed\"", MigrationStatus::Failed),
            ("\"interrupted\"", MigrationStatus::Interrupted),
            ("\"running\"", MigrationStatus::Running),
        ] {
            let parsed: MigrationStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(parsed, expected, "decoding {raw}");
        }
    }

    #[test]
    fn test_unknown_status_is_running() {
        let parsed: MigrationStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(parsed, MigrationStatus::Running);

        let parsed: MigrationStatus = serde_json::from_str("\"setup\"").unwrap();
        assert_eq!(parsed, MigrationStatus::Running);
    }

    #[test]
    fn test_terminal_and_settled() {
        assert!(MigrationStatus::Completed.is_terminal());
        assert!(MigrationStatus::Failed.is_terminal());
        assert!(MigrationStatus::Interrupted.is_terminal());
        assert!(!MigrationStatus::None.is_terminal());
        assert!(!MigrationStatus::Running.is_terminal());

        assert!(MigrationStatus::None.is_settled());
        assert!(!MigrationStatus::Running.is_settled());
    }

    #[test]
    fn test_stat_decodes_with_missing_fields() {
        let stat: MigrationStat = serde_json::from_str(r#"{"status":"running"}"#).unwrap();
        assert_eq!(stat.status, MigrationStatus::Running);
        assert!(stat.disks.is_empty());
        assert_eq!(stat.qemu.percent, 0);
        assert_eq!(stat.dst_server, "");
    }

    #[test]
    fn test_stat_decodes_daemon_payload() {
        let raw = r#"{
            "status": "failed",
            "dst_server": "h2",
            "desc": "disk timeout",
            "disks": {"/dev/vg0/a": {"percent": 40}, "/dev/vg0/b": {"percent": 100}},
            "qemu": {"percent": 12}
        }"#;
        let stat: MigrationStat = serde_json::from_str(raw).unwrap();
        assert_eq!(stat.status, MigrationStatus::Failed);
        assert_eq!(stat.desc, "disk timeout");
        assert_eq!(stat.disks["/dev/vg0/a"].percent, 40);
        assert_eq!(stat.disks["/dev/vg0/b"].percent, 100);
        assert_eq!(stat.qemu.percent, 12);
        // BTreeMap keeps disk order stable for rendering
        let keys: Vec<&String> = stat.disks.keys().collect();
        assert_eq!(keys, vec!["/dev/vg0/a", "/dev/vg0/b"]);
    }

    #[test]
    fn test_params_skip_empty_collections() {
        let params = MigrationParams {
            dst_server: "h2".to_string(),
            ..Default::default()
        };
        let v = serde_json::to_value(&params).unwrap();
        assert_eq!(v["dst_server"], "h2");
        assert!(v.get("disks").is_none());
        assert!(v["overrides"].get("disks").is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(MigrationStatus::Running.to_string(), "running");
        assert_eq!(MigrationStatus::Interrupted.to_string(), "interrupted");
    }
}
