//! Disk selection for `migrate`.
//!
//! The daemon reports an instance as JSON; its `run` section describes the
//! running hypervisor process and is absent when the VM is stopped. Disks
//! attached to the running VM are listed under `run.storage[].path`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use tracing::debug;

/// Paths of the disks attached to the running instance.
///
/// Fails if the instance is not running, since only running VMs migrate.
pub fn attached_disks(vm_name: &str, instance: &Value) -> Result<Vec<String>> {
    let run = match instance.get("run") {
        Some(run) if !run.is_null() => run,
        _ => bail!("Instance is not running: {vm_name}"),
    };

    let Some(storage) = run.get("storage") else {
        return Ok(Vec::new());
    };
    let storage = storage
        .as_array()
        .ok_or_else(|| anyhow!("Malformed instance description: storage is not a list"))?;

    storage
        .iter()
        .map(|disk| {
            disk.get("path")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| anyhow!("Malformed instance description: disk without path"))
        })
        .collect()
}

/// Local disks are block devices or image files on this host. Network
/// backends are addressed by URL (`iscsi://`, `nbd://`, ...) and are shared
/// with the destination already.
pub fn is_local(path: &str) -> bool {
    !path.contains("://")
}

/// Disks to migrate live: the explicitly chosen ones (each must be
/// attached), or every local disk, or none (memory state only).
pub fn select_disks(attached: &[String], chosen: &[String], with_local: bool) -> Result<Vec<String>> {
    if !chosen.is_empty() {
        return chosen
            .iter()
            .map(|path| {
                if attached.contains(path) {
                    Ok(path.clone())
                } else {
                    Err(anyhow!("Unable to migrate unknown disk: {path}"))
                }
            })
            .collect();
    }
    if with_local {
        return Ok(attached.iter().filter(|p| is_local(p)).cloned().collect());
    }
    Ok(Vec::new())
}

/// Sizes of the volumes to create on the destination, keyed by their
/// destination name. `probe` returns the size of a logical volume, or
/// `None` if the path is not one.
pub fn destination_volumes<F>(
    disks: &[String],
    overrides: &BTreeMap<String, String>,
    probe: F,
) -> Result<BTreeMap<String, u64>>
where
    F: Fn(&str) -> Result<Option<u64>>,
{
    let mut volumes = BTreeMap::new();
    for disk in disks {
        let size = probe(disk)?.ok_or_else(|| anyhow!("Not a logical volume: {disk}"))?;
        let name = overrides.get(disk).unwrap_or(disk);
        debug!(disk = %disk, dst = %name, size, "Destination volume");
        volumes.insert(name.clone(), size);
    }
    Ok(volumes)
}

/// Size in bytes of `path` if it is an LVM logical volume.
pub fn probe_logical_volume(path: &str) -> Result<Option<u64>> {
    if !is_logical_volume(Path::new(path))? {
        return Ok(None);
    }
    block_size(Path::new(path)).map(Some)
}

/// An LVM logical volume resolves to a device-mapper node whose uuid
/// carries the `LVM-` prefix.
fn is_logical_volume(path: &Path) -> Result<bool> {
    let real = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let Some(node) = real.file_name().and_then(|n| n.to_str()) else {
        return Ok(false);
    };
    if !node.starts_with("dm-") {
        return Ok(false);
    }
    let uuid_path = Path::new("/sys/block").join(node).join("dm/uuid");
    let uuid = std::fs::read_to_string(&uuid_path)
        .with_context(|| format!("Failed to read {}", uuid_path.display()))?;
    Ok(uuid.trim_start().starts_with("LVM-"))
}

fn block_size(path: &Path) -> Result<u64> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    file.seek(SeekFrom::End(0))
        .with_context(|| format!("Failed to get size of {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_stopped_instance_is_rejected() {
        let err = attached_disks("vm1", &json!({"conf": {}})).unwrap_err();
        assert!(err.to_string().contains("not running"));

        let err = attached_disks("vm1", &json!({"run": null})).unwrap_err();
        assert!(err.to_string().contains("vm1"));
    }

    #[test]
    fn test_attached_disks_from_run_section() {
        let instance = json!({
            "conf": {"storage": [{"path": "/dev/vg0/stale"}]},
            "run": {"storage": [
                {"path": "/dev/vg0/vm1-root", "iops_rd": 0},
                {"path": "iscsi://10.0.0.1/iqn.2020-01.example:vm1/0"}
            ]}
        });
        assert_eq!(
            attached_disks("vm1", &instance).unwrap(),
            paths(&["/dev/vg0/vm1-root", "iscsi://10.0.0.1/iqn.2020-01.example:vm1/0"])
        );
    }

    #[test]
    fn test_running_instance_without_storage() {
        assert!(attached_disks("vm1", &json!({"run": {"pid": 42}})).unwrap().is_empty());
    }

    #[test]
    fn test_disk_without_path_is_malformed() {
        let err = attached_disks("vm1", &json!({"run": {"storage": [{}]}})).unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }

    #[test]
    fn test_select_chosen_disks() {
        let attached = paths(&["/dev/vg0/a", "/dev/vg0/b"]);
        let chosen = paths(&["/dev/vg0/b"]);
        assert_eq!(select_disks(&attached, &chosen, false).unwrap(), chosen);

        let err = select_disks(&attached, &paths(&["/dev/vg0/x"]), false).unwrap_err();
        assert_eq!(err.to_string(), "Unable to migrate unknown disk: /dev/vg0/x");
    }

    #[test]
    fn test_select_local_disks() {
        let attached = paths(&["/dev/vg0/a", "nbd://store:10809/vm1", "/var/lib/img/vm1.qcow2"]);
        assert_eq!(
            select_disks(&attached, &[], true).unwrap(),
            paths(&["/dev/vg0/a", "/var/lib/img/vm1.qcow2"])
        );
        assert!(select_disks(&attached, &[], false).unwrap().is_empty());
    }

    #[test]
    fn test_destination_volumes_apply_overrides() {
        let disks = paths(&["/dev/vg0/a", "/dev/vg0/b"]);
        let overrides = BTreeMap::from([("/dev/vg0/a".to_string(), "/dev/vg1/a".to_string())]);

        let volumes = destination_volumes(&disks, &overrides, |_| Ok(Some(1 << 30))).unwrap();
        assert_eq!(
            volumes,
            BTreeMap::from([
                ("/dev/vg0/b".to_string(), 1 << 30),
                ("/dev/vg1/a".to_string(), 1 << 30),
            ])
        );
    }

    #[test]
    fn test_destination_volumes_require_lv() {
        let disks = paths(&["/var/lib/img/vm1.qcow2"]);
        let err = destination_volumes(&disks, &BTreeMap::new(), |_| Ok(None)).unwrap_err();
        assert_eq!(err.to_string(), "Not a logical volume: /var/lib/img/vm1.qcow2");
    }

    #[test]
    fn test_regular_file_is_not_a_logical_volume() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("disk.img");
        std::fs::write(&image, vec![0u8; 4096]).unwrap();

        assert_eq!(probe_logical_volume(&image.to_string_lossy()).unwrap(), None);
        assert_eq!(block_size(&image).unwrap(), 4096);
    }

    #[test]
    fn test_missing_path_fails_probe() {
        assert!(probe_logical_volume("/nonexistent/migwatch/disk").is_err());
    }
}
