use std::collections::BTreeMap;

use migwatch_core::{MigrationStat, StatInfo};
use tracing::debug;

use crate::display::DisplaySession;
use crate::renderer::{TargetRenderer, TargetReport};

/// Key of one tracked resource.
///
/// Disks sort before the VM state channel, which is the order their bars
/// are drawn in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetKey {
    Disk(String),
    VmState,
}

/// Fans each polled snapshot out to the renderer set fixed at construction.
///
/// Owns the renderers for the whole session. Dropping the distributor
/// without calling [`finish`](Self::finish) or [`abandon`](Self::abandon)
/// aborts every renderer task, so none can be left waiting.
pub struct ProgressDistributor {
    renderers: BTreeMap<TargetKey, TargetRenderer>,
}

impl ProgressDistributor {
    /// Spawn one renderer per disk of `first`, plus one for the VM state
    /// labelled `vm_name`.
    pub fn spawn(display: &DisplaySession, vm_name: &str, first: &MigrationStat) -> Self {
        let mut renderers = BTreeMap::new();
        for path in first.disks.keys() {
            renderers.insert(
                TargetKey::Disk(path.clone()),
                TargetRenderer::spawn(path, display.add_bar()),
            );
        }
        renderers.insert(
            TargetKey::VmState,
            TargetRenderer::spawn(vm_name, display.add_bar()),
        );
        debug!(vm = %vm_name, targets = renderers.len(), "Renderers spawned");
        Self { renderers }
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TargetKey> {
        self.renderers.keys()
    }

    /// Post this snapshot's figures to every renderer. Never blocks.
    ///
    /// Returns how many renderers received an update. A disk missing from
    /// the snapshot gets nothing this cycle; a disk that was not present in
    /// the first snapshot is ignored.
    pub fn distribute(&self, stat: &MigrationStat) -> usize {
        let mut delivered = 0;
        for (key, renderer) in &self.renderers {
            let info: Option<StatInfo> = match key {
                TargetKey::Disk(path) => stat.disks.get(path).copied(),
                TargetKey::VmState => Some(stat.qemu),
            };
            match info {
                Some(info) => {
                    renderer.update(info);
                    delivered += 1;
                }
                None => debug!(disk = %renderer.name(), "Disk missing from snapshot"),
            }
        }

        for path in stat.disks.keys() {
            if !self.renderers.contains_key(&TargetKey::Disk(path.clone())) {
                debug!(disk = %path, "Ignoring disk not present at start");
            }
        }
        delivered
    }

    /// Force every renderer to completion and wait for all of them.
    pub async fn finish(mut self) -> Vec<TargetReport> {
        let renderers = std::mem::take(&mut self.renderers);
        let mut reports = Vec::with_capacity(renderers.len());
        for renderer in renderers.into_values() {
            reports.push(renderer.finish().await);
        }
        reports
    }

    /// Stop every renderer where it is and wait for all of them.
    pub async fn abandon(mut self) -> Vec<TargetReport> {
        let renderers = std::mem::take(&mut self.renderers);
        let mut reports = Vec::with_capacity(renderers.len());
        for renderer in renderers.into_values() {
            reports.push(renderer.abandon().await);
        }
        reports
    }
}

impl Drop for ProgressDistributor {
    fn drop(&mut self) {
        for renderer in self.renderers.values() {
            renderer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TargetState;
    use crate::display::DisplayMode;
    use migwatch_core::MigrationStatus;

    fn running() -> MigrationStat {
        MigrationStat::with_status(MigrationStatus::Running)
    }

    #[tokio::test]
    async fn test_one_renderer_per_disk_plus_vm_state() {
        let display = DisplaySession::acquire(DisplayMode::Hidden);
        let first = running().with_disk("/dev/vg0/b", 0).with_disk("/dev/vg0/a", 0);
        let distributor = ProgressDistributor::spawn(&display, "vm1", &first);

        assert_eq!(distributor.len(), 3);
        let keys: Vec<TargetKey> = distributor.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                TargetKey::Disk("/dev/vg0/a".to_string()),
                TargetKey::Disk("/dev/vg0/b".to_string()),
                TargetKey::VmState,
            ]
        );
        distributor.abandon().await;
    }

    #[tokio::test]
    async fn test_memory_only_migration_has_single_target() {
        let display = DisplaySession::acquire(DisplayMode::Hidden);
        let distributor = ProgressDistributor::spawn(&display, "vm1", &running());
        assert_eq!(distributor.len(), 1);
        assert!(!distributor.is_empty());

        let reports = distributor.finish().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].name, "vm1");
        assert!(reports[0].finished);
    }

    #[tokio::test]
    async fn test_distribute_routes_by_key() {
        let display = DisplaySession::acquire(DisplayMode::Hidden);
        let first = running().with_disk("/dev/vg0/a", 0);
        let distributor = ProgressDistributor::spawn(&display, "vm1", &first);

        let delivered = distributor.distribute(&running().with_disk("/dev/vg0/a", 30).with_vm_state(10));
        assert_eq!(delivered, 2);

        let reports = distributor.abandon().await;
        let disk = reports.iter().find(|r| r.name == "/dev/vg0/a").unwrap();
        let vm = reports.iter().find(|r| r.name == "vm1").unwrap();
        assert_eq!(disk.percent, 30);
        assert_eq!(disk.state, TargetState::Syncing);
        assert_eq!(vm.percent, 10);
    }

    #[tokio::test]
    async fn test_missing_and_new_disks() {
        let display = DisplaySession::acquire(DisplayMode::Hidden);
        let first = running().with_disk("/dev/vg0/a", 0);
        let distributor = ProgressDistributor::spawn(&display, "vm1", &first);

        distributor.distribute(&running().with_disk("/dev/vg0/a", 60));
        tokio::task::yield_now().await;

        // "a" vanished, "z" appeared: only the VM state is updated.
        let delivered = distributor.distribute(&running().with_disk("/dev/vg0/z", 90).with_vm_state(5));
        assert_eq!(delivered, 1);
        assert_eq!(distributor.len(), 2);

        let reports = distributor.abandon().await;
        let disk = reports.iter().find(|r| r.name == "/dev/vg0/a").unwrap();
        assert_eq!(disk.percent, 60);
        assert!(reports.iter().all(|r| r.name != "/dev/vg0/z"));
    }

    #[tokio::test]
    async fn test_finish_completes_every_target() {
        let display = DisplaySession::acquire(DisplayMode::Hidden);
        let first = running().with_disk("/dev/vg0/a", 10).with_disk("/dev/vg0/b", 0);
        let distributor = ProgressDistributor::spawn(&display, "vm1", &first);
        distributor.distribute(&first);

        let reports = distributor.finish().await;
        assert_eq!(reports.len(), 3);
        for report in reports {
            assert!(report.finished, "{report:?}");
            assert_eq!(report.percent, 100);
            assert_eq!(report.state, TargetState::Completed);
        }
    }
}
