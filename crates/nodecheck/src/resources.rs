//! Host resource probe.
//!
//! An optional capability: a loaded host can make a healthy node look slow,
//! so the report shows load, memory and root disk usage next to the node
//! results. Values never influence the score.

use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use sysinfo::{Disks, System};
use tracing::debug;

/// Usage above this percentage is reported as a warning
pub const RESOURCE_WARNING_PERCENT: f64 = 80.0;

/// A root filesystem fuller than this can stall chain sync
pub const DISK_CRITICAL_PERCENT: f64 = 95.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    /// 1-minute load average divided by the CPU count, as a percentage
    pub load_percent: Option<f64>,
    pub memory_used_percent: Option<f64>,
    /// Usage of the filesystem mounted at `/`
    pub disk_used_percent: Option<f64>,
}

impl ResourceSnapshot {
    /// Build from raw readings; a zero total memory means "unknown"
    pub fn from_readings(
        load_one: Option<f64>,
        cpus: usize,
        total_memory: u64,
        available_memory: u64,
    ) -> Self {
        let load_percent = load_one.map(|load| load / cpus.max(1) as f64 * 100.0);
        let memory_used_percent = used_percent(total_memory, available_memory);
        Self { load_percent, memory_used_percent, disk_used_percent: None }
    }

    /// Add root filesystem usage; a zero total means "unknown"
    pub fn with_disk(mut self, total_space: u64, available_space: u64) -> Self {
        self.disk_used_percent = used_percent(total_space, available_space);
        self
    }

    pub fn disk_critical(&self) -> bool {
        self.disk_used_percent.is_some_and(|used| used > DISK_CRITICAL_PERCENT)
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(load) = self.load_percent.filter(|load| *load > RESOURCE_WARNING_PERCENT) {
            warnings.push(format!("High CPU load ({load:.1}% per CPU) may affect node performance"));
        }
        if let Some(memory) = self.memory_used_percent.filter(|used| *used > RESOURCE_WARNING_PERCENT) {
            warnings.push(format!("High memory usage ({memory:.1}%) may affect node performance"));
        }
        match self.disk_used_percent {
            Some(disk) if disk > DISK_CRITICAL_PERCENT => {
                warnings.push(format!("Critical disk usage ({disk:.1}%) - may affect blockchain sync"));
            }
            Some(disk) if disk > RESOURCE_WARNING_PERCENT => {
                warnings.push(format!("High disk usage ({disk:.1}%) may affect node performance"));
            }
            _ => {}
        }
        warnings
    }

    fn is_empty(&self) -> bool {
        self.load_percent.is_none() && self.memory_used_percent.is_none() && self.disk_used_percent.is_none()
    }
}

fn used_percent(total: u64, available: u64) -> Option<f64> {
    (total > 0).then(|| total.saturating_sub(available) as f64 * 100.0 / total as f64)
}

pub trait ResourceProbe: Send + Sync {
    /// Current snapshot, or `None` when nothing could be read
    fn snapshot(&self) -> Option<ResourceSnapshot>;
}

/// Selected when host statistics are unavailable or disabled
pub struct NoopResourceProbe;

impl ResourceProbe for NoopResourceProbe {
    fn snapshot(&self) -> Option<ResourceSnapshot> {
        None
    }
}

/// Host statistics through `sysinfo`
pub struct SystemResourceProbe {
    sys: Mutex<System>,
    cpus: usize,
}

impl Default for SystemResourceProbe {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self { sys: Mutex::new(System::new()), cpus }
    }
}

impl ResourceProbe for SystemResourceProbe {
    fn snapshot(&self) -> Option<ResourceSnapshot> {
        let Ok(mut sys) = self.sys.lock() else {
            debug!("Resource probe lock poisoned");
            return None;
        };
        sys.refresh_memory();

        // Load averages only exist on unix hosts
        let load_one = cfg!(unix).then(|| System::load_average().one);
        let mut snapshot =
            ResourceSnapshot::from_readings(load_one, self.cpus, sys.total_memory(), sys.available_memory());
        let disks = Disks::new_with_refreshed_list();
        if let Some(root) = disks.iter().find(|disk| disk.mount_point() == Path::new("/")) {
            snapshot = snapshot.with_disk(root.total_space(), root.available_space());
        }
        debug!(?snapshot, "Host resources sampled");

        (!snapshot.is_empty()).then_some(snapshot)
    }
}

/// The probe to use on this platform, chosen once at startup
pub fn platform_probe() -> Box<dyn ResourceProbe> {
    if sysinfo::IS_SUPPORTED_SYSTEM {
        Box::new(SystemResourceProbe::default())
    } else {
        Box::new(NoopResourceProbe)
    }
}
