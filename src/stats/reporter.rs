// src/stats/reporter.rs
use crate::miner::orchestrator::MinerStatus;
use crate::miner::runtime::StatusHandle;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use sysinfo::{Components, System};

/// Statistics related to hardware performance
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HardwareStats {
    /// Current CPU usage percentage (0-100)
    pub cpu_usage: f32,
    /// Memory currently used (in bytes)
    pub memory_used: u64,
    /// Current CPU temperature in Celsius (0 when no sensor is found)
    pub temperature: f32,
}

/// Periodically logs the miner status next to hardware readings
pub struct StatsReporter {
    /// Published miner status
    status: StatusHandle,
    /// System information collector
    system: System,
    /// Hardware component information collector
    components: Components,
    /// Interval at which stats are reported
    report_interval: Duration,
}

/// Keeps a running reporter alive; dropping it stops the reporter
pub struct ReporterHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl ReporterHandle {
    /// Stops the reporter thread and waits for it
    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.thread.join().is_err() {
            log::warn!("Stats reporter thread panicked");
        }
    }
}

impl StatsReporter {
    /// Creates a new StatsReporter with the specified reporting interval
    ///
    /// # Arguments
    /// * `status` - Status snapshot published by the miner
    /// * `report_interval` - How often to log statistics
    pub fn new(status: StatusHandle, report_interval: Duration) -> Self {
        StatsReporter {
            status,
            system: System::new_all(),
            components: Components::new_with_refreshed_list(),
            report_interval,
        }
    }

    /// Latest miner status
    pub fn get_stats(&self) -> MinerStatus {
        **self.status.load()
    }

    /// Gets the current hardware statistics
    ///
    /// This refreshes system information before returning the stats.
    pub fn get_hardware_stats(&mut self) -> HardwareStats {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();
        self.components.refresh(true);

        let cpus = self.system.cpus();
        let cpu_usage =
            cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len().max(1) as f32;

        let temperature = self
            .components
            .iter()
            .find(|c| c.label().contains("CPU"))
            .and_then(|c| c.temperature())
            .unwrap_or(0.0);

        HardwareStats {
            cpu_usage,
            memory_used: self.system.used_memory(),
            temperature,
        }
    }

    /// One status line
    pub fn format_line(status: &MinerStatus, hw: &HardwareStats) -> String {
        format!(
            "State: {} | Hashrate: {:.2} H/s | Workers: {} | Workloads: {} | Shares: {} | CPU: {:.1}% | Mem: {} MiB | Temp: {:.1}°C",
            status.state,
            status.hashrate,
            status.active_workers,
            status.workloads_mined,
            status.shares_found,
            hw.cpu_usage,
            hw.memory_used / (1024 * 1024),
            hw.temperature
        )
    }

    /// Starts the periodic reporting of statistics
    ///
    /// This spawns a background thread that logs stats at the configured
    /// interval until the returned handle is stopped or dropped.
    pub fn start_reporting(mut self) -> std::io::Result<ReporterHandle> {
        let (stop, stopped) = crossbeam_channel::bounded(1);

        let thread = std::thread::Builder::new()
            .name("stats-reporter".into())
            .spawn(move || {
                loop {
                    match stopped.recv_timeout(self.report_interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let status = self.get_stats();
                    let hw = self.get_hardware_stats();
                    log::info!("{}", Self::format_line(&status, &hw));
                }
            })?;

        Ok(ReporterHandle { stop, thread })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MiningState;
    use arc_swap::ArcSwap;
    use std::sync::Arc;

    #[test]
    fn reads_published_status() {
        let status: StatusHandle = Arc::new(ArcSwap::from_pointee(MinerStatus::default()));
        let reporter = StatsReporter::new(status.clone(), Duration::from_secs(60));
        assert_eq!(reporter.get_stats().state, MiningState::Disconnected);

        status.store(Arc::new(MinerStatus {
            state: MiningState::Mining,
            hashrate: 2048.0,
            active_workers: 4,
            shares_found: 1,
            workloads_mined: 12,
        }));
        let seen = reporter.get_stats();
        assert_eq!(seen.state, MiningState::Mining);
        assert_eq!(seen.workloads_mined, 12);
    }

    #[test]
    fn line_mentions_state_and_rate() {
        let status = MinerStatus {
            state: MiningState::WaitingForWork,
            hashrate: 12.5,
            ..Default::default()
        };
        let hw = HardwareStats {
            memory_used: 3 * 1024 * 1024 * 1024,
            ..Default::default()
        };
        let line = StatsReporter::format_line(&status, &hw);
        assert!(line.contains("waiting for work"));
        assert!(line.contains("12.50 H/s"));
        assert!(line.contains("Mem: 3072 MiB"));
    }

    #[test]
    fn reporter_stops_promptly() {
        let status: StatusHandle = Arc::new(ArcSwap::from_pointee(MinerStatus::default()));
        let handle = StatsReporter::new(status, Duration::from_secs(3600))
            .start_reporting()
            .unwrap();
        handle.stop();
    }
}
