//! Log parsing for one experiment directory.
//!
//! Layout of an experiment:
//!
//! ```text
//! <expdir>/shadow.log[.zst]
//! <expdir>/shadow.data/hosts/<host>/stdout-driver-*   (web clients)
//! <expdir>/shadow.data/hosts/<host>/stdout-tproxy-*   (web clients, exit relays)
//! ```
//!
//! Hosts share nothing but the intern table, so each host is parsed on its
//! own rayon task and the per-host outputs are merged in host-name order.

pub mod classify;
pub mod driver_log;
pub mod grammar;
pub mod input;
pub mod shadow_log;
pub mod tproxy_log;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use color_eyre::eyre::{Context, Result};
use rayon::prelude::*;

use crate::config::ParseConfig;
use crate::intern::Interner;
use crate::results::{FetchResult, HandlerStatsReport, PeriodicStatsReport, SimulationResult};

pub use driver_log::{read_driver_log, LoadState, LoadTracker};
pub use input::{open_first_existing, open_log};
pub use shadow_log::read_shadow_log;
pub use tproxy_log::{append_client_proxy_log, read_client_proxy_log, read_exit_proxy_log};

/// Role of a simulated host, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    WebClient,
    ExitRelay,
}

impl HostKind {
    /// `None` for hosts whose logs are not parsed
    pub fn classify(name: &str, config: &ParseConfig) -> Option<Self> {
        if name.starts_with(&config.webclient_prefix) {
            Some(HostKind::WebClient)
        } else if name.starts_with(&config.relay_prefix) && name.contains(&config.exit_marker) {
            Some(HostKind::ExitRelay)
        } else {
            None
        }
    }
}

/// Everything parsed from one host directory
#[derive(Debug, Default)]
struct HostLogData {
    loads: Vec<FetchResult>,
    periodic: Vec<PeriodicStatsReport>,
    handlers: Vec<HandlerStatsReport>,
}

/// Parse the simulator log and every relevant host of an experiment.
pub fn parse_experiment(
    expdir: &Path,
    config: &ParseConfig,
    description: &str,
) -> Result<SimulationResult> {
    let (shadow_path, reader) = open_first_existing(&input::candidates(expdir, &config.shadow_log))?;
    log::info!("Parsing simulator log {}", shadow_path.display());
    let run = read_shadow_log(reader)
        .with_context(|| format!("Failed to parse simulator log: {}", shadow_path.display()))?;

    let hosts_dir = expdir.join(&config.hosts_dir);
    let hosts = list_hosts(&hosts_dir, config)?;
    let num_webclients = hosts
        .iter()
        .filter(|(_, _, kind)| *kind == HostKind::WebClient)
        .count();
    log::info!(
        "Parsing {} hosts ({} web clients) under {}",
        hosts.len(),
        num_webclients,
        hosts_dir.display()
    );

    let interner = Interner::new();
    let parsed: Vec<(Arc<str>, HostLogData)> = hosts
        .par_iter()
        .map(|(name, dir, kind)| -> Result<(Arc<str>, HostLogData)> {
            let host = interner.intern(name);
            let data = parse_host(dir, &host, *kind, config, &interner)?;
            log::debug!(
                "Parsed {}: {} page loads, {} periodic reports, {} handler reports",
                host,
                data.loads.len(),
                data.periodic.len(),
                data.handlers.len()
            );
            Ok((host, data))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut result = SimulationResult::new(run, description);
    for (host, data) in parsed {
        result.extend_loads(data.loads);
        result.extend_periodic(host, data.periodic);
        result.extend_handlers(data.handlers);
    }

    log::info!(
        "parsed: num_webclients= {}, page loads= {}, csp hosts= {}, handler reports= {}",
        num_webclients,
        result.load_results().len(),
        result.csp_periodic_reports().len(),
        result.handler_reports().len()
    );
    Ok(result)
}

/// Host directories worth parsing, sorted by name
fn list_hosts(hosts_dir: &Path, config: &ParseConfig) -> Result<Vec<(String, PathBuf, HostKind)>> {
    let entries = fs::read_dir(hosts_dir)
        .with_context(|| format!("Failed to list hosts directory: {}", hosts_dir.display()))?;

    let mut hosts = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        match HostKind::classify(&name, config) {
            Some(kind) => hosts.push((name, entry.path(), kind)),
            None => log::debug!("Skipping host {}", name),
        }
    }
    hosts.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(hosts)
}

/// Log files in `dir` whose name starts with `prefix`, sorted by name
fn matching_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to list host directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn parse_host(
    dir: &Path,
    host: &Arc<str>,
    kind: HostKind,
    config: &ParseConfig,
    interner: &Interner,
) -> Result<HostLogData> {
    let mut data = HostLogData::default();

    match kind {
        HostKind::WebClient => {
            for path in matching_files(dir, &config.driver_log_prefix)? {
                log::debug!("{}: parsing driver log {}", host, path.display());
                let reader = open_log(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                let loads = read_driver_log(reader, host, interner)
                    .with_context(|| format!("Failed to parse driver log: {}", path.display()))?;
                data.loads.extend(loads);
            }
            for path in matching_files(dir, &config.tproxy_log_prefix)? {
                log::debug!("{}: parsing client proxy log {}", host, path.display());
                let reader = open_log(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                append_client_proxy_log(reader, &mut data.periodic)
                    .with_context(|| format!("Failed to parse proxy log: {}", path.display()))?;
            }
        }
        HostKind::ExitRelay => {
            for path in matching_files(dir, &config.tproxy_log_prefix)? {
                log::debug!("{}: parsing exit proxy log {}", host, path.display());
                let reader = open_log(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                let reports = read_exit_proxy_log(reader)
                    .with_context(|| format!("Failed to parse proxy log: {}", path.display()))?;
                data.handlers.extend(reports);
            }
        }
    }

    Ok(data)
}
