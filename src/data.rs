//! Historical network data: the pre-shaped, time-indexed tables the
//! bootstrap replays before the simulation's decision-making horizon
//! begins.
//!
//! Bundles load from JSON and are cached next to the source file as
//! zstd-compressed bincode, so repeated runs skip the JSON parse. A
//! seeded synthetic generator produces self-consistent bundles for tests
//! and demo runs without any network data on disk.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use color_eyre::eyre::{eyre, Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::{network_data_start, EIB, MAX_SECTOR_DURATION_DAYS};
use crate::ledger::PowerPair;

/// One day of historical power-lifecycle statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalDayStats {
    pub date: NaiveDate,
    pub onboarded: PowerPair,
    pub renewed: PowerPair,
    pub sched_expire: PowerPair,
    pub terminated: PowerPair,
    /// Cumulative network totals on this day, in EiB.
    pub total_raw_power_eib: f64,
    pub total_qa_power_eib: f64,
}

/// Power already committed before the simulation starts, scheduled to
/// expire on a future date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FutureExpiration {
    pub date: NaiveDate,
    pub power: PowerPair,
}

/// Pledge locked before the simulation starts, scheduled to release on a
/// known date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledRelease {
    pub date: NaiveDate,
    pub amount: f64,
}

/// One day of historical supply statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplySnapshot {
    pub date: NaiveDate,
    pub circulating_fil: f64,
    pub locked_fil: f64,
    pub burnt_fil: f64,
}

/// The complete pre-simulation data bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalData {
    /// Per-day lifecycle stats from the network-data epoch up to the day
    /// before simulation start.
    pub days: Vec<HistoricalDayStats>,
    /// Known scheduled expirations on and after simulation start.
    pub future_expirations: Vec<FutureExpiration>,
    /// Known scheduled pledge releases, network-wide.
    pub scheduled_releases: Vec<ScheduledRelease>,
    /// Supply snapshots aligned with `days`.
    pub supply: Vec<SupplySnapshot>,
    /// Cumulative capped power (byte-days) accrued before the epoch.
    pub zero_cum_capped_power: f64,
}

impl HistoricalData {
    /// Load a bundle from JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read historical data '{}'", path.display()))?;
        let data: HistoricalData = serde_json::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse historical data '{}'", path.display()))?;
        data.check()?;
        Ok(data)
    }

    /// Load a bundle, going through the binary cache when it is fresh.
    pub fn load_with_cache(path: &Path) -> Result<Self> {
        let cache = cache_path(path);
        if cache_is_fresh(path, &cache) {
            match Self::load_cache(&cache) {
                Ok(data) => {
                    debug!("Loaded historical data from cache {}", cache.display());
                    return Ok(data);
                }
                Err(e) => warn!("Ignoring unreadable cache {}: {e:#}", cache.display()),
            }
        }

        let data = Self::load(path)?;
        if let Err(e) = data.write_cache(&cache) {
            warn!("Failed to write cache {}: {e:#}", cache.display());
        } else {
            info!("Cached historical data at {}", cache.display());
        }
        Ok(data)
    }

    fn load_cache(cache: &Path) -> Result<Self> {
        let compressed = fs::read(cache)?;
        let raw = zstd::decode_all(compressed.as_slice())?;
        let data: HistoricalData = bincode::deserialize(&raw)?;
        data.check()?;
        Ok(data)
    }

    fn write_cache(&self, cache: &Path) -> Result<()> {
        let raw = bincode::serialize(self)?;
        let compressed = zstd::encode_all(raw.as_slice(), 3)?;
        fs::write(cache, compressed)?;
        Ok(())
    }

    /// Basic consistency checks: non-empty, anchored at the network-data
    /// epoch, contiguous daily coverage, supply aligned with the power
    /// series.
    pub fn check(&self) -> Result<()> {
        if self.days.is_empty() {
            return Err(eyre!("historical data has no daily power statistics"));
        }
        // The ledgers index positionally from the epoch; a bundle that
        // starts anywhere else would replay under shifted dates.
        if self.days[0].date != network_data_start() {
            return Err(eyre!(
                "historical power series starts at {} but must start at {}",
                self.days[0].date,
                network_data_start()
            ));
        }
        for pair in self.days.windows(2) {
            if (pair[1].date - pair[0].date).num_days() != 1 {
                return Err(eyre!(
                    "historical power series is not contiguous at {}",
                    pair[1].date
                ));
            }
        }
        if self.supply.len() != self.days.len() {
            return Err(eyre!(
                "supply snapshots ({}) do not align with power series ({})",
                self.supply.len(),
                self.days.len()
            ));
        }
        Ok(())
    }

    /// Network totals on the first historical day (EiB), the cumulative
    /// base the bootstrap accumulates from.
    pub fn first_day_totals(&self) -> (f64, f64) {
        let first = &self.days[0];
        (first.total_raw_power_eib, first.total_qa_power_eib)
    }

    /// Mean day-over-day gas burn across the supply snapshots.
    pub fn daily_burn_average(&self) -> f64 {
        if self.supply.len() < 2 {
            return 0.0;
        }
        let diffs = self.supply.len() - 1;
        (self.supply[diffs].burnt_fil - self.supply[0].burnt_fil) / diffs as f64
    }

    /// Generate a self-consistent synthetic bundle covering
    /// `epoch .. sim_start` with future expirations projected out past
    /// `sim_end`.
    pub fn synthetic(sim_start: NaiveDate, sim_end: NaiveDate, seed: u64) -> Self {
        let epoch = network_data_start();
        let mut rng = StdRng::seed_from_u64(seed);

        let history_days = (sim_start - epoch).num_days().max(1) as usize;
        let future_days =
            (sim_end - sim_start).num_days().max(0) as usize + MAX_SECTOR_DURATION_DAYS;

        // Daily onboarding in PiB, mildly jittered; QA carries a partial
        // deal multiplier.
        let onboard_series: Vec<PowerPair> = (0..history_days + future_days)
            .map(|_| {
                let raw = 6.0 + rng.gen_range(-1.0..1.0);
                PowerPair::new(raw, raw * 1.8)
            })
            .collect();

        let commitment_days = 360usize;
        let expire_at = |i: usize| -> PowerPair {
            if i >= commitment_days {
                onboard_series[i - commitment_days]
            } else {
                PowerPair::zero()
            }
        };

        let mut days = Vec::with_capacity(history_days);
        let mut supply = Vec::with_capacity(history_days);
        let mut total_raw_eib = 2.0;
        let mut total_qa_eib = 2.5;
        let mut burnt = 50_000.0;
        let mut locked = 9.0e7;
        let mut circ = 1.8e8;

        for i in 0..history_days {
            let date = epoch + chrono::Duration::days(i as i64);
            let onboarded = onboard_series[i];
            let sched_expire = expire_at(i);
            let renewed = sched_expire.scaled(0.5);
            let terminated = PowerPair::new(0.05, 0.08);

            let net_raw =
                onboarded.raw_pib + renewed.raw_pib - sched_expire.raw_pib - terminated.raw_pib;
            let net_qa =
                onboarded.qa_pib + renewed.qa_pib - sched_expire.qa_pib - terminated.qa_pib;
            total_raw_eib += net_raw / 1024.0;
            total_qa_eib += net_qa / 1024.0;

            days.push(HistoricalDayStats {
                date,
                onboarded,
                renewed,
                sched_expire,
                terminated,
                total_raw_power_eib: total_raw_eib,
                total_qa_power_eib: total_qa_eib,
            });

            burnt += 250.0 + rng.gen_range(-25.0..25.0);
            locked += 45_000.0;
            circ += 210_000.0;
            supply.push(SupplySnapshot {
                date,
                circulating_fil: circ,
                locked_fil: locked,
                burnt_fil: burnt,
            });
        }

        let future_expirations = (0..future_days)
            .map(|k| {
                let i = history_days + k;
                FutureExpiration {
                    date: sim_start + chrono::Duration::days(k as i64),
                    power: expire_at(i),
                }
            })
            .collect();

        // Pledge scheduled against each known expiration, priced at a
        // flat historical rate per QA PiB.
        let pledge_per_qa_pib = 1500.0;
        let scheduled_releases = (0..history_days + future_days)
            .map(|i| ScheduledRelease {
                date: epoch + chrono::Duration::days(i as i64),
                amount: expire_at(i).qa_pib * pledge_per_qa_pib,
            })
            .collect();

        Self {
            days,
            future_expirations,
            scheduled_releases,
            supply,
            // Roughly five months of sub-baseline power before the epoch.
            zero_cum_capped_power: 150.0 * EIB,
        }
    }
}

fn cache_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".cache.zst");
    PathBuf::from(os)
}

fn cache_is_fresh(source: &Path, cache: &Path) -> bool {
    let (Ok(src_meta), Ok(cache_meta)) = (source.metadata(), cache.metadata()) else {
        return false;
    };
    match (src_meta.modified(), cache_meta.modified()) {
        (Ok(src), Ok(cached)) => cached >= src,
        _ => false,
    }
}
