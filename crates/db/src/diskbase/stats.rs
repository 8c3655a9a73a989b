// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use itertools::Itertools;

/// Width of one fetch-count bucket, in seconds.
pub const FETCHSTATS_SLOT_TIME: i64 = 30;
/// Enough buckets for the longest reporting window, plus the one being filled.
pub const FETCHSTATS_SLOTS: usize = 121;
/// The reporting windows, in seconds.
const FETCHSTATS_WINDOWS: [i64; 3] = [120, 600, 3600];
/// Widest bar drawn in the age graph.
const AGE_GRAPH_WIDTH: usize = 50;

/// Disk fetch rates over one reporting window, in fetches per minute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchWindow {
    pub minutes: i64,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

/// Counters for the paging layer: object-level cache hits and misses, how many stub values
/// were read in, and a ring of per-30-second root fetch counts.
#[derive(Debug, Clone)]
pub struct FetchStats {
    hits: u64,
    misses: u64,
    stub_loads: u64,
    /// None marks a bucket that has never been reached.
    slots: [Option<u32>; FETCHSTATS_SLOTS],
    last_slot: Option<usize>,
}

impl Default for FetchStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchStats {
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            stub_loads: 0,
            slots: [None; FETCHSTATS_SLOTS],
            last_slot: None,
        }
    }

    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn stub_load(&mut self) {
        self.stub_loads += 1;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn stub_loads(&self) -> u64 {
        self.stub_loads
    }

    /// Percentage of fetches that found the properties already resident.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        100.0 * self.hits as f64 / total as f64
    }

    fn slot_for(now: i64) -> usize {
        now.div_euclid(FETCHSTATS_SLOT_TIME)
            .rem_euclid(FETCHSTATS_SLOTS as i64) as usize
    }

    /// Zero every bucket between the last one used and `slot`.
    fn advance_to(&mut self, slot: usize) {
        let mut last = match self.last_slot {
            Some(last) => last,
            None => {
                self.slots = [None; FETCHSTATS_SLOTS];
                self.slots[slot] = Some(0);
                self.last_slot = Some(slot);
                return;
            }
        };
        while last != slot {
            last = (last + 1) % FETCHSTATS_SLOTS;
            self.slots[last] = Some(0);
        }
        self.last_slot = Some(slot);
    }

    /// Count one root property fetch from disk.
    pub fn record_fetch(&mut self, now: i64) {
        let slot = Self::slot_for(now);
        self.advance_to(slot);
        if let Some(count) = self.slots[slot].as_mut() {
            *count += 1;
        }
    }

    /// Fetch rates over the last 2, 10 and 60 minutes. Buckets never reached do not count.
    pub fn windows(&mut self, now: i64) -> [FetchWindow; 3] {
        let slot = Self::slot_for(now);
        self.advance_to(slot);

        let mut idx = slot;
        let mut count = 0i64;
        let mut sum = 0.0;
        let mut max = 0.0;
        let mut min = f64::from(self.slots[slot].unwrap_or(0));
        let per_minute = 60.0 / FETCHSTATS_SLOT_TIME as f64;

        FETCHSTATS_WINDOWS.map(|window| {
            while count < window / FETCHSTATS_SLOT_TIME {
                let Some(fetches) = self.slots[idx] else {
                    break;
                };
                let fetches = f64::from(fetches);
                sum += fetches;
                if fetches < min {
                    min = fetches;
                }
                if fetches > max {
                    max = fetches;
                }
                idx = (idx + FETCHSTATS_SLOTS - 1) % FETCHSTATS_SLOTS;
                count += 1;
            }
            let avg = if count == 0 {
                0.0
            } else {
                sum * per_minute / count as f64
            };
            FetchWindow {
                minutes: window / 60,
                min: min * per_minute,
                avg,
                max: max * per_minute,
            }
        })
    }

    /// The hit ratio line followed by one line per fetch window.
    pub fn report(&mut self, now: i64) -> Vec<String> {
        let mut lines = vec![format!(
            "Propcache hit ratio: {:.3}% ({} hits / {} fetches)",
            self.hit_ratio(),
            self.hits,
            self.misses
        )];
        for w in self.windows(now) {
            lines.push(format!(
                "Disk Fetches {:>2} minute min/avg/max: {:.2}/{:.2}/{:.2}",
                w.minutes, w.min, w.avg, w.max
            ));
        }
        lines
    }
}

/// A graph of how long ago each loaded object was fetched, one row per minute of age that has
/// any objects, with `[gap]` standing in for runs of empty minutes.
pub fn age_histogram(now: i64, fetch_times: impl Iterator<Item = i64>) -> Vec<String> {
    let minutes: Vec<i64> = fetch_times.map(|t| (now - t).max(0) / 60).sorted().collect();
    let total = minutes.len();

    let mut lines = vec!["Mins  Objs (%of db) Graph of #objs vs. age.".to_string()];
    let mut expected = 0;
    for (count, minute) in minutes.into_iter().dedup_with_count() {
        if minute > expected {
            lines.push("[gap]".to_string());
        }
        expected = minute + 1;
        let pct = count as f64 * 100.0 / total as f64;
        let bar = (count * 100 / total).min(AGE_GRAPH_WIDTH);
        lines.push(format!(
            "{minute:>3}:{count:>6} ({pct:>5.2}%) {:>bar$}",
            "*"
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hit_ratio_lines() {
        let mut stats = FetchStats::new();
        for _ in 0..3 {
            stats.hit();
        }
        stats.miss();
        let report = stats.report(1000);
        assert_eq!(report[0], "Propcache hit ratio: 75.000% (3 hits / 1 fetches)");
        assert_eq!(report.len(), 4);
        assert!(report[1].starts_with("Disk Fetches  2 minute"));
        assert!(report[3].starts_with("Disk Fetches 60 minute"));
    }

    #[test]
    fn empty_stats_do_not_divide_by_zero() {
        let mut stats = FetchStats::new();
        let windows = stats.windows(0);
        assert_eq!(windows[0].avg, 0.0);
        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[test]
    fn windows_average_per_minute() {
        let mut stats = FetchStats::new();
        // Two buckets: 4 fetches at t=0, 2 fetches thirty seconds later.
        for _ in 0..4 {
            stats.record_fetch(0);
        }
        for _ in 0..2 {
            stats.record_fetch(30);
        }
        let [two, ten, _] = stats.windows(30);
        assert_eq!(two.minutes, 2);
        assert_eq!(two.min, 4.0);
        assert_eq!(two.max, 8.0);
        assert_eq!(two.avg, 6.0);
        // The longer window covers the same two buckets; the rest were never reached.
        assert_eq!(ten.avg, 6.0);
    }

    #[test]
    fn idle_buckets_count_as_zero() {
        let mut stats = FetchStats::new();
        stats.record_fetch(0);
        // Two and a half minutes later the four newest buckets are all empty.
        let [two, ten, _] = stats.windows(150);
        assert_eq!(two.min, 0.0);
        assert_eq!(two.max, 0.0);
        assert_eq!(ten.max, 2.0);
        assert!((ten.avg - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn histogram_buckets_by_minute() {
        let lines = age_histogram(1000, [1000, 990, 900, 700].into_iter());
        assert_eq!(lines[0], "Mins  Objs (%of db) Graph of #objs vs. age.");
        assert_eq!(lines[1], format!("  0:     2 (50.00%) {:>50}", "*"));
        assert_eq!(lines[2], format!("  1:     1 (25.00%) {:>25}", "*"));
        assert_eq!(lines[3], "[gap]");
        assert_eq!(lines[4], format!("  5:     1 (25.00%) {:>25}", "*"));
    }
}
