//! Shared fixtures for the integration suites.
//!
//! Import via `mod common;` from any test target.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sheaf::prelude::*;

/// The record type the suites store: a timestamped sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub taken_at: DateTime<Utc>,
    pub sensor: String,
    pub value: f64,
}

sheaf::record_codec!(Reading { taken_at, sensor, value });

/// Fixed reference instant; tests must not depend on the wall clock.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap()
}

pub fn at_hours(h: i64) -> DateTime<Utc> {
    base_time() + Duration::hours(h)
}

pub fn at_days(d: i64) -> DateTime<Utc> {
    base_time() + Duration::days(d)
}

pub fn reading(taken_at: DateTime<Utc>) -> Reading {
    Reading {
        taken_at,
        sensor: "s1".into(),
        value: 20.0,
    }
}

pub fn monthly() -> Monthly<Reading> {
    Monthly::new("test", |r: &Reading| r.taken_at)
}

pub fn by_time(a: &Reading, b: &Reading) -> bool {
    a.taken_at < b.taken_at
}

/// Ten same-month readings, hours scrambled the same way every run.
pub const SCRAMBLED_HOURS: [i64; 10] = [5, 8, 7, 2, 1, 0, 4, 3, 9, 6];

pub fn fill_scrambled(table: &Table<Reading>) {
    for h in SCRAMBLED_HOURS {
        table.insert(&reading(at_hours(h))).unwrap();
    }
}

/// Names of the files currently in `dir`, sorted.
pub fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
