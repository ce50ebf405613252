//! Per-dialect capability descriptions

use quarry_ir::{CorrelationMode, OpKind, TemporalUnit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What a SQL dialect can express and how it spells it.
///
/// Everything except `name` falls back to the base dialect's value when omitted from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectSpec {
    pub name: String,

    /// Operations this dialect rejects outright.
    #[serde(default)]
    pub unsupported: BTreeSet<OpKind>,

    /// Unit keyword accepted by `DATE_TRUNC`.
    #[serde(default = "base_truncate_units")]
    pub truncate_units: BTreeMap<TemporalUnit, String>,

    /// Unit keyword accepted after `INTERVAL '<n>'`.
    #[serde(default = "base_interval_units")]
    pub interval_units: BTreeMap<TemporalUnit, String>,

    #[serde(default)]
    pub ordered_aggregates_require_order_by: bool,

    #[serde(default = "all_correlation_modes")]
    pub correlation_modes: BTreeSet<CorrelationMode>,

    /// `CURRENT_DATE` exists; otherwise today's date is derived from `CURRENT_TIMESTAMP`.
    #[serde(default = "enabled")]
    pub native_current_date: bool,

    /// Aggregates accept `FILTER (WHERE ...)`.
    #[serde(default = "enabled")]
    pub aggregate_filter: bool,
}

fn enabled() -> bool {
    true
}

fn all_correlation_modes() -> BTreeSet<CorrelationMode> {
    BTreeSet::from([CorrelationMode::Sample, CorrelationMode::Population])
}

fn vocabulary(entries: &[(TemporalUnit, &str)]) -> BTreeMap<TemporalUnit, String> {
    entries
        .iter()
        .map(|(unit, keyword)| (*unit, keyword.to_string()))
        .collect()
}

fn base_truncate_units() -> BTreeMap<TemporalUnit, String> {
    use TemporalUnit::*;
    vocabulary(&[
        (Year, "year"),
        (Quarter, "quarter"),
        (Month, "month"),
        (Week, "week"),
        (Day, "day"),
        (Hour, "hour"),
        (Minute, "minute"),
        (Second, "second"),
        (Millisecond, "millisecond"),
        (Microsecond, "microsecond"),
    ])
}

fn base_interval_units() -> BTreeMap<TemporalUnit, String> {
    use TemporalUnit::*;
    vocabulary(&[
        (Year, "YEAR"),
        (Month, "MONTH"),
        (Week, "WEEK"),
        (Day, "DAY"),
        (Hour, "HOUR"),
        (Minute, "MINUTE"),
        (Second, "SECOND"),
        (Millisecond, "MILLISECOND"),
        (Microsecond, "MICROSECOND"),
    ])
}

impl DialectSpec {
    /// ANSI-flavoured defaults. Supports every operation.
    pub fn base() -> Self {
        Self {
            name: "base".to_string(),
            unsupported: BTreeSet::new(),
            truncate_units: base_truncate_units(),
            interval_units: base_interval_units(),
            ordered_aggregates_require_order_by: false,
            correlation_modes: all_correlation_modes(),
            native_current_date: true,
            aggregate_filter: true,
        }
    }

    pub fn postgres() -> Self {
        let mut truncate_units = base_truncate_units();
        truncate_units.insert(TemporalUnit::Millisecond, "milliseconds".to_string());
        truncate_units.insert(TemporalUnit::Microsecond, "microseconds".to_string());

        Self {
            name: "postgres".to_string(),
            truncate_units,
            correlation_modes: BTreeSet::from([CorrelationMode::Population]),
            ..Self::base()
        }
    }

    pub fn duckdb() -> Self {
        Self {
            name: "duckdb".to_string(),
            correlation_modes: BTreeSet::from([CorrelationMode::Population]),
            ..Self::base()
        }
    }

    /// Postgres wire-compatible streaming database with a narrower function set.
    pub fn risingwave() -> Self {
        Self {
            name: "risingwave".to_string(),
            unsupported: BTreeSet::from([
                OpKind::Arbitrary,
                OpKind::DateFromYMD,
                OpKind::Mode,
                OpKind::RandomUUID,
            ]),
            ordered_aggregates_require_order_by: true,
            native_current_date: false,
            ..Self::postgres()
        }
    }

    pub fn builtins() -> Vec<DialectSpec> {
        vec![
            Self::base(),
            Self::postgres(),
            Self::duckdb(),
            Self::risingwave(),
        ]
    }

    pub fn supports(&self, kind: OpKind) -> bool {
        !self.unsupported.contains(&kind)
    }

    pub fn truncate_unit(&self, unit: TemporalUnit) -> Option<&str> {
        self.truncate_units.get(&unit).map(String::as_str)
    }

    pub fn interval_unit(&self, unit: TemporalUnit) -> Option<&str> {
        self.interval_units.get(&unit).map(String::as_str)
    }

    pub fn supports_correlation(&self, how: CorrelationMode) -> bool {
        self.correlation_modes.contains(&how)
    }
}
