//! Analysis options and time settings carried by a network description.

use serde::{Deserialize, Serialize};
use wf_core::{Real, constants::SECONDS_PER_DAY};

/// Flow units of the description. Only SI flow units are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlowUnits {
    #[default]
    Lps,
    Lpm,
    Mld,
    Cmh,
    Cmd,
    Cms,
}

impl FlowUnits {
    /// Parse an `[OPTIONS] Units` keyword (case-insensitive).
    pub fn from_keyword(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "LPS" => Some(Self::Lps),
            "LPM" => Some(Self::Lpm),
            "MLD" => Some(Self::Mld),
            "CMH" => Some(Self::Cmh),
            "CMD" => Some(Self::Cmd),
            "CMS" => Some(Self::Cms),
            _ => None,
        }
    }

    /// Cubic metres per second represented by one unit.
    pub fn to_cms_factor(self) -> Real {
        match self {
            Self::Lps => 1e-3,
            Self::Lpm => 1e-3 / 60.0,
            Self::Mld => 1_000.0 / SECONDS_PER_DAY,
            Self::Cmh => 1.0 / 3_600.0,
            Self::Cmd => 1.0 / SECONDS_PER_DAY,
            Self::Cms => 1.0,
        }
    }

    pub fn to_cms(self, v: Real) -> Real {
        v * self.to_cms_factor()
    }

    pub fn from_cms(self, q: Real) -> Real {
        q / self.to_cms_factor()
    }
}

/// Pipe friction formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeadlossModel {
    #[default]
    HazenWilliams,
    DarcyWeisbach,
    ChezyManning,
}

impl HeadlossModel {
    pub fn from_keyword(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "H-W" => Some(Self::HazenWilliams),
            "D-W" => Some(Self::DarcyWeisbach),
            "C-M" => Some(Self::ChezyManning),
            _ => None,
        }
    }
}

/// `[OPTIONS]` values relevant to hydraulics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    pub flow_units: FlowUnits,
    pub headloss: HeadlossModel,
    /// Pattern applied to junction demands that name none.
    pub default_pattern: Option<String>,
    pub demand_multiplier: Real,
    pub trials: Option<usize>,
    pub accuracy: Option<Real>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            flow_units: FlowUnits::default(),
            headloss: HeadlossModel::default(),
            default_pattern: None,
            demand_multiplier: 1.0,
            trials: None,
            accuracy: None,
        }
    }
}

/// `[TIMES]` values, all in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Times {
    pub duration_s: u64,
    pub hydraulic_step_s: u64,
    pub pattern_step_s: u64,
    pub pattern_start_s: u64,
}

impl Default for Times {
    fn default() -> Self {
        Self {
            duration_s: 0,
            hydraulic_step_s: 3_600,
            pattern_step_s: 3_600,
            pattern_start_s: 0,
        }
    }
}

impl Times {
    /// Largest number of hydraulic steps one run may cover.
    pub const MAX_STEPS: u64 = 10_000;

    /// Number of entries [`Times::steps`] yields.
    pub fn step_count(&self) -> u64 {
        self.duration_s.div_ceil(self.hydraulic_step_s.max(1)).saturating_add(1)
    }

    /// Whether the horizon stays within [`Times::MAX_STEPS`].
    pub fn is_bounded(&self) -> bool {
        self.step_count() <= Self::MAX_STEPS
    }

    /// Hydraulic time steps covered by the horizon, `0..=duration`.
    pub fn steps(&self) -> Vec<u64> {
        let step = self.hydraulic_step_s.max(1);
        let mut out = Vec::new();
        let mut t = 0;
        loop {
            out.push(t);
            if t >= self.duration_s {
                break;
            }
            t = (t + step).min(self.duration_s);
        }
        out
    }

    /// Index into a pattern of `len` multipliers at simulation time `t_s`.
    pub fn pattern_index(&self, t_s: u64, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let step = self.pattern_step_s.max(1);
        ((t_s.saturating_add(self.pattern_start_s) / step) % len as u64) as usize
    }
}

/// Parse a clock value such as `24:00`, `1:30:00`, `6`, or `6` followed by a
/// unit token (`SEC`, `MIN`, `HOURS`, `DAYS`). Bare numbers are hours.
pub fn parse_duration(value: &str, unit: Option<&str>) -> Option<u64> {
    if value.contains(':') {
        let mut secs = 0.0;
        let mut scale = 3_600.0;
        for part in value.split(':') {
            let v: Real = part.parse().ok()?;
            if !v.is_finite() || v < 0.0 {
                return None;
            }
            secs += v * scale;
            scale /= 60.0;
        }
        return Some(secs.round() as u64);
    }

    let v: Real = value.parse().ok()?;
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    let factor = match unit.map(|u| u.to_ascii_uppercase()) {
        None => 3_600.0,
        Some(u) if u.starts_with("SEC") => 1.0,
        Some(u) if u.starts_with("MIN") => 60.0,
        Some(u) if u.starts_with("HOUR") => 3_600.0,
        Some(u) if u.starts_with("DAY") => SECONDS_PER_DAY,
        Some(_) => return None,
    };
    Some((v * factor).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_unit_factors() {
        assert!((FlowUnits::Lps.to_cms(50.0) - 0.05).abs() < 1e-12);
        assert!((FlowUnits::Cmh.from_cms(1.0) - 3_600.0).abs() < 1e-9);
        assert_eq!(FlowUnits::from_keyword("lps"), Some(FlowUnits::Lps));
        assert_eq!(FlowUnits::from_keyword("GPM"), None);
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("24:00", None), Some(86_400));
        assert_eq!(parse_duration("1:30:00", None), Some(5_400));
        assert_eq!(parse_duration("6", None), Some(21_600));
        assert_eq!(parse_duration("15", Some("MIN")), Some(900));
        assert_eq!(parse_duration("2", Some("days")), Some(172_800));
        assert_eq!(parse_duration("x", None), None);
        assert_eq!(parse_duration("1", Some("fortnight")), None);
    }

    #[test]
    fn steps_cover_horizon() {
        let times = Times {
            duration_s: 7_200,
            ..Times::default()
        };
        assert_eq!(times.steps(), vec![0, 3_600, 7_200]);
        assert_eq!(Times::default().steps(), vec![0]);

        let uneven = Times {
            duration_s: 5_000,
            ..Times::default()
        };
        assert_eq!(uneven.steps(), vec![0, 3_600, 5_000]);
        assert_eq!(uneven.step_count(), 3);
        assert_eq!(Times::default().step_count(), 1);
    }

    #[test]
    fn huge_horizon_is_not_bounded() {
        let times = Times {
            duration_s: parse_duration("1e15", None).unwrap(),
            ..Times::default()
        };
        assert!(!times.is_bounded());
        let year = Times {
            duration_s: parse_duration("365", Some("DAYS")).unwrap(),
            ..Times::default()
        };
        assert!(year.is_bounded());
    }

    #[test]
    fn pattern_index_wraps() {
        let times = Times::default();
        assert_eq!(times.pattern_index(0, 4), 0);
        assert_eq!(times.pattern_index(3 * 3_600, 4), 3);
        assert_eq!(times.pattern_index(5 * 3_600, 4), 1);
        assert_eq!(times.pattern_index(5 * 3_600, 0), 0);
    }
}
