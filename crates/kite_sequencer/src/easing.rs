// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing functions for keyframe interpolation.
//!
//! Easings are persisted by their canonical name, so the name table is
//! the serialization contract: renaming a variant breaks old projects.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Easing lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EasingError {
    /// The name is not one of the registered easings
    #[error("Unknown easing: {0:?}")]
    UnknownName(String),
}

/// Remaps normalized progress before interpolating between two instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Easing {
    /// Identity
    #[default]
    Linear,
    /// x²
    Quad,
    /// x³
    Cubic,
    /// x⁴
    Quart,
    /// x⁵
    Quint,
    /// 1 − cos(xπ/2)
    Sine,
    /// 1 − √(1 − x²)
    Circ,
}

impl Easing {
    /// Every registered easing, in display order
    pub const ALL: [Easing; 7] = [
        Easing::Linear,
        Easing::Quad,
        Easing::Cubic,
        Easing::Quart,
        Easing::Quint,
        Easing::Sine,
        Easing::Circ,
    ];

    /// Apply the easing to normalized progress.
    ///
    /// Input is not clamped; values outside `[0, 1]` are passed through the
    /// formula as-is.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Quad => x * x,
            Self::Cubic => x * x * x,
            Self::Quart => x.powi(4),
            Self::Quint => x.powi(5),
            Self::Sine => 1.0 - (x * FRAC_PI_2).cos(),
            Self::Circ => 1.0 - (1.0 - x * x).sqrt(),
        }
    }

    /// Canonical name used in project files
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::Quad => "Quad",
            Self::Cubic => "Cubic",
            Self::Quart => "Quart",
            Self::Quint => "Quint",
            Self::Sine => "Sine",
            Self::Circ => "Circ",
        }
    }

    /// Look up an easing by canonical name
    pub fn from_name(name: &str) -> Result<Self, EasingError> {
        Self::ALL
            .into_iter()
            .find(|easing| easing.name() == name)
            .ok_or_else(|| EasingError::UnknownName(name.to_string()))
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Easing {
    type Err = EasingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl From<Easing> for String {
    fn from(easing: Easing) -> Self {
        easing.name().to_string()
    }
}

impl TryFrom<String> for Easing {
    type Error = EasingError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::from_name(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_resolve_both_ways() {
        for easing in Easing::ALL {
            assert_eq!(Easing::from_name(easing.name()), Ok(easing));
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        assert_eq!(
            Easing::from_name("Cuboc"),
            Err(EasingError::UnknownName("Cuboc".to_string()))
        );
        assert!("linear".parse::<Easing>().is_err());
    }

    #[test]
    fn test_endpoints() {
        for easing in Easing::ALL {
            assert!(easing.apply(0.0).abs() < 1e-12, "{easing} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-12, "{easing} at 1");
        }
    }

    #[test]
    fn test_midpoints() {
        assert_eq!(Easing::Linear.apply(0.5), 0.5);
        assert_eq!(Easing::Quad.apply(0.5), 0.25);
        assert_eq!(Easing::Cubic.apply(0.5), 0.125);
        assert_eq!(Easing::Quart.apply(0.5), 0.0625);
        assert_eq!(Easing::Quint.apply(0.5), 0.03125);
        let sine = 1.0 - (std::f64::consts::PI / 4.0).cos();
        assert!((Easing::Sine.apply(0.5) - sine).abs() < 1e-12);
        let circ = 1.0 - 0.75_f64.sqrt();
        assert!((Easing::Circ.apply(0.5) - circ).abs() < 1e-12);
    }

    #[test]
    fn test_serializes_by_name() {
        let text = ron::to_string(&Easing::Sine).unwrap();
        assert_eq!(text, "\"Sine\"");
        let parsed: Easing = ron::from_str("\"Circ\"").unwrap();
        assert_eq!(parsed, Easing::Circ);
        assert!(ron::from_str::<Easing>("\"Bounce\"").is_err());
    }
}
