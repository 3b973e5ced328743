//! Named scale ladders.
//!
//! Each preset fixes a scale ladder and half-window so experiments can be
//! reproduced by name.

use super::feature_def::FeatureSchema;
use crate::config::{ExtractorConfig, ScaleSpec};
use crate::preprocessing::VarianceConvention;
use serde::{Deserialize, Serialize};

/// Named extractor presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Preset {
    /// Three scales for intraday, daily and regime breaks.
    ///
    /// - micro / media / macro at tau 0.0002 / 0.001 / 0.005
    /// - half-window 20
    #[default]
    ThreeScale,

    /// Five scales from ultra_micro to ultra_macro.
    ///
    /// - tau 0.0001, 0.0003, 0.001, 0.003, 0.01
    /// - half-window 20
    /// - media and coarser scales clock on `MeanAbsSquared`
    FiveScale,

    /// Wide ladder with a short volatility window.
    ///
    /// - fine / short / medium / long at tau 0.001 / 0.005 / 0.01 / 0.02
    /// - half-window 5
    Classic,
}

/// Static description of a preset.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetInfo {
    pub name: &'static str,
    pub scales: Vec<(&'static str, f64)>,
    pub half_window: usize,
    pub feature_count: usize,
}

impl Preset {
    pub fn all() -> &'static [Preset] {
        &[Preset::ThreeScale, Preset::FiveScale, Preset::Classic]
    }

    fn ladder(self) -> (&'static [(&'static str, f64)], usize) {
        match self {
            Preset::ThreeScale => (&[("micro", 0.0002), ("media", 0.001), ("macro", 0.005)], 20),
            Preset::FiveScale => (
                &[
                    ("ultra_micro", 0.0001),
                    ("micro", 0.0003),
                    ("media", 0.001),
                    ("macro", 0.003),
                    ("ultra_macro", 0.01),
                ],
                20,
            ),
            Preset::Classic => (
                &[
                    ("fine", 0.001),
                    ("short", 0.005),
                    ("medium", 0.01),
                    ("long", 0.02),
                ],
                5,
            ),
        }
    }

    /// Index of the first scale clocked on `MeanAbsSquared`, if any.
    fn mean_abs_from(self) -> Option<usize> {
        match self {
            Preset::FiveScale => Some(2),
            Preset::ThreeScale | Preset::Classic => None,
        }
    }

    /// Extractor configuration for this preset.
    pub fn config(self) -> ExtractorConfig {
        let (ladder, half_window) = self.ladder();
        let mean_abs_from = self.mean_abs_from();
        let scales = ladder
            .iter()
            .enumerate()
            .map(|(i, &(label, tau))| {
                let spec = ScaleSpec::new(label, tau);
                match mean_abs_from {
                    Some(from) if i >= from => spec.with_variance(VarianceConvention::MeanAbsSquared),
                    _ => spec,
                }
            })
            .collect();
        let mut config = ExtractorConfig::with_scales(scales);
        config.half_window = half_window;
        config
    }

    pub fn build_schema(self) -> FeatureSchema {
        FeatureSchema::from_config(&self.config())
    }

    pub fn info(self) -> PresetInfo {
        let (ladder, half_window) = self.ladder();
        PresetInfo {
            name: self.name(),
            scales: ladder.to_vec(),
            half_window,
            feature_count: self.config().feature_count(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::ThreeScale => "three_scale",
            Preset::FiveScale => "five_scale",
            Preset::Classic => "classic",
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "three_scale" | "threescale" => Ok(Preset::ThreeScale),
            "five_scale" | "fivescale" => Ok(Preset::FiveScale),
            "classic" => Ok(Preset::Classic),
            other => Err(format!("unknown preset: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for &preset in Preset::all() {
            let config = preset.config();
            assert!(config.validate().is_ok(), "{preset:?}");
            assert_eq!(preset.build_schema().total_count(), config.feature_count());
        }
    }

    #[test]
    fn test_preset_info() {
        let info = Preset::FiveScale.info();
        assert_eq!(info.scales.len(), 5);
        assert_eq!(info.scales[0], ("ultra_micro", 0.0001));
        // 5 blocks of 26 + 9 fixed cross + 4 pair ratios
        assert_eq!(info.feature_count, 143);

        assert_eq!(Preset::Classic.info().half_window, 5);
        assert_eq!(Preset::ThreeScale.info().feature_count, 89);
    }

    #[test]
    fn test_five_scale_clocks_coarse_scales_on_mean_abs() {
        let config = Preset::FiveScale.config();
        let conventions: Vec<_> = config.scales.iter().map(|s| config.variance_for(s)).collect();
        assert_eq!(conventions[..2], [VarianceConvention::Sample; 2]);
        assert_eq!(conventions[2..], [VarianceConvention::MeanAbsSquared; 3]);

        let three = Preset::ThreeScale.config();
        assert!(three.scales.iter().all(|s| s.variance.is_none()));
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("three-scale".parse::<Preset>(), Ok(Preset::ThreeScale));
        assert_eq!("FiveScale".parse::<Preset>(), Ok(Preset::FiveScale));
        assert!("seven_scale".parse::<Preset>().is_err());
    }
}
