//! Mode flags derived from the experiment-family tag.
//!
//! Markers are matched exactly once, here. Everything downstream branches on
//! [`ModeFlags`] and never looks at the tag text again.
use serde::{Deserialize, Serialize};

const TRANSIENT_MARKERS: &[&str] = &["20TR", "trans"];
const AD_SPINUP_MARKERS: &[&str] = &["ad_spinup"];
const BYPASS_MARKERS: &[&str] = &["CBCN", "ICB", "CLM45CB"];
const FATES_MARKERS: &[&str] = &["ED", "FATES"];
const PREINDUSTRIAL_MARKER: &str = "1850";

/// Explicit mode choices that take precedence over marker matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModeOverrides {
    pub ad_spinup: Option<bool>,
    pub transient: Option<bool>,
    pub bypass: Option<bool>,
    pub fates: Option<bool>,
}

/// Fixed-condition climatology used by non-transient runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateEpoch {
    Preindustrial,
    PresentDay,
}

impl ClimateEpoch {
    pub fn year(self) -> i32 {
        match self {
            ClimateEpoch::Preindustrial => 1850,
            ClimateEpoch::PresentDay => 2000,
        }
    }

    pub fn is_preindustrial(self) -> bool {
        self == ClimateEpoch::Preindustrial
    }
}

/// Closed set of run modes, resolved once per case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeFlags {
    pub ad_spinup: bool,
    pub transient: bool,
    pub bypass: bool,
    pub has_restart: bool,
    pub fates: bool,
    pub epoch: ClimateEpoch,
}

impl ModeFlags {
    /// Match markers in the family tag and case suffix, then apply overrides.
    pub fn resolve(
        compset: &str,
        suffix: &str,
        overrides: &ModeOverrides,
        has_restart: bool,
    ) -> Self {
        let tagged = |markers: &[&str]| {
            markers
                .iter()
                .any(|marker| compset.contains(marker) || suffix.contains(marker))
        };
        let epoch = if compset.contains(PREINDUSTRIAL_MARKER) {
            ClimateEpoch::Preindustrial
        } else {
            ClimateEpoch::PresentDay
        };
        Self {
            ad_spinup: overrides
                .ad_spinup
                .unwrap_or_else(|| tagged(AD_SPINUP_MARKERS)),
            transient: overrides
                .transient
                .unwrap_or_else(|| tagged(TRANSIENT_MARKERS)),
            bypass: overrides
                .bypass
                .unwrap_or_else(|| BYPASS_MARKERS.iter().any(|m| compset.contains(m))),
            has_restart,
            fates: overrides
                .fates
                .unwrap_or_else(|| FATES_MARKERS.iter().any(|m| compset.contains(m))),
            epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_markers_select_modes() {
        let flags = ModeFlags::resolve("20TR transient", "", &ModeOverrides::default(), false);
        assert!(flags.transient);
        assert!(!flags.bypass);
        assert!(!flags.ad_spinup);
        assert_eq!(flags.epoch, ClimateEpoch::PresentDay);

        let flags = ModeFlags::resolve(
            "ICB1850CNPRDCTCBC",
            "_ad_spinup",
            &ModeOverrides::default(),
            false,
        );
        assert!(flags.bypass);
        assert!(flags.ad_spinup);
        assert!(!flags.transient);
        assert_eq!(flags.epoch, ClimateEpoch::Preindustrial);
    }

    #[test]
    fn overrides_win_over_markers() {
        let overrides = ModeOverrides {
            bypass: Some(true),
            transient: Some(false),
            ..ModeOverrides::default()
        };
        let flags = ModeFlags::resolve("1850 spinup", "_trans", &overrides, true);
        assert!(flags.bypass);
        assert!(!flags.transient);
        assert!(flags.has_restart);
    }
}
