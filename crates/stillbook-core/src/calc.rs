//! # Derived-Field Calculator
//!
//! Pure conversion from raw measurements to alcohol metrics:
//!
//! - `abv = round2((sg_start - sg_end) * 131.25)`
//! - `lal = round2(volume * abv / 100)`
//!
//! Precedence: explicit operator-entered values always win; derivation never
//! overwrites a present value. The rounding (half away from zero, 2 decimal
//! places) must stay exactly as-is to match historical records.

/// Conversion factor from a specific-gravity drop to percent alcohol by volume.
pub const ABV_FACTOR: f64 = 131.25;

/// Round to 2 decimal places, half away from zero.
#[must_use]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// =============================================================================
// MEASUREMENTS
// =============================================================================

/// Raw measurement fields of a stage record, all optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurements {
    /// Starting specific gravity.
    pub sg_start: Option<f64>,
    /// Ending specific gravity.
    pub sg_end: Option<f64>,
    /// Volume in litres.
    pub volume_l: Option<f64>,
    /// Explicit alcohol by volume, percent.
    pub abv: Option<f64>,
    /// Explicit litres of absolute alcohol.
    pub lal: Option<f64>,
}

/// Resolved alcohol metrics after derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Resolved {
    /// Alcohol by volume, percent (explicit or derived).
    pub abv: Option<f64>,
    /// Litres of absolute alcohol (explicit or derived).
    pub lal: Option<f64>,
}

impl Measurements {
    /// Resolve ABV and LAL, deriving each only where no explicit value exists.
    ///
    /// Side-effect free and idempotent: feeding resolved values back in
    /// returns them unchanged.
    #[must_use]
    pub fn resolve(&self) -> Resolved {
        let abv = match (self.abv, self.sg_start, self.sg_end) {
            (Some(explicit), _, _) => Some(explicit),
            (None, Some(sg0), Some(sg1)) => Some(round2((sg0 - sg1) * ABV_FACTOR)),
            _ => None,
        };

        let lal = match (self.lal, self.volume_l, abv) {
            (Some(explicit), _, _) => Some(explicit),
            (None, Some(v), Some(a)) => Some(round2(v * (a / 100.0))),
            _ => None,
        };

        Resolved { abv, lal }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_abv_from_gravity_drop() {
        let m = Measurements {
            sg_start: Some(1.0500),
            sg_end: Some(0.9900),
            ..Default::default()
        };
        // 0.06 * 131.25 = 7.875, rounds half away from zero to 7.88
        assert_eq!(m.resolve().abv, Some(7.88));
    }

    #[test]
    fn derives_lal_from_volume_and_abv() {
        let m = Measurements {
            volume_l: Some(100.0),
            abv: Some(8.5),
            ..Default::default()
        };
        assert_eq!(m.resolve().lal, Some(8.5));
    }

    #[test]
    fn derives_lal_from_derived_abv() {
        let m = Measurements {
            sg_start: Some(1.0500),
            sg_end: Some(0.9900),
            volume_l: Some(100.0),
            ..Default::default()
        };
        let r = m.resolve();
        assert_eq!(r.abv, Some(7.88));
        assert_eq!(r.lal, Some(7.88));
    }

    #[test]
    fn explicit_values_win_over_derivation() {
        let m = Measurements {
            sg_start: Some(1.0500),
            sg_end: Some(0.9900),
            volume_l: Some(100.0),
            abv: Some(9.0),
            lal: Some(1.0),
        };
        let r = m.resolve();
        assert_eq!(r.abv, Some(9.0));
        assert_eq!(r.lal, Some(1.0));
    }

    #[test]
    fn resolution_is_idempotent() {
        let m = Measurements {
            sg_start: Some(1.0500),
            sg_end: Some(0.9900),
            volume_l: Some(100.0),
            ..Default::default()
        };
        let first = m.resolve();
        let again = Measurements {
            abv: first.abv,
            lal: first.lal,
            ..m
        }
        .resolve();
        assert_eq!(first, again);
    }

    #[test]
    fn missing_gravity_yields_no_abv() {
        let m = Measurements {
            sg_start: Some(1.0500),
            ..Default::default()
        };
        assert_eq!(m.resolve(), Resolved::default());
    }

    #[test]
    fn lal_needs_both_volume_and_abv() {
        let m = Measurements {
            volume_l: Some(50.0),
            ..Default::default()
        };
        assert_eq!(m.resolve().lal, None);
    }
}
