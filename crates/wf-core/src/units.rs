// wf-core/src/units.rs

use uom::si::f64::{Length as UomLength, Power as UomPower, VolumeRate as UomVolumeRate};

// Public canonical unit types (SI, f64)
pub type Length = UomLength;
pub type Power = UomPower;
pub type VolumeRate = UomVolumeRate;

/// Litres per cubic metre.
pub const LITERS_PER_M3: f64 = 1_000.0;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

/// Cubic metres per second.
#[inline]
pub fn cms(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v)
}

/// Litres per second.
#[inline]
pub fn lps(v: f64) -> VolumeRate {
    cms(v / LITERS_PER_M3)
}

#[inline]
pub fn kw(v: f64) -> Power {
    use uom::si::power::kilowatt;
    Power::new::<kilowatt>(v)
}

/// Express a flow in litres per second.
#[inline]
pub fn to_lps(q: VolumeRate) -> f64 {
    q.value * LITERS_PER_M3
}

pub mod constants {
    pub const G0_MPS2: f64 = 9.806_65;

    /// Density of water at ~4 C, kg/m3.
    pub const RHO_WATER: f64 = 1_000.0;

    /// Specific weight of water, N/m3.
    pub const GAMMA_WATER: f64 = RHO_WATER * G0_MPS2;

    pub const SECONDS_PER_DAY: f64 = 86_400.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _l = m(2.0);
        let _d = mm(150.0);
        let _q = cms(0.1);
        let _p = kw(15.0);
    }

    #[test]
    fn litre_conversions() {
        assert!((lps(25.0).value - 0.025).abs() < 1e-15);
        assert!((to_lps(cms(0.2)) - 200.0).abs() < 1e-9);
        assert!((mm(300.0).value - 0.3).abs() < 1e-15);
    }
}
