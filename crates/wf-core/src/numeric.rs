use crate::WfError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, WfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(WfError::NonFinite { what, value: v })
    }
}

/// Parse a numeric field of a text record, rejecting NaN and infinities.
pub fn parse_real(token: &str) -> Option<Real> {
    token.parse::<Real>().ok().filter(|v| v.is_finite())
}
