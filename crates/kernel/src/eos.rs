//! Equation of state for the weakly-compressible fluid.

/// Tait equation of state for a weakly-compressible liquid (WCSPH).
///
/// ```text
/// P = kappa * B * ((rho / rho0)^gamma - 1)
/// ```
/// where `B = rho0 * c0^2 / gamma`.
///
/// # Arguments
/// * `density` - Current density rho.
/// * `rest_density` - Reference rest density rho0.
/// * `c0` - Numerical speed of sound.
/// * `gamma` - Tait exponent (7 for water).
/// * `kappa` - Stiffness multiplier.
///
/// # Returns
/// Pressure. Negative (tension) if `density < rest_density`.
pub fn tait_eos(density: f32, rest_density: f32, c0: f32, gamma: f32, kappa: f32) -> f32 {
    let b = rest_density * c0 * c0 / gamma;
    let ratio = density / rest_density;
    kappa * b * (ratio.powf(gamma) - 1.0)
}

/// Parameters of the pressure law, copied out of the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct PressureLaw {
    /// Reference rest density rho0.
    pub rest_density: f32,
    /// Numerical speed of sound.
    pub c0: f32,
    /// Tait exponent.
    pub gamma: f32,
    /// Stiffness multiplier.
    pub kappa: f32,
    /// Clamp negative pressure to zero.
    pub clamp_negative: bool,
}

impl PressureLaw {
    /// Pressure at the given density.
    #[inline]
    pub fn pressure(&self, density: f32) -> f32 {
        let p = tait_eos(density, self.rest_density, self.c0, self.gamma, self.kappa);
        if self.clamp_negative {
            p.max(0.0)
        } else {
            p
        }
    }

    /// Fill `pressure` from `density` element-wise.
    pub fn apply(&self, density: &[f32], pressure: &mut [f32]) {
        debug_assert_eq!(density.len(), pressure.len());
        for (p, &rho) in pressure.iter_mut().zip(density) {
            *p = self.pressure(rho);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water(clamp_negative: bool) -> PressureLaw {
        PressureLaw {
            rest_density: 1000.0,
            c0: 20.0,
            gamma: 7.0,
            kappa: 1.0,
            clamp_negative,
        }
    }

    #[test]
    fn tait_at_rest_density_is_zero() {
        let p = tait_eos(1000.0, 1000.0, 20.0, 7.0, 1.0);
        assert!(p.abs() < 1.0e-3, "pressure at rest density should be ~0, got {p}");
    }

    #[test]
    fn tait_positive_when_compressed() {
        let p = water(false).pressure(1010.0);
        assert!(p > 0.0, "compressed fluid should have positive pressure, got {p}");
    }

    #[test]
    fn tait_negative_when_expanded() {
        let p = water(false).pressure(990.0);
        assert!(p < 0.0, "expanded fluid should have negative pressure, got {p}");
    }

    #[test]
    fn clamp_removes_tension() {
        assert_eq!(water(true).pressure(990.0), 0.0);
        assert!(water(true).pressure(1010.0) > 0.0);
    }

    #[test]
    fn kappa_scales_linearly() {
        let base = tait_eos(1020.0, 1000.0, 20.0, 7.0, 1.0);
        let stiff = tait_eos(1020.0, 1000.0, 20.0, 7.0, 3.0);
        assert!((stiff - 3.0 * base).abs() < 1.0e-2 * base.abs());
    }

    #[test]
    fn apply_fills_slice() {
        let density = [1000.0, 1010.0];
        let mut pressure = [f32::NAN; 2];
        water(true).apply(&density, &mut pressure);
        assert!(pressure[0].abs() < 1.0e-3);
        assert!(pressure[1] > 0.0);
    }
}
