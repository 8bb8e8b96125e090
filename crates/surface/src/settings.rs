//! Reconstruction settings.

use serde::{Deserialize, Serialize};

use crate::error::{SurfaceError, SurfaceResult};

/// Shape constants of the anisotropic kernel.
///
/// These are empirical tuning values, not derived quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnisotropyParams {
    /// Blend toward the weighted neighbor mean (0 keeps the particle position).
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    /// Singular values are floored at `sigma_max / kr`.
    #[serde(default = "default_kr")]
    pub kr: f64,
    /// Scale applied to singular values in well-sampled regions.
    #[serde(default = "default_ks")]
    pub ks: f64,
    /// Isotropic scale used in sparse regions.
    #[serde(default = "default_kn")]
    pub kn: f64,
    /// Neighbor count below which the isotropic fallback is used.
    #[serde(default = "default_min_neighbors")]
    pub min_neighbors: usize,
}

fn default_lambda() -> f64 {
    0.92
}

fn default_kr() -> f64 {
    4.0
}

fn default_ks() -> f64 {
    1400.0
}

fn default_kn() -> f64 {
    0.5
}

fn default_min_neighbors() -> usize {
    25
}

impl Default for AnisotropyParams {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
            kr: default_kr(),
            ks: default_ks(),
            kn: default_kn(),
            min_neighbors: default_min_neighbors(),
        }
    }
}

/// Parameters of one reconstruction pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionSettings {
    /// Sampling grid nodes along x, y and z.
    #[serde(default = "default_resolution")]
    pub resolution: [usize; 3],
    /// Field value at which the surface is extracted.
    #[serde(default = "default_isovalue")]
    pub isovalue: f64,
    /// Anisotropic kernel constants.
    #[serde(default)]
    pub anisotropy: AnisotropyParams,
}

fn default_resolution() -> [usize; 3] {
    [200, 200, 200]
}

fn default_isovalue() -> f64 {
    0.5
}

impl Default for ReconstructionSettings {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            isovalue: default_isovalue(),
            anisotropy: AnisotropyParams::default(),
        }
    }
}

impl ReconstructionSettings {
    /// Settings with the given resolution and isovalue and default kernel constants.
    pub fn new(resolution: [usize; 3], isovalue: f64) -> Self {
        Self {
            resolution,
            isovalue,
            anisotropy: AnisotropyParams::default(),
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> SurfaceResult<()> {
        if self.resolution.iter().any(|&n| n < 2) {
            return Err(SurfaceError::InvalidConfig(format!(
                "resolution must be at least 2 per axis, got {:?}",
                self.resolution
            )));
        }
        if !self.isovalue.is_finite() {
            return Err(SurfaceError::InvalidConfig(
                "isovalue must be finite".to_string(),
            ));
        }
        let a = &self.anisotropy;
        if !(0.0..=1.0).contains(&a.lambda) {
            return Err(SurfaceError::InvalidConfig(format!(
                "lambda must be in [0, 1], got {}",
                a.lambda
            )));
        }
        if a.kr < 1.0 {
            return Err(SurfaceError::InvalidConfig(format!(
                "kr must be at least 1, got {}",
                a.kr
            )));
        }
        if a.ks <= 0.0 || a.kn <= 0.0 || !a.ks.is_finite() || !a.kn.is_finite() {
            return Err(SurfaceError::InvalidConfig(
                "ks and kn must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
