//! Reference test framework for ferrofluid SPH validation
//!
//! Each reference test runs one scene preset headless for a fixed number of
//! ticks and then validates the final state: particles inside their box,
//! mass conserved, no NaNs, bounded density error and a non-empty
//! reconstructed surface.

#[cfg(test)]
mod tests;

use kernel::{ErrorMetrics, ParticleArrays, Simulation, SimulationKernel};
use orchestrator::{OrchestratorResult, Scene, SceneKind};
use surface::{MarchingTetrahedra, ReconstructionSettings, TriangleMesh};

/// Expected result criteria for a reference test
#[derive(Debug, Clone, Default)]
pub struct ExpectedResult {
    /// Particle position bounds validation
    pub position_bounds: Option<PositionBoundsCheck>,
    /// Conservation metrics validation
    pub conservation: Option<ConservationCheck>,
    /// Require every position, velocity and density to be finite
    pub finite_state: bool,
    /// Bound on the relative density error
    pub density_variation: Option<DensityVariationCheck>,
    /// Surface reconstruction of the final state
    pub surface: Option<SurfaceCheck>,
}

/// Check that particles remain within specified bounds
#[derive(Debug, Clone)]
pub struct PositionBoundsCheck {
    /// Minimum allowed position [x, y, z]
    pub min: [f32; 3],
    /// Maximum allowed position [x, y, z]
    pub max: [f32; 3],
}

impl PositionBoundsCheck {
    /// The scene's collision box (unit cube when unbounded) grown by `margin`.
    pub fn for_scene(kind: SceneKind, margin: f32) -> Self {
        let bounds = Scene::build(kind).config.bounds.unwrap_or_default();
        Self {
            min: bounds.lower.map(|v| v - margin),
            max: bounds.upper.map(|v| v + margin),
        }
    }
}

/// Check conservation metrics
#[derive(Debug, Clone)]
pub struct ConservationCheck {
    /// Maximum allowed mass conservation error (0.0 to 1.0)
    pub max_mass_error: f32,
}

/// Check the largest relative density deviation from rest
#[derive(Debug, Clone)]
pub struct DensityVariationCheck {
    /// Maximum allowed `|rho - rho0| / rho0`
    pub max_variation: f32,
}

/// Reconstruct the final surface and require it to be non-empty
#[derive(Debug, Clone)]
pub struct SurfaceCheck {
    /// Overrides the scene's reconstruction settings
    pub settings: Option<ReconstructionSettings>,
    /// Also require every mesh edge to be shared by exactly two triangles
    pub require_closed: bool,
}

/// Result of running a reference test
#[derive(Debug)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Whether test passed
    pub passed: bool,
    /// Individual check results
    pub checks: Vec<CheckResult>,
    /// Final error metrics
    pub error_metrics: ErrorMetrics,
    /// Number of timesteps executed
    pub timesteps: usize,
    /// Simulated time (seconds)
    pub sim_time: f64,
    /// Reconstructed final surface, when a surface check ran
    pub surface: Option<TriangleMesh>,
}

/// Result of an individual validation check
#[derive(Debug)]
pub struct CheckResult {
    /// Check name
    pub name: String,
    /// Whether check passed
    pub passed: bool,
    /// Error message if failed
    pub message: Option<String>,
}

/// A reference test case
pub struct ReferenceTest {
    /// Test name
    pub name: String,
    /// Scene preset to run
    pub scene: SceneKind,
    /// Number of timesteps to run
    pub timesteps: usize,
    /// Expected results to validate
    pub expected: ExpectedResult,
}

impl ReferenceTest {
    /// Run the reference test and return results
    pub fn run(&self) -> OrchestratorResult<TestResult> {
        tracing::info!("Running reference test: {}", self.name);

        let scene = Scene::build(self.scene);
        let dt = scene.config.dt;
        let mut sim = Simulation::new(&scene.positions, scene.velocities.as_deref(), scene.config)?;

        tracing::info!(
            "Initialized: {} particles, h={}, layers {:?}",
            sim.particle_count(),
            sim.smoothing_length(),
            sim.layer_names()
        );

        // Run simulation
        tracing::info!("Running {} timesteps...", self.timesteps);
        for step in 0..self.timesteps {
            sim.tick();

            // Log progress every 10% of steps
            if (step + 1) % (self.timesteps / 10).max(1) == 0 {
                let progress = ((step + 1) as f32 / self.timesteps as f32) * 100.0;
                tracing::info!("Progress: {:.0}% ({}/{})", progress, step + 1, self.timesteps);
            }
        }
        let sim_time = self.timesteps as f64 * dt as f64;
        tracing::info!("Simulation complete: {} steps, {:.6}s simulated", self.timesteps, sim_time);

        // Get final state
        let particles = sim.particles();
        let error_metrics = sim.error_metrics();

        // Validate results
        let mut checks = Vec::new();

        if let Some(ref bounds) = self.expected.position_bounds {
            checks.push(validate_position_bounds(particles, bounds));
        }

        if let Some(ref conservation) = self.expected.conservation {
            checks.push(validate_conservation(&error_metrics, conservation));
        }

        if self.expected.finite_state {
            checks.push(validate_finite_state(particles));
        }

        if let Some(ref density) = self.expected.density_variation {
            checks.push(validate_density_variation(&error_metrics, density));
        }

        let mut surface = None;
        if let Some(ref check) = self.expected.surface {
            let settings = check.settings.unwrap_or(scene.reconstruction);
            let reconstruction = surface::reconstruct(&sim.snapshot(), &settings, &MarchingTetrahedra)?;
            checks.push(validate_surface(&reconstruction.mesh, check));
            surface = Some(reconstruction.mesh);
        }

        Ok(TestResult {
            name: self.name.clone(),
            passed: checks.iter().all(|c| c.passed),
            checks,
            error_metrics,
            timesteps: self.timesteps,
            sim_time,
            surface,
        })
    }
}

fn pass(name: &str, message: String) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        passed: true,
        message: Some(message),
    }
}

fn fail(name: &str, message: String) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        passed: false,
        message: Some(message),
    }
}

/// Validate that particles remain within specified bounds
fn validate_position_bounds(
    particles: &ParticleArrays,
    bounds: &PositionBoundsCheck,
) -> CheckResult {
    let mut violations = 0;
    let mut max_violation = 0.0_f32;

    for i in 0..particles.len() {
        let pos = particles.position(i);

        for axis in 0..3 {
            if pos[axis] < bounds.min[axis] {
                violations += 1;
                max_violation = max_violation.max(bounds.min[axis] - pos[axis]);
            }
            if pos[axis] > bounds.max[axis] {
                violations += 1;
                max_violation = max_violation.max(pos[axis] - bounds.max[axis]);
            }
        }
    }

    if violations == 0 {
        CheckResult {
            name: "Position Bounds".to_string(),
            passed: true,
            message: None,
        }
    } else {
        fail(
            "Position Bounds",
            format!(
                "{} particles out of bounds (max violation: {:.6} m)",
                violations, max_violation
            ),
        )
    }
}

/// Validate conservation metrics
fn validate_conservation(metrics: &ErrorMetrics, check: &ConservationCheck) -> CheckResult {
    if metrics.mass_conservation <= check.max_mass_error {
        pass(
            "Conservation",
            format!(
                "Mass: {:.3}%, Energy drift: {:.1}%",
                metrics.mass_conservation * 100.0,
                metrics.energy_conservation * 100.0
            ),
        )
    } else {
        fail(
            "Conservation",
            format!(
                "Mass: {:.3}% (limit: {:.3}%)",
                metrics.mass_conservation * 100.0,
                check.max_mass_error * 100.0
            ),
        )
    }
}

/// Validate that no state component went NaN or infinite
fn validate_finite_state(particles: &ParticleArrays) -> CheckResult {
    let fields: [(&str, &[f32]); 7] = [
        ("x", &particles.x),
        ("y", &particles.y),
        ("z", &particles.z),
        ("vx", &particles.vx),
        ("vy", &particles.vy),
        ("vz", &particles.vz),
        ("density", &particles.density),
    ];
    let bad: Vec<String> = fields
        .iter()
        .filter_map(|(name, values)| {
            let count = values.iter().filter(|v| !v.is_finite()).count();
            (count > 0).then(|| format!("{}: {}", name, count))
        })
        .collect();

    if bad.is_empty() {
        pass("Finite State", format!("{} particles finite", particles.len()))
    } else {
        fail("Finite State", format!("non-finite values ({})", bad.join(", ")))
    }
}

/// Validate the maximum relative density deviation
fn validate_density_variation(
    metrics: &ErrorMetrics,
    check: &DensityVariationCheck,
) -> CheckResult {
    let variation = metrics.max_density_variation;
    if variation <= check.max_variation {
        pass(
            "Density Variation",
            format!("Max variation: {:.1}%", variation * 100.0),
        )
    } else {
        fail(
            "Density Variation",
            format!(
                "Max variation: {:.1}% (limit: {:.1}%)",
                variation * 100.0,
                check.max_variation * 100.0
            ),
        )
    }
}

/// Validate the reconstructed surface
fn validate_surface(mesh: &TriangleMesh, check: &SurfaceCheck) -> CheckResult {
    if mesh.is_empty() {
        return fail("Surface", "reconstruction produced no triangles".to_string());
    }
    if check.require_closed && !mesh.is_closed() {
        return fail(
            "Surface",
            format!("{} triangles, mesh has open edges", mesh.triangle_count()),
        );
    }
    pass(
        "Surface",
        format!(
            "{} vertices, {} triangles",
            mesh.vertices.len(),
            mesh.triangle_count()
        ),
    )
}

impl TestResult {
    /// Print a summary of the test result
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(80));
        println!("Test: {}", self.name);
        println!("{}", "=".repeat(80));
        println!("Status: {}", if self.passed { "PASSED" } else { "FAILED" });
        println!("Timesteps: {}", self.timesteps);
        println!("Simulated time: {:.6} s", self.sim_time);
        println!("\nError Metrics:");
        println!("  Max density variation: {:.2}%", self.error_metrics.max_density_variation * 100.0);
        println!("  Mass conservation: {:.3}%", self.error_metrics.mass_conservation * 100.0);
        println!("  Energy drift: {:.1}%", self.error_metrics.energy_conservation * 100.0);
        println!("\nValidation Checks:");
        for check in &self.checks {
            let status = if check.passed { "PASS" } else { "FAIL" };
            print!("  [{}] {}", status, check.name);
            if let Some(ref msg) = check.message {
                print!(" - {}", msg);
            }
            println!();
        }
        println!("{}", "=".repeat(80));
    }
}
