//! Reference test binary entry point
//!
//! Runs every scene preset headless and validates the final state. Pass `-s`
//! to also write each reconstructed surface to `output/<scene>.obj`.

use std::path::Path;

use orchestrator::{write_mesh, SceneKind};
use reference_tests::{
    ConservationCheck, DensityVariationCheck, ExpectedResult, PositionBoundsCheck, ReferenceTest,
    SurfaceCheck, TestResult,
};
use tracing_subscriber::EnvFilter;

/// Run a scene preset and validate its final state
///
/// Every preset must keep its particles boxed in, finite and within a loose
/// density band, and its final state must still reconstruct to a closed
/// surface. Isolated splash particles sit near 15% of rest density, which
/// sets the density bound.
fn scene_test(kind: SceneKind, timesteps: usize) -> ReferenceTest {
    ReferenceTest {
        name: format!("Scene {}", kind),
        scene: kind,
        timesteps,
        expected: ExpectedResult {
            position_bounds: Some(PositionBoundsCheck::for_scene(kind, 1.0e-4)),
            conservation: Some(ConservationCheck {
                max_mass_error: 1.0e-6,
            }),
            finite_state: true,
            density_variation: Some(DensityVariationCheck {
                max_variation: 0.9,
            }),
            surface: Some(SurfaceCheck {
                settings: None,
                require_closed: true,
            }),
        },
    }
}

/// Get all reference tests
fn all_tests() -> Vec<ReferenceTest> {
    vec![
        // Long enough for the field to start pulling the layer into spikes
        scene_test(SceneKind::FerroSpikes, 400),
        scene_test(SceneKind::FerroSpikesGravity, 400),
        scene_test(SceneKind::FerroExternalOnly, 400),
        scene_test(SceneKind::FluidCrown, 300),
        scene_test(SceneKind::WaveImpact, 600),
    ]
}

fn save_surface(result: &TestResult, kind: SceneKind) {
    let Some(mesh) = &result.surface else {
        return;
    };
    let path = Path::new("output").join(format!("{}.obj", kind));
    match write_mesh(&path, mesh) {
        Ok(()) => tracing::info!("Wrote {}", path.display()),
        Err(e) => tracing::warn!("Failed to write {}: {}", path.display(), e),
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let save_surfaces = std::env::args().skip(1).any(|arg| arg == "-s");

    tracing::info!("Ferrofluid Reference Test Suite");
    tracing::info!("===============================");

    // Get all tests
    let tests = all_tests();
    tracing::info!("Found {} reference tests", tests.len());

    // Run all tests
    let mut results: Vec<TestResult> = Vec::new();
    let mut passed_count = 0;
    let mut failed_count = 0;

    for test in tests {
        match test.run() {
            Ok(result) => {
                if result.passed {
                    passed_count += 1;
                } else {
                    failed_count += 1;
                }
                result.print_summary();
                if save_surfaces {
                    save_surface(&result, test.scene);
                }
                results.push(result);
            }
            Err(e) => {
                eprintln!("\nERROR running test {}: {}", test.name, e);
                failed_count += 1;
            }
        }
    }

    // Print overall summary
    println!("\n{}", "=".repeat(80));
    println!("OVERALL SUMMARY");
    println!("{}", "=".repeat(80));
    println!("Total tests: {}", passed_count + failed_count);
    println!("Passed: {}", passed_count);
    println!("Failed: {}", failed_count);
    println!("{}", "=".repeat(80));

    // Exit with error code if any tests failed
    if failed_count > 0 {
        std::process::exit(1);
    }
}
