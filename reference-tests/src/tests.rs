//! Reference tests runnable as cargo test
//!
//! Short runs of every preset with a coarse reconstruction grid. The binary
//! runs the same checks over longer horizons.

use crate::{
    ConservationCheck, DensityVariationCheck, ExpectedResult, PositionBoundsCheck, ReferenceTest,
    SurfaceCheck,
};
use orchestrator::SceneKind;
use surface::ReconstructionSettings;

fn short_run(kind: SceneKind, timesteps: usize, resolution: [usize; 3]) -> ReferenceTest {
    ReferenceTest {
        name: format!("Short {}", kind),
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
                settings: Some(ReconstructionSettings::new(resolution, 0.5)),
                require_closed: true,
            }),
        },
    }
}

#[test]
fn test_ferro_spikes() {
    let result = short_run(SceneKind::FerroSpikes, 20, [40, 24, 40])
        .run()
        .expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "Ferro spikes test failed");
}

#[test]
fn test_ferro_external_only() {
    let result = short_run(SceneKind::FerroExternalOnly, 20, [40, 24, 40])
        .run()
        .expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "Ferro external-only test failed");
}

#[test]
fn test_fluid_crown() {
    let result = short_run(SceneKind::FluidCrown, 5, [48, 32, 48])
        .run()
        .expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "Fluid crown test failed");
    assert_eq!(result.timesteps, 5);
    assert!((result.sim_time - 0.005).abs() < 1.0e-9);
}

#[test]
fn test_wave_impact() {
    let result = short_run(SceneKind::WaveImpact, 5, [48, 32, 48])
        .run()
        .expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "Wave impact test failed");
}

#[test]
fn failed_check_fails_the_test() {
    let mut test = short_run(SceneKind::FerroExternalOnly, 1, [20, 12, 20]);
    test.expected.surface = None;
    // A box that excludes the whole layer
    test.expected.position_bounds = Some(PositionBoundsCheck {
        min: [0.0, 0.5, 0.0],
        max: [1.0, 1.0, 1.0],
    });
    let result = test.run().expect("Test execution failed");
    assert!(!result.passed);
    assert!(result.surface.is_none());
    let bounds = &result.checks[0];
    assert_eq!(bounds.name, "Position Bounds");
    assert!(!bounds.passed);
    assert!(result.checks[1..].iter().all(|c| c.passed));
}
