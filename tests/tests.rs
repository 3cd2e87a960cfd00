use pixelfem::{
    classify, oscillator_error, Backend, BufferId, EngineState, ForceSet, Grid, IntegratorKind, Kernel, Lattice,
    MarkerTable, NVec2, NodeField, NodeRole, NodeState, Parameters, RgbaImage, Scenario, SimConfig, SoftBody,
};

use proptest::prelude::*;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const THRUST_RED: [u8; 4] = [255, 0, 0, 255];

/// Build a sprite from a list of set pixels
pub fn sprite(width: usize, height: usize, pixels: &[(usize, usize, [u8; 4])]) -> RgbaImage {
    let mut img = RgbaImage::blank(width, height);
    for &(x, y, p) in pixels {
        img.set_pixel(x, y, p);
    }
    img
}

/// Body with default parameters on the serial backend
pub fn body_from(image: &RgbaImage, lattice: Lattice, kind: IntegratorKind) -> SoftBody {
    SoftBody::from_image(
        image,
        &MarkerTable::default(),
        lattice,
        &Parameters::default(),
        kind,
        Backend::Serial,
    )
    .unwrap()
}

/// Random RGBA sprites up to 6x6, alpha either 0 or 255
fn arb_sprite() -> impl Strategy<Value = RgbaImage> {
    (1usize..7, 1usize..7).prop_flat_map(|(w, h)| {
        prop::collection::vec((any::<[u8; 3]>(), any::<bool>()), w * h).prop_map(move |px| {
            let data = px
                .into_iter()
                .flat_map(|([r, g, b], opaque)| [r, g, b, if opaque { 255 } else { 0 }])
                .collect();
            RgbaImage::from_rgba(w, h, data).unwrap()
        })
    })
}

/// Same, with every pixel pushed off the reserved marker colours
fn arb_plain_sprite() -> impl Strategy<Value = RgbaImage> {
    arb_sprite().prop_map(|mut img| {
        for px in img.data.chunks_exact_mut(4) {
            if px[0] == 255 && px[1] == 0 && px[2] <= 2 {
                px[0] = 254;
            }
        }
        img
    })
}

fn arb_lattice() -> impl Strategy<Value = Lattice> {
    prop_oneof![Just(Lattice::Pixel), Just(Lattice::Corner)]
}

fn arb_kind() -> impl Strategy<Value = IntegratorKind> {
    prop_oneof![Just(IntegratorKind::Rk4), Just(IntegratorKind::Euler)]
}

// ==================================================================================
// Classifier tests
// ==================================================================================

proptest! {
    #[test]
    fn classification_is_deterministic(img in arb_sprite(), lattice in arb_lattice()) {
        let a = classify(&img, &MarkerTable::default(), lattice);
        let b = classify(&img, &MarkerTable::default(), lattice);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn occupied_nodes_match_opaque_pixels(img in arb_plain_sprite()) {
        let field = classify(&img, &MarkerTable::default(), Lattice::Pixel);
        prop_assert_eq!(field.occupied_count(), img.opaque_count());
        prop_assert_eq!(field.count(NodeRole::Structural), img.opaque_count());
    }

    #[test]
    fn corner_lattice_has_border_nodes(img in arb_sprite()) {
        let field = classify(&img, &MarkerTable::default(), Lattice::Corner);
        prop_assert_eq!(field.roles.shape(), (img.width + 1, img.height + 1));
        // every opaque pixel occupies its four corners
        for y in 0..img.height {
            for x in 0..img.width {
                if img.is_opaque(x, y) {
                    for (c, r) in [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)] {
                        prop_assert!(field.roles.get(c as isize, r as isize).unwrap().is_occupied());
                    }
                }
            }
        }
    }
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn isolated_node_stays_at_rest() {
    for kind in [IntegratorKind::Rk4, IntegratorKind::Euler] {
        let mut body = body_from(&sprite(1, 1, &[(0, 0, WHITE)]), Lattice::Pixel, kind);
        for _ in 0..200 {
            body.update(0.1, 5).unwrap();
        }
        let s = body.node_state(0, 0).unwrap();
        assert_eq!(s.position, NVec2::zeros(), "{:?} drifted", kind);
        assert_eq!(s.velocity, NVec2::zeros(), "{:?} gained speed", kind);
    }
}

#[test]
fn undeformed_sprite_stays_at_rest() {
    let pixels: Vec<_> = (0..9).map(|i| (i % 3, i / 3, WHITE)).collect();
    let mut body = body_from(&sprite(3, 3, &pixels), Lattice::Corner, IntegratorKind::Rk4);
    let before = body.current().clone();
    body.update(1.0, 50).unwrap();
    assert_eq!(body.current(), &before);
}

#[test]
fn rk4_converges_at_fourth_order() {
    let t_end = 4.0;
    let dts = [0.4f32, 0.2, 0.1];

    let rk4: Vec<f32> = dts.iter().map(|&dt| oscillator_error(IntegratorKind::Rk4, dt, t_end).unwrap()).collect();
    let euler: Vec<f32> = dts.iter().map(|&dt| oscillator_error(IntegratorKind::Euler, dt, t_end).unwrap()).collect();

    for i in 0..dts.len() {
        assert!(rk4[i].is_finite() && euler[i].is_finite());
        assert!(rk4[i] < euler[i], "dt = {}: rk4 {} vs euler {}", dts[i], rk4[i], euler[i]);
    }
    assert!(rk4[1] < rk4[0] && rk4[2] < rk4[0], "rk4 errors not shrinking: {:?}", rk4);

    // halving dt: ~16x less error for RK4, ~2x for semi-implicit Euler
    let rk4_order = (rk4[0] / rk4[1]).log2();
    let euler_order = (euler[0] / euler[1]).log2();
    assert!(rk4_order > 3.0, "rk4 order {} ({:?})", rk4_order, rk4);
    assert!(euler_order < 2.0, "euler order {} ({:?})", euler_order, euler);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn passes_never_read_their_write_buffer(
        img in arb_sprite(),
        lattice in arb_lattice(),
        kind in arb_kind(),
        substeps in 1usize..4,
    ) {
        let mut body = body_from(&img, lattice, kind);
        body.engines_mut().thrust_on = true;
        body.record_passes(true);

        for _ in 0..substeps {
            let tick = body.tick();
            let before = body.pass_log().passes().len();
            body.substep(0.01).unwrap();

            let passes = &body.pass_log().passes()[before..];
            for pass in passes {
                prop_assert!(pass.is_disjoint(), "{:?}", pass);
            }
            // the authoritative state is only ever written by the final pass
            let last = passes.last().unwrap();
            prop_assert_eq!(last.write, BufferId::State(1 - tick));
            prop_assert!(last.reads.contains(&BufferId::State(tick)));
            for pass in &passes[..passes.len() - 1] {
                prop_assert!(!matches!(pass.write, BufferId::State(_)));
            }
            let expected = if kind == IntegratorKind::Rk4 { 8 } else { 2 };
            prop_assert_eq!(passes.len(), expected);
            prop_assert_eq!(body.tick(), 1 - tick);
        }
    }

    #[test]
    fn valid_sprites_stay_finite(img in arb_sprite(), lattice in arb_lattice()) {
        let mut body = body_from(&img, lattice, IntegratorKind::Rk4);
        *body.engines_mut() = EngineState { thrust_on: true, left_on: true, right_on: true };
        for _ in 0..10 {
            body.update(0.1, 5).unwrap();
        }
        prop_assert!(body.is_finite());
    }
}

#[test]
fn rk4_passes_follow_stage_order() {
    let mut body = body_from(&sprite(2, 2, &[(0, 0, WHITE), (1, 1, WHITE)]), Lattice::Pixel, IntegratorKind::Rk4);
    body.record_passes(true);
    body.substep(0.01).unwrap();

    let p = body.pass_log().passes();
    let derive_inputs: Vec<BufferId> = p.iter().filter(|p| p.kernel == Kernel::Derive).map(|p| p.reads[0]).collect();
    assert_eq!(
        derive_inputs,
        vec![BufferId::State(0), BufferId::Trial, BufferId::Trial, BufferId::Trial]
    );
    let derive_outputs: Vec<BufferId> = p.iter().filter(|p| p.kernel == Kernel::Derive).map(|p| p.write).collect();
    assert_eq!(
        derive_outputs,
        (0..4).map(BufferId::Derivative).collect::<Vec<_>>()
    );
    // every trial state is built from the authoritative state, never from a previous trial
    for apply in p.iter().filter(|p| p.kernel == Kernel::Apply) {
        assert_eq!(apply.reads[0], BufferId::State(0));
        assert_eq!(apply.write, BufferId::Trial);
    }
}

// ==================================================================================
// Engine tests
// ==================================================================================

#[test]
fn engine_off_is_bit_identical_to_structural() {
    let engine_field = NodeField::from_roles(Grid::from_vec(2, 1, vec![NodeRole::Thrust, NodeRole::Structural]).unwrap());
    let plain_field = NodeField::from_roles(Grid::new(2, 1, NodeRole::Structural));

    let state = Grid::from_vec(
        2,
        1,
        vec![
            NodeState {
                position: NVec2::new(0.1, -0.3),
                velocity: NVec2::new(0.7, 0.2),
            },
            NodeState {
                position: NVec2::new(1.4, 0.2),
                velocity: NVec2::new(-0.1, 0.0),
            },
        ],
    )
    .unwrap();

    let forces = ForceSet::from_parameters(&Parameters::default());
    let off = EngineState::default();
    let a = forces.evaluate(0.0, &engine_field, &state, off, 0);
    let b = forces.evaluate(0.0, &plain_field, &state, off, 0);
    assert_eq!(a.d_velocity.x.to_bits(), b.d_velocity.x.to_bits());
    assert_eq!(a.d_velocity.y.to_bits(), b.d_velocity.y.to_bits());
    assert_eq!(a.d_position, b.d_position);

    // other engines do not gate the thrust node either
    let others = EngineState { thrust_on: false, left_on: true, right_on: true };
    assert_eq!(forces.evaluate(0.0, &engine_field, &state, others, 0), b);

    let on = EngineState { thrust_on: true, ..off };
    assert_ne!(forces.evaluate(0.0, &engine_field, &state, on, 0), b);
}

#[test]
fn thrust_node_leads_the_structure() {
    // 2x1 sprite: thrust-red pixel next to a plain white one
    let img = sprite(2, 1, &[(0, 0, THRUST_RED), (1, 0, WHITE)]);
    let cfg = SimConfig::default();
    let mut scenario = Scenario::build_scenario(&cfg, &img).unwrap();
    assert_eq!(scenario.body.field().role(0), NodeRole::Thrust);

    scenario.body.engines_mut().thrust_on = true;
    let dt = 1.0 / 60.0;
    for _ in 0..60 {
        scenario.body.update(dt, 50).unwrap();
    }

    let axis = Parameters::default().axes.thrust;
    let moved = |col: usize| {
        let s = scenario.body.node_state(col, 0).unwrap();
        (s.position - NVec2::new(col as f32, 0.0)).dot(&axis)
    };
    let (thrust, structural) = (moved(0), moved(1));

    assert!(thrust > 0.0, "thrust node moved {} along the axis", thrust);
    assert!(thrust > structural, "thrust {} vs structural {}", thrust, structural);
    assert!(scenario.body.is_finite());
}

#[test]
fn released_engines_stop_pushing() {
    let img = sprite(1, 1, &[(0, 0, THRUST_RED)]);
    let mut body = body_from(&img, Lattice::Pixel, IntegratorKind::Rk4);

    body.engines_mut().thrust_on = true;
    body.update(0.1, 5).unwrap();
    body.engines_mut().thrust_on = false;
    let v = body.node_state(0, 0).unwrap().velocity;
    body.update(0.1, 5).unwrap();

    // isolated node, no forces once released: velocity is frozen
    assert_eq!(body.node_state(0, 0).unwrap().velocity, v);
    assert!(v.y < 0.0);
}

// ==================================================================================
// Configuration tests
// ==================================================================================

#[test]
fn scenario_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.yaml");
    std::fs::write(
        &path,
        "engine:\n  integrator: euler\n  backend: serial\nparameters:\n  dt: 0.05\n  steps: 2\n",
    )
    .unwrap();

    let cfg = SimConfig::load(&path).unwrap();
    let mut scenario = Scenario::build_scenario(&cfg, &sprite(2, 2, &[(0, 0, WHITE)])).unwrap();
    assert_eq!(scenario.body.integrator(), IntegratorKind::Euler);

    scenario.step_frame().unwrap();
    assert_eq!(scenario.frame, 1);
    assert!((scenario.body.time() - 0.05).abs() < 1e-6);
}

#[test]
fn bundled_scenarios_are_valid() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    for name in ["default.yaml", "soft_corner.yaml"] {
        let cfg = SimConfig::load(dir.join(name)).unwrap();
        cfg.validate().unwrap();
    }
    let corner = SimConfig::load(dir.join("soft_corner.yaml")).unwrap();
    assert_eq!(corner.engine.lattice, Lattice::Corner);

    // the spelled-out defaults match the built-in ones
    let spelled = SimConfig::load(dir.join("default.yaml")).unwrap();
    let builtin = SimConfig::default();
    assert_eq!(spelled.engine, builtin.engine);
    assert_eq!(spelled.parameters, builtin.parameters);
    assert_eq!(spelled.axes, builtin.axes);
    assert_eq!(spelled.marker_table().unwrap(), builtin.marker_table().unwrap());
}

#[test]
fn missing_scenario_file_is_an_error() {
    assert!(SimConfig::load("/no/such/scenario.yaml").is_err());
}
