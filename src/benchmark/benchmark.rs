use std::time::Instant;

use crate::error::{SimError, SimResult};
use crate::simulation::body::SoftBody;
use crate::simulation::classifier::{NodeField, NodeRole};
use crate::simulation::compute::Backend;
use crate::simulation::integrator::IntegratorKind;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Grid, NVec2, NodeState};

/// Helper to build a fully occupied `n x n` body
fn make_square(n: usize, backend: Backend) -> SimResult<SoftBody> {
    let field = NodeField::from_roles(Grid::new(n, n, NodeRole::Structural));
    SoftBody::new(field, &Parameters::default(), IntegratorKind::Rk4, backend)
}

/// Time one frame (`steps` RK4 sub-steps) on serial and parallel backends
pub fn bench_substep() -> SimResult<()> {
    let sizes = [16, 32, 64, 128, 256];
    let params = Parameters::default();
    let frames = 4;

    for n in sizes {
        let mut serial = make_square(n, Backend::Serial)?;
        let mut parallel = make_square(n, Backend::Parallel)?;

        // Warm up
        serial.update(params.dt, params.steps)?;
        parallel.update(params.dt, params.steps)?;

        let t0 = Instant::now();
        for _ in 0..frames {
            serial.update(params.dt, params.steps)?;
        }
        let serial_ms = t0.elapsed().as_secs_f64() * 1000.0 / frames as f64;

        let t1 = Instant::now();
        for _ in 0..frames {
            parallel.update(params.dt, params.steps)?;
        }
        let parallel_ms = t1.elapsed().as_secs_f64() * 1000.0 / frames as f64;

        println!(
            "N = {:3}x{:<3} ({:6} nodes), serial frame = {:9.3} ms, parallel frame = {:9.3} ms",
            n,
            n,
            n * n,
            serial_ms,
            parallel_ms
        );
    }
    Ok(())
}

/// Position error of a free two-node spring after `t_end`, against the
/// closed form `x1(t) = 1 + a cos(sqrt(2k/m) t)`
pub fn oscillator_error(kind: IntegratorKind, dt: f32, t_end: f32) -> SimResult<f32> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(SimError::config(format!("oscillator step must be finite and > 0, got {}", dt)));
    }
    let (k, m, a) = (1.0f32, 1.0f32, 0.5f32);
    let params = Parameters {
        k_linear: k,
        c_linear: 0.0,
        mass: m,
        thrust: 0.0,
        shear_springs: false,
        ..Parameters::default()
    };
    let field = NodeField::from_roles(Grid::new(2, 1, NodeRole::Structural));
    let mut body = SoftBody::new(field, &params, kind, Backend::Serial)?;

    body.set_node_state(0, 0, NodeState::at_rest(NVec2::new(-a, 0.0)))?;
    body.set_node_state(1, 0, NodeState::at_rest(NVec2::new(1.0 + a, 0.0)))?;

    let steps = (t_end / dt).round() as usize;
    for _ in 0..steps {
        body.substep(dt)?;
    }

    let omega = (2.0 * k / m).sqrt();
    let exact = 1.0 + a * (omega * steps as f32 * dt).cos();
    let x1 = body.current().at(1).position.x;
    Ok((x1 - exact).abs())
}

/// Paste output directly into a spreadsheet to graph
pub fn bench_convergence_curve() -> SimResult<()> {
    println!("dt,rk4_err,euler_err");
    for dt in [0.8f32, 0.4, 0.2, 0.1, 0.05] {
        let rk4 = oscillator_error(IntegratorKind::Rk4, dt, 4.0)?;
        let euler = oscillator_error(IntegratorKind::Euler, dt, 4.0)?;
        println!("{},{:.3e},{:.3e}", dt, rk4, euler);
    }
    Ok(())
}
