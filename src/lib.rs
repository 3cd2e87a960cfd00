pub mod error;
pub mod simulation;
pub mod configuration;
pub mod visualization;
pub mod benchmark;

pub use error::{SimError, SimResult};

pub use simulation::states::{Grid, NodeState, Derivative, StateBuffer, DerivativeBuffer, StateStore, NVec2};
pub use simulation::classifier::{classify, Lattice, MarkerTable, NodeField, NodeRole};
pub use simulation::engine::{EngineControl, EngineState};
pub use simulation::forces::{ForceSet, NodeForce, NodeContext, SpringNetwork, EngineThrust};
pub use simulation::compute::{Backend, BufferId, ComputePrograms, Kernel, Pass, PassLog};
pub use simulation::integrator::{rk4_substep, euler_substep, IntegratorKind, Workspace};
pub use simulation::params::{EngineAxes, Parameters};
pub use simulation::body::{Motion, SoftBody};
pub use simulation::image::{load_png, save_png, RgbaImage};
pub use simulation::scenario::Scenario;

pub use configuration::config::{SimConfig, EngineConfig, ParametersConfig, MarkerConfig, AxesConfig};

pub use visualization::record::{rasterize, FrameRecorder, View};
pub use visualization::viewer::run_viewer;

pub use benchmark::benchmark::{bench_substep, bench_convergence_curve, oscillator_error};
