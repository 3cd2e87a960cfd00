use bevy::log::LogPlugin;
use bevy::prelude::*;

use crate::simulation::engine::EngineControl;
use crate::simulation::scenario::Scenario;
use crate::visualization::record::{FrameRecorder, View};

/// Component tagging each sprite with its node index into the lattice
#[derive(Component)]
struct NodeIndex(pub usize);

/// Frame cadence of the simulation, independent of the render rate
const FRAME_HZ: f64 = 60.0;

const CONTROLS: [(KeyCode, EngineControl); 3] = [
    (KeyCode::ArrowUp, EngineControl::Thrust),
    (KeyCode::ArrowLeft, EngineControl::Left),
    (KeyCode::ArrowRight, EngineControl::Right),
];

#[derive(Resource)]
struct ViewerState {
    view: View,
    recorder: Option<FrameRecorder>,
}

pub fn run_viewer(scenario: Scenario, view: View, recorder: Option<FrameRecorder>) {
    log::info!(
        "viewer: {} nodes, {}x{} window, scale {}",
        scenario.body.field().occupied_count(),
        view.width,
        view.height,
        view.scale
    );

    App::new()
        .insert_resource(scenario)
        .insert_resource(ViewerState { view, recorder })
        .insert_resource(Time::<Fixed>::from_hz(FRAME_HZ))
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "pixelfem".into(),
                        resolution: (view.width as f32, view.height as f32).into(),
                        ..default()
                    }),
                    ..default()
                })
                // logging goes through env_logger
                .disable::<LogPlugin>(),
        )
        .add_systems(Startup, setup_nodes_system)
        .add_systems(Update, (engine_input_system, quit_system))
        .add_systems(FixedUpdate, physics_frame_system)
        .add_systems(Update, sync_transforms_system)
        .run();
}

fn setup_nodes_system(mut commands: Commands, scenario: Res<Scenario>, state: Res<ViewerState>) {
    commands.spawn(Camera2dBundle::default());

    let field = scenario.body.field();
    for i in 0..field.len() {
        if !field.role(i).is_occupied() {
            continue;
        }
        let [r, g, b] = *field.colors.at(i);
        commands.spawn((
            SpriteBundle {
                sprite: Sprite {
                    color: Color::srgb_u8(r, g, b),
                    custom_size: Some(Vec2::splat(state.view.scale.max(1.0))),
                    ..default()
                },
                ..default()
            },
            NodeIndex(i),
        ));
    }
}

/// Press -> engine on, release -> engine off
fn engine_input_system(keys: Res<ButtonInput<KeyCode>>, mut scenario: ResMut<Scenario>) {
    let engines = scenario.body.engines_mut();
    for (key, control) in CONTROLS {
        if keys.just_pressed(key) {
            engines.press(control);
        }
        if keys.just_released(key) {
            engines.release(control);
        }
    }
}

fn quit_system(keys: Res<ButtonInput<KeyCode>>, mut exit: EventWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) || keys.just_pressed(KeyCode::KeyQ) {
        exit.send(AppExit::Success);
    }
}

/// One simulated frame per fixed tick; a failed pass stops the app
fn physics_frame_system(
    mut scenario: ResMut<Scenario>,
    mut state: ResMut<ViewerState>,
    mut exit: EventWriter<AppExit>,
) {
    if let Err(e) = scenario.step_frame() {
        log::error!("simulation halted: {}", e);
        exit.send(AppExit::error());
        return;
    }

    let ViewerState { view, recorder } = &mut *state;
    if let Some(rec) = recorder.as_mut() {
        if let Err(e) = rec.record(&scenario.body, view) {
            log::error!("recording failed: {}", e);
            exit.send(AppExit::error());
        }
    }
}

fn sync_transforms_system(
    scenario: Res<Scenario>,
    state: Res<ViewerState>,
    mut query: Query<(&NodeIndex, &mut Transform)>,
) {
    let body = &scenario.body;
    let center = state.view.center(body);
    let current = body.current();

    for (NodeIndex(i), mut transform) in &mut query {
        let p = (current.at(*i).position - center) * state.view.scale;
        // lattice rows grow downward, bevy's y axis points up
        transform.translation.x = p.x;
        transform.translation.y = -p.y;
    }
}
