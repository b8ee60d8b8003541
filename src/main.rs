use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use worldstream::content::{load_direct_table, RonContentSource};
use worldstream::placement::{InstanceRegistry, InstantiationQueue};
use worldstream::streaming::{
    ChunkLifecycle, ChunkStreamingPlugin, ChunkTasks, RonPlacementSource, SegmentManifest,
    StreamingAnchor, StreamingBackends, StreamingConfig,
};

const ASSETS: &str = "assets";

/// Waypoints the anchor walks through, in world units.
#[derive(Resource)]
struct DemoWalk {
    waypoints: Vec<Vec2>,
    next: usize,
    speed: f32,
}

impl DemoWalk {
    fn finished(&self) -> bool {
        self.next >= self.waypoints.len()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = StreamingConfig::load(format!("{ASSETS}/streaming.ron"))?;
    let segments = SegmentManifest::load(format!("{ASSETS}/segments.ron"))?;
    let placements =
        RonPlacementSource::new(format!("{ASSETS}/chunks"), config.segment_prefix.clone());
    let direct = load_direct_table(format!("{ASSETS}/direct_table.ron"))?;

    // The demo player already picked up the red key.
    let owned: HashSet<String> = ["key_red".to_string()].into_iter().collect();

    let plugin = ChunkStreamingPlugin::new(
        config,
        StreamingBackends::new(segments, placements, owned),
        Arc::new(RonContentSource::new(ASSETS)),
    )?
    .with_direct_entries(direct);

    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / 60.0))),
        )
        .add_plugins(LogPlugin { filter: "info,worldstream=debug".to_string(), ..default() })
        .add_plugins(plugin)
        .insert_resource(DemoWalk {
            waypoints: vec![
                Vec2::new(250.0, 50.0),
                Vec2::new(250.0, 250.0),
                Vec2::new(50.0, 250.0),
                Vec2::new(50.0, 50.0),
            ],
            next: 0,
            speed: 150.0,
        })
        .add_systems(Startup, spawn_anchor)
        .add_systems(Update, (walk_anchor, exit_when_settled))
        .run();

    Ok(())
}

fn spawn_anchor(mut commands: Commands) {
    commands.spawn((Name::new("Player"), StreamingAnchor, Transform::from_xyz(50.0, 50.0, 0.0)));
}

fn walk_anchor(
    time: Res<Time>,
    mut walk: ResMut<DemoWalk>,
    mut anchor_q: Query<&mut Transform, With<StreamingAnchor>>,
) {
    let Ok(mut tf) = anchor_q.single_mut() else { return };
    let Some(target) = walk.waypoints.get(walk.next).copied() else { return };

    let to = target - tf.translation.truncate();
    let step = walk.speed * time.delta_secs();
    if to.length() <= step {
        tf.translation = target.extend(0.0);
        walk.next += 1;
        info!("Anchor reached waypoint {} at {}", walk.next, target);
    } else {
        tf.translation += (to.normalize() * step).extend(0.0);
    }
}

fn exit_when_settled(
    walk: Res<DemoWalk>,
    tasks: Res<ChunkTasks>,
    queue: Res<InstantiationQueue>,
    lifecycle: Res<ChunkLifecycle>,
    registry: Res<InstanceRegistry>,
    mut exit: EventWriter<AppExit>,
) {
    let busy = !tasks.is_idle() || !queue.is_empty() || lifecycle.loading().next().is_some();
    if !walk.finished() || busy {
        return;
    }
    let mut loaded: Vec<_> = lifecycle.loaded().collect();
    loaded.sort_by_key(|c| (c.y, c.x));
    info!("Walk finished; {} chunk(s) loaded: {:?}", loaded.len(), loaded);
    info!("{} live placement(s); stats: {:?}", registry.len(), lifecycle.stats);
    exit.write(AppExit::Success);
}
