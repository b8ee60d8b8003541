//! E2E tests for the chunk streaming plugin.
//!
//! Tests:
//! - Needed-set around the anchor (manhattan diamond, hysteresis)
//! - Per-placement and per-chunk failure isolation
//! - Connection wiring across chunks, including targets that load late
//! - Unload teardown (instances, links, chunk info)

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use worldstream::content::{ContentDefinition, ConnectionPoint, MemoryContentSource};
use worldstream::placement::{
    InstanceKey, InstanceRegistry, InstantiationQueue, Passage, PlacementInstance, PlacementLinks,
    PlacementRecord, SpecialContent,
};
use worldstream::streaming::backends::SegmentFuture;
use worldstream::streaming::{
    ChunkCoordinate, ChunkLifecycle, ChunkLoadError, ChunkLoadFailed, ChunkLoaded, ChunkState,
    ChunkStreamingPlugin, ChunkTasks, ChunkUnloaded, MemoryPlacementSource, NothingOwned,
    OwnedItemQuery, PlacementDataSource, RonPlacementSource, StreamingAnchor, StreamingBackends,
    StreamingConfig, StreamingSet, WorldSegmentLoader,
};

/// Upper bound on frames any single wait may take.
const MAX_UPDATES: usize = 2000;

fn c(x: i32, y: i32) -> ChunkCoordinate {
    ChunkCoordinate::new(x, y)
}

/// Segment loader whose registered set can change while the app runs.
#[derive(Clone, Default)]
struct GatedSegments {
    open: Arc<Mutex<HashSet<String>>>,
}

impl GatedSegments {
    /// Every `Chunk_x_y` with |x|, |y| <= radius.
    fn grid(radius: i32) -> Self {
        let gate = Self::default();
        for y in -radius..=radius {
            for x in -radius..=radius {
                gate.open(&c(x, y).segment_name("Chunk"));
            }
        }
        gate
    }

    fn open(&self, name: &str) {
        self.open.lock().unwrap().insert(name.to_string());
    }

    fn close(&self, name: &str) {
        self.open.lock().unwrap().remove(name);
    }
}

impl WorldSegmentLoader for GatedSegments {
    fn is_registered(&self, name: &str) -> bool {
        self.open.lock().unwrap().contains(name)
    }

    fn load(&self, _name: &str) -> SegmentFuture {
        Box::pin(async { Ok(()) })
    }

    fn unload(&self, _name: &str) -> SegmentFuture {
        Box::pin(async { Ok(()) })
    }
}

fn content() -> MemoryContentSource {
    MemoryContentSource::new()
        .with(
            "content/hall",
            ContentDefinition::new("hall.scn")
                .with_point(ConnectionPoint::new("passable"))
                .with_point(ConnectionPoint::new("key").requires("key_red")),
        )
        .with(
            "content/corridor",
            ContentDefinition::new("corridor.scn")
                .with_point(ConnectionPoint::new("passable"))
                .with_point(ConnectionPoint::new("one_way")),
        )
        .with("content/orb", ContentDefinition::new("orb.scn"))
}

fn test_config() -> StreamingConfig {
    StreamingConfig {
        chunk_size: 100.0,
        load_radius: 1,
        unload_radius: 2,
        dispatch_stagger_ms: 0,
        instantiate_batch_size: 2,
        retry_delay_ms: 10,
        ..default()
    }
}

#[derive(Resource, Default)]
struct EventLog {
    loaded: Vec<ChunkLoaded>,
    unloaded: Vec<ChunkUnloaded>,
    failed: Vec<ChunkLoadFailed>,
}

fn record_events(
    mut log: ResMut<EventLog>,
    mut loaded: EventReader<ChunkLoaded>,
    mut unloaded: EventReader<ChunkUnloaded>,
    mut failed: EventReader<ChunkLoadFailed>,
) {
    log.loaded.extend(loaded.read().copied());
    log.unloaded.extend(unloaded.read().copied());
    log.failed.extend(failed.read().cloned());
}

/// Harness over a fully registered grid with no placement data.
fn empty_world(radius: i32) -> StreamingHarness {
    StreamingHarness::new(GatedSegments::grid(radius), MemoryPlacementSource::new(), NothingOwned)
}

struct StreamingHarness {
    app: App,
    anchor: Entity,
}

impl StreamingHarness {
    fn new(
        segments: impl WorldSegmentLoader,
        placements: impl PlacementDataSource,
        owned: impl OwnedItemQuery,
    ) -> Self {
        Self::with_config(test_config(), segments, placements, owned)
    }

    fn with_config(
        config: StreamingConfig,
        segments: impl WorldSegmentLoader,
        placements: impl PlacementDataSource,
        owned: impl OwnedItemQuery,
    ) -> Self {
        let plugin = ChunkStreamingPlugin::new(
            config,
            StreamingBackends::new(segments, placements, owned),
            Arc::new(content()),
        )
        .unwrap()
        .with_direct_entries([(
            "boss/arena".to_string(),
            ContentDefinition::new("arena.scn")
                .with_point(ConnectionPoint::new("passable"))
                .special(),
        )]);

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(plugin)
            .init_resource::<EventLog>()
            .add_systems(Update, record_events.after(StreamingSet::Finalize));

        let anchor = app
            .world_mut()
            .spawn((StreamingAnchor, Transform::from_xyz(50.0, 50.0, 0.0)))
            .id();

        Self { app, anchor }
    }

    fn update(&mut self) {
        self.app.update();
        // Let the task pool make progress between frames.
        std::thread::sleep(Duration::from_millis(1));
    }

    fn run(&mut self, updates: usize) {
        for _ in 0..updates {
            self.update();
        }
    }

    fn run_until(&mut self, what: &str, done: impl Fn(&World) -> bool) {
        for _ in 0..MAX_UPDATES {
            self.update();
            if done(self.app.world()) {
                return;
            }
        }
        panic!("{what} did not happen within {MAX_UPDATES} updates");
    }

    fn run_until_loaded(&mut self, coord: ChunkCoordinate) {
        self.run_until(&format!("{coord} loaded"), |w| {
            w.resource::<ChunkLifecycle>().state(coord) == ChunkState::Loaded
        });
    }

    /// Run until nothing is queued, in flight or instantiating for a few frames.
    fn settle(&mut self) {
        let mut quiet = 0;
        for _ in 0..MAX_UPDATES {
            self.update();
            let world = self.app.world();
            let idle = world.resource::<ChunkTasks>().is_idle()
                && world.resource::<InstantiationQueue>().is_empty()
                && world.resource::<ChunkLifecycle>().loading().next().is_none();
            quiet = if idle { quiet + 1 } else { 0 };
            if quiet >= 3 {
                return;
            }
        }
        panic!("streaming did not settle within {MAX_UPDATES} updates");
    }

    fn move_anchor(&mut self, position: Vec2) {
        let mut tf = self.app.world_mut().get_mut::<Transform>(self.anchor).unwrap();
        tf.translation = position.extend(0.0);
    }

    fn elapsed(&self) -> Duration {
        self.app.world().resource::<Time>().elapsed()
    }

    fn lifecycle(&self) -> &ChunkLifecycle {
        self.app.world().resource::<ChunkLifecycle>()
    }

    fn registry(&self) -> &InstanceRegistry {
        self.app.world().resource::<InstanceRegistry>()
    }

    fn state(&self, coord: ChunkCoordinate) -> ChunkState {
        self.lifecycle().state(coord)
    }

    fn loaded_sorted(&self) -> Vec<ChunkCoordinate> {
        let mut v: Vec<_> = self.lifecycle().loaded().collect();
        v.sort_by_key(|c| (c.y, c.x));
        v
    }

    fn instances(&mut self) -> Vec<(Entity, PlacementInstance, Transform)> {
        let mut q = self.app.world_mut().query::<(Entity, &PlacementInstance, &Transform)>();
        q.iter(self.app.world()).map(|(e, p, t)| (e, p.clone(), *t)).collect()
    }

    fn entity_of(&self, key: &InstanceKey) -> Entity {
        self.registry().get(key).map(|r| r.entity).unwrap()
    }

    fn links(&self, entity: Entity) -> Option<&PlacementLinks> {
        self.app.world().get::<PlacementLinks>(entity)
    }

    fn log(&self) -> &EventLog {
        self.app.world().resource::<EventLog>()
    }
}

// ---------- Needed set ----------

#[test]
fn anchor_in_origin_chunk_loads_the_manhattan_diamond() {
    let mut h = empty_world(4);
    h.settle();

    assert_eq!(h.loaded_sorted(), vec![c(0, -1), c(-1, 0), c(0, 0), c(1, 0), c(0, 1)]);
    assert_eq!(h.state(c(1, 1)), ChunkState::Unloaded);
    assert!(h.lifecycle().sets_are_disjoint());

    let info = h.lifecycle().info(c(0, 0)).unwrap();
    assert_eq!(info.bounds, Rect::new(0.0, 0.0, 100.0, 100.0));
    assert_eq!(info.item_count, 0);
}

#[test]
fn standing_still_dispatches_nothing_more() {
    let mut h = empty_world(4);
    h.settle();
    let loads = h.lifecycle().stats.loads_completed;
    h.run(30);
    assert_eq!(h.lifecycle().stats.loads_completed, loads);
    assert_eq!(h.log().loaded.len(), 5);
}

#[test]
fn hysteresis_band_holds_until_distance_exceeds_unload_radius() {
    let mut h = empty_world(6);
    h.settle();

    h.move_anchor(Vec2::new(150.0, 50.0));
    h.settle();
    // (-1,0) is exactly unload_radius away from (1,0).
    assert_eq!(h.state(c(-1, 0)), ChunkState::Loaded);
    assert_eq!(h.state(c(3, 0)), ChunkState::Unloaded);

    h.move_anchor(Vec2::new(250.0, 50.0));
    h.settle();
    assert_eq!(h.state(c(-1, 0)), ChunkState::Unloaded);
    assert_eq!(h.state(c(0, 0)), ChunkState::Loaded);
    assert!(h.log().unloaded.iter().any(|e| e.coord == c(-1, 0)));
}

#[test]
fn loads_are_dispatched_one_per_stagger_interval_nearest_first() {
    let config = StreamingConfig { dispatch_stagger_ms: 100, ..test_config() };
    let mut h = StreamingHarness::with_config(
        config,
        GatedSegments::grid(4),
        MemoryPlacementSource::new(),
        NothingOwned,
    );
    // Every frame advances the clock by exactly 10 ms.
    h.app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(10)));

    h.update();
    let tasks = h.app.world().resource::<ChunkTasks>();
    assert_eq!(tasks.queued_loads(), 4);
    assert!(!tasks.queued().any(|q| q == c(0, 0)));
    // The origin is either still in flight or already done; nothing else left the queue.
    assert_eq!(tasks.loads_in_flight() + h.lifecycle().loaded_count(), 1);
    assert!(tasks.is_in_flight(c(0, 0)) || h.state(c(0, 0)) == ChunkState::Loaded);

    let first = h.elapsed();
    let interval = Duration::from_millis(100);
    let mut frames = 0;
    loop {
        h.update();
        frames += 1;
        let queued = h.app.world().resource::<ChunkTasks>().queued_loads();
        if h.elapsed() - first < interval {
            assert_eq!(queued, 4, "dispatched early at {:?}", h.elapsed() - first);
        } else {
            assert_eq!(queued, 3);
            break;
        }
    }
    assert_eq!(frames, 10);

    // The next one waits a full interval again.
    let second = h.elapsed();
    while h.elapsed() - second < interval {
        assert_eq!(h.app.world().resource::<ChunkTasks>().queued_loads(), 3);
        h.update();
    }
    assert_eq!(h.app.world().resource::<ChunkTasks>().queued_loads(), 2);

    h.settle();
    assert_eq!(h.loaded_sorted(), vec![c(0, -1), c(-1, 0), c(0, 0), c(1, 0), c(0, 1)]);
    assert_eq!(h.log().loaded[0].coord, c(0, 0));
}

// ---------- Failure isolation ----------

#[test]
fn unresolvable_placement_is_skipped_and_siblings_load() {
    let placements = MemoryPlacementSource::new().with(
        c(0, 0),
        vec![
            PlacementRecord::new("rooms/hall", Vec2::new(10.0, 10.0)),
            PlacementRecord::new("rooms/does_not_exist", Vec2::new(20.0, 20.0)),
            PlacementRecord::new("rooms/corridor", Vec2::new(30.0, 30.0)),
        ],
    );
    let mut h = StreamingHarness::new(GatedSegments::grid(2), placements, NothingOwned);
    h.settle();

    assert_eq!(h.state(c(0, 0)), ChunkState::Loaded);
    assert_eq!(h.registry().count_in(c(0, 0)), 2);
    assert!(h.registry().contains(&InstanceKey::new("rooms/hall", Vec2::new(10.0, 10.0))));
    let missing = InstanceKey::new("rooms/does_not_exist", Vec2::new(20.0, 20.0));
    assert!(!h.registry().contains(&missing));
    assert!(h.registry().contains(&InstanceKey::new("rooms/corridor", Vec2::new(30.0, 30.0))));
    assert_eq!(h.lifecycle().info(c(0, 0)).unwrap().item_count, 2);
    assert!(h.log().loaded.contains(&ChunkLoaded { coord: c(0, 0), placements: 2 }));
}

#[test]
fn missing_segment_reverts_to_unloaded_and_retries_once_registered() {
    let gate = GatedSegments::grid(2);
    gate.close("Chunk_1_0");
    let mut h = StreamingHarness::new(gate.clone(), MemoryPlacementSource::new(), NothingOwned);

    h.run_until("first failure", |w| !w.resource::<EventLog>().failed.is_empty());
    h.settle();
    assert_eq!(h.state(c(1, 0)), ChunkState::Unloaded);
    assert_eq!(h.state(c(0, 0)), ChunkState::Loaded);
    assert!(matches!(
        &h.log().failed[0].reason,
        ChunkLoadError::SegmentUnavailable { segment, .. } if segment == "Chunk_1_0"
    ));

    gate.open("Chunk_1_0");
    h.run_until_loaded(c(1, 0));
    assert!(h.lifecycle().stats.loads_failed >= 1);
}

#[test]
fn unreadable_placement_data_still_loads_the_chunk_empty() {
    let dir = tempfile::tempdir().unwrap();
    let source = RonPlacementSource::new(dir.path(), "Chunk");
    std::fs::write(source.path_for(c(0, 0)), "[(content_id: \"rooms/hall\", position: ").unwrap();
    std::fs::write(
        source.path_for(c(1, 0)),
        r#"[(content_id: "rooms/hall", position: (150.0, 50.0))]"#,
    )
    .unwrap();

    let mut h = StreamingHarness::new(GatedSegments::grid(2), source, NothingOwned);
    h.settle();

    assert_eq!(h.state(c(0, 0)), ChunkState::Loaded);
    assert_eq!(h.registry().count_in(c(0, 0)), 0);
    assert_eq!(h.registry().count_in(c(1, 0)), 1);
    // Chunks with no file at all are empty, not failed.
    assert_eq!(h.state(c(0, 1)), ChunkState::Loaded);
    assert!(h.log().failed.is_empty());
    let source = h.lifecycle().info(c(1, 0)).unwrap().source.clone().unwrap();
    assert!(source.ends_with("Chunk_1_0.placements.ron"));
}

#[test]
fn out_of_bounds_chunks_are_never_requested() {
    let config = StreamingConfig {
        bounds: worldstream::streaming::ChunkBounds::new(0, 0, 3, 3),
        ..test_config()
    };
    let mut h = StreamingHarness::with_config(
        config,
        GatedSegments::grid(4),
        MemoryPlacementSource::new(),
        NothingOwned,
    );
    h.settle();
    assert_eq!(h.loaded_sorted(), vec![c(0, 0), c(1, 0), c(0, 1)]);

    // Positions outside the range clamp onto the edge chunk.
    h.move_anchor(Vec2::new(-500.0, -500.0));
    h.settle();
    assert_eq!(h.lifecycle().player_chunk(), Some(c(0, 0)));
    assert!(h.log().failed.is_empty());
}

// ---------- Instantiation ----------

#[test]
fn owned_collectibles_are_not_placed_again() {
    let placements = MemoryPlacementSource::new().with(
        c(0, 0),
        vec![
            PlacementRecord::new("items/orb", Vec2::new(10.0, 10.0)).owned_by("orb_1"),
            PlacementRecord::new("items/orb", Vec2::new(20.0, 10.0)).owned_by("orb_2"),
        ],
    );
    let owned: HashSet<String> = ["orb_1".to_string()].into_iter().collect();
    let mut h = StreamingHarness::new(GatedSegments::grid(2), placements, owned);
    h.settle();

    assert_eq!(h.registry().count_in(c(0, 0)), 1);
    assert!(h.registry().contains(&InstanceKey::new("items/orb", Vec2::new(20.0, 10.0))));
    assert_eq!(h.lifecycle().stats.placements_skipped, 1);
}

#[test]
fn large_chunks_instantiate_in_batches() {
    let records: Vec<_> = (0..5)
        .map(|i| PlacementRecord::new("items/orb", Vec2::new(10.0 * i as f32, 5.0)))
        .collect();
    let placements = MemoryPlacementSource::new().with(c(0, 0), records);
    let mut h = StreamingHarness::new(GatedSegments::grid(2), placements, NothingOwned);

    h.run_until("first batch", |w| w.resource::<InstanceRegistry>().count_in(c(0, 0)) > 0);
    assert_eq!(h.registry().count_in(c(0, 0)), 2);
    assert_eq!(h.state(c(0, 0)), ChunkState::Loading);

    h.settle();
    assert_eq!(h.registry().count_in(c(0, 0)), 5);
    assert_eq!(h.state(c(0, 0)), ChunkState::Loaded);
}

#[test]
fn placements_carry_rotation_parent_and_special_marker() {
    let placements = MemoryPlacementSource::new().with(
        c(0, 0),
        vec![
            PlacementRecord::new("rooms/hall", Vec2::new(50.0, 50.0)).rotated(3),
            PlacementRecord::new("boss/arena", Vec2::new(70.0, 70.0)),
        ],
    );
    let mut h = StreamingHarness::new(GatedSegments::grid(2), placements, NothingOwned);
    h.settle();

    let hall = h.entity_of(&InstanceKey::new("rooms/hall", Vec2::new(50.0, 50.0)));
    let arena = h.entity_of(&InstanceKey::new("boss/arena", Vec2::new(70.0, 70.0)));
    let world = h.app.world();

    let tf = world.get::<Transform>(hall).unwrap();
    assert_eq!(tf.translation, Vec3::new(50.0, 50.0, 0.0));
    let expected = Quat::from_rotation_z(3.0 * std::f32::consts::FRAC_PI_2);
    assert!(tf.rotation.abs_diff_eq(expected, 1e-5), "rotation {:?}", tf.rotation);

    assert!(world.get::<SpecialContent>(arena).is_some());
    assert!(world.get::<SpecialContent>(hall).is_none());
    let root = world.get::<ChildOf>(hall).unwrap().parent();
    assert_eq!(world.get::<ChildOf>(arena).unwrap().parent(), root);
}

// ---------- Connection wiring ----------

#[test]
fn connection_to_a_chunk_that_loads_later_stays_unwired() {
    let hall = PlacementRecord::new("rooms/hall", Vec2::new(50.0, 50.0))
        .connect(0, "rooms/corridor", 0);
    let corridor = PlacementRecord::new("rooms/corridor", Vec2::new(150.0, 50.0));
    let placements = MemoryPlacementSource::new()
        .with(c(0, 0), vec![hall.clone()])
        .with(c(1, 0), vec![corridor.clone()]);

    let gate = GatedSegments::grid(2);
    gate.close("Chunk_1_0");
    let mut h = StreamingHarness::new(gate.clone(), placements, NothingOwned);
    h.run_until_loaded(c(0, 0));

    let hall_e = h.entity_of(&hall.instance_key());
    assert!(h.links(hall_e).is_none());
    assert_eq!(h.lifecycle().stats.connections_unresolved, 1);

    gate.open("Chunk_1_0");
    h.run_until_loaded(c(1, 0));
    h.settle();

    assert!(h.registry().contains(&corridor.instance_key()));
    assert!(h.links(hall_e).is_none());
}

#[test]
fn late_chunk_wires_its_own_connections_to_loaded_neighbors() {
    let hall = PlacementRecord::new("rooms/hall", Vec2::new(50.0, 50.0));
    let corridor = PlacementRecord::new("rooms/corridor", Vec2::new(150.0, 50.0))
        .connect(0, "rooms/hall", 1)
        .connect(1, "rooms/hall", 0);
    let placements = MemoryPlacementSource::new()
        .with(c(0, 0), vec![hall.clone()])
        .with(c(1, 0), vec![corridor.clone()]);

    let gate = GatedSegments::grid(2);
    gate.close("Chunk_1_0");
    let mut h = StreamingHarness::new(gate.clone(), placements, NothingOwned);
    h.run_until_loaded(c(0, 0));
    gate.open("Chunk_1_0");
    h.run_until_loaded(c(1, 0));

    let hall_e = h.entity_of(&hall.instance_key());
    let corridor_e = h.entity_of(&corridor.instance_key());
    h.update();
    let links = h.links(corridor_e).unwrap();
    assert_eq!(links.0.len(), 2);
    assert_eq!(links.0[0].target, hall_e);
    assert_eq!(links.0[0].passage, Passage::Open);
    assert_eq!(links.0[1].passage, Passage::OneWay);
    assert_eq!(links.to_target(&hall.instance_key()).map(|l| l.target_point), Some(1));
}

// ---------- Unload ----------

#[test]
fn unloading_removes_every_owned_instance_and_dangling_link() {
    // (0,0) stays within the band when the anchor moves to (2,0); (-1,0) does not.
    let west = PlacementRecord::new("rooms/corridor", Vec2::new(-50.0, 50.0));
    let hall = PlacementRecord::new("rooms/hall", Vec2::new(50.0, 50.0))
        .connect(0, "rooms/corridor", 0);
    let orb = PlacementRecord::new("items/orb", Vec2::new(-20.0, 80.0));
    let placements = MemoryPlacementSource::new()
        .with(c(-1, 0), vec![west.clone(), orb])
        .with(c(0, 0), vec![hall.clone()]);

    let gate = GatedSegments::grid(3);
    gate.close("Chunk_0_0");
    let mut h = StreamingHarness::new(gate.clone(), placements, NothingOwned);
    h.run_until_loaded(c(-1, 0));
    gate.open("Chunk_0_0");
    h.run_until_loaded(c(0, 0));
    h.update();

    let hall_e = h.entity_of(&hall.instance_key());
    let west_e = h.entity_of(&west.instance_key());
    assert_eq!(h.links(hall_e).unwrap().0[0].target, west_e);

    h.move_anchor(Vec2::new(250.0, 50.0));
    h.settle();

    assert_eq!(h.state(c(-1, 0)), ChunkState::Unloaded);
    assert!(h.lifecycle().info(c(-1, 0)).is_none());
    assert_eq!(h.registry().count_in(c(-1, 0)), 0);
    assert!(h.app.world().get_entity(west_e).is_err());

    let west_bounds = c(-1, 0).world_bounds(100.0);
    let leftovers = h
        .instances()
        .into_iter()
        .filter(|(_, p, t)| p.chunk == c(-1, 0) || west_bounds.contains(t.translation.truncate()))
        .count();
    assert_eq!(leftovers, 0);

    assert!(h.links(hall_e).unwrap().0.is_empty());
    assert!(h.registry().contains(&hall.instance_key()));
}

#[test]
fn load_that_became_unnecessary_completes_then_unloads() {
    let placements = MemoryPlacementSource::new()
        .with(c(0, 0), vec![PlacementRecord::new("rooms/hall", Vec2::new(50.0, 50.0))]);
    let mut h = StreamingHarness::new(GatedSegments::grid(12), placements, NothingOwned);

    h.update();
    assert_ne!(h.state(c(0, 0)), ChunkState::Unloaded);
    h.move_anchor(Vec2::new(1050.0, 50.0));
    h.settle();

    assert!(h.log().loaded.iter().any(|e| e.coord == c(0, 0)));
    assert!(h.log().unloaded.iter().any(|e| e.coord == c(0, 0)));
    assert_eq!(h.state(c(0, 0)), ChunkState::Unloaded);
    assert!(h.registry().is_empty());
    assert_eq!(h.loaded_sorted().len(), 5);
}

#[test]
fn wandering_anchor_never_breaks_set_invariants() {
    let records =
        |x: f32, y: f32| vec![PlacementRecord::new("items/orb", Vec2::new(x + 10.0, y + 10.0))];
    let mut placements = MemoryPlacementSource::new();
    for y in -7..=7 {
        for x in -7..=7 {
            placements = placements.with(c(x, y), records(x as f32 * 100.0, y as f32 * 100.0));
        }
    }
    let mut h = StreamingHarness::new(GatedSegments::grid(8), placements, NothingOwned);
    let mut rng = StdRng::seed_from_u64(7);
    let mut pos = Vec2::new(50.0, 50.0);

    for _ in 0..300 {
        pos += Vec2::new(rng.random_range(-60.0..60.0), rng.random_range(-60.0..60.0));
        pos = pos.clamp(Vec2::splat(-500.0), Vec2::splat(500.0));
        h.move_anchor(pos);
        h.update();
        assert!(h.lifecycle().sets_are_disjoint());
    }

    h.settle();
    let center = h.lifecycle().player_chunk().unwrap();
    for coord in h.lifecycle().loaded() {
        assert!(worldstream::streaming::manhattan_distance(center, coord) <= 2);
    }
    // One orb per loaded chunk, nothing left behind by unloads.
    assert_eq!(h.registry().len(), h.lifecycle().loaded_count());
}
