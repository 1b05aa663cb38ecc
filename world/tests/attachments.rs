use std::time::Duration;

use glam::Vec3;
use outpost_core::{
    Aabb, AttachError, BuildPointSpec, Command, DamageInfo, DamageType, Event, ObjectId,
    ObjectKind, PlayerId, RemovalReason, TeamId, Zone,
};
use outpost_world::{apply, query, World, WorldConfig};

const BUILDER: PlayerId = PlayerId::new(1);
const RED: TeamId = TeamId::new(1);
const BLUE: TeamId = TeamId::new(2);

fn connect(world: &mut World, metal: u32) {
    let mut events = Vec::new();
    apply(
        world,
        Command::ConnectPlayer {
            player: BUILDER,
            team: RED,
            metal,
            origin: Vec3::ZERO,
            yaw: 0.0,
        },
        &mut events,
    );
}

fn spawn(world: &mut World, kind: ObjectKind, team: TeamId, origin: Vec3) -> ObjectId {
    let mut events = Vec::new();
    apply(
        world,
        Command::SpawnMapObject {
            kind,
            team,
            builder: None,
            origin,
            yaw: 0.0,
        },
        &mut events,
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::ConstructionFinished { object } => Some(*object),
            _ => None,
        })
        .expect("map object finished")
}

fn attach(world: &mut World, child: ObjectId, parent: ObjectId, point: usize) -> Vec<Event> {
    let mut events = Vec::new();
    apply(
        world,
        Command::AttachObject {
            child,
            parent,
            point,
        },
        &mut events,
    );
    events
}

fn damage(world: &mut World, object: ObjectId, damage: DamageInfo) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, Command::DamageObject { object, damage }, &mut events);
    events
}

fn health(world: &World, object: ObjectId) -> u32 {
    query::object(world, object).expect("object exists").health
}

fn start_sapper_placement(world: &mut World, events: &mut Vec<Event>) -> ObjectId {
    apply(
        world,
        Command::StartPlacement {
            builder: Some(BUILDER),
            kind: ObjectKind::Sapper,
        },
        events,
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::PlacementStarted { object, .. } => Some(*object),
            _ => None,
        })
        .expect("placement started")
}

#[test]
fn friendly_fire_lands_on_attachments() {
    let mut world = World::new();
    connect(&mut world, 200);
    let parent = spawn(&mut world, ObjectKind::Dispenser, RED, Vec3::new(200.0, 0.0, 0.0));
    let child = spawn(&mut world, ObjectKind::Shield, RED, Vec3::ZERO);
    let _ = attach(&mut world, child, parent, 1);

    let events = damage(
        &mut world,
        parent,
        DamageInfo::new(50.0, DamageType::BULLET).from_player(BUILDER),
    );

    assert_eq!(health(&world, parent), 150, "teammates never hurt the parent");
    assert_eq!(health(&world, child), 50);
    assert!(events.contains(&Event::ObjectDamaged {
        object: child,
        amount: 100.0,
        attacker: Some(BUILDER),
    }));
}

#[test]
fn friendly_attachments_soak_lethal_hits() {
    let mut world = World::new();
    let parent = spawn(&mut world, ObjectKind::Dispenser, RED, Vec3::ZERO);
    let child = spawn(&mut world, ObjectKind::Shield, RED, Vec3::ZERO);
    let _ = attach(&mut world, child, parent, 1);

    let events = damage(
        &mut world,
        parent,
        DamageInfo::new(200.0, DamageType::BLAST).from_team(BLUE),
    );

    assert_eq!(health(&world, parent), 1, "parent clamps at one health");
    assert_eq!(health(&world, child), 48);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::ObjectDestroyed { .. })));
}

#[test]
fn sapper_disables_host_once_per_edge() {
    let mut world = World::new();
    let host = spawn(&mut world, ObjectKind::Dispenser, BLUE, Vec3::ZERO);
    let sapper = spawn(&mut world, ObjectKind::Sapper, RED, Vec3::ZERO);

    let attached = attach(&mut world, sapper, host, 0);
    assert_eq!(
        attached
            .iter()
            .filter(|event| **event == Event::ObjectDisabled { object: host })
            .count(),
        1
    );
    let snapshot = query::object(&world, host).expect("host");
    assert!(snapshot.disabled);
    assert!(snapshot.has_sapper);

    let mut detached = Vec::new();
    apply(&mut world, Command::DetachObject { child: sapper }, &mut detached);
    assert_eq!(
        detached,
        vec![
            Event::ObjectDetached {
                child: sapper,
                parent: host,
                point: 0,
            },
            Event::ObjectReenabled { object: host },
        ]
    );
    assert!(!query::object(&world, host).expect("host").disabled);
}

#[test]
fn placed_sapper_builds_and_drains_its_host() {
    let mut world = World::new();
    connect(&mut world, 200);
    let host = spawn(&mut world, ObjectKind::Dispenser, BLUE, Vec3::new(100.0, 0.0, 0.0));

    let mut events = Vec::new();
    let sapper = start_sapper_placement(&mut world, &mut events);
    let ghost = query::object(&world, sapper).expect("ghost");
    assert!(ghost.placement_ok);
    assert!((ghost.origin - Vec3::new(100.0, 0.0, 30.0)).length() < 1e-3);

    events.clear();
    apply(&mut world, Command::StartBuilding { object: sapper }, &mut events);
    assert!(events.contains(&Event::ObjectDisabled { object: host }));
    assert!(
        !events.iter().any(|event| matches!(event, Event::MetalSpent { .. })),
        "sappers are free"
    );

    for _ in 0..10 {
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut events,
        );
    }
    assert!(events.contains(&Event::ConstructionFinished { object: sapper }));
    assert_eq!(health(&world, host), 150, "sappers only drain once constructed");

    apply(
        &mut world,
        Command::Tick {
            dt: Duration::from_secs(1),
        },
        &mut events,
    );
    let drained = query::object(&world, host).expect("host").precise_health;
    assert!((drained - 125.0).abs() < 1e-2, "host health {drained}");
}

#[test]
fn snap_prefers_nearest_build_point() {
    let mut config = WorldConfig::default();
    config.catalog.spec_mut(ObjectKind::Dispenser).build_points =
        vec![BuildPointSpec::new(Vec3::ZERO, vec![ObjectKind::Sapper], 128.0)];
    let mut world = World::with_config(config);
    connect(&mut world, 0);
    let _far = spawn(&mut world, ObjectKind::Dispenser, BLUE, Vec3::new(5.0, 0.0, 0.0));
    let near = spawn(&mut world, ObjectKind::Dispenser, BLUE, Vec3::new(3.0, 0.0, 0.0));

    let mut events = Vec::new();
    let sapper = start_sapper_placement(&mut world, &mut events);
    let ghost = query::object(&world, sapper).expect("ghost");
    assert!(ghost.placement_ok);
    assert_eq!(ghost.origin, Vec3::new(3.0, 0.0, 0.0));

    apply(&mut world, Command::StartBuilding { object: sapper }, &mut events);
    let built = query::object(&world, sapper).expect("sapper");
    assert_eq!(built.attachment.map(|attachment| attachment.parent), Some(near));
}

#[test]
fn snap_ignores_points_out_of_reach_or_sight() {
    let mut world = World::new();
    connect(&mut world, 200);
    let _distant = spawn(&mut world, ObjectKind::Dispenser, BLUE, Vec3::new(400.0, 0.0, 0.0));
    let _friendly = spawn(&mut world, ObjectKind::Dispenser, RED, Vec3::new(80.0, 0.0, 0.0));
    let _behind = spawn(&mut world, ObjectKind::Dispenser, BLUE, Vec3::new(-80.0, 0.0, 0.0));

    let mut events = Vec::new();
    let sapper = start_sapper_placement(&mut world, &mut events);
    let ghost = query::object(&world, sapper).expect("ghost");
    assert!(!ghost.placement_ok);
    assert!(!ghost.visible, "attachment ghosts hide without a target");

    let _walled = spawn(&mut world, ObjectKind::Dispenser, BLUE, Vec3::new(0.0, 90.0, 0.0));
    apply(
        &mut world,
        Command::MovePlayer {
            player: BUILDER,
            origin: Vec3::ZERO,
            yaw: 90.0,
        },
        &mut events,
    );
    apply(
        &mut world,
        Command::AddZone {
            zone: Zone::Solid {
                bounds: Aabb::new(Vec3::new(-50.0, 40.0, 0.0), Vec3::new(50.0, 50.0, 200.0)),
            },
        },
        &mut events,
    );
    apply(&mut world, Command::UpdatePlacement { object: sapper }, &mut events);
    assert!(!query::object(&world, sapper).expect("ghost").placement_ok);
}

#[test]
fn build_points_hold_a_single_occupant() {
    let mut world = World::new();
    let parent = spawn(&mut world, ObjectKind::Dispenser, RED, Vec3::ZERO);
    let first = spawn(&mut world, ObjectKind::Shield, RED, Vec3::ZERO);
    let second = spawn(&mut world, ObjectKind::Shield, RED, Vec3::ZERO);

    assert_eq!(
        attach(&mut world, first, parent, 1),
        vec![Event::ObjectAttached {
            child: first,
            parent,
            point: 1,
        }]
    );
    let rejected = |reason| {
        vec![Event::AttachRejected {
            child: second,
            parent,
            point: 1,
            reason,
        }]
    };
    assert_eq!(attach(&mut world, second, parent, 1), rejected(AttachError::Occupied));

    let not_accepted = attach(&mut world, second, parent, 0);
    assert!(matches!(
        not_accepted.as_slice(),
        [Event::AttachRejected {
            reason: AttachError::NotAccepted,
            ..
        }]
    ));
    let invalid = attach(&mut world, second, parent, 9);
    assert!(matches!(
        invalid.as_slice(),
        [Event::AttachRejected {
            reason: AttachError::InvalidPoint,
            ..
        }]
    ));
    let again = attach(&mut world, first, second, 1);
    assert!(matches!(
        again.as_slice(),
        [Event::AttachRejected {
            reason: AttachError::AlreadyAttached,
            ..
        }]
    ));
    let looped = attach(&mut world, parent, parent, 0);
    assert!(matches!(
        looped.as_slice(),
        [Event::AttachRejected {
            reason: AttachError::SelfAttachment,
            ..
        }]
    ));

    let snapshot = query::object(&world, parent).expect("parent");
    assert_eq!(snapshot.children, vec![first]);
}

#[test]
fn destruction_is_idempotent_and_throws_debris_once() {
    let mut world = World::new();
    connect(&mut world, 195);
    let sentry = spawn(&mut world, ObjectKind::SentryGun, BLUE, Vec3::new(50.0, 0.0, 0.0));

    let mut events = damage(
        &mut world,
        sentry,
        DamageInfo::new(1000.0, DamageType::BULLET).from_player(BUILDER),
    );
    events.extend(damage(
        &mut world,
        sentry,
        DamageInfo::new(1000.0, DamageType::BULLET).from_player(BUILDER),
    ));
    apply(&mut world, Command::DetonateObject { object: sentry }, &mut events);

    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, Event::ObjectDestroyed { .. }))
            .count(),
        1
    );
    assert!(events.contains(&Event::ObjectDestroyed {
        object: sentry,
        kind: ObjectKind::SentryGun,
        team: Some(BLUE),
        builder: None,
        attacker: Some(BUILDER),
        assister: None,
    }));
    let debris = query::debris(&world);
    assert_eq!(debris.len(), 5);
    assert!(debris.iter().all(|piece| piece.metal == 13));
    assert!(query::team_roster(&world, BLUE).is_empty());

    let mut pickup = Vec::new();
    apply(
        &mut world,
        Command::CollectDebris {
            debris: debris[0].id,
            player: BUILDER,
        },
        &mut pickup,
    );
    assert_eq!(
        pickup,
        vec![
            Event::DebrisCollected {
                debris: debris[0].id,
                player: BUILDER,
                metal: 5,
            },
            Event::MetalRefunded {
                player: BUILDER,
                amount: 5,
            },
        ]
    );
    assert_eq!(query::player(&world, BUILDER).expect("player").metal, 200);
    assert_eq!(query::debris(&world).len(), 4);
}

#[test]
fn destroying_a_parent_removes_its_attachments() {
    let mut world = World::new();
    let parent = spawn(&mut world, ObjectKind::Dispenser, RED, Vec3::ZERO);
    let child = spawn(&mut world, ObjectKind::Shield, RED, Vec3::ZERO);
    let _ = attach(&mut world, child, parent, 1);

    let mut events = Vec::new();
    apply(&mut world, Command::DetonateObject { object: parent }, &mut events);

    assert!(events.contains(&Event::ObjectRemoved {
        object: parent,
        reason: RemovalReason::Destroyed,
    }));
    assert!(events.contains(&Event::ObjectRemoved {
        object: child,
        reason: RemovalReason::ParentDestroyed,
    }));
    assert!(query::object_view(&world).into_vec().is_empty());
}

#[test]
fn wrench_beats_off_sappers_then_repairs_for_metal() {
    let mut world = World::new();
    connect(&mut world, 200);
    let host = spawn(&mut world, ObjectKind::Dispenser, RED, Vec3::new(60.0, 0.0, 0.0));
    let sapper = spawn(&mut world, ObjectKind::Sapper, BLUE, Vec3::ZERO);
    let _ = attach(&mut world, sapper, host, 0);

    let mut events = Vec::new();
    let wrench = Command::WrenchHit {
        object: host,
        player: BUILDER,
    };
    apply(&mut world, wrench.clone(), &mut events);
    assert_eq!(health(&world, sapper), 35);
    apply(&mut world, wrench.clone(), &mut events);
    assert!(query::object(&world, sapper).is_none());
    assert!(events.contains(&Event::ObjectReenabled { object: host }));
    assert!(!query::object(&world, host).expect("host").has_sapper);

    let _ = damage(
        &mut world,
        host,
        DamageInfo::new(50.0, DamageType::BULLET).from_team(BLUE),
    );
    assert_eq!(health(&world, host), 100);

    events.clear();
    apply(&mut world, wrench, &mut events);
    assert!(events.contains(&Event::MetalSpent {
        player: BUILDER,
        amount: 10,
    }));
    assert_eq!(health(&world, host), 150);
    assert_eq!(query::player(&world, BUILDER).expect("player").metal, 190);
}

#[test]
fn layout_change_reseats_or_orphans_children() {
    let mut world = World::new();
    let parent = spawn(&mut world, ObjectKind::Dispenser, RED, Vec3::ZERO);
    let child = spawn(&mut world, ObjectKind::Shield, RED, Vec3::ZERO);
    let _ = attach(&mut world, child, parent, 1);

    let mut events = Vec::new();
    apply(
        &mut world,
        Command::ReplaceBuildPoints {
            object: parent,
            points: vec![BuildPointSpec::new(
                Vec3::new(0.0, 0.0, 70.0),
                vec![ObjectKind::Shield],
                96.0,
            )],
        },
        &mut events,
    );
    let moved = query::object(&world, child).expect("child re-seated");
    assert_eq!(moved.attachment.map(|attachment| attachment.point), Some(0));
    assert!((moved.origin - Vec3::new(0.0, 0.0, 70.0)).length() < 1e-3);

    events.clear();
    apply(
        &mut world,
        Command::ReplaceBuildPoints {
            object: parent,
            points: vec![BuildPointSpec::new(Vec3::ZERO, vec![ObjectKind::Sapper], 128.0)],
        },
        &mut events,
    );
    assert!(events.contains(&Event::ObjectRemoved {
        object: child,
        reason: RemovalReason::Orphaned,
    }));
    assert!(query::object(&world, parent).expect("parent").children.is_empty());
}

#[test]
fn layout_change_keeps_sapped_host_disabled_without_edges() {
    let mut world = World::new();
    let host = spawn(&mut world, ObjectKind::Dispenser, BLUE, Vec3::ZERO);
    let sapper = spawn(&mut world, ObjectKind::Sapper, RED, Vec3::ZERO);
    let _ = attach(&mut world, sapper, host, 0);

    let is_edge = |event: &Event| {
        matches!(
            event,
            Event::ObjectDisabled { .. } | Event::ObjectReenabled { .. }
        )
    };

    let mut events = Vec::new();
    apply(
        &mut world,
        Command::ReplaceBuildPoints {
            object: host,
            points: vec![BuildPointSpec::new(
                Vec3::new(0.0, 0.0, 40.0),
                vec![ObjectKind::Sapper],
                128.0,
            )],
        },
        &mut events,
    );
    assert!(
        !events.iter().any(is_edge),
        "a sapper that stays seated does not toggle its host: {events:?}"
    );
    let snapshot = query::object(&world, host).expect("host");
    assert!(snapshot.disabled);
    assert!(snapshot.has_sapper);
    assert_eq!(snapshot.children, vec![sapper]);

    events.clear();
    apply(
        &mut world,
        Command::ReplaceBuildPoints {
            object: host,
            points: vec![BuildPointSpec::new(Vec3::ZERO, vec![ObjectKind::Shield], 96.0)],
        },
        &mut events,
    );
    assert_eq!(
        events.iter().filter(|event| is_edge(*event)).collect::<Vec<_>>(),
        vec![&Event::ObjectReenabled { object: host }]
    );
    assert!(!query::object(&world, host).expect("host").disabled);
}
