//! Scripted sessions that drive the world and the builder tool headlessly.

use std::time::Duration;

use glam::Vec3;
use outpost_core::{
    Command, DamageInfo, DamageType, Event, ObjectId, ObjectKind, ObjectPhase, PlayerId, TeamId,
};
use outpost_system_builder::{Builder, BuilderConfig, BuilderCue, BuilderInput};
use outpost_world::{apply, query, World, WorldConfig};
use serde::Serialize;
use tracing::{debug, info};

const FRAME: Duration = Duration::from_millis(100);
const ENGINEER: PlayerId = PlayerId::new(1);
const SPY: PlayerId = PlayerId::new(2);
const RED: TeamId = TeamId::new(1);
const BLUE: TeamId = TeamId::new(2);

/// Frame-by-frame harness feeding builder commands into the world.
struct Session {
    world: World,
    events: Vec<Event>,
    event_count: usize,
    frames: u32,
}

impl Session {
    fn new(config: WorldConfig) -> Self {
        Self {
            world: World::with_config(config),
            events: Vec::new(),
            event_count: 0,
            frames: 0,
        }
    }

    fn connect(&mut self, player: PlayerId, team: TeamId, origin: Vec3, yaw: f32) {
        self.apply(Command::ConnectPlayer {
            player,
            team,
            metal: 200,
            origin,
            yaw,
        });
    }

    fn apply(&mut self, command: Command) {
        let start = self.events.len();
        apply(&mut self.world, command, &mut self.events);
        for event in &self.events[start..] {
            debug!(?event, "world event");
        }
        self.event_count += self.events.len() - start;
    }

    fn spawn(&mut self, kind: ObjectKind, team: TeamId, origin: Vec3) -> Option<ObjectId> {
        let start = self.events.len();
        self.apply(Command::SpawnMapObject {
            kind,
            team,
            builder: None,
            origin,
            yaw: 0.0,
        });
        self.events[start..].iter().find_map(|event| match event {
            Event::ConstructionFinished { object } => Some(*object),
            _ => None,
        })
    }

    /// Runs one frame: the builder sees last frame's events, then time advances.
    fn frame(&mut self, builder: &mut Builder, input: BuilderInput) {
        let player = builder.player();
        let mut commands = Vec::new();
        let mut cues = Vec::new();
        let world = &self.world;
        builder.handle(
            &self.events,
            input,
            |kind| query::can_afford(world, player, kind),
            |object| query::object(world, object).is_some_and(|ghost| ghost.placement_ok),
            &mut commands,
            &mut cues,
        );
        for cue in cues {
            log_cue(cue);
        }

        self.events.clear();
        for command in commands {
            self.apply(command);
        }
        self.tick();
    }

    fn tick(&mut self) {
        self.frames += 1;
        self.apply(Command::Tick { dt: FRAME });
    }

    fn idle(&mut self, duration: Duration) {
        let frames = duration.as_millis() / FRAME.as_millis();
        for _ in 0..frames {
            self.events.clear();
            self.tick();
        }
    }

    fn report(&self, scenario: &'static str) -> Report {
        Report {
            scenario,
            frames: self.frames,
            events: self.event_count,
            elapsed_seconds: query::clock(&self.world).as_secs_f32(),
            objects: query::object_view(&self.world)
                .iter()
                .map(|object| ObjectReport {
                    index: object.id.index(),
                    kind: object.kind.name(),
                    phase: phase_name(object.phase),
                    team: object.team.map(|team| team.get()),
                    health: object.health,
                    max_health: object.max_health,
                    percent_constructed: object.percent_constructed,
                    disabled: object.disabled,
                    children: object.children.len(),
                })
                .collect(),
            players: query::players(&self.world)
                .into_iter()
                .map(|player| PlayerReport {
                    id: player.id.get(),
                    team: player.team.get(),
                    metal: player.metal,
                })
                .collect(),
            debris: query::debris(&self.world).len(),
        }
    }
}

fn log_cue(cue: BuilderCue) {
    match cue {
        BuilderCue::DenyPlacement => info!("placement denied"),
        BuilderCue::CannotAfford => info!("not enough metal"),
        BuilderCue::SwitchedAway => info!("builder switched away"),
    }
}

fn phase_name(phase: ObjectPhase) -> &'static str {
    match phase {
        ObjectPhase::Placing => "placing",
        ObjectPhase::Building => "building",
        ObjectPhase::Active => "active",
    }
}

/// Summary of a finished scenario.
#[derive(Debug, Serialize)]
pub(crate) struct Report {
    pub(crate) scenario: &'static str,
    pub(crate) frames: u32,
    pub(crate) events: usize,
    pub(crate) elapsed_seconds: f32,
    pub(crate) objects: Vec<ObjectReport>,
    pub(crate) players: Vec<PlayerReport>,
    pub(crate) debris: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct ObjectReport {
    pub(crate) index: u32,
    pub(crate) kind: &'static str,
    pub(crate) phase: &'static str,
    pub(crate) team: Option<u8>,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) percent_constructed: f32,
    pub(crate) disabled: bool,
    pub(crate) children: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlayerReport {
    pub(crate) id: u32,
    pub(crate) team: u8,
    pub(crate) metal: u32,
}

fn press(primary: bool, select: Option<ObjectKind>) -> BuilderInput {
    BuilderInput {
        primary,
        select,
        ..BuilderInput::default()
    }
}

/// An engineer selects `kind`, commits it in front of them and waits for construction.
pub(crate) fn build(config: WorldConfig, kind: ObjectKind, seconds: u32) -> Report {
    let mut session = Session::new(config);
    session.connect(ENGINEER, RED, Vec3::ZERO, 0.0);
    let mut builder = Builder::new(ENGINEER, BuilderConfig::default());

    session.frame(&mut builder, press(true, None));
    session.frame(&mut builder, press(false, Some(kind)));
    session.frame(&mut builder, BuilderInput::default());
    session.frame(&mut builder, press(true, None));
    session.idle(Duration::from_secs(u64::from(seconds)));

    info!(kind = kind.name(), seconds, "build scenario finished");
    session.report("build")
}

/// A spy saps an enemy sentry, then the sentry's engineer beats the sapper off.
pub(crate) fn sap(config: WorldConfig) -> Report {
    let mut session = Session::new(config);
    session.connect(SPY, RED, Vec3::ZERO, 0.0);
    session.connect(ENGINEER, BLUE, Vec3::new(160.0, 0.0, 0.0), 180.0);
    let Some(sentry) = session.spawn(ObjectKind::SentryGun, BLUE, Vec3::new(100.0, 0.0, 0.0)) else {
        return session.report("sap");
    };

    let mut spy = Builder::new(SPY, BuilderConfig::default());
    session.frame(&mut spy, press(true, None));
    session.frame(&mut spy, press(false, Some(ObjectKind::Sapper)));
    session.frame(&mut spy, BuilderInput::default());
    session.frame(&mut spy, press(true, None));
    session.frame(
        &mut spy,
        BuilderInput {
            holster: true,
            ..BuilderInput::default()
        },
    );
    // Sappers repeat, so the follow-up ghost announced after holstering is discarded here.
    session.frame(&mut spy, BuilderInput::default());
    session.idle(Duration::from_secs(2));

    let disabled = query::object(&session.world, sentry).is_some_and(|sentry| sentry.disabled);
    info!(disabled, "sentry sapped");

    for _ in 0..2 {
        session.apply(Command::WrenchHit {
            object: sentry,
            player: ENGINEER,
        });
    }
    session.idle(Duration::from_secs(1));
    session.report("sap")
}

/// A teammate shoots a dispenser whose shield takes the hit instead.
pub(crate) fn friendly_fire(config: WorldConfig) -> Report {
    let mut session = Session::new(config);
    session.connect(ENGINEER, RED, Vec3::ZERO, 0.0);
    let parent = session.spawn(ObjectKind::Dispenser, RED, Vec3::new(200.0, 0.0, 0.0));
    let child = session.spawn(ObjectKind::Shield, RED, Vec3::new(200.0, 0.0, 0.0));
    let (Some(parent), Some(child)) = (parent, child) else {
        return session.report("friendly-fire");
    };

    session.apply(Command::AttachObject {
        child,
        parent,
        point: 1,
    });
    session.apply(Command::DamageObject {
        object: parent,
        damage: DamageInfo::new(50.0, DamageType::BULLET).from_player(ENGINEER),
    });
    session.tick();
    session.report("friendly-fire")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object<'a>(report: &'a Report, kind: &str) -> &'a ObjectReport {
        report
            .objects
            .iter()
            .find(|object| object.kind == kind)
            .expect("object present in report")
    }

    #[test]
    fn build_scenario_finishes_sentry() {
        let report = build(WorldConfig::default(), ObjectKind::SentryGun, 11);
        let sentry = object(&report, "sentry_gun");
        assert_eq!(sentry.phase, "active");
        assert_eq!(sentry.health, sentry.max_health);
        assert_eq!(report.players[0].metal, 70);
    }

    #[test]
    fn sap_scenario_frees_the_sentry() {
        let report = sap(WorldConfig::default());
        let sentry = object(&report, "sentry_gun");
        assert!(!sentry.disabled);
        assert_eq!(sentry.children, 0);
        assert!(report.objects.iter().all(|object| object.kind != "sapper"));
    }

    #[test]
    fn friendly_fire_scenario_spares_the_parent() {
        let report = friendly_fire(WorldConfig::default());
        assert_eq!(object(&report, "dispenser").health, 150);
        assert_eq!(object(&report, "shield").health, 50);
    }
}
