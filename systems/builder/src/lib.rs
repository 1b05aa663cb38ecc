#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure builder-tool system that turns player input into placement and build commands.

use std::time::Duration;

use outpost_core::{Command, Event, ObjectId, ObjectKind, PlayerId, RemovalReason};

/// Tunables of the builder tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Shortest gap between two deny cues.
    pub deny_interval: Duration,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            deny_interval: Duration::from_millis(500),
        }
    }
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Primary action: opens the selection or commits the ghost.
    pub primary: bool,
    /// Secondary action: rotates the ghost a quarter turn.
    pub secondary: bool,
    /// Kind picked by the external selection menu on this frame.
    pub select: Option<ObjectKind>,
    /// The player put the tool away.
    pub holster: bool,
}

/// Feedback the adapter should play for the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderCue {
    /// The ghost stands somewhere it cannot be built.
    DenyPlacement,
    /// The player lacks the metal for the selected kind.
    CannotAfford,
    /// The tool was put away because the player can no longer afford the ghost.
    SwitchedAway,
}

/// Ghost currently carried by the builder tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Kind being placed.
    pub kind: ObjectKind,
    /// Ghost created by the world, once it has been announced.
    pub ghost: Option<ObjectId>,
    /// Whether another ghost follows a successful commit.
    pub repeatable: bool,
    /// A build command was sent and the world has not answered yet.
    pub committed: bool,
}

impl Placement {
    fn pending(kind: ObjectKind) -> Self {
        Self {
            kind,
            ghost: None,
            repeatable: false,
            committed: false,
        }
    }

    /// Ghost that can still be rotated, committed or cancelled.
    fn open_ghost(&self) -> Option<ObjectId> {
        self.ghost.filter(|_| !self.committed)
    }
}

/// State of the builder tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderState {
    /// Tool is idle.
    Idle,
    /// Waiting for the player to pick a kind.
    Selecting,
    /// Carrying a ghost.
    Placing(Placement),
}

/// Builder-tool system owned by a single player.
#[derive(Clone, Debug)]
pub struct Builder {
    player: PlayerId,
    config: BuilderConfig,
    state: BuilderState,
    since_deny: Duration,
}

impl Builder {
    /// Creates an idle builder tool for `player`.
    #[must_use]
    pub fn new(player: PlayerId, config: BuilderConfig) -> Self {
        Self {
            player,
            config,
            state: BuilderState::Idle,
            since_deny: config.deny_interval,
        }
    }

    /// Player owning the tool.
    #[must_use]
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Current state of the tool.
    #[must_use]
    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Consumes world events and adapter input to emit builder commands.
    ///
    /// `can_afford` should mirror the world's `query::can_afford` for the owning
    /// player and `placement_ok` the `placement_ok` flag of a ghost snapshot.
    pub fn handle<A, P>(
        &mut self,
        events: &[Event],
        input: BuilderInput,
        can_afford: A,
        placement_ok: P,
        out: &mut Vec<Command>,
        cues: &mut Vec<BuilderCue>,
    ) where
        A: Fn(ObjectKind) -> bool,
        P: Fn(ObjectId) -> bool,
    {
        for event in events {
            self.observe(event, &can_afford, out, cues);
        }

        if input.holster {
            if let BuilderState::Placing(placement) = self.state {
                if let Some(object) = placement.open_ghost() {
                    out.push(Command::StopPlacement { object });
                }
            }
            self.state = BuilderState::Idle;
            return;
        }

        match self.state {
            BuilderState::Idle => {
                if input.primary {
                    self.state = BuilderState::Selecting;
                }
            }
            BuilderState::Selecting => {
                if let Some(kind) = input.select {
                    if can_afford(kind) {
                        self.begin_placement(kind, out);
                    } else {
                        cues.push(BuilderCue::CannotAfford);
                    }
                }
            }
            BuilderState::Placing(mut placement) => {
                if !placement.committed && !can_afford(placement.kind) {
                    if let Some(object) = placement.ghost {
                        out.push(Command::StopPlacement { object });
                    }
                    cues.push(BuilderCue::SwitchedAway);
                    self.state = BuilderState::Idle;
                    return;
                }
                let Some(object) = placement.open_ghost() else {
                    return;
                };
                if input.secondary {
                    out.push(Command::RotatePlacement { object });
                }
                if input.primary {
                    if placement_ok(object) {
                        out.push(Command::StartBuilding { object });
                        placement.committed = true;
                        self.state = BuilderState::Placing(placement);
                    } else {
                        self.deny(cues);
                    }
                }
            }
        }
    }

    fn observe<A>(
        &mut self,
        event: &Event,
        can_afford: &A,
        out: &mut Vec<Command>,
        cues: &mut Vec<BuilderCue>,
    ) where
        A: Fn(ObjectKind) -> bool,
    {
        match event {
            Event::TimeAdvanced { dt } => {
                self.since_deny = self.since_deny.saturating_add(*dt);
            }
            Event::PlacementStarted {
                object,
                builder,
                kind,
                repeatable,
            } if *builder == Some(self.player) => match &mut self.state {
                BuilderState::Placing(placement)
                    if placement.ghost.is_none() && placement.kind == *kind =>
                {
                    placement.ghost = Some(*object);
                    placement.repeatable = *repeatable;
                }
                _ => out.push(Command::StopPlacement { object: *object }),
            },
            Event::BuildingStarted { object, .. } => {
                let BuilderState::Placing(placement) = self.state else {
                    return;
                };
                if placement.ghost != Some(*object) {
                    return;
                }
                if placement.repeatable && can_afford(placement.kind) {
                    self.begin_placement(placement.kind, out);
                } else {
                    self.state = BuilderState::Idle;
                }
            }
            Event::BuildRejected { object, .. } => {
                if let BuilderState::Placing(placement) = &mut self.state {
                    if placement.ghost == Some(*object) {
                        placement.committed = false;
                    }
                }
            }
            Event::ObjectRemoved { object, reason } => {
                let BuilderState::Placing(placement) = self.state else {
                    return;
                };
                if placement.ghost != Some(*object) {
                    return;
                }
                if *reason == RemovalReason::InsufficientResources {
                    cues.push(BuilderCue::CannotAfford);
                }
                self.state = BuilderState::Idle;
            }
            _ => {}
        }
    }

    fn begin_placement(&mut self, kind: ObjectKind, out: &mut Vec<Command>) {
        out.push(Command::StartPlacement {
            builder: Some(self.player),
            kind,
        });
        self.state = BuilderState::Placing(Placement::pending(kind));
    }

    fn deny(&mut self, cues: &mut Vec<BuilderCue>) {
        if self.since_deny >= self.config.deny_interval {
            cues.push(BuilderCue::DenyPlacement);
            self.since_deny = Duration::ZERO;
        }
    }
}
