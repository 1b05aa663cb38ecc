#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Outpost construction engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of discrete 90 degree steps a placement ghost can be rotated through.
pub const BUILD_ROTATION_STEPS: u8 = 4;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Registers a player able to build, repair and damage objects.
    ConnectPlayer {
        /// Identifier chosen by the hosting engine for the player.
        player: PlayerId,
        /// Team the player fights for.
        team: TeamId,
        /// Metal initially held in the player's wallet.
        metal: u32,
        /// Feet position of the player.
        origin: Vec3,
        /// Horizontal view angle measured in degrees.
        yaw: f32,
    },
    /// Updates the position and view direction of a connected player.
    MovePlayer {
        /// Player that moved.
        player: PlayerId,
        /// New feet position of the player.
        origin: Vec3,
        /// New horizontal view angle measured in degrees.
        yaw: f32,
    },
    /// Removes a player; objects they built keep existing without a builder.
    DisconnectPlayer {
        /// Player leaving the world.
        player: PlayerId,
    },
    /// Adds a static world volume consulted by the placement validator.
    AddZone {
        /// Volume to add.
        zone: Zone,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Spawns a fully constructed object, bypassing placement and construction.
    SpawnMapObject {
        /// Type of object to spawn.
        kind: ObjectKind,
        /// Team that owns the object.
        team: TeamId,
        /// Optional player credited as the object's builder.
        builder: Option<PlayerId>,
        /// World position of the object.
        origin: Vec3,
        /// Facing of the object in degrees.
        yaw: f32,
    },
    /// Creates a placement ghost that follows the builder.
    StartPlacement {
        /// Player placing the object; a ghost without builder never validates.
        builder: Option<PlayerId>,
        /// Type of object being placed.
        kind: ObjectKind,
    },
    /// Re-evaluates the placement of a ghost outside the regular tick.
    UpdatePlacement {
        /// Ghost to re-evaluate.
        object: ObjectId,
    },
    /// Rotates a ghost's desired orientation by a quarter turn.
    RotatePlacement {
        /// Ghost to rotate.
        object: ObjectId,
    },
    /// Discards an uncommitted ghost without refunding anything.
    StopPlacement {
        /// Ghost to discard.
        object: ObjectId,
    },
    /// Commits a ghost, charging the builder and beginning construction.
    StartBuilding {
        /// Ghost to commit.
        object: ObjectId,
    },
    /// Applies damage to an object.
    DamageObject {
        /// Object being hit.
        object: ObjectId,
        /// Description of the damage.
        damage: DamageInfo,
    },
    /// Repairs or helps construct an object by the provided health amount.
    RepairObject {
        /// Object being repaired.
        object: ObjectId,
        /// Health contributed before the repair multiplier is applied.
        amount: f32,
    },
    /// Records a repairer contribution that speeds up construction and repair.
    RepairHit {
        /// Object being worked on.
        object: ObjectId,
        /// Player contributing to the repair.
        repairer: PlayerId,
    },
    /// Resolves a wrench strike: removes sappers, assists construction or repairs.
    WrenchHit {
        /// Object that was struck.
        object: ObjectId,
        /// Player wielding the wrench.
        player: PlayerId,
    },
    /// Removes an object on its builder's request, without an explosion or debris.
    DismantleObject {
        /// Object to take down.
        object: ObjectId,
        /// Player asking for the removal.
        player: PlayerId,
    },
    /// Destroys an object with an explosion but without crediting a killer.
    DetonateObject {
        /// Object to detonate.
        object: ObjectId,
    },
    /// Overrides the maximum health of an object and fully heals it.
    SetObjectHealth {
        /// Object to modify.
        object: ObjectId,
        /// New maximum health.
        max_health: u32,
    },
    /// Adds health to an object up to its maximum.
    AddObjectHealth {
        /// Object to modify.
        object: ObjectId,
        /// Health to add.
        amount: u32,
    },
    /// Removes health from an object, destroying it when health runs out.
    RemoveObjectHealth {
        /// Object to modify.
        object: ObjectId,
        /// Health to remove.
        amount: u32,
    },
    /// Attaches an object onto a build point of another object.
    AttachObject {
        /// Object being attached.
        child: ObjectId,
        /// Object providing the build point.
        parent: ObjectId,
        /// Index of the build point on the parent.
        point: usize,
    },
    /// Detaches an object from the build point it occupies.
    DetachObject {
        /// Object being detached.
        child: ObjectId,
    },
    /// Replaces the build point layout of an object and re-seats its children.
    ReplaceBuildPoints {
        /// Object whose layout changed.
        object: ObjectId,
        /// New ordered build point layout.
        points: Vec<BuildPointSpec>,
    },
    /// Transfers the metal carried by a debris fragment into a player's wallet.
    CollectDebris {
        /// Debris fragment being picked up.
        debris: DebrisId,
        /// Player picking up the fragment.
        player: PlayerId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a player joined the world.
    PlayerConnected {
        /// Player that joined.
        player: PlayerId,
        /// Team the player joined.
        team: TeamId,
    },
    /// Confirms that a player left the world.
    PlayerDisconnected {
        /// Player that left.
        player: PlayerId,
    },
    /// Reports that metal was taken from a player's wallet.
    MetalSpent {
        /// Player whose wallet was charged.
        player: PlayerId,
        /// Metal removed from the wallet.
        amount: u32,
    },
    /// Reports that metal was returned to a player's wallet.
    MetalRefunded {
        /// Player whose wallet was credited.
        player: PlayerId,
        /// Metal added to the wallet.
        amount: u32,
    },
    /// Confirms that a placement ghost was created.
    PlacementStarted {
        /// Identifier assigned to the ghost.
        object: ObjectId,
        /// Player placing the ghost, if any.
        builder: Option<PlayerId>,
        /// Type of object being placed.
        kind: ObjectKind,
        /// Whether the builder may immediately place another object of this kind.
        repeatable: bool,
    },
    /// Reports that a ghost moved between a valid and an invalid location.
    PlacementValidityChanged {
        /// Ghost whose validity changed.
        object: ObjectId,
        /// Whether the current location is buildable.
        valid: bool,
    },
    /// Confirms that a ghost's desired orientation changed.
    PlacementRotated {
        /// Ghost that rotated.
        object: ObjectId,
        /// Number of quarter turns applied, always below [`BUILD_ROTATION_STEPS`].
        rotations: u8,
    },
    /// Confirms that a ghost was committed and construction began.
    BuildingStarted {
        /// Object under construction.
        object: ObjectId,
        /// Type of the object.
        kind: ObjectKind,
        /// Player that paid for the object, if any.
        builder: Option<PlayerId>,
        /// Seconds required to finish construction without repairers.
        construction_time: f32,
    },
    /// Reports that a build commit was refused.
    BuildRejected {
        /// Ghost that could not be committed.
        object: ObjectId,
        /// Specific reason the commit failed.
        reason: BuildError,
    },
    /// Confirms that an object finished construction and became active.
    ConstructionFinished {
        /// Object that finished.
        object: ObjectId,
    },
    /// Reports a change of the replicated integer health of an object.
    ObjectHealthChanged {
        /// Object whose health changed.
        object: ObjectId,
        /// New replicated health.
        health: u32,
    },
    /// Reports that an object lost health to damage.
    ObjectDamaged {
        /// Object that was hit.
        object: ObjectId,
        /// Health removed from the object.
        amount: f32,
        /// Attacker credited with the damage.
        attacker: Option<PlayerId>,
    },
    /// Reports that an object regained health through repair.
    ObjectRepaired {
        /// Object that was repaired.
        object: ObjectId,
        /// Health restored to the object.
        amount: f32,
    },
    /// Announces that an object stopped operating.
    ObjectDisabled {
        /// Object that became disabled.
        object: ObjectId,
    },
    /// Announces that an object resumed operating.
    ObjectReenabled {
        /// Object that became enabled again.
        object: ObjectId,
    },
    /// Confirms that an object now occupies a build point.
    ObjectAttached {
        /// Object that was attached.
        child: ObjectId,
        /// Object providing the build point.
        parent: ObjectId,
        /// Index of the occupied build point.
        point: usize,
    },
    /// Confirms that an object vacated a build point.
    ObjectDetached {
        /// Object that was detached.
        child: ObjectId,
        /// Object that provided the build point.
        parent: ObjectId,
        /// Index of the vacated build point.
        point: usize,
    },
    /// Reports that an attach request was refused.
    AttachRejected {
        /// Object that could not be attached.
        child: ObjectId,
        /// Requested parent object.
        parent: ObjectId,
        /// Requested build point.
        point: usize,
        /// Specific reason the request failed.
        reason: AttachError,
    },
    /// Announces the destruction of an object.
    ObjectDestroyed {
        /// Object that was destroyed.
        object: ObjectId,
        /// Type of the destroyed object.
        kind: ObjectKind,
        /// Team that owned the object.
        team: Option<TeamId>,
        /// Player that built the object.
        builder: Option<PlayerId>,
        /// Player credited with the kill, absent for detonations.
        attacker: Option<PlayerId>,
        /// Owner of a sapper that contributed to the kill.
        assister: Option<PlayerId>,
    },
    /// Requests playback of an audiovisual effect at a world position.
    EffectPlayed {
        /// Object the effect belongs to.
        object: ObjectId,
        /// Sound to emit, if any.
        sound: Option<String>,
        /// Particle system to spawn, if any.
        particle: Option<String>,
        /// Location of the effect.
        position: Vec3,
    },
    /// Confirms that a debris fragment was thrown from a destroyed object.
    DebrisSpawned {
        /// Identifier assigned to the fragment.
        debris: DebrisId,
        /// Metal refunded to whoever collects the fragment.
        metal: u32,
        /// Spawn position of the fragment.
        origin: Vec3,
        /// Initial velocity of the fragment.
        velocity: Vec3,
    },
    /// Confirms that a debris fragment was collected.
    DebrisCollected {
        /// Fragment that was collected.
        debris: DebrisId,
        /// Player that collected it.
        player: PlayerId,
        /// Metal credited to the player.
        metal: u32,
    },
    /// Confirms that an object was removed from the world.
    ObjectRemoved {
        /// Object that was removed.
        object: ObjectId,
        /// Why the object was removed.
        reason: RemovalReason,
    },
}

/// Types of objects that players can construct.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Automated turret.
    SentryGun,
    /// Station that hands out health and metal.
    Dispenser,
    /// Entry pad of a teleporter pair.
    TeleporterEntrance,
    /// Exit pad of a teleporter pair.
    TeleporterExit,
    /// Hostile attachment that disables the enemy object it is built on.
    Sapper,
    /// Friendly attachment that absorbs damage for the object it is built on.
    Shield,
}

impl ObjectKind {
    /// Every object kind in declaration order.
    pub const ALL: [ObjectKind; 6] = [
        Self::SentryGun,
        Self::Dispenser,
        Self::TeleporterEntrance,
        Self::TeleporterExit,
        Self::Sapper,
        Self::Shield,
    ];

    /// Short identifier used in logs and response rules.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SentryGun => "sentry_gun",
            Self::Dispenser => "dispenser",
            Self::TeleporterEntrance => "teleporter_entrance",
            Self::TeleporterExit => "teleporter_exit",
            Self::Sapper => "sapper",
            Self::Shield => "shield",
        }
    }
}

/// Error returned when a name does not match any [`ObjectKind`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown object kind `{0}`")]
pub struct UnknownObjectKind(pub String);

impl std::str::FromStr for ObjectKind {
    type Err = UnknownObjectKind;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| UnknownObjectKind(name.to_owned()))
    }
}

bitflags! {
    /// Classification of incoming damage.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DamageType: u32 {
        /// Crushing damage, also dealt by sappers draining their host.
        const CRUSH = 1 << 0;
        /// Hitscan bullet damage.
        const BULLET = 1 << 1;
        /// Slashing melee damage.
        const SLASH = 1 << 2;
        /// Fire damage.
        const BURN = 1 << 3;
        /// Explosive damage; never forwarded onto attached children.
        const BLAST = 1 << 6;
        /// Blunt melee damage, such as wrench strikes.
        const CLUB = 1 << 7;
    }
}

/// Description of a single damage application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageInfo {
    /// Raw damage before object-specific modifiers.
    pub amount: f32,
    /// Classification of the damage.
    pub damage_type: DamageType,
    /// Player responsible for the damage.
    pub attacker: Option<PlayerId>,
    /// Team of the attacker when it is not a connected player.
    pub attacker_team: Option<TeamId>,
    /// Object that delivered the damage, if any.
    pub inflictor: Option<ObjectId>,
}

impl DamageInfo {
    /// Creates anonymous damage of the provided amount and type.
    #[must_use]
    pub const fn new(amount: f32, damage_type: DamageType) -> Self {
        Self {
            amount,
            damage_type,
            attacker: None,
            attacker_team: None,
            inflictor: None,
        }
    }

    /// Credits the damage to a player.
    #[must_use]
    pub const fn from_player(mut self, attacker: PlayerId) -> Self {
        self.attacker = Some(attacker);
        self
    }

    /// Marks the damage as originating from the provided team.
    #[must_use]
    pub const fn from_team(mut self, team: TeamId) -> Self {
        self.attacker_team = Some(team);
        self
    }

    /// Records the object that delivered the damage.
    #[must_use]
    pub const fn with_inflictor(mut self, inflictor: ObjectId) -> Self {
        self.inflictor = Some(inflictor);
        self
    }

    /// Returns a copy carrying a different amount.
    #[must_use]
    pub const fn with_amount(mut self, amount: f32) -> Self {
        self.amount = amount;
        self
    }
}

/// Handle to an object stored in the world's arena.
///
/// The generation distinguishes successive occupants of the same arena slot, so
/// a handle to a removed object never resolves to its replacement.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Creates a handle from an arena slot index and generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot referenced by the handle.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time the handle was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Unique identifier assigned to a player by the hosting engine.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a team.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TeamId(u8);

impl TeamId {
    /// Creates a new team identifier.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Unique identifier assigned to a debris fragment.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DebrisId(u32);

impl DebrisId {
    /// Creates a new debris identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Axis-aligned box expressed in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub mins: Vec3,
    /// Maximum corner.
    pub maxs: Vec3,
}

impl Aabb {
    /// Creates a box from its corners, reordering components when necessary.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            mins: a.min(b),
            maxs: a.max(b),
        }
    }

    /// Creates a box centred on `center` extending `half_extents` along each axis.
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            mins: center - half_extents,
            maxs: center + half_extents,
        }
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    /// Returns the box moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            mins: self.mins + offset,
            maxs: self.maxs + offset,
        }
    }

    /// Returns the box grown by `amount` on every side.
    #[must_use]
    pub fn inflated(&self, amount: Vec3) -> Self {
        Self::new(self.mins - amount, self.maxs + amount)
    }

    /// Reports whether the point lies inside the box, borders included.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.mins).all() && point.cmple(self.maxs).all()
    }

    /// Reports whether two boxes overlap with a non-empty volume.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.mins.cmplt(other.maxs).all() && other.mins.cmplt(self.maxs).all()
    }

    /// Returns the fraction along `start..end` where the segment first enters the box.
    ///
    /// A segment starting inside the box reports `Some(0.0)`.
    #[must_use]
    pub fn segment_entry(&self, start: Vec3, end: Vec3) -> Option<f32> {
        let delta = end - start;
        let mut enter = 0.0_f32;
        let mut exit = 1.0_f32;

        for axis in 0..3 {
            let origin = start[axis];
            let direction = delta[axis];
            let (low, high) = (self.mins[axis], self.maxs[axis]);

            if direction.abs() <= f32::EPSILON {
                if origin < low || origin > high {
                    return None;
                }
                continue;
            }

            let inverse = 1.0 / direction;
            let mut near = (low - origin) * inverse;
            let mut far = (high - origin) * inverse;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            enter = enter.max(near);
            exit = exit.min(far);
            if enter > exit {
                return None;
            }
        }

        Some(enter)
    }
}

/// Static world volume consulted when validating placement.
#[derive(Clone, Debug, PartialEq)]
pub enum Zone {
    /// Volume in which objects cannot be built.
    NoBuild {
        /// Extent of the zone.
        bounds: Aabb,
        /// Team restricted by the zone; `None` restricts every team.
        team: Option<TeamId>,
        /// Object kinds that remain buildable inside the zone.
        exempt: Vec<ObjectKind>,
    },
    /// Spawn room. Nobody builds inside it, whichever team spawns there.
    RespawnRoom {
        /// Extent of the room.
        bounds: Aabb,
    },
    /// Visual barrier of a spawn room that placement rays may not cross.
    RespawnVisualizer {
        /// Extent of the barrier.
        bounds: Aabb,
    },
    /// Solid geometry that blocks sight lines and player movement.
    Solid {
        /// Extent of the geometry.
        bounds: Aabb,
    },
}

/// Declarative description of a build point on an object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildPointSpec {
    /// Offset of the point from the object's origin before yaw is applied.
    pub offset: Vec3,
    /// Object kinds that may be built on the point.
    pub accepts: Vec<ObjectKind>,
    /// Maximum builder distance at which a ghost snaps onto the point.
    pub max_snap_distance: f32,
}

impl BuildPointSpec {
    /// Creates a new build point description.
    #[must_use]
    pub fn new(offset: Vec3, accepts: Vec<ObjectKind>, max_snap_distance: f32) -> Self {
        Self {
            offset,
            accepts,
            max_snap_distance,
        }
    }
}

/// Reasons a build commit may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum BuildError {
    /// The ghost is not at a buildable location.
    #[error("the current location is not buildable")]
    InvalidPlacement,
    /// The builder cannot pay for the object.
    #[error("not enough resources: need {cost}, have {available}")]
    InsufficientResources {
        /// Metal required to build the object.
        cost: u32,
        /// Metal held by the builder.
        available: u32,
    },
    /// The object is not a placement ghost.
    #[error("object is not being placed")]
    NotPlacing,
    /// No object with the provided identifier exists.
    #[error("object does not exist")]
    MissingObject,
}

/// Reasons an attach request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum AttachError {
    /// The child or the parent does not exist.
    #[error("object does not exist")]
    MissingObject,
    /// An object cannot be attached to itself.
    #[error("object cannot be attached to itself")]
    SelfAttachment,
    /// The parent has no build point with the requested index.
    #[error("build point does not exist")]
    InvalidPoint,
    /// The build point does not accept the child's kind.
    #[error("build point does not accept this kind of object")]
    NotAccepted,
    /// The build point already holds another object.
    #[error("build point is occupied")]
    Occupied,
    /// The child already occupies a build point.
    #[error("object is already attached")]
    AlreadyAttached,
    /// Placement ghosts only attach once construction begins.
    #[error("object is still being placed")]
    Placing,
}

/// Reasons an object leaves the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalReason {
    /// The ghost was discarded before construction began.
    PlacementCancelled,
    /// The builder could not pay for the ghost.
    InsufficientResources,
    /// The object was destroyed by damage or detonation.
    Destroyed,
    /// The builder took the object down.
    Dismantled,
    /// The object was removed because the object it was built on disappeared.
    ParentDestroyed,
    /// No build point could host the object after a layout change.
    Orphaned,
}

/// Attachment of an object onto a build point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Attachment {
    /// Object providing the build point.
    pub parent: ObjectId,
    /// Index of the build point on the parent.
    pub point: usize,
}

/// Coarse lifecycle phase of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectPhase {
    /// The object is a ghost following its builder.
    Placing,
    /// The object is under construction.
    Building,
    /// The object finished construction.
    Active,
}

/// Immutable representation of a single object's replicated state.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSnapshot {
    /// Identifier of the object.
    pub id: ObjectId,
    /// Type of the object.
    pub kind: ObjectKind,
    /// Lifecycle phase of the object.
    pub phase: ObjectPhase,
    /// Team owning the object.
    pub team: Option<TeamId>,
    /// Player that built the object, if still connected.
    pub builder: Option<PlayerId>,
    /// World position of the object.
    pub origin: Vec3,
    /// Facing of the object in degrees.
    pub yaw: f32,
    /// Replicated health, rounded up from the precise value.
    pub health: u32,
    /// Precise health including fractional construction progress.
    pub precise_health: f32,
    /// Maximum health.
    pub max_health: u32,
    /// Construction progress in the range 0.0..=1.0.
    pub percent_constructed: f32,
    /// Whether the object currently stands at a buildable location.
    pub placement_ok: bool,
    /// Whether the object is disabled.
    pub disabled: bool,
    /// Whether a hostile attachment occupies one of the object's build points.
    pub has_sapper: bool,
    /// Whether the ghost is drawn; attachment ghosts hide when nothing is in reach.
    pub visible: bool,
    /// Whether the builder may take the object down.
    pub can_be_dismantled: bool,
    /// Quarter turns requested by the builder while placing.
    pub desired_rotations: u8,
    /// Build point occupied by the object, if any.
    pub attachment: Option<Attachment>,
    /// Objects occupying this object's build points, ordered by point index.
    pub children: Vec<ObjectId>,
    /// Placement bounds relative to the origin.
    pub build_bounds: Aabb,
}

impl ObjectSnapshot {
    /// Reports whether the object is a placement ghost.
    #[must_use]
    pub fn is_placing(&self) -> bool {
        self.phase == ObjectPhase::Placing
    }

    /// Reports whether the object is under construction.
    #[must_use]
    pub fn is_building(&self) -> bool {
        self.phase == ObjectPhase::Building
    }
}

/// Read-only snapshot describing all objects in the world.
#[derive(Clone, Debug, Default)]
pub struct ObjectView {
    snapshots: Vec<ObjectSnapshot>,
}

impl ObjectView {
    /// Creates a new object view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ObjectSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured object snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &ObjectSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ObjectSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a connected player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Identifier of the player.
    pub id: PlayerId,
    /// Team the player belongs to.
    pub team: TeamId,
    /// Metal held in the player's wallet.
    pub metal: u32,
    /// Feet position of the player.
    pub origin: Vec3,
    /// Horizontal view angle in degrees.
    pub yaw: f32,
}
