//! Build point registry shared by parents and the objects built on them.
//!
//! A point's occupant and the occupant's `parent` link always agree. Only
//! `seat` and `unseat` write either side. [`World::attach_object_to_object`]
//! and [`World::detach_object_from_object`] wrap them and keep the parent's
//! disabled state in step; layout replacement settles it once at the end.

use glam::{Quat, Vec3};
use outpost_core::{
    AttachError, Attachment, BuildPointSpec, Event, ObjectId, ObjectKind, RemovalReason,
};
use tracing::{debug, error};

use crate::{objects::BuildableObject, World};

/// Build point owned by a parent object.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BuildPoint {
    pub(crate) offset: Vec3,
    pub(crate) accepts: Vec<ObjectKind>,
    pub(crate) max_snap_distance: f32,
    pub(crate) occupant: Option<ObjectId>,
}

impl BuildPoint {
    pub(crate) fn from_spec(spec: &BuildPointSpec) -> Self {
        Self {
            offset: spec.offset,
            accepts: spec.accepts.clone(),
            max_snap_distance: spec.max_snap_distance,
            occupant: None,
        }
    }

    pub(crate) fn accepts(&self, kind: ObjectKind) -> bool {
        self.accepts.contains(&kind)
    }

    pub(crate) fn is_free(&self) -> bool {
        self.occupant.is_none()
    }

    /// Point location for a parent standing at `origin` facing `yaw` degrees.
    pub(crate) fn world_position(&self, origin: Vec3, yaw: f32) -> Vec3 {
        origin + Quat::from_rotation_z(yaw.to_radians()) * self.offset
    }
}

/// Builds the runtime point layout from its declarative description.
pub(crate) fn layout(specs: &[BuildPointSpec]) -> Vec<BuildPoint> {
    specs.iter().map(BuildPoint::from_spec).collect()
}

impl World {
    pub(crate) fn is_hostile_kind(&self, kind: ObjectKind) -> bool {
        self.config.catalog.spec(kind).hostile
    }

    /// First child not hostile to `object`, in point order.
    pub(crate) fn first_friendly_child(&self, object: ObjectId) -> Option<ObjectId> {
        let parent = self.objects.get(object)?;
        parent.children().into_iter().find(|child| {
            self.objects
                .get(*child)
                .is_some_and(|child| !child.dying && !self.is_hostile_kind(child.kind))
        })
    }

    pub(crate) fn hostile_children(&self, object: ObjectId) -> Vec<ObjectId> {
        self.objects
            .get(object)
            .map(|parent| {
                parent
                    .children()
                    .into_iter()
                    .filter(|child| {
                        self.objects
                            .get(*child)
                            .is_some_and(|child| self.is_hostile_kind(child.kind))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Seats `child` on build point `point` of `parent`.
    pub(crate) fn attach_object_to_object(
        &mut self,
        child: ObjectId,
        parent: ObjectId,
        point: usize,
        out_events: &mut Vec<Event>,
    ) -> Result<(), AttachError> {
        if self.seat(child, parent, point, out_events)? {
            self.update_disabled_state(parent, out_events);
        }
        Ok(())
    }

    /// Vacates the build point `child` occupies. Returns `false` when it occupied none.
    pub(crate) fn detach_object_from_object(
        &mut self,
        child: ObjectId,
        out_events: &mut Vec<Event>,
    ) -> bool {
        match self.unseat(child, out_events) {
            Some((parent, true)) => {
                self.update_disabled_state(parent, out_events);
                true
            }
            Some((_, false)) => true,
            None => false,
        }
    }

    /// Links both sides of an attachment. Returns whether the child is hostile.
    fn seat(
        &mut self,
        child: ObjectId,
        parent: ObjectId,
        point: usize,
        out_events: &mut Vec<Event>,
    ) -> Result<bool, AttachError> {
        if child == parent {
            return Err(AttachError::SelfAttachment);
        }
        let child_object = self.objects.get(child).ok_or(AttachError::MissingObject)?;
        let parent_object = self.objects.get(parent).ok_or(AttachError::MissingObject)?;
        if child_object.is_placing() {
            return Err(AttachError::Placing);
        }
        if child_object.parent.is_some() {
            return Err(AttachError::AlreadyAttached);
        }
        let slot = parent_object
            .points
            .get(point)
            .ok_or(AttachError::InvalidPoint)?;
        if !slot.accepts(child_object.kind) {
            return Err(AttachError::NotAccepted);
        }
        if !slot.is_free() {
            return Err(AttachError::Occupied);
        }

        let position = slot.world_position(parent_object.origin, parent_object.yaw);
        let yaw = parent_object.yaw;
        let hostile = self.is_hostile_kind(child_object.kind);

        if let Some(parent_object) = self.objects.get_mut(parent) {
            parent_object.points[point].occupant = Some(child);
            if hostile {
                parent_object.has_sapper = true;
            }
        }
        if let Some(child_object) = self.objects.get_mut(child) {
            child_object.parent = Some(Attachment { parent, point });
            child_object.snap_target = None;
            child_object.origin = position;
            child_object.yaw = yaw;
        }

        debug!(?child, ?parent, point, "object attached");
        out_events.push(Event::ObjectAttached {
            child,
            parent,
            point,
        });
        Ok(hostile)
    }

    /// Unlinks both sides of `child`'s attachment, returning the old parent and
    /// whether the child was hostile.
    fn unseat(&mut self, child: ObjectId, out_events: &mut Vec<Event>) -> Option<(ObjectId, bool)> {
        let child_object = self.objects.get_mut(child)?;
        let Attachment { parent, point } = child_object.parent.take()?;
        let kind = child_object.kind;
        let hostile = self.is_hostile_kind(kind);

        if let Some(slot) = self
            .objects
            .get_mut(parent)
            .and_then(|parent| parent.points.get_mut(point))
        {
            if slot.occupant == Some(child) {
                slot.occupant = None;
            }
        }

        debug!(?child, ?parent, point, "object detached");
        out_events.push(Event::ObjectDetached {
            child,
            parent,
            point,
        });
        if hostile {
            self.refresh_sapper_flag(parent);
        }
        Some((parent, hostile))
    }

    fn refresh_sapper_flag(&mut self, object: ObjectId) {
        let has_sapper = !self.hostile_children(object).is_empty();
        if let Some(object) = self.objects.get_mut(object) {
            object.has_sapper = has_sapper;
        }
    }

    /// Swaps the point layout of `object` and re-seats its children.
    ///
    /// Each child moves to the first free point accepting its kind. Children
    /// with no such point are orphans and get destroyed.
    pub(crate) fn replace_build_points(
        &mut self,
        object: ObjectId,
        specs: &[BuildPointSpec],
        out_events: &mut Vec<Event>,
    ) {
        let Some(parent) = self.objects.get(object) else {
            return;
        };
        let children = parent.children();

        for child in &children {
            let _ = self.unseat(*child, out_events);
        }
        if let Some(parent) = self.objects.get_mut(object) {
            parent.points = layout(specs);
        }

        for child in children {
            let Some(kind) = self.objects.get(child).map(|child| child.kind) else {
                continue;
            };
            let seat = self
                .objects
                .get(object)
                .and_then(|parent| first_open_point(parent, kind));
            let reattached =
                seat.is_some_and(|point| self.seat(child, object, point, out_events).is_ok());
            if !reattached {
                error!(
                    ?child,
                    parent = ?object,
                    kind = kind.name(),
                    "no build point can host child after layout change"
                );
                self.destroy_object(child, RemovalReason::Orphaned, out_events);
            }
        }

        self.refresh_sapper_flag(object);
        self.update_disabled_state(object, out_events);
    }

    /// Spawns a finished `kind` onto the first open point of `parent` that accepts it.
    pub(crate) fn spawn_entity_on_build_point(
        &mut self,
        parent: ObjectId,
        kind: ObjectKind,
        out_events: &mut Vec<Event>,
    ) -> Option<ObjectId> {
        let host = self.objects.get(parent)?;
        let point = first_open_point(host, kind)?;
        let (team, builder, origin, yaw) = (host.team, host.builder, host.origin, host.yaw);

        let child = self.create_finished_object(kind, team, builder, origin, yaw, out_events);
        match self.attach_object_to_object(child, parent, point, out_events) {
            Ok(()) => Some(child),
            Err(reason) => {
                error!(?child, ?parent, %reason, "template attachment could not be seated");
                self.destroy_object(child, RemovalReason::Orphaned, out_events);
                None
            }
        }
    }
}

fn first_open_point(parent: &BuildableObject, kind: ObjectKind) -> Option<usize> {
    parent
        .points
        .iter()
        .position(|point| point.accepts(kind) && point.is_free())
}
