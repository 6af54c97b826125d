//! Optimistic relation toggles (follow a user, like a post).
//!
//! Each target has one [`Relation`]: the viewer's edge id if the relation
//! exists, the dependent counter (followers or likes), and a `pending`
//! flag while a call is on the wire. The flag and the counter only ever
//! change together, in one published value.
//!
//! Creation waits for the server-assigned edge id before the relation
//! turns active. Deletion flips immediately and is rolled back if the
//! server refuses. Only one call per target is in flight at a time.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use shortsns_api::{ApiError, EdgeId, UserId};
use tracing::{debug, warn};

use crate::store::StateStore;

/// Id of the thing being followed or liked.
pub type TargetId = u64;

/// Edge calls for one relation kind.
#[async_trait]
pub trait EdgeApi: Send + Sync {
    /// First segment of the store path, e.g. `follow`.
    const KIND: &'static str;

    async fn create(&self, target: TargetId, token: &str) -> Result<EdgeId, ApiError>;

    async fn delete(&self, edge: EdgeId, token: &str) -> Result<(), ApiError>;

    /// The viewer's existing edge to `target`.
    async fn find(&self, viewer: UserId, target: TargetId) -> Result<Option<EdgeId>, ApiError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relation {
    /// Present exactly when the relation exists.
    pub edge: Option<EdgeId>,
    pub count: u64,
    pub pending: bool,
}

impl Relation {
    pub fn is_active(&self) -> bool {
        self.edge.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    #[error("sign in first")]
    NoSession,

    #[error("a change for {target} is already in flight")]
    InFlight { target: TargetId },

    #[error("relation to {target} is not loaded")]
    Untracked { target: TargetId },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ToggleError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ToggleError::Api(e) if e.is_unauthorized())
    }
}

#[derive(Default)]
struct Slots {
    relations: HashMap<TargetId, Relation>,
    in_flight: HashSet<TargetId>,
    /// Bumped by `forget_all`. Calls opened under an older session settle
    /// without touching state.
    session: u64,
}

pub struct ToggleController<E> {
    edges: E,
    store: Arc<StateStore>,
    slots: Mutex<Slots>,
}

impl<E: EdgeApi> ToggleController<E> {
    pub fn new(edges: E, store: Arc<StateStore>) -> Self {
        Self { edges, store, slots: Mutex::new(Slots::default()) }
    }

    pub fn edges(&self) -> &E {
        &self.edges
    }

    /// Store path of `target`'s relation, e.g. `like/12`.
    pub fn path(target: TargetId) -> String {
        format!("{}/{}", E::KIND, target)
    }

    pub fn relation(&self, target: TargetId) -> Option<Relation> {
        self.lock().relations.get(&target).copied()
    }

    pub fn is_in_flight(&self, target: TargetId) -> bool {
        self.lock().in_flight.contains(&target)
    }

    /// Seed the relation from data the caller already has. A target with
    /// a call in flight keeps its local state.
    pub fn track(&self, target: TargetId, edge: Option<EdgeId>, count: u64) -> Relation {
        let relation = {
            let mut slots = self.lock();
            if slots.in_flight.contains(&target) {
                if let Some(current) = slots.relations.get(&target) {
                    return *current;
                }
            }
            let relation = Relation { edge, count, pending: false };
            slots.relations.insert(target, relation);
            relation
        };
        self.publish(target, relation);
        relation
    }

    /// Seed the relation by asking the server for the viewer's edge.
    pub async fn sync(&self, target: TargetId, viewer: UserId, count: u64) -> Result<Relation, ToggleError> {
        let edge = self.edges.find(viewer, target).await?;
        Ok(self.track(target, edge, count))
    }

    /// Drop all relations, e.g. after the viewer changed. Calls still on
    /// the wire finish without writing their outcome back.
    pub fn forget_all(&self) {
        {
            let mut slots = self.lock();
            slots.session += 1;
            slots.relations.clear();
            slots.in_flight.clear();
        }
        self.store.remove_prefix(E::KIND);
    }

    /// Flip the relation to `target`.
    ///
    /// Refused locally, without a call, when there is no token, when a
    /// call for `target` is still open, or when the relation was never
    /// tracked. On failure the relation is back to its value before the
    /// call and the error is returned.
    pub async fn toggle(&self, target: TargetId, token: Option<&str>) -> Result<Relation, ToggleError> {
        let token = token.ok_or(ToggleError::NoSession)?;

        let (before, during, session) = {
            let mut slots = self.lock();
            if slots.in_flight.contains(&target) {
                return Err(ToggleError::InFlight { target });
            }
            let before = *slots.relations.get(&target).ok_or(ToggleError::Untracked { target })?;
            let during = match before.edge {
                Some(_) => Relation { edge: None, count: before.count.saturating_sub(1), pending: true },
                None => Relation { pending: true, ..before },
            };
            slots.in_flight.insert(target);
            slots.relations.insert(target, during);
            (before, during, slots.session)
        };
        let mut call = Call { controller: self, target, session, rollback: Some(before) };
        self.publish(target, during);

        let settled = match before.edge {
            Some(edge) => {
                debug!(kind = E::KIND, id = target, edge, "deleting edge");
                self.edges
                    .delete(edge, token)
                    .await
                    .map(|()| Relation { pending: false, ..during })
            }
            None => {
                debug!(kind = E::KIND, id = target, "creating edge");
                self.edges
                    .create(target, token)
                    .await
                    .map(|edge| Relation { edge: Some(edge), count: before.count + 1, pending: false })
            }
        };

        match settled {
            Ok(after) => {
                call.settle(after);
                Ok(after)
            }
            Err(e) => {
                warn!(kind = E::KIND, id = target, error = %e, "toggle rejected, rolling back");
                call.settle(before);
                Err(e.into())
            }
        }
    }

    fn commit(&self, session: u64, target: TargetId, relation: Relation) {
        {
            let mut slots = self.lock();
            if slots.session != session {
                debug!(kind = E::KIND, id = target, "viewer changed, dropping outcome");
                return;
            }
            slots.relations.insert(target, relation);
            slots.in_flight.remove(&target);
        }
        self.publish(target, relation);
    }

    fn publish(&self, target: TargetId, relation: Relation) {
        self.store.set(&Self::path(target), relation);
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One open toggle. Settling commits the final relation and releases the
/// target; dropping it unsettled (the caller's future was cancelled)
/// restores the relation from before the call.
struct Call<'a, E: EdgeApi> {
    controller: &'a ToggleController<E>,
    target: TargetId,
    session: u64,
    rollback: Option<Relation>,
}

impl<E: EdgeApi> Call<'_, E> {
    fn settle(&mut self, relation: Relation) {
        self.rollback = None;
        self.controller.commit(self.session, self.target, relation);
    }
}

impl<E: EdgeApi> Drop for Call<'_, E> {
    fn drop(&mut self) {
        if let Some(before) = self.rollback.take() {
            warn!(kind = E::KIND, id = self.target, "toggle abandoned, rolling back");
            self.controller.commit(self.session, self.target, before);
        }
    }
}
