use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::oneshot;

use super::reply::Outcome;

pub(crate) type Deliver = Arc<dyn Fn(Outcome) + Send + Sync>;

/// One consumer of a push channel.
pub(crate) enum Member {
    /// Leaves the channel after its first delivery.
    Once(oneshot::Sender<Outcome>),
    /// Stays until removed by token.
    Keep { token: u64, deliver: Deliver },
}

/// Table entry. Non-negative ids hold a pending request, negative ids a
/// push channel.
pub(crate) enum Slot {
    Pending(oneshot::Sender<Outcome>),
    Channel(Vec<Member>),
}

/// Where one delivery goes, collected under the lock and run after it.
pub(crate) enum Target {
    Once(oneshot::Sender<Outcome>),
    Keep(Deliver),
}

impl Target {
    pub(crate) fn deliver(self, outcome: Outcome) {
        match self {
            // The waiter may have been dropped; nobody is left to tell.
            Target::Once(tx) => {
                let _ = tx.send(outcome);
            }
            Target::Keep(deliver) => deliver(outcome),
        }
    }
}

/// Deliver one outcome to every target, in order.
pub(crate) fn fan_out(targets: Vec<Target>, outcome: Outcome) {
    let mut targets = targets.into_iter().peekable();
    while let Some(target) = targets.next() {
        if targets.peek().is_some() {
            target.deliver(outcome.clone());
        } else {
            target.deliver(outcome);
            break;
        }
    }
}

#[derive(Default)]
pub(crate) struct SlotTable {
    slots: HashMap<i64, Slot>,
}

impl SlotTable {
    pub(crate) fn insert_pending(&mut self, id: i64, tx: oneshot::Sender<Outcome>) {
        self.slots.insert(id, Slot::Pending(tx));
    }

    pub(crate) fn take_pending(&mut self, id: i64) -> Option<oneshot::Sender<Outcome>> {
        match self.slots.remove(&id) {
            Some(Slot::Pending(tx)) => Some(tx),
            Some(other) => {
                self.slots.insert(id, other);
                None
            }
            None => None,
        }
    }

    pub(crate) fn join(&mut self, id: i64, member: Member) {
        match self.slots.entry(id).or_insert_with(|| Slot::Channel(Vec::new())) {
            Slot::Channel(members) => members.push(member),
            // Push ids are negative, request ids never are.
            Slot::Pending(_) => {}
        }
    }

    /// Remove the persistent member `token` from channel `id`, dropping
    /// the channel once it has no members.
    pub(crate) fn leave(&mut self, id: i64, token: u64) -> bool {
        let Some(Slot::Channel(members)) = self.slots.get_mut(&id) else {
            return false;
        };
        let before = members.len();
        members.retain(|m| !matches!(m, Member::Keep { token: t, .. } if *t == token));
        let removed = members.len() != before;
        if members.is_empty() {
            self.slots.remove(&id);
        }
        removed
    }

    /// Targets for one inbound message under `id`. Pending requests and
    /// one-shot members are consumed; persistent members stay registered.
    pub(crate) fn targets(&mut self, id: i64) -> Option<Vec<Target>> {
        match self.slots.remove(&id)? {
            Slot::Pending(tx) => Some(vec![Target::Once(tx)]),
            Slot::Channel(members) => {
                let mut targets = Vec::with_capacity(members.len());
                let mut kept = Vec::new();
                for member in members {
                    match member {
                        Member::Once(tx) => targets.push(Target::Once(tx)),
                        Member::Keep { token, deliver } => {
                            targets.push(Target::Keep(Arc::clone(&deliver)));
                            kept.push(Member::Keep { token, deliver });
                        }
                    }
                }
                if !kept.is_empty() {
                    self.slots.insert(id, Slot::Channel(kept));
                }
                Some(targets)
            }
        }
    }

    /// Remove every pending request, leaving push channels in place.
    pub(crate) fn drain_pending(&mut self) -> Vec<Target> {
        let ids: Vec<i64> = self
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.take_pending(id).map(Target::Once))
            .collect()
    }

    /// Empty the table, returning every live consumer.
    pub(crate) fn drain(&mut self) -> Vec<Target> {
        let mut targets = Vec::new();
        for (_, slot) in self.slots.drain() {
            match slot {
                Slot::Pending(tx) => targets.push(Target::Once(tx)),
                Slot::Channel(members) => {
                    targets.extend(members.into_iter().map(|m| match m {
                        Member::Once(tx) => Target::Once(tx),
                        Member::Keep { deliver, .. } => Target::Keep(deliver),
                    }))
                }
            }
        }
        targets
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
