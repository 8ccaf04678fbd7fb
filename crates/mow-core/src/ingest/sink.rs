//! The capability that receives finished units.
//!
//! A sink is owned by exactly one read loop and called sequentially, so it
//! takes `&mut self` and needs no locking.  It must be quick: the read loop
//! does not read the next message until `deliver` returns.

use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::Unit;

/// Receives every unit a session produces, in arrival order.
pub trait PayloadSink: Send {
    fn deliver(&mut self, unit: Unit);
}

impl<S: PayloadSink + ?Sized> PayloadSink for &mut S {
    fn deliver(&mut self, unit: Unit) {
        (**self).deliver(unit);
    }
}

impl<S: PayloadSink + ?Sized> PayloadSink for Box<S> {
    fn deliver(&mut self, unit: Unit) {
        (**self).deliver(unit);
    }
}

/// Collects units in memory.
impl PayloadSink for Vec<Unit> {
    fn deliver(&mut self, unit: Unit) {
        self.push(unit);
    }
}

/// Forwards units to another task.  Units delivered after the receiver is
/// gone are discarded.
impl PayloadSink for mpsc::UnboundedSender<Unit> {
    fn deliver(&mut self, unit: Unit) {
        if self.send(unit).is_err() {
            debug!("unit receiver dropped; discarding unit");
        }
    }
}

/// Adapts a closure into a [`PayloadSink`].
pub struct FnSink<F>(pub F);

impl<F: FnMut(Unit) + Send> PayloadSink for FnSink<F> {
    fn deliver(&mut self, unit: Unit) {
        (self.0)(unit);
    }
}
