//! Window and coordinator actors talk over unbounded channels that carry the
//! sender's span, so a request is traced under the event that caused it.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{Span, trace};

pub mod broadcast;
pub mod coordinator;
pub mod window;

pub struct Sender<Event>(UnboundedSender<(Span, Event)>);
pub type Receiver<Event> = UnboundedReceiver<(Span, Event)>;

pub fn channel<Event>() -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = unbounded_channel();
    (Sender(tx), rx)
}

impl<Event> Sender<Event> {
    /// Queues `event`. A closed channel means the receiving window is gone,
    /// which the coordinator learns about separately.
    pub fn send(&self, event: Event) {
        if self.0.send((Span::current(), event)).is_err() {
            trace!("receiver gone, dropping event");
        }
    }
}

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn sending_to_a_closed_window_is_dropped() {
        let (tx, rx) = channel::<u32>();
        let copy = tx.clone();
        tx.send(1);
        drop(rx);
        copy.send(2);
    }

    #[test]
    fn events_arrive_in_order_from_every_clone() {
        let (tx, mut rx) = channel();
        let copy = tx.clone();
        tx.send("a");
        copy.send("b");
        tx.send("c");
        let mut seen = Vec::new();
        while let Ok((_, event)) = rx.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen, ["a", "b", "c"]);
    }
}
