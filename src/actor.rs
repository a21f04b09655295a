//! Typed channels between the daemon's actors.
//!
//! Every message travels with the span it was sent from, so handling it shows
//! up under the sender's trace.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::Span;

pub mod broadcast;
pub mod config_watcher;
pub mod pressure_barrier;
pub mod reactor;

pub struct Sender<Event>(UnboundedSender<(Span, Event)>);

pub struct Receiver<Event>(UnboundedReceiver<(Span, Event)>);

pub fn channel<Event>() -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = unbounded_channel();
    (Sender(tx), Receiver(rx))
}

impl<Event> Sender<Event> {
    /// Sends `event`, dropping it if the receiving actor has shut down.
    pub fn send(&self, event: Event) { _ = self.try_send(event) }

    /// Hands the event back if the receiving actor has shut down.
    pub fn try_send(&self, event: Event) -> Result<(), Event> {
        self.0.send((Span::current(), event)).map_err(|e| e.0.1)
    }

    pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<Event> Receiver<Event> {
    pub async fn recv(&mut self) -> Option<(Span, Event)> { self.0.recv().await }

    pub fn try_recv(&mut self) -> Option<(Span, Event)> { self.0.try_recv().ok() }

    /// Everything queued right now, without the spans.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).map(|(_, event)| event).collect()
    }
}

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Event> std::fmt::Debug for Sender<Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("actor::Sender(...)")
    }
}
