//! Coordinator link: the typed message stream between this worker and the
//! master, plus the TCP adapter that carries it.

mod io;
mod link;
mod protocol;
mod tcp;


pub use link::{CoordinatorReceiver, CoordinatorSender, TransportEnd, link};
pub use protocol::{CoordinatorCommand, HatchMessage, StatsMessage, WorkerMessage};
pub use tcp::{attach, connect};
