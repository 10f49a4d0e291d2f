//! Session layer of the Beaty client.
//!
//! A [`SessionQueryCoordinator`] keeps at most one [`ResponseOrchestrator`]
//! current. The orchestrator turns stream events into camera moves, marker
//! updates and a typewriter reveal of the response text. Every input reaches
//! it through a single inbox, one at a time, so no two effects interleave.
//!
//! [`SessionRuntime`] drives the whole thing over tokio; tests can instead
//! feed inputs by hand with a [`ManualScheduler`] and the recorders in
//! [`harness`].

pub mod camera;
pub mod coordinator;
pub mod error;
pub mod harness;
pub mod input;
pub mod observer;
pub mod orchestrator;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod surface;
pub mod typewriter;

pub use camera::{CameraCoordinator, SettleSignal, SettleTicket};
pub use coordinator::SessionQueryCoordinator;
pub use error::SessionError;
pub use input::Input;
pub use observer::{ChannelObserver, SessionObserver};
pub use orchestrator::{ResponseOrchestrator, SessionSettings};
pub use runtime::SessionRuntime;
pub use scheduler::{ManualScheduler, Scheduler, TimerKey, TimerKind, TokioScheduler};
pub use session::ResponseSession;
pub use surface::Surface;
pub use typewriter::{TickOutcome, TypewriterEngine};
