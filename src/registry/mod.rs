pub mod session;
mod store;
mod subscribers;

pub use session::{Participant, ParticipantRole, SessionDraft, SessionRecord, SessionStatus};
pub use store::SessionRegistry;
pub use subscribers::{SnapshotCallback, SubscriptionId};
