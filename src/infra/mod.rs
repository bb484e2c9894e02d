//! External collaborators: the game-data API client and the snapshot store.

pub mod blizzard;
pub mod snapshot;

pub use blizzard::BlizzardClient;
pub use snapshot::{Collection, Snapshot, SnapshotStore};
