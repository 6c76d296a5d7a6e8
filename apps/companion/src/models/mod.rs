pub mod energy;
pub mod journal;
pub mod profile;

pub use energy::{EnergyState, FULL_ENERGY};
pub use journal::{CheckIn, Feedback, JournalEntry, StoredJournalEntry};
pub use profile::Profile;
