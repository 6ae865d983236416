pub mod publication;
pub mod record;
pub mod source;

pub use publication::{ListedPublication, MatchTarget};
pub use record::{CanonicalRecord, EntryType, Field};
pub use source::{SourceTag, TrustOrder, TrustRank};
