pub mod error;
pub mod types;

pub use error::{Result, RuntimeError};
pub use types::{
    ContentObjectId, CreditMode, DataModel, DialectKind, EnrollmentId, EntryMode, LaunchContext,
    LaunchMode, LearnerId, PackageId, SessionKey,
};
