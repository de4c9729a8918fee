//! Independent extraction strategies run by the [`SuperParser`](crate::extract::SuperParser).

pub mod binary;
pub mod fingerprint;
pub mod identity;
pub mod visual;

pub use binary::BinaryPatternStrategy;
pub use fingerprint::{Fingerprint, FingerprintCache, FingerprintStrategy};
pub use identity::IdentityStrategy;
pub use visual::VisualStrategy;
