pub mod delimiter;
pub mod length_prefixed;
pub mod mti;

pub use delimiter::{DelimiterDatagramFraming, DelimiterFraming};
pub use length_prefixed::{LengthPrefixedDatagramFraming, LengthPrefixedFraming};
pub use mti::{MtiDatagramFraming, MtiFraming};
