mod adapter;
pub mod catalog;
pub mod locales;

pub use adapter::{FakeRsAdapter, ResolvedFaker};
pub use catalog::SyntheticKind;
pub use locales::LocaleKey;
