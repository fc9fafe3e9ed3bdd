use rand_chacha::ChaCha8Rng;

use datamask_core::{DEFAULT_LOCALE, Error, Result, Value};

use crate::faker_rs::catalog::{self, SyntheticKind};
use crate::faker_rs::locales::LocaleKey;

/// Thin adapter over the `fake` catalog: resolves hints and locales and
/// draws values.
pub struct FakeRsAdapter;

/// A hint and locale that passed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedFaker {
    pub kind: SyntheticKind,
    pub locale: LocaleKey,
}

impl FakeRsAdapter {
    pub fn list_ids() -> &'static [&'static str] {
        catalog::ALL_IDS
    }

    pub fn supports(hint: &str) -> bool {
        SyntheticKind::parse(hint).is_some()
    }

    pub fn resolve(hint: &str, locale: Option<&str>) -> Result<ResolvedFaker> {
        let kind = SyntheticKind::parse(hint).ok_or_else(|| {
            Error::Configuration(format!("unsupported synthetic type hint '{hint}'"))
        })?;

        let locale_str = locale.unwrap_or(DEFAULT_LOCALE);
        let locale = LocaleKey::parse(locale_str).ok_or_else(|| {
            Error::Configuration(format!(
                "unsupported faker locale '{}' (expected one of {})",
                locale_str,
                LocaleKey::ALL
                    .iter()
                    .map(|key| key.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;

        Ok(ResolvedFaker { kind, locale })
    }

    pub fn generate_value(resolved: ResolvedFaker, rng: &mut ChaCha8Rng) -> Value {
        catalog::generate_value(resolved.kind, resolved.locale, rng)
    }
}
