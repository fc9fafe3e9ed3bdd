use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocaleKey {
    EnUs,
    PtBr,
    FrFr,
}

impl LocaleKey {
    pub const ALL: &'static [LocaleKey] = &[LocaleKey::EnUs, LocaleKey::PtBr, LocaleKey::FrFr];

    /// Accepts `en_US` as well as `en-US` and any letter case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().replace('-', "_").to_ascii_lowercase().as_str() {
            "en_us" | "en" => Some(Self::EnUs),
            "pt_br" => Some(Self::PtBr),
            "fr_fr" | "fr" => Some(Self::FrFr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en_US",
            Self::PtBr => "pt_BR",
            Self::FrFr => "fr_FR",
        }
    }
}

impl fmt::Display for LocaleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locale_spellings() {
        assert_eq!(LocaleKey::parse("pt_BR"), Some(LocaleKey::PtBr));
        assert_eq!(LocaleKey::parse("en-us"), Some(LocaleKey::EnUs));
        assert_eq!(LocaleKey::parse("xx_YY"), None);
    }
}
