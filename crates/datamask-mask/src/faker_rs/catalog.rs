use chrono::{Duration, NaiveDate};
use fake::Fake;
use fake::faker::address::raw::{
    BuildingNumber, CityName, CountryName, PostCode, StateName, StreetName,
};
use fake::faker::company::raw::CompanyName;
use fake::faker::creditcard::raw::CreditCardNumber;
use fake::faker::internet::raw::{FreeEmail, IPv4, SafeEmail, Username};
use fake::faker::job::raw::Title as JobTitle;
use fake::faker::lorem::raw::{Paragraph, Sentence, Word};
use fake::faker::name::raw::{FirstName, LastName, Name};
use fake::faker::impls::address::CityNameGenFn;
use fake::faker::phone_number::raw::PhoneNumber;
use fake::locales::{EN, FR_FR, PT_BR};
use rand::{Rng, RngCore};
use rand_chacha::ChaCha8Rng;

use datamask_core::Value;

use crate::faker_rs::locales::LocaleKey;

/// Synthetic value kinds backed by the `fake` crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticKind {
    FirstName,
    LastName,
    FullName,
    SafeEmail,
    FreeEmail,
    Username,
    PhoneNumber,
    StreetAddress,
    StreetName,
    BuildingNumber,
    City,
    State,
    Country,
    PostCode,
    Company,
    JobTitle,
    Ipv4,
    CreditCard,
    Word,
    Sentence,
    Paragraph,
    Uuid,
    DateOfBirth,
}

/// Canonical hint ids, sorted.
pub const ALL_IDS: &[&str] = &[
    "building_number",
    "city",
    "company",
    "country",
    "credit_card",
    "date_of_birth",
    "email",
    "first_name",
    "free_email",
    "full_name",
    "ipv4",
    "job_title",
    "last_name",
    "paragraph",
    "phone_number",
    "postcode",
    "sentence",
    "state",
    "street_address",
    "street_name",
    "username",
    "uuid",
    "word",
];

impl SyntheticKind {
    /// Resolve a type hint, accepting a few common aliases.
    pub fn parse(hint: &str) -> Option<Self> {
        let kind = match normalize_hint(hint).as_str() {
            "first_name" | "given_name" => Self::FirstName,
            "last_name" | "surname" | "family_name" => Self::LastName,
            "full_name" | "name" => Self::FullName,
            "email" | "safe_email" => Self::SafeEmail,
            "free_email" => Self::FreeEmail,
            "username" | "user_name" => Self::Username,
            "phone_number" | "phone" => Self::PhoneNumber,
            "street_address" | "address" | "full_address" => Self::StreetAddress,
            "street_name" | "street" => Self::StreetName,
            "building_number" => Self::BuildingNumber,
            "city" => Self::City,
            "state" => Self::State,
            "country" => Self::Country,
            "postcode" | "zip_code" | "zip" | "post_code" => Self::PostCode,
            "company" | "company_name" => Self::Company,
            "job_title" => Self::JobTitle,
            "ipv4" | "ip_address" => Self::Ipv4,
            "credit_card" | "credit_card_number" => Self::CreditCard,
            "word" => Self::Word,
            "sentence" | "lorem" => Self::Sentence,
            "paragraph" | "rant" => Self::Paragraph,
            "uuid" | "guid" => Self::Uuid,
            "date_of_birth" | "birth_date" | "dob" => Self::DateOfBirth,
            _ => return None,
        };
        Some(kind)
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::FullName => "full_name",
            Self::SafeEmail => "email",
            Self::FreeEmail => "free_email",
            Self::Username => "username",
            Self::PhoneNumber => "phone_number",
            Self::StreetAddress => "street_address",
            Self::StreetName => "street_name",
            Self::BuildingNumber => "building_number",
            Self::City => "city",
            Self::State => "state",
            Self::Country => "country",
            Self::PostCode => "postcode",
            Self::Company => "company",
            Self::JobTitle => "job_title",
            Self::Ipv4 => "ipv4",
            Self::CreditCard => "credit_card",
            Self::Word => "word",
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
            Self::Uuid => "uuid",
            Self::DateOfBirth => "date_of_birth",
        }
    }
}

/// Lowercase and fold spaces/hyphens into underscores ("Full Name" -> "full_name").
pub fn normalize_hint(hint: &str) -> String {
    hint.trim()
        .chars()
        .map(|ch| match ch {
            ' ' | '-' | '.' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

pub fn generate_value(kind: SyntheticKind, locale: LocaleKey, rng: &mut ChaCha8Rng) -> Value {
    match locale {
        LocaleKey::EnUs => generate_with(kind, EN, rng),
        LocaleKey::PtBr => generate_with(kind, PT_BR, rng),
        LocaleKey::FrFr => generate_with(kind, FR_FR, rng),
    }
}

fn generate_with<L: CityNameGenFn>(kind: SyntheticKind, l: L, rng: &mut ChaCha8Rng) -> Value {
    let text: String = match kind {
        SyntheticKind::FirstName => FirstName(l).fake_with_rng(rng),
        SyntheticKind::LastName => LastName(l).fake_with_rng(rng),
        SyntheticKind::FullName => Name(l).fake_with_rng(rng),
        SyntheticKind::SafeEmail => SafeEmail(l).fake_with_rng(rng),
        SyntheticKind::FreeEmail => FreeEmail(l).fake_with_rng(rng),
        SyntheticKind::Username => Username(l).fake_with_rng(rng),
        SyntheticKind::PhoneNumber => PhoneNumber(l).fake_with_rng(rng),
        SyntheticKind::StreetAddress => {
            let number: String = BuildingNumber(l).fake_with_rng(rng);
            let street: String = StreetName(l).fake_with_rng(rng);
            format!("{number} {street}")
        }
        SyntheticKind::StreetName => StreetName(l).fake_with_rng(rng),
        SyntheticKind::BuildingNumber => BuildingNumber(l).fake_with_rng(rng),
        SyntheticKind::City => CityName(l).fake_with_rng(rng),
        SyntheticKind::State => StateName(l).fake_with_rng(rng),
        SyntheticKind::Country => CountryName(l).fake_with_rng(rng),
        SyntheticKind::PostCode => PostCode(l).fake_with_rng(rng),
        SyntheticKind::Company => CompanyName(l).fake_with_rng(rng),
        SyntheticKind::JobTitle => JobTitle(l).fake_with_rng(rng),
        SyntheticKind::Ipv4 => IPv4(l).fake_with_rng(rng),
        SyntheticKind::CreditCard => CreditCardNumber(l).fake_with_rng(rng),
        SyntheticKind::Word => Word(l).fake_with_rng(rng),
        SyntheticKind::Sentence => Sentence(l, 4..10).fake_with_rng(rng),
        SyntheticKind::Paragraph => Paragraph(l, 2..5).fake_with_rng(rng),
        SyntheticKind::Uuid => return Value::Uuid(random_uuid(rng)),
        SyntheticKind::DateOfBirth => return Value::Date(random_birth_date(rng)),
    };
    Value::Text(text)
}

fn random_uuid(rng: &mut ChaCha8Rng) -> String {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

// Ages between 18 and 90 relative to a fixed date, so seeded runs reproduce.
fn random_birth_date(rng: &mut ChaCha8Rng) -> NaiveDate {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let days = rng.random_range(18 * 365..=90 * 365);
    base - Duration::days(days)
}
