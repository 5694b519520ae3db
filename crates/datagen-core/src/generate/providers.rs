//! # Faker Provider Dispatch
//!
//! Maps a `faker` generator's `method` string to a concrete `fake` crate
//! provider. The method names are a fixed whitelist, not an arbitrary
//! passthrough to `fake`'s full surface — every supported name is listed in
//! [`generate`]'s match arms, and an unrecognized name is a `BadSpec` error
//! caught during planning rather than at generation time.
//!
//! Locale resolution follows the [`LocaleTable`] trait rather than a
//! hardcoded match: locale data belongs outside the core, consistent with
//! every other reference-data concern here. Only the `name`-family methods
//! vary by locale (`fake`'s address/company/lorem/internet providers don't
//! ship locale variants); every other method ignores the resolved locale.

use fake::faker::address::en::{CityName, CountryName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{FreeEmail, SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName as FirstNameEn, LastName as LastNameEn, Name as NameEn};
use fake::faker::name::fr_fr::{FirstName as FirstNameFrFr, LastName as LastNameFrFr, Name as NameFrFr};
use fake::faker::name::ja_jp::{FirstName as FirstNameJaJp, LastName as LastNameJaJp, Name as NameJaJp};
use fake::faker::name::zh_tw::{FirstName as FirstNameZhTw, LastName as LastNameZhTw, Name as NameZhTw};
use fake::faker::phone_number::en::PhoneNumber;
use fake::uuid::UUIDv4;
use fake::Fake;
use rand::Rng;
use uuid::Uuid;

use crate::error::{DatagenError, GeneratorErrorKind, Result};
use crate::generate::value::Value;

/// Resolves a locale tag (ISO country code, e.g. "US", "FR") to a `fake`
/// locale identifier (e.g. `"fr_fr"`). The default no-op implementation
/// means every column is English-locale unless an embedder supplies a
/// `LocaleTable` with real country-code coverage, or uses
/// [`DefaultLocaleTable`]'s small built-in table.
pub trait LocaleTable: Send + Sync {
    fn resolve(&self, _country_code: &str) -> Option<&str> {
        None
    }
}

/// A small built-in country-code table covering the locales this module
/// has a real `fake` provider for. Extend or replace with a fuller table by
/// implementing `LocaleTable` directly.
#[derive(Default)]
pub struct DefaultLocaleTable;

impl LocaleTable for DefaultLocaleTable {
    fn resolve(&self, country_code: &str) -> Option<&str> {
        match country_code.to_ascii_uppercase().as_str() {
            "FR" => Some("fr_fr"),
            "JP" => Some("ja_jp"),
            "TW" | "CN" | "HK" => Some("zh_tw"),
            _ => None,
        }
    }
}

fn unknown_method(method: &str) -> DatagenError {
    DatagenError::Generator {
        node: String::new(),
        column: String::new(),
        kind: GeneratorErrorKind::BadSpec,
        detail: format!("unknown faker method '{method}'"),
    }
}

fn localized_name(locale: Option<&str>, rng: &mut impl Rng) -> String {
    match locale {
        Some("fr_fr") => NameFrFr().fake_with_rng(rng),
        Some("ja_jp") => NameJaJp().fake_with_rng(rng),
        Some("zh_tw") => NameZhTw().fake_with_rng(rng),
        _ => NameEn().fake_with_rng(rng),
    }
}

fn localized_first_name(locale: Option<&str>, rng: &mut impl Rng) -> String {
    match locale {
        Some("fr_fr") => FirstNameFrFr().fake_with_rng(rng),
        Some("ja_jp") => FirstNameJaJp().fake_with_rng(rng),
        Some("zh_tw") => FirstNameZhTw().fake_with_rng(rng),
        _ => FirstNameEn().fake_with_rng(rng),
    }
}

fn localized_last_name(locale: Option<&str>, rng: &mut impl Rng) -> String {
    match locale {
        Some("fr_fr") => LastNameFrFr().fake_with_rng(rng),
        Some("ja_jp") => LastNameJaJp().fake_with_rng(rng),
        Some("zh_tw") => LastNameZhTw().fake_with_rng(rng),
        _ => LastNameEn().fake_with_rng(rng),
    }
}

/// Generate a single value for the named faker method. `locale`, when
/// given, is an already-resolved `fake` locale tag (e.g. `"fr_fr"`, from
/// [`LocaleTable::resolve`]), not a raw country code.
pub fn generate(method: &str, locale: Option<&str>, rng: &mut impl Rng) -> Result<Value> {
    let value = match method {
        "name" => Value::owned(localized_name(locale, rng)),
        "first_name" => Value::owned(localized_first_name(locale, rng)),
        "last_name" => Value::owned(localized_last_name(locale, rng)),
        "free_email" => Value::owned(FreeEmail().fake_with_rng::<String, _>(rng)),
        "safe_email" => Value::owned(SafeEmail().fake_with_rng::<String, _>(rng)),
        "username" => Value::owned(Username().fake_with_rng::<String, _>(rng)),
        "phone_number" => Value::owned(PhoneNumber().fake_with_rng::<String, _>(rng)),
        "city" => Value::owned(CityName().fake_with_rng::<String, _>(rng)),
        "street_address" => Value::owned(StreetName().fake_with_rng::<String, _>(rng)),
        "zip_code" => Value::owned(ZipCode().fake_with_rng::<String, _>(rng)),
        "country" => Value::owned(CountryName().fake_with_rng::<String, _>(rng)),
        "company" => Value::owned(CompanyName().fake_with_rng::<String, _>(rng)),
        "word" => Value::owned(Word().fake_with_rng::<String, _>(rng)),
        "sentence" => Value::owned(Sentence(5..15).fake_with_rng::<String, _>(rng)),
        "paragraph" => Value::owned(Paragraph(2..5).fake_with_rng::<String, _>(rng)),
        "uuid" => Value::Uuid(UUIDv4.fake_with_rng::<Uuid, _>(rng)),
        other => return Err(unknown_method(other)),
    };
    Ok(value)
}
