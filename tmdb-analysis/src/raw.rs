use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};

/// A raw movie document, exactly as it was parsed from JSON.
///
/// This is a JSON object whose nested structure has not been interpreted
/// yet. The top-level keys are what determine which canonical columns a
/// collection ends up with.
pub type RawDocument = Map<String, JsonValue>;

/// Parse one JSON text into zero or more raw documents.
///
/// A text may contain a single object (which may span many lines) or an
/// array of objects. Array elements that are not objects are skipped with a
/// warning. Any other top-level value is an error.
pub fn parse_documents(text: &str) -> Result<Vec<RawDocument>> {
    let value: JsonValue =
        serde_json::from_str(text).map_err(|e| Error::json(e.to_string()))?;
    match value {
        JsonValue::Object(doc) => Ok(vec![doc]),
        JsonValue::Array(items) => {
            let mut docs = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    JsonValue::Object(doc) => docs.push(doc),
                    other => {
                        log::warn!("skipping non-object document: {}", other)
                    }
                }
            }
            Ok(docs)
        }
        other => Err(Error::json(format!(
            "expected a JSON object or array of objects, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match *value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// The typed view of a raw document.
///
/// Every field is optional and every nested shape is accepted leniently, so
/// that the only documents rejected here are ones whose structure is
/// genuinely unusable. Canonical field names are accepted alongside the
/// TMDB names, which lets normalized output be fed back in.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct RawMovie {
    #[serde(default)]
    pub id: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tagline: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub original_language: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub release_year: Option<Scalar>,
    #[serde(default)]
    pub budget: Option<Scalar>,
    #[serde(default)]
    pub revenue: Option<Scalar>,
    #[serde(default)]
    pub budget_musd: Option<Scalar>,
    #[serde(default)]
    pub revenue_musd: Option<Scalar>,
    #[serde(default)]
    pub runtime: Option<Scalar>,
    #[serde(default)]
    pub vote_count: Option<Scalar>,
    #[serde(default)]
    pub vote_average: Option<Scalar>,
    #[serde(default)]
    pub popularity: Option<Scalar>,
    #[serde(default)]
    pub belongs_to_collection: Option<CollectionRef>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub genres: Option<NameList>,
    #[serde(default)]
    pub production_companies: Option<NameList>,
    #[serde(default)]
    pub production_countries: Option<NameList>,
    #[serde(default)]
    pub spoken_languages: Option<NameList>,
    #[serde(default)]
    pub keywords: Option<KeywordList>,
    #[serde(default)]
    pub credits: Option<Credits>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cast: Option<String>,
    #[serde(default)]
    pub cast_size: Option<Scalar>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub director: Option<String>,
    #[serde(default)]
    pub crew_size: Option<Scalar>,
}

impl RawMovie {
    /// Interpret a raw document. Unknown keys are ignored.
    pub fn from_document(doc: RawDocument) -> Result<RawMovie> {
        serde_json::from_value(JsonValue::Object(doc))
            .map_err(|e| Error::json(e.to_string()))
    }
}

/// A scalar value whose numeric type has not been decided yet.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    /// Cast this scalar to a 64-bit integer. Fractional values are truncated
    /// and anything that isn't a number becomes `None`.
    pub fn to_i64(&self) -> Option<i64> {
        match *self {
            Scalar::Int(n) => Some(n),
            Scalar::Float(n) if n.is_finite() => Some(n.trunc() as i64),
            Scalar::Float(_) => None,
            Scalar::Bool(b) => Some(b as i64),
            Scalar::Text(ref s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|n| n.is_finite())
                        .map(|n| n.trunc() as i64)
                })
            }
        }
    }

    /// Cast this scalar to a 64-bit float. Anything that isn't a finite
    /// number becomes `None`.
    pub fn to_f64(&self) -> Option<f64> {
        let n = match *self {
            Scalar::Int(n) => n as f64,
            Scalar::Float(n) => n,
            Scalar::Bool(b) => b as i64 as f64,
            Scalar::Text(ref s) => s.trim().parse::<f64>().ok()?,
        };
        if n.is_finite() {
            Some(n)
        } else {
            None
        }
    }
}

/// Anything that carries a display name.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub(crate) struct Named {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

/// The `belongs_to_collection` field: either the TMDB object, or a bare name.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum CollectionRef {
    Object(Named),
    Name(String),
}

/// A list of named things (genres, companies, countries, languages), either
/// as the TMDB array of objects or as an already joined string.
///
/// A `null` element keeps its slot in the array but carries no name.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum NameList {
    Items(Vec<Option<Named>>),
    Joined(String),
}

/// Keywords, which TMDB wraps in an extra object.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum KeywordList {
    Items(Vec<Option<Named>>),
    Wrapped {
        #[serde(default)]
        keywords: Option<Vec<Option<Named>>>,
    },
    Joined(String),
}

/// The credits object, containing the cast and crew in billing order.
///
/// `null` entries are kept so that the sizes reflect the arrays as given.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub(crate) struct Credits {
    #[serde(default)]
    pub cast: Option<Vec<Option<Named>>>,
    #[serde(default)]
    pub crew: Option<Vec<Option<CrewMember>>>,
}

/// A single crew entry.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub(crate) struct CrewMember {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub job: Option<String>,
}

/// Deserialize an optional string, accepting numbers and booleans by
/// converting them to their textual representation.
fn lenient_text<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a string, number, boolean or null")
        }

        fn visit_unit<E: de::Error>(
            self,
        ) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(
            self,
        ) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(
            self,
            de: D2,
        ) -> std::result::Result<Self::Value, D2::Error> {
            de.deserialize_any(TextVisitor)
        }

        fn visit_str<E: de::Error>(
            self,
            s: &str,
        ) -> std::result::Result<Self::Value, E> {
            Ok(Some(s.to_string()))
        }

        fn visit_string<E: de::Error>(
            self,
            s: String,
        ) -> std::result::Result<Self::Value, E> {
            Ok(Some(s))
        }

        fn visit_i64<E: de::Error>(
            self,
            n: i64,
        ) -> std::result::Result<Self::Value, E> {
            Ok(Some(n.to_string()))
        }

        fn visit_u64<E: de::Error>(
            self,
            n: u64,
        ) -> std::result::Result<Self::Value, E> {
            Ok(Some(n.to_string()))
        }

        fn visit_f64<E: de::Error>(
            self,
            n: f64,
        ) -> std::result::Result<Self::Value, E> {
            Ok(Some(n.to_string()))
        }

        fn visit_bool<E: de::Error>(
            self,
            b: bool,
        ) -> std::result::Result<Self::Value, E> {
            Ok(Some(b.to_string()))
        }
    }

    de.deserialize_any(TextVisitor)
}
