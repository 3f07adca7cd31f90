use chrono::NaiveDate;

use crate::raw::{CollectionRef, KeywordList, NameList, RawMovie, Scalar};
use crate::record::MovieRecord;

use super::flatten::join_names;
use super::Draft;

/// Text values that stand in for "unknown" in free-text fields.
const PLACEHOLDERS: &[&str] = &["No Data", "No Overview", "n/a", "nan"];

/// The number of raw currency units in one MUSD.
const MILLION: f64 = 1_000_000.0;

/// Cast every field of a flattened raw movie to its canonical type.
///
/// Raw money is converted to millions, zero money and zero runtimes become
/// unknown, dates are parsed and placeholder text in free-text fields is
/// nulled. Values that are already in canonical form (as produced by a
/// previous normalization) pass through unchanged.
pub(super) fn coerce(raw: RawMovie) -> Draft {
    let movie = MovieRecord {
        tagline: without_placeholder(raw.tagline),
        overview: without_placeholder(raw.overview),
        original_language: raw.original_language,
        release_date: raw.release_date.as_deref().and_then(parse_date),
        budget_musd: musd(raw.budget.as_ref(), raw.budget_musd.as_ref()),
        revenue_musd: musd(raw.revenue.as_ref(), raw.revenue_musd.as_ref()),
        runtime: raw
            .runtime
            .as_ref()
            .and_then(Scalar::to_i64)
            .filter(|&n| n != 0),
        vote_count: raw.vote_count.as_ref().and_then(Scalar::to_i64),
        vote_average: raw.vote_average.as_ref().and_then(Scalar::to_f64),
        popularity: raw.popularity.as_ref().and_then(Scalar::to_f64),
        collection_name: match raw.belongs_to_collection {
            Some(CollectionRef::Name(name)) => Some(name),
            Some(CollectionRef::Object(named)) => named.name,
            None => raw.collection_name,
        },
        genres: joined(raw.genres),
        production_companies: joined(raw.production_companies),
        production_countries: joined(raw.production_countries),
        spoken_languages: joined(raw.spoken_languages),
        keywords: match raw.keywords {
            Some(KeywordList::Joined(s)) => Some(s),
            Some(KeywordList::Items(items)) => join_names(&items),
            Some(KeywordList::Wrapped { keywords }) => {
                keywords.and_then(|items| join_names(&items))
            }
            None => None,
        },
        cast: raw.cast,
        cast_size: size(raw.cast_size.as_ref()),
        director: raw.director,
        crew_size: size(raw.crew_size.as_ref()),
        release_year: raw
            .release_year
            .as_ref()
            .and_then(Scalar::to_i64)
            .and_then(|y| i32::try_from(y).ok()),
        ..MovieRecord::default()
    };
    Draft {
        id: raw.id.as_ref().and_then(Scalar::to_i64),
        title: raw.title,
        status: raw.status,
        credits: raw.credits,
        movie,
    }
}

fn without_placeholder(text: Option<String>) -> Option<String> {
    text.filter(|t| !PLACEHOLDERS.contains(&t.trim()))
}

fn joined(list: Option<NameList>) -> Option<String> {
    match list? {
        NameList::Joined(s) => Some(s),
        NameList::Items(items) => join_names(&items),
    }
}

fn size(n: Option<&Scalar>) -> i64 {
    n.and_then(Scalar::to_i64).unwrap_or(0)
}

/// Convert money to MUSD, preferring the raw amount over an amount that is
/// already in millions. Zero means unknown.
fn musd(raw: Option<&Scalar>, millions: Option<&Scalar>) -> Option<f64> {
    match raw.and_then(Scalar::to_i64) {
        Some(0) => None,
        Some(n) => Some(n as f64 / MILLION),
        None => millions.and_then(Scalar::to_f64).filter(|&n| n != 0.0),
    }
}

/// Parse a `YYYY-MM-DD` date. Anything after the date itself, such as a
/// time of day, is ignored.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
