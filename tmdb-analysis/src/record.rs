use std::cmp;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

use crate::error::Error;

/// The delimiter used to join list-valued fields (genres, cast, companies and
/// so on) into a single string.
pub const DELIMITER: &str = "|";

/// A canonical movie record.
///
/// This is the unit produced by ingestion and consumed by every query. Every
/// field of the canonical schema exists on every record; a field that is not
/// known for a particular movie is `None`. Whether a field exists for the
/// collection as a whole is tracked separately by
/// [`MovieCollection::columns`](struct.MovieCollection.html#method.columns).
///
/// List-valued fields are stored joined by `|`, which is also how they are
/// handed to external sinks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieRecord {
    /// The unique TMDB identifier of this movie.
    pub id: i64,
    /// The title of this movie.
    pub title: String,
    /// A short tagline.
    pub tagline: Option<String>,
    /// The release date.
    pub release_date: Option<NaiveDate>,
    /// Genre names, sorted alphabetically and joined by `|`.
    pub genres: Option<String>,
    /// The name of the franchise (collection) this movie belongs to.
    pub collection_name: Option<String>,
    /// The ISO 639-1 code of the original language.
    pub original_language: Option<String>,
    /// The budget, in millions of dollars.
    pub budget_musd: Option<f64>,
    /// The revenue, in millions of dollars.
    pub revenue_musd: Option<f64>,
    /// Production company names joined by `|`.
    pub production_companies: Option<String>,
    /// Production country names joined by `|`.
    pub production_countries: Option<String>,
    /// The number of votes behind `vote_average`.
    pub vote_count: Option<i64>,
    /// The average rating, on a scale of 0 to 10.
    pub vote_average: Option<f64>,
    /// The TMDB popularity score.
    pub popularity: Option<f64>,
    /// The runtime, in minutes.
    pub runtime: Option<i64>,
    /// A plot overview.
    pub overview: Option<String>,
    /// Spoken language names joined by `|`.
    pub spoken_languages: Option<String>,
    /// The top billed cast members, in billing order, joined by `|`.
    pub cast: Option<String>,
    /// The total number of cast members.
    pub cast_size: i64,
    /// The first crew member whose job is `Director`.
    pub director: Option<String>,
    /// The total number of crew members.
    pub crew_size: i64,
    /// The year of `release_date`.
    pub release_year: Option<i32>,
    /// Keyword names joined by `|`.
    pub keywords: Option<String>,
}

impl MovieRecord {
    /// Create a new record with the given identifier and title. All other
    /// fields are empty.
    pub fn new(id: i64, title: &str) -> MovieRecord {
        MovieRecord { id, title: title.to_string(), ..MovieRecord::default() }
    }

    /// Returns the profit, in millions of dollars.
    ///
    /// This is `None` unless both the budget and revenue are known.
    pub fn profit_musd(&self) -> Option<f64> {
        match (self.revenue_musd, self.budget_musd) {
            (Some(revenue), Some(budget)) => Some(revenue - budget),
            _ => None,
        }
    }

    /// Returns the return on investment as a percentage.
    ///
    /// This is only defined when the budget is positive and the revenue is
    /// known.
    pub fn roi(&self) -> Option<f64> {
        match (self.revenue_musd, self.budget_musd) {
            (Some(revenue), Some(budget)) if budget > 0.0 => {
                Some((revenue - budget) / budget * 100.0)
            }
            _ => None,
        }
    }

    /// Returns true if and only if this movie belongs to a franchise.
    pub fn is_franchise(&self) -> bool {
        self.collection_name.is_some()
    }

    /// Returns `Franchise` or `Standalone` depending on whether this movie
    /// belongs to a collection.
    pub fn franchise_label(&self) -> &'static str {
        if self.is_franchise() {
            "Franchise"
        } else {
            "Standalone"
        }
    }

    /// Returns an iterator over the individual genre names of this movie.
    pub fn genre_names(&self) -> impl Iterator<Item = &str> {
        split_joined(self.genres.as_deref())
    }

    /// Returns an iterator over the top billed cast names of this movie.
    pub fn cast_names(&self) -> impl Iterator<Item = &str> {
        split_joined(self.cast.as_deref())
    }

    /// Returns the value of the given column for this record.
    ///
    /// Derived columns are computed on demand.
    pub fn get(&self, column: Column) -> Value {
        use self::Column::*;

        match column {
            Id => Value::Int(self.id),
            Title => Value::Text(self.title.clone()),
            Tagline => Value::from(&self.tagline),
            ReleaseDate => self.release_date.map_or(Value::Null, Value::Date),
            Genres => Value::from(&self.genres),
            CollectionName => Value::from(&self.collection_name),
            OriginalLanguage => Value::from(&self.original_language),
            BudgetMusd => Value::from(self.budget_musd),
            RevenueMusd => Value::from(self.revenue_musd),
            ProductionCompanies => Value::from(&self.production_companies),
            ProductionCountries => Value::from(&self.production_countries),
            VoteCount => Value::from(self.vote_count),
            VoteAverage => Value::from(self.vote_average),
            Popularity => Value::from(self.popularity),
            Runtime => Value::from(self.runtime),
            Overview => Value::from(&self.overview),
            SpokenLanguages => Value::from(&self.spoken_languages),
            Cast => Value::from(&self.cast),
            CastSize => Value::Int(self.cast_size),
            Director => Value::from(&self.director),
            CrewSize => Value::Int(self.crew_size),
            ReleaseYear => Value::from(self.release_year.map(i64::from)),
            Keywords => Value::from(&self.keywords),
            ProfitMusd => Value::from(self.profit_musd()),
            Roi => Value::from(self.roi()),
        }
    }

    /// Returns the numeric value of the given column, if it has one.
    ///
    /// Non-numeric columns always return `None`.
    pub fn number(&self, column: Column) -> Option<f64> {
        self.get(column).as_f64()
    }

    /// Returns true if and only if the given column has no value for this
    /// record. Unlike `get`, this never copies any text.
    pub fn is_null(&self, column: Column) -> bool {
        use self::Column::*;

        match column {
            Id | Title | CastSize | CrewSize => false,
            Tagline => self.tagline.is_none(),
            ReleaseDate => self.release_date.is_none(),
            Genres => self.genres.is_none(),
            CollectionName => self.collection_name.is_none(),
            OriginalLanguage => self.original_language.is_none(),
            BudgetMusd => self.budget_musd.is_none(),
            RevenueMusd => self.revenue_musd.is_none(),
            ProductionCompanies => self.production_companies.is_none(),
            ProductionCountries => self.production_countries.is_none(),
            VoteCount => self.vote_count.is_none(),
            VoteAverage => self.vote_average.is_none(),
            Popularity => self.popularity.is_none(),
            Runtime => self.runtime.is_none(),
            Overview => self.overview.is_none(),
            SpokenLanguages => self.spoken_languages.is_none(),
            Cast => self.cast.is_none(),
            Director => self.director.is_none(),
            ReleaseYear => self.release_year.is_none(),
            Keywords => self.keywords.is_none(),
            ProfitMusd => self.profit_musd().is_none(),
            Roi => self.roi().is_none(),
        }
    }

    /// Returns the text of the given column, if it is a text column with a
    /// value.
    pub fn text(&self, column: Column) -> Option<&str> {
        use self::Column::*;

        let field = match column {
            Title => return Some(&self.title),
            Tagline => &self.tagline,
            Genres => &self.genres,
            CollectionName => &self.collection_name,
            OriginalLanguage => &self.original_language,
            ProductionCompanies => &self.production_companies,
            ProductionCountries => &self.production_countries,
            Overview => &self.overview,
            SpokenLanguages => &self.spoken_languages,
            Cast => &self.cast,
            Director => &self.director,
            Keywords => &self.keywords,
            _ => return None,
        };
        field.as_deref()
    }
}

fn split_joined(joined: Option<&str>) -> impl Iterator<Item = &str> {
    joined
        .into_iter()
        .flat_map(|s| s.split(DELIMITER))
        .filter(|s| !s.is_empty())
}

/// A column of the canonical schema, or a metric derived from it.
///
/// The canonical columns, in their fixed order, are given by
/// [`Column::CANONICAL`](enum.Column.html#associatedconstant.CANONICAL).
/// `ProfitMusd` and `Roi` are never stored; they are computed from the budget
/// and revenue whenever they are requested.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[allow(missing_docs)]
pub enum Column {
    Id,
    Title,
    Tagline,
    ReleaseDate,
    Genres,
    CollectionName,
    OriginalLanguage,
    BudgetMusd,
    RevenueMusd,
    ProductionCompanies,
    ProductionCountries,
    VoteCount,
    VoteAverage,
    Popularity,
    Runtime,
    Overview,
    SpokenLanguages,
    Cast,
    CastSize,
    Director,
    CrewSize,
    ReleaseYear,
    Keywords,
    ProfitMusd,
    Roi,
}

impl Column {
    /// Every canonical column, in canonical order.
    pub const CANONICAL: [Column; 23] = [
        Column::Id,
        Column::Title,
        Column::Tagline,
        Column::ReleaseDate,
        Column::Genres,
        Column::CollectionName,
        Column::OriginalLanguage,
        Column::BudgetMusd,
        Column::RevenueMusd,
        Column::ProductionCompanies,
        Column::ProductionCountries,
        Column::VoteCount,
        Column::VoteAverage,
        Column::Popularity,
        Column::Runtime,
        Column::Overview,
        Column::SpokenLanguages,
        Column::Cast,
        Column::CastSize,
        Column::Director,
        Column::CrewSize,
        Column::ReleaseYear,
        Column::Keywords,
    ];

    /// Return the name of this column as it appears in the canonical schema.
    pub fn as_str(&self) -> &'static str {
        use self::Column::*;
        match *self {
            Id => "id",
            Title => "title",
            Tagline => "tagline",
            ReleaseDate => "release_date",
            Genres => "genres",
            CollectionName => "collection_name",
            OriginalLanguage => "original_language",
            BudgetMusd => "budget_musd",
            RevenueMusd => "revenue_musd",
            ProductionCompanies => "production_companies",
            ProductionCountries => "production_countries",
            VoteCount => "vote_count",
            VoteAverage => "vote_average",
            Popularity => "popularity",
            Runtime => "runtime",
            Overview => "overview",
            SpokenLanguages => "spoken_languages",
            Cast => "cast",
            CastSize => "cast_size",
            Director => "director",
            CrewSize => "crew_size",
            ReleaseYear => "release_year",
            Keywords => "keywords",
            ProfitMusd => "profit_musd",
            Roi => "roi",
        }
    }

    /// Returns true if and only if values in this column are numbers.
    pub fn is_numeric(&self) -> bool {
        use self::Column::*;
        match *self {
            Id | BudgetMusd | RevenueMusd | VoteCount | VoteAverage
            | Popularity | Runtime | CastSize | CrewSize | ReleaseYear
            | ProfitMusd | Roi => true,
            _ => false,
        }
    }

    /// Returns true if and only if this column is computed from other
    /// columns instead of being stored.
    pub fn is_derived(&self) -> bool {
        match *self {
            Column::ProfitMusd | Column::Roi => true,
            _ => false,
        }
    }

    /// The top-level keys of a raw document that give rise to this column.
    ///
    /// A canonical column is present in a collection if and only if at least
    /// one ingested document carried one of these keys. Canonical names are
    /// always included so that normalized output can be normalized again.
    pub(crate) fn source_keys(&self) -> &'static [&'static str] {
        use self::Column::*;
        match *self {
            CollectionName => &["belongs_to_collection", "collection_name"],
            BudgetMusd => &["budget", "budget_musd"],
            RevenueMusd => &["revenue", "revenue_musd"],
            Cast => &["credits", "cast"],
            CastSize => &["credits", "cast_size"],
            Director => &["credits", "director"],
            CrewSize => &["credits", "crew_size"],
            ReleaseYear => &["release_date", "release_year"],
            ProfitMusd | Roi => &[],
            Id => &["id"],
            Title => &["title"],
            Tagline => &["tagline"],
            ReleaseDate => &["release_date"],
            Genres => &["genres"],
            OriginalLanguage => &["original_language"],
            ProductionCompanies => &["production_companies"],
            ProductionCountries => &["production_countries"],
            VoteCount => &["vote_count"],
            VoteAverage => &["vote_average"],
            Popularity => &["popularity"],
            Runtime => &["runtime"],
            Overview => &["overview"],
            SpokenLanguages => &["spoken_languages"],
            Keywords => &["keywords"],
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Column {
    type Err = Error;

    fn from_str(name: &str) -> Result<Column, Error> {
        let name = name.trim();
        Column::CANONICAL
            .iter()
            .chain(&[Column::ProfitMusd, Column::Roi])
            .find(|c| c.as_str() == name)
            .copied()
            .ok_or_else(|| Error::unknown_column(name))
    }
}

/// A single cell of a record or of a query result table.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// An unknown value.
    Null,
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Text(String),
    /// A calendar date.
    Date(NaiveDate),
}

impl Value {
    /// Returns true if and only if this value is unknown.
    pub fn is_null(&self) -> bool {
        *self == Value::Null
    }

    /// Returns this value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(n) => Some(n as f64),
            Value::Float(n) => Some(n),
            _ => None,
        }
    }

    /// Returns this value as an integer if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Returns this value as a string slice if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::Text(ref s) => Some(s),
            _ => None,
        }
    }

    /// Returns the year of this value if it is a date.
    pub fn year(&self) -> Option<i32> {
        match *self {
            Value::Date(ref d) => Some(d.year()),
            _ => None,
        }
    }

    /// A total order used for sorting.
    ///
    /// Unknown values sort before everything else, so that an ascending sort
    /// puts them first and a descending sort puts them last. Numbers of
    /// different representations compare numerically.
    pub fn sort_cmp(&self, other: &Value) -> cmp::Ordering {
        use self::Value::*;

        match (self, other) {
            (Null, Null) => cmp::Ordering::Equal,
            (Null, _) => cmp::Ordering::Less,
            (_, Null) => cmp::Ordering::Greater,
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.type_rank().cmp(&b.type_rank()),
            },
        }
    }

    fn type_rank(&self) -> u8 {
        match *self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Date(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Null => Ok(()),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(ref s) => write!(f, "{}", s),
            Value::Date(ref d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::Null => s.serialize_none(),
            Value::Int(n) => s.serialize_i64(n),
            Value::Float(n) => s.serialize_f64(n),
            Value::Text(ref t) => s.serialize_str(t),
            Value::Date(_) => s.collect_str(self),
        }
    }
}

impl<'a> From<&'a Option<String>> for Value {
    fn from(s: &'a Option<String>) -> Value {
        s.as_ref().map_or(Value::Null, |s| Value::Text(s.clone()))
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Value {
        n.map_or(Value::Null, Value::Float)
    }
}

impl From<Option<i64>> for Value {
    fn from(n: Option<i64>) -> Value {
        n.map_or(Value::Null, Value::Int)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Value {
        Value::Int(n as i64)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(s: &'a str) -> Value {
        Value::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_metrics() {
        let mut rec = MovieRecord::new(1, "High Rev");
        rec.revenue_musd = Some(100.0);
        rec.budget_musd = Some(50.0);
        assert_eq!(rec.profit_musd(), Some(50.0));
        assert_eq!(rec.roi(), Some(100.0));

        rec.budget_musd = Some(0.0);
        assert_eq!(rec.roi(), None);
        rec.budget_musd = None;
        assert_eq!(rec.profit_musd(), None);
        assert_eq!(rec.roi(), None);
    }

    #[test]
    fn franchise_label() {
        let mut rec = MovieRecord::new(1, "F1");
        assert_eq!(rec.franchise_label(), "Standalone");
        rec.collection_name = Some("Franchise A".to_string());
        assert_eq!(rec.franchise_label(), "Franchise");
    }

    #[test]
    fn column_names() {
        for &col in Column::CANONICAL.iter() {
            assert_eq!(col.as_str().parse::<Column>().unwrap(), col);
        }
        assert_eq!("roi".parse::<Column>().unwrap(), Column::Roi);
        assert!("status".parse::<Column>().is_err());
    }

    #[test]
    fn nulls_sort_first() {
        let mut values = vec![
            Value::Float(2.5),
            Value::Null,
            Value::Int(1),
            Value::Int(3),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![Value::Null, Value::Int(1), Value::Float(2.5), Value::Int(3)]
        );
    }

    #[test]
    fn joined_names() {
        let mut rec = MovieRecord::new(1, "x");
        rec.genres = Some("Action|Adventure".to_string());
        assert_eq!(rec.genre_names().collect::<Vec<_>>(), vec![
            "Action",
            "Adventure",
        ]);
        assert_eq!(rec.cast_names().count(), 0);
    }
}
