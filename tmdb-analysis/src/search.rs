use std::fmt;
use std::result;
use std::str::FromStr;

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::collection::MovieCollection;
use crate::error::{Error, Result};
use crate::predicate::Predicate;
use crate::record::Column;
use crate::table::Table;

/// A multi-criteria movie search.
///
/// Criteria of different kinds are combined with logical AND. Within a
/// kind, every genre must match, but any one of the actors (or directors)
/// is enough. Actor, director and title matching ignores case; genre
/// matching does not.
///
/// A query can also be parsed from a free-form string such as
/// `{genre:Action} {actor:Bruce Willis} {year:1990-2000} {sort:runtime}
/// {asc} {size:10} die hard`, where the bare words filter on the title.
/// Every query can be printed back into this form.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    genres: Vec<String>,
    actors: Vec<String>,
    directors: Vec<String>,
    title: Option<String>,
    year: Range<i32>,
    min_rating: Option<f64>,
    min_votes: Option<i64>,
    sort_by: String,
    ascending: bool,
    size: Option<usize>,
}

impl Default for Query {
    fn default() -> Query {
        Query::new()
    }
}

impl Query {
    /// Create a new empty query, which matches every movie and sorts by
    /// rating, highest first.
    pub fn new() -> Query {
        Query {
            genres: vec![],
            actors: vec![],
            directors: vec![],
            title: None,
            year: Range::none(),
            min_rating: None,
            min_votes: None,
            sort_by: Column::VoteAverage.as_str().to_string(),
            ascending: false,
            size: None,
        }
    }

    /// Require the given genre.
    pub fn genre(mut self, genre: &str) -> Query {
        self.genres.push(genre.to_string());
        self
    }

    /// Allow movies with the given actor in their top billed cast.
    pub fn actor(mut self, name: &str) -> Query {
        self.actors.push(name.to_string());
        self
    }

    /// Allow movies by the given director.
    pub fn director(mut self, name: &str) -> Query {
        self.directors.push(name.to_string());
        self
    }

    /// Require the title to contain the given text.
    pub fn title(mut self, title: &str) -> Query {
        self.title = Some(title.to_string());
        self
    }

    /// Only return movies released in or after the given year.
    pub fn year_ge(mut self, year: i32) -> Query {
        self.year.start = Some(year);
        self
    }

    /// Only return movies released in or before the given year.
    pub fn year_le(mut self, year: i32) -> Query {
        self.year.end = Some(year);
        self
    }

    /// Only return movies rated at least this highly.
    pub fn min_rating(mut self, rating: f64) -> Query {
        self.min_rating = Some(rating);
        self
    }

    /// Only return movies with at least this many votes.
    pub fn min_votes(mut self, votes: i64) -> Query {
        self.min_votes = Some(votes);
        self
    }

    /// Sort the results by the named column. If the column doesn't exist,
    /// the results are left in collection order.
    pub fn sort_by(mut self, column: &str) -> Query {
        self.sort_by = column.to_string();
        self
    }

    /// Sort from lowest to highest instead of highest to lowest.
    pub fn ascending(mut self, yes: bool) -> Query {
        self.ascending = yes;
        self
    }

    /// Return at most this many results.
    pub fn size(mut self, size: usize) -> Query {
        self.size = Some(size);
        self
    }

    /// Build the predicate that decides which movies match this query.
    pub fn predicate(&self) -> Predicate {
        let mut pred = Predicate::Always;
        if !self.genres.is_empty() {
            pred = pred.and(genre_predicate(&self.genres, true));
        }
        if !self.actors.is_empty() {
            pred = pred.and(any_of(Column::Cast, &self.actors));
        }
        if !self.directors.is_empty() {
            pred = pred.and(any_of(Column::Director, &self.directors));
        }
        if let Some(ref title) = self.title {
            pred = pred
                .and(Predicate::contains_ignore_case(Column::Title, title));
        }
        pred = pred.and(year_predicate(self.year));
        if let Some(rating) = self.min_rating {
            pred = pred.and(Predicate::at_least(Column::VoteAverage, rating));
        }
        if let Some(votes) = self.min_votes {
            let votes = votes as f64;
            pred = pred.and(Predicate::at_least(Column::VoteCount, votes));
        }
        pred
    }
}

impl Serialize for Query {
    fn serialize<S>(&self, s: S) -> result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.to_string())
    }
}

impl<'a> Deserialize<'a> for Query {
    fn deserialize<D>(d: D) -> result::Result<Query, D::Error>
    where
        D: Deserializer<'a>,
    {
        use serde::de::Error;

        let querystr = String::deserialize(d)?;
        querystr
            .parse()
            .map_err(|e: self::Error| D::Error::custom(e.to_string()))
    }
}

impl FromStr for Query {
    type Err = Error;

    fn from_str(qstr: &str) -> Result<Query> {
        lazy_static! {
            // The 'directive', 'terms' and 'space' groups are all mutually
            // exclusive. When 'directive' matches, we parse it using DIRECTIVE
            // in a subsequent step. When 'terms' matches, we add them to the
            // title filter. When 'space' matches, we ignore it.
            static ref PARTS: Regex = Regex::new(
                r"\{(?P<directive>[^}]+)\}|(?P<terms>[^{}\s]+)|(?P<space>\s+)"
            ).unwrap();

            // Parse a directive of the form '{name:val}' or '{flag}'.
            static ref DIRECTIVE: Regex = Regex::new(
                r"^(?:(?P<name>[^:]+):(?P<val>.+)|(?P<flag>.+))$"
            ).unwrap();
        }
        let mut terms = vec![];
        let mut q = Query::new();
        for caps in PARTS.captures_iter(qstr) {
            if caps.name("space").is_some() {
                continue;
            } else if let Some(m) = caps.name("terms") {
                terms.push(m.as_str().to_string());
                continue;
            }

            let dcaps = match DIRECTIVE.captures(&caps["directive"]) {
                Some(dcaps) => dcaps,
                None => bug!("unmatched directive: {}", &caps["directive"]),
            };
            if let Some(m) = dcaps.name("flag") {
                match m.as_str().trim() {
                    "asc" => q.ascending = true,
                    "desc" => q.ascending = false,
                    unk => return Err(Error::unknown_directive(unk)),
                }
                continue;
            }

            let (name, val) = (dcaps["name"].trim(), dcaps["val"].trim());
            match name {
                "genre" => q.genres.push(val.to_string()),
                "actor" => q.actors.push(val.to_string()),
                "director" => q.directors.push(val.to_string()),
                "year" => q.year = val.parse()?,
                "rating" => {
                    q.min_rating = Some(val.parse().map_err(Error::number)?);
                }
                "votes" => {
                    q.min_votes = Some(val.parse().map_err(Error::number)?);
                }
                "sort" => q.sort_by = val.to_string(),
                "size" => q.size = Some(val.parse().map_err(Error::number)?),
                unk => return Err(Error::unknown_directive(unk)),
            }
        }
        if !terms.is_empty() {
            q = q.title(&terms.join(" "));
        }
        Ok(q)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{sort:{}}}", self.sort_by)?;
        f.write_str(if self.ascending { " {asc}" } else { " {desc}" })?;
        if let Some(size) = self.size {
            write!(f, " {{size:{}}}", size)?;
        }
        for genre in &self.genres {
            write!(f, " {{genre:{}}}", genre)?;
        }
        for actor in &self.actors {
            write!(f, " {{actor:{}}}", actor)?;
        }
        for director in &self.directors {
            write!(f, " {{director:{}}}", director)?;
        }
        if !self.year.is_none() {
            write!(f, " {{year:{}}}", self.year)?;
        }
        if let Some(rating) = self.min_rating {
            write!(f, " {{rating:{}}}", rating)?;
        }
        if let Some(votes) = self.min_votes {
            write!(f, " {{votes:{}}}", votes)?;
        }
        if let Some(ref title) = self.title {
            write!(f, " {}", title)?;
        }
        Ok(())
    }
}

/// Filters, sorts and truncates a movie collection.
#[derive(Clone, Debug)]
pub struct Searcher<'a> {
    movies: &'a MovieCollection,
}

impl<'a> Searcher<'a> {
    /// Create a searcher over the given collection.
    pub fn new(movies: &'a MovieCollection) -> Searcher<'a> {
        Searcher { movies }
    }

    /// Movies whose genres contain all of the given genres (when `match_all`
    /// is set) or any of them (otherwise).
    pub fn by_genres(
        &self,
        genres: &[&str],
        match_all: bool,
    ) -> MovieCollection {
        if !self.require(Column::Genres) {
            return self.movies.empty();
        }
        let genres: Vec<String> =
            genres.iter().map(|g| g.to_string()).collect();
        self.movies.matching(&genre_predicate(&genres, match_all))
    }

    /// Movies whose top billed cast contains the given name.
    pub fn by_actor(
        &self,
        name: &str,
        case_sensitive: bool,
    ) -> MovieCollection {
        self.by_name(Column::Cast, name, case_sensitive)
    }

    /// Movies whose director's name contains the given name.
    pub fn by_director(
        &self,
        name: &str,
        case_sensitive: bool,
    ) -> MovieCollection {
        self.by_name(Column::Director, name, case_sensitive)
    }

    /// Movies released between the given years, inclusive. Either bound may
    /// be omitted.
    pub fn by_year_range(
        &self,
        start: Option<i32>,
        end: Option<i32>,
    ) -> MovieCollection {
        if !self.require(Column::ReleaseYear) {
            return self.movies.empty();
        }
        self.movies.matching(&year_predicate(Range { start, end }))
    }

    /// Run a query.
    ///
    /// If the query filters on a column that this collection lacks, a
    /// warning is logged and nothing matches.
    pub fn search(&self, query: &Query) -> MovieCollection {
        let needs = [
            (Column::Genres, !query.genres.is_empty()),
            (Column::Cast, !query.actors.is_empty()),
            (Column::Director, !query.directors.is_empty()),
            (Column::ReleaseYear, !query.year.is_none()),
        ];
        for &(col, needed) in &needs {
            if needed && !self.require(col) {
                return self.movies.empty();
            }
        }

        let mut results = self.movies.matching(&query.predicate());
        match Column::from_str(&query.sort_by) {
            Ok(col) if self.movies.has_column(col) => {
                results = results.sorted_by(col, query.ascending);
            }
            _ => debug!("not sorting by unknown column '{}'", query.sort_by),
        }
        if let Some(size) = query.size {
            results = results.limit(size);
        }
        debug!("query '{}' matched {} movies", query, results.len());
        results
    }

    /// The best rated science fiction action movies starring Bruce Willis.
    pub fn scifi_action_bruce_willis(&self) -> Table {
        use crate::record::Column::*;

        let query = Query::new()
            .genre("Science Fiction")
            .genre("Action")
            .actor("Bruce Willis")
            .sort_by("vote_average");
        self.search(&query).to_table(&[
            Title,
            ReleaseYear,
            VoteAverage,
            VoteCount,
            Genres,
            Director,
            RevenueMusd,
        ])
    }

    /// Movies starring Uma Thurman and directed by Quentin Tarantino,
    /// shortest first.
    pub fn uma_thurman_tarantino(&self) -> Table {
        use crate::record::Column::*;

        let query = Query::new()
            .actor("Uma Thurman")
            .director("Quentin Tarantino")
            .sort_by("runtime")
            .ascending(true);
        self.search(&query).to_table(&[
            Title,
            ReleaseYear,
            Runtime,
            VoteAverage,
            Genres,
            RevenueMusd,
            BudgetMusd,
        ])
    }

    fn by_name(
        &self,
        column: Column,
        name: &str,
        case_sensitive: bool,
    ) -> MovieCollection {
        if !self.require(column) {
            return self.movies.empty();
        }
        let pred = if case_sensitive {
            Predicate::contains(column, name)
        } else {
            Predicate::contains_ignore_case(column, name)
        };
        self.movies.matching(&pred)
    }

    fn require(&self, column: Column) -> bool {
        if self.movies.has_column(column) {
            return true;
        }
        warn!("column '{}' not found, no movies match", column);
        false
    }
}

fn genre_predicate(genres: &[String], match_all: bool) -> Predicate {
    let preds = genres
        .iter()
        .map(|g| Predicate::contains(Column::Genres, g))
        .collect();
    if match_all {
        Predicate::And(preds)
    } else {
        Predicate::Or(preds)
    }
}

fn any_of(column: Column, names: &[String]) -> Predicate {
    Predicate::Or(
        names
            .iter()
            .map(|n| Predicate::contains_ignore_case(column, n))
            .collect(),
    )
}

fn year_predicate(year: Range<i32>) -> Predicate {
    let mut pred = Predicate::Always;
    if let Some(start) = year.start {
        let start = start as f64;
        pred = pred.and(Predicate::at_least(Column::ReleaseYear, start));
    }
    if let Some(end) = year.end {
        pred = pred.and(Predicate::at_most(Column::ReleaseYear, end as f64));
    }
    pred
}

/// A range filter over any partially ordered type `T`.
///
/// This type permits either end of the range to be unbounded.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
struct Range<T> {
    start: Option<T>,
    end: Option<T>,
}

impl<T> Range<T> {
    pub fn none() -> Range<T> {
        Range { start: None, end: None }
    }

    pub fn is_none(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl<T: fmt::Display + PartialEq> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.start, &self.end) {
            (&None, &None) => write!(f, "-"),
            (&Some(ref s), &None) => write!(f, "{}-", s),
            (&None, &Some(ref e)) => write!(f, "-{}", e),
            (&Some(ref s), &Some(ref e)) if s == e => write!(f, "{}", s),
            (&Some(ref s), &Some(ref e)) => write!(f, "{}-{}", s, e),
        }
    }
}

impl<E, T> FromStr for Range<T>
where
    E: std::error::Error + Send + Sync + 'static,
    T: FromStr<Err = E>,
{
    type Err = Error;

    fn from_str(range: &str) -> Result<Range<T>> {
        // Years are never negative, so a dash always separates the bounds.
        let (start, end) = match range.find('-') {
            None => {
                // Parse it twice so that we don't need a `Clone` bound.
                let start = range.trim().parse().map_err(Error::number)?;
                let end = range.trim().parse().map_err(Error::number)?;
                return Ok(Range { start: Some(start), end: Some(end) });
            }
            Some(i) => {
                let (start, end) = range.split_at(i);
                (start.trim(), end[1..].trim())
            }
        };
        Ok(match (start.is_empty(), end.is_empty()) {
            (true, true) => Range::none(),
            (true, false) => Range {
                start: None,
                end: Some(end.parse().map_err(Error::number)?),
            },
            (false, true) => Range {
                start: Some(start.parse().map_err(Error::number)?),
                end: None,
            },
            (false, false) => Range {
                start: Some(start.parse().map_err(Error::number)?),
                end: Some(end.parse().map_err(Error::number)?),
            },
        })
    }
}
