use std::str::FromStr;

use log::{debug, warn};
use rayon::prelude::*;

use crate::collection::MovieCollection;
use crate::predicate::Predicate;
use crate::record::{Column, MovieRecord, Value};
use crate::table::Table;

/// The minimum budget, in MUSD, for a movie to be ranked by ROI.
pub const ROI_MIN_BUDGET_MUSD: f64 = 10.0;

/// The minimum number of votes for a movie to be ranked by rating.
pub const RATING_MIN_VOTES: f64 = 10.0;

/// A top-N query over a single numeric metric.
///
/// A query always starts with a metric name, and may then be refined with a
/// sort direction, a size, a filter and the columns to display. By default,
/// the 10 records with the highest values are returned.
#[derive(Clone, Debug)]
pub struct RankQuery {
    metric: String,
    ascending: bool,
    size: usize,
    filter: Option<Predicate>,
    display: Option<Vec<String>>,
}

impl RankQuery {
    /// Create a new query that ranks records by the named metric.
    pub fn new(metric: &str) -> RankQuery {
        RankQuery {
            metric: metric.to_string(),
            ascending: false,
            size: 10,
            filter: None,
            display: None,
        }
    }

    /// Rank from the lowest value instead of the highest.
    pub fn ascending(mut self, yes: bool) -> RankQuery {
        self.ascending = yes;
        self
    }

    /// Set the maximum number of records returned.
    pub fn size(mut self, size: usize) -> RankQuery {
        self.size = size;
        self
    }

    /// Only rank records that match the given predicate.
    pub fn filter(mut self, predicate: Predicate) -> RankQuery {
        self.filter = Some(predicate);
        self
    }

    /// Display exactly these columns. `rank` may be used to place the rank
    /// column.
    pub fn display(mut self, columns: &[&str]) -> RankQuery {
        self.display = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// The name of the metric this query ranks by.
    pub fn metric(&self) -> &str {
        &self.metric
    }
}

/// A column of a ranking result.
#[derive(Clone, Copy, Debug)]
enum Cell {
    Rank,
    Field(Column),
}

/// Ranks the movies of a collection by any numeric metric.
#[derive(Clone, Debug)]
pub struct Ranker<'a> {
    movies: &'a MovieCollection,
}

impl<'a> Ranker<'a> {
    /// Create a ranker over the given collection.
    pub fn new(movies: &'a MovieCollection) -> Ranker<'a> {
        Ranker { movies }
    }

    /// Execute a ranking query.
    ///
    /// Records without a value for the metric are never ranked. Records
    /// with equal values keep their order in the collection. Ranks are
    /// assigned 1 through k after truncation, so they are always
    /// contiguous.
    ///
    /// If the metric is not a numeric column of this collection, then a
    /// warning is logged and an empty table is returned.
    pub fn rank(&self, query: &RankQuery) -> Table {
        let metric = match self.resolve(&query.metric) {
            Some(metric) => metric,
            None => {
                warn!("metric '{}' not found, nothing to rank", query.metric);
                return Table::new(vec!["rank", "title"]);
            }
        };
        let mut ranked: Vec<(f64, &MovieRecord)> = self
            .movies
            .records()
            .par_iter()
            .filter(|m| query.filter.as_ref().map_or(true, |p| p.matches(m)))
            .filter_map(|m| m.number(metric).map(|n| (n, m)))
            .collect();
        if query.ascending {
            ranked.par_sort_by(|a, b| a.0.total_cmp(&b.0));
        } else {
            ranked.par_sort_by(|a, b| b.0.total_cmp(&a.0));
        }
        ranked.truncate(query.size);
        debug!("ranked {} movies by {}", ranked.len(), metric);

        let cells = match query.display {
            Some(ref names) => self.display_cells(names),
            None => self.default_cells(metric),
        };
        let mut table = Table::new(cells.iter().map(|c| match *c {
            Cell::Rank => "rank",
            Cell::Field(col) => col.as_str(),
        }));
        for (i, &(_, m)) in ranked.iter().enumerate() {
            table.push(
                cells
                    .iter()
                    .map(|c| match *c {
                        Cell::Rank => Value::from(i + 1),
                        Cell::Field(col) => m.get(col),
                    })
                    .collect(),
            );
        }
        table
    }

    /// The highest grossing movies.
    pub fn top_by_revenue(&self, n: usize) -> Table {
        self.rank(&RankQuery::new("revenue_musd").size(n))
    }

    /// The lowest grossing movies.
    pub fn bottom_by_revenue(&self, n: usize) -> Table {
        self.rank(&RankQuery::new("revenue_musd").ascending(true).size(n))
    }

    /// The most expensive movies.
    pub fn top_by_budget(&self, n: usize) -> Table {
        self.rank(&RankQuery::new("budget_musd").size(n))
    }

    /// The cheapest movies.
    pub fn bottom_by_budget(&self, n: usize) -> Table {
        self.rank(&RankQuery::new("budget_musd").ascending(true).size(n))
    }

    /// The most profitable movies.
    pub fn top_by_profit(&self, n: usize) -> Table {
        self.rank(&RankQuery::new("profit_musd").size(n))
    }

    /// The least profitable movies.
    pub fn bottom_by_profit(&self, n: usize) -> Table {
        self.rank(&RankQuery::new("profit_musd").ascending(true).size(n))
    }

    /// The movies with the best return on investment, among movies with a
    /// budget of at least 10 MUSD.
    pub fn top_by_roi(&self, n: usize) -> Table {
        self.rank(&roi_query().size(n))
    }

    /// The movies with the worst return on investment, among movies with a
    /// budget of at least 10 MUSD.
    pub fn bottom_by_roi(&self, n: usize) -> Table {
        self.rank(&roi_query().ascending(true).size(n))
    }

    /// The movies with the most votes.
    pub fn most_voted(&self, n: usize) -> Table {
        self.rank(&RankQuery::new("vote_count").size(n))
    }

    /// The best rated movies, among movies with at least 10 votes.
    pub fn top_rated(&self, n: usize) -> Table {
        self.rank(&rating_query().size(n))
    }

    /// The worst rated movies, among movies with at least 10 votes.
    pub fn bottom_rated(&self, n: usize) -> Table {
        self.rank(&rating_query().ascending(true).size(n))
    }

    /// The most popular movies.
    pub fn most_popular(&self, n: usize) -> Table {
        self.rank(&RankQuery::new("popularity").size(n))
    }

    fn resolve(&self, metric: &str) -> Option<Column> {
        let col = Column::from_str(metric).ok()?;
        if col.is_numeric() && self.movies.has_column(col) {
            Some(col)
        } else {
            None
        }
    }

    fn default_cells(&self, metric: Column) -> Vec<Cell> {
        use crate::record::Column::*;

        let context: &[Column] = match metric {
            RevenueMusd | BudgetMusd | ProfitMusd | Roi => {
                &[ReleaseYear, BudgetMusd, RevenueMusd]
            }
            VoteAverage | VoteCount => &[ReleaseYear, VoteAverage, VoteCount],
            Popularity => &[ReleaseYear, Popularity, VoteAverage],
            _ => &[ReleaseYear],
        };
        let mut cols = vec![Id, Title, metric];
        for &col in context {
            if !cols.contains(&col) {
                cols.push(col);
            }
        }
        let mut cells = vec![Cell::Rank];
        cells.extend(
            cols.into_iter()
                .filter(|&c| self.movies.has_column(c))
                .map(Cell::Field),
        );
        cells
    }

    fn display_cells(&self, names: &[String]) -> Vec<Cell> {
        let mut cells = vec![];
        for name in names {
            if name == "rank" {
                cells.push(Cell::Rank);
                continue;
            }
            match Column::from_str(name) {
                Ok(col) if self.movies.has_column(col) => {
                    cells.push(Cell::Field(col))
                }
                _ => warn!("skipping unknown display column '{}'", name),
            }
        }
        cells
    }
}

fn roi_query() -> RankQuery {
    RankQuery::new("roi")
        .filter(Predicate::at_least(Column::BudgetMusd, ROI_MIN_BUDGET_MUSD))
}

fn rating_query() -> RankQuery {
    RankQuery::new("vote_average")
        .filter(Predicate::at_least(Column::VoteCount, RATING_MIN_VOTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kpi_movie(
        id: i64,
        title: &str,
        revenue: f64,
        budget: f64,
        votes: i64,
        rating: f64,
    ) -> MovieRecord {
        let mut rec = MovieRecord::new(id, title);
        rec.revenue_musd = Some(revenue);
        rec.budget_musd = Some(budget);
        rec.vote_count = Some(votes);
        rec.vote_average = Some(rating);
        rec
    }

    fn kpi_data() -> MovieCollection {
        MovieCollection::from_records(vec![
            kpi_movie(1, "High Rev", 100.0, 50.0, 100, 8.0),
            kpi_movie(2, "Low Rev", 10.0, 5.0, 5, 9.0),
            kpi_movie(3, "Flop", 1.0, 20.0, 50, 2.0),
        ])
    }

    fn titles(table: &Table) -> Vec<String> {
        table
            .column("title")
            .unwrap()
            .into_iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    fn ranks(table: &Table) -> Vec<i64> {
        table
            .column("rank")
            .unwrap()
            .into_iter()
            .map(|v| v.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn rank_revenue() {
        let movies = kpi_data();
        let table = Ranker::new(&movies).top_by_revenue(2);
        assert_eq!(table.len(), 2);
        assert_eq!(ranks(&table), vec![1, 2]);
        assert_eq!(titles(&table), vec!["High Rev", "Low Rev"]);
        assert_eq!(
            table.columns(),
            &[
                "rank",
                "id",
                "title",
                "revenue_musd",
                "release_year",
                "budget_musd",
            ]
        );
    }

    #[test]
    fn top_by_roi_respects_budget_floor() {
        let movies = kpi_data();
        let table = Ranker::new(&movies).top_by_roi(10);
        assert_eq!(titles(&table), vec!["High Rev", "Flop"]);
        let roi =
            |row| table.get(row, "roi").and_then(|v| v.as_f64()).unwrap();
        assert!((roi(0) - 100.0).abs() < 1e-9);
        assert!((roi(1) + 95.0).abs() < 1e-9);
    }

    #[test]
    fn top_rated_requires_votes() {
        let movies = kpi_data();
        let table = Ranker::new(&movies).top_rated(10);
        assert_eq!(titles(&table), vec!["High Rev", "Flop"]);
        let table = Ranker::new(&movies).bottom_rated(10);
        assert_eq!(titles(&table), vec!["Flop", "High Rev"]);
    }

    #[test]
    fn ranks_are_contiguous() {
        let movies = kpi_data();
        let ranker = Ranker::new(&movies);
        for k in 0..5 {
            let table = ranker.rank(&RankQuery::new("profit_musd").size(k));
            let expected: Vec<i64> = (1..=k.min(3) as i64).collect();
            assert_eq!(ranks(&table), expected);
        }
    }

    #[test]
    fn ties_keep_input_order() {
        let mut a = MovieRecord::new(1, "a");
        a.popularity = Some(5.0);
        let mut b = MovieRecord::new(2, "b");
        b.popularity = Some(7.0);
        let mut c = MovieRecord::new(3, "c");
        c.popularity = Some(5.0);
        let d = MovieRecord::new(4, "d");
        let movies = MovieCollection::from_records(vec![a, b, c, d]);
        let table = Ranker::new(&movies).most_popular(10);
        assert_eq!(titles(&table), vec!["b", "a", "c"]);
        let table = Ranker::new(&movies)
            .rank(&RankQuery::new("popularity").ascending(true));
        assert_eq!(titles(&table), vec!["a", "c", "b"]);
    }

    #[test]
    fn unknown_metric_is_empty() {
        let movies = kpi_data();
        let ranker = Ranker::new(&movies);
        for metric in &["nope", "title", "genres"] {
            let table = ranker.rank(&RankQuery::new(metric));
            assert!(table.is_empty());
            assert_eq!(table.columns(), &["rank", "title"]);
        }

        let partial = MovieCollection::new(
            vec![Column::Id, Column::Title, Column::BudgetMusd],
            vec![MovieRecord::new(1, "x")],
        );
        assert!(Ranker::new(&partial).top_by_roi(5).is_empty());
    }

    #[test]
    fn custom_display() {
        let movies = kpi_data();
        let table = Ranker::new(&movies).rank(
            &RankQuery::new("vote_count")
                .size(1)
                .display(&["title", "rank", "bogus", "vote_count"]),
        );
        assert_eq!(table.columns(), &["title", "rank", "vote_count"]);
        assert_eq!(table.get(0, "vote_count"), Some(&Value::Int(100)));
    }
}
