use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::collection::MovieCollection;
use crate::record::{Column, Value};
use crate::table::Table;
use crate::util::{pearson, percentile_interpolated, sample_std_dev};

/// The columns covered by the numeric summary and the correlation matrix.
const NUMERIC: &[Column] = &[
    Column::BudgetMusd,
    Column::RevenueMusd,
    Column::Runtime,
    Column::VoteAverage,
    Column::VoteCount,
    Column::Popularity,
    Column::CastSize,
    Column::CrewSize,
];

/// How many genres `genre_counts` reports by default.
pub const TOP_GENRES: usize = 15;

/// How many years `releases_per_year` reports by default.
pub const LATEST_YEARS: usize = 20;

/// Exploratory statistics over a movie collection.
#[derive(Clone, Debug)]
pub struct Profiler<'a> {
    movies: &'a MovieCollection,
}

impl<'a> Profiler<'a> {
    /// Create a profiler over the given collection.
    pub fn new(movies: &'a MovieCollection) -> Profiler<'a> {
        Profiler { movies }
    }

    /// The number of rows and columns, followed by every column name.
    pub fn overview(&self) -> Table {
        let mut table = Table::new(vec!["statistic", "value"]);
        table.push(vec![Value::from("rows"), Value::from(self.movies.len())]);
        table.push(vec![
            Value::from("columns"),
            Value::from(self.movies.columns().len()),
        ]);
        for col in self.movies.columns() {
            table.push(vec![
                Value::from("column"),
                Value::from(col.as_str()),
            ]);
        }
        table
    }

    /// The number and percentage of missing values in every column, most
    /// incomplete first.
    ///
    /// All columns are counted in a single pass over the records.
    pub fn missing_values(&self) -> Table {
        let counts = self.null_counts();
        let total = self.movies.len();
        let mut rows: Vec<(Column, usize)> =
            self.movies.columns().iter().copied().zip(counts).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));

        let mut table =
            Table::new(vec!["column", "null_count", "null_percentage"]);
        for (col, nulls) in rows {
            table.push(vec![
                Value::from(col.as_str()),
                Value::from(nulls),
                Value::Float(percentage(nulls, total)),
            ]);
        }
        table
    }

    /// Count, mean, standard deviation, extremes and quartiles of every
    /// numeric column. Missing values are ignored.
    pub fn numeric_summary(&self) -> Table {
        let mut table = Table::new(vec![
            "column", "count", "mean", "std", "min", "25%", "median", "75%",
            "max",
        ]);
        let cols = self.numeric_columns();
        let matrix = self.numeric_matrix(&cols);
        for (i, &col) in cols.iter().enumerate() {
            let mut values: Vec<f64> =
                matrix.iter().filter_map(|row| row[i]).collect();
            values.par_sort_by(|a, b| a.total_cmp(b));
            let mean = if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            };
            table.push(vec![
                Value::from(col.as_str()),
                Value::from(values.len()),
                Value::from(mean),
                Value::from(sample_std_dev(&values)),
                Value::from(values.first().copied()),
                Value::from(percentile_interpolated(&values, 0.25)),
                Value::from(percentile_interpolated(&values, 0.5)),
                Value::from(percentile_interpolated(&values, 0.75)),
                Value::from(values.last().copied()),
            ]);
        }
        table
    }

    /// The `top` most common genres and how many movies have each. Genres
    /// with equal counts are listed in order of first appearance.
    pub fn genre_counts(&self, top: usize) -> Table {
        let mut genres = self
            .movies
            .records()
            .iter()
            .flat_map(|m| m.genre_names())
            .fold(Vec::<(&str, usize)>::new(), |mut acc, g| {
                match acc.iter_mut().find(|e| e.0 == g) {
                    Some(e) => e.1 += 1,
                    None => acc.push((g, 1)),
                }
                acc
            });
        genres.sort_by(|a, b| b.1.cmp(&a.1));
        genres.truncate(top);

        let mut table = Table::new(vec!["genre", "count"]);
        for (genre, count) in genres {
            table.push(vec![Value::from(genre), Value::from(count)]);
        }
        table
    }

    /// The number of movies released in each of the `latest` most recent
    /// years, newest first. Movies without a release year are not counted.
    pub fn releases_per_year(&self, latest: usize) -> Table {
        let mut years: BTreeMap<i32, usize> = BTreeMap::new();
        for m in self.movies.records() {
            let year = match m.release_year {
                None => continue,
                Some(year) => year,
            };
            *years.entry(year).or_insert(0) += 1;
        }
        let mut table = Table::new(vec!["release_year", "count"]);
        for (&year, &count) in years.iter().rev().take(latest) {
            table.push(vec![Value::Int(year as i64), Value::from(count)]);
        }
        table
    }

    /// The Pearson correlation between every pair of numeric columns.
    ///
    /// Each pair only uses the movies that have both values. A pair with
    /// too few such movies, or with no variance, has no correlation.
    pub fn correlations(&self) -> Table {
        let cols = self.numeric_columns();
        let matrix = self.numeric_matrix(&cols);
        let mut table = Table::new(
            vec!["column"]
                .into_iter()
                .chain(cols.iter().map(|c| c.as_str())),
        );
        for (x, &col) in cols.iter().enumerate() {
            let mut row = vec![Value::from(col.as_str())];
            let coefs: Vec<Value> = (0..cols.len())
                .into_par_iter()
                .map(|y| {
                    let pairs: Vec<(f64, f64)> = matrix
                        .iter()
                        .filter_map(|r| Some((r[x]?, r[y]?)))
                        .collect();
                    Value::from(pearson(&pairs))
                })
                .collect();
            row.extend(coefs);
            table.push(row);
        }
        table
    }

    /// Overall completeness and the number of movies usable for financial
    /// and rating analysis.
    pub fn quality_report(&self) -> Table {
        let rows = self.movies.len();
        let cells = rows * self.movies.columns().len();
        let missing: usize = self.null_counts().iter().sum();
        let financial = self
            .movies
            .records()
            .par_iter()
            .filter(|m| {
                m.budget_musd.map_or(false, |b| b > 0.0)
                    && m.revenue_musd.map_or(false, |r| r > 0.0)
            })
            .count();
        let rated = self
            .movies
            .records()
            .par_iter()
            .filter(|m| m.vote_count.map_or(false, |v| v >= 10))
            .count();

        let mut table = Table::new(vec!["statistic", "value"]);
        let mut push = |name: &str, value: Value| {
            table.push(vec![Value::from(name), value]);
        };
        push("total_rows", Value::from(rows));
        push("total_cells", Value::from(cells));
        push("missing_cells", Value::from(missing));
        push(
            "completeness_pct",
            Value::Float(100.0 - percentage(missing, cells)),
        );
        push("valid_financial_rows", Value::from(financial));
        push(
            "valid_financial_pct",
            Value::Float(percentage(financial, rows)),
        );
        push("reliable_rating_rows", Value::from(rated));
        push("reliable_rating_pct", Value::Float(percentage(rated, rows)));
        table
    }

    /// Count missing values in every present column with one pass over the
    /// records. Counts are in column order.
    fn null_counts(&self) -> Vec<usize> {
        let cols = self.movies.columns();
        self.movies
            .records()
            .par_iter()
            .fold(
                || vec![0; cols.len()],
                |mut counts, m| {
                    for (i, &col) in cols.iter().enumerate() {
                        if m.is_null(col) {
                            counts[i] += 1;
                        }
                    }
                    counts
                },
            )
            .reduce(
                || vec![0; cols.len()],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                    a
                },
            )
    }

    /// Read the given columns out of every record in one pass. Row `i`
    /// holds the values of record `i`, in column order.
    fn numeric_matrix(&self, cols: &[Column]) -> Vec<Vec<Option<f64>>> {
        self.movies
            .records()
            .par_iter()
            .map(|m| cols.iter().map(|&c| m.number(c)).collect())
            .collect()
    }

    fn numeric_columns(&self) -> Vec<Column> {
        NUMERIC
            .iter()
            .copied()
            .filter(|&c| self.movies.has_column(c))
            .collect()
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MovieRecord;

    fn movies() -> MovieCollection {
        let mut a = MovieRecord::new(1, "a");
        a.genres = Some("Action|Drama".to_string());
        a.budget_musd = Some(10.0);
        a.revenue_musd = Some(30.0);
        a.vote_count = Some(100);
        a.release_year = Some(2001);
        let mut b = MovieRecord::new(2, "b");
        b.genres = Some("Drama".to_string());
        b.budget_musd = Some(20.0);
        b.revenue_musd = Some(50.0);
        b.vote_count = Some(5);
        b.release_year = Some(1999);
        let mut c = MovieRecord::new(3, "c");
        c.budget_musd = Some(30.0);
        c.release_year = Some(2001);
        MovieCollection::new(
            vec![
                Column::Id,
                Column::Title,
                Column::Genres,
                Column::BudgetMusd,
                Column::RevenueMusd,
                Column::VoteCount,
                Column::ReleaseYear,
            ],
            vec![a, b, c],
        )
    }

    #[test]
    fn missing_values() {
        let movies = movies();
        let table = Profiler::new(&movies).missing_values();
        assert_eq!(table.len(), 7);
        assert_eq!(table.get(0, "column"), Some(&Value::from("genres")));
        assert_eq!(table.get(0, "null_count"), Some(&Value::Int(1)));
        let pct = table.get(0, "null_percentage").and_then(|v| v.as_f64());
        assert!((pct.unwrap() - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(table.get(6, "null_count"), Some(&Value::Int(0)));
    }

    #[test]
    fn numeric_summary() {
        let movies = movies();
        let table = Profiler::new(&movies).numeric_summary();
        // Only budget, revenue and vote count are present.
        assert_eq!(table.len(), 3);
        let name = table.get(0, "column");
        assert_eq!(name, Some(&Value::from("budget_musd")));
        assert_eq!(table.get(0, "count"), Some(&Value::Int(3)));
        assert_eq!(table.get(0, "mean"), Some(&Value::Float(20.0)));
        assert_eq!(table.get(0, "std"), Some(&Value::Float(10.0)));
        assert_eq!(table.get(0, "min"), Some(&Value::Float(10.0)));
        assert_eq!(table.get(0, "25%"), Some(&Value::Float(15.0)));
        assert_eq!(table.get(0, "median"), Some(&Value::Float(20.0)));
        assert_eq!(table.get(0, "max"), Some(&Value::Float(30.0)));
    }

    #[test]
    fn genres_and_years() {
        let movies = movies();
        let p = Profiler::new(&movies);
        let table = p.genre_counts(TOP_GENRES);
        assert_eq!(table.get(0, "genre"), Some(&Value::from("Drama")));
        assert_eq!(table.get(0, "count"), Some(&Value::Int(2)));
        assert_eq!(table.get(1, "genre"), Some(&Value::from("Action")));
        assert_eq!(p.genre_counts(1).len(), 1);

        let table = p.releases_per_year(LATEST_YEARS);
        assert_eq!(table.get(0, "release_year"), Some(&Value::Int(2001)));
        assert_eq!(table.get(0, "count"), Some(&Value::Int(2)));
        assert_eq!(table.get(1, "release_year"), Some(&Value::Int(1999)));
        assert_eq!(p.releases_per_year(1).len(), 1);
    }

    #[test]
    fn correlations() {
        let movies = movies();
        let table = Profiler::new(&movies).correlations();
        assert_eq!(
            table.columns(),
            &["column", "budget_musd", "revenue_musd", "vote_count"]
        );
        let r = table.get(0, "revenue_musd").and_then(|v| v.as_f64());
        assert!((r.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn correlations_use_complete_pairs() {
        let movies = movies();
        let table = Profiler::new(&movies).correlations();
        for (i, col) in ["budget_musd", "revenue_musd", "vote_count"]
            .iter()
            .enumerate()
        {
            assert_eq!(table.get(i, "column"), Some(&Value::from(*col)));
            for other in &["budget_musd", "revenue_musd", "vote_count"] {
                let j = ["budget_musd", "revenue_musd", "vote_count"]
                    .iter()
                    .position(|c| c == other)
                    .unwrap();
                assert_eq!(table.get(i, other), table.get(j, col));
            }
        }
        // Budget is known for all three movies but revenue and votes only
        // for the first two, so those pairs only use two movies.
        let r = table.get(1, "vote_count").and_then(|v| v.as_f64());
        assert!((r.unwrap() + 1.0).abs() < 1e-9);
        let r = table.get(0, "budget_musd").and_then(|v| v.as_f64());
        assert!((r.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn quality_report() {
        let movies = movies();
        let table = Profiler::new(&movies).quality_report();
        assert_eq!(table.get(0, "value"), Some(&Value::Int(3)));
        assert_eq!(table.get(1, "value"), Some(&Value::Int(21)));
        assert_eq!(table.get(2, "value"), Some(&Value::Int(3)));
        assert_eq!(table.get(4, "value"), Some(&Value::Int(2)));
        assert_eq!(table.get(6, "value"), Some(&Value::Int(1)));
    }
}
