use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::collection::MovieCollection;
use crate::error::Error;
use crate::predicate::Predicate;
use crate::record::{Column, MovieRecord, Value};
use crate::table::Table;
use crate::util::{percentile_nearest, Accumulator};

/// The statistic that franchise and director groups are ranked by.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupMetric {
    /// The number of movies in the group.
    MovieCount,
    /// The sum of the budgets of the group's movies.
    TotalBudget,
    /// The mean budget of the group's movies.
    MeanBudget,
    /// The sum of the revenues of the group's movies.
    TotalRevenue,
    /// The mean revenue of the group's movies.
    MeanRevenue,
    /// The mean rating of the group's movies.
    MeanRating,
    /// The mean number of votes of the group's movies.
    MeanVoteCount,
}

impl GroupMetric {
    /// Every group metric, in display order.
    pub const ALL: [GroupMetric; 7] = [
        GroupMetric::MovieCount,
        GroupMetric::TotalBudget,
        GroupMetric::MeanBudget,
        GroupMetric::TotalRevenue,
        GroupMetric::MeanRevenue,
        GroupMetric::MeanRating,
        GroupMetric::MeanVoteCount,
    ];

    /// Return the column name of this metric in a group table.
    pub fn as_str(&self) -> &'static str {
        match *self {
            GroupMetric::MovieCount => "movie_count",
            GroupMetric::TotalBudget => "total_budget_musd",
            GroupMetric::MeanBudget => "mean_budget_musd",
            GroupMetric::TotalRevenue => "total_revenue_musd",
            GroupMetric::MeanRevenue => "mean_revenue_musd",
            GroupMetric::MeanRating => "mean_rating",
            GroupMetric::MeanVoteCount => "mean_vote_count",
        }
    }
}

impl Default for GroupMetric {
    fn default() -> GroupMetric {
        GroupMetric::TotalRevenue
    }
}

impl fmt::Display for GroupMetric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GroupMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<GroupMetric, Error> {
        let s = s.trim();
        GroupMetric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::unknown_metric(s))
    }
}

/// Summary statistics for one group of movies.
#[derive(Clone, Copy, Debug, Default)]
struct GroupStats {
    count: usize,
    budget: Accumulator,
    revenue: Accumulator,
    rating: Accumulator,
    votes: Accumulator,
    popularity: Accumulator,
}

impl GroupStats {
    fn add(&mut self, m: &MovieRecord) {
        self.count += 1;
        self.budget.add(m.budget_musd);
        self.revenue.add(m.revenue_musd);
        self.rating.add(m.vote_average);
        self.votes.add(m.vote_count.map(|n| n as f64));
        self.popularity.add(m.popularity);
    }

    fn metric(&self, metric: GroupMetric) -> Option<f64> {
        match metric {
            GroupMetric::MovieCount => Some(self.count as f64),
            GroupMetric::TotalBudget => self.budget.sum(),
            GroupMetric::MeanBudget => self.budget.mean(),
            GroupMetric::TotalRevenue => self.revenue.sum(),
            GroupMetric::MeanRevenue => self.revenue.mean(),
            GroupMetric::MeanRating => self.rating.mean(),
            GroupMetric::MeanVoteCount => self.votes.mean(),
        }
    }

    fn row(&self) -> Vec<Value> {
        GroupMetric::ALL
            .iter()
            .map(|&m| match m {
                GroupMetric::MovieCount => Value::from(self.count),
                m => Value::from(self.metric(m)),
            })
            .collect()
    }
}

/// Group-by statistics over a movie collection.
#[derive(Clone, Debug)]
pub struct Aggregator<'a> {
    movies: &'a MovieCollection,
}

impl<'a> Aggregator<'a> {
    /// Create an aggregator over the given collection.
    pub fn new(movies: &'a MovieCollection) -> Aggregator<'a> {
        Aggregator { movies }
    }

    /// Compare movies that belong to a franchise with standalone movies.
    ///
    /// The result always has exactly two rows, `Franchise` first. The median
    /// ROI is the lower median over movies with a defined ROI. Every other
    /// statistic is a mean over movies with a value, and is missing if no
    /// movie in the partition has one.
    pub fn compare_franchise_vs_standalone(&self) -> Table {
        let mut table = Table::new(vec![
            "is_franchise",
            "movie_count",
            "mean_revenue_musd",
            "median_roi",
            "mean_budget_musd",
            "mean_popularity",
            "mean_rating",
        ]);
        let mut parts = [GroupStats::default(), GroupStats::default()];
        let mut rois: [Vec<f64>; 2] = [vec![], vec![]];
        for m in self.movies.records() {
            let i = if m.is_franchise() { 0 } else { 1 };
            parts[i].add(m);
            rois[i].extend(m.roi());
        }
        for (i, label) in ["Franchise", "Standalone"].iter().enumerate() {
            let stats = &parts[i];
            table.push(vec![
                Value::from(*label),
                Value::from(stats.count),
                Value::from(stats.revenue.mean()),
                Value::from(percentile_nearest(&mut rois[i], 0.5)),
                Value::from(stats.budget.mean()),
                Value::from(stats.popularity.mean()),
                Value::from(stats.rating.mean()),
            ]);
        }
        table
    }

    /// The franchises with the highest value of the given metric.
    ///
    /// Movies outside of any franchise are ignored. Ranks are assigned after
    /// truncating to `top_n` groups.
    pub fn top_franchises(&self, top_n: usize, sort_by: GroupMetric) -> Table {
        self.top_groups(Column::CollectionName, top_n, sort_by, 1)
    }

    /// The directors with the highest value of the given metric, among
    /// directors with at least `min_movies` movies.
    ///
    /// Movies without a known director are ignored. Ranks are assigned after
    /// truncating to `top_n` groups.
    pub fn top_directors(
        &self,
        top_n: usize,
        sort_by: GroupMetric,
        min_movies: usize,
    ) -> Table {
        self.top_groups(Column::Director, top_n, sort_by, min_movies)
    }

    /// Every movie whose franchise name contains `name`, oldest first.
    pub fn franchise_details(&self, name: &str) -> Table {
        use crate::record::Column::*;

        self.details(
            Predicate::contains(CollectionName, name),
            &[
                Title,
                ReleaseYear,
                BudgetMusd,
                RevenueMusd,
                VoteAverage,
                VoteCount,
                Popularity,
                Director,
                CollectionName,
            ],
        )
    }

    /// Every movie whose director's name contains `name`, ignoring case,
    /// oldest first.
    pub fn director_details(&self, name: &str) -> Table {
        use crate::record::Column::*;

        self.details(
            Predicate::contains_ignore_case(Director, name),
            &[
                Title,
                ReleaseYear,
                BudgetMusd,
                RevenueMusd,
                VoteAverage,
                VoteCount,
                Popularity,
                Genres,
                CollectionName,
            ],
        )
    }

    fn top_groups(
        &self,
        key: Column,
        top_n: usize,
        sort_by: GroupMetric,
        min_movies: usize,
    ) -> Table {
        let groups =
            self.movies.group_by(|m| m.text(key).map(|k| k.to_string()));
        let mut stats: Vec<(String, GroupStats)> = groups
            .into_iter()
            .map(|(k, members)| {
                let mut stats = GroupStats::default();
                for m in members {
                    stats.add(m);
                }
                (k, stats)
            })
            .filter(|(_, stats)| stats.count >= min_movies)
            .collect();
        debug!(
            "{} groups by {} with at least {} movies",
            stats.len(),
            key,
            min_movies
        );
        // Descending with unknown values last. Ties keep group order.
        stats.sort_by(|a, b| {
            let (x, y) = (a.1.metric(sort_by), b.1.metric(sort_by));
            Value::from(y).sort_cmp(&Value::from(x))
        });
        stats.truncate(top_n);

        let mut table = Table::new(
            vec![key.as_str()]
                .into_iter()
                .chain(GroupMetric::ALL.iter().map(|m| m.as_str())),
        );
        for (k, stats) in stats {
            let mut row = vec![Value::Text(k)];
            row.extend(stats.row());
            table.push(row);
        }
        table.insert_rank();
        table
    }

    fn details(&self, predicate: Predicate, columns: &[Column]) -> Table {
        self.movies
            .matching(&predicate)
            .sorted_by(Column::ReleaseYear, true)
            .to_table(columns)
    }
}
