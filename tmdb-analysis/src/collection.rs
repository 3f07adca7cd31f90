use std::collections::HashMap;
use std::hash::Hash;

use rayon::prelude::*;
use serde_json::Value as JsonValue;

use crate::predicate::Predicate;
use crate::raw::RawDocument;
use crate::record::{Column, MovieRecord, Value};
use crate::table::Table;

/// An ordered set of canonical movie records.
///
/// Alongside the records themselves, a collection tracks which canonical
/// columns exist. A column that never appeared in the ingested input is
/// absent from the collection, which is different from a present column
/// whose values happen to all be null.
///
/// Once built, a collection is never mutated. Every query operation returns
/// a new collection or a table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieCollection {
    columns: Vec<Column>,
    movies: Vec<MovieRecord>,
}

impl MovieCollection {
    /// Create a collection from records and the set of columns present.
    ///
    /// Columns are put into canonical order. Derived columns are never
    /// stored, so they are ignored here.
    pub fn new(
        mut columns: Vec<Column>,
        movies: Vec<MovieRecord>,
    ) -> MovieCollection {
        columns.retain(|c| !c.is_derived());
        columns.sort();
        columns.dedup();
        MovieCollection { columns, movies }
    }

    /// Create a collection in which every canonical column is present.
    pub fn from_records(movies: Vec<MovieRecord>) -> MovieCollection {
        MovieCollection::new(Column::CANONICAL.to_vec(), movies)
    }

    /// The canonical columns present in this collection, in canonical order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns true if and only if the given column can be queried.
    ///
    /// Derived columns are available whenever both the budget and revenue
    /// columns are present.
    pub fn has_column(&self, column: Column) -> bool {
        if column.is_derived() {
            return self.has_column(Column::BudgetMusd)
                && self.has_column(Column::RevenueMusd);
        }
        self.columns.contains(&column)
    }

    /// The records in this collection, in order.
    pub fn records(&self) -> &[MovieRecord] {
        &self.movies
    }

    /// Consume this collection and return its records.
    pub fn into_records(self) -> Vec<MovieRecord> {
        self.movies
    }

    /// The number of records in this collection.
    pub fn len(&self) -> usize {
        self.movies.len()
    }

    /// Returns true if and only if this collection has no records.
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Returns a collection with the same columns but no records.
    pub fn empty(&self) -> MovieCollection {
        MovieCollection { columns: self.columns.clone(), movies: vec![] }
    }

    /// Keep only records for which `keep` returns true. Order is preserved.
    pub fn filter<F>(&self, keep: F) -> MovieCollection
    where
        F: Fn(&MovieRecord) -> bool + Sync,
    {
        let movies = self
            .movies
            .par_iter()
            .filter(|m| keep(m))
            .cloned()
            .collect();
        MovieCollection { columns: self.columns.clone(), movies }
    }

    /// Keep only records matching the given predicate. Order is preserved.
    pub fn matching(&self, predicate: &Predicate) -> MovieCollection {
        self.filter(|m| predicate.matches(m))
    }

    /// Sort this collection by the given column.
    ///
    /// The sort is stable, so records with equal values keep their current
    /// relative order. Missing values come first when ascending and last
    /// when descending.
    pub fn sorted_by(
        mut self,
        column: Column,
        ascending: bool,
    ) -> MovieCollection {
        let mut keyed: Vec<(Value, MovieRecord)> = self
            .movies
            .into_par_iter()
            .map(|m| (m.get(column), m))
            .collect();
        if ascending {
            keyed.par_sort_by(|a, b| a.0.sort_cmp(&b.0));
        } else {
            keyed.par_sort_by(|a, b| b.0.sort_cmp(&a.0));
        }
        self.movies = keyed.into_iter().map(|(_, m)| m).collect();
        self
    }

    /// Keep only the first `n` records.
    pub fn limit(mut self, n: usize) -> MovieCollection {
        self.movies.truncate(n);
        self
    }

    /// Group records by a key. Records for which `key` returns `None` belong
    /// to no group.
    ///
    /// Groups are returned in the order in which their first member appears,
    /// and members keep their relative order.
    pub fn group_by<K, F>(&self, key: F) -> Vec<(K, Vec<&MovieRecord>)>
    where
        K: Eq + Hash + Clone,
        F: Fn(&MovieRecord) -> Option<K>,
    {
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut groups: Vec<(K, Vec<&MovieRecord>)> = vec![];
        for m in &self.movies {
            let k = match key(m) {
                None => continue,
                Some(k) => k,
            };
            match index.get(&k) {
                Some(&i) => groups[i].1.push(m),
                None => {
                    index.insert(k.clone(), groups.len());
                    groups.push((k, vec![m]));
                }
            }
        }
        groups
    }

    /// Project this collection into a table with the given columns. Columns
    /// not queryable on this collection are skipped.
    pub fn to_table(&self, columns: &[Column]) -> Table {
        let columns: Vec<Column> = columns
            .iter()
            .copied()
            .filter(|&c| self.has_column(c))
            .collect();
        let mut table = Table::new(columns.iter().map(|c| c.as_str()));
        let rows: Vec<Vec<Value>> = self
            .movies
            .par_iter()
            .map(|m| columns.iter().map(|&c| m.get(c)).collect())
            .collect();
        for row in rows {
            table.push(row);
        }
        table
    }

    /// Project this collection into a table with every present column.
    pub fn table(&self) -> Table {
        self.to_table(&self.columns)
    }

    /// Render every record as a JSON document holding exactly the present
    /// columns, with missing values written as explicit nulls.
    ///
    /// Feeding these documents back into ingestion reproduces this
    /// collection.
    pub fn to_documents(&self) -> Vec<RawDocument> {
        self.movies
            .par_iter()
            .map(|m| {
                let mut doc = RawDocument::new();
                for &col in &self.columns {
                    let value = serde_json::to_value(m.get(col))
                        .unwrap_or(JsonValue::Null);
                    doc.insert(col.as_str().to_string(), value);
                }
                doc
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, title: &str, revenue: Option<f64>) -> MovieRecord {
        let mut rec = MovieRecord::new(id, title);
        rec.revenue_musd = revenue;
        rec
    }

    fn example() -> MovieCollection {
        MovieCollection::from_records(vec![
            movie(1, "A", Some(10.0)),
            movie(2, "B", None),
            movie(3, "C", Some(30.0)),
            movie(4, "D", Some(10.0)),
        ])
    }

    fn ids(movies: &MovieCollection) -> Vec<i64> {
        movies.records().iter().map(|m| m.id).collect()
    }

    #[test]
    fn stable_sort_with_nulls() {
        let asc = example().sorted_by(Column::RevenueMusd, true);
        assert_eq!(ids(&asc), vec![2, 1, 4, 3]);
        let desc = example().sorted_by(Column::RevenueMusd, false);
        assert_eq!(ids(&desc), vec![3, 1, 4, 2]);
    }

    #[test]
    fn filter_preserves_order() {
        let movies = example();
        let got = movies.filter(|m| m.revenue_musd.is_some());
        assert_eq!(ids(&got), vec![1, 3, 4]);
        assert_eq!(ids(&got.limit(2)), vec![1, 3]);
    }

    #[test]
    fn groups_in_first_appearance_order() {
        let movies = example();
        let groups = movies.group_by(|m| m.revenue_musd.map(|r| r as i64));
        let keys: Vec<i64> = groups.iter().map(|g| g.0).collect();
        assert_eq!(keys, vec![10, 30]);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn derived_columns_need_money() {
        let movies = MovieCollection::new(
            vec![Column::Title, Column::Id, Column::BudgetMusd],
            vec![],
        );
        assert_eq!(
            movies.columns(),
            &[Column::Id, Column::Title, Column::BudgetMusd]
        );
        assert!(!movies.has_column(Column::Roi));
        assert!(example().has_column(Column::Roi));
    }

    #[test]
    fn documents_hold_present_columns() {
        let movies = MovieCollection::new(
            vec![Column::Id, Column::Title, Column::RevenueMusd],
            vec![movie(1, "A", None)],
        );
        let docs = movies.to_documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].len(), 3);
        assert_eq!(docs[0]["revenue_musd"], JsonValue::Null);
        assert_eq!(docs[0]["title"], JsonValue::from("A"));
    }
}
