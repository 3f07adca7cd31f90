use std::fmt;
use std::sync::Arc;

use crate::record::{Column, MovieRecord};

/// A composable boolean condition over movie records.
///
/// Comparisons against a missing value are always false, so a record with
/// no budget is neither `AtLeast` nor `AtMost` any threshold. `Not` simply
/// negates its operand, which means `Not` of such a comparison is true.
#[derive(Clone)]
pub enum Predicate {
    /// Matches every record.
    Always,
    /// The column is a number greater than or equal to the given value.
    AtLeast(Column, f64),
    /// The column is a number less than or equal to the given value.
    AtMost(Column, f64),
    /// The column is text containing the given substring.
    Contains {
        /// The column to search.
        column: Column,
        /// The substring to look for.
        needle: String,
        /// Whether letter case must match exactly.
        case_sensitive: bool,
    },
    /// The column has a value.
    NotNull(Column),
    /// Every operand matches. An empty list matches everything.
    And(Vec<Predicate>),
    /// At least one operand matches. An empty list matches nothing.
    Or(Vec<Predicate>),
    /// The operand does not match.
    Not(Box<Predicate>),
    /// An arbitrary condition.
    Custom(Arc<dyn Fn(&MovieRecord) -> bool + Send + Sync>),
}

impl Predicate {
    /// Match records whose column is at least `value`.
    pub fn at_least(column: Column, value: f64) -> Predicate {
        Predicate::AtLeast(column, value)
    }

    /// Match records whose column is at most `value`.
    pub fn at_most(column: Column, value: f64) -> Predicate {
        Predicate::AtMost(column, value)
    }

    /// Match records whose column contains `needle`, respecting case.
    pub fn contains(column: Column, needle: &str) -> Predicate {
        Predicate::Contains {
            column,
            needle: needle.to_string(),
            case_sensitive: true,
        }
    }

    /// Match records whose column contains `needle`, ignoring case.
    pub fn contains_ignore_case(column: Column, needle: &str) -> Predicate {
        Predicate::Contains {
            column,
            needle: needle.to_lowercase(),
            case_sensitive: false,
        }
    }

    /// Match records for which the given closure returns true.
    pub fn custom<F>(f: F) -> Predicate
    where
        F: Fn(&MovieRecord) -> bool + Send + Sync + 'static,
    {
        Predicate::Custom(Arc::new(f))
    }

    /// Combine this predicate with another so that both must match.
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Always => other,
            Predicate::And(mut ps) => {
                ps.push(other);
                Predicate::And(ps)
            }
            p => Predicate::And(vec![p, other]),
        }
    }

    /// Combine this predicate with another so that either may match.
    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut ps) => {
                ps.push(other);
                Predicate::Or(ps)
            }
            p => Predicate::Or(vec![p, other]),
        }
    }

    /// Negate this predicate.
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Returns true if and only if the given record satisfies this
    /// predicate.
    pub fn matches(&self, rec: &MovieRecord) -> bool {
        match *self {
            Predicate::Always => true,
            Predicate::AtLeast(col, v) => {
                rec.number(col).map_or(false, |n| n >= v)
            }
            Predicate::AtMost(col, v) => {
                rec.number(col).map_or(false, |n| n <= v)
            }
            Predicate::Contains { column, ref needle, case_sensitive } => {
                match rec.text(column) {
                    None => false,
                    Some(hay) if case_sensitive => {
                        hay.contains(needle.as_str())
                    }
                    Some(hay) => hay.to_lowercase().contains(needle.as_str()),
                }
            }
            Predicate::NotNull(col) => !rec.is_null(col),
            Predicate::And(ref ps) => ps.iter().all(|p| p.matches(rec)),
            Predicate::Or(ref ps) => ps.iter().any(|p| p.matches(rec)),
            Predicate::Not(ref p) => !p.matches(rec),
            Predicate::Custom(ref f) => f(rec),
        }
    }

    /// Returns every column this predicate refers to. Columns referred to
    /// only by a `Custom` closure are not known.
    pub fn columns(&self) -> Vec<Column> {
        let mut cols = vec![];
        self.collect_columns(&mut cols);
        cols.sort();
        cols.dedup();
        cols
    }

    fn collect_columns(&self, cols: &mut Vec<Column>) {
        match *self {
            Predicate::Always | Predicate::Custom(_) => {}
            Predicate::AtLeast(col, _)
            | Predicate::AtMost(col, _)
            | Predicate::NotNull(col)
            | Predicate::Contains { column: col, .. } => cols.push(col),
            Predicate::And(ref ps) | Predicate::Or(ref ps) => {
                for p in ps {
                    p.collect_columns(cols);
                }
            }
            Predicate::Not(ref p) => p.collect_columns(cols),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Predicate::Always => write!(f, "Always"),
            Predicate::AtLeast(col, v) => write!(f, "{} >= {}", col, v),
            Predicate::AtMost(col, v) => write!(f, "{} <= {}", col, v),
            Predicate::Contains { column, ref needle, case_sensitive } => {
                let op = if case_sensitive { "contains" } else { "icontains" };
                write!(f, "{} {} {:?}", column, op, needle)
            }
            Predicate::NotNull(col) => write!(f, "{} is not null", col),
            Predicate::And(ref ps) => f.debug_tuple("And").field(ps).finish(),
            Predicate::Or(ref ps) => f.debug_tuple("Or").field(ps).finish(),
            Predicate::Not(ref p) => f.debug_tuple("Not").field(p).finish(),
            Predicate::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie() -> MovieRecord {
        let mut rec = MovieRecord::new(1, "Die Hard");
        rec.genres = Some("Action|Thriller".to_string());
        rec.budget_musd = Some(28.0);
        rec
    }

    #[test]
    fn comparisons_on_missing_values() {
        let rec = movie();
        assert!(Predicate::at_least(Column::BudgetMusd, 10.0).matches(&rec));
        assert!(!Predicate::at_most(Column::BudgetMusd, 10.0).matches(&rec));
        assert!(!Predicate::at_least(Column::Runtime, 0.0).matches(&rec));
        assert!(!Predicate::at_most(Column::Runtime, 0.0).matches(&rec));
        assert!(!Predicate::NotNull(Column::Runtime).matches(&rec));
    }

    #[test]
    fn containment() {
        let rec = movie();
        assert!(Predicate::contains(Column::Genres, "Action").matches(&rec));
        assert!(!Predicate::contains(Column::Genres, "action").matches(&rec));
        assert!(Predicate::contains_ignore_case(Column::Genres, "ACTION")
            .matches(&rec));
        assert!(Predicate::contains_ignore_case(Column::Title, "die")
            .matches(&rec));
        assert!(!Predicate::contains(Column::Cast, "").matches(&rec));
    }

    #[test]
    fn composition() {
        let rec = movie();
        let action = Predicate::contains(Column::Genres, "Action");
        let comedy = Predicate::contains(Column::Genres, "Comedy");
        assert!(!action.clone().and(comedy.clone()).matches(&rec));
        assert!(action.clone().or(comedy.clone()).matches(&rec));
        assert!(comedy.clone().not().matches(&rec));
        assert!(Predicate::And(vec![]).matches(&rec));
        assert!(!Predicate::Or(vec![]).matches(&rec));
        assert!(Predicate::custom(|m| m.id == 1).matches(&rec));

        let both = Predicate::Always.and(action).and(comedy);
        assert_eq!(both.columns(), vec![Column::Genres]);
    }
}
