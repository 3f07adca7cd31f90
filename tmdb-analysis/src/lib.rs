/*!
This crate normalizes raw, nested TMDB movie documents into a flat canonical
record collection, and answers ranking, aggregation and multi-criteria search
queries over that collection.

The typical flow is: build a [`Session`](struct.Session.html), hand it to a
[`Normalizer`](struct.Normalizer.html) to load a directory of JSON documents,
then query the resulting [`MovieCollection`](struct.MovieCollection.html)
with a [`Ranker`](struct.Ranker.html), an
[`Aggregator`](struct.Aggregator.html) or a
[`Searcher`](struct.Searcher.html). Every query returns a
[`Table`](struct.Table.html).
*/

#![deny(missing_docs)]

pub use crate::aggregate::{Aggregator, GroupMetric};
pub use crate::collection::MovieCollection;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::ingest::{IngestStats, Normalized, Normalizer};
pub use crate::predicate::Predicate;
pub use crate::profile::{Profiler, LATEST_YEARS, TOP_GENRES};
pub use crate::rank::{RankQuery, Ranker};
pub use crate::raw::{parse_documents, RawDocument};
pub use crate::record::{Column, MovieRecord, Value};
pub use crate::search::{Query, Searcher};
pub use crate::session::{Session, SessionConfig};
pub use crate::table::Table;

// A macro that creates an error that represents a bug.
//
// This is used where an internal invariant would otherwise be enforced with a
// panic, such as a table row whose width disagrees with its header.
macro_rules! bug {
    ($($tt:tt)*) => {{
        return Err($crate::error::Error::bug(format!($($tt)*)));
    }}
}

mod aggregate;
mod collection;
mod error;
mod ingest;
mod predicate;
mod profile;
mod rank;
mod raw;
mod record;
mod search;
mod session;
mod table;
mod util;
