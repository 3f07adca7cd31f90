use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::collection::MovieCollection;
use crate::error::{Error, Result};
use crate::raw::{parse_documents, Credits, RawDocument, RawMovie};
use crate::record::{Column, MovieRecord};
use crate::session::Session;
use crate::util::{json_files, read_file, NiceDuration};

mod coerce;
mod features;
mod flatten;
#[cfg(test)]
mod tests;
mod validate;

/// A movie part way through normalization.
///
/// The canonical fields live in `movie`, except for the identifier and the
/// title, which stay optional until finalization checks that both exist.
/// The status and the credits are only needed by intermediate stages and are
/// dropped once those stages have run.
#[derive(Clone, Debug, Default)]
struct Draft {
    id: Option<i64>,
    title: Option<String>,
    status: Option<String>,
    credits: Option<Credits>,
    movie: MovieRecord,
}

/// The set of top-level keys seen across a batch of raw documents.
///
/// This decides which canonical columns the resulting collection has.
#[derive(Clone, Debug, Default)]
struct Schema {
    keys: HashSet<String>,
}

impl Schema {
    fn observe(docs: &[RawDocument]) -> Schema {
        let mut keys = HashSet::new();
        for doc in docs {
            keys.extend(doc.keys().cloned());
        }
        Schema { keys }
    }

    fn has_status(&self) -> bool {
        self.keys.contains("status")
    }

    fn columns(&self) -> Vec<Column> {
        Column::CANONICAL
            .iter()
            .copied()
            .filter(|c| c.source_keys().iter().any(|k| self.keys.contains(*k)))
            .collect()
    }
}

/// Counts describing what happened during one ingestion run.
///
/// Dropping records is never an error, so these counts are the only way to
/// observe how much of the input survived.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IngestStats {
    /// The number of JSON files read.
    pub files: usize,
    /// The number of raw documents handed to the normalizer.
    pub documents: usize,
    /// Documents (or whole files) whose structure could not be interpreted.
    pub malformed: usize,
    /// Records removed because an earlier record had the same id.
    pub duplicates: usize,
    /// Records removed because they had no id or no title.
    pub missing_id_or_title: usize,
    /// Records removed because their status was not `released`.
    pub unreleased: usize,
    /// Records in the finalized collection.
    pub rows: usize,
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} documents from {} files: {} malformed, {} duplicates, \
             {} missing id or title, {} unreleased, {} rows kept",
            self.documents,
            self.files,
            self.malformed,
            self.duplicates,
            self.missing_id_or_title,
            self.unreleased,
            self.rows,
        )
    }
}

/// The result of ingestion: the finalized collection and what it took to
/// get there.
#[derive(Clone, Debug)]
pub struct Normalized {
    /// The canonical records.
    pub movies: MovieCollection,
    /// Counts of records read and dropped.
    pub stats: IngestStats,
}

/// Turns raw movie documents into a canonical collection.
///
/// Normalization runs a fixed sequence of stages: prune irrelevant fields,
/// flatten nested structures, coerce types, filter invalid records, engineer
/// features, sort genres and finalize. No stage fails because of a single
/// bad record; bad records are dropped and counted in
/// [`IngestStats`](struct.IngestStats.html).
///
/// Row-wise stages run in parallel on the session's thread pool.
#[derive(Debug)]
pub struct Normalizer<'s> {
    session: &'s Session,
}

impl<'s> Normalizer<'s> {
    /// Create a normalizer that does its work within the given session.
    pub fn new(session: &'s Session) -> Normalizer<'s> {
        Normalizer { session }
    }

    /// Read and normalize every JSON document in the given directory.
    ///
    /// Files are read in order of their names. A file that cannot be read
    /// or parsed is counted as malformed and skipped. If the directory does
    /// not exist, or no documents at all could be read from it, then an
    /// error is returned.
    pub fn load_dir<P: AsRef<Path>>(&self, dir: P) -> Result<Normalized> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::no_input(dir));
        }
        let start = Instant::now();
        let paths = json_files(dir)?;
        let parsed: Vec<Result<Vec<RawDocument>>> = self.session.install(|| {
            paths
                .par_iter()
                .map(|p| read_file(p).and_then(|text| parse_documents(&text)))
                .collect()
        });

        let mut docs = vec![];
        let mut bad_files = 0;
        for (path, result) in paths.iter().zip(parsed) {
            match result {
                Ok(batch) => docs.extend(batch),
                Err(err) => {
                    warn!("skipping {}: {}", path.display(), err);
                    bad_files += 1;
                }
            }
        }
        info!(
            "read {} documents from {} files in {}",
            docs.len(),
            paths.len(),
            NiceDuration::since(start)
        );
        if docs.is_empty() {
            return Err(Error::no_input(dir));
        }

        let mut normalized = self.normalize(docs);
        normalized.stats.files = paths.len();
        normalized.stats.malformed += bad_files;
        Ok(normalized)
    }

    /// Normalize a batch of raw documents, given in input order.
    pub fn normalize(&self, docs: Vec<RawDocument>) -> Normalized {
        let start = Instant::now();
        let top_cast = self.session.config().top_cast;
        let mut stats =
            IngestStats { documents: docs.len(), ..IngestStats::default() };
        let schema = Schema::observe(&docs);

        let drafts: Vec<Option<Draft>> = self.session.install(|| {
            docs.into_par_iter()
                .map(|mut doc| {
                    flatten::prune(&mut doc);
                    let mut raw = match RawMovie::from_document(doc) {
                        Ok(raw) => raw,
                        Err(err) => {
                            debug!("dropping malformed document: {}", err);
                            return None;
                        }
                    };
                    flatten::flatten(&mut raw);
                    Some(coerce::coerce(raw))
                })
                .collect()
        });
        stats.malformed = drafts.iter().filter(|d| d.is_none()).count();
        let drafts: Vec<Draft> = drafts.into_iter().flatten().collect();
        debug!("flattened and coerced {} records", drafts.len());

        let drafts =
            validate::validate(drafts, schema.has_status(), &mut stats);
        debug!("{} records passed validation", drafts.len());

        let validated = drafts.len();
        let movies: Vec<MovieRecord> = self.session.install(|| {
            drafts
                .into_par_iter()
                .filter_map(|mut draft| {
                    features::engineer(&mut draft, top_cast);
                    features::sort_genres(&mut draft);
                    features::finalize(draft)
                })
                .collect()
        });
        let columns = schema.columns();
        // Titles nulled during feature engineering are dropped here.
        stats.missing_id_or_title += validated - movies.len();
        stats.rows = movies.len();
        info!(
            "normalized {} of {} documents into {} columns in {}",
            stats.rows,
            stats.documents,
            columns.len(),
            NiceDuration::since(start)
        );
        Normalized { movies: MovieCollection::new(columns, movies), stats }
    }

    /// Normalize a collection again, by rendering it back into raw documents
    /// first.
    ///
    /// Normalization is idempotent, so the result always equals the input.
    pub fn renormalize(&self, movies: &MovieCollection) -> Normalized {
        self.normalize(movies.to_documents())
    }
}
