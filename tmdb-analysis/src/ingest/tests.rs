use std::path::{Path, PathBuf};

use crate::error::ErrorKind;
use crate::raw::parse_documents;
use crate::record::Column;
use crate::session::{Session, SessionConfig};

use super::*;

/// Create an error from a format!-like syntax.
macro_rules! err {
    ($($tt:tt)*) => {
        Box::<dyn std::error::Error>::from(format!($($tt)*))
    }
}

/// A convenient result type alias.
type TestResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// A simple test context that makes it convenient to ingest fixtures.
///
/// Each test context has a session with a small thread pool and a data
/// directory (which starts empty) that fixtures can be written to.
#[derive(Debug)]
pub struct TestContext {
    _tmpdir: TempDir,
    data_dir: PathBuf,
    session: Session,
}

impl TestContext {
    /// Create a new test context with an empty data directory.
    pub fn new() -> TestContext {
        let tmpdir = TempDir::new("tmdb-analysis-test-ingest").unwrap();
        let data_dir = tmpdir.path().to_path_buf();
        let config = SessionConfig { threads: 2, ..SessionConfig::default() };
        let session = Session::new(config).unwrap();
        TestContext { _tmpdir: tmpdir, data_dir, session }
    }

    /// Write a fixture file into the data directory.
    pub fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.data_dir.join(name), contents).unwrap();
    }

    /// Return the path to the data directory for this context.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Return a normalizer tied to this context's session.
    pub fn normalizer(&self) -> Normalizer<'_> {
        Normalizer::new(&self.session)
    }

    /// Normalize the given JSON text directly, without touching the disk.
    pub fn normalize(&self, json: &str) -> Normalized {
        self.normalizer().normalize(parse_documents(json).unwrap())
    }
}

/// A simple wrapper for creating a temporary directory that is automatically
/// deleted when it's dropped.
///
/// We use this in lieu of tempfile because tempfile brings in too many
/// dependencies.
#[derive(Debug)]
pub struct TempDir(PathBuf);

impl Drop for TempDir {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.0).unwrap();
    }
}

impl TempDir {
    /// Create a new empty temporary directory under the system's configured
    /// temporary directory.
    pub fn new(prefix: &str) -> TestResult<TempDir> {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static TRIES: usize = 100;
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let tmpdir = std::env::temp_dir();
        for _ in 0..TRIES {
            let count = COUNTER.fetch_add(1, Ordering::SeqCst);
            let name = format!("{}-{}", std::process::id(), count);
            let path = tmpdir.join(prefix).join(name);
            if path.is_dir() {
                continue;
            }
            std::fs::create_dir_all(&path).map_err(|e| {
                err!("failed to create {}: {}", path.display(), e)
            })?;
            return Ok(TempDir(path));
        }
        Err(err!("failed to create temp dir after {} tries", TRIES))
    }

    /// Return the underlying path to this temporary directory.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

const MOVIES: &str = r#"[
    {
        "id": 1,
        "title": "Test Movie",
        "adult": false,
        "imdb_id": "tt0000001",
        "revenue": 1000000,
        "budget": 500000,
        "genres": [{"id": 28, "name": "Action"},
                   {"id": 12, "name": "Adventure"}],
        "belongs_to_collection": {"id": 5, "name": "Test Collection"},
        "release_date": "2023-01-01",
        "status": "Released",
        "overview": "No Data",
        "credits": {
            "cast": [{"name": "Bruce Willis"}, {"name": "Uma Thurman"}],
            "crew": [{"name": "Someone", "job": "Producer"},
                     {"name": "Quentin Tarantino", "job": "Director"}]
        }
    },
    {
        "id": 2,
        "title": "Bad Movie",
        "adult": false,
        "revenue": 0,
        "budget": 0,
        "genres": [],
        "belongs_to_collection": null,
        "release_date": "2023-01-02",
        "status": "Released"
    }
]"#;

const MOVIES_FULL: &str = r#"[
    {
        "id": 603,
        "title": "The Matrix",
        "tagline": "Welcome to the Real World.",
        "release_date": "1999-03-30",
        "genres": [{"id": 878, "name": "Science Fiction"},
                   {"id": 28, "name": "Action"}],
        "belongs_to_collection": {"id": 2344, "name": "The Matrix Collection"},
        "original_language": "en",
        "budget": 63000000,
        "revenue": 463517383,
        "production_companies": [{"name": "Village Roadshow Pictures"},
                                 {"name": "Groucho II Film Partnership"}],
        "production_countries": [{"iso_3166_1": "US",
                                  "name": "United States of America"}],
        "vote_count": 24524,
        "vote_average": 8.2,
        "popularity": 81.5,
        "runtime": 136,
        "overview": "Set in the 22nd century.",
        "spoken_languages": [{"english_name": "English", "name": "English"}],
        "keywords": {"keywords": [{"name": "saving the world"},
                                  {"name": "artificial intelligence"}]},
        "credits": {
            "cast": [{"name": "Keanu Reeves"}, {"name": "Laurence Fishburne"},
                     {"name": "Carrie-Anne Moss"}],
            "crew": [{"name": "Lana Wachowski", "job": "Director"},
                     {"name": "Joel Silver", "job": "Producer"}]
        }
    },
    {
        "id": 680,
        "title": "Pulp Fiction",
        "tagline": "No Data",
        "release_date": "1994-09-10",
        "genres": [{"name": "Thriller"}, null, {"name": "Crime"}],
        "belongs_to_collection": null,
        "original_language": "en",
        "budget": 8000000,
        "revenue": 0,
        "production_companies": [null],
        "production_countries": [],
        "vote_count": 27000,
        "vote_average": 8.5,
        "popularity": 64.25,
        "runtime": 0,
        "overview": "A burger-loving hit man.",
        "spoken_languages": [{"name": "English"}, {"name": "Español"}],
        "keywords": [{"name": "hitman"}, null],
        "credits": {
            "cast": [null, {"name": "John Travolta"}, {"name": "Uma Thurman"}],
            "crew": [null, {"name": "Quentin Tarantino", "job": "Director"}]
        }
    }
]"#;

#[test]
fn filter_data() {
    let ctx = TestContext::new();
    let got = ctx.normalize(
        r#"[
            {"id": 1, "title": "Good", "status": "Released"},
            {"id": 2, "title": "Rumored", "status": "Rumored"},
            {"id": 1, "title": "Duplicate", "status": "Released"},
            {"id": null, "title": "No ID", "status": "Released"}
        ]"#,
    );
    assert_eq!(got.movies.len(), 1);
    assert_eq!(got.movies.records()[0].id, 1);
    assert_eq!(got.movies.records()[0].title, "Good");
    assert_eq!(got.stats.documents, 4);
    assert_eq!(got.stats.duplicates, 1);
    assert_eq!(got.stats.missing_id_or_title, 1);
    assert_eq!(got.stats.unreleased, 1);
    assert_eq!(got.stats.rows, 1);
}

#[test]
fn full_pipeline() {
    let ctx = TestContext::new();
    let got = ctx.normalize(MOVIES);
    assert_eq!(got.movies.len(), 2);

    let cols = got.movies.columns();
    assert!(!cols.iter().any(|c| c.as_str() == "status"));
    assert!(cols.contains(&Column::CollectionName));
    assert!(cols.contains(&Column::Director));
    assert!(cols.contains(&Column::ReleaseYear));
    // No document carried these, so they are not columns at all.
    assert!(!cols.contains(&Column::Keywords));
    assert!(!cols.contains(&Column::Popularity));

    let first = &got.movies.records()[0];
    assert_eq!(first.collection_name.as_deref(), Some("Test Collection"));
    assert_eq!(first.genres.as_deref(), Some("Action|Adventure"));
    assert_eq!(first.revenue_musd, Some(1.0));
    assert_eq!(first.budget_musd, Some(0.5));
    assert_eq!(first.roi(), Some(100.0));
    assert_eq!(first.overview, None);
    assert_eq!(first.cast.as_deref(), Some("Bruce Willis|Uma Thurman"));
    assert_eq!(first.cast_size, 2);
    assert_eq!(first.director.as_deref(), Some("Quentin Tarantino"));
    assert_eq!(first.crew_size, 2);
    assert_eq!(first.release_year, Some(2023));

    let second = &got.movies.records()[1];
    assert_eq!(second.collection_name, None);
    assert_eq!(second.genres, None);
    assert_eq!(second.budget_musd, None);
    assert_eq!(second.revenue_musd, None);
    assert_eq!(second.roi(), None);
    assert_eq!(second.cast_size, 0);
    assert_eq!(second.director, None);
}

#[test]
fn ids_and_titles_are_sound() {
    let ctx = TestContext::new();
    let got = ctx.normalize(
        r#"[
            {"id": 3, "title": "nan"},
            {"id": 4, "title": "A"},
            {"id": "4", "title": "B"},
            {"title": "C"},
            {"id": 5},
            "garbage",
            {"id": 6, "title": "D", "credits": "not an object"}
        ]"#,
    );
    let ids: Vec<i64> = got.movies.records().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![4]);
    assert_eq!(got.stats.documents, 6);
    assert_eq!(got.stats.malformed, 1);
    assert_eq!(got.stats.duplicates, 1);
    assert_eq!(got.stats.missing_id_or_title, 3);
    assert_eq!(got.stats.rows, 1);
}

#[test]
fn roi_defined_iff_budget_positive() {
    let ctx = TestContext::new();
    let got = ctx.normalize(
        r#"[
            {"id": 1, "title": "a", "budget": 50000000, "revenue": 100000000},
            {"id": 2, "title": "b", "budget": 0, "revenue": 100000000},
            {"id": 3, "title": "c", "budget": -5000000, "revenue": 100000000},
            {"id": 4, "title": "d", "budget": 20000000}
        ]"#,
    );
    for m in got.movies.records() {
        let positive = m.budget_musd.map_or(false, |b| b > 0.0);
        let defined = m.revenue_musd.is_some() && positive;
        assert_eq!(m.roi().is_some(), defined, "movie {}", m.id);
        if let Some(roi) = m.roi() {
            let (r, b) = (m.revenue_musd.unwrap(), m.budget_musd.unwrap());
            assert_eq!(roi, (r - b) / b * 100.0);
        }
    }
    assert_eq!(got.movies.records()[0].roi(), Some(100.0));
}

#[test]
fn null_list_elements_keep_the_record() {
    let ctx = TestContext::new();
    let got = ctx.normalize(
        r#"[
            {"id": 1, "title": "X",
             "genres": [{"id": 1, "name": "Drama"}, null]},
            {"id": 2, "title": "Y", "credits": {"cast": [null], "crew": []}}
        ]"#,
    );
    assert_eq!(got.stats.malformed, 0);
    assert_eq!(got.movies.len(), 2);

    let x = &got.movies.records()[0];
    assert_eq!(x.genres.as_deref(), Some("Drama"));

    let y = &got.movies.records()[1];
    assert_eq!(y.cast, None);
    assert_eq!(y.cast_size, 1);
    assert_eq!(y.director, None);
    assert_eq!(y.crew_size, 0);
}

#[test]
fn every_canonical_column() {
    let ctx = TestContext::new();
    let got = ctx.normalize(MOVIES_FULL);
    assert_eq!(got.movies.columns(), &Column::CANONICAL[..]);
    assert_eq!(got.stats.malformed, 0);
    assert_eq!(got.movies.len(), 2);

    let matrix = &got.movies.records()[0];
    assert_eq!(matrix.genres.as_deref(), Some("Action|Science Fiction"));
    assert_eq!(matrix.budget_musd, Some(63.0));
    assert_eq!(matrix.spoken_languages.as_deref(), Some("English"));
    assert_eq!(
        matrix.keywords.as_deref(),
        Some("saving the world|artificial intelligence")
    );
    assert_eq!(matrix.director.as_deref(), Some("Lana Wachowski"));
    assert_eq!(matrix.release_year, Some(1999));

    let pulp = &got.movies.records()[1];
    assert_eq!(pulp.tagline, None);
    assert_eq!(pulp.genres.as_deref(), Some("Crime|Thriller"));
    assert_eq!(pulp.revenue_musd, None);
    assert_eq!(pulp.runtime, None);
    assert_eq!(pulp.production_companies, None);
    assert_eq!(pulp.production_countries, None);
    assert_eq!(pulp.keywords.as_deref(), Some("hitman"));
    assert_eq!(pulp.cast.as_deref(), Some("John Travolta|Uma Thurman"));
    assert_eq!(pulp.cast_size, 3);
    assert_eq!(pulp.director.as_deref(), Some("Quentin Tarantino"));
    assert_eq!(pulp.crew_size, 2);
}

#[test]
fn renormalize_is_idempotent() {
    let ctx = TestContext::new();
    for fixture in &[MOVIES, MOVIES_FULL] {
        let once = ctx.normalize(fixture);
        let twice = ctx.normalizer().renormalize(&once.movies);
        assert_eq!(twice.movies.columns(), once.movies.columns());
        assert_eq!(twice.movies, once.movies);
        assert_eq!(twice.stats.rows, once.stats.rows);
        assert_eq!(twice.stats.malformed, 0);
        assert_eq!(twice.stats.duplicates, 0);
    }
}

#[test]
fn load_dir_in_file_order() {
    let ctx = TestContext::new();
    ctx.write("b.json", r#"{"id": 1, "title": "from b"}"#);
    ctx.write("a.json", "{\n  \"id\": 1,\n  \"title\": \"from a\"\n}\n");
    ctx.write("c.json", "{ not json");
    ctx.write("notes.txt", r#"{"id": 2, "title": "ignored"}"#);

    let got = ctx.normalizer().load_dir(ctx.data_dir()).unwrap();
    assert_eq!(got.stats.files, 3);
    assert_eq!(got.stats.malformed, 1);
    assert_eq!(got.stats.duplicates, 1);
    assert_eq!(got.movies.len(), 1);
    assert_eq!(got.movies.records()[0].title, "from a");
}

#[test]
fn missing_input_is_fatal() {
    let ctx = TestContext::new();
    let err = ctx.normalizer().load_dir(ctx.data_dir()).unwrap_err();
    match *err.kind() {
        ErrorKind::NoInput(_) => {}
        ref kind => panic!("unexpected error: {}", kind),
    }

    let missing = ctx.data_dir().join("nope");
    let err = ctx.normalizer().load_dir(&missing).unwrap_err();
    match *err.kind() {
        ErrorKind::NoInput(ref path) => assert_eq!(path, &missing),
        ref kind => panic!("unexpected error: {}", kind),
    }
}
