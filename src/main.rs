use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use lazy_static::lazy_static;
use log::info;
use tmdb_analysis::{
    Aggregator, GroupMetric, MovieCollection, Normalizer, Profiler, Query,
    RankQuery, Ranker, Searcher, Session, SessionConfig, Table,
};

use crate::util::{write_section, write_table, Format};

mod logger;
mod util;

fn main() {
    if let Err(err) = try_main() {
        // A pipe error occurs when the consumer of this process's output has
        // hung up. This is a normal event, and we should quit gracefully.
        if is_pipe_error(&err) {
            process::exit(0);
        }
        eprintln!("{:?}", err);
        process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    logger::init()?;
    log::set_max_level(log::LevelFilter::Info);

    let args = Args::from_matches(&app().get_matches())?;
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let session = Session::new(args.session_config()?)?;
    let normalized = Normalizer::new(&session).load_dir(&args.data_dir)?;
    info!("{}", normalized.stats);

    let movies = normalized.movies;
    let result = session.install(|| args.run(&movies));
    session.shutdown();
    result
}

/// The reports this tool knows how to produce.
const REPORTS: &[&str] = &[
    "summary",
    "profile",
    "revenue",
    "budget",
    "profit",
    "roi",
    "votes",
    "rating",
    "popularity",
    "rank",
    "compare",
    "franchises",
    "directors",
    "franchise",
    "director",
    "search",
    "scifi-willis",
    "uma-tarantino",
    "export",
];

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    data_dir: PathBuf,
    debug: bool,
    format: Format,
    report: String,
    rest: Vec<String>,
    top: usize,
    bottom: Option<usize>,
    metric: Option<String>,
    sort_by: GroupMetric,
    min_movies: usize,
}

impl Args {
    fn from_matches(matches: &clap::ArgMatches) -> anyhow::Result<Args> {
        let data_dir = match matches.value_of_os("data-dir") {
            Some(dir) => PathBuf::from(dir),
            None => anyhow::bail!("no data directory given"),
        };
        let report = match matches.value_of_lossy("report") {
            Some(report) => report.into_owned(),
            None => anyhow::bail!("no report given"),
        };
        let rest = matches
            .values_of_lossy("args")
            .unwrap_or_else(Vec::new);
        let bottom = match matches.value_of_lossy("bottom") {
            None => None,
            Some(n) => Some(n.parse()?),
        };
        Ok(Args {
            config: matches.value_of_os("config").map(PathBuf::from),
            data_dir,
            debug: matches.is_present("debug"),
            format: if matches.is_present("csv") {
                Format::Csv
            } else {
                Format::Text
            },
            report,
            rest,
            top: parse_or(matches, "top", 10)?,
            bottom,
            metric: matches.value_of_lossy("metric").map(|m| m.into_owned()),
            sort_by: match matches.value_of_lossy("sort-by") {
                None => GroupMetric::default(),
                Some(m) => m.parse()?,
            },
            min_movies: parse_or(matches, "min-movies", 1)?,
        })
    }

    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        Ok(match self.config {
            None => SessionConfig::default(),
            Some(ref path) => SessionConfig::from_path(path)?,
        })
    }

    /// Produce the requested report and write it to stdout.
    fn run(&self, movies: &MovieCollection) -> anyhow::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let ranker = Ranker::new(movies);
        let aggregator = Aggregator::new(movies);
        let searcher = Searcher::new(movies);

        match &*self.report {
            "summary" => {
                self.write(&mut out, &Profiler::new(movies).overview())?
            }
            "profile" => self.profile(&mut out, movies)?,
            "revenue" => self.write(
                &mut out,
                &self.ranked(
                    |n| ranker.top_by_revenue(n),
                    |n| ranker.bottom_by_revenue(n),
                ),
            )?,
            "budget" => self.write(
                &mut out,
                &self.ranked(
                    |n| ranker.top_by_budget(n),
                    |n| ranker.bottom_by_budget(n),
                ),
            )?,
            "profit" => self.write(
                &mut out,
                &self.ranked(
                    |n| ranker.top_by_profit(n),
                    |n| ranker.bottom_by_profit(n),
                ),
            )?,
            "roi" => self.write(
                &mut out,
                &self.ranked(
                    |n| ranker.top_by_roi(n),
                    |n| ranker.bottom_by_roi(n),
                ),
            )?,
            "rating" => self.write(
                &mut out,
                &self.ranked(
                    |n| ranker.top_rated(n),
                    |n| ranker.bottom_rated(n),
                ),
            )?,
            "votes" => {
                self.write(&mut out, &self.rank_metric(&ranker, "vote_count"))?
            }
            "popularity" => {
                self.write(&mut out, &self.rank_metric(&ranker, "popularity"))?
            }
            "rank" => {
                let metric = match self.metric {
                    Some(ref metric) => metric,
                    None => anyhow::bail!("the rank report requires --metric"),
                };
                self.write(&mut out, &self.rank_metric(&ranker, metric))?
            }
            "compare" => self.write(
                &mut out,
                &aggregator.compare_franchise_vs_standalone(),
            )?,
            "franchises" => self.write(
                &mut out,
                &aggregator.top_franchises(self.top, self.sort_by),
            )?,
            "directors" => self.write(
                &mut out,
                &aggregator.top_directors(
                    self.top,
                    self.sort_by,
                    self.min_movies,
                ),
            )?,
            "franchise" => {
                let name = self.name("franchise")?;
                self.write(&mut out, &aggregator.franchise_details(&name))?
            }
            "director" => {
                let name = self.name("director")?;
                self.write(&mut out, &aggregator.director_details(&name))?
            }
            "search" => {
                let query: Query = self.rest.join(" ").parse()?;
                info!("search query: {}", query);
                self.write(&mut out, &searcher.search(&query).table())?
            }
            "scifi-willis" => {
                self.write(&mut out, &searcher.scifi_action_bruce_willis())?
            }
            "uma-tarantino" => {
                self.write(&mut out, &searcher.uma_thurman_tarantino())?
            }
            "export" => movies.table().write_csv(&mut out)?,
            unknown => anyhow::bail!("unrecognized report: {}", unknown),
        }
        out.flush()?;
        Ok(())
    }

    fn profile<W: io::Write>(
        &self,
        mut wtr: W,
        movies: &MovieCollection,
    ) -> anyhow::Result<()> {
        let profiler = Profiler::new(movies);
        let sections = vec![
            ("Missing values", profiler.missing_values()),
            ("Numeric summary", profiler.numeric_summary()),
            ("Genres", profiler.genre_counts(tmdb_analysis::TOP_GENRES)),
            (
                "Releases per year",
                profiler.releases_per_year(tmdb_analysis::LATEST_YEARS),
            ),
            ("Correlations", profiler.correlations()),
            ("Data quality", profiler.quality_report()),
        ];
        for (title, table) in sections {
            write_section(&mut wtr, self.format, title, &table)?;
        }
        Ok(())
    }

    /// Rank by one of the canned rankings, flipping to its bottom variant
    /// when `--bottom` is given.
    fn ranked<T, B>(&self, top: T, bottom: B) -> Table
    where
        T: Fn(usize) -> Table,
        B: Fn(usize) -> Table,
    {
        match self.bottom {
            None => top(self.top),
            Some(n) => bottom(n),
        }
    }

    fn rank_metric(&self, ranker: &Ranker<'_>, metric: &str) -> Table {
        let query = match self.bottom {
            None => RankQuery::new(metric).size(self.top),
            Some(n) => RankQuery::new(metric).ascending(true).size(n),
        };
        ranker.rank(&query)
    }

    fn name(&self, report: &str) -> anyhow::Result<String> {
        if self.rest.is_empty() {
            anyhow::bail!("the {} report requires a name", report);
        }
        Ok(self.rest.join(" "))
    }

    fn write<W: io::Write>(
        &self,
        wtr: W,
        table: &Table,
    ) -> anyhow::Result<()> {
        write_table(wtr, self.format, table)
    }
}

fn parse_or(
    matches: &clap::ArgMatches,
    name: &str,
    default: usize,
) -> anyhow::Result<usize> {
    Ok(match matches.value_of_lossy(name) {
        None => default,
        Some(n) => n.parse()?,
    })
}

fn app() -> clap::App<'static, 'static> {
    use clap::{App, AppSettings, Arg};

    lazy_static! {
        // clap wants all of its strings tied to a particular lifetime, so
        // the help text listing the group metrics is built once at runtime.
        static ref SORT_BY_HELP: String = format!(
            "The metric used to order franchise and director groups. \
             One of: {}.",
            GroupMetric::ALL
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }

    App::new("tmdb-analyze")
        .author(clap::crate_authors!())
        .version(clap::crate_version!())
        .max_term_width(100)
        .setting(AppSettings::UnifiedHelpMessage)
        .arg(Arg::with_name("report")
             .required(true)
             .possible_values(REPORTS)
             .help("The report to produce."))
        .arg(Arg::with_name("args")
             .multiple(true)
             .help("The name for the franchise and director reports, or \
                    the query for the search report, e.g., \
                    '{genre:Action} {actor:Bruce Willis} {sort:runtime} \
                    {asc} {size:5}'."))
        .arg(Arg::with_name("data-dir")
             .long("data-dir")
             .env("TMDB_ANALYZE_DATA_DIR")
             .takes_value(true)
             .default_value("data")
             .help("The directory of TMDB JSON documents to analyze."))
        .arg(Arg::with_name("config")
             .long("config")
             .env("TMDB_ANALYZE_CONFIG")
             .takes_value(true)
             .help("A TOML file with session settings: app_name, threads \
                    and top_cast."))
        .arg(Arg::with_name("top")
             .long("top")
             .short("n")
             .takes_value(true)
             .help("The number of rows in ranked reports. Defaults to 10."))
        .arg(Arg::with_name("bottom")
             .long("bottom")
             .takes_value(true)
             .help("Show this many of the lowest ranked rows instead of \
                    the highest."))
        .arg(Arg::with_name("metric")
             .long("metric")
             .takes_value(true)
             .help("The column ranked by the rank report, e.g., runtime."))
        .arg(Arg::with_name("sort-by")
             .long("sort-by")
             .takes_value(true)
             .help(SORT_BY_HELP.as_str()))
        .arg(Arg::with_name("min-movies")
             .long("min-movies")
             .takes_value(true)
             .help("The minimum number of movies a director needs to be \
                    ranked. Defaults to 1."))
        .arg(Arg::with_name("csv")
             .long("csv")
             .help("Write reports as CSV instead of aligned columns."))
        .arg(Arg::with_name("debug")
             .long("debug")
             .help("Show debug messages. Use this when filing bugs."))
}

/// Return true if and only if an I/O broken pipe error exists in the causal
/// chain of the given error.
fn is_pipe_error(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if let Some(ioerr) = cause.downcast_ref::<io::Error>() {
            if ioerr.kind() == io::ErrorKind::BrokenPipe {
                return true;
            }
        }
        if let Some(terr) = cause.downcast_ref::<tmdb_analysis::Error>() {
            use tmdb_analysis::ErrorKind;

            if let ErrorKind::Io { ref err, .. } = *terr.kind() {
                if err.kind() == io::ErrorKind::BrokenPipe {
                    return true;
                }
            }
        }
    }
    false
}
