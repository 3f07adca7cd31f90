use chrono::Datelike;

use crate::record::{MovieRecord, DELIMITER};

use super::flatten::join_names;
use super::Draft;

/// The crew job that identifies a director.
const DIRECTOR: &str = "Director";

/// The token some sources use for a missing value.
const NAN: &str = "nan";

/// Derive the credits and date features of a movie.
///
/// When the credits are present, the cast is the first `top_cast` names in
/// billing order, the director is the first crew member whose job is
/// `Director` and the sizes count every entry. A `null` entry still takes
/// its billing slot and counts toward the size, but contributes no name.
/// Without credits, whatever values the input already carried for these
/// fields are kept. Finally, every text field that is literally `nan`
/// becomes unknown.
pub(super) fn engineer(draft: &mut Draft, top_cast: usize) {
    let movie = &mut draft.movie;
    if let Some(credits) = draft.credits.take() {
        let cast = credits.cast.unwrap_or_default();
        let crew = credits.crew.unwrap_or_default();
        let top = &cast[..cast.len().min(top_cast)];
        movie.cast = join_names(top);
        movie.cast_size = cast.len() as i64;
        movie.director = crew
            .iter()
            .flatten()
            .find(|c| c.job.as_deref() == Some(DIRECTOR))
            .and_then(|c| c.name.clone());
        movie.crew_size = crew.len() as i64;
    }
    if let Some(date) = movie.release_date {
        movie.release_year = Some(date.year());
    }

    null_nan(&mut draft.title);
    for field in text_fields(movie) {
        null_nan(field);
    }
}

/// Sort the genre names of a movie alphabetically, dropping repeats.
pub(super) fn sort_genres(draft: &mut Draft) {
    let genres = match draft.movie.genres.take() {
        None => return,
        Some(genres) => genres,
    };
    let mut names: Vec<&str> =
        genres.split(DELIMITER).filter(|g| !g.is_empty()).collect();
    names.sort();
    names.dedup();
    if !names.is_empty() {
        draft.movie.genres = Some(names.join(DELIMITER));
    }
}

/// Turn a draft into a canonical record, or `None` if it lost its id or
/// title along the way.
pub(super) fn finalize(draft: Draft) -> Option<MovieRecord> {
    let (id, title) = (draft.id?, draft.title?);
    Some(MovieRecord { id, title, ..draft.movie })
}

fn null_nan(field: &mut Option<String>) {
    if field.as_deref().map_or(false, |s| s.trim() == NAN) {
        *field = None;
    }
}

fn text_fields(movie: &mut MovieRecord) -> Vec<&mut Option<String>> {
    vec![
        &mut movie.tagline,
        &mut movie.genres,
        &mut movie.collection_name,
        &mut movie.original_language,
        &mut movie.production_companies,
        &mut movie.production_countries,
        &mut movie.overview,
        &mut movie.spoken_languages,
        &mut movie.cast,
        &mut movie.director,
        &mut movie.keywords,
    ]
}
