use crate::raw::{
    CollectionRef, KeywordList, NameList, Named, RawDocument, RawMovie,
};
use crate::record::DELIMITER;

/// Top-level fields that play no part in analysis.
const PRUNED: &[&str] = &[
    "adult",
    "imdb_id",
    "original_title",
    "video",
    "homepage",
    "backdrop_path",
    "poster_path",
    "origin_country",
];

/// Remove irrelevant fields from a raw document. Returns the number of
/// fields removed.
pub(super) fn prune(doc: &mut RawDocument) -> usize {
    PRUNED.iter().filter(|&&key| doc.remove(key).is_some()).count()
}

/// Replace every nested list or object with the delimiter joined names it
/// contains.
///
/// After this runs, name lists and keywords are always `Joined` and the
/// collection is always a `Name`. An empty list becomes `None`. The credits
/// stay structured, since several features are derived from them.
pub(super) fn flatten(raw: &mut RawMovie) {
    raw.belongs_to_collection = raw
        .belongs_to_collection
        .take()
        .and_then(|c| match c {
            CollectionRef::Object(named) => named.name,
            CollectionRef::Name(name) => Some(name),
        })
        .map(CollectionRef::Name);
    raw.genres = flatten_list(raw.genres.take());
    raw.production_companies = flatten_list(raw.production_companies.take());
    raw.production_countries = flatten_list(raw.production_countries.take());
    raw.spoken_languages = flatten_list(raw.spoken_languages.take());
    raw.keywords = raw
        .keywords
        .take()
        .and_then(|kws| match kws {
            KeywordList::Items(items) => join_names(&items),
            KeywordList::Wrapped { keywords } => {
                keywords.and_then(|items| join_names(&items))
            }
            KeywordList::Joined(s) => Some(s),
        })
        .map(KeywordList::Joined);
}

fn flatten_list(list: Option<NameList>) -> Option<NameList> {
    list.and_then(|list| match list {
        NameList::Items(items) => join_names(&items),
        NameList::Joined(s) => Some(s),
    })
    .map(NameList::Joined)
}

/// Join the names of the given items in order. Null items and items without
/// a name are skipped, and if nothing is left then there is no value at all.
pub(super) fn join_names(items: &[Option<Named>]) -> Option<String> {
    let names: Vec<&str> = items
        .iter()
        .filter_map(|n| n.as_ref()?.name.as_deref())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(DELIMITER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::parse_documents;

    fn raw(json: &str) -> RawMovie {
        let mut doc = parse_documents(json).unwrap().pop().unwrap();
        prune(&mut doc);
        RawMovie::from_document(doc).unwrap()
    }

    #[test]
    fn prune_ignores_absent_fields() {
        let mut doc = parse_documents(
            r#"{"id": 1, "adult": false, "homepage": "", "title": "A"}"#,
        )
        .unwrap()
        .pop()
        .unwrap();
        assert_eq!(prune(&mut doc), 2);
        assert_eq!(doc.len(), 2);
        assert_eq!(prune(&mut doc), 0);
    }

    #[test]
    fn nested_structures() {
        let mut movie = raw(r#"{
            "belongs_to_collection": {"id": 10, "name": "Star Wars"},
            "genres": [{"id": 1, "name": "Sci-Fi"}, {"name": "Action"}],
            "production_companies": [],
            "spoken_languages": null,
            "keywords": {"keywords": [{"name": "space"}, {"name": "war"}]}
        }"#);
        flatten(&mut movie);
        assert_eq!(
            movie.belongs_to_collection,
            Some(CollectionRef::Name("Star Wars".into()))
        );
        let genres = NameList::Joined("Sci-Fi|Action".into());
        assert_eq!(movie.genres, Some(genres));
        assert_eq!(movie.production_companies, None);
        assert_eq!(movie.spoken_languages, None);
        let keywords = KeywordList::Joined("space|war".into());
        assert_eq!(movie.keywords, Some(keywords));
    }

    #[test]
    fn null_elements_are_skipped() {
        let mut movie = raw(r#"{
            "genres": [null, {"name": "Drama"}, null],
            "production_countries": [null],
            "keywords": {"keywords": [{"name": "heist"}, null]}
        }"#);
        flatten(&mut movie);
        assert_eq!(movie.genres, Some(NameList::Joined("Drama".into())));
        assert_eq!(movie.production_countries, None);
        let keywords = KeywordList::Joined("heist".into());
        assert_eq!(movie.keywords, Some(keywords));
    }

    #[test]
    fn collection_without_name() {
        let mut movie = raw(r#"{"belongs_to_collection": {"id": 10}}"#);
        flatten(&mut movie);
        assert_eq!(movie.belongs_to_collection, None);
    }
}
