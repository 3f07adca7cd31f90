use std::collections::HashSet;

use log::debug;

use super::{Draft, IngestStats};

/// The only status a movie may have to be kept.
const RELEASED: &str = "released";

/// Remove duplicate, incomplete and unreleased records.
///
/// Duplicates are detected by id, and the first record in input order wins.
/// Records without an id or a title are removed next. Finally, if
/// `filter_status` is set, only records whose status is `Released` (in any
/// letter case) survive. The status is discarded afterwards either way.
///
/// Every removal is counted in `stats`.
pub(super) fn validate(
    drafts: Vec<Draft>,
    filter_status: bool,
    stats: &mut IngestStats,
) -> Vec<Draft> {
    let before = drafts.len();
    let mut seen = HashSet::with_capacity(drafts.len());
    let mut kept = Vec::with_capacity(drafts.len());
    for draft in drafts {
        // Records without an id never collide with each other.
        if let Some(id) = draft.id {
            if !seen.insert(id) {
                stats.duplicates += 1;
                continue;
            }
        }
        kept.push(draft);
    }

    let mut valid = Vec::with_capacity(kept.len());
    for mut draft in kept {
        if draft.id.is_none() || draft.title.is_none() {
            stats.missing_id_or_title += 1;
            continue;
        }
        let status = draft.status.take();
        if filter_status && !is_released(status.as_deref()) {
            stats.unreleased += 1;
            continue;
        }
        valid.push(draft);
    }
    debug!(
        "validation kept {} of {} records ({} duplicates, {} incomplete, \
         {} unreleased)",
        valid.len(),
        before,
        stats.duplicates,
        stats.missing_id_or_title,
        stats.unreleased,
    );
    valid
}

fn is_released(status: Option<&str>) -> bool {
    status.map_or(false, |s| s.trim().eq_ignore_ascii_case(RELEASED))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(
        id: Option<i64>,
        title: Option<&str>,
        status: Option<&str>,
    ) -> Draft {
        Draft {
            id,
            title: title.map(|t| t.to_string()),
            status: status.map(|s| s.to_string()),
            ..Draft::default()
        }
    }

    fn ids(drafts: &[Draft]) -> Vec<Option<i64>> {
        drafts.iter().map(|d| d.id).collect()
    }

    #[test]
    fn first_duplicate_wins() {
        let mut stats = IngestStats::default();
        let got = validate(
            vec![
                draft(Some(1), Some("first"), None),
                draft(Some(2), Some("other"), None),
                draft(Some(1), Some("second"), None),
            ],
            false,
            &mut stats,
        );
        assert_eq!(ids(&got), vec![Some(1), Some(2)]);
        assert_eq!(got[0].title.as_deref(), Some("first"));
        assert_eq!(stats.duplicates, 1);
    }

    #[test]
    fn incomplete_records() {
        let mut stats = IngestStats::default();
        let got = validate(
            vec![
                draft(None, Some("no id"), None),
                draft(None, Some("no id either"), None),
                draft(Some(3), None, None),
                draft(Some(4), Some("ok"), None),
            ],
            false,
            &mut stats,
        );
        assert_eq!(ids(&got), vec![Some(4)]);
        assert_eq!(stats.missing_id_or_title, 3);
        assert_eq!(stats.duplicates, 0);
    }

    #[test]
    fn status_filter() {
        let mut stats = IngestStats::default();
        let drafts = vec![
            draft(Some(1), Some("a"), Some("Released")),
            draft(Some(2), Some("b"), Some("Rumored")),
            draft(Some(3), Some("c"), None),
            draft(Some(4), Some("d"), Some("released")),
        ];
        let got = validate(drafts.clone(), true, &mut stats);
        assert_eq!(ids(&got), vec![Some(1), Some(4)]);
        assert_eq!(stats.unreleased, 2);
        assert!(got.iter().all(|d| d.status.is_none()));

        let mut stats = IngestStats::default();
        let got = validate(drafts, false, &mut stats);
        assert_eq!(got.len(), 4);
        assert_eq!(stats.unreleased, 0);
    }
}
