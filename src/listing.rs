use serde::Serialize;

use crate::status::{CanonicalStatus, Classified};

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Keep the rows whose status is in `selected`. An empty selection keeps
/// everything.
pub fn filter_submissions_by_status<T: Classified + Clone>(
    rows: &[T],
    selected: &[CanonicalStatus],
) -> Vec<T> {
    if selected.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|row| selected.contains(&row.status_key()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
    pub safe_page: usize,
}

/// One-based page window. Out-of-range pages are clamped onto the nearest
/// valid page; an empty input still has one (empty) page.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> PageSlice<T> {
    let page_size = page_size.max(1);
    let total_pages = items.len().div_ceil(page_size).max(1);
    let safe_page = page.clamp(1, total_pages);
    let start = ((safe_page - 1) * page_size).min(items.len());
    let end = (start + page_size).min(items.len());
    PageSlice {
        items: items[start..end].to_vec(),
        total_pages,
        safe_page,
    }
}

/// Parse a comma-separated list of status keys, ignoring blanks.
pub fn parse_status_list(raw: &str) -> Result<Vec<CanonicalStatus>, crate::status::UnknownStatus> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Submission;

    fn sub(state: &str, late: bool) -> Submission {
        let mut s = Submission::missing("w1", "u1");
        s.state = Some(state.to_string());
        s.late = Some(late);
        s
    }

    #[test]
    fn clamps_past_the_last_page() {
        let items: Vec<u32> = (1..=45).collect();
        let page = paginate(&items, 10, 20);
        assert_eq!(page.safe_page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items, vec![41, 42, 43, 44, 45]);
    }

    #[test]
    fn empty_input_has_one_empty_page() {
        let page = paginate::<u32>(&[], 1, 20);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.safe_page, 1);
    }

    #[test]
    fn page_zero_and_size_zero_are_clamped() {
        let items = [1, 2, 3];
        assert_eq!(paginate(&items, 0, 2).items, vec![1, 2]);
        let page = paginate(&items, 2, 0);
        assert_eq!(page.items, vec![2]);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn empty_selection_keeps_all_rows() {
        let rows = vec![sub("TURNED_IN", false), sub("CREATED", false)];
        assert_eq!(filter_submissions_by_status(&rows, &[]).len(), 2);
    }

    #[test]
    fn selection_keeps_matching_rows() {
        let rows = vec![
            sub("TURNED_IN", true),
            sub("CREATED", true),
            sub("CREATED", false),
            sub("NO_SUBMISSION", false),
        ];
        let overdue = filter_submissions_by_status(&rows, &[CanonicalStatus::Overdue]);
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].state.as_deref(), Some("CREATED"));

        let open = filter_submissions_by_status(
            &rows,
            &[CanonicalStatus::Pending, CanonicalStatus::InProgress],
        );
        assert_eq!(open.len(), 2);
    }

    #[test]
    fn status_lists_parse() {
        assert_eq!(
            parse_status_list("completed, overdue,").unwrap(),
            vec![CanonicalStatus::Completed, CanonicalStatus::Overdue]
        );
        assert!(parse_status_list("").unwrap().is_empty());
        assert!(parse_status_list("late").is_err());
    }
}
