//! Ordering and offset pagination of root comments.
//!
//! Only roots are paginated; replies always come back whole with their root.

use crate::models::comment::{Comment, SortKey, SortOrder};

/// Stable-sorts `roots` by `key` in `order`. Equal keys keep their input order.
pub fn sort_roots(roots: &mut [Comment], key: SortKey, order: SortOrder) {
    match order {
        SortOrder::Asc => roots.sort_by(|a, b| key.of(a).cmp(&key.of(b))),
        SortOrder::Desc => roots.sort_by(|a, b| key.of(b).cmp(&key.of(a))),
    }
}

/// Returns the `[start, start + page_size)` window of `items` for a 1-based `page`,
/// clipped to the list. A window past the end is empty.
pub fn page_slice<T>(items: Vec<T>, page: i64, page_size: i64) -> Vec<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);

    let start = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
    let len = usize::try_from(page_size).unwrap_or(usize::MAX);

    items.into_iter().skip(start).take(len).collect()
}

/// Sorts then slices: the root selection step of every forest read.
pub fn select_roots(
    mut roots: Vec<Comment>,
    key: SortKey,
    order: SortOrder,
    page: i64,
    page_size: i64,
) -> Vec<Comment> {
    sort_roots(&mut roots, key, order);
    page_slice(roots, page, page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn root(id: i64, created_minute: i64, updated_minute: i64) -> Comment {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        Comment {
            id,
            parent_id: None,
            content: format!("root {id}"),
            created_at: base + Duration::minutes(created_minute),
            updated_at: base + Duration::minutes(updated_minute),
        }
    }

    fn ids(roots: &[Comment]) -> Vec<i64> {
        roots.iter().map(|r| r.id).collect()
    }

    fn ten_roots() -> Vec<Comment> {
        (1..=10).map(|i| root(i, i, 100 - i)).collect()
    }

    #[test]
    fn first_default_page_returns_all_ten() {
        let page = select_roots(ten_roots(), SortKey::CreatedAt, SortOrder::Desc, 1, 50);

        assert_eq!(ids(&page), vec![10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn second_page_of_five_returns_roots_six_to_ten() {
        let page = select_roots(ten_roots(), SortKey::CreatedAt, SortOrder::Asc, 2, 5);

        assert_eq!(ids(&page), vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = select_roots(ten_roots(), SortKey::CreatedAt, SortOrder::Asc, 3, 5);
        assert!(page.is_empty());

        let page = select_roots(ten_roots(), SortKey::CreatedAt, SortOrder::Asc, i64::MAX, 50);
        assert!(page.is_empty());
    }

    #[test]
    fn last_page_is_clipped() {
        let page = select_roots(ten_roots(), SortKey::CreatedAt, SortOrder::Asc, 3, 4);

        assert_eq!(ids(&page), vec![9, 10]);
    }

    #[test]
    fn sorts_by_modification_time() {
        let page = select_roots(ten_roots(), SortKey::UpdatedAt, SortOrder::Asc, 1, 3);

        assert_eq!(ids(&page), vec![10, 9, 8]);
    }

    #[test]
    fn ties_keep_input_order_in_both_directions() {
        let roots = vec![root(1, 5, 0), root(2, 5, 0), root(3, 1, 0), root(4, 5, 0)];

        let desc = select_roots(roots.clone(), SortKey::CreatedAt, SortOrder::Desc, 1, 50);
        let asc = select_roots(roots, SortKey::CreatedAt, SortOrder::Asc, 1, 50);

        assert_eq!(ids(&desc), vec![1, 2, 4, 3]);
        assert_eq!(ids(&asc), vec![3, 1, 2, 4]);
    }
}
