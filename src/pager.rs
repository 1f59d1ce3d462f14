// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component K — result pager (spec.md §4.K).

use crate::agg::Value;

/// One emitted output row: one value per projected output column.
pub type Row = Vec<Value>;

/// A group's worth of already-computed output rows, as handed to the
/// pager by the window engine (post-interpolation).
pub struct Group {
    pub rows: Vec<Row>,
}

/// `fetch(max)` contract (spec.md §4.K): remembers `subgroup_idx` and
/// `offset` across calls, skips zero-row groups, and truncates/marks
/// completion once `limit` rows have been emitted.
pub struct Pager {
    groups: Vec<Group>,
    subgroup_idx: usize,
    offset: usize,
    limit: Option<usize>,
    emitted: usize,
    completed: bool,
}

impl Pager {
    #[must_use]
    pub fn new(groups: Vec<Group>, limit: Option<usize>) -> Self {
        Self { groups, subgroup_idx: 0, offset: 0, limit, emitted: 0, completed: false }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns up to `max` rows, advancing `subgroup_idx`/`offset` as it
    /// consumes groups. Zero-row groups are skipped without consuming a
    /// `fetch` call's budget (spec.md §4.K "If a group yields zero rows,
    /// the pager skips it").
    pub fn fetch(&mut self, max: usize) -> Vec<Row> {
        if self.completed {
            return Vec::new();
        }

        let mut out = Vec::with_capacity(max);

        while out.len() < max {
            if let Some(limit) = self.limit {
                if self.emitted >= limit {
                    self.completed = true;
                    break;
                }
            }

            let Some(group) = self.groups.get(self.subgroup_idx) else {
                self.completed = true;
                break;
            };

            if group.rows.is_empty() || self.offset >= group.rows.len() {
                self.subgroup_idx += 1;
                self.offset = 0;
                continue;
            }

            let mut take = max - out.len();
            if let Some(limit) = self.limit {
                take = take.min(limit - self.emitted);
            }
            let available = group.rows.len() - self.offset;
            let take = take.min(available);

            out.extend_from_slice(&group.rows[self.offset..self.offset + take]);
            self.offset += take;
            self.emitted += take;

            if self.offset >= group.rows.len() {
                self.subgroup_idx += 1;
                self.offset = 0;
            }
        }

        if self.subgroup_idx >= self.groups.len() {
            self.completed = true;
        }
        if let Some(limit) = self.limit {
            if self.emitted >= limit {
                self.completed = true;
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(n: usize) -> Group {
        Group { rows: (0..n).map(|i| vec![Value::Int(i as i64)]).collect() }
    }

    #[test]
    fn fetch_paginates_across_groups() {
        let mut pager = Pager::new(vec![group(3), group(2)], None);
        let page1 = pager.fetch(2);
        assert_eq!(page1.len(), 2);
        let page2 = pager.fetch(10);
        assert_eq!(page2.len(), 3);
        assert!(pager.is_completed());
    }

    #[test]
    fn zero_row_groups_are_skipped() {
        let mut pager = Pager::new(vec![group(0), group(1), group(0)], None);
        let page = pager.fetch(10);
        assert_eq!(page.len(), 1);
        assert!(pager.is_completed());
    }

    #[test]
    fn limit_truncates_final_page_and_marks_complete() {
        let mut pager = Pager::new(vec![group(5)], Some(3));
        let page = pager.fetch(10);
        assert_eq!(page.len(), 3);
        assert!(pager.is_completed());
    }

    #[test]
    fn empty_group_list_completes_immediately() {
        let mut pager: Pager = Pager::new(vec![], None);
        assert_eq!(pager.fetch(10), Vec::<Row>::new());
        assert!(pager.is_completed());
    }
}
