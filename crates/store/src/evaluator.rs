//! Turns a `Specification<T>` into an executable plan.

use std::collections::HashSet;

use shopkeep_core::specification::{GroupValue, Include, Predicate, SortKey, Specification};

/// Stateless planner. Evaluation is pure: the same specification over the
/// same rows always yields the same result.
pub struct SpecificationEvaluator;

impl SpecificationEvaluator {
    pub fn evaluate<T>(spec: &Specification<T>) -> QueryPlan<T> {
        QueryPlan {
            base_filter: None,
            criteria: spec.criteria().cloned(),
            includes: spec.includes().to_vec(),
            order_by: spec.order_by().cloned(),
            order_by_desc: spec.order_by_desc().cloned(),
            group_by: spec.group_by().cloned(),
            skip: spec.skip(),
            take: spec.take(),
            paging_enabled: spec.is_paging_enabled(),
            split_query: spec.is_split_query(),
            read_only: spec.is_read_only(),
        }
    }
}

/// An executable query over an in-memory row set.
///
/// Stages run in a fixed order regardless of how the specification was
/// built: filter, includes, ordering, grouping, paging, then execution
/// hints. Includes and the read-mode/split-query flags are recorded for the
/// backend; they never change which rows come back.
pub struct QueryPlan<T> {
    /// Backend-level filter (e.g. the repository's soft-delete exclusion),
    /// applied before the specification's own criteria.
    base_filter: Option<Predicate<T>>,
    criteria: Option<Predicate<T>>,
    includes: Vec<Include>,
    order_by: Option<SortKey<T>>,
    order_by_desc: Option<SortKey<T>>,
    group_by: Option<shopkeep_core::specification::GroupKey<T>>,
    skip: usize,
    take: usize,
    paging_enabled: bool,
    split_query: bool,
    read_only: bool,
}

impl<T> QueryPlan<T> {
    /// Prepend a backend-level filter to the plan.
    pub fn with_base_filter(mut self, filter: Predicate<T>) -> Self {
        self.base_filter = Some(filter);
        self
    }

    /// Relations the backend should load alongside the roots. Duplicates
    /// are harmless and preserved as recorded.
    pub fn include_hints(&self) -> &[Include] {
        &self.includes
    }

    pub fn is_split_query(&self) -> bool {
        self.split_query
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Run the plan over `rows`.
    pub fn run(&self, rows: Vec<T>) -> Vec<T> {
        let mut rows: Vec<T> = rows
            .into_iter()
            .filter(|r| self.base_filter.as_ref().is_none_or(|f| f.test(r)))
            .filter(|r| self.criteria.as_ref().is_none_or(|f| f.test(r)))
            .collect();

        // Ascending wins when both orderings are set.
        if let Some(key) = &self.order_by {
            rows.sort_by(|a, b| key.extract(a).cmp(&key.extract(b)));
        } else if let Some(key) = &self.order_by_desc {
            rows.sort_by(|a, b| key.extract(b).cmp(&key.extract(a)));
        }

        if let Some(key) = &self.group_by {
            rows = flatten_groups(rows, |r| key.extract(r));
        }

        if self.paging_enabled {
            rows = rows.into_iter().skip(self.skip).take(self.take).collect();
        }

        rows
    }
}

/// Regroup rows by key, then flatten groups back to a flat list in
/// first-seen group order. Within a group the incoming order is kept.
fn flatten_groups<T>(rows: Vec<T>, key: impl Fn(&T) -> GroupValue) -> Vec<T> {
    let mut order: Vec<GroupValue> = Vec::new();
    let mut seen: HashSet<GroupValue> = HashSet::new();
    let mut groups: std::collections::HashMap<GroupValue, Vec<T>> =
        std::collections::HashMap::new();

    for row in rows {
        let k = key(&row);
        if seen.insert(k.clone()) {
            order.push(k.clone());
        }
        groups.entry(k).or_default().push(row);
    }

    let mut out = Vec::new();
    for k in order {
        if let Some(group) = groups.remove(&k) {
            out.extend(group);
        }
    }
    out
}
