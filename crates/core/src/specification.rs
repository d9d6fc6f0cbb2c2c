//! Declarative query descriptors.
//!
//! A `Specification<T>` names *what* to fetch (filter, relations to load,
//! ordering, grouping, paging, execution hints) without saying *how*. The
//! store-side evaluator turns it into an executable plan; domain code only
//! ever composes and hands these around.

use core::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Shareable predicate object over `T`.
///
/// Closure-based rather than an expression tree: combinators compose plain
/// functions, which every backend can run directly.
pub struct Predicate<T: ?Sized>(Arc<dyn Fn(&T) -> bool + Send + Sync>);

impl<T: ?Sized> Predicate<T> {
    pub fn new(f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn test(&self, value: &T) -> bool {
        (self.0)(value)
    }

    pub fn and(self, other: Predicate<T>) -> Predicate<T>
    where
        T: 'static,
    {
        Predicate::new(move |v| self.test(v) && other.test(v))
    }

    pub fn or(self, other: Predicate<T>) -> Predicate<T>
    where
        T: 'static,
    {
        Predicate::new(move |v| self.test(v) || other.test(v))
    }

    pub fn not(self) -> Predicate<T>
    where
        T: 'static,
    {
        Predicate::new(move |v| !self.test(v))
    }
}

impl<T: ?Sized> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> core::fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Comparable value extracted by a sort key.
///
/// Variants are ordered against each other by variant index so mixed
/// extractions still sort deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue {
    Text(String),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

impl Ord for SortValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use SortValue::*;
        match (self, other) {
            (Text(a), Text(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn rank(v: &SortValue) -> u8 {
    match v {
        SortValue::Text(_) => 0,
        SortValue::Int(_) => 1,
        SortValue::Timestamp(_) => 2,
    }
}

/// Extracts the value a result set is ordered by.
pub struct SortKey<T: ?Sized>(Arc<dyn Fn(&T) -> SortValue + Send + Sync>);

impl<T: ?Sized> SortKey<T> {
    pub fn new(f: impl Fn(&T) -> SortValue + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn extract(&self, value: &T) -> SortValue {
        (self.0)(value)
    }
}

impl<T: ?Sized> Clone for SortKey<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Hashable value extracted by a group key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

/// Extracts the value a result set is grouped by.
pub struct GroupKey<T: ?Sized>(Arc<dyn Fn(&T) -> GroupValue + Send + Sync>);

impl<T: ?Sized> GroupKey<T> {
    pub fn new(f: impl Fn(&T) -> GroupValue + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn extract(&self, value: &T) -> GroupValue {
        (self.0)(value)
    }
}

impl<T: ?Sized> Clone for GroupKey<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// A related collection/reference to load alongside the root entity,
/// identified by its relation name (e.g. `"products"`, `"user"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Include {
    path: String,
}

impl Include {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Immutable query descriptor.
///
/// Built once through the builder-style constructors below; afterwards only
/// the accessors are used. At most one ascending and one descending sort key
/// may be set; when both are, evaluation lets the ascending one win.
pub struct Specification<T: ?Sized> {
    criteria: Option<Predicate<T>>,
    includes: Vec<Include>,
    order_by: Option<SortKey<T>>,
    order_by_desc: Option<SortKey<T>>,
    group_by: Option<GroupKey<T>>,
    skip: usize,
    take: usize,
    paging_enabled: bool,
    split_query: bool,
    read_only: bool,
}

impl<T: ?Sized> Specification<T> {
    /// Matches every row.
    pub fn all() -> Self {
        Self {
            criteria: None,
            includes: Vec::new(),
            order_by: None,
            order_by_desc: None,
            group_by: None,
            skip: 0,
            take: 0,
            paging_enabled: false,
            split_query: false,
            read_only: false,
        }
    }

    /// Matches rows satisfying `criteria`.
    pub fn matching(criteria: Predicate<T>) -> Self {
        let mut spec = Self::all();
        spec.criteria = Some(criteria);
        spec
    }

    pub fn including(mut self, relation: impl Into<String>) -> Self {
        self.includes.push(Include::new(relation));
        self
    }

    pub fn ordered_by(mut self, key: SortKey<T>) -> Self {
        self.order_by = Some(key);
        self
    }

    pub fn ordered_by_desc(mut self, key: SortKey<T>) -> Self {
        self.order_by_desc = Some(key);
        self
    }

    pub fn grouped_by(mut self, key: GroupKey<T>) -> Self {
        self.group_by = Some(key);
        self
    }

    /// Enable paging. `skip`/`take` are applied verbatim, after ordering.
    pub fn paged(mut self, skip: usize, take: usize) -> Self {
        self.skip = skip;
        self.take = take;
        self.paging_enabled = true;
        self
    }

    /// Hint: execute relation loads as separate queries.
    pub fn as_split_query(mut self) -> Self {
        self.split_query = true;
        self
    }

    /// Hint: results will not be change-tracked.
    pub fn as_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn criteria(&self) -> Option<&Predicate<T>> {
        self.criteria.as_ref()
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    pub fn order_by(&self) -> Option<&SortKey<T>> {
        self.order_by.as_ref()
    }

    pub fn order_by_desc(&self) -> Option<&SortKey<T>> {
        self.order_by_desc.as_ref()
    }

    pub fn group_by(&self) -> Option<&GroupKey<T>> {
        self.group_by.as_ref()
    }

    pub fn skip(&self) -> usize {
        self.skip
    }

    pub fn take(&self) -> usize {
        self.take
    }

    pub fn is_paging_enabled(&self) -> bool {
        self.paging_enabled
    }

    pub fn is_split_query(&self) -> bool {
        self.split_query
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl<T: ?Sized> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            includes: self.includes.clone(),
            order_by: self.order_by.clone(),
            order_by_desc: self.order_by_desc.clone(),
            group_by: self.group_by.clone(),
            skip: self.skip,
            take: self.take,
            paging_enabled: self.paging_enabled,
            split_query: self.split_query,
            read_only: self.read_only,
        }
    }
}

impl<T: ?Sized> core::fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Specification")
            .field("has_criteria", &self.criteria.is_some())
            .field("includes", &self.includes)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .field("paging_enabled", &self.paging_enabled)
            .field("split_query", &self.split_query)
            .field("read_only", &self.read_only)
            .finish()
    }
}
