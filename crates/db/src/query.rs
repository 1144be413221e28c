//! Soft-delete-aware query builder for status-bearing entities.
//!
//! A [`StatusQuery`] is a plain value: every derivation (`enabled()`,
//! `filter_ids()`, `limit()`, ...) returns a new query carrying all filters
//! of its parent, including the sticky `allow_deleted_in_all` flag.
//!
//! Without that flag a query never returns DELETED rows. [`StatusQuery::deleted`]
//! and [`StatusQuery::include_deleted`] set it, so
//! `deleted().all()` still yields the deleted rows.
//!
//! Queries are executed by [`StatusManager`](crate::StatusManager).

use std::fmt;
use std::marker::PhantomData;

use sqlx::{Postgres, QueryBuilder};
use stitch_core::status::Status;
use stitch_core::types::{CodeId, DbId, Timestamp};

use crate::status_model::StatusModel;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// A bindable value for [`StatusQuery::filter_eq`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Code(CodeId),
    Text(String),
    Bool(bool),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<CodeId> for FilterValue {
    fn from(value: CodeId) -> Self {
        FilterValue::Code(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Status(Status),
    Eq(&'static str, FilterValue),
    IdIn(Vec<DbId>),
    StatusUpdatedBefore(Timestamp),
    /// No row of `child` references this row through `fk`.
    WithoutChildren {
        parent: &'static str,
        child: &'static str,
        fk: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

// ---------------------------------------------------------------------------
// StatusQuery
// ---------------------------------------------------------------------------

/// Filters over the table of `T`. Column names passed to the builder are
/// spliced into SQL and must be compile-time identifiers, never user input.
pub struct StatusQuery<T> {
    conditions: Vec<Condition>,
    allow_deleted_in_all: bool,
    order: Option<(&'static str, Direction)>,
    limit: Option<i64>,
    offset: Option<i64>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for StatusQuery<T> {
    fn clone(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            allow_deleted_in_all: self.allow_deleted_in_all,
            order: self.order,
            limit: self.limit,
            offset: self.offset,
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StatusQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusQuery")
            .field("conditions", &self.conditions)
            .field("allow_deleted_in_all", &self.allow_deleted_in_all)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T> Default for StatusQuery<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StatusQuery<T> {
    /// Every non-deleted row.
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            allow_deleted_in_all: false,
            order: None,
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    /// Whether DELETED rows stay visible through this query.
    pub fn allows_deleted(&self) -> bool {
        self.allow_deleted_in_all
    }

    /// The query itself: non-deleted rows unless derived from
    /// [`deleted`](Self::deleted) or [`include_deleted`](Self::include_deleted).
    pub fn all(&self) -> Self {
        self.clone()
    }

    pub fn enabled(&self) -> Self {
        self.with(Condition::Status(Status::Enabled))
    }

    pub fn suspended(&self) -> Self {
        self.with(Condition::Status(Status::Suspended))
    }

    pub fn archived(&self) -> Self {
        self.with(Condition::Status(Status::Archived))
    }

    /// Only DELETED rows. Sets the sticky flag so later derivations keep them.
    pub fn deleted(&self) -> Self {
        let mut query = self.with(Condition::Status(Status::Deleted));
        query.allow_deleted_in_all = true;
        query
    }

    /// Rows of every status, DELETED included.
    pub fn include_deleted(&self) -> Self {
        let mut query = self.clone();
        query.allow_deleted_in_all = true;
        query
    }

    pub fn filter_ids(&self, ids: impl IntoIterator<Item = DbId>) -> Self {
        self.with(Condition::IdIn(ids.into_iter().collect()))
    }

    pub fn filter_eq(&self, column: &'static str, value: impl Into<FilterValue>) -> Self {
        self.with(Condition::Eq(column, value.into()))
    }

    /// Rows whose last status transition happened strictly before `cutoff`.
    pub fn status_updated_before(&self, cutoff: Timestamp) -> Self {
        self.with(Condition::StatusUpdatedBefore(cutoff))
    }

    pub fn order_by(&self, column: &'static str, direction: Direction) -> Self {
        let mut query = self.clone();
        query.order = Some((column, direction));
        query
    }

    pub fn limit(&self, limit: i64) -> Self {
        let mut query = self.clone();
        query.limit = Some(limit);
        query
    }

    pub fn offset(&self, offset: i64) -> Self {
        let mut query = self.clone();
        query.offset = Some(offset);
        query
    }

    fn with(&self, condition: Condition) -> Self {
        let mut query = self.clone();
        query.conditions.push(condition);
        query
    }

    fn is_windowed(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    /// Push ` WHERE ...` for every filter, or nothing when unfiltered.
    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        let mut first = true;

        if !self.allow_deleted_in_all {
            push_joiner(qb, &mut first);
            qb.push("status <> ").push_bind(Status::Deleted.id());
        }

        for condition in &self.conditions {
            push_joiner(qb, &mut first);
            match condition {
                Condition::Status(status) => {
                    qb.push("status = ").push_bind(status.id());
                }
                Condition::Eq(column, value) => {
                    qb.push(*column).push(" = ");
                    match value {
                        FilterValue::Int(v) => qb.push_bind(*v),
                        FilterValue::Code(v) => qb.push_bind(*v),
                        FilterValue::Text(v) => qb.push_bind(v.clone()),
                        FilterValue::Bool(v) => qb.push_bind(*v),
                    };
                }
                Condition::IdIn(ids) => {
                    qb.push("id = ANY(").push_bind(ids.clone()).push(")");
                }
                Condition::StatusUpdatedBefore(cutoff) => {
                    qb.push("status_update_timestamp < ").push_bind(*cutoff);
                }
                Condition::WithoutChildren { parent, child, fk } => {
                    qb.push(format!(
                        "NOT EXISTS (SELECT 1 FROM {child} WHERE {child}.{fk} = {parent}.id)"
                    ));
                }
            }
        }
    }

    fn push_window(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = self.offset {
            qb.push(" OFFSET ").push_bind(offset);
        }
    }
}

impl<T: StatusModel> StatusQuery<T> {
    /// Rows no row of `child` points at through its `fk` column, whatever
    /// the child's status.
    pub fn without_children(&self, child: &'static str, fk: &'static str) -> Self {
        self.with(Condition::WithoutChildren {
            parent: T::TABLE,
            child,
            fk,
        })
    }

    fn push_order(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" ORDER BY ");
        match self.order {
            Some((column, direction)) => {
                qb.push(column).push(" ").push(direction.sql());
            }
            None => {
                qb.push(T::ORDERING);
            }
        }
    }

    /// Restrict a DELETE/UPDATE to the rows this query selects, honouring
    /// LIMIT/OFFSET through an id subquery.
    fn push_target(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if self.is_windowed() {
            qb.push(" WHERE id IN (SELECT id FROM ").push(T::TABLE);
            self.push_where(qb);
            self.push_order(qb);
            self.push_window(qb);
            qb.push(")");
        } else {
            self.push_where(qb);
        }
    }

    pub(crate) fn select_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", T::COLUMNS, T::TABLE));
        self.push_where(&mut qb);
        self.push_order(&mut qb);
        self.push_window(&mut qb);
        qb
    }

    /// Matching rows, locked for the rest of the transaction.
    pub(crate) fn select_for_update_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = self.select_sql();
        qb.push(" FOR UPDATE");
        qb
    }

    pub(crate) fn select_ids_for_update_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT id FROM {}", T::TABLE));
        self.push_where(&mut qb);
        self.push_order(&mut qb);
        self.push_window(&mut qb);
        qb.push(" FOR UPDATE");
        qb
    }

    pub(crate) fn count_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", T::TABLE));
        if self.is_windowed() {
            qb.push(" WHERE id IN (SELECT id FROM ").push(T::TABLE);
            self.push_where(&mut qb);
            self.push_order(&mut qb);
            self.push_window(&mut qb);
            qb.push(")");
        } else {
            self.push_where(&mut qb);
        }
        qb
    }

    pub(crate) fn delete_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("DELETE FROM {}", T::TABLE));
        self.push_target(&mut qb);
        qb
    }

    /// `UPDATE ... SET <changes> WHERE <filters>`, or `None` when `changes`
    /// assigns nothing.
    pub(crate) fn update_sql(&self, changes: &T::Changes) -> Option<QueryBuilder<'static, Postgres>> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", T::TABLE));
        if push_changes::<T>(&mut qb, changes) == 0 {
            return None;
        }
        self.push_target(&mut qb);
        Some(qb)
    }
}

/// Push ` WHERE ` before the first clause and ` AND ` before the rest.
pub(crate) fn push_joiner(qb: &mut QueryBuilder<'_, Postgres>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

/// `UPDATE ... SET <changes> WHERE id = ANY(ids)`, or `None` when `changes`
/// assigns nothing.
pub(crate) fn update_ids_sql<T: StatusModel>(
    ids: &[DbId],
    changes: &T::Changes,
) -> Option<QueryBuilder<'static, Postgres>> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", T::TABLE));
    if push_changes::<T>(&mut qb, changes) == 0 {
        return None;
    }
    qb.push(" WHERE id = ANY(").push_bind(ids.to_vec()).push(")");
    Some(qb)
}

fn push_changes<T: StatusModel>(
    qb: &mut QueryBuilder<'static, Postgres>,
    changes: &T::Changes,
) -> usize {
    let mut set = Assignments::new(qb);
    changes.push_assignments(&mut set);
    set.len()
}

// ---------------------------------------------------------------------------
// Bulk update field sets
// ---------------------------------------------------------------------------

/// A set of column assignments for a bulk update.
///
/// `status` is never written through [`push_assignments`](Self::push_assignments):
/// status changes go through the per-row save path so they are timestamped
/// and recorded.
pub trait FieldChanges: Send + Sync {
    /// Target status, if the update changes it.
    fn status(&self) -> Option<Status>;

    /// Push every non-status assignment.
    fn push_assignments(&self, set: &mut Assignments<'_>);
}

/// Comma-separated `column = $n` assignments pushed into an UPDATE.
pub struct Assignments<'qb> {
    qb: &'qb mut QueryBuilder<'static, Postgres>,
    count: usize,
}

impl<'qb> Assignments<'qb> {
    fn new(qb: &'qb mut QueryBuilder<'static, Postgres>) -> Self {
        Self { qb, count: 0 }
    }

    pub fn set<V>(&mut self, column: &'static str, value: V) -> &mut Self
    where
        V: 'static + sqlx::Encode<'static, Postgres> + sqlx::Type<Postgres> + Send,
    {
        if self.count > 0 {
            self.qb.push(", ");
        }
        self.qb.push(column).push(" = ").push_bind(value);
        self.count += 1;
        self
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
