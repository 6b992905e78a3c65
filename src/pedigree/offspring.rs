//! Direct offspring lookup

use crate::domain::{Animal, AnimalId, Gender};
use crate::storage::{AnimalStore, ChildQuery, Page, MAX_OFFSET};

use super::{Limits, PedigreeError};

/// Filters and paging for a child query
#[derive(Debug, Clone, Default)]
pub struct ChildFilter {
    pub gender: Option<Gender>,
    pub breeder: Option<String>,
    /// Page size; the configured default when `None`
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Returns one page of the animals whose sire or dam is `id`
///
/// An unknown `id` is not an error: it simply has no children.
pub fn find_children<S: AnimalStore + ?Sized>(
    store: &S,
    id: &AnimalId,
    filter: &ChildFilter,
    limits: &Limits,
) -> Result<Page<Animal>, PedigreeError> {
    let limit = filter.limit.unwrap_or(limits.default_children_limit);
    if limit == 0 || limit > limits.max_children_limit {
        return Err(PedigreeError::InvalidLimit {
            limit,
            max: limits.max_children_limit,
        });
    }

    if filter.offset > MAX_OFFSET {
        return Err(PedigreeError::InvalidOffset {
            offset: filter.offset,
            max: MAX_OFFSET,
        });
    }

    let query = ChildQuery {
        parent: id.clone(),
        gender: filter.gender,
        breeder: filter.breeder.clone(),
        limit,
        offset: filter.offset,
    };

    Ok(store.find_children(&query)?)
}
