//! Coefficient registry
//!
//! Holds the weighting dimensions last loaded from the store and enforces
//! the naming rules before anything is written.

use rtqs_core::{
    check_coefficient, parse_coefficient, CoefficientTable, Dimension, DimensionId, EntityType,
    MoveDirection, NamePolicy, RtqsDimension, RtqsResult, StorageError, ValidationError,
};
use rtqs_storage::{DimensionFilter, DimensionUpdate, RecordStore};
use std::sync::{Arc, RwLock};

/// Input for [`CoefficientRegistry::upsert`]. `id: None` inserts.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionInput {
    pub id: Option<DimensionId>,
    pub name: String,
    pub coefficient: f64,
}

impl DimensionInput {
    pub fn new(name: impl Into<String>, coefficient: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            coefficient,
        }
    }

    pub fn existing(id: DimensionId, name: impl Into<String>, coefficient: f64) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            coefficient,
        }
    }

    /// Build from raw form fields; a malformed coefficient is rejected here.
    pub fn parse(id: Option<DimensionId>, name: &str, coefficient: &str) -> RtqsResult<Self> {
        Ok(Self {
            id,
            name: name.to_string(),
            coefficient: parse_coefficient(coefficient)?,
        })
    }
}

/// Registry of weighting dimensions backed by a [`RecordStore`].
pub struct CoefficientRegistry<S: RecordStore> {
    store: Arc<S>,
    policy: NamePolicy,
    /// Every dimension, active or not, in `(sort_order, created_at)` order
    dimensions: RwLock<Vec<Dimension>>,
}

impl<S: RecordStore> CoefficientRegistry<S> {
    pub fn new(store: Arc<S>, policy: NamePolicy) -> Self {
        Self {
            store,
            policy,
            dimensions: RwLock::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> NamePolicy {
        self.policy
    }

    /// Refetch all dimensions and return the active ones in order.
    pub async fn load(&self) -> RtqsResult<Vec<Dimension>> {
        let all = self.store.dimension_list(DimensionFilter::all()).await?;
        let active: Vec<Dimension> = all.iter().filter(|d| d.is_active).cloned().collect();
        tracing::debug!(
            total = all.len(),
            active = active.len(),
            "Loaded dimensions"
        );
        *self
            .dimensions
            .write()
            .map_err(|_| StorageError::LockPoisoned)? = all;
        Ok(active)
    }

    /// Active and inactive dimensions from the last load.
    pub fn list_all(&self) -> RtqsResult<Vec<Dimension>> {
        Ok(self
            .dimensions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .clone())
    }

    /// Coefficients of the active dimensions from the last load.
    pub fn coefficients(&self) -> RtqsResult<CoefficientTable> {
        let dimensions = self
            .dimensions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(CoefficientTable::from_dimensions(&dimensions))
    }

    /// Canonical form of a dimension name under this registry's policy.
    pub fn normalize_name(&self, raw: &str) -> RtqsResult<String> {
        let trimmed = raw.trim();
        match self.policy {
            NamePolicy::Rtqs => RtqsDimension::from_name(trimmed)
                .map(|d| d.as_str().to_string())
                .ok_or_else(|| {
                    ValidationError::IllegalDimensionName {
                        name: raw.to_string(),
                        allowed: RtqsDimension::ALL
                            .iter()
                            .map(|d| d.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    }
                    .into()
                }),
            NamePolicy::FreeForm if trimmed.is_empty() => Err(ValidationError::InvalidValue {
                field: "name".to_string(),
                reason: "dimension name must not be empty".to_string(),
            }
            .into()),
            NamePolicy::FreeForm => Ok(trimmed.to_string()),
        }
    }

    fn find(&self, id: DimensionId) -> RtqsResult<Dimension> {
        self.dimensions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .iter()
            .find(|d| d.dimension_id == id)
            .cloned()
            .ok_or_else(|| {
                ValidationError::UnknownRecord {
                    entity_type: EntityType::Dimension,
                    id: id.as_uuid(),
                }
                .into()
            })
    }

    fn check_unique(&self, name: &str, except: Option<DimensionId>) -> RtqsResult<()> {
        let dimensions = self
            .dimensions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        let taken = dimensions.iter().any(|d| {
            d.is_active && Some(d.dimension_id) != except && d.name.eq_ignore_ascii_case(name)
        });
        if taken {
            return Err(ValidationError::DuplicateDimension {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Insert a new dimension at the end of the order, or rename and
    /// reweight an existing one. Validation happens before any write.
    pub async fn upsert(&self, input: DimensionInput) -> RtqsResult<Dimension> {
        let name = self.normalize_name(&input.name)?;
        check_coefficient(input.coefficient)?;

        let id = match input.id {
            Some(id) => {
                let existing = self.find(id)?;
                if existing.is_active {
                    self.check_unique(&name, Some(id))?;
                }
                self.store
                    .dimension_update(
                        id,
                        DimensionUpdate {
                            name: Some(name.clone()),
                            coefficient: Some(input.coefficient),
                            ..Default::default()
                        },
                    )
                    .await?;
                tracing::info!(dimension_id = %id, name = %name, coefficient = input.coefficient, "Updated dimension");
                id
            }
            None => {
                self.check_unique(&name, None)?;
                let next_order = self
                    .list_all()?
                    .iter()
                    .map(|d| d.sort_order)
                    .max()
                    .unwrap_or(0)
                    + 1;
                let dimension = Dimension::new(name.clone(), input.coefficient, next_order);
                self.store.dimension_insert(&dimension).await?;
                tracing::info!(
                    dimension_id = %dimension.dimension_id,
                    name = %name,
                    sort_order = next_order,
                    "Created dimension"
                );
                dimension.dimension_id
            }
        };

        self.load().await?;
        self.find(id)
    }

    /// Swap `sort_order` with the neighbour in `direction`. Returns false,
    /// without writing, at either end of the list.
    pub async fn reorder(&self, id: DimensionId, direction: MoveDirection) -> RtqsResult<bool> {
        let all = self.list_all()?;
        let index = all
            .iter()
            .position(|d| d.dimension_id == id)
            .ok_or(ValidationError::UnknownRecord {
                entity_type: EntityType::Dimension,
                id: id.as_uuid(),
            })?;
        let Some(other) = direction.neighbour(index, all.len()) else {
            return Ok(false);
        };

        self.store
            .dimension_swap_order(&all[index], &all[other])
            .await?;
        tracing::info!(dimension_id = %id, ?direction, "Reordered dimension");
        self.load().await?;
        Ok(true)
    }

    /// Activate or deactivate a dimension. Re-activating a name that is
    /// already active elsewhere is rejected.
    pub async fn set_active(&self, id: DimensionId, active: bool) -> RtqsResult<()> {
        let dimension = self.find(id)?;
        if active && !dimension.is_active {
            self.check_unique(&dimension.name, Some(id))?;
        }
        self.store
            .dimension_update(
                id,
                DimensionUpdate {
                    is_active: Some(active),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(dimension_id = %id, active, "Changed dimension activation");
        self.load().await?;
        Ok(())
    }

    /// Delete a dimension. The store removes its task scores.
    pub async fn delete(&self, id: DimensionId) -> RtqsResult<()> {
        self.find(id)?;
        self.store.dimension_delete(id).await?;
        tracing::info!(dimension_id = %id, "Deleted dimension");
        self.load().await?;
        Ok(())
    }
}
