//! Read-only views over the inventory

use clinv_inventory::{
    Entity, Inventory, Kind, MonitorStatus, ScoringWeights, SearchQuery, State,
};
use tracing::{debug, instrument};

use crate::dump::entity_sheets;
use crate::error::ReportError;
use crate::sheet::Sheet;

/// `ID, Name` table of entities, kept in the given order
#[must_use]
pub fn labels<'a>(title: &str, entities: impl IntoIterator<Item = &'a Entity>) -> Sheet {
    entities
        .into_iter()
        .fold(Sheet::new(title, &["ID", "Name"]), |sheet, entity| {
            let (id, name) = entity.short_label();
            sheet.with_row(vec![id.to_string(), name.to_string()])
        })
}

/// Like [`labels`] with an extra `Type` column, for rows mixing kinds
fn typed_labels<'a>(title: &str, entities: impl IntoIterator<Item = &'a Entity>) -> Sheet {
    entities
        .into_iter()
        .fold(Sheet::new(title, &["ID", "Name", "Type"]), |sheet, entity| {
            let (id, name) = entity.short_label();
            sheet.with_row(vec![
                id.to_string(),
                name.to_string(),
                entity.kind().as_str().to_string(),
            ])
        })
}

/// Label sheet of a view that may be restricted to one kind
fn kind_labels<'a>(kind: Option<Kind>, entities: impl IntoIterator<Item = &'a Entity>) -> Sheet {
    match kind {
        Some(_) => labels("", entities),
        None => typed_labels("", entities),
    }
}

fn kinds(kind: Option<Kind>) -> Vec<Kind> {
    kind.map_or_else(|| Kind::ALL.to_vec(), |kind| vec![kind])
}

/// Entities of one kind, or of every kind, ordered by kind then id
///
/// Terminated services are left out unless `include_terminated` is set.
#[must_use]
pub fn list(inventory: &Inventory, kind: Option<Kind>, include_terminated: bool) -> Sheet {
    let entities = kinds(kind)
        .into_iter()
        .flat_map(|kind| inventory.entities(kind))
        .filter(|entity| {
            include_terminated
                || entity.kind() != Kind::Services
                || entity.state != State::Terminated
        });
    kind_labels(kind, entities)
}

/// Entities in the active state
#[must_use]
pub fn active(inventory: &Inventory, kind: Option<Kind>) -> Sheet {
    kind_labels(kind, inventory.active(kind))
}

/// Live resources nothing owns
///
/// Without a kind every kind that has an owner kind is reported.
#[must_use]
pub fn unassigned(inventory: &Inventory, kind: Option<Kind>) -> Sheet {
    let entities: Vec<&Entity> = kinds(kind)
        .into_iter()
        .filter(|kind| kind.parent().is_some())
        .flat_map(|kind| inventory.unassigned(kind))
        .collect();
    debug!(count = entities.len(), "unassigned entities");
    kind_labels(kind, entities)
}

/// Live cloud resources with the given monitor status
#[must_use]
pub fn monitor(inventory: &Inventory, status: MonitorStatus) -> Sheet {
    typed_labels("", inventory.by_monitor_status(status))
}

/// Security groups nothing uses
#[must_use]
pub fn unused(inventory: &Inventory) -> Sheet {
    labels("Unused Security Groups", inventory.unused_security_groups())
}

/// Entities matching a search pattern, in search order
///
/// # Errors
/// Returns the inventory `InvalidPattern` error if the pattern doesn't compile.
#[instrument(skip(inventory))]
pub fn search(
    inventory: &Inventory,
    pattern: &str,
    kind: Option<Kind>,
) -> Result<Sheet, ReportError> {
    let mut query = SearchQuery::new(pattern)?;
    if let Some(kind) = kind {
        query = query.kind(kind);
    }
    let results = query.run(inventory);
    Ok(kind_labels(kind, results.iter()))
}

/// Result of a print request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Printout {
    /// Field dumps of every matching entity
    Found(Vec<Sheet>),
    /// No entity id matched the pattern
    NothingFound,
}

impl Printout {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Printout::NothingFound)
    }
}

/// Full field dump of every entity whose id matches `pattern`
///
/// # Errors
/// Returns the inventory `InvalidPattern` error if the pattern doesn't compile.
#[instrument(skip(inventory))]
pub fn print(
    inventory: &Inventory,
    pattern: &str,
    kind: Option<Kind>,
) -> Result<Printout, ReportError> {
    let mut query = SearchQuery::new(pattern)?.ids_only();
    if let Some(kind) = kind {
        query = query.kind(kind);
    }
    let results = query.run(inventory);
    if results.is_empty() {
        return Ok(Printout::NothingFound);
    }
    Ok(Printout::Found(
        results
            .iter()
            .flat_map(|entity| entity_sheets(inventory, entity))
            .collect(),
    ))
}

/// Risk, protection and security score of one service or of every live one
///
/// # Errors
/// Returns `NotFound` if the requested service doesn't exist.
pub fn score(
    inventory: &Inventory,
    weights: &ScoringWeights,
    service: Option<&str>,
) -> Result<Sheet, ReportError> {
    let services: Vec<&Entity> = match service {
        Some(id) => vec![inventory.require(Kind::Services, id)?],
        None => inventory
            .entities(Kind::Services)
            .filter(|entity| entity.state != State::Terminated)
            .collect(),
    };

    let mut sheet = Sheet::new(
        "Service scores",
        &["ID", "Name", "Risk", "Protection", "Security"],
    );
    for entity in services {
        let score = inventory.risk_score(&entity.id, weights)?;
        sheet.push(vec![
            entity.id.clone(),
            entity.display_name().to_string(),
            score.risk.to_string(),
            score.protection.to_string(),
            score.security.to_string(),
        ]);
    }
    Ok(sheet)
}
