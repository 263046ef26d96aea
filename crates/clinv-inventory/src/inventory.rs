//! Inventory aggregator
//!
//! Owns every entity, the raw data they were built from and the
//! cross-reference index between them. All reports are read-only views over
//! an [`Inventory`]; only [`Inventory::regenerate`] touches storage.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{InventoryError, ReferenceWarning};
use crate::kind::Kind;
use crate::merge::{DataSet, KindData, merge_record, reconcile_source, seed_user_data};
use crate::model::{Details, Entity, Information, MonitorStatus, Service, State};
use crate::registry;
use crate::scoring::{ScoringWeights, ServiceScore, score_service};
use crate::source::SourceRegistry;
use crate::store::Store;

type EntityKey = (Kind, String);

/// Outcome of a regenerate run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerateSummary {
    /// Number of resources fetched per kind
    pub fetched: BTreeMap<Kind, usize>,
    /// Resources that got default user annotations
    pub seeded: usize,
    /// Resources that disappeared from the provider in this run
    pub gone: usize,
    /// Kinds whose adapter failed; their previous data is kept
    pub failed: Vec<(Kind, String)>,
    /// Requested kinds without an adapter
    pub skipped: Vec<Kind>,
    pub finished_at: DateTime<Utc>,
}

/// The reconciled object graph
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    source: DataSet,
    user: DataSet,
    entities: BTreeMap<Kind, BTreeMap<String, Entity>>,
    /// Entity to the entities referencing it
    inbound: BTreeMap<EntityKey, BTreeSet<EntityKey>>,
    failures: Vec<InventoryError>,
    warnings: Vec<ReferenceWarning>,
}

impl Inventory {
    /// Build the graph from user and provider data
    ///
    /// Kinds with broken records are left empty and reported through
    /// [`Inventory::failures`]; the rest of the graph still loads.
    #[must_use]
    pub fn load(user: DataSet, source: DataSet) -> Self {
        let mut inventory = Self {
            source,
            user,
            ..Self::default()
        };
        inventory.rebuild();
        inventory
    }

    /// Load the data files of a store
    ///
    /// # Errors
    /// Returns `Storage` if a data file can't be read or parsed.
    pub fn open(store: &Store) -> Result<Self, InventoryError> {
        Ok(Self::load(store.load_user()?, store.load_source()?))
    }

    // ========================================================================
    // Building
    // ========================================================================

    fn rebuild(&mut self) {
        self.entities.clear();
        self.inbound.clear();
        self.failures.clear();
        self.warnings.clear();

        for kind in Kind::ALL {
            match build_kind(kind, self.source.get(&kind), self.user.get(&kind)) {
                Ok(entities) if entities.is_empty() => {}
                Ok(entities) => {
                    debug!(%kind, count = entities.len(), "kind loaded");
                    self.entities.insert(kind, entities);
                }
                Err(e) => {
                    error!(%kind, error = %e, "failed to load kind");
                    self.failures.push(e);
                }
            }
        }

        self.index_references();
    }

    fn index_references(&mut self) {
        let failed: BTreeSet<Kind> = self.failures.iter().filter_map(failed_kind).collect();
        let mut inbound: BTreeMap<EntityKey, BTreeSet<EntityKey>> = BTreeMap::new();
        let mut warnings = BTreeSet::new();

        for entity in self.all() {
            let from = (entity.kind(), entity.id.clone());
            for (to_kind, to_id) in outbound_references(entity) {
                if self.get(to_kind, to_id).is_some() {
                    inbound
                        .entry((to_kind, to_id.to_string()))
                        .or_default()
                        .insert(from.clone());
                } else if !entity.kind().is_cloud() && !failed.contains(&to_kind) {
                    warnings.insert(ReferenceWarning {
                        from_kind: entity.kind(),
                        from_id: entity.id.clone(),
                        to_kind,
                        to_id: to_id.to_string(),
                    });
                }
            }
        }

        for warning in &warnings {
            warn!(%warning, "dangling reference ignored");
        }
        self.inbound = inbound;
        self.warnings = warnings.into_iter().collect();
    }

    // ========================================================================
    // Regenerate
    // ========================================================================

    /// Refresh provider data for one kind, or all of them, and persist
    ///
    /// Adapters run concurrently. A failing adapter keeps the previously
    /// stored data of its kind. Resources inside the adapter scope that are
    /// missing from a successful fetch are kept and marked terminated, new
    /// ones get default user annotations.
    ///
    /// # Errors
    /// Returns `Storage` if the data files can't be written.
    #[instrument(skip(self, store, sources))]
    pub async fn regenerate(
        &mut self,
        store: &Store,
        sources: &SourceRegistry,
        kind: Option<Kind>,
    ) -> Result<RegenerateSummary, InventoryError> {
        let requested: Vec<Kind> = match kind {
            Some(kind) => vec![kind],
            None => Kind::cloud().collect(),
        };
        info!(kinds = requested.len(), "regenerating inventory");

        let mut skipped = Vec::new();
        let mut fetches = Vec::new();
        for kind in requested {
            match sources.get(kind) {
                Some(adapter) => {
                    let scope = adapter.scope();
                    fetches.push(async move { (kind, scope, adapter.fetch().await) });
                }
                None if registry::spec(kind).source_backed => {
                    warn!(%kind, "no source adapter registered");
                    skipped.push(kind);
                }
                None => debug!(%kind, "kind is maintained by the user"),
            }
        }

        let mut summary = RegenerateSummary {
            fetched: BTreeMap::new(),
            seeded: 0,
            gone: 0,
            failed: Vec::new(),
            skipped,
            finished_at: Utc::now(),
        };

        for (kind, scope, result) in join_all(fetches).await {
            match result {
                Ok(fresh) => {
                    summary.fetched.insert(kind, fresh.len());
                    let previous = self.source.remove(&kind).unwrap_or_default();
                    let (data, gone) = reconcile_source(kind, &scope, &previous, fresh);
                    let user = self.user.entry(kind).or_default();
                    summary.seeded += seed_user_data(kind, &data, user);
                    summary.gone += gone;
                    self.source.insert(kind, data);
                }
                Err(e) => {
                    warn!(
                        %kind,
                        error = %e,
                        retryable = e.is_retryable(),
                        "source fetch failed, keeping previous data"
                    );
                    summary.failed.push((kind, e.to_string()));
                }
            }
        }

        self.rebuild();
        store.save(&self.source, &self.user)?;
        summary.finished_at = Utc::now();

        info!(
            seeded = summary.seeded,
            gone = summary.gone,
            failed = summary.failed.len(),
            "inventory regenerated"
        );
        Ok(summary)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Entities of a kind, ordered by id
    pub fn entities(&self, kind: Kind) -> impl Iterator<Item = &Entity> {
        self.entities.get(&kind).into_iter().flat_map(BTreeMap::values)
    }

    /// Every entity, ordered by (kind, id)
    pub fn all(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().flat_map(BTreeMap::values)
    }

    #[must_use]
    pub fn get(&self, kind: Kind, id: &str) -> Option<&Entity> {
        self.entities.get(&kind).and_then(|entities| entities.get(id))
    }

    /// Like [`Inventory::get`] but failing on missing ids
    ///
    /// # Errors
    /// Returns `NotFound` if the entity does not exist.
    pub fn require(&self, kind: Kind, id: &str) -> Result<&Entity, InventoryError> {
        self.get(kind, id).ok_or_else(|| InventoryError::NotFound {
            kind,
            id: id.to_string(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kinds that failed to load
    #[must_use]
    pub fn failures(&self) -> &[InventoryError] {
        &self.failures
    }

    /// Dangling references found while indexing
    #[must_use]
    pub fn warnings(&self) -> &[ReferenceWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn source_data(&self) -> &DataSet {
        &self.source
    }

    #[must_use]
    pub fn user_data(&self) -> &DataSet {
        &self.user
    }

    /// Entities referencing the given one
    pub fn referrers(&self, kind: Kind, id: &str) -> impl Iterator<Item = &Entity> {
        self.inbound
            .get(&(kind, id.to_string()))
            .into_iter()
            .flatten()
            .filter_map(|(from_kind, from_id)| self.get(*from_kind, from_id))
    }

    /// Services depending on a resource, ordered by id
    #[must_use]
    pub fn services_using(&self, kind: Kind, id: &str) -> Vec<&Entity> {
        self.referrers(kind, id)
            .filter(|entity| entity.kind() == Kind::Services)
            .collect()
    }

    // ========================================================================
    // Derived sets
    // ========================================================================

    /// Live entities no entity of the parent kind references, ordered by id
    ///
    /// EC2 instances owned by an autoscaling group and zone bookkeeping DNS
    /// records are never reported.
    #[must_use]
    pub fn unassigned(&self, kind: Kind) -> Vec<&Entity> {
        let Some(parent) = kind.parent() else {
            return Vec::new();
        };
        let asg_members: BTreeSet<&str> = self
            .entities(Kind::Asg)
            .filter_map(|entity| match &entity.details {
                Details::Asg(asg) => Some(asg.instances.iter().map(String::as_str)),
                _ => None,
            })
            .flatten()
            .collect();

        self.entities(kind)
            .filter(|entity| entity.is_active())
            .filter(|entity| !self.referrers(kind, &entity.id).any(|r| r.kind() == parent))
            .filter(|entity| match &entity.details {
                Details::Ec2(_) => !asg_members.contains(entity.id.as_str()),
                Details::Route53(record) => !record.is_zone_record(),
                _ => true,
            })
            .collect()
    }

    /// Live cloud resources with the given monitor status, ordered by (kind, id)
    #[must_use]
    pub fn by_monitor_status(&self, status: MonitorStatus) -> Vec<&Entity> {
        Kind::cloud()
            .flat_map(|kind| self.entities(kind))
            .filter(|entity| entity.is_active() && entity.monitor_status() == status)
            .collect()
    }

    /// Entities in the active state, optionally restricted to one kind
    #[must_use]
    pub fn active(&self, kind: Option<Kind>) -> Vec<&Entity> {
        match kind {
            Some(kind) => self
                .entities(kind)
                .filter(|e| e.state == State::Active)
                .collect(),
            None => self.all().filter(|e| e.state == State::Active).collect(),
        }
    }

    /// Security groups nothing uses, ignoring the provider `default` groups
    #[must_use]
    pub fn unused_security_groups(&self) -> Vec<&Entity> {
        let mut used: BTreeSet<&str> = BTreeSet::new();
        for entity in self.all() {
            match &entity.details {
                Details::Ec2(ec2) => used.extend(ec2.security_groups.keys().map(String::as_str)),
                Details::Rds(rds) => used.extend(rds.security_groups.iter().map(String::as_str)),
                Details::SecurityGroup(sg) => used.extend(sg.referenced_groups()),
                _ => {}
            }
        }

        self.entities(Kind::SecurityGroups)
            .filter(|entity| entity.is_active())
            .filter(|entity| entity.display_name() != "default")
            .filter(|entity| !used.contains(entity.id.as_str()))
            .collect()
    }

    /// Risk, protection and security scores of a service
    ///
    /// # Errors
    /// Returns `NotFound` if the service does not exist.
    pub fn risk_score(
        &self,
        service_id: &str,
        weights: &ScoringWeights,
    ) -> Result<ServiceScore, InventoryError> {
        let entity = self.require(Kind::Services, service_id)?;
        let Details::Service(service) = &entity.details else {
            return Err(InventoryError::NotFound {
                kind: Kind::Services,
                id: service_id.to_string(),
            });
        };
        let informations = self.informations_of(service);
        Ok(score_service(service, informations, weights))
    }

    fn informations_of<'a>(&'a self, service: &'a Service) -> Vec<&'a Information> {
        let ids: BTreeSet<&str> = service.informations.iter().map(String::as_str).collect();
        ids.into_iter()
            .filter_map(|id| match self.get(Kind::Informations, id).map(|e| &e.details) {
                Some(Details::Information(info)) => Some(info),
                _ => None,
            })
            .collect()
    }
}

fn failed_kind(error: &InventoryError) -> Option<Kind> {
    match error {
        InventoryError::DataIntegrity { kind, .. } => Some(*kind),
        _ => None,
    }
}

fn build_kind(
    kind: Kind,
    source: Option<&KindData>,
    user: Option<&KindData>,
) -> Result<BTreeMap<String, Entity>, InventoryError> {
    let spec = registry::spec(kind);
    let ids: BTreeSet<&String> = source
        .into_iter()
        .flat_map(BTreeMap::keys)
        .chain(user.into_iter().flat_map(BTreeMap::keys))
        .collect();

    let mut entities = BTreeMap::new();
    for id in ids {
        let source_record = source.and_then(|data| data.get(id));
        let user_record = user.and_then(|data| data.get(id));

        if spec.source_backed
            && let Some(record) = source_record
            && let Some(field) = spec.missing_field(record)
        {
            return Err(InventoryError::DataIntegrity {
                kind,
                id: id.clone(),
                message: format!("missing required field `{field}`"),
            });
        }

        let merged = merge_record(kind, id, source_record, user_record);
        entities.insert(id.clone(), Entity::from_record(kind, id, &merged)?);
    }
    Ok(entities)
}

/// References an entity holds to other entities
fn outbound_references(entity: &Entity) -> Vec<(Kind, &str)> {
    fn push<'a>(out: &mut Vec<(Kind, &'a str)>, kind: Kind, ids: &'a [String]) {
        out.extend(ids.iter().map(|id| (kind, id.as_str())));
    }

    let mut out = Vec::new();
    match &entity.details {
        Details::Project(project) => {
            push(&mut out, Kind::Services, &project.services);
            push(&mut out, Kind::Informations, &project.informations);
            push(&mut out, Kind::People, &project.people);
            out.extend(project.responsible.as_deref().map(|id| (Kind::People, id)));
        }
        Details::Service(service) => {
            push(&mut out, Kind::Informations, &service.informations);
            push(&mut out, Kind::Services, &service.dependencies);
            out.extend(service.responsible.as_deref().map(|id| (Kind::People, id)));
            for (key, ids) in &service.resources {
                match key.parse::<Kind>() {
                    Ok(kind) if kind.is_cloud() => push(&mut out, kind, ids),
                    _ => warn!(
                        service = %entity.id,
                        key = %key,
                        "unknown resource kind in service"
                    ),
                }
            }
        }
        Details::Information(info) => {
            out.extend(info.responsible.as_deref().map(|id| (Kind::People, id)));
        }
        Details::Person(person) => {
            out.extend(person.iam_user.as_deref().map(|id| (Kind::IamUsers, id)));
        }
        Details::Ec2(ec2) => {
            out.extend(
                ec2.security_groups
                    .keys()
                    .map(|id| (Kind::SecurityGroups, id.as_str())),
            );
            out.extend(ec2.vpc.as_deref().map(|id| (Kind::Vpc, id)));
        }
        Details::Rds(rds) => {
            push(&mut out, Kind::SecurityGroups, &rds.security_groups);
            out.extend(rds.vpc.as_deref().map(|id| (Kind::Vpc, id)));
        }
        Details::SecurityGroup(sg) => {
            out.extend(sg.referenced_groups().map(|id| (Kind::SecurityGroups, id)));
            out.extend(sg.vpc.as_deref().map(|id| (Kind::Vpc, id)));
        }
        Details::Asg(asg) => push(&mut out, Kind::Ec2, &asg.instances),
        Details::S3(_)
        | Details::Route53(_)
        | Details::IamGroup(_)
        | Details::IamUser(_)
        | Details::Vpc(_) => {}
    }
    out
}
