//! Regex search over the inventory

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::InventoryError;
use crate::inventory::Inventory;
use crate::kind::Kind;
use crate::model::Entity;

/// Search query builder
///
/// The pattern is compiled once, case-insensitive and unanchored.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    regex: Regex,
    kind: Option<Kind>,
    ids_only: bool,
}

impl SearchQuery {
    /// Compile a search pattern
    ///
    /// # Errors
    /// Returns `InvalidPattern` with the regex engine message if the pattern
    /// does not compile.
    pub fn new(pattern: &str) -> Result<Self, InventoryError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| InventoryError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            regex,
            kind: None,
            ids_only: false,
        })
    }

    /// Restrict the search to one kind
    #[must_use]
    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Match against entity ids only
    #[must_use]
    pub fn ids_only(mut self) -> Self {
        self.ids_only = true;
        self
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Check a single entity
    #[must_use]
    pub fn is_match(&self, entity: &Entity) -> bool {
        if self.ids_only {
            self.regex.is_match(&entity.id)
        } else {
            entity.matches(&self.regex)
        }
    }

    /// Evaluate the query against every entity of the inventory
    #[must_use]
    pub fn run<'a>(&self, inventory: &'a Inventory) -> SearchResults<'a> {
        let candidates: Box<dyn Iterator<Item = &'a Entity> + 'a> = match self.kind {
            Some(kind) => Box::new(inventory.entities(kind)),
            None => Box::new(inventory.all()),
        };

        let mut hits = BTreeMap::new();
        for entity in candidates.filter(|entity| self.is_match(entity)) {
            hits.entry((entity.kind(), entity.id.clone()))
                .or_insert(entity);
        }

        debug!(pattern = %self.pattern(), hits = hits.len(), "search evaluated");
        SearchResults { hits }
    }
}

/// Matched entities, unique and ordered by kind priority then id
#[derive(Debug, Clone, Default)]
pub struct SearchResults<'a> {
    hits: BTreeMap<(Kind, String), &'a Entity>,
}

impl<'a> SearchResults<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a Entity> + '_ {
        self.hits.values().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Hits grouped by kind, both levels in display order
    #[must_use]
    pub fn by_kind(&self) -> BTreeMap<Kind, Vec<&'a Entity>> {
        let mut groups: BTreeMap<Kind, Vec<&'a Entity>> = BTreeMap::new();
        for ((kind, _), entity) in &self.hits {
            groups.entry(*kind).or_default().push(*entity);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::DataSet;
    use serde_json::{Value, json};

    fn insert(data: &mut DataSet, kind: Kind, id: &str, value: Value) {
        let Value::Object(record) = value else {
            unreachable!()
        };
        data.entry(kind).or_default().insert(id.to_string(), record);
    }

    fn inventory() -> Inventory {
        let mut user = DataSet::new();
        let mut source = DataSet::new();
        insert(
            &mut user,
            Kind::Projects,
            "pro-01",
            json!({
                "name": "Clinv",
                "description": "Clinv homepage project",
                "services": ["ser-01"]
            }),
        );
        insert(
            &mut user,
            Kind::Services,
            "ser-01",
            json!({"name": "Clinv homepage", "resources": {"ec2": ["i-0001"]}}),
        );
        insert(
            &mut source,
            Kind::Ec2,
            "i-0001",
            json!({
                "name": "homepage-web",
                "region": "us-east-1",
                "instance_type": "t2.micro",
                "private_ips": ["10.0.1.5"],
                "state": "running",
            }),
        );
        insert(
            &mut source,
            Kind::Ec2,
            "i-0002",
            json!({
                "name": "db",
                "region": "eu-west-1",
                "instance_type": "t3.large",
                "state": "running"
            }),
        );
        Inventory::load(user, source)
    }

    fn ids(results: &SearchResults<'_>) -> Vec<String> {
        results.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_homepage_scenario() {
        let inventory = inventory();
        let results = SearchQuery::new("homepage").unwrap().run(&inventory);

        assert_eq!(ids(&results), vec!["pro-01", "ser-01", "i-0001"]);
        let groups = results.by_kind();
        assert_eq!(
            groups.keys().copied().collect::<Vec<_>>(),
            vec![Kind::Projects, Kind::Services, Kind::Ec2]
        );
    }

    #[test]
    fn test_each_entity_reported_once() {
        let inventory = inventory();
        // matches the id, the name and an ip of i-0001
        let results = SearchQuery::new("i-0001|homepage-web|10\\.0\\.1").unwrap().run(&inventory);
        let hits: Vec<_> = results.iter().filter(|e| e.kind() == Kind::Ec2).collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_deterministic_order() {
        let inventory = inventory();
        let first = ids(&SearchQuery::new(".").unwrap().run(&inventory));
        let second = ids(&SearchQuery::new(".").unwrap().run(&inventory));
        assert_eq!(first, second);
        assert_eq!(first, vec!["pro-01", "ser-01", "i-0001", "i-0002"]);
    }

    #[test]
    fn test_kind_filter_and_ids_only() {
        let inventory = inventory();

        let results = SearchQuery::new("homepage").unwrap().kind(Kind::Ec2).run(&inventory);
        assert_eq!(ids(&results), vec!["i-0001"]);

        let results = SearchQuery::new("homepage").unwrap().ids_only().run(&inventory);
        assert!(results.is_empty());

        let results = SearchQuery::new("^i-").unwrap().ids_only().run(&inventory);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_case_insensitive_region() {
        let inventory = inventory();
        let results = SearchQuery::new("EU-WEST").unwrap().run(&inventory);
        assert_eq!(ids(&results), vec!["i-0002"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = SearchQuery::new("(unclosed").unwrap_err();
        assert!(matches!(err, InventoryError::InvalidPattern(_)));
        assert!(err.is_fatal());
    }
}
