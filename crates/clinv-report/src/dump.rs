//! Full field dump of a single entity

use clinv_inventory::model::SecurityRule;
use clinv_inventory::{Details, Entity, Inventory};

use crate::sheet::{Sheet, flag, joined};

/// Non-empty `(field, value)` pairs of an entity
#[derive(Default)]
struct Fields(Vec<(String, String)>);

impl Fields {
    fn text(&mut self, label: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.0.push((label.to_string(), value.to_string()));
        }
        self
    }

    fn list<S: AsRef<str>>(&mut self, label: &str, values: &[S]) -> &mut Self {
        if !values.is_empty() {
            self.0.push((label.to_string(), joined(values)));
        }
        self
    }

    fn number<N: ToString>(&mut self, label: &str, value: Option<N>) -> &mut Self {
        if let Some(value) = value {
            self.0.push((label.to_string(), value.to_string()));
        }
        self
    }
}

/// Attribute sheet of an entity, followed by one sheet per rule list
pub(crate) fn entity_sheets(inventory: &Inventory, entity: &Entity) -> Vec<Sheet> {
    let mut fields = Fields::default();
    fields
        .text("ID", Some(entity.id.as_str()))
        .text("Name", entity.name.as_deref())
        .text("Description", entity.description.as_deref())
        .text("State", Some(entity.state.as_str()));

    if let Some(annotations) = &entity.annotations {
        fields
            .text("To destroy", Some(flag(annotations.to_destroy).as_str()))
            .text("Environment", annotations.environment.as_deref())
            .text("Monitor", Some(annotations.monitor.as_str()));
    }

    let mut rules = Vec::new();
    match &entity.details {
        Details::Project(project) => {
            fields
                .list("Aliases", &project.aliases)
                .text("Responsible", project.responsible.as_deref())
                .list("Services", &project.services)
                .list("Informations", &project.informations)
                .list("People", &project.people);
            for (name, url) in &project.links {
                fields.text(&format!("Link {name}"), Some(url.as_str()));
            }
        }
        Details::Service(service) => {
            fields
                .list("Aliases", &service.aliases)
                .text("Access", Some(service.access.as_str()))
                .text(
                    "Authentication",
                    service.authentication.as_ref().map(|a| a.method.as_str()),
                )
                .text(
                    "Second factor",
                    service
                        .authentication
                        .as_ref()
                        .map(|a| if a.second_factor { "yes" } else { "no" }),
                )
                .text("Responsible", service.responsible.as_deref())
                .list("Informations", &service.informations)
                .list("Dependencies", &service.dependencies)
                .text("Environment", service.environment.as_deref());
            for (kind, ids) in &service.resources {
                fields.list(&format!("Resources {kind}"), ids);
            }
        }
        Details::Information(information) => {
            fields
                .text("Personal data", Some(if information.personal_data { "yes" } else { "no" }))
                .text("Responsible", information.responsible.as_deref());
        }
        Details::Person(person) => {
            fields
                .text("Email", person.email.as_deref())
                .text("IAM user", person.iam_user.as_deref());
        }
        Details::Ec2(ec2) => {
            let groups: Vec<String> = ec2
                .security_groups
                .iter()
                .map(|(id, name)| format!("{id} ({name})"))
                .collect();
            fields
                .text("Region", ec2.region.as_deref())
                .text("Type", ec2.instance_type.as_deref())
                .list("Private IPs", &ec2.private_ips)
                .list("Public IPs", &ec2.public_ips)
                .list("Security groups", &groups)
                .text("VPC", ec2.vpc.as_deref())
                .text("State reason", ec2.state_reason.as_deref())
                .number("Launch time", ec2.launch_time.map(|t| t.to_rfc3339()));
        }
        Details::Rds(rds) => {
            fields
                .text("Region", rds.region.as_deref())
                .text("Engine", rds.engine.as_deref())
                .text("Engine version", rds.engine_version.as_deref())
                .text("Class", rds.instance_class.as_deref())
                .text("Endpoint", rds.endpoint.as_deref())
                .list("Security groups", &rds.security_groups)
                .text("VPC", rds.vpc.as_deref())
                .text("ARN", rds.arn.as_deref());
        }
        Details::S3(bucket) => {
            fields
                .text("Region", bucket.region.as_deref())
                .text("Read permissions", bucket.permissions.read.as_deref())
                .text("Write permissions", bucket.permissions.write.as_deref())
                .text("Desired read permissions", bucket.desired_permissions.read.as_deref())
                .text("Desired write permissions", bucket.desired_permissions.write.as_deref())
                .number("Created", bucket.created.map(|t| t.to_rfc3339()));
        }
        Details::Route53(record) => {
            fields
                .text("Type", record.record_type.as_deref())
                .list("Values", &record.values)
                .text("Zone", record.hosted_zone.name.as_deref())
                .text("Access", Some(record.access().as_str()))
                .number("TTL", record.ttl);
        }
        Details::IamGroup(group) => {
            fields
                .text("ARN", group.arn.as_deref())
                .list("Users", &group.users)
                .list("Desired users", &group.desired_users)
                .list("Attached policies", &group.attached_policies)
                .list("Inline policies", &group.inline_policies);
        }
        Details::IamUser(user) => {
            fields.text("ARN", user.arn.as_deref());
        }
        Details::SecurityGroup(group) => {
            fields
                .text("Region", group.region.as_deref())
                .text("VPC", group.vpc.as_deref())
                .text("Synchronized", Some(if group.is_synchronized() { "yes" } else { "no" }));
            rules.push(rule_sheet("Ingress", &group.ingress));
            rules.push(rule_sheet("Egress", &group.egress));
        }
        Details::Vpc(vpc) => {
            fields
                .text("Region", vpc.region.as_deref())
                .text("CIDR", vpc.cidr.as_deref())
                .list("Subnets", &vpc.subnets);
        }
        Details::Asg(asg) => {
            fields
                .text("Region", asg.region.as_deref())
                .list("Instances", &asg.instances)
                .number("Min size", asg.min_size)
                .number("Max size", asg.max_size)
                .number("Desired capacity", asg.desired_capacity)
                .text("Launch template", asg.launch_template.as_deref());
        }
    }

    let services: Vec<&str> = inventory
        .services_using(entity.kind(), &entity.id)
        .into_iter()
        .map(Entity::display_name)
        .collect();
    fields.list("Used by", &services);

    let title = format!("{} {}", entity.kind().title(), entity.id);
    let main = fields
        .0
        .into_iter()
        .fold(Sheet::new(title, &["Field", "Value"]), |sheet, (label, value)| {
            sheet.with_row(vec![label, value])
        });

    std::iter::once(main)
        .chain(rules.into_iter().filter(|sheet| !sheet.is_empty()))
        .collect()
}

fn rule_sheet(title: &str, rules: &[SecurityRule]) -> Sheet {
    let port = |port: Option<i64>| port.map(|p| p.to_string()).unwrap_or_default();
    rules.iter().fold(
        Sheet::new(title, &["Protocol", "From", "To", "CIDRs", "Security groups"]),
        |sheet, rule| {
            sheet.with_row(vec![
                rule.protocol.clone().unwrap_or_default(),
                port(rule.from_port),
                port(rule.to_port),
                joined(&rule.cidrs),
                joined(&rule.security_groups),
            ])
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinv_inventory::{DataSet, Kind};

    fn inventory() -> Inventory {
        let user: DataSet = serde_yaml::from_str(
            r"
services:
  ser-01: {name: Homepage, resources: {security_groups: [sg-01]}}
",
        )
        .unwrap();
        let source: DataSet = serde_yaml::from_str(
            r"
security_groups:
  sg-01:
    name: web
    region: us-east-1
    state: active
    ingress:
      - {protocol: tcp, from_port: 443, to_port: 443, cidrs: [0.0.0.0/0]}
    egress: []
",
        )
        .unwrap();
        Inventory::load(user, source)
    }

    #[test]
    fn test_security_group_dump() {
        let inventory = inventory();
        let entity = inventory.get(Kind::SecurityGroups, "sg-01").unwrap();

        let sheets = entity_sheets(&inventory, entity);

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].title, "Security Groups sg-01");
        let fields = sheets[0].column("Field");
        assert!(fields.contains(&"Synchronized"));
        let used_by = sheets[0]
            .rows
            .iter()
            .find(|row| row[0] == "Used by")
            .unwrap();
        assert_eq!(used_by[1], "Homepage");
        assert_eq!(sheets[1].title, "Ingress");
        assert_eq!(sheets[1].rows[0], vec!["tcp", "443", "443", "0.0.0.0/0", ""]);
    }

    #[test]
    fn test_empty_fields_are_skipped() {
        let inventory = inventory();
        let entity = inventory.get(Kind::Services, "ser-01").unwrap();

        let sheets = entity_sheets(&inventory, entity);

        let fields = sheets[0].column("Field");
        assert!(!fields.contains(&"Description"));
        assert!(fields.contains(&"Resources security_groups"));
    }
}
