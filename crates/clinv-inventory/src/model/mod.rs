//! Typed entity model
//!
//! Every kind shares the [`Entity`] wrapper; kind specific attributes live in
//! the [`Details`] variant matching the kind.

pub mod cloud;
pub mod entity;
pub mod lenient;
pub mod risk;

use regex::Regex;
use serde_json::Value;

pub use cloud::{
    Annotations, AutoScalingGroup, BucketPermissions, DnsRecord, Ec2Instance, HostedZone,
    IamGroup, IamUser, RdsInstance, S3Bucket, SecurityGroup, SecurityRule, Vpc,
};
pub use entity::{Entity, MonitorStatus, Record, State};
pub use risk::{Access, Authentication, Information, Person, Project, Service};

use crate::kind::Kind;

/// Kind specific attributes of an entity
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    Project(Project),
    Service(Service),
    Information(Information),
    Person(Person),
    Ec2(Ec2Instance),
    Rds(RdsInstance),
    S3(S3Bucket),
    Route53(DnsRecord),
    IamGroup(IamGroup),
    IamUser(IamUser),
    SecurityGroup(SecurityGroup),
    Vpc(Vpc),
    Asg(AutoScalingGroup),
}

impl Details {
    /// Deserialize the attributes of `kind` from a merged record
    ///
    /// # Errors
    /// Returns the serde error when a field has an unusable shape.
    pub fn parse(kind: Kind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            Kind::Projects => Details::Project(serde_json::from_value(value)?),
            Kind::Services => Details::Service(serde_json::from_value(value)?),
            Kind::Informations => Details::Information(serde_json::from_value(value)?),
            Kind::People => Details::Person(serde_json::from_value(value)?),
            Kind::Ec2 => Details::Ec2(serde_json::from_value(value)?),
            Kind::Rds => Details::Rds(serde_json::from_value(value)?),
            Kind::S3 => Details::S3(serde_json::from_value(value)?),
            Kind::Route53 => Details::Route53(serde_json::from_value(value)?),
            Kind::IamGroups => Details::IamGroup(serde_json::from_value(value)?),
            Kind::IamUsers => Details::IamUser(serde_json::from_value(value)?),
            Kind::SecurityGroups => Details::SecurityGroup(serde_json::from_value(value)?),
            Kind::Vpc => Details::Vpc(serde_json::from_value(value)?),
            Kind::Asg => Details::Asg(serde_json::from_value(value)?),
        })
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Details::Project(_) => Kind::Projects,
            Details::Service(_) => Kind::Services,
            Details::Information(_) => Kind::Informations,
            Details::Person(_) => Kind::People,
            Details::Ec2(_) => Kind::Ec2,
            Details::Rds(_) => Kind::Rds,
            Details::S3(_) => Kind::S3,
            Details::Route53(_) => Kind::Route53,
            Details::IamGroup(_) => Kind::IamGroups,
            Details::IamUser(_) => Kind::IamUsers,
            Details::SecurityGroup(_) => Kind::SecurityGroups,
            Details::Vpc(_) => Kind::Vpc,
            Details::Asg(_) => Kind::Asg,
        }
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        match self {
            Details::Ec2(d) => d.region.as_deref(),
            Details::Rds(d) => d.region.as_deref(),
            Details::S3(d) => d.region.as_deref(),
            Details::SecurityGroup(d) => d.region.as_deref(),
            Details::Vpc(d) => d.region.as_deref(),
            Details::Asg(d) => d.region.as_deref(),
            _ => None,
        }
    }

    /// Push the kind specific searchable fields
    pub(crate) fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        fn strings<'a>(out: &mut Vec<&'a str>, values: &'a [String]) {
            out.extend(values.iter().map(String::as_str));
        }

        match self {
            Details::Project(p) => {
                strings(out, &p.aliases);
                out.extend(p.responsible.as_deref());
                strings(out, &p.services);
                strings(out, &p.informations);
                strings(out, &p.people);
                out.extend(p.links.values().map(String::as_str));
            }
            Details::Service(s) => {
                strings(out, &s.aliases);
                out.extend(s.responsible.as_deref());
                strings(out, &s.informations);
                strings(out, &s.dependencies);
                out.extend(s.environment.as_deref());
                out.extend(s.authentication.as_ref().map(|a| a.method.as_str()));
                for ids in s.resources.values() {
                    strings(out, ids);
                }
            }
            Details::Information(i) => out.extend(i.responsible.as_deref()),
            Details::Person(p) => {
                out.extend(p.email.as_deref());
                out.extend(p.iam_user.as_deref());
            }
            Details::Ec2(e) => {
                out.extend(e.region.as_deref());
                out.extend(e.instance_type.as_deref());
                strings(out, &e.private_ips);
                strings(out, &e.public_ips);
                for (id, name) in &e.security_groups {
                    out.push(id);
                    out.push(name);
                }
                out.extend(e.vpc.as_deref());
                out.extend(e.tags.values().map(String::as_str));
            }
            Details::Rds(r) => {
                out.extend(r.region.as_deref());
                out.extend(r.engine.as_deref());
                out.extend(r.instance_class.as_deref());
                out.extend(r.endpoint.as_deref());
                strings(out, &r.security_groups);
                out.extend(r.vpc.as_deref());
                out.extend(r.arn.as_deref());
            }
            Details::S3(s) => out.extend(s.region.as_deref()),
            Details::Route53(r) => {
                out.extend(r.record_type.as_deref());
                strings(out, &r.values);
                out.extend(r.hosted_zone.name.as_deref());
                out.extend(r.hosted_zone.id.as_deref());
            }
            Details::IamGroup(g) => {
                out.extend(g.arn.as_deref());
                strings(out, &g.users);
                strings(out, &g.inline_policies);
                strings(out, &g.attached_policies);
            }
            Details::IamUser(u) => out.extend(u.arn.as_deref()),
            Details::SecurityGroup(g) => {
                out.extend(g.region.as_deref());
                out.extend(g.vpc.as_deref());
                for rule in g.ingress.iter().chain(g.egress.iter()) {
                    strings(out, &rule.cidrs);
                    strings(out, &rule.security_groups);
                }
            }
            Details::Vpc(v) => {
                out.extend(v.region.as_deref());
                out.extend(v.cidr.as_deref());
                strings(out, &v.subnets);
            }
            Details::Asg(a) => {
                out.extend(a.region.as_deref());
                strings(out, &a.instances);
                out.extend(a.launch_template.as_deref());
            }
        }
    }

    /// Matches that aren't plain text comparisons
    pub(crate) fn matches_related(&self, regex: &Regex) -> bool {
        match self {
            Details::SecurityGroup(g) => g.matches_port(regex),
            _ => false,
        }
    }
}
