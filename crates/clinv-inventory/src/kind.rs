//! Resource kinds tracked by the inventory

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Category of an entity
///
/// The declaration order is the display priority used by searches and
/// reports: risk management kinds first, then cloud kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Projects,
    Services,
    Informations,
    People,
    Ec2,
    Rds,
    S3,
    Route53,
    IamGroups,
    IamUsers,
    SecurityGroups,
    Vpc,
    Asg,
}

impl Kind {
    /// Every kind in priority order
    pub const ALL: [Kind; 13] = [
        Kind::Projects,
        Kind::Services,
        Kind::Informations,
        Kind::People,
        Kind::Ec2,
        Kind::Rds,
        Kind::S3,
        Kind::Route53,
        Kind::IamGroups,
        Kind::IamUsers,
        Kind::SecurityGroups,
        Kind::Vpc,
        Kind::Asg,
    ];

    /// Key used in the data files and on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Projects => "projects",
            Kind::Services => "services",
            Kind::Informations => "informations",
            Kind::People => "people",
            Kind::Ec2 => "ec2",
            Kind::Rds => "rds",
            Kind::S3 => "s3",
            Kind::Route53 => "route53",
            Kind::IamGroups => "iam_groups",
            Kind::IamUsers => "iam_users",
            Kind::SecurityGroups => "security_groups",
            Kind::Vpc => "vpc",
            Kind::Asg => "asg",
        }
    }

    /// Human readable title, used for report headings and sheet names
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Kind::Projects => "Projects",
            Kind::Services => "Services",
            Kind::Informations => "Informations",
            Kind::People => "People",
            Kind::Ec2 => "EC2",
            Kind::Rds => "RDS",
            Kind::S3 => "S3",
            Kind::Route53 => "Route53",
            Kind::IamGroups => "IAM Groups",
            Kind::IamUsers => "IAM Users",
            Kind::SecurityGroups => "Security Groups",
            Kind::Vpc => "VPC",
            Kind::Asg => "ASG",
        }
    }

    /// Whether the kind is discovered from the cloud provider
    #[must_use]
    pub fn is_cloud(self) -> bool {
        !matches!(
            self,
            Kind::Projects | Kind::Services | Kind::Informations | Kind::People
        )
    }

    /// Kind whose entities reference this one
    ///
    /// An entity without references from its parent kind is unassigned.
    #[must_use]
    pub fn parent(self) -> Option<Kind> {
        match self {
            Kind::Projects => None,
            Kind::Services | Kind::Informations | Kind::People => Some(Kind::Projects),
            Kind::IamUsers => Some(Kind::People),
            _ => Some(Kind::Services),
        }
    }

    /// Cloud kinds only, in priority order
    pub fn cloud() -> impl Iterator<Item = Kind> {
        Kind::ALL.into_iter().filter(|kind| kind.is_cloud())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_lowercase().replace('-', "_").as_str() {
            "project" | "projects" | "pro" => Kind::Projects,
            "service" | "services" | "ser" => Kind::Services,
            "information" | "informations" | "info" => Kind::Informations,
            "person" | "people" | "peo" => Kind::People,
            "ec2" => Kind::Ec2,
            "rds" => Kind::Rds,
            "s3" => Kind::S3,
            "route53" | "r53" => Kind::Route53,
            "iam_group" | "iam_groups" | "iamg" => Kind::IamGroups,
            "iam_user" | "iam_users" | "iamu" => Kind::IamUsers,
            "security_group" | "security_groups" | "sg" => Kind::SecurityGroups,
            "vpc" => Kind::Vpc,
            "asg" => Kind::Asg,
            _ => return Err(InventoryError::UnknownKind(s.to_string())),
        };
        Ok(kind)
    }
}
