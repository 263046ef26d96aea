//! Spreadsheet export of the whole inventory
//!
//! One sheet per kind, every entity included, rows ordered by id. Related
//! services and people are shown by name.

use std::fs;
use std::path::{Path, PathBuf};

use clinv_inventory::{Details, Entity, Inventory, Kind};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::ReportError;
use crate::sheet::{Sheet, flag, joined, text};

/// Build the export book, one sheet per kind in kind order
#[must_use]
pub fn book(inventory: &Inventory) -> Vec<Sheet> {
    Kind::ALL
        .iter()
        .map(|kind| kind_sheet(inventory, *kind))
        .collect()
}

/// Write every sheet as `<dir>/<sheet>.csv`
///
/// Each file is replaced atomically.
///
/// # Errors
/// Returns `Write` if the directory or a file can't be written.
#[instrument(skip(sheets))]
pub fn write_book(sheets: &[Sheet], dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    fs::create_dir_all(dir).map_err(|e| ReportError::write(dir, e))?;

    let mut written = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let path = dir.join(file_name(&sheet.title));
        write_sheet(sheet, dir, &path)?;
        debug!(path = %path.display(), rows = sheet.len(), "sheet written");
        written.push(path);
    }

    info!(sheets = written.len(), dir = %dir.display(), "inventory exported");
    Ok(written)
}

/// `Security Groups` is written as `security_groups.csv`
#[must_use]
pub fn file_name(title: &str) -> String {
    format!("{}.csv", title.to_lowercase().replace(' ', "_"))
}

fn write_sheet(sheet: &Sheet, dir: &Path, path: &Path) -> Result<(), ReportError> {
    let mut file = NamedTempFile::new_in(dir).map_err(|e| ReportError::write(path, e))?;
    {
        let mut writer = csv::Writer::from_writer(file.as_file_mut());
        writer
            .write_record(&sheet.header)
            .map_err(|e| ReportError::write(path, e))?;
        for row in &sheet.rows {
            writer
                .write_record(row)
                .map_err(|e| ReportError::write(path, e))?;
        }
        writer.flush().map_err(|e| ReportError::write(path, e))?;
    }
    file.as_file_mut()
        .sync_all()
        .map_err(|e| ReportError::write(path, e))?;
    file.persist(path).map_err(|e| ReportError::write(path, e.error))?;
    Ok(())
}

// ============================================================================
// Sheets
// ============================================================================

fn name_of(inventory: &Inventory, kind: Kind, id: &str) -> String {
    inventory
        .get(kind, id)
        .map_or_else(|| id.to_string(), |entity| entity.display_name().to_string())
}

fn names_of(inventory: &Inventory, kind: Kind, ids: &[String]) -> String {
    joined(ids.iter().map(|id| name_of(inventory, kind, id)))
}

fn services_of<'a>(inventory: &'a Inventory, entity: &Entity) -> Vec<&'a Entity> {
    inventory.services_using(entity.kind(), &entity.id)
}

/// Responsible people of the services using a resource
fn responsible_of(inventory: &Inventory, services: &[&Entity]) -> String {
    let mut people: Vec<String> = services
        .iter()
        .filter_map(|service| match &service.details {
            Details::Service(service) => service.responsible.as_deref(),
            _ => None,
        })
        .map(|id| name_of(inventory, Kind::People, id))
        .collect();
    people.sort();
    people.dedup();
    joined(people)
}

fn kind_sheet(inventory: &Inventory, kind: Kind) -> Sheet {
    let header: &[&str] = match kind {
        Kind::Projects => &[
            "ID",
            "Name",
            "Services",
            "Informations",
            "People",
            "State",
            "Description",
        ],
        Kind::Services => &[
            "ID",
            "Name",
            "Access",
            "Authentication",
            "State",
            "Informations",
            "Responsible",
            "Description",
        ],
        Kind::Informations => &[
            "ID",
            "Name",
            "State",
            "Responsible",
            "Personal Data",
            "Description",
        ],
        Kind::People => &["ID", "Name", "Email", "State", "Description"],
        Kind::Ec2 | Kind::Rds => &[
            "ID",
            "Name",
            "Services",
            "To destroy",
            "Responsible",
            "Region",
            "Comments",
        ],
        Kind::S3 => &[
            "ID",
            "Services",
            "To destroy",
            "Environment",
            "Read Permissions (desired/real)",
            "Write Permissions (desired/real)",
            "Description",
        ],
        Kind::Route53 => &[
            "ID",
            "Name",
            "Type",
            "Value",
            "Services",
            "To destroy",
            "Access",
            "Description",
        ],
        Kind::IamGroups => &[
            "ID",
            "Name",
            "Users",
            "Desired users",
            "Services",
            "To destroy",
            "Description",
        ],
        Kind::IamUsers => &["ID", "Name", "Services", "To destroy", "Description"],
        Kind::SecurityGroups => &[
            "ID",
            "Name",
            "Region",
            "VPC",
            "Synchronized",
            "Services",
            "To destroy",
            "Description",
        ],
        Kind::Vpc => &[
            "ID",
            "Name",
            "Region",
            "CIDR",
            "Services",
            "To destroy",
            "Description",
        ],
        Kind::Asg => &[
            "ID",
            "Name",
            "Region",
            "Instances",
            "Services",
            "To destroy",
            "Description",
        ],
    };

    inventory
        .entities(kind)
        .fold(Sheet::new(kind.title(), header), |sheet, entity| {
            sheet.with_row(row(inventory, entity))
        })
}

fn row(inventory: &Inventory, entity: &Entity) -> Vec<String> {
    let id = entity.id.clone();
    let name = entity.display_name().to_string();
    let state = entity.state.as_str().to_string();
    let description = text(entity.description.as_deref());
    let services = services_of(inventory, entity);
    let service_names = joined(services.iter().map(|s| s.display_name()));
    let to_destroy = flag(entity.to_destroy());

    match &entity.details {
        Details::Project(project) => vec![
            id,
            name,
            names_of(inventory, Kind::Services, &project.services),
            names_of(inventory, Kind::Informations, &project.informations),
            names_of(inventory, Kind::People, &project.people),
            state,
            description,
        ],
        Details::Service(service) => vec![
            id,
            name,
            service.access.as_str().to_string(),
            text(service.authentication.as_ref().map(|a| a.method.as_str())),
            state,
            names_of(inventory, Kind::Informations, &service.informations),
            service
                .responsible
                .as_deref()
                .map(|person| name_of(inventory, Kind::People, person))
                .unwrap_or_default(),
            description,
        ],
        Details::Information(information) => vec![
            id,
            name,
            state,
            information
                .responsible
                .as_deref()
                .map(|person| name_of(inventory, Kind::People, person))
                .unwrap_or_default(),
            flag(Some(information.personal_data)),
            description,
        ],
        Details::Person(person) => vec![
            id,
            name,
            text(person.email.as_deref()),
            state,
            description,
        ],
        Details::Ec2(_) | Details::Rds(_) => vec![
            id,
            name,
            service_names,
            to_destroy,
            responsible_of(inventory, &services),
            text(entity.region()),
            description,
        ],
        Details::S3(bucket) => {
            let pair = |desired: Option<&str>, real: Option<&str>| {
                format!("{}/{}", desired.unwrap_or("tbd"), real.unwrap_or("unknown"))
            };
            vec![
                id,
                service_names,
                to_destroy,
                text(entity.annotations.as_ref().and_then(|a| a.environment.as_deref())),
                pair(
                    bucket.desired_permissions.read.as_deref(),
                    bucket.permissions.read.as_deref(),
                ),
                pair(
                    bucket.desired_permissions.write.as_deref(),
                    bucket.permissions.write.as_deref(),
                ),
                description,
            ]
        }
        Details::Route53(record) => vec![
            id,
            name,
            text(record.record_type.as_deref()),
            joined(&record.values),
            service_names,
            to_destroy,
            record.access().as_str().to_string(),
            description,
        ],
        Details::IamGroup(group) => vec![
            id,
            name,
            joined(&group.users),
            joined(&group.desired_users),
            service_names,
            to_destroy,
            description,
        ],
        Details::IamUser(_) => vec![id, name, service_names, to_destroy, description],
        Details::SecurityGroup(group) => vec![
            id,
            name,
            text(group.region.as_deref()),
            text(group.vpc.as_deref()),
            flag(Some(group.is_synchronized())),
            service_names,
            to_destroy,
            description,
        ],
        Details::Vpc(vpc) => vec![
            id,
            name,
            text(vpc.region.as_deref()),
            text(vpc.cidr.as_deref()),
            service_names,
            to_destroy,
            description,
        ],
        Details::Asg(asg) => vec![
            id,
            name,
            text(asg.region.as_deref()),
            joined(&asg.instances),
            service_names,
            to_destroy,
            description,
        ],
    }
}
