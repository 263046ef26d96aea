use std::fs;

use clinv_inventory::{DataSet, Entity, Inventory, Store};
use clinv_report::export::file_name;
use clinv_report::{book, write_book};
use tempfile::TempDir;

const USER: &str = r"
projects:
  pro-01: {name: Clinv, services: [ser-01], informations: [inf-01], people: [peo-01]}
services:
  ser-01:
    name: Clinv homepage
    responsible: peo-01
    informations: [inf-01]
    resources: {ec2: [i-0001], s3: [s3-assets]}
informations:
  inf-01: {name: Visitors, personal_data: true, responsible: peo-01}
people:
  peo-01: {name: Alice, email: alice@example.com}
ec2:
  i-0001: {to_destroy: false, environment: production}
s3:
  s3-assets: {desired_permissions: {read: public, write: private}}
";

const SOURCE: &str = r"
ec2:
  i-0001: {name: web, region: us-east-1, instance_type: t2.micro, state: running}
  i-0002: {name: old, region: us-east-1, instance_type: t2.micro, state: terminated}
s3:
  s3-assets: {name: assets, state: active, permissions: {read: public, write: private}}
";

fn store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::new(dir.path());
    let user: DataSet = serde_yaml::from_str(USER).unwrap();
    let source: DataSet = serde_yaml::from_str(SOURCE).unwrap();
    store.save(&source, &user).unwrap();
    (dir, store)
}

fn entities(inventory: &Inventory) -> Vec<Entity> {
    inventory.all().cloned().collect()
}

#[test]
fn test_export_then_reload_reproduces_the_graph() {
    let (dir, store) = store();
    let inventory = Inventory::open(&store).unwrap();
    let before = book(&inventory);

    let written = write_book(&before, &dir.path().join("export")).unwrap();

    let reloaded = Inventory::open(&store).unwrap();
    assert_eq!(entities(&reloaded), entities(&inventory));
    assert_eq!(book(&reloaded), before);
    assert_eq!(written.len(), 13);
}

#[test]
fn test_export_sheets_resolve_related_names() {
    let (_dir, store) = store();
    let inventory = Inventory::open(&store).unwrap();

    let sheets = book(&inventory);

    let ec2 = sheets.iter().find(|s| s.title == "EC2").unwrap();
    assert_eq!(ec2.column("ID"), vec!["i-0001", "i-0002"]);
    assert_eq!(ec2.column("Services"), vec!["Clinv homepage", ""]);
    assert_eq!(ec2.column("Responsible"), vec!["Alice", ""]);
    assert_eq!(ec2.column("To destroy"), vec!["no", "tbd"]);

    let s3 = sheets.iter().find(|s| s.title == "S3").unwrap();
    assert_eq!(s3.column("Read Permissions (desired/real)"), vec!["public/public"]);

    let projects = sheets.iter().find(|s| s.title == "Projects").unwrap();
    assert_eq!(projects.column("People"), vec!["Alice"]);
}

#[test]
fn test_export_writes_csv_with_header() {
    let (dir, store) = store();
    let inventory = Inventory::open(&store).unwrap();
    let target = dir.path().join("export");

    write_book(&book(&inventory), &target).unwrap();

    let content = fs::read_to_string(target.join(file_name("Security Groups"))).unwrap();
    assert_eq!(
        content.lines().next().unwrap(),
        "ID,Name,Region,VPC,Synchronized,Services,To destroy,Description"
    );

    let mut reader = csv::Reader::from_path(target.join("ec2.csv")).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "i-0001");
}
