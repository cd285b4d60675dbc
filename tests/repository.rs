//! End-to-end repository test over a file-backed database

use stockstore::{
    ListParams, NewPlasmid, NewStrain, StockId, StockRepository, StrainUpdate,
};

fn strain(label: &str) -> NewStrain {
    NewStrain {
        created_by: "curator@dictybase.org".to_string(),
        updated_by: "curator@dictybase.org".to_string(),
        label: label.to_string(),
        systematic_name: format!("{label}-sys"),
        species: "Dictyostelium discoideum".to_string(),
        ..Default::default()
    }
}

fn plasmid(name: &str) -> NewPlasmid {
    NewPlasmid {
        created_by: "curator@dictybase.org".to_string(),
        updated_by: "curator@dictybase.org".to_string(),
        name: name.to_string(),
        sequence: "GATTACA".to_string(),
        ..Default::default()
    }
}

#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stocks.db");

    let (strain_id, plasmid_id) = {
        let repo = StockRepository::open(&path).unwrap();
        let parent = repo.add_strain(&strain("AX4")).unwrap();
        let mut child = strain("HM1034");
        child.parent = Some(parent.stock_id.to_string());
        let child = repo.add_strain(&child).unwrap();
        let plasmid = repo.add_plasmid(&plasmid("pDM304")).unwrap();
        (child.stock_id, plasmid.stock_id)
    };

    // Reopen: bootstrap runs again (idempotently), data is intact
    let repo = StockRepository::open(&path).unwrap();
    let child = repo.get_strain(&strain_id).unwrap().expect("child strain");
    let props = child.properties.as_strain().unwrap();
    assert_eq!(props.label, "HM1034");
    assert!(props.parent.is_some());
    assert!(repo.get_plasmid(&plasmid_id).unwrap().is_some());
}

#[test]
fn listings_are_scoped_per_kind() {
    let dir = tempfile::tempdir().unwrap();
    let repo = StockRepository::open(dir.path().join("stocks.db")).unwrap();

    repo.add_strain(&strain("AX4")).unwrap();
    repo.add_strain(&strain("AX2")).unwrap();
    repo.add_plasmid(&plasmid("pDM304")).unwrap();

    let strains = repo.list_strains(&ListParams::new(10)).unwrap();
    assert_eq!(strains.records.len(), 2);
    assert!(strains.next_cursor.is_none());

    let plasmids = repo.list_plasmids(&ListParams::new(10)).unwrap();
    assert_eq!(plasmids.records.len(), 1);
}

#[test]
fn edit_and_remove_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let repo = StockRepository::open(dir.path().join("stocks.db")).unwrap();

    let record = repo.add_strain(&strain("AX4")).unwrap();
    let edited = repo
        .edit_strain(
            &record.stock_id,
            &StrainUpdate::new("editor@dictybase.org").with_summary("updated"),
        )
        .unwrap();
    assert_eq!(edited.summary, "updated");

    repo.remove_stock(&record.stock_id).unwrap();
    assert!(repo.get_strain(&record.stock_id).unwrap().is_none());
    assert!(repo.remove_stock(&StockId::new("DBS0424242")).is_err());
}
