//! Exporter tests over a small assembled dataset.

use std::fs;

use chrono::NaiveDate;
use mirador_model::{
    CodeLabel, Column, ColumnRole, Dataset, DatasetRow, FieldType, PatientKey, Value,
};
use mirador_output::{
    FlatCsvOptions, MIRADOR_MISSING, MiradorOptions, spss_card, write_flat_csv,
    write_mirador_folder, write_spss_outputs,
};

fn column(name: &str, label: &str, field_type: FieldType, group: &str, table: &str) -> Column {
    Column {
        name: name.to_string(),
        label: label.to_string(),
        field_type,
        role: ColumnRole::Field,
        group: group.to_string(),
        table: table.to_string(),
        codes: Vec::new(),
    }
}

fn dataset() -> Dataset {
    let mut key = column("GID", "Patient ID", FieldType::Text, "Demographics", "Basic Information");
    key.role = ColumnRole::Key;
    let mut sex = column("SEX", "Sex", FieldType::Categorical, "Demographics", "Basic Information");
    sex.codes = vec![CodeLabel::new("1", "Female"), CodeLabel::new("2", "Male")];
    let mut dataset = Dataset::new(vec![
        key,
        sex,
        column(
            "PCR",
            "Viral load (log units)",
            FieldType::Numeric,
            "Laboratory",
            "Viral Load (qPCR) summary",
        ),
        column(
            "DOPCR_1",
            "Date of \"qPCR\" 1",
            FieldType::Date,
            "Laboratory",
            "Viral Load (qPCR) 1",
        ),
    ]);
    dataset.push_row(DatasetRow {
        key: PatientKey::new("PT07").expect("key"),
        values: vec![
            Value::Text("PT07".into()),
            Value::Category("2".into()),
            Value::Number(4.6),
            Value::Date(NaiveDate::from_ymd_opt(2014, 6, 1).expect("date")),
        ],
    });
    dataset.push_row(DatasetRow {
        key: PatientKey::new("PT08").expect("key"),
        values: vec![
            Value::Text("PT08".into()),
            Value::Absent,
            Value::Absent,
            Value::Absent,
        ],
    });
    dataset
}

#[test]
fn mirador_folder_has_four_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let files = write_mirador_folder(
        &dir.path().join("mirador"),
        &dataset(),
        &MiradorOptions::default(),
    )
    .expect("write folder");

    let data = fs::read_to_string(&files.data).expect("data");
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(
        lines,
        vec![
            "GID,SEX,PCR,DOPCR_1",
            "PT07,2,4.6,2014-06-01",
            "PT08,\\N,\\N,\\N"
        ]
    );

    let dictionary = fs::read_to_string(&files.dictionary).expect("dictionary");
    let lines: Vec<&str> = dictionary.lines().collect();
    assert_eq!(lines[0], "Patient ID,String,label");
    assert_eq!(lines[1], "Sex,category,1:Female;2:Male");
    assert_eq!(lines[2], "Viral load (log units),float");
    assert_eq!(lines[3], "\"Date of \"\"qPCR\"\" 1\",date");

    let groups = fs::read_to_string(&files.groups).expect("groups");
    assert!(groups.starts_with("<?xml version=\"1.0\"?>"));
    let demographics = groups.find("<group name=\"Demographics\">").expect("demographics");
    let laboratory = groups.find("<group name=\"Laboratory\">").expect("laboratory");
    assert!(demographics < laboratory);
    assert!(groups.contains("<table name=\"Viral Load (qPCR) summary\">"));
    assert_eq!(groups.matches("<variable name=").count(), 4);

    let project = fs::read_to_string(&files.project).expect("project");
    assert!(project.contains("data.source=data.csv\n"));
    assert!(project.contains("data.dictionary=dictionary.csv\n"));
    assert!(project.contains(&format!("missing.string={MIRADOR_MISSING}\n")));
}

#[test]
fn flat_csv_uses_labels() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("ebola-data.csv");
    write_flat_csv(&path, &dataset(), &FlatCsvOptions::default()).expect("write");
    let contents = fs::read_to_string(&path).expect("read");
    let lines: Vec<&str> = contents.lines().collect();
    assert!(lines[0].starts_with("Patient ID,Sex,Viral load (log units),"));
    assert_eq!(lines[1..], ["PT07,Male,4.6,2014-06-01", "PT08,,,"]);
}

#[test]
fn spss_card_layout() {
    insta::assert_snapshot!(spss_card(&dataset(), MIRADOR_MISSING), @r#"
    DATA LIST LIST(',') /
      GID (A4)
      SEX (A2)
      PCR (F)
      DOPCR_1 (SDATE10)
      .
    VARIABLE LABELS
      GID "Patient ID"
      SEX "Sex"
      PCR "Viral load (log units)"
      DOPCR_1 "Date of 'qPCR' 1"
      .
    VALUE LABELS
      SEX
        '1' "Female"
        '2' "Male"
      /
      .
    MISSING VALUES
      GID ('\N')
      SEX ('\N')
      .
    "#);
}

#[test]
fn spss_card_sits_next_to_data_copy() {
    let dir = tempfile::tempdir().expect("temp dir");
    let files = write_spss_outputs(&dir.path().join("spss/ebola-data.csv"), &dataset(), "\\N")
        .expect("write");
    assert!(files.data.exists());
    assert_eq!(files.card, dir.path().join("spss/ebola-data.spss"));
    let card = fs::read_to_string(&files.card).expect("card");
    assert!(card.starts_with("DATA LIST LIST(',') /\n"));
}
