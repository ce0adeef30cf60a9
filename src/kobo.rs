use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use verification_tables::*;

use std::path::{Path, PathBuf};

use text_diff::print_diff;

use crate::args::Args;
use crate::kobo::client::KoboClient;
use crate::kobo::config_reader::*;
use crate::kobo::io_common::{export_file_name, render_lines, render_text};
use crate::kobo::io_csv::{CsvFileEditor, EditOutcome, TableEditor};
use crate::kobo::io_xlsx::{export_xlsx, read_first_sheet};

pub mod client;
pub mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum KoboError {
    #[snafu(display("Error opening configuration file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration file {path}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("No API token: pass --token, set it in the configuration or set {variable}"))]
    MissingToken { variable: String },
    #[snafu(display("Unknown data type {value:?}, expected 'kii' or 'fgd'"))]
    UnknownDataType { value: String },

    #[snafu(display("Error building the HTTP client"))]
    HttpClient { source: reqwest::Error },
    #[snafu(display("Error reading from KoboToolbox"))]
    Source { source: SourceError },
    #[snafu(display("Project {name:?} not found. Available projects: {available}"))]
    UnknownProject { name: String, available: String },
    #[snafu(display("Verification table {name:?} not found. Available tables: {available}"))]
    UnknownVerification { name: String, available: String },

    #[snafu(display("Error writing Excel file {path}"))]
    WritingExcel {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Table with {columns} columns does not fit in a worksheet"))]
    SheetTooLarge { columns: usize },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no worksheet or no header row"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV file {path}"))]
    CsvLineParse { source: csv::Error, path: String },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error serializing table"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Difference detected between the produced table and reference {path}"))]
    ReferenceMismatch { path: String },
}

pub type KoboResult<T> = Result<T, KoboError>;
pub type BKoboResult<T> = Result<T, Box<KoboError>>;

fn parse_data_type(value: Option<&str>) -> KoboResult<DataType> {
    match value.map(|s| s.to_lowercase()).as_deref() {
        None | Some("fgd") => Ok(DataType::Fgd),
        Some("kii") | Some("survey") => Ok(DataType::KiiSurvey),
        Some(x) => UnknownDataTypeSnafu { value: x }.fail(),
    }
}

fn select_projects(projects: Vec<Project>, data_type: DataType) -> Vec<Project> {
    projects
        .into_iter()
        .filter(|p| p.is_data_type(data_type))
        .collect()
}

/// Finds a project by uid first, then by name (case-insensitive).
fn find_project(projects: &[Project], name_or_uid: &str) -> KoboResult<Project> {
    let lname = name_or_uid.to_lowercase();
    let found = projects
        .iter()
        .find(|p| p.uid == name_or_uid)
        .or_else(|| projects.iter().find(|p| p.name.to_lowercase() == lname));
    match found {
        Some(p) => Ok(p.clone()),
        None => UnknownProjectSnafu {
            name: name_or_uid,
            available: projects
                .iter()
                .map(|p| p.name.clone())
                .collect::<Vec<String>>()
                .join(", "),
        }
        .fail(),
    }
}

/// Questions as rows, respondents as columns.
fn kii_view(table: &Table) -> Table {
    table.transpose(QUESTION_HEADER, &table.columns, RESPONDENT_PREFIX)
}

/// An `.xlsx` path is the output file, anything else is the directory receiving it.
fn output_path(out: &str, name: &str, reviewed: bool) -> PathBuf {
    if out.to_lowercase().ends_with(".xlsx") {
        PathBuf::from(out)
    } else {
        Path::new(out).join(export_file_name(name, reviewed))
    }
}

fn check_reference(table: &Table, reference_path: &str) -> BKoboResult<()> {
    let reference = read_first_sheet(reference_path)?;
    info!(
        "check_reference: reference {} has {} rows",
        reference_path,
        reference.num_rows()
    );
    let produced_lines = render_lines(table);
    let reference_lines = render_lines(&reference);
    if produced_lines != reference_lines {
        warn!("Found differences with the reference table");
        print_diff(reference_lines.as_str(), produced_lines.as_str(), "\n");
        return Err(Box::new(KoboError::ReferenceMismatch {
            path: reference_path.to_string(),
        }));
    }
    Ok(())
}

/// Reviews, shows, exports and checks a produced table.
fn deliver(settings: &Settings, args: &Args, name: &str, table: Table) -> BKoboResult<()> {
    let (table, reviewed) = match &args.review {
        None => (table, false),
        Some(review_path) => match CsvFileEditor::new(review_path).edit(&table)? {
            EditOutcome::Pending => {
                warn!(
                    "The table {:?} is waiting for review: edit {} and run again to commit it. Nothing was exported.",
                    name, review_path
                );
                return Ok(());
            }
            EditOutcome::Committed(t) => (t, true),
        },
    };

    match args.out.as_deref().or(settings.output_directory.as_deref()) {
        Some("stdout") => {
            let js = serde_json::to_string_pretty(&table).context(SerializingJsonSnafu {})?;
            println!("{}", js);
        }
        Some(out) => {
            println!("{}", render_text(&table));
            let path = output_path(out, name, reviewed);
            export_xlsx(&table, name, &path)?;
            info!("Table {:?} written to {}", name, path.display());
        }
        None => {
            println!("{}", render_text(&table));
        }
    }

    if let Some(reference_path) = &args.reference {
        check_reference(&table, reference_path)?;
    }
    Ok(())
}

fn run_kii(
    client: &KoboClient,
    project: &Project,
    settings: &Settings,
    args: &Args,
) -> BKoboResult<()> {
    match generate_single_records(client, &project.uid, &settings.rules).context(SourceSnafu {})? {
        Extraction::NoData => {
            warn!("No data available for project {:?}", project.name);
            Ok(())
        }
        Extraction::Data(table) => {
            info!(
                "run_kii: project {:?}: {} submissions, {} columns",
                project.name,
                table.num_rows(),
                table.num_columns()
            );
            deliver(settings, args, &project.name, kii_view(&table))
        }
    }
}

fn run_fgd(
    client: &KoboClient,
    project: &Project,
    settings: &Settings,
    args: &Args,
) -> BKoboResult<()> {
    let set = match generate_verification_tables(client, &project.uid, &settings.rules)
        .context(SourceSnafu {})?
    {
        Extraction::NoData => {
            warn!("No data available for project {:?}", project.name);
            return Ok(());
        }
        Extraction::Data(set) => set,
    };
    for skipped in set.skipped.iter() {
        warn!(
            "Submission {} (id {}) was skipped: {}",
            skipped.position,
            skipped.id.as_deref().unwrap_or("unknown"),
            skipped.reason
        );
    }
    let verification = match &args.verification {
        None => {
            if set.tables.is_empty() {
                warn!("No verification table could be built for {:?}", project.name);
            }
            for nt in set.tables.iter() {
                println!("{}", nt.name);
            }
            return Ok(());
        }
        Some(v) => v,
    };
    let table = set
        .get(verification)
        .cloned()
        .context(UnknownVerificationSnafu {
            name: verification.clone(),
            available: set.names().join(", "),
        })?;
    debug!(
        "run_fgd: table {:?}: {} rows",
        verification,
        table.num_rows()
    );
    deliver(settings, args, verification, table)
}

pub fn run(args: &Args) -> BKoboResult<()> {
    let config = match &args.config {
        Some(path) => read_config(path)?,
        None => KoboConfig::default(),
    };
    debug!("run: config: {:?}", config);
    let settings = resolve_settings(&config, args, |var| std::env::var(var).ok())?;
    let data_type = parse_data_type(args.data_type.as_deref())?;

    let client = KoboClient::new(&settings.url, &settings.token, settings.timeout)?;
    let projects = select_projects(client.list_projects().context(SourceSnafu {})?, data_type);
    info!("Found {} projects of type {:?}", projects.len(), data_type);

    let project = match &args.project {
        None => {
            if projects.is_empty() {
                warn!("No projects of type {:?} found", data_type);
            }
            for p in projects.iter() {
                println!("{}\t{}", p.uid, p.name);
            }
            return Ok(());
        }
        Some(p) => find_project(&projects, p)?,
    };
    info!("Processing project {:?} ({})", project.name, project.uid);

    match data_type {
        DataType::KiiSurvey => run_kii(&client, &project, &settings, args),
        DataType::Fgd => run_fgd(&client, &project, &settings, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(uid: &str, name: &str) -> Project {
        Project {
            uid: uid.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn data_types() {
        assert_eq!(parse_data_type(None).unwrap(), DataType::Fgd);
        assert_eq!(parse_data_type(Some("KII")).unwrap(), DataType::KiiSurvey);
        assert_eq!(parse_data_type(Some("fgd")).unwrap(), DataType::Fgd);
        assert!(matches!(
            parse_data_type(Some("poll")),
            Err(KoboError::UnknownDataType { .. })
        ));
    }

    #[test]
    fn projects_by_type_and_name() {
        let all = vec![
            project("a1", "ELMI KII"),
            project("a2", "FGD Verification"),
            project("a3", "Household survey"),
        ];
        let kii = select_projects(all.clone(), DataType::KiiSurvey);
        assert_eq!(kii.len(), 2);
        let fgd = select_projects(all, DataType::Fgd);
        assert_eq!(find_project(&fgd, "fgd verification").unwrap().uid, "a2");
        assert_eq!(find_project(&fgd, "a2").unwrap().name, "FGD Verification");
        match find_project(&kii, "missing") {
            Err(KoboError::UnknownProject { available, .. }) => {
                assert_eq!(available, "ELMI KII, Household survey")
            }
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn kii_view_transposes() {
        let mut t = Table::new(vec!["Start".to_string(), "Age".to_string()]);
        t.push_row(vec![Some("s1".to_string()), Some("31".to_string())]);
        t.push_row(vec![Some("s2".to_string()), None]);
        let v = kii_view(&t);
        assert_eq!(v.columns, vec!["Question", "Respondent 1", "Respondent 2"]);
        assert_eq!(
            v.rows[1],
            vec![Some("Age".to_string()), Some("31".to_string()), None]
        );
    }

    #[test]
    fn output_paths() {
        assert_eq!(
            output_path("out", "Visit 1", false),
            Path::new("out").join("Visit 1 data.xlsx")
        );
        assert_eq!(
            output_path("out", "Visit 1", true),
            Path::new("out").join("Visit 1 Reviewed Data.xlsx")
        );
        assert_eq!(
            output_path("final.XLSX", "Visit 1", true),
            PathBuf::from("final.XLSX")
        );
    }
}
