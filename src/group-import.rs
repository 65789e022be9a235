//! Operator tool for the voter import pipeline: parse a spreadsheet, or list
//! and import call-out events from the roster app, and print the resulting
//! voter records as JSON.

use std::fs;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::{json, serde_json};

use sala_admin::import::{
    parse_sheet, GroupDraft, ImportSession, RosterConfig, RosterError, RosterEvent,
    RosterRegistry, SpreadsheetError, SpreadsheetFormat, VoterSource,
};
use sala_admin::model::common::VoterRecord;

const PROGRAM_NAME: &str = "group-import";

const ABOUT_TEXT: &str = "Preview the voters a group import would produce.

EXIT CODES:
     0: Voters were produced.
     2: Nothing to import (no events, or an event without volunteers).
 Other: Error.";

const SHEET: &str = "sheet";
const ROSTER: &str = "roster";
const PATH: &str = "PATH";
const EVENT_ID: &str = "EVENT_ID";
const URI: &str = "uri";
const DATABASE: &str = "db";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .subcommand(
            Command::new(SHEET)
                .about("Parse a .csv, .xlsx, .xls, .xlsb or .ods file")
                .arg(
                    Arg::new(PATH)
                        .help("The spreadsheet to parse")
                        .action(ArgAction::Set)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(ROSTER)
                .about("List call-out events, or import the volunteers of one")
                .arg(
                    Arg::new(URI)
                        .long(URI)
                        .help("Connection string of the roster app's MongoDB")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(
                    Arg::new(DATABASE)
                        .long(DATABASE)
                        .help("Database name within the roster app")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(
                    Arg::new(EVENT_ID)
                        .help("Event to import; omit to list events")
                        .action(ArgAction::Set),
                ),
        )
}

/// Errors that this program may produce.
#[derive(Debug)]
enum Error {
    IO(String),
    Sheet(SpreadsheetError),
    Roster(RosterError),
}

/// What a subcommand produced.
enum Outcome {
    Events(Vec<RosterEvent>),
    Voters(VoterSource, Vec<VoterRecord>),
}

/// Parse a spreadsheet file.
fn sheet(path: &str) -> Result<Outcome, Error> {
    let format = SpreadsheetFormat::from_file_name(path).map_err(Error::Sheet)?;
    let bytes = fs::read(path).map_err(|e| Error::IO(e.to_string()))?;
    let parsed = parse_sheet(&bytes, format).map_err(Error::Sheet)?;
    if parsed.skipped > 0 {
        eprintln!(
            "Skipped {} row{} without an id or first name.",
            parsed.skipped,
            if parsed.skipped != 1 { "s" } else { "" }
        );
    }
    Ok(Outcome::Voters(VoterSource::Spreadsheet, parsed.voters))
}

/// Walk an import session against the roster app.
async fn roster(args: &ArgMatches) -> Result<Outcome, Error> {
    // Required arguments are guaranteed to be present.
    let config = RosterConfig {
        roster_db_uri: args.get_one::<String>(URI).unwrap().clone(),
        roster_db_name: args.get_one::<String>(DATABASE).unwrap().clone(),
    };
    let session = ImportSession::new(Arc::new(RosterRegistry::new(Some(config))));
    session.connect().await.map_err(Error::Roster)?;
    let events = session.load_events().await.map_err(Error::Roster)?;

    match args.get_one::<String>(EVENT_ID) {
        Some(event_id) => {
            let voters = session.import(event_id).await.map_err(Error::Roster)?;
            Ok(Outcome::Voters(VoterSource::Roster, voters))
        }
        None => Ok(Outcome::Events(events)),
    }
}

/// Load an import into the draft and render what the group would hold.
fn preview(draft: &mut GroupDraft, outcome: Outcome) -> Result<String, Error> {
    match outcome {
        Outcome::Events(events) => {
            draft.abandon_import();
            to_json(&events)
        }
        Outcome::Voters(source, voters) => {
            let dropped = draft.finish_import(source, voters);
            if dropped > 0 {
                eprintln!("Dropped {dropped} record(s) without an id or first name.");
            }
            to_json(&json!({
                "source": draft.source(),
                "voters": draft.voters(),
            }))
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string_pretty(value).map_err(|e| Error::IO(e.to_string()))
}

/// Run the chosen subcommand, report the result, and return the exit code.
async fn run(args: &ArgMatches) -> u8 {
    let mut draft = GroupDraft::new();
    draft.begin_import();
    let outcome = match args.subcommand() {
        Some((SHEET, sub)) => sheet(sub.get_one::<String>(PATH).unwrap()),
        Some((ROSTER, sub)) => roster(sub).await,
        _ => unreachable!("a subcommand is required"),
    };
    let result = outcome.and_then(|outcome| preview(&mut draft, outcome));
    if draft.is_importing() {
        draft.abandon_import();
    }
    match result {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(Error::Roster(err)) if err.is_informational() => {
            println!("{err}");
            2
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Sheet(err)) => {
            println!("Cannot import spreadsheet: {err}");
            1
        }
        Err(Error::Roster(err)) => {
            println!("Cannot import from roster app: {err}");
            1
        }
    }
}

#[rocket::main]
async fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args).await;
    std::process::exit(exit_code.into())
}
