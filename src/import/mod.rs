//! The two ways of filling a voter group: uploading a spreadsheet or pulling
//! the volunteers of a call-out event from the roster app.

pub mod draft;
pub mod roster;
pub mod session;
pub mod spreadsheet;

pub use draft::{DraftError, GroupDraft, VoterSource};
pub use roster::{
    import_volunteers, list_events, MongoRoster, RosterConfig, RosterError, RosterEvent,
    RosterHandle, RosterRegistry, RosterSource,
};
pub use session::{ImportPhase, ImportSession};
pub use spreadsheet::{
    parse_sheet, parse_voters, resolve_columns, ParsedSheet, SpreadsheetError, SpreadsheetFormat,
};
