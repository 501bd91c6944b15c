// ── Command API ──
//
// Every lookup flows through a unified `Command` enum. Raw request
// parameters are parsed into a `Command` before any instance is touched
// on the network, so malformed input never costs a request.

pub mod requests;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use campcare_api::{LicensePlateQuery, Place, PlateCheck, Reservation, ReservationMatch};

use crate::DOMAIN;
use crate::error::CoreError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Names of the operations exposed to consumers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    CheckPlate,
    QueryPlate,
    GetReservation,
    ListPlaces,
}

impl Operation {
    /// Topic of the event broadcast after a successful fire-and-forget call.
    pub fn event_topic(self) -> String {
        let suffix = match self {
            Self::CheckPlate => "check_license_plate",
            Self::QueryPlate => "query_license_plate",
            Self::GetReservation => "get_reservation",
            Self::ListPlaces => "list_places",
        };
        format!("{DOMAIN}_{suffix}")
    }
}

/// A validated lookup, ready to run against one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CheckPlate { plate: String },
    QueryPlate(LicensePlateQuery),
    GetReservation { reservation_id: String },
    ListPlaces,
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Self::CheckPlate { .. } => Operation::CheckPlate,
            Self::QueryPlate(_) => Operation::QueryPlate,
            Self::GetReservation { .. } => Operation::GetReservation,
            Self::ListPlaces => Operation::ListPlaces,
        }
    }

    /// Parse loosely-typed request parameters for `op`.
    ///
    /// Required fields must be present and non-blank; dates must be
    /// `YYYY-MM-DD`. Unrecognized parameters are ignored.
    pub fn from_params(op: Operation, params: &Map<String, Value>) -> Result<Self, CoreError> {
        match op {
            Operation::CheckPlate => Ok(Self::CheckPlate {
                plate: required_text(params, "plate")?,
            }),
            Operation::QueryPlate => {
                let plate = required_text(params, "plate")?;
                let query = LicensePlateQuery::new(&plate)?.with_window(
                    optional_date(params, "start_date")?,
                    optional_date(params, "end_date")?,
                )?;
                Ok(Self::QueryPlate(query))
            }
            Operation::GetReservation => Ok(Self::GetReservation {
                reservation_id: required_id(params, "reservation_id")?,
            }),
            Operation::ListPlaces => Ok(Self::ListPlaces),
        }
    }
}

/// Successful payload of one command, serialized as the bare remote data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    PlateCheck(PlateCheck),
    Reservations(Vec<ReservationMatch>),
    Reservation(Reservation),
    Places(Vec<Place>),
}

// ── Parameter helpers ────────────────────────────────────────────────

fn text<'a>(params: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>, CoreError> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim())),
        Some(other) => Err(CoreError::validation(
            field,
            format!("expected a string, got {other}"),
        )),
    }
}

fn required_text(params: &Map<String, Value>, field: &str) -> Result<String, CoreError> {
    text(params, field)?
        .map(str::to_owned)
        .ok_or_else(|| CoreError::MissingField {
            field: field.to_owned(),
        })
}

/// Like `required_text`, but integer ids are accepted too.
fn required_id(params: &Map<String, Value>, field: &str) -> Result<String, CoreError> {
    match params.get(field) {
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => required_text(params, field),
    }
}

fn optional_date(params: &Map<String, Value>, field: &str) -> Result<Option<NaiveDate>, CoreError> {
    text(params, field)?
        .map(|raw| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
                CoreError::validation(field, format!("'{raw}' is not a YYYY-MM-DD date"))
            })
        })
        .transpose()
}
