//! Lookup command handlers: plate checks, plate queries, reservations, places.
//!
//! Each handler builds a request for the dispatcher. Without `--notify` the
//! reply is rendered; with it, the broadcast event is rendered instead.

use serde_json::Value;
use tabled::Tabled;

use campcare_core::{
    CommandRequest, CommandResult, LookupEvent, Operation, Place, PlateCheck, Reservation,
    ReservationMatch,
};

use crate::cli::{
    CheckPlateArgs, GlobalOpts, OutputFormat, PlacesArgs, QueryPlateArgs, ReservationArgs,
};
use crate::config::Host;
use crate::error::CliError;
use crate::output;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct MatchRow {
    #[tabled(rename = "Plate")]
    plate: String,
    #[tabled(rename = "Reservation")]
    reservation: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Arrival")]
    arrival: String,
    #[tabled(rename = "Departure")]
    departure: String,
    #[tabled(rename = "Accommodation")]
    accommodation: String,
    #[tabled(rename = "Place")]
    place: String,
}

impl From<&ReservationMatch> for MatchRow {
    fn from(m: &ReservationMatch) -> Self {
        let r = m.reservation.as_ref();
        Self {
            plate: m.license_plate.clone().unwrap_or_default(),
            reservation: r.map_or_else(|| "-".into(), reservation_label),
            status: r.and_then(|r| r.status.clone()).unwrap_or_default(),
            arrival: r.and_then(|r| r.arrival.clone()).unwrap_or_default(),
            departure: r.and_then(|r| r.departure.clone()).unwrap_or_default(),
            accommodation: m.accommodation_name().unwrap_or_default().into(),
            place: m.place_name().unwrap_or_default().into(),
        }
    }
}

#[derive(Tabled)]
struct PlaceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Accommodation")]
    accommodation: String,
}

impl From<&Place> for PlaceRow {
    fn from(p: &Place) -> Self {
        Self {
            id: p.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            name: p.name.clone().unwrap_or_default(),
            accommodation: p
                .accommodation_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

// ── Detail views ────────────────────────────────────────────────────

/// Number when the API provides one, else the id.
fn reservation_label(r: &Reservation) -> String {
    r.number
        .as_ref()
        .or(r.id.as_ref())
        .map_or_else(|| "-".into(), ToString::to_string)
}

fn contact_summary(contact: &Value) -> Option<String> {
    match contact {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            let field = |key: &str| map.get(key).and_then(Value::as_str);
            let full = [field("first_name"), field("last_name")]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if full.is_empty() {
                field("name").map(str::to_owned)
            } else {
                Some(full)
            }
        }
        other => Some(other.to_string()),
    }
}

fn reservation_detail(r: &Reservation) -> String {
    output::detail(&[
        ("ID", r.id.as_ref().map(ToString::to_string)),
        ("Number", r.number.as_ref().map(ToString::to_string)),
        ("Status", r.status.clone()),
        ("Arrival", r.arrival.clone()),
        ("Departure", r.departure.clone()),
        ("Accommodation", r.accommodation_name().map(str::to_owned)),
        ("Place", r.place_name().map(str::to_owned)),
        ("Contact", r.contact.as_ref().and_then(contact_summary)),
    ])
}

fn plate_detail(plate: &str, check: &PlateCheck) -> String {
    output::detail(&[
        ("Plate", Some(plate.to_owned())),
        ("Known", Some(output::yes_no(check.valid))),
    ])
}

fn result_summary(result: &CommandResult) -> String {
    match result {
        CommandResult::PlateCheck(check) => format!("known: {}", output::yes_no(check.valid)),
        CommandResult::Reservations(matches) => format!("{} reservation(s)", matches.len()),
        CommandResult::Reservation(r) => format!("reservation {}", reservation_label(r)),
        CommandResult::Places(places) => format!("{} place(s)", places.len()),
    }
}

fn event_detail(event: &LookupEvent) -> String {
    output::detail(&[
        ("Topic", Some(event.topic.clone())),
        ("Instance", Some(event.instance_id.to_string())),
        ("Operation", Some(event.operation.to_string())),
        ("Timestamp", Some(event.timestamp.to_rfc3339())),
        ("Result", Some(result_summary(&event.result))),
    ])
}

// ── Shared request path ─────────────────────────────────────────────

fn request(host: &Host, op: Operation) -> CommandRequest {
    CommandRequest::new(op.to_string()).with_instance(host.instance_id.clone())
}

/// Run `request`. Returns `None` when the notify path already printed
/// the event.
async fn execute(
    host: &Host,
    request: &CommandRequest,
    notify: bool,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<Option<CommandResult>, CliError> {
    if notify {
        let mut events = host.dispatcher.subscribe();
        if !host.dispatcher.fire(request).await {
            return Err(CliError::NoEvent {
                operation: request.operation.clone(),
            });
        }
        let event = events
            .recv()
            .await
            .map_err(|e| CliError::Render(format!("event channel: {e}")))?;
        let out = output::render_single(format, event.as_ref(), event_detail, |e| {
            e.topic.clone()
        })?;
        output::print_output(&out, global.quiet);
        return Ok(None);
    }

    let reply = host.dispatcher.call(request).await;
    if let Some(err) = reply.error {
        return Err(CliError::from_reply(err));
    }
    reply
        .result
        .map(Some)
        .ok_or_else(|| CliError::Render("reply carried no result".into()))
}

fn render(
    format: OutputFormat,
    result: &CommandResult,
    plate: Option<&str>,
) -> Result<String, CliError> {
    match result {
        CommandResult::PlateCheck(check) => output::render_single(
            format,
            check,
            |c| plate_detail(plate.unwrap_or("-"), c),
            |c| output::yes_no(c.valid),
        ),
        CommandResult::Reservations(matches) => output::render_list(
            format,
            matches,
            |m| MatchRow::from(m),
            |m| m.reservation.as_ref().map_or_else(|| "-".into(), reservation_label),
        ),
        CommandResult::Reservation(r) => {
            output::render_single(format, r, reservation_detail, reservation_label)
        }
        CommandResult::Places(places) => output::render_list(format, places, |p| PlaceRow::from(p), |p| {
            p.id.as_ref().map(ToString::to_string).unwrap_or_default()
        }),
    }
}

async fn run(
    host: &Host,
    request: &CommandRequest,
    notify: bool,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let Some(result) = execute(host, request, notify, format, global).await? else {
        return Ok(());
    };
    let plate = request.params.get("plate").and_then(Value::as_str);
    let out = render(format, &result, plate)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn check_plate(
    host: &Host,
    args: CheckPlateArgs,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let req = request(host, Operation::CheckPlate).with_param("plate", args.plate);
    run(host, &req, args.notify.notify, format, global).await
}

pub async fn query_plate(
    host: &Host,
    args: QueryPlateArgs,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut req = request(host, Operation::QueryPlate).with_param("plate", args.plate);
    if let Some(start) = args.start_date {
        req = req.with_param("start_date", start.format(DATE_FORMAT).to_string());
    }
    if let Some(end) = args.end_date {
        req = req.with_param("end_date", end.format(DATE_FORMAT).to_string());
    }
    run(host, &req, args.notify.notify, format, global).await
}

pub async fn reservation(
    host: &Host,
    args: ReservationArgs,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let req = request(host, Operation::GetReservation).with_param("reservation_id", args.id);
    run(host, &req, args.notify.notify, format, global).await
}

pub async fn places(
    host: &Host,
    args: &PlacesArgs,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let req = request(host, Operation::ListPlaces);
    run(host, &req, args.notify.notify, format, global).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contact_prefers_full_name() {
        assert_eq!(
            contact_summary(&json!({ "first_name": "Anna", "last_name": "de Vries", "email": "a@x" })),
            Some("Anna de Vries".into())
        );
        assert_eq!(contact_summary(&json!({ "name": "Fam. Jansen" })), Some("Fam. Jansen".into()));
        assert_eq!(contact_summary(&Value::Null), None);
    }

    #[test]
    fn reservation_label_prefers_number() {
        let r: Reservation =
            serde_json::from_value(json!({ "id": 88123, "number": "R-2025-014" })).unwrap();
        assert_eq!(reservation_label(&r), "R-2025-014");

        let r: Reservation = serde_json::from_value(json!({ "id": 88123 })).unwrap();
        assert_eq!(reservation_label(&r), "88123");
    }
}
