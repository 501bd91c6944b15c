// Typed payloads for the Camping.care endpoints.
//
// Only the fields the integration reads are typed; everything else is
// carried through `extra` so consumers still see the full remote object.
// A body that is not a JSON object where one is expected fails to decode
// and surfaces as `MalformedResponse`.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

// ── Identifiers ──────────────────────────────────────────────────────

/// A remote identifier. The API emits ids as strings or integers; both
/// are normalized to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Signed(n) => Self(n.to_string()),
            Raw::Unsigned(n) => Self(n.to_string()),
        })
    }
}

/// `{ id, name }` reference embedded in reservations (accommodation, place).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── License plates ───────────────────────────────────────────────────

/// Response of `GET /license_plates/check_plate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One element of `GET /license_plates?get_reservation=true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReservationMatch {
    /// Accommodation category of the attached reservation, if any.
    pub fn accommodation_name(&self) -> Option<&str> {
        self.reservation.as_ref()?.accommodation_name()
    }

    /// Place (pitch) name of the attached reservation, if any.
    pub fn place_name(&self) -> Option<&str> {
        self.reservation.as_ref()?.place_name()
    }
}

// ── Reservations & places ────────────────────────────────────────────

/// Response of `GET /reservations/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    /// Human-facing reservation number, distinct from `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Arrival and departure are kept as sent; the API mixes date and
    /// datetime forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodation: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reservation {
    pub fn accommodation_name(&self) -> Option<&str> {
        self.accommodation.as_ref()?.name.as_deref()
    }

    pub fn place_name(&self) -> Option<&str> {
        self.place.as_ref()?.name.as_deref()
    }
}

/// Element of `GET /places`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodation_id: Option<RemoteId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Queries ──────────────────────────────────────────────────────────

/// Validated input for a plate search with reservation lookup.
///
/// The plate is trimmed and must not be empty; an optional date window
/// narrows the search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicensePlateQuery {
    plate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
}

impl LicensePlateQuery {
    pub fn new(plate: &str) -> Result<Self, Error> {
        let plate = plate.trim();
        if plate.is_empty() {
            return Err(Error::InvalidQuery {
                field: "plate",
                reason: "must not be empty".into(),
            });
        }
        Ok(Self {
            plate: plate.to_owned(),
            start_date: None,
            end_date: None,
        })
    }

    /// Bound the search window. `end` must not precede `start`.
    pub fn with_window(
        mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, Error> {
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err(Error::InvalidQuery {
                    field: "end_date",
                    reason: format!("{e} is before start_date {s}"),
                });
            }
        }
        self.start_date = start;
        self.end_date = end;
        Ok(self)
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Query-string pairs for the search endpoint.
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("license_plate", self.plate.clone()),
            ("get_reservation", "true".to_owned()),
        ];
        if let Some(start) = self.start_date {
            params.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        params
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn remote_id_accepts_strings_and_numbers() {
        let ids: Vec<RemoteId> = serde_json::from_value(json!(["R-42", 42, -1])).unwrap();
        let strs: Vec<&str> = ids.iter().map(RemoteId::as_str).collect();
        assert_eq!(strs, ["R-42", "42", "-1"]);
    }

    #[test]
    fn reservation_match_keeps_unknown_fields() {
        let m: ReservationMatch = serde_json::from_value(json!({
            "license_plate": "AB-123-CD",
            "reservation": {
                "id": 901,
                "accommodation": { "id": 3, "name": "Comfort pitch" },
                "place": { "name": "A12" },
                "arrival": "2025-07-01"
            },
            "vehicle": "car"
        }))
        .unwrap();

        assert_eq!(m.accommodation_name(), Some("Comfort pitch"));
        assert_eq!(m.place_name(), Some("A12"));
        assert_eq!(m.extra.get("vehicle"), Some(&json!("car")));
        let reservation = m.reservation.unwrap();
        assert_eq!(reservation.id, Some(RemoteId::from("901")));
        assert_eq!(reservation.arrival.as_deref(), Some("2025-07-01"));
        assert!(reservation.extra.is_empty());
    }

    #[test]
    fn plate_check_rejects_non_objects() {
        assert!(serde_json::from_value::<PlateCheck>(json!([true])).is_err());
        assert!(serde_json::from_value::<PlateCheck>(json!("yes")).is_err());
    }

    #[test]
    fn query_trims_and_rejects_blank_plates() {
        assert_eq!(LicensePlateQuery::new("  ZZ-999 ").unwrap().plate(), "ZZ-999");
        assert!(matches!(
            LicensePlateQuery::new("   "),
            Err(Error::InvalidQuery { field: "plate", .. })
        ));
    }

    #[test]
    fn query_rejects_inverted_window() {
        let start = NaiveDate::from_ymd_opt(2025, 8, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let err = LicensePlateQuery::new("ZZ-999")
            .unwrap()
            .with_window(Some(start), Some(end));
        assert!(matches!(err, Err(Error::InvalidQuery { field: "end_date", .. })));
    }

    #[test]
    fn query_params_include_window_only_when_set() {
        let q = LicensePlateQuery::new("ZZ-999").unwrap();
        assert_eq!(
            q.to_params(),
            vec![
                ("license_plate", "ZZ-999".to_owned()),
                ("get_reservation", "true".to_owned()),
            ]
        );

        let q = q
            .with_window(NaiveDate::from_ymd_opt(2025, 8, 1), None)
            .unwrap();
        assert_eq!(q.to_params().last(), Some(&("start_date", "2025-08-01".to_owned())));
    }
}
