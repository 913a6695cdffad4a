//! Request dispatch onto the booking desk
//!
//! Runs on a blocking thread with the desk locked. Produces the reply and
//! the events to push to admin subscribers.

use chrono::NaiveDateTime;
use tracing::{debug, error};

use venue_core::availability::parse_calendar_date;
use venue_core::{Audience, BookingDesk, FieldBookingRequest, HallBookingRequest, Result, Storage};

use crate::protocol::{BookingEvent, ErrorCode, Reply, Request};

/// Reply plus the changes it caused
#[derive(Debug)]
pub struct Outcome {
    pub reply: Reply,
    pub events: Vec<BookingEvent>,
}

impl Outcome {
    fn quiet(reply: Reply) -> Self {
        Self {
            reply,
            events: Vec::new(),
        }
    }
}

/// Execute one request. Never fails; errors become [`Reply::Error`].
pub fn execute<S: Storage>(
    desk: &BookingDesk<S>,
    request: Request,
    admin: bool,
    now: NaiveDateTime,
) -> Outcome {
    let op = request.name();
    if !admin && !request.is_public() {
        debug!(op, "Refused admin operation on public session");
        return Outcome::quiet(Reply::forbidden(op));
    }

    let audience = if admin { Audience::Admin } else { Audience::Public };
    match run(desk, request, audience, now) {
        Ok(outcome) => outcome,
        Err(e) => {
            let reply = Reply::from_error(&e);
            if matches!(reply, Reply::Error { code: ErrorCode::Internal, .. }) {
                error!(op, error = %e, "Request failed");
            } else {
                debug!(op, error = %e, "Request refused");
            }
            Outcome::quiet(reply)
        }
    }
}

fn run<S: Storage>(
    desk: &BookingDesk<S>,
    request: Request,
    audience: Audience,
    now: NaiveDateTime,
) -> Result<Outcome> {
    let outcome = match request {
        Request::ListFields { include_inactive } => {
            let include_inactive = include_inactive && audience == Audience::Admin;
            Outcome::quiet(Reply::Fields {
                fields: desk.list_fields(include_inactive)?,
            })
        }
        Request::ListHalls { include_inactive } => {
            let include_inactive = include_inactive && audience == Audience::Admin;
            Outcome::quiet(Reply::Halls {
                halls: desk.list_halls(include_inactive)?,
            })
        }
        Request::FieldDay { field_id, date } => {
            let date = parse_calendar_date(&date)?;
            Outcome::quiet(Reply::FieldDay {
                field_id,
                date,
                slots: desk.field_day(field_id, date, now, audience)?,
            })
        }
        Request::HallCalendar { hall_id, from, days } => {
            let from = parse_calendar_date(&from)?;
            Outcome::quiet(Reply::HallCalendar {
                hall_id,
                days: desk.hall_days(hall_id, from, days, now, audience)?,
            })
        }
        Request::BookField {
            field_id,
            date,
            slot,
            customer,
        } => {
            let request = FieldBookingRequest {
                field_id,
                date: parse_calendar_date(&date)?,
                slot,
                customer,
            };
            let reservation = desk.book_field(&request, now)?;
            Outcome {
                events: vec![BookingEvent::FieldReservationCreated {
                    reservation: reservation.clone(),
                }],
                reply: Reply::FieldReservation { reservation },
            }
        }
        Request::BookHall {
            hall_id,
            date,
            customer,
            event_type,
            guest_count,
            message,
        } => {
            let request = HallBookingRequest {
                hall_id,
                date: parse_calendar_date(&date)?,
                customer,
                event_type,
                guest_count,
                message,
            };
            let reservation = desk.book_hall(&request, now)?;
            Outcome {
                events: vec![BookingEvent::HallReservationCreated {
                    reservation: reservation.clone(),
                }],
                reply: Reply::HallReservation { reservation },
            }
        }
        Request::AddField { name, surface } => Outcome::quiet(Reply::Field {
            field: desk.add_field(&name, surface)?,
        }),
        Request::AddHall { name, capacity } => Outcome::quiet(Reply::Hall {
            hall: desk.add_hall(&name, capacity)?,
        }),
        Request::SetFieldActive { field_id, active } => {
            desk.set_field_active(field_id, active)?;
            Outcome::quiet(Reply::Done)
        }
        Request::SetHallActive { hall_id, active } => {
            desk.set_hall_active(hall_id, active)?;
            Outcome::quiet(Reply::Done)
        }
        Request::BookFieldRecurring {
            field_id,
            date,
            slot,
            customer,
            weeks,
        } => {
            let request = FieldBookingRequest {
                field_id,
                date: parse_calendar_date(&date)?,
                slot,
                customer,
            };
            let series = desk.book_field_recurring(&request, weeks, now)?;
            field_series(series)
        }
        Request::BlockFieldSlot {
            field_id,
            date,
            slot,
            weeks,
        } => {
            let date = parse_calendar_date(&date)?;
            field_series(desk.block_field_slot(field_id, date, slot, weeks, now)?)
        }
        Request::BlockHallDate {
            hall_id,
            date,
            weeks,
        } => {
            let date = parse_calendar_date(&date)?;
            let series = desk.block_hall_date(hall_id, date, weeks, now)?;
            Outcome {
                events: series
                    .iter()
                    .cloned()
                    .map(|reservation| BookingEvent::HallReservationCreated { reservation })
                    .collect(),
                reply: Reply::HallReservations {
                    reservations: series,
                },
            }
        }
        Request::SetFieldStatus { id, status } => {
            let before = desk.store().find_field_reservation(id)?;
            let reservation = desk.set_field_status(id, status)?;
            let events = match before {
                Some(b) if b.status != reservation.status => vec![BookingEvent::FieldStatusChanged {
                    reservation: reservation.clone(),
                    from: b.status,
                }],
                _ => Vec::new(),
            };
            Outcome {
                events,
                reply: Reply::FieldReservation { reservation },
            }
        }
        Request::SetHallStatus { id, status } => {
            let before = desk.store().find_hall_reservation(id)?;
            let reservation = desk.set_hall_status(id, status)?;
            let events = match before {
                Some(b) if b.status != reservation.status => vec![BookingEvent::HallStatusChanged {
                    reservation: reservation.clone(),
                    from: b.status,
                }],
                _ => Vec::new(),
            };
            Outcome {
                events,
                reply: Reply::HallReservation { reservation },
            }
        }
        Request::CancelGroup { group_id } => {
            let count = desk.cancel_group(group_id)?;
            Outcome {
                events: vec![BookingEvent::GroupCanceled { group_id, count }],
                reply: Reply::Canceled { count },
            }
        }
        Request::DeleteFieldReservation { id } => {
            let removed = desk.delete_field_reservation(id)?;
            Outcome {
                events: vec![BookingEvent::FieldReservationDeleted {
                    id,
                    field_id: removed.field_id,
                    date: removed.date,
                }],
                reply: Reply::Done,
            }
        }
        Request::DeleteHallReservation { id } => {
            let removed = desk.delete_hall_reservation(id)?;
            Outcome {
                events: vec![BookingEvent::HallReservationDeleted {
                    id,
                    hall_id: removed.hall_id,
                    date: removed.date,
                }],
                reply: Reply::Done,
            }
        }
        Request::FieldReservations { filter } => Outcome::quiet(Reply::FieldReservations {
            reservations: desk.field_reservations(&filter)?,
        }),
        Request::HallReservations { filter } => Outcome::quiet(Reply::HallReservations {
            reservations: desk.hall_reservations(&filter)?,
        }),
        Request::AuditLog { limit } => Outcome::quiet(Reply::Audit {
            entries: desk.audit_log(limit)?,
        }),
    };
    Ok(outcome)
}

fn field_series(series: Vec<venue_core::FieldReservation>) -> Outcome {
    Outcome {
        events: series
            .iter()
            .cloned()
            .map(|reservation| BookingEvent::FieldReservationCreated { reservation })
            .collect(),
        reply: Reply::FieldReservations {
            reservations: series,
        },
    }
}
