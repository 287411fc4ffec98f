//! iCalendar adapter for the freebusy engine.
//!
//! Turns `VEVENT`s into the engine's inputs:
//!
//! - [`parse_ics`] - a calendar's blocking events as [`CalendarEntry`] values
//! - [`parse_rrule`] - an `RRULE` value as [`RRuleParts`], convertible with
//!   [`RRuleParts::to_rule`]
//! - [`IcalError`] - what went wrong, with the event's UID when known
//!
//! ```
//! let ics = "BEGIN:VCALENDAR\r\n\
//!            VERSION:2.0\r\n\
//!            BEGIN:VEVENT\r\n\
//!            UID:standup@example.com\r\n\
//!            DTSTART:20240101T090000Z\r\n\
//!            DTEND:20240101T093000Z\r\n\
//!            RRULE:FREQ=WEEKLY;BYDAY=MO,WE\r\n\
//!            END:VEVENT\r\n\
//!            END:VCALENDAR\r\n";
//!
//! let entries = freebusy_ical::parse_ics(ics).unwrap();
//! assert!(entries[0].is_recurring());
//! ```

pub mod error;
pub mod ics;
pub mod rrule;
pub mod value;

pub use error::{IcalError, IcalErrorCode, IcalResult};
pub use ics::{CalendarEntry, parse_event, parse_ics};
pub use rrule::{Frequency, RRuleParts, WeekdayNum, parse_rrule};
pub use value::{IcalTime, parse_ical_time};
