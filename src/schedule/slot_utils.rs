use chrono::{NaiveTime, Weekday};

use crate::model::{Group, TimeSlot, TimeSlotId};

/// Key used for availability lookups: a weekly (day, time slot) pair
pub type SlotKey = (Weekday, TimeSlotId);

pub fn slot_key(group: &Group) -> SlotKey {
    (group.day, group.time_slot.id)
}

/// Full English day name for display
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Formats a time as HH:MM
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Formats a slot as "HH:MM - HH:MM"
pub fn format_time_slot(slot: &TimeSlot) -> String {
    format!("{} - {}", format_time(slot.start_time), format_time(slot.end_time))
}

/// Chronological ordering key within a week (Monday first)
pub fn chronological_key(day: Weekday, slot: &TimeSlot) -> (u32, NaiveTime) {
    (day.num_days_from_monday(), slot.start_time)
}

/// Deterministic group order used by every search phase: day, start time, then id
pub fn sort_groups_chronologically(groups: &mut [Group]) {
    groups.sort_by(|a, b| {
        chronological_key(a.day, &a.time_slot)
            .cmp(&chronological_key(b.day, &b.time_slot))
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_slot() {
        let slot = TimeSlot {
            id: 3,
            start_time: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(16, 15, 0).unwrap(),
        };
        assert_eq!(format_time_slot(&slot), "15:30 - 16:15");
    }

    #[test]
    fn test_chronological_key_orders_monday_first() {
        let early = TimeSlot {
            id: 1,
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(8, 45, 0).unwrap(),
        };
        let late = TimeSlot {
            id: 2,
            start_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(15, 45, 0).unwrap(),
        };
        assert!(chronological_key(Weekday::Mon, &late) < chronological_key(Weekday::Tue, &early));
        assert!(chronological_key(Weekday::Mon, &early) < chronological_key(Weekday::Mon, &late));
    }
}
