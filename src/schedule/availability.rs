use std::collections::{HashMap, HashSet};

use chrono::Weekday;

use crate::model::{Group, GroupId, StudentId, TimeSlotId, Unavailability};
use super::slot_utils::{slot_key, SlotKey};

/// Scheduling conflicts of one student, loaded once per search.
///
/// Building costs one pass over the student's unavailability records and the
/// group list; every lookup afterwards is a hash probe.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    blocked: HashSet<SlotKey>,
    booked: HashMap<SlotKey, Vec<GroupId>>,
}

impl AvailabilityIndex {
    pub fn build(student_id: StudentId, unavailability: &[Unavailability], groups: &[Group]) -> Self {
        let blocked = unavailability
            .iter()
            .map(|u| (u.day, u.time_slot_id))
            .collect();

        let mut booked: HashMap<SlotKey, Vec<GroupId>> = HashMap::new();
        for group in groups.iter().filter(|g| g.has_member(student_id)) {
            booked.entry(slot_key(group)).or_default().push(group.id);
        }

        Self { blocked, booked }
    }

    /// Neither unavailable nor already booked at this (day, slot)
    pub fn is_free(&self, day: Weekday, time_slot_id: TimeSlotId) -> bool {
        let key = (day, time_slot_id);
        !self.blocked.contains(&key) && !self.booked.contains_key(&key)
    }

    /// Like [`is_free`](Self::is_free), but a booking in `leaving` does not count
    pub fn is_free_after_leaving(&self, day: Weekday, time_slot_id: TimeSlotId, leaving: GroupId) -> bool {
        let key = (day, time_slot_id);
        if self.blocked.contains(&key) {
            return false;
        }
        match self.booked.get(&key) {
            Some(groups) => groups.iter().all(|&g| g == leaving),
            None => true,
        }
    }
}

#[cfg(test)]
impl AvailabilityIndex {
    fn is_booked_in(&self, group: &Group) -> bool {
        self.booked
            .get(&slot_key(group))
            .map(|groups| groups.contains(&group.id))
            .unwrap_or(false)
    }

    fn blocked_count(&self) -> usize {
        self.blocked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::fixtures::{group, member, slot};
    use crate::model::{EnrollmentType, SkillLevel};

    #[test]
    fn test_unavailability_blocks_slot() {
        let unavailability = vec![Unavailability { day: Weekday::Tue, time_slot_id: 2 }];
        let index = AvailabilityIndex::build(1, &unavailability, &[]);

        assert!(!index.is_free(Weekday::Tue, 2));
        assert!(index.is_free(Weekday::Tue, 1));
        assert!(index.is_free(Weekday::Wed, 2));
        assert_eq!(index.blocked_count(), 1);
    }

    #[test]
    fn test_duplicate_records_collapse() {
        let unavailability = vec![
            Unavailability { day: Weekday::Mon, time_slot_id: 1 },
            Unavailability { day: Weekday::Mon, time_slot_id: 1 },
        ];
        let index = AvailabilityIndex::build(1, &unavailability, &[]);
        assert_eq!(index.blocked_count(), 1);
    }

    #[test]
    fn test_existing_booking_is_busy_until_left() {
        let booked = group(
            10,
            Weekday::Mon,
            slot(1, 15),
            4,
            SkillLevel::Beginner,
            vec![member(1, EnrollmentType::Group, SkillLevel::Beginner)],
        );
        let index = AvailabilityIndex::build(1, &[], &[booked.clone()]);

        assert!(!index.is_free(Weekday::Mon, 1));
        assert!(index.is_booked_in(&booked));
        assert!(index.is_free_after_leaving(Weekday::Mon, 1, 10));
        assert!(!index.is_free_after_leaving(Weekday::Mon, 1, 11));
    }

    #[test]
    fn test_leaving_does_not_lift_unavailability() {
        let booked = group(
            10,
            Weekday::Mon,
            slot(1, 15),
            4,
            SkillLevel::Beginner,
            vec![member(1, EnrollmentType::Group, SkillLevel::Beginner)],
        );
        let unavailability = vec![Unavailability { day: Weekday::Mon, time_slot_id: 1 }];
        let index = AvailabilityIndex::build(1, &unavailability, &[booked]);
        assert!(!index.is_free_after_leaving(Weekday::Mon, 1, 10));
    }
}
