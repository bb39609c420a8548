//! Builders shared by the schedule unit tests.

use std::collections::HashMap;

use chrono::{NaiveTime, Weekday};

use crate::model::{
    Enrollment, EnrollmentType, Group, GroupId, Member, SkillLevel, Student, StudentId, TimeSlot,
    TimeSlotId, Unavailability,
};
use super::snapshot::ScheduleSnapshot;

pub fn slot(id: TimeSlotId, hour: u32) -> TimeSlot {
    TimeSlot {
        id,
        start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(hour, 45, 0).unwrap(),
    }
}

pub fn member(id: StudentId, enrollment_type: EnrollmentType, skill_level: SkillLevel) -> Member {
    Member {
        student: Student {
            id,
            first_name: format!("Student{}", id),
            last_name: "Test".to_string(),
            year_level: 4,
            school_class: None,
            skill_level,
            time_preferences: Vec::new(),
        },
        enrollment: Enrollment {
            student_id: id,
            term_id: 1,
            enrollment_type,
            target_lessons: 8,
            lessons_carried_forward: 0,
            lessons_attended: 0,
        },
    }
}

pub fn group(
    id: GroupId,
    day: Weekday,
    time_slot: TimeSlot,
    max_capacity: u32,
    target_skill_level: SkillLevel,
    members: Vec<Member>,
) -> Group {
    Group {
        id,
        name: format!("Group {}", id),
        coach_id: 1,
        coach_name: "Coach Carter".to_string(),
        term_id: 1,
        day,
        time_slot,
        max_capacity,
        preferred_size: max_capacity.min(3),
        target_skill_level,
        members,
    }
}

/// Snapshot without unavailability or coach specializations
pub fn snapshot(target: Member, groups: Vec<Group>) -> ScheduleSnapshot {
    ScheduleSnapshot::new(target, groups, HashMap::new(), HashMap::new())
}

pub fn blocked(day: Weekday, time_slot_id: TimeSlotId) -> Unavailability {
    Unavailability { day, time_slot_id }
}
