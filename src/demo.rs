//! Reproducible demo roster: one term, a week of groups, and a few dozen students
//! already placed. Student 1 is enrolled but not in any group.

use chrono::{NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::model::{
    Enrollment, EnrollmentType, SkillLevel, Student, StudentId, TimePreference, TimeSlot,
};
use crate::store::{CoachSeed, GroupSeed, StoreSeed, UnavailabilitySeed};

const TERM_ID: u32 = 1;
const STUDENT_COUNT: u32 = 60;
const DAYS: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];
const SKILLS: [SkillLevel; 3] = [SkillLevel::Beginner, SkillLevel::Intermediate, SkillLevel::Advanced];
const FIRST_NAMES: [&str; 12] = [
    "Ava", "Ben", "Chloe", "Dev", "Ella", "Finn", "Grace", "Hugo", "Isla", "Jack", "Kiara", "Leo",
];
const LAST_NAMES: [&str; 8] = ["Nguyen", "Smith", "Patel", "Brown", "Wilson", "Taylor", "Kim", "Rossi"];
const COACHES: [&str; 3] = ["Coach Ana", "Coach Boris", "Coach Chen"];

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

fn time_slots() -> Vec<TimeSlot> {
    [(8, 0), (12, 30), (15, 0), (15, 45)]
        .iter()
        .enumerate()
        .map(|(i, &(hour, minute))| {
            let start = time(hour, minute);
            TimeSlot {
                id: i as u32 + 1,
                start_time: start,
                end_time: start + chrono::Duration::minutes(45),
            }
        })
        .collect()
}

fn random_enrollment_type(rng: &mut StdRng) -> EnrollmentType {
    match rng.gen_range(0..20) {
        0..=2 => EnrollmentType::Solo,
        3..=9 => EnrollmentType::Pair,
        _ => EnrollmentType::Group,
    }
}

/// Whether a student of `wanted` type may join a group whose members have `present` types
fn accepts(present: &[EnrollmentType], capacity: u32, wanted: EnrollmentType) -> bool {
    let size = present.len() as u32;
    if size >= capacity {
        return false;
    }
    if present.iter().any(|&t| t != wanted) {
        return false;
    }
    match wanted {
        EnrollmentType::Solo => size == 0,
        EnrollmentType::Pair => size < 2,
        EnrollmentType::Group => true,
    }
}

/// Generate a roster from `seed`. The same seed always gives the same roster.
pub fn generate_seed(seed: u64) -> StoreSeed {
    let mut rng = StdRng::seed_from_u64(seed);
    let slots = time_slots();

    let coaches: Vec<CoachSeed> = COACHES
        .iter()
        .enumerate()
        .map(|(i, &name)| CoachSeed {
            id: i as u32 + 1,
            name: name.to_string(),
            specializations: if rng.gen_bool(0.7) {
                Some(vec![*SKILLS.choose(&mut rng).unwrap_or(&SkillLevel::Beginner)])
            } else {
                None
            },
        })
        .collect();

    let mut students = Vec::with_capacity(STUDENT_COUNT as usize);
    let mut enrollments = Vec::with_capacity(STUDENT_COUNT as usize);
    for id in 1..=STUDENT_COUNT {
        let year_level: u8 = rng.gen_range(2..=8);
        let class_letter = if rng.gen_bool(0.5) { "A" } else { "B" };
        let time_preferences = if rng.gen_bool(0.3) {
            vec![TimePreference {
                day: DAYS[rng.gen_range(0..DAYS.len())],
                time_slot_id: None,
            }]
        } else {
            Vec::new()
        };
        students.push(Student {
            id,
            first_name: FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())].to_string(),
            last_name: LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())].to_string(),
            year_level,
            school_class: Some(format!("{}{}", year_level, class_letter)),
            skill_level: SKILLS[rng.gen_range(0..SKILLS.len())],
            time_preferences,
        });
        enrollments.push(Enrollment {
            student_id: id,
            term_id: TERM_ID,
            enrollment_type: random_enrollment_type(&mut rng),
            target_lessons: 8,
            lessons_carried_forward: rng.gen_range(0..=3),
            lessons_attended: rng.gen_range(0..=10),
        });
    }

    let mut groups = Vec::new();
    for (d, &day) in DAYS.iter().enumerate() {
        for slot in &slots {
            if !rng.gen_bool(0.65) {
                continue;
            }
            let id = groups.len() as u32 + 1;
            let max_capacity = *[1u32, 2, 4, 4, 6].choose(&mut rng).unwrap_or(&4);
            groups.push(GroupSeed {
                id,
                name: format!("{:?} {}", day, id),
                coach_id: (d as u32 + slot.id) % COACHES.len() as u32 + 1,
                term_id: TERM_ID,
                day,
                time_slot_id: slot.id,
                max_capacity,
                preferred_size: max_capacity.min(3),
                target_skill_level: SKILLS[rng.gen_range(0..SKILLS.len())],
                member_ids: Vec::new(),
            });
        }
    }

    // Place everyone but student 1 into at most one group of a compatible type
    let mut member_types: Vec<Vec<EnrollmentType>> = vec![Vec::new(); groups.len()];
    if !groups.is_empty() {
        for enrollment in enrollments.iter().skip(1) {
            for _ in 0..10 {
                let g = rng.gen_range(0..groups.len());
                if accepts(&member_types[g], groups[g].max_capacity, enrollment.enrollment_type) {
                    groups[g].member_ids.push(enrollment.student_id);
                    member_types[g].push(enrollment.enrollment_type);
                    break;
                }
            }
        }
    }

    let mut unavailability = Vec::new();
    for year in 2..=8u8 {
        for letter in ["A", "B"] {
            let slot = &slots[rng.gen_range(0..slots.len())];
            unavailability.push(UnavailabilitySeed {
                day: DAYS[rng.gen_range(0..DAYS.len())],
                time_slot_id: slot.id,
                student_ids: Vec::new(),
                school_classes: vec![format!("{}{}", year, letter)],
            });
        }
    }
    for _ in 0..STUDENT_COUNT / 3 {
        let student_id: StudentId = rng.gen_range(1..=STUDENT_COUNT);
        unavailability.push(UnavailabilitySeed {
            day: DAYS[rng.gen_range(0..DAYS.len())],
            time_slot_id: slots[rng.gen_range(0..slots.len())].id,
            student_ids: vec![student_id],
            school_classes: Vec::new(),
        });
    }

    StoreSeed {
        active_term: Some(TERM_ID),
        students,
        enrollments,
        time_slots: slots,
        coaches,
        groups,
        unavailability,
    }
}
