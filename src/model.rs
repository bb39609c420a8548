use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub type StudentId = u32;
pub type GroupId = u32;
pub type TimeSlotId = u32;
pub type CoachId = u32;
pub type TermId = u32;

/// Chess skill level of a student, also used as a group's target level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    fn rank(self) -> u8 {
        match self {
            SkillLevel::Beginner => 0,
            SkillLevel::Intermediate => 1,
            SkillLevel::Advanced => 2,
        }
    }

    /// Number of levels between two skill levels (0 = same level)
    pub fn distance(self, other: SkillLevel) -> u8 {
        self.rank().abs_diff(other.rank())
    }

    pub fn label(self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
        }
    }
}

/// Kind of lessons a student is enrolled for in a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnrollmentType {
    Solo,
    Pair,
    Group,
}

impl EnrollmentType {
    pub fn label(self) -> &'static str {
        match self {
            EnrollmentType::Solo => "SOLO",
            EnrollmentType::Pair => "PAIR",
            EnrollmentType::Group => "GROUP",
        }
    }
}

/// Atomic schedulable unit. Two slots are the same slot only if their ids match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl PartialEq for TimeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TimeSlot {}

/// A day (and optionally a specific slot) the student would like lessons in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePreference {
    pub day: Weekday,
    #[serde(default)]
    pub time_slot_id: Option<TimeSlotId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub year_level: u8,
    #[serde(default)]
    pub school_class: Option<String>,
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub time_preferences: Vec<TimePreference>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub student_id: StudentId,
    pub term_id: TermId,
    pub enrollment_type: EnrollmentType,
    #[serde(default = "default_target_lessons")]
    pub target_lessons: i32,
    #[serde(default)]
    pub lessons_carried_forward: i32,
    #[serde(default)]
    pub lessons_attended: i32,
}

fn default_target_lessons() -> i32 {
    8
}

impl Enrollment {
    /// Positive = lessons owed to the student, negative = lessons in credit
    pub fn lesson_balance(&self) -> i32 {
        self.target_lessons + self.lessons_carried_forward - self.lessons_attended
    }
}

/// A student together with their enrollment for the term being scheduled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub student: Student,
    pub enrollment: Enrollment,
}

impl Member {
    pub fn id(&self) -> StudentId {
        self.student.id
    }

    pub fn enrollment_type(&self) -> EnrollmentType {
        self.enrollment.enrollment_type
    }
}

/// A scheduled lesson group: one coach, one weekly (day, slot), one term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub coach_id: CoachId,
    pub coach_name: String,
    pub term_id: TermId,
    pub day: Weekday,
    pub time_slot: TimeSlot,
    pub max_capacity: u32,
    pub preferred_size: u32,
    pub target_skill_level: SkillLevel,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Group {
    pub fn has_member(&self, student_id: StudentId) -> bool {
        self.members.iter().any(|m| m.id() == student_id)
    }

    /// Current membership as an occupancy view
    pub fn occupancy(&self) -> Occupancy<'_> {
        Occupancy {
            group: self,
            members: self.members.iter().collect(),
        }
    }

    /// Membership with one student taken out, as it would look after a displacement
    pub fn occupancy_without(&self, student_id: StudentId) -> Occupancy<'_> {
        Occupancy {
            group: self,
            members: self.members.iter().filter(|m| m.id() != student_id).collect(),
        }
    }
}

/// Enrollment-type classification of a group, derived from its occupants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EffectiveGroupType {
    /// No occupants: accepts any enrollment type
    Open,
    /// Every occupant shares this enrollment type
    Uniform(EnrollmentType),
    Mixed,
}

impl EffectiveGroupType {
    pub fn label(self) -> &'static str {
        match self {
            EffectiveGroupType::Open => "OPEN",
            EffectiveGroupType::Uniform(t) => t.label(),
            EffectiveGroupType::Mixed => "MIXED",
        }
    }

    /// Seats a group of this type offers regardless of its configured capacity
    pub fn seat_limit(self) -> Option<u32> {
        match self {
            EffectiveGroupType::Uniform(EnrollmentType::Solo) => Some(1),
            EffectiveGroupType::Uniform(EnrollmentType::Pair) => Some(2),
            _ => None,
        }
    }
}

/// A group seen through a selection of its members.
///
/// Size and effective type are always recomputed from `members`, so a view with a
/// displaced student removed classifies the group exactly as it would be after the move.
#[derive(Debug, Clone)]
pub struct Occupancy<'a> {
    pub group: &'a Group,
    pub members: Vec<&'a Member>,
}

impl<'a> Occupancy<'a> {
    pub fn current_size(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn effective_type(&self) -> EffectiveGroupType {
        let mut types = self.members.iter().map(|m| m.enrollment_type());
        match types.next() {
            None => EffectiveGroupType::Open,
            Some(first) => {
                if types.all(|t| t == first) {
                    EffectiveGroupType::Uniform(first)
                } else {
                    EffectiveGroupType::Mixed
                }
            }
        }
    }

    pub fn has_space(&self) -> bool {
        let size = self.current_size();
        if size >= self.group.max_capacity {
            return false;
        }
        match self.effective_type().seat_limit() {
            Some(limit) => size < limit,
            None => true,
        }
    }

    /// Sum and count of occupant year levels, for integer average comparisons
    pub fn year_level_totals(&self) -> (u32, u32) {
        let sum = self.members.iter().map(|m| m.student.year_level as u32).sum();
        (sum, self.current_size())
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.student.full_name()).collect()
    }
}

/// A (day, slot) in which a student cannot have lessons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unavailability {
    pub day: Weekday,
    pub time_slot_id: TimeSlotId,
}
