//! Multi-factor compatibility scoring between a student and a group.
//!
//! Each factor is worth at most its weight, so a total never exceeds
//! [`ScoringWeights::max_total`] (370 with the default weights). Skill level and
//! enrollment type act as gates: if either contributes nothing, or the student's
//! year level is too far from the group's, the candidate is not viable and its
//! total is 0.

use serde::{Deserialize, Serialize};

use crate::config::SlotFinderConfig;
use crate::model::{EffectiveGroupType, EnrollmentType, Member, Occupancy, SkillLevel};

/// Maximum points per factor.
///
/// `lesson_balance` and `coach_specialization` rest on weak signals and are
/// expected to be tuned against real data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub skill_level: u32,
    pub enrollment_type: u32,
    pub capacity_headroom: u32,
    pub size_preference: u32,
    pub lesson_balance: u32,
    pub coach_specialization: u32,
    pub time_preference: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill_level: 100,
            enrollment_type: 80,
            capacity_headroom: 30,
            size_preference: 50,
            lesson_balance: 40,
            coach_specialization: 50,
            time_preference: 20,
        }
    }
}

impl ScoringWeights {
    /// Each weight with its config key
    pub fn named(&self) -> [(&'static str, u32); 7] {
        [
            ("skill_level", self.skill_level),
            ("enrollment_type", self.enrollment_type),
            ("capacity_headroom", self.capacity_headroom),
            ("size_preference", self.size_preference),
            ("lesson_balance", self.lesson_balance),
            ("coach_specialization", self.coach_specialization),
            ("time_preference", self.time_preference),
        ]
    }

    pub fn max_total(&self) -> u32 {
        self.named()
            .iter()
            .fold(0, |total, (_, weight)| total.saturating_add(*weight))
    }
}

/// Points awarded per factor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub skill_level: u32,
    pub enrollment_type: u32,
    pub capacity_headroom: u32,
    pub size_preference: u32,
    pub lesson_balance: u32,
    pub coach_specialization: u32,
    pub time_preference: u32,
}

impl ScoreBreakdown {
    pub fn sum(&self) -> u32 {
        [
            self.skill_level,
            self.enrollment_type,
            self.capacity_headroom,
            self.size_preference,
            self.lesson_balance,
            self.coach_specialization,
            self.time_preference,
        ]
        .into_iter()
        .fold(0, u32::saturating_add)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Compatibility {
    /// Sum of the breakdown for viable candidates, 0 otherwise
    pub total: u32,
    pub breakdown: ScoreBreakdown,
    pub viable: bool,
}

impl Compatibility {
    pub fn percentage(&self, max_total: u32) -> u32 {
        if max_total == 0 {
            0
        } else {
            (u64::from(self.total) * 100 / u64::from(max_total)) as u32
        }
    }
}

fn portion(weight: u32, percent: u32) -> u32 {
    (u64::from(weight) * u64::from(percent) / 100) as u32
}

#[derive(Debug, Clone)]
pub struct CompatibilityScorer {
    weights: ScoringWeights,
    max_year_gap: Option<u8>,
}

impl CompatibilityScorer {
    pub fn new(weights: ScoringWeights, max_year_gap: Option<u8>) -> Self {
        Self { weights, max_year_gap }
    }

    pub fn from_config(config: &SlotFinderConfig) -> Self {
        Self::new(config.weights.clone(), config.search.max_year_gap)
    }

    pub fn max_total(&self) -> u32 {
        self.weights.max_total()
    }

    /// Score `applicant` joining the members of `occupancy`.
    ///
    /// `coach_specialization` is `None` when the coach has not declared any.
    pub fn score(
        &self,
        applicant: &Member,
        occupancy: &Occupancy<'_>,
        coach_specialization: Option<&[SkillLevel]>,
    ) -> Compatibility {
        let breakdown = ScoreBreakdown {
            skill_level: self.skill_points(applicant, occupancy),
            enrollment_type: self.enrollment_type_points(applicant, occupancy),
            capacity_headroom: self.headroom_points(occupancy),
            size_preference: self.size_preference_points(applicant, occupancy),
            lesson_balance: self.lesson_balance_points(applicant),
            coach_specialization: self.coach_points(applicant, coach_specialization),
            time_preference: self.time_preference_points(applicant, occupancy),
        };

        let viable = breakdown.skill_level > 0
            && breakdown.enrollment_type > 0
            && self.year_level_compatible(applicant, occupancy);

        Compatibility {
            total: if viable { breakdown.sum() } else { 0 },
            breakdown,
            viable,
        }
    }

    fn skill_points(&self, applicant: &Member, occupancy: &Occupancy<'_>) -> u32 {
        match applicant.student.skill_level.distance(occupancy.group.target_skill_level) {
            0 => self.weights.skill_level,
            1 => portion(self.weights.skill_level, 60),
            _ => 0,
        }
    }

    fn enrollment_type_points(&self, applicant: &Member, occupancy: &Occupancy<'_>) -> u32 {
        let percent = match (applicant.enrollment_type(), occupancy.effective_type()) {
            (_, EffectiveGroupType::Open) => 100,
            // Solo lessons are one-on-one in both directions
            (EnrollmentType::Solo, _) => 0,
            (_, EffectiveGroupType::Uniform(EnrollmentType::Solo)) => 0,
            (wanted, EffectiveGroupType::Uniform(group_type)) if wanted == group_type => 100,
            (EnrollmentType::Group, EffectiveGroupType::Uniform(EnrollmentType::Pair)) => 50,
            (_, EffectiveGroupType::Mixed) => 25,
            _ => 0,
        };
        portion(self.weights.enrollment_type, percent)
    }

    fn headroom_points(&self, occupancy: &Occupancy<'_>) -> u32 {
        let preferred = occupancy.group.preferred_size;
        if preferred == 0 {
            return 0;
        }
        let deficit = preferred.saturating_sub(occupancy.current_size());
        (u64::from(self.weights.capacity_headroom) * u64::from(deficit) / u64::from(preferred)) as u32
    }

    fn size_preference_points(&self, applicant: &Member, occupancy: &Occupancy<'_>) -> u32 {
        let current = occupancy.current_size();
        let percent = match applicant.enrollment_type() {
            EnrollmentType::Pair => match current {
                1 => 100,
                0 => 40,
                _ => 0,
            },
            EnrollmentType::Group => match current {
                1 | 2 => 100,
                0 => 50,
                _ => 20,
            },
            EnrollmentType::Solo => {
                if current == 0 {
                    100
                } else {
                    0
                }
            }
        };
        portion(self.weights.size_preference, percent)
    }

    fn lesson_balance_points(&self, applicant: &Member) -> u32 {
        let balance = applicant.enrollment.lesson_balance();
        let percent = if balance > 3 {
            100
        } else if balance > 1 {
            75
        } else if balance >= 0 {
            50
        } else {
            25
        };
        portion(self.weights.lesson_balance, percent)
    }

    fn coach_points(&self, applicant: &Member, specialization: Option<&[SkillLevel]>) -> u32 {
        match specialization {
            Some(levels) if levels.contains(&applicant.student.skill_level) => {
                self.weights.coach_specialization
            }
            Some(_) => portion(self.weights.coach_specialization, 40),
            None => 0,
        }
    }

    fn time_preference_points(&self, applicant: &Member, occupancy: &Occupancy<'_>) -> u32 {
        let group = occupancy.group;
        let matches = applicant.student.time_preferences.iter().any(|pref| {
            pref.day == group.day
                && pref.time_slot_id.map_or(true, |slot| slot == group.time_slot.id)
        });
        if matches {
            self.weights.time_preference
        } else {
            0
        }
    }

    fn year_level_compatible(&self, applicant: &Member, occupancy: &Occupancy<'_>) -> bool {
        let Some(gap) = self.max_year_gap else {
            return true;
        };
        let (sum, count) = occupancy.year_level_totals();
        if count == 0 {
            return true;
        }
        // |year - sum/count| <= gap, kept in integers
        let scaled_year = applicant.student.year_level as u32 * count;
        scaled_year.abs_diff(sum) <= gap as u32 * count
    }
}

impl Default for CompatibilityScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default(), Some(2))
    }
}
