use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

use crate::model::{GroupId, Member};
use super::slot_utils::{chronological_key, day_name, format_time_slot};
use super::types::{
    Candidate, PlacementPlan, PlacementSummary, PlacementType, Recommendation,
};

/// Turns raw search candidates into the final, ordered recommendation list
#[derive(Debug, Clone)]
pub struct RecommendationRanker {
    max_total: u32,
}

impl RecommendationRanker {
    pub fn new(max_total: u32) -> Self {
        Self { max_total }
    }

    pub fn rank(
        &self,
        target: &Member,
        candidates: Vec<Candidate>,
        max_results: usize,
    ) -> (Vec<Recommendation>, PlacementSummary) {
        let mut best: HashMap<(GroupId, PlacementType), Candidate> = HashMap::new();
        for candidate in candidates {
            let key = (candidate.group.id, candidate.placement_type);
            match best.get(&key) {
                Some(existing) if !is_better(&candidate, existing) => {}
                _ => {
                    best.insert(key, candidate);
                }
            }
        }

        let mut ordered: Vec<Candidate> = best.into_values().collect();
        ordered.sort_by(compare);
        ordered.truncate(max_results);

        let recommendations: Vec<Recommendation> = ordered
            .into_iter()
            .map(|c| self.recommendation(target, c))
            .collect();
        let summary = summarize(&recommendations);
        (recommendations, summary)
    }

    fn recommendation(&self, target: &Member, candidate: Candidate) -> Recommendation {
        let explanation = explain(target, &candidate);
        let plan = PlacementPlan::build(target.id(), candidate.group.id, &candidate.moves);
        Recommendation {
            group_id: candidate.group.id,
            group_name: candidate.group.name,
            score: candidate.compatibility.total,
            percentage: candidate.compatibility.percentage(self.max_total),
            placement_type: candidate.placement_type,
            day: day_name(candidate.group.day).to_string(),
            time_slot: format_time_slot(&candidate.group.time_slot),
            coach: candidate.group.coach_name,
            current_size: candidate.current_size,
            max_capacity: candidate.group.max_capacity,
            displaced_students: candidate.displaced,
            explanation,
            feasibility_score: candidate.feasibility_score,
            breakdown: candidate.compatibility.breakdown,
            plan,
        }
    }
}

/// Higher score, then higher feasibility, then fewer displaced students
fn is_better(candidate: &Candidate, existing: &Candidate) -> bool {
    let key = |c: &Candidate| {
        (
            c.compatibility.total,
            c.feasibility_score,
            Reverse(c.displaced.len()),
        )
    };
    key(candidate) > key(existing)
}

fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    b.compatibility
        .total
        .cmp(&a.compatibility.total)
        .then(a.current_size.cmp(&b.current_size))
        .then(
            chronological_key(a.group.day, &a.group.time_slot)
                .cmp(&chronological_key(b.group.day, &b.group.time_slot)),
        )
        .then(a.placement_type.rank().cmp(&b.placement_type.rank()))
        .then(a.group.id.cmp(&b.group.id))
}

fn summarize(recommendations: &[Recommendation]) -> PlacementSummary {
    let count = |t: PlacementType| {
        recommendations
            .iter()
            .filter(|r| r.placement_type == t)
            .count()
    };
    let single = count(PlacementType::SingleDisplacement);
    let chain = count(PlacementType::ChainDisplacement);
    PlacementSummary {
        total: recommendations.len(),
        direct_count: count(PlacementType::Direct),
        displacement_count: single + chain,
        single_displacement_count: single,
        chain_displacement_count: chain,
    }
}

fn explain(target: &Member, candidate: &Candidate) -> String {
    let fit = format!(
        "enrollment type: {}, {}, {}",
        target.enrollment_type().label(),
        companions_text(&candidate.companions),
        skill_text(target, candidate)
    );

    match candidate.placement_type {
        PlacementType::Direct => format!(
            "Direct placement - {}/{} students, {}",
            candidate.current_size, candidate.group.max_capacity, fit
        ),
        PlacementType::SingleDisplacement => match candidate.displaced.first() {
            Some(d) => format!(
                "Single displacement - move {} ({}) to {} {} ({}) to make room, {}",
                d.name,
                d.enrollment_type.label(),
                d.to_day,
                d.to_time_slot,
                d.to_group_name,
                fit
            ),
            None => format!("Single displacement - {}", fit),
        },
        PlacementType::ChainDisplacement => {
            let steps: Vec<String> = candidate
                .displaced
                .iter()
                .map(|d| format!("{} -> {} ({} {})", d.name, d.to_group_name, d.to_day, d.to_time_slot))
                .collect();
            format!(
                "Chain displacement - {} students move: {}; {}",
                candidate.displaced.len(),
                steps.join("; "),
                fit
            )
        }
    }
}

fn companions_text(companions: &[String]) -> String {
    match companions {
        [] => "empty group available".to_string(),
        [only] => format!("join {}", only),
        [first, second] => format!("join {} and {}", first, second),
        _ => format!("group has {} students", companions.len()),
    }
}

fn skill_text(target: &Member, candidate: &Candidate) -> String {
    if target.student.skill_level == candidate.group.target_skill_level {
        "perfect skill match".to_string()
    } else {
        format!("skill level {} group", candidate.group.target_skill_level.label())
    }
}
