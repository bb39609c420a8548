use std::time::Instant;

/// Cooperative limit on search work.
///
/// The search calls [`tick`](Self::tick) at safe points (per group, per occupant,
/// per chain step) and stops once it returns `false`. Exhaustion is sticky.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    deadline: Option<Instant>,
    max_steps: u64,
    steps: u64,
    exhausted: bool,
}

impl SearchBudget {
    pub fn new(deadline: Option<Instant>, max_steps: u64) -> Self {
        Self {
            deadline,
            max_steps,
            steps: 0,
            exhausted: false,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None, u64::MAX)
    }

    /// Consume one step. Returns `false` once the step limit or the deadline is reached.
    pub fn tick(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        if self.steps >= self.max_steps || self.deadline_passed() {
            self.exhausted = true;
            return false;
        }
        self.steps += 1;
        true
    }

    /// Checks the deadline without consuming a step
    pub fn is_exhausted(&self) -> bool {
        self.exhausted || self.deadline_passed()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_limit() {
        let mut budget = SearchBudget::new(None, 2);
        assert!(budget.tick());
        assert!(budget.tick());
        assert!(!budget.tick());
        assert!(budget.is_exhausted());
        assert_eq!(budget.steps(), 2);
    }

    #[test]
    fn test_elapsed_deadline_stops_immediately() {
        let mut budget = SearchBudget::new(Some(Instant::now()), u64::MAX);
        assert!(budget.is_exhausted());
        assert!(!budget.tick());
        assert_eq!(budget.steps(), 0);
    }

    #[test]
    fn test_unlimited_budget() {
        let mut budget = SearchBudget::unlimited();
        for _ in 0..1000 {
            assert!(budget.tick());
        }
        assert!(!budget.is_exhausted());
    }
}
