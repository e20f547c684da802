use crate::models::{Gender, UserRecord, UserState};
use crate::state::HistoryLedger;

/// Pure compatibility predicate: a boolean hard gate rather than a weighted
/// score. Other matching systems in this family split a hard filter pass
/// from a continuously-scored soft ranking (country/age/kinks/distance
/// weights, escalating relaxation under a "desperation" phase); that
/// softer, recommendation-quality-flavored algorithm is out of scope here —
/// the `fairness DESC, waiting_since ASC` tie-break in candidate selection
/// takes over the role a score comparison would otherwise play.
pub fn compatible(a: &UserRecord, b: &UserRecord, history: &HistoryLedger) -> bool {
    if a.user_id == b.user_id {
        return false;
    }

    if !mutual_opposite_sex(a, b) {
        return false;
    }

    if !a.facts.gender_preference_satisfied_by(b) || !b.facts.gender_preference_satisfied_by(a) {
        return false;
    }

    if !a.facts.age_in_range(b.facts.age) || !b.facts.age_in_range(a.facts.age) {
        return false;
    }

    if !cities_compatible(a, b) {
        return false;
    }

    if history.has_matched(a.user_id, b.user_id) {
        return false;
    }

    if a.has_live_match() || b.has_live_match() {
        return false;
    }

    true
}

fn mutual_opposite_sex(a: &UserRecord, b: &UserRecord) -> bool {
    match (a.facts.gender, b.facts.gender) {
        (Some(ga), Some(gb)) => ga != gb,
        _ => false,
    }
}

fn cities_compatible(a: &UserRecord, b: &UserRecord) -> bool {
    if a.facts.cities.is_empty() || b.facts.cities.is_empty() {
        return true;
    }
    a.facts.cities.iter().any(|c| b.facts.cities.contains(c))
}

impl crate::models::UserFacts {
    /// Whether `self`'s gender preference accepts `other`'s gender. A
    /// missing gender on `other` can never satisfy a specific preference.
    pub fn gender_preference_satisfied_by(&self, other: &UserRecord) -> bool {
        match other.facts.gender {
            Some(g) => self.gender_preference.accepts(g),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenderPreference, UserFacts};
    use chrono::Utc;

    fn user(gender: Gender, pref: GenderPreference, age: i32, cities: &[&str]) -> UserRecord {
        let facts = UserFacts {
            gender: Some(gender),
            gender_preference: pref,
            age: Some(age),
            age_min: None,
            age_max: None,
            cities: cities.iter().map(|s| s.to_string()).collect(),
        };
        UserRecord::new(uuid::Uuid::new_v4(), facts, Utc::now())
    }

    #[test]
    fn same_gender_never_compatible() {
        let a = user(Gender::Male, GenderPreference::All, 30, &[]);
        let b = user(Gender::Male, GenderPreference::All, 30, &[]);
        let history = HistoryLedger::new();
        assert!(!compatible(&a, &b, &history));
    }

    #[test]
    fn disjoint_cities_block_match_unless_unrestricted() {
        let history = HistoryLedger::new();
        let a = user(Gender::Male, GenderPreference::All, 30, &["paris"]);
        let b = user(Gender::Female, GenderPreference::All, 30, &["berlin"]);
        assert!(!compatible(&a, &b, &history));

        let c = user(Gender::Female, GenderPreference::All, 30, &[]);
        assert!(compatible(&a, &c, &history));
    }

    #[test]
    fn history_forbids_repairing() {
        let history = HistoryLedger::new();
        let a = user(Gender::Male, GenderPreference::All, 30, &[]);
        let b = user(Gender::Female, GenderPreference::All, 30, &[]);
        assert!(compatible(&a, &b, &history));
        history.record(a.user_id, b.user_id);
        assert!(!compatible(&a, &b, &history));
    }

    #[test]
    fn gender_preference_is_mutual() {
        let history = HistoryLedger::new();
        let a = user(Gender::Male, GenderPreference::Female, 30, &[]);
        let b = user(Gender::Female, GenderPreference::Male, 30, &[]);
        assert!(compatible(&a, &b, &history));

        let c = user(Gender::Female, GenderPreference::Female, 30, &[]);
        assert!(!compatible(&a, &c, &history));
    }

    #[test]
    fn live_match_excludes_from_candidate_set() {
        let history = HistoryLedger::new();
        let a = user(Gender::Male, GenderPreference::All, 30, &[]);
        let mut b = user(Gender::Female, GenderPreference::All, 30, &[]);
        b.state = UserState::Matched;
        assert!(!compatible(&a, &b, &history));
    }
}
