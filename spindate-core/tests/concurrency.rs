//! Integration coverage for the engine's concurrency-safety property:
//! running N concurrent `spin` calls for N users results in at most ⌊N/2⌋
//! matches, no user in two matches, and no two matches sharing a user.

use std::collections::HashSet;
use std::sync::Arc;

use spindate_core::clock::SystemClock;
use spindate_core::config::AppConfig;
use spindate_core::models::{Gender, GenderPreference, UserFacts, UserState};
use spindate_core::Engine;
use uuid::Uuid;

fn facts(gender: Gender) -> UserFacts {
    UserFacts {
        gender: Some(gender),
        gender_preference: GenderPreference::All,
        age: Some(28),
        age_min: None,
        age_max: None,
        cities: vec![],
    }
}

/// Twenty users (ten male, ten female, all mutually compatible) spin at
/// once via concurrent tasks: running N concurrent `spin` calls for N
/// users must result in at most ⌊N/2⌋ matches, no user in two matches, and
/// no two matches sharing a user.
#[tokio::test]
async fn concurrent_spins_produce_safe_pairing() {
    let engine = Arc::new(Engine::<SystemClock>::new(AppConfig::default()));
    let n = 20;
    let users: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();

    let mut handles = Vec::new();
    for (i, &user_id) in users.iter().enumerate() {
        let engine = engine.clone();
        let gender = if i % 2 == 0 { Gender::Male } else { Gender::Female };
        handles.push(tokio::spawn(async move {
            engine.spin(user_id, facts(gender)).await;
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    // Retry a few event-driven passes to let any "busy"/"retry" losers of
    // the race settle — mirrors the real deployment where the next spin
    // or the Sweeper retries.
    for _ in 0..5 {
        engine.sweep().await;
    }

    let mut seen_partners = HashSet::new();
    let mut matched_count = 0;
    for &user_id in &users {
        let record = engine.users.get(user_id).unwrap();
        if matches!(record.state, UserState::Matched | UserState::VoteWindow) {
            matched_count += 1;
            let partner = record.partner_id.expect("matched user must have a partner");
            assert!(
                seen_partners.insert(user_id),
                "user {user_id} appears in more than one match"
            );
            // the partner's mirror must point back at this user
            let partner_record = engine.users.get(partner).unwrap();
            assert_eq!(partner_record.partner_id, Some(user_id));
            assert_eq!(partner_record.match_id, record.match_id);
        }
    }

    assert!(matched_count <= n);
    assert_eq!(matched_count % 2, 0, "matches always pair exactly two users");
}

/// Two users who raced into the same match, then both re-spin, must never
/// be re-paired with each other even with no other candidates present.
#[tokio::test]
async fn rematched_pair_never_repairs_even_as_only_candidates() {
    let engine = Engine::<SystemClock>::new(AppConfig::default());
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    engine.spin(u1, facts(Gender::Male)).await;
    let result = engine.spin(u2, facts(Gender::Female)).await;
    assert!(matches!(
        result,
        spindate_core::engine::PairFormationResult::Matched(_)
    ));

    // Force a pass resolution so both respin and history records the pair.
    let match_id = engine.users.get(u1).unwrap().match_id.expect("u1 is matched");
    engine
        .record_vote(u1, match_id, spindate_core::models::Vote::Pass)
        .await
        .unwrap();

    // Both spin again; since they are each other's only candidate, no match
    // should ever form between them again.
    engine.spin(u1, facts(Gender::Male)).await;
    engine.spin(u2, facts(Gender::Female)).await;

    let rec1 = engine.users.get(u1).unwrap();
    let rec2 = engine.users.get(u2).unwrap();
    assert_ne!(rec1.state, UserState::Matched);
    assert_ne!(rec2.state, UserState::Matched);
}
