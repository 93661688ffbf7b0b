use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rand::{rngs::StdRng, SeedableRng};
use wakeup_clock::{
    challenge::{ChallengeRegistry, ChallengeSequence, MathProblem, Puzzle, Step, Submission},
    lifecycle::CompletionStats,
    scanner::{RingState, TriggerReason},
    ClockError, Difficulty, Event, MemoryStore, NewAlarm, Scheduler, TaskKind,
};

// 2024-01-01 is a Monday
fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn seven_am() -> NewAlarm {
    NewAlarm::at(NaiveTime::from_hms_opt(7, 0, 0).unwrap())
}

fn answer(sequence: &ChallengeSequence) -> Submission {
    match sequence.puzzle().unwrap() {
        Puzzle::Math(MathProblem { answer, .. }) => Submission::Answer(answer.to_string()),
        Puzzle::Typing { phrase } => Submission::Answer(phrase.clone()),
        Puzzle::Shake(_) => panic!("not an answer puzzle"),
    }
}

#[test]
fn test_math_then_typing_cycle_dismisses_with_stats() {
    let mut scheduler = Scheduler::new(MemoryStore::new());
    let id = scheduler
        .add(NewAlarm {
            task_types: Some(vec![TaskKind::Math, TaskKind::Typing]),
            ..seven_am()
        })
        .unwrap()
        .id;

    let Some(Event::AlarmRinging { alarm_id, .. }) = scheduler.tick(at(1, 7, 0, 0)) else {
        panic!("alarm should ring at 07:00");
    };
    assert_eq!(alarm_id, id);

    let registry = ChallengeRegistry::default();
    let mut sequence = ChallengeSequence::with_rng(
        scheduler.ringing().unwrap(),
        &registry,
        at(1, 7, 0, 0),
        StdRng::seed_from_u64(21),
    );
    assert_eq!(
        sequence.submit(&registry, &answer(&sequence), at(1, 7, 0, 4)),
        Step::TaskCompleted {
            next: TaskKind::Typing
        }
    );
    // only half way, dismissing is up to the host but the cycle isn't solved
    assert!(!sequence.is_solved());
    assert_eq!(
        sequence.submit(&registry, &answer(&sequence), at(1, 7, 0, 12)),
        Step::Solved
    );

    let stats = sequence.stats(at(1, 7, 0, 12));
    assert_eq!(
        stats,
        CompletionStats {
            completion_time_seconds: 12,
            attempts: 1
        }
    );
    scheduler.dismiss(Some(stats), at(1, 7, 0, 12)).unwrap();

    let alarm = scheduler.alarm(id).unwrap();
    assert_eq!(alarm.streak, 1);
    assert_eq!(alarm.task_difficulty, Difficulty::Hard);
    assert_eq!(alarm.history.len(), 1);
    assert_eq!(alarm.history[0].difficulty, Difficulty::Medium);
    assert_eq!(scheduler.state(), RingState::Idle);
}

#[test]
fn test_snooze_until_the_limit_then_dismiss() {
    let mut scheduler = Scheduler::new(MemoryStore::new());
    let id = scheduler
        .add(NewAlarm {
            snooze_limit: Some(2),
            snooze_duration: Some(3),
            ..seven_am()
        })
        .unwrap()
        .id;

    assert!(scheduler.tick(at(1, 7, 0, 0)).is_some());
    assert_eq!(
        scheduler.snooze(at(1, 7, 0, 10)).unwrap(),
        Event::AlarmSnoozed {
            alarm_id: id,
            until: at(1, 7, 3, 10)
        }
    );
    assert_eq!(scheduler.tick(at(1, 7, 3, 9)), None);
    assert_eq!(
        scheduler.tick(at(1, 7, 3, 10)),
        Some(Event::AlarmRinging {
            alarm_id: id,
            reason: TriggerReason::SnoozeExpired
        })
    );
    scheduler.snooze(at(1, 7, 3, 20)).unwrap();
    assert!(scheduler.tick(at(1, 7, 6, 20)).is_some());

    assert!(!scheduler.can_snooze());
    assert!(matches!(
        scheduler.snooze(at(1, 7, 6, 30)),
        Err(ClockError::SnoozeLimitExceeded { limit: 2, .. })
    ));
    // refusing the snooze leaves it ringing
    assert_eq!(scheduler.state(), RingState::Ringing(id));

    scheduler
        .dismiss(
            Some(CompletionStats {
                completion_time_seconds: 45,
                attempts: 3,
            }),
            at(1, 7, 7, 0),
        )
        .unwrap();
    let alarm = scheduler.alarm(id).unwrap();
    assert_eq!(alarm.snooze_count, 0);
    assert_eq!(alarm.snoozed_until, None);
    assert_eq!(alarm.history[0].snoozes_used, 2);
    // the snooze expiry doesn't ring again after the dismissal
    assert_eq!(scheduler.tick(at(1, 7, 8, 0)), None);
}

#[test]
fn test_streak_over_several_days() {
    let mut scheduler = Scheduler::new(MemoryStore::new());
    let id = scheduler.add(seven_am()).unwrap().id;

    for (day, expected) in [(1, 1), (2, 2), (3, 3), (5, 1)] {
        assert!(scheduler.tick(at(day, 7, 0, 0)).is_some(), "day {day}");
        let Event::AlarmDismissed { streak, .. } =
            scheduler.dismiss(None, at(day, 7, 1, 0)).unwrap()
        else {
            panic!("expected a dismissal");
        };
        assert_eq!(streak, expected, "day {day}");
    }
    // no stats, no history
    assert!(scheduler.alarm(id).unwrap().history.is_empty());
}

#[test]
fn test_weekday_alarm_skips_other_days() {
    let mut scheduler = Scheduler::new(MemoryStore::new());
    scheduler
        .add(NewAlarm {
            days: Some(wakeup_clock::DaySet::new([1]).unwrap()),
            ..seven_am()
        })
        .unwrap();

    // Tuesday
    assert_eq!(scheduler.tick(at(2, 7, 0, 0)), None);
    // next Monday
    assert!(scheduler.tick(at(8, 7, 0, 0)).is_some());
}

#[test]
fn test_only_one_alarm_rings_at_a_time() {
    let mut scheduler = Scheduler::new(MemoryStore::new());
    let first = scheduler.add(seven_am()).unwrap().id;
    let second = scheduler.add(seven_am()).unwrap().id;

    assert_eq!(
        scheduler.tick(at(1, 7, 0, 0)),
        Some(Event::AlarmRinging {
            alarm_id: first,
            reason: TriggerReason::Scheduled
        })
    );
    assert_eq!(scheduler.tick(at(1, 7, 0, 5)), None);
    scheduler.dismiss(None, at(1, 7, 0, 20)).unwrap();
    // the second one gets its turn within the same minute
    assert_eq!(
        scheduler.tick(at(1, 7, 0, 21)),
        Some(Event::AlarmRinging {
            alarm_id: second,
            reason: TriggerReason::Scheduled
        })
    );
}
