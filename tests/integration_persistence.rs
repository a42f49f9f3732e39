use assert_matches::assert_matches;
use chrono::NaiveDate;
use devtype::{
    clock::ManualClock,
    config::{Language, Mode, SessionConfig},
    error::SessionError,
    session::{TickOutcome, TypingSession},
    store::{KeyValueStore, SqliteStore, LAST_PRACTICE_KEY, PERSONAL_BEST_KEY, STREAK_KEY},
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

type Session = TypingSession<SqliteStore, ManualClock>;

fn open_session(path: &std::path::Path, clock: &ManualClock) -> Session {
    let store = SqliteStore::open(path).unwrap();
    let mut session = TypingSession::new(store, clock.clone());
    session.load_settings().unwrap();
    session.load_persisted_progress().unwrap();
    session
}

/// Type `chars` correct characters, then let the countdown run out.
fn run_timed(session: &mut Session, clock: &ManualClock, chars: usize) {
    session.assign_target("a".repeat(200));
    session.start().unwrap();
    session.apply_input(&"a".repeat(chars)).unwrap();

    let duration = session.config().duration;
    for second in 1..=duration {
        clock.advance_secs(1);
        let outcome = session.tick().unwrap();
        if second < duration {
            assert_matches!(outcome, TickOutcome::Running);
        } else {
            assert_matches!(outcome, TickOutcome::Finished(_));
        }
    }
}

#[test]
fn progress_survives_restarts_and_expires() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("state").join("devtype.db");
    let clock = ManualClock::new(0, day(4));

    let mut session = open_session(&db, &clock);
    session
        .configure(SessionConfig {
            duration: 15,
            language: Language::Go,
            mode: Mode::Timed,
        })
        .unwrap();
    run_timed(&mut session, &clock, 100);
    let first = *session.results().unwrap();
    assert_eq!(first.wpm, 80);
    assert!(first.is_new_personal_best);
    assert_eq!(first.daily_streak, 1);
    drop(session);

    // next day, fresh process
    clock.advance_days(1);
    let mut session = open_session(&db, &clock);
    assert_eq!(session.config().duration, 15);
    assert_eq!(session.config().language, Language::Go);
    assert_eq!(session.personal_best(), 80);
    assert_eq!(session.daily_streak(), 1);

    run_timed(&mut session, &clock, 62);
    let second = *session.results().unwrap();
    assert_eq!(second.wpm, 50);
    assert!(!second.is_new_personal_best);
    assert_eq!(second.daily_streak, 2);
    assert_eq!(
        session.store().get(LAST_PRACTICE_KEY).unwrap().as_deref(),
        Some("2024-03-05")
    );
    drop(session);

    // three idle days break the streak but keep the best
    clock.advance_days(3);
    let session = open_session(&db, &clock);
    assert_eq!(session.daily_streak(), 0);
    assert_eq!(session.personal_best(), 80);
    assert_eq!(session.store().get(STREAK_KEY).unwrap(), None);
    assert_eq!(session.store().get(LAST_PRACTICE_KEY).unwrap(), None);
    assert_eq!(
        session.store().get(PERSONAL_BEST_KEY).unwrap().as_deref(),
        Some("80")
    );
}

#[test]
fn practice_runs_never_set_a_personal_best() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("devtype.db");
    let clock = ManualClock::new(0, day(10));

    let mut session = open_session(&db, &clock);
    session
        .configure(SessionConfig {
            mode: Mode::Practice,
            ..SessionConfig::default()
        })
        .unwrap();
    session.assign_target("a".repeat(50));
    session.start().unwrap();
    session.apply_input(&"a".repeat(50)).unwrap();
    clock.advance_secs(6);

    let results = session.finalize().unwrap();
    assert_eq!(results.wpm, 100);
    assert!(!results.is_new_personal_best);
    assert_eq!(results.daily_streak, 1);
    assert!(session.submission().is_none());
    assert_eq!(session.store().get(PERSONAL_BEST_KEY).unwrap(), None);

    assert_matches!(session.finalize(), Err(SessionError::AlreadyComplete));
}

#[test]
fn corrupt_settings_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("devtype.db");
    {
        let mut store = SqliteStore::open(&db).unwrap();
        store.set("devtype-duration", "0").unwrap();
        store.set("devtype-language", "cobol").unwrap();
        store.set("devtype-mode", "practice").unwrap();
    }

    let clock = ManualClock::default();
    let session = open_session(&db, &clock);
    assert_eq!(session.config().duration, 30);
    assert_eq!(session.config().language, Language::Typescript);
    assert_eq!(session.config().mode, Mode::Practice);
}
