mod common;

use chess_core::shakmaty::Role;
use chess_core::{
    Difficulty, GamePosition, GameSession, GameStatus, MoveOutcome, MoveRequest, SessionError,
    SessionState, Side, Turn,
};
use common::ONLY_MOVE_MATES_FEN;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

#[test]
fn test_e2e4_then_reply() {
    let mut session = GameSession::with_seed(21);
    assert!(session.choose_difficulty(Difficulty::Normal));

    let outcome = session
        .attempt_move(&MoveRequest::parse("e2", "e4", None).unwrap())
        .unwrap();
    assert!(matches!(
        outcome,
        MoveOutcome::Applied {
            opponent_to_move: true,
            ..
        }
    ));
    assert_eq!(session.history()[0].san, "e4");

    let reply = session.play_opponent_move().unwrap().unwrap();
    assert_eq!(reply.color, Side::Black);
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history_rows().len(), 1);
    assert_eq!(session.state(), SessionState::InProgress(Turn::AwaitingHumanMove));
}

#[test]
fn test_single_legal_move_checkmate() {
    let mut session = GameSession::from_fen_seeded(ONLY_MOVE_MATES_FEN, 3).unwrap();
    session.choose_difficulty(Difficulty::Easy);

    let only = session.position().legal_moves();
    assert_eq!(only.len(), 1);

    let outcome = session.attempt_move(&only[0].request()).unwrap();
    let MoveOutcome::Applied { status, opponent_to_move, .. } = outcome else {
        panic!("expected an applied move");
    };
    assert_eq!(status, GameStatus::Checkmate { winner: Side::White });
    assert!(!opponent_to_move);
    assert_eq!(session.status_line().text, "Checkmate, White wins");
    assert_eq!(session.play_opponent_move(), Ok(None));
    assert_eq!(session.history().len(), 1);
}

#[test]
fn test_history_replays_to_same_position() {
    let mut session = GameSession::with_seed(5);
    session.choose_difficulty(Difficulty::Normal);
    let mut rng = StdRng::seed_from_u64(5);

    for _ in 0..12 {
        if matches!(session.state(), SessionState::Over(_)) {
            break;
        }
        let legal = session.position().legal_moves();
        let Some(mv) = legal.choose(&mut rng) else { break };
        session.attempt_move(&mv.request()).unwrap();
        if session.play_opponent_move().unwrap().is_none() {
            break;
        }
    }

    let mut replay = GamePosition::starting();
    for record in session.history() {
        let request = MoveRequest::parse(
            &record.from,
            &record.to,
            record.promotion.map(|p| p.letter().to_string()).as_deref(),
        )
        .unwrap();
        let (next, again) = replay.apply(&request).unwrap();
        assert_eq!(&again, record);
        replay = next;
    }
    assert_eq!(replay.fen(), session.position().fen());
}

#[test]
fn test_self_play_keeps_invariants() {
    for (seed, difficulty) in [(1, Difficulty::Easy), (2, Difficulty::Normal), (3, Difficulty::Hard)] {
        let mut session = GameSession::with_seed(seed);
        session.choose_difficulty(difficulty);
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..30 {
            if matches!(session.state(), SessionState::Over(_)) {
                break;
            }
            let legal = session.position().legal_moves();
            let mv = legal.choose(&mut rng).unwrap();
            let before = session.history().len();
            session.attempt_move(&mv.request()).unwrap();
            assert_eq!(session.history().len(), before + 1);
            session.play_opponent_move().unwrap();
        }

        for (i, record) in session.history().iter().enumerate() {
            let expected = if i % 2 == 0 { Side::White } else { Side::Black };
            assert_eq!(record.color, expected);
        }
        assert_eq!(session.history_rows().len(), session.history().len().div_ceil(2));
    }
}

#[test]
fn test_rejections_leave_session_untouched() {
    let mut session = GameSession::from_fen_seeded("8/4P3/8/8/8/8/8/k6K w - - 0 1", 4).unwrap();
    assert_eq!(
        session.resolve_promotion(Role::Queen),
        Err(SessionError::InvalidPromotionRequest)
    );
    session.choose_difficulty(Difficulty::Normal);
    let fen = session.position().fen();

    assert!(session
        .attempt_move(&MoveRequest::parse("h1", "h3", None).unwrap())
        .is_err());
    assert_eq!(session.cancel_promotion(), Err(SessionError::InvalidPromotionRequest));
    assert_eq!(session.position().fen(), fen);
    assert!(session.history().is_empty());

    // Promotion needs the piece before anything is applied
    let outcome = session
        .attempt_move(&MoveRequest::parse("e7", "e8", None).unwrap())
        .unwrap();
    assert!(matches!(outcome, MoveOutcome::PromotionRequired(_)));
    assert_eq!(session.position().fen(), fen);
    session.resolve_promotion(Role::Knight).unwrap();
    assert_eq!(session.history()[0].san, "e8=N");
}
