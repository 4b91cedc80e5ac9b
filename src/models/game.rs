//! Game session model - the application layer for a game against the bot.
//!
//! `GameSession` owns the authoritative position and sequences turns: human
//! moves arrive through [`GameSession::submit_human_move`], AI turns are
//! scheduled after a short pacing delay and resolved by the [`Arbiter`],
//! engine replies are drained in [`GameSession::poll`].

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use shakmaty::san::San;
use shakmaty::{Chess, Move, Position, Square};
use tracing::{debug, info, warn};

use crate::content::ContentStore;
use crate::domain::achievements::{AchievementGate, Unlock};
use crate::domain::chess::{find_legal_move, position_fen, repetition_key};
use crate::domain::opening_book::{BookSide, OpeningBook};
use crate::domain::uci::BestMove;
use crate::domain::{CoordinateMove, Difficulty, PieceColor, PieceKind, shakmaty_to_piece};
use crate::error::MoveRejection;
use crate::models::arbiter::{AiDecision, Arbiter, BookCursor};
use crate::models::engine::{EngineProcess, EngineReply};

/// Name written into exported games for the bot's side
const BOT_NAME: &str = "NateBot";
const HUMAN_NAME: &str = "Player";

/// Something that draws the board
pub trait BoardView {
    /// Show `fen`, highlighting the move that produced it
    fn show(&mut self, fen: &str, last_move: Option<CoordinateMove>);
}

/// How a finished game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Checkmate { winner: PieceColor },
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    Repetition,
}

impl GameOutcome {
    pub fn winner(&self) -> Option<PieceColor> {
        match self {
            GameOutcome::Checkmate { winner } => Some(*winner),
            _ => None,
        }
    }

    /// PGN result token
    pub fn result_tag(&self) -> &'static str {
        match self {
            GameOutcome::Checkmate {
                winner: PieceColor::White,
            } => "1-0",
            GameOutcome::Checkmate {
                winner: PieceColor::Black,
            } => "0-1",
            _ => "1/2-1/2",
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            GameOutcome::Stalemate => f.write_str("draw by stalemate"),
            GameOutcome::InsufficientMaterial => f.write_str("draw by insufficient material"),
            GameOutcome::FiftyMoveRule => f.write_str("draw by the fifty-move rule"),
            GameOutcome::Repetition => f.write_str("draw by threefold repetition"),
        }
    }
}

/// Where an applied move came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    Human,
    Book,
    Heuristic,
    Engine,
}

/// Notifications for the front end, drained with [`GameSession::drain_events`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    MoveApplied {
        by: PieceColor,
        san: String,
        source: MoveSource,
    },
    GameOver(GameOutcome),
    AchievementUnlocked(Unlock),
}

/// Artificial delays before the AI replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub human_reply_delay: Duration,
    pub ai_first_delay: Duration,
}

impl Pacing {
    /// No delays at all
    pub fn immediate() -> Self {
        Self {
            human_reply_delay: Duration::ZERO,
            ai_first_delay: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            human_reply_delay: Duration::from_millis(250),
            ai_first_delay: Duration::from_millis(300),
        }
    }
}

/// State of one game, from start until resignation or the next start
#[derive(Debug, Clone)]
pub struct Session {
    position: Chess,
    human_color: PieceColor,
    ai_color: PieceColor,
    difficulty: Difficulty,
    opening_key: Option<String>,
    opening_name: String,
    book: BookCursor,
    captured_by_ai: Vec<PieceKind>,
    captured_by_human: Vec<PieceKind>,
    /// SAN of every ply, with check marks
    history: Vec<String>,
    repetitions: HashMap<String, u32>,
    terminal: bool,
    result: Option<GameOutcome>,
}

impl Session {
    fn new(
        human_color: PieceColor,
        difficulty: Difficulty,
        opening_key: Option<String>,
        opening_name: String,
        book: BookCursor,
    ) -> Self {
        let position = Chess::default();
        let mut repetitions = HashMap::new();
        repetitions.insert(repetition_key(&position), 1);
        Self {
            position,
            human_color,
            ai_color: human_color.opponent(),
            difficulty,
            opening_key,
            opening_name,
            book,
            captured_by_ai: Vec::new(),
            captured_by_human: Vec::new(),
            history: Vec::new(),
            repetitions,
            terminal: false,
            result: None,
        }
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn fen(&self) -> String {
        position_fen(&self.position)
    }

    pub fn human_color(&self) -> PieceColor {
        self.human_color
    }

    pub fn ai_color(&self) -> PieceColor {
        self.ai_color
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn opening_key(&self) -> Option<&str> {
        self.opening_key.as_deref()
    }

    pub fn opening_name(&self) -> &str {
        &self.opening_name
    }

    pub fn book(&self) -> &BookCursor {
        &self.book
    }

    pub fn captured_by_ai(&self) -> &[PieceKind] {
        &self.captured_by_ai
    }

    pub fn captured_by_human(&self) -> &[PieceKind] {
        &self.captured_by_human
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn side_to_move(&self) -> PieceColor {
        self.position.turn().into()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn result(&self) -> Option<GameOutcome> {
        self.result
    }

    fn outcome(&self) -> Option<GameOutcome> {
        let pos = &self.position;
        if pos.is_checkmate() {
            Some(GameOutcome::Checkmate {
                winner: PieceColor::from(pos.turn()).opponent(),
            })
        } else if pos.is_stalemate() {
            Some(GameOutcome::Stalemate)
        } else if pos.is_insufficient_material() {
            Some(GameOutcome::InsufficientMaterial)
        } else if pos.halfmoves() >= 100 {
            Some(GameOutcome::FiftyMoveRule)
        } else if self.repetitions.values().any(|&n| n >= 3) {
            Some(GameOutcome::Repetition)
        } else {
            None
        }
    }
}

/// A pending AI turn, valid only for the generation that scheduled it
#[derive(Debug, Clone, Copy)]
struct ScheduledTurn {
    due: Instant,
    generation: u64,
}

/// Controller for games against the bot
pub struct GameSession {
    session: Option<Session>,
    arbiter: Arbiter,
    engine: Box<dyn EngineProcess>,
    view: Box<dyn BoardView>,
    content: Box<dyn ContentStore>,
    achievements: AchievementGate,
    pacing: Pacing,
    /// Bumped on every start and resignation; stale timers and engine
    /// replies carry an older value
    generation: u64,
    pending_turn: Option<ScheduledTurn>,
    awaiting_engine: bool,
    events: Vec<SessionEvent>,
}

impl GameSession {
    pub fn new(
        engine: Box<dyn EngineProcess>,
        view: Box<dyn BoardView>,
        content: Box<dyn ContentStore>,
        achievements: AchievementGate,
    ) -> Self {
        Self {
            session: None,
            arbiter: Arbiter::default(),
            engine,
            view,
            content,
            achievements,
            pacing: Pacing::default(),
            generation: 0,
            pending_turn: None,
            awaiting_engine: false,
            events: Vec::new(),
        }
    }

    pub fn with_arbiter(mut self, arbiter: Arbiter) -> Self {
        self.arbiter = arbiter;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_awaiting_engine(&self) -> bool {
        self.awaiting_engine
    }

    pub fn achievements(&self) -> &AchievementGate {
        &self.achievements
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Start a new game from the initial position, discarding any current one
    pub fn start(&mut self, human_color: PieceColor, difficulty: Difficulty, opening_key: Option<&str>) {
        self.teardown();

        let book = OpeningBook::load_or_empty(self.content.as_ref(), BookSide::for_human(human_color));
        let opening_key = opening_key.filter(|k| !k.is_empty()).map(str::to_string);
        let line = opening_key.as_deref().and_then(|k| book.lookup(k)).cloned();
        if opening_key.is_some() && line.is_none() {
            warn!(key = ?opening_key, "selected opening not in book");
        }
        let opening_name = book.display_name(opening_key.as_deref());

        let session = Session::new(
            human_color,
            difficulty,
            opening_key,
            opening_name,
            BookCursor::new(line),
        );
        info!(
            human = %human_color,
            difficulty = %difficulty,
            opening = %session.opening_name,
            generation = self.generation,
            "session started"
        );
        self.view.show(&session.fen(), None);
        let ai_moves_first = session.ai_color == PieceColor::White;
        self.session = Some(session);

        if ai_moves_first {
            self.schedule_ai_turn(self.pacing.ai_first_delay);
        }
    }

    /// Abandon the current game. Returns false if there was none.
    pub fn resign(&mut self) -> bool {
        if self.session.is_none() {
            return false;
        }
        info!(generation = self.generation, "resigned");
        self.teardown();
        self.session = None;
        true
    }

    /// Stop the engine and invalidate everything scheduled for the old game
    fn teardown(&mut self) {
        self.engine.stop();
        self.generation += 1;
        self.pending_turn = None;
        self.awaiting_engine = false;
    }

    /// Try the human's move. Returns false, changing nothing, if it is refused.
    pub fn submit_human_move(&mut self, from: Square, to: Square) -> bool {
        match self.try_human_move(from, to) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%from, %to, %reason, "move rejected");
                false
            }
        }
    }

    fn try_human_move(&mut self, from: Square, to: Square) -> Result<(), MoveRejection> {
        let session = self.session.as_ref().ok_or(MoveRejection::NoSession)?;
        if session.terminal {
            return Err(MoveRejection::GameOver);
        }
        if session.side_to_move() != session.human_color {
            return Err(MoveRejection::NotYourTurn);
        }
        let piece = session
            .position
            .board()
            .piece_at(from)
            .map(shakmaty_to_piece)
            .ok_or(MoveRejection::EmptySquare)?;
        if piece.color != session.human_color {
            return Err(MoveRejection::NotYourPiece);
        }
        let m = find_legal_move(&session.position, from, to).ok_or(MoveRejection::Illegal)?;

        if !self.commit(m, MoveSource::Human) {
            return Err(MoveRejection::Illegal);
        }
        if self.session.as_ref().is_some_and(|s| !s.terminal) {
            self.schedule_ai_turn(self.pacing.human_reply_delay);
        }
        Ok(())
    }

    /// Apply a move on the AI's behalf. Returns false if it is refused.
    pub fn apply_ai_move(&mut self, m: Move) -> bool {
        self.apply_ai_move_from(m, MoveSource::Engine)
    }

    fn apply_ai_move_from(&mut self, m: Move, source: MoveSource) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        if session.terminal || session.side_to_move() != session.ai_color {
            return false;
        }
        self.commit(m, source)
    }

    /// Validate and apply in one step, then update bookkeeping and check
    /// for the end of the game
    fn commit(&mut self, m: Move, source: MoveSource) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let mover = session.side_to_move();
        let san = San::from_move(&session.position, m.clone()).to_string();
        let last_move = CoordinateMove::from_move(&m);
        let captured = m.capture().map(PieceKind::from);

        let position = match session.position.clone().play(m) {
            Ok(position) => position,
            Err(_) => return false,
        };
        let suffix = if position.is_checkmate() {
            "#"
        } else if position.is_check() {
            "+"
        } else {
            ""
        };
        let san = format!("{san}{suffix}");

        session.position = position;
        session.history.push(san.clone());
        *session
            .repetitions
            .entry(repetition_key(&session.position))
            .or_insert(0) += 1;
        if let Some(kind) = captured {
            if mover == session.ai_color {
                session.captured_by_ai.push(kind);
            } else {
                session.captured_by_human.push(kind);
            }
        }

        debug!(san = %san, by = %mover, ?source, "move applied");
        let fen = session.fen();
        self.view.show(&fen, last_move);
        self.events.push(SessionEvent::MoveApplied {
            by: mover,
            san,
            source,
        });
        self.check_game_over();
        true
    }

    fn check_game_over(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.terminal {
            return;
        }
        let Some(outcome) = session.outcome() else {
            return;
        };

        session.terminal = true;
        session.result = Some(outcome);
        self.pending_turn = None;
        self.awaiting_engine = false;
        info!(%outcome, plies = session.history.len(), "game over");
        self.events.push(SessionEvent::GameOver(outcome));

        if let Some(unlock) = self.achievements.evaluate(
            outcome.winner(),
            session.human_color,
            session.difficulty,
            &session.opening_name,
        ) {
            self.events.push(SessionEvent::AchievementUnlocked(unlock));
        }
    }

    fn schedule_ai_turn(&mut self, delay: Duration) {
        self.pending_turn = Some(ScheduledTurn {
            due: Instant::now() + delay,
            generation: self.generation,
        });
    }

    /// Drain engine replies and run an AI turn whose delay has elapsed
    pub fn poll(&mut self, now: Instant) {
        while let Some(reply) = self.engine.poll_reply() {
            self.handle_reply(reply);
        }

        let due = self
            .pending_turn
            .is_some_and(|turn| turn.due <= now && turn.generation == self.generation);
        if due {
            self.pending_turn = None;
            self.run_ai_turn();
        }
    }

    fn run_ai_turn(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.terminal || session.side_to_move() != session.ai_color {
            return;
        }

        let ply_count = session.history.len();
        let decision = self.arbiter.next_ai_move(
            &mut session.book,
            &session.position,
            ply_count,
            session.ai_color,
            session.difficulty,
            self.generation,
        );

        match decision {
            AiDecision::Book(m) => {
                self.apply_ai_move_from(m, MoveSource::Book);
            }
            AiDecision::Heuristic(m) => {
                self.apply_ai_move_from(m, MoveSource::Heuristic);
            }
            AiDecision::Engine(request) => {
                if let Err(e) = self.engine.start() {
                    // Engine unavailable: the session stalls until resign/restart
                    warn!(error = %e, "engine unavailable");
                    return;
                }
                self.engine.request(request);
                self.awaiting_engine = true;
            }
            AiDecision::NoMove => debug!("AI has no legal move"),
        }
    }

    fn handle_reply(&mut self, reply: EngineReply) {
        if reply.generation != self.generation {
            debug!(
                reply = reply.generation,
                current = self.generation,
                "stale engine reply discarded"
            );
            return;
        }
        if !self.awaiting_engine {
            debug!("unexpected engine reply ignored");
            return;
        }
        self.awaiting_engine = false;

        let text = match reply.best {
            BestMove::Move(text) => text,
            BestMove::NoMove => {
                debug!("engine reports no move");
                return;
            }
        };
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let legal = text
            .parse::<CoordinateMove>()
            .ok()
            .and_then(|cm| find_legal_move(&session.position, cm.from, cm.to));
        match legal {
            Some(m) => {
                self.apply_ai_move_from(m, MoveSource::Engine);
            }
            None => warn!(mv = %text, "engine move rejected"),
        }
    }

    /// The worst legal move for the human, as a hint
    pub fn hint(&self) -> Option<CoordinateMove> {
        let session = self.session.as_ref()?;
        if session.terminal || session.side_to_move() != session.human_color {
            return None;
        }
        Arbiter::worst_move(&session.position).and_then(|m| CoordinateMove::from_move(&m))
    }

    /// The game so far as PGN
    pub fn export_pgn(&self) -> Option<String> {
        let session = self.session.as_ref()?;
        let (white, black) = match session.human_color {
            PieceColor::White => (HUMAN_NAME, BOT_NAME),
            PieceColor::Black => (BOT_NAME, HUMAN_NAME),
        };
        let result = session.result.map_or("*", |r| r.result_tag());

        let mut pgn = String::new();
        pgn.push_str("[Event \"NateBot Game\"]\n");
        pgn.push_str(&format!("[White \"{white}\"]\n"));
        pgn.push_str(&format!("[Black \"{black}\"]\n"));
        pgn.push_str(&format!("[Opening \"{}\"]\n", session.opening_name));
        pgn.push_str(&format!("[Result \"{result}\"]\n\n"));

        let mut moves = Vec::with_capacity(session.history.len() + 1);
        for (i, san) in session.history.iter().enumerate() {
            if i % 2 == 0 {
                moves.push(format!("{}. {san}", i / 2 + 1));
            } else {
                moves.push(san.clone());
            }
        }
        moves.push(result.to_string());
        pgn.push_str(&moves.join(" "));
        pgn.push('\n');
        Some(pgn)
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.engine.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use shakmaty::CastlingMode;
    use shakmaty::fen::Fen;

    use super::*;
    use crate::content::testing::MemoryContent;
    use crate::domain::pgn::GameRecord;
    use crate::models::engine::testing::ScriptedEngine;
    use crate::store::testing::MemoryStore;

    const WHITE_BOOK: &str = r#"{
        "italian": {
            "name": "Italian Game",
            "description": "Bishop to c4 and castle.",
            "moves": ["e4", "e5", "Nf3", "Nc6", "Bc4", "Nf6", "O-O", "Be7"]
        },
        "fools": {
            "name": "Fool's Line",
            "moves": ["f3", "e5", "g4"]
        },
        "scandinavian": {
            "name": "Scandinavian Trade",
            "moves": ["e4", "d5", "exd5"]
        }
    }"#;

    #[derive(Clone, Default)]
    struct RecordingView {
        shown: Rc<RefCell<Vec<String>>>,
    }

    impl BoardView for RecordingView {
        fn show(&mut self, fen: &str, _last_move: Option<CoordinateMove>) {
            self.shown.borrow_mut().push(fen.to_string());
        }
    }

    struct Harness {
        game: GameSession,
        engine: ScriptedEngine,
        view: RecordingView,
        store: MemoryStore,
    }

    fn harness() -> Harness {
        let engine = ScriptedEngine::default();
        let view = RecordingView::default();
        let store = MemoryStore::default();
        let content = MemoryContent::default().with("whiteOpenings.json", WHITE_BOOK);
        let game = GameSession::new(
            Box::new(engine.clone()),
            Box::new(view.clone()),
            Box::new(content),
            AchievementGate::new(Box::new(store.clone())),
        )
        .with_pacing(Pacing::immediate());
        Harness {
            game,
            engine,
            view,
            store,
        }
    }

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn play(game: &mut GameSession, uci: &str) -> bool {
        let cm: CoordinateMove = uci.parse().unwrap();
        game.submit_human_move(cm.from, cm.to)
    }

    fn history(game: &GameSession) -> Vec<String> {
        game.session().unwrap().history().to_vec()
    }

    fn game_over_count(events: &[SessionEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::GameOver(_)))
            .count()
    }

    #[test]
    fn test_trivial_bot_plays_out_a_game() {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Trivial, None);
        let mut events = h.game.drain_events();

        for _ in 0..25 {
            let session = h.game.session().unwrap();
            if session.is_terminal() {
                break;
            }
            let plies = session.history().len();
            assert_eq!(session.side_to_move(), PieceColor::to_move_after(plies));
            assert_eq!(session.side_to_move(), PieceColor::White);

            // Human plays the first legal move it finds
            let m = session.position().legal_moves()[0].clone();
            let cm = CoordinateMove::from_move(&m).unwrap();
            assert!(h.game.submit_human_move(cm.from, cm.to));
            h.game.poll(Instant::now());

            let session = h.game.session().unwrap();
            let plies = session.history().len();
            assert_eq!(session.side_to_move(), PieceColor::to_move_after(plies));
            events.extend(h.game.drain_events());
        }

        assert!(game_over_count(&events) <= 1);
        assert!(h.engine.requests().is_empty());
        let heuristic_moves = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::MoveApplied { source: MoveSource::Heuristic, .. }))
            .count();
        assert!(heuristic_moves > 0);
    }

    #[test]
    fn test_heuristic_reply_is_last_legal_move() {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Trivial, None);
        assert!(play(&mut h.game, "e2e4"));

        let before = h.game.session().unwrap().position().clone();
        let expected = Arbiter::worst_move(&before).unwrap();
        let expected_san = San::from_move(&before, expected).to_string();
        h.game.poll(Instant::now());

        let moves = history(&h.game);
        assert_eq!(moves.len(), 2);
        assert!(moves[1].starts_with(&expected_san));
    }

    #[test]
    fn test_book_line_as_white_against_black_human() {
        let mut h = harness();
        h.game.start(PieceColor::Black, Difficulty::Strong, Some("italian"));
        assert_eq!(h.game.session().unwrap().opening_name(), "Italian Game");

        h.game.poll(Instant::now());
        for reply in ["e7e5", "b8c6", "g8f6"] {
            assert!(play(&mut h.game, reply), "human move {reply} refused");
            h.game.poll(Instant::now());
        }

        let session = h.game.session().unwrap();
        let moves = session.history();
        assert_eq!(moves.len(), 7);
        let ai_plies: Vec<_> = moves.iter().step_by(2).cloned().collect();
        assert_eq!(ai_plies, vec!["e4", "Nf3", "Bc4", "O-O"]);
        assert_eq!(session.book().book_moves(), 4);
        assert_eq!(session.book().consumed(), moves.len());
        assert!(session.book().in_play(moves.len()));
        assert!(h.engine.requests().is_empty());

        // Human leaves the line on its last ply; the next AI ply is past the
        // end of the line and goes to the engine
        assert!(play(&mut h.game, "f8c5"));
        h.game.poll(Instant::now());
        assert_eq!(h.engine.requests().len(), 1);
        assert_eq!(h.engine.requests()[0].depth, 20);
    }

    #[test]
    fn test_ai_first_move_waits_for_delay() {
        let mut h = harness();
        h.game = h.game.with_pacing(Pacing {
            human_reply_delay: Duration::from_millis(250),
            ai_first_delay: Duration::from_millis(300),
        });
        let t0 = Instant::now();
        h.game.start(PieceColor::Black, Difficulty::Trivial, None);
        h.game.poll(t0);
        assert!(history(&h.game).is_empty());

        h.game.poll(t0 + Duration::from_secs(1));
        assert_eq!(history(&h.game).len(), 1);
    }

    #[test]
    fn test_engine_reply_is_applied() {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Weak, None);
        assert!(play(&mut h.game, "e2e4"));
        h.game.poll(Instant::now());

        let requests = h.engine.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].depth, 5);
        assert_eq!(requests[0].generation, h.game.generation());
        assert_eq!(requests[0].fen, h.game.session().unwrap().fen());
        assert!(h.game.is_awaiting_engine());

        h.engine.answer("e7e5 ponder g1f3");
        h.game.poll(Instant::now());
        assert_eq!(history(&h.game), vec!["e4", "e5"]);
        assert!(!h.game.is_awaiting_engine());
        assert_eq!(h.view.shown.borrow().len(), 3);
    }

    #[test]
    fn test_engine_no_move_stalls_quietly() {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Strong, None);
        assert!(play(&mut h.game, "d2d4"));
        h.game.poll(Instant::now());
        h.engine.answer("(none)");
        h.game.poll(Instant::now());

        let session = h.game.session().unwrap();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.side_to_move(), PieceColor::Black);
        assert!(!session.is_terminal());
    }

    #[test]
    fn test_stale_engine_reply_is_discarded() {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Weak, None);
        assert!(play(&mut h.game, "e2e4"));
        h.game.poll(Instant::now());
        let old_generation = h.game.generation();

        h.game.start(PieceColor::White, Difficulty::Weak, None);
        assert!(h.game.generation() > old_generation);
        assert_eq!(h.engine.state.borrow().stops, 1);

        // Late reply for the superseded game
        h.engine.answer("e7e5");
        h.game.poll(Instant::now());
        let session = h.game.session().unwrap();
        assert!(session.history().is_empty());
        assert_eq!(session.side_to_move(), PieceColor::White);
    }

    #[test]
    fn test_engine_unavailable_stalls_session() {
        let mut h = harness();
        h.engine.state.borrow_mut().fail_start = true;
        h.game.start(PieceColor::White, Difficulty::Strong, None);
        assert!(play(&mut h.game, "e2e4"));
        h.game.poll(Instant::now());

        assert!(h.engine.requests().is_empty());
        assert!(!h.game.is_awaiting_engine());
        let session = h.game.session().unwrap();
        assert_eq!(session.side_to_move(), PieceColor::Black);
        // Human cannot move out of turn, but can resign
        assert!(!play(&mut h.game, "d2d4"));
        assert!(h.game.resign());
        assert!(h.game.session().is_none());
    }

    #[test]
    fn test_rejected_moves_change_nothing() {
        let mut h = harness();
        assert!(!play(&mut h.game, "e2e4"));

        h.game.start(PieceColor::White, Difficulty::Weak, None);
        let fen = h.game.session().unwrap().fen();
        assert!(!play(&mut h.game, "e3e4"), "empty origin");
        assert!(!play(&mut h.game, "e7e5"), "opponent's piece");
        assert!(!play(&mut h.game, "e2e5"), "illegal");
        assert!(!h.game.submit_human_move(sq("g1"), sq("g3")), "illegal knight move");
        assert_eq!(h.game.session().unwrap().fen(), fen);

        assert!(play(&mut h.game, "e2e4"));
        assert!(!play(&mut h.game, "d2d4"), "not the human's turn");
    }

    #[test]
    fn test_captures_are_attributed_to_the_capturer() {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Weak, None);
        assert!(play(&mut h.game, "e2e4"));
        h.game.poll(Instant::now());
        h.engine.answer("d7d5");
        h.game.poll(Instant::now());

        assert!(play(&mut h.game, "e4d5"));
        h.game.poll(Instant::now());
        h.engine.answer("d8d5");
        h.game.poll(Instant::now());

        let session = h.game.session().unwrap();
        assert_eq!(session.captured_by_human(), &[PieceKind::Pawn]);
        assert_eq!(session.captured_by_ai(), &[PieceKind::Pawn]);
        assert_eq!(session.history(), &["e4", "d5", "exd5", "Qxd5"]);
    }

    #[test]
    fn test_checkmate_unlocks_achievement_once() {
        let mut h = harness();
        for round in 0..2 {
            h.game.start(PieceColor::Black, Difficulty::Weak, Some("fools"));
            h.game.poll(Instant::now());
            assert!(play(&mut h.game, "e7e5"));
            h.game.poll(Instant::now());
            assert!(play(&mut h.game, "d8h4"));

            let session = h.game.session().unwrap();
            assert!(session.is_terminal());
            assert_eq!(
                session.result(),
                Some(GameOutcome::Checkmate {
                    winner: PieceColor::Black
                })
            );
            assert_eq!(session.history(), &["f3", "e5", "g4", "Qh4#"]);

            let events = h.game.drain_events();
            assert_eq!(game_over_count(&events), 1);
            let unlocks: Vec<_> = events
                .iter()
                .filter_map(|e| match e {
                    SessionEvent::AchievementUnlocked(u) => Some(u.opening_name.clone()),
                    _ => None,
                })
                .collect();
            if round == 0 {
                assert_eq!(unlocks, vec!["Fool's Line"]);
            } else {
                assert!(unlocks.is_empty());
            }

            // Terminal: nothing more is accepted
            assert!(!play(&mut h.game, "a7a6"));
            h.game.poll(Instant::now());
            assert_eq!(game_over_count(&h.game.drain_events()), 0);
        }

        assert_eq!(h.store.saved.borrow().len(), 1);
        assert!(h.game.achievements().is_unlocked("Fool's Line"));
    }

    #[test]
    fn test_trivial_win_earns_nothing() {
        let mut h = harness();
        h.game.start(PieceColor::Black, Difficulty::Trivial, Some("fools"));
        h.game.poll(Instant::now());
        assert!(play(&mut h.game, "e7e5"));
        h.game.poll(Instant::now());
        assert!(play(&mut h.game, "d8h4"));
        assert!(h.game.session().unwrap().is_terminal());
        assert!(h.store.saved.borrow().is_empty());
    }

    #[test]
    fn test_repetition_ends_the_game() {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Weak, None);
        let shuffle = [("g1f3", "g8f6"), ("f3g1", "f6g8"), ("g1f3", "g8f6"), ("f3g1", "f6g8")];
        for (human, bot) in shuffle {
            assert!(play(&mut h.game, human));
            h.game.poll(Instant::now());
            h.engine.answer(bot);
            h.game.poll(Instant::now());
        }
        let session = h.game.session().unwrap();
        assert_eq!(session.result(), Some(GameOutcome::Repetition));
        assert!(h.store.saved.borrow().is_empty());
    }

    #[test]
    fn test_resign_tears_down_engine() {
        let mut h = harness();
        assert!(!h.game.resign());
        h.game.start(PieceColor::White, Difficulty::Weak, None);
        assert!(play(&mut h.game, "e2e4"));
        h.game.poll(Instant::now());
        assert!(h.engine.state.borrow().running);

        let generation = h.game.generation();
        assert!(h.game.resign());
        assert!(h.game.generation() > generation);
        assert!(!h.engine.state.borrow().running);
        assert!(h.game.session().is_none());
        assert!(h.game.hint().is_none());
        assert!(h.game.export_pgn().is_none());
    }

    #[test]
    fn test_unknown_opening_key_falls_back_to_engine() {
        let mut h = harness();
        h.game.start(PieceColor::Black, Difficulty::Weak, Some("no-such-line"));
        assert_eq!(h.game.session().unwrap().opening_name(), "no-such-line");
        h.game.poll(Instant::now());
        assert_eq!(h.engine.requests().len(), 1);
    }

    #[test]
    fn test_hint_is_worst_legal_move() {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Weak, None);
        let position = h.game.session().unwrap().position().clone();
        let expected = CoordinateMove::from_move(&Arbiter::worst_move(&position).unwrap());
        assert_eq!(h.game.hint(), expected);

        assert!(play(&mut h.game, "e2e4"));
        assert_eq!(h.game.hint(), None);
    }

    #[test]
    fn test_export_pgn_round_trips_through_record_parser() {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Weak, None);
        assert!(play(&mut h.game, "e2e4"));
        h.game.poll(Instant::now());
        h.engine.answer("c7c5");
        h.game.poll(Instant::now());
        assert!(play(&mut h.game, "g1f3"));

        let pgn = h.game.export_pgn().unwrap();
        assert!(pgn.contains("[White \"Player\"]"));
        assert!(pgn.contains("[Black \"NateBot\"]"));
        assert!(pgn.contains("1. e4 c5 2. Nf3 *"));

        let record = GameRecord::parse(&pgn);
        assert_eq!(record.moves, vec!["e4", "c5", "Nf3"]);
        assert_eq!(record.headers.result, "*");
    }

    #[test]
    fn test_book_capture_is_credited_to_ai() {
        let mut h = harness();
        h.game.start(PieceColor::Black, Difficulty::Weak, Some("scandinavian"));
        h.game.poll(Instant::now());
        assert!(play(&mut h.game, "d7d5"));
        h.game.poll(Instant::now());

        let session = h.game.session().unwrap();
        assert_eq!(session.history(), &["e4", "d5", "exd5"]);
        assert_eq!(session.captured_by_ai(), &[PieceKind::Pawn]);
        assert!(session.captured_by_human().is_empty());
        let book_moves = h
            .game
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::MoveApplied { source: MoveSource::Book, .. }))
            .count();
        assert_eq!(book_moves, 2);
        assert!(h.engine.requests().is_empty());
    }

    /// Replace the session's position, keeping white (the human) to move
    fn set_position(game: &mut GameSession, fen: &str) {
        let setup: Fen = fen.parse().unwrap();
        let position: Chess = setup.into_position(CastlingMode::Standard).unwrap();
        let session = game.session.as_mut().unwrap();
        session.repetitions.clear();
        session.repetitions.insert(repetition_key(&position), 1);
        session.position = position;
    }

    fn assert_drawn_by(fen: &str, human_move: &str, expected: GameOutcome) {
        let mut h = harness();
        h.game.start(PieceColor::White, Difficulty::Strong, None);
        set_position(&mut h.game, fen);
        h.game.drain_events();

        assert!(play(&mut h.game, human_move), "{human_move} refused in {fen}");
        let session = h.game.session().unwrap();
        assert_eq!(session.outcome(), Some(expected));
        assert_eq!(session.result(), Some(expected));
        assert!(session.is_terminal());
        assert_eq!(expected.winner(), None);
        assert_eq!(expected.result_tag(), "1/2-1/2");

        let events = h.game.drain_events();
        assert_eq!(game_over_count(&events), 1);
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::AchievementUnlocked(_))));
        assert!(h.store.saved.borrow().is_empty());

        // Nothing left for the AI to do
        h.game.poll(Instant::now());
        assert!(h.engine.requests().is_empty());
        assert_eq!(game_over_count(&h.game.drain_events()), 0);
    }

    #[test]
    fn test_stalemate_ends_the_game() {
        assert_drawn_by("k7/8/8/8/8/8/2Q5/7K w - - 0 1", "c2c7", GameOutcome::Stalemate);
    }

    #[test]
    fn test_bare_kings_end_the_game() {
        assert_drawn_by("k7/8/8/8/8/8/1r6/K7 w - - 0 1", "a1b2", GameOutcome::InsufficientMaterial);
    }

    #[test]
    fn test_fifty_quiet_moves_end_the_game() {
        assert_drawn_by("k7/8/8/8/8/8/8/KR6 w - - 99 80", "b1b2", GameOutcome::FiftyMoveRule);
    }
}
