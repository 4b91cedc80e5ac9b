//! Terminal front end: wires the models to stdin/stdout for each subcommand.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Settings;
use crate::content::DirContentStore;
use crate::domain::achievements::AchievementGate;
use crate::domain::opening_book::{BookSide, OpeningBook};
use crate::domain::pgn::{GameRecord, standings};
use crate::domain::{CoordinateMove, Difficulty, PieceColor};
use crate::models::{GameSession, MoveSource, ReplayController, SessionEvent, UciEngine};
use crate::store::JsonFileStore;
use crate::ui::TextBoard;
use crate::ui::display;
use crate::ui::text_board::render;

/// How often the play loop checks for engine replies and due AI turns
const POLL_INTERVAL: Duration = Duration::from_millis(20);

const PLAY_HELP: &str = "Enter moves like e2e4. Commands: hint, moves, pgn, new, resign, quit";

fn achievement_gate(settings: &Settings) -> AchievementGate {
    AchievementGate::new(Box::new(JsonFileStore::new(&settings.achievements_path)))
}

fn both_books(content: &DirContentStore) -> (OpeningBook, OpeningBook) {
    (
        OpeningBook::load_or_empty(content, BookSide(PieceColor::White)),
        OpeningBook::load_or_empty(content, BookSide(PieceColor::Black)),
    )
}

enum Flow {
    Continue,
    Quit,
}

/// Play against the bot until the user quits or stdin closes
pub fn play(
    settings: &Settings,
    human: PieceColor,
    difficulty: Difficulty,
    opening: Option<&str>,
) -> Result<()> {
    let mut game = GameSession::new(
        Box::new(UciEngine::new(&settings.engine_path)),
        Box::new(TextBoard::new(human)),
        Box::new(DirContentStore::new(&settings.data_dir)),
        achievement_gate(settings),
    )
    .with_arbiter(settings.arbiter())
    .with_pacing(settings.pacing());

    println!("{PLAY_HELP}");
    game.start(human, difficulty, opening);
    if let Some(session) = game.session() {
        println!("Opening: {} | you play {human} | {difficulty}", session.opening_name());
    }

    // Stdin reader thread; the loop below polls it alongside the session
    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(|l| l.ok()) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        game.poll(Instant::now());
        report_events(&mut game);

        match line_rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                if let Flow::Quit = handle_command(&mut game, line.trim(), human, difficulty, opening) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("stdin closed");
                break;
            }
        }
    }

    game.resign();
    Ok(())
}

fn handle_command(
    game: &mut GameSession,
    input: &str,
    human: PieceColor,
    difficulty: Difficulty,
    opening: Option<&str>,
) -> Flow {
    match input {
        "" => {}
        "quit" | "q" => return Flow::Quit,
        "help" => println!("{PLAY_HELP}"),
        "resign" => {
            if game.resign() {
                println!("You resigned. Type 'new' for another game or 'quit'.");
            }
        }
        "new" => game.start(human, difficulty, opening),
        "hint" => match game.hint() {
            Some(m) => println!("Try {m}"),
            None => println!("No hint available"),
        },
        "moves" => {
            if let Some(session) = game.session() {
                println!("{}", display::move_list(session.history()));
                println!(
                    "Captured by you: {} | by NateBot: {}",
                    display::captured(session.captured_by_human()),
                    display::captured(session.captured_by_ai())
                );
            }
        }
        "pgn" => match game.export_pgn() {
            Some(pgn) => println!("{pgn}"),
            None => println!("No game in progress"),
        },
        text => match text.parse::<CoordinateMove>() {
            Ok(m) => {
                if !game.submit_human_move(m.from, m.to) {
                    println!("Move {m} not accepted");
                }
            }
            Err(_) => println!("Unknown command '{text}'. {PLAY_HELP}"),
        },
    }
    Flow::Continue
}

fn report_events(game: &mut GameSession) {
    for event in game.drain_events() {
        match event {
            SessionEvent::MoveApplied { source, san, .. } => {
                let via = match source {
                    MoveSource::Human => continue,
                    MoveSource::Book => "book",
                    MoveSource::Heuristic => "heuristic",
                    MoveSource::Engine => "engine",
                };
                println!("NateBot plays {san} ({via})");
            }
            SessionEvent::GameOver(outcome) => {
                println!("Game over: {outcome}");
                println!("Type 'pgn' to export, 'new' to play again or 'quit'.");
            }
            SessionEvent::AchievementUnlocked(unlock) => {
                println!("Achievement unlocked: {}", unlock.opening_name);
            }
        }
    }
    let _ = io::stdout().flush();
}

/// Print both opening books, marking unlocked lines
pub fn openings(settings: &Settings) -> Result<()> {
    let content = DirContentStore::new(&settings.data_dir);
    let gate = achievement_gate(settings);
    let (white, black) = both_books(&content);

    for (title, book) in [("White openings (you play black)", &white), ("Black openings (you play white)", &black)] {
        println!("{title}");
        if book.is_empty() {
            println!("  (none)");
        }
        for row in display::opening_rows(book, |name| gate.is_unlocked(name)) {
            let mark = if row.unlocked { "*" } else { " " };
            println!(" {mark} {:<20} {}", row.key, row.name);
            if !row.description.is_empty() {
                println!("     {}", row.description);
            }
            println!("     {}", row.moves);
        }
        println!();
    }
    Ok(())
}

/// Step through a PGN file: n = next, p = previous, q = quit
pub fn replay(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut controller = ReplayController::new();
    controller.open(&text);
    info!(path = %path.display(), plies = controller.len(), "replaying");

    if let Some(title) = controller.title() {
        println!("{title}");
    }
    show_replay(&controller);

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let stepped = match line.trim() {
            "n" | "" => controller.step_forward(),
            "p" => controller.step_backward(),
            "q" => break,
            other => {
                println!("Unknown command '{other}'. Use n, p or q.");
                continue;
            }
        };
        match stepped {
            Ok(true) => show_replay(&controller),
            Ok(false) => println!("No more moves that way"),
            Err(e) => println!("{e}"),
        }
    }
    controller.close();
    Ok(())
}

fn show_replay(controller: &ReplayController) {
    let Some(fen) = controller.fen() else {
        return;
    };
    if let Some(board) = render(&fen, PieceColor::White, None) {
        println!("\n{board}");
    }
    let last = controller
        .cursor()
        .checked_sub(1)
        .and_then(|i| controller.record().and_then(|r| r.moves.get(i)));
    match last {
        Some(san) => println!("Ply {}/{}: {san}", controller.cursor(), controller.len()),
        None => println!("Ply 0/{}", controller.len()),
    }
}

/// Every `.pgn` file in `dir`, sorted
fn record_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "pgn"))
        .collect();
    files.sort();
    Ok(files)
}

/// Print the standings table for the given records, or every record in the
/// configured directory
pub fn standings_table(settings: &Settings, files: &[PathBuf]) -> Result<()> {
    let files = if files.is_empty() {
        record_files(&settings.records_dir)?
    } else {
        files.to_vec()
    };

    let mut records = Vec::with_capacity(files.len());
    for path in &files {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        records.push(GameRecord::parse(&text));
    }

    for record in &records {
        println!("{} ({})", record.title(), record.headers.result);
    }
    println!();
    println!("{:<20} {:>3} {:>3} {:>3} {:>6}", "Player", "W", "L", "D", "Pts");
    for row in display::standing_rows(&standings(&records)) {
        println!(
            "{:<20} {:>3} {:>3} {:>3} {:>6.1}",
            row.player, row.wins, row.losses, row.draws, row.points
        );
    }
    Ok(())
}

/// Print unlocked achievements and overall progress
pub fn achievements(settings: &Settings) -> Result<()> {
    let content = DirContentStore::new(&settings.data_dir);
    let gate = achievement_gate(settings);
    let (white, black) = both_books(&content);

    let progress = gate.progress(&[&white, &black]);
    println!(
        "Unlocked {}/{} openings ({:.0}%)",
        progress.unlocked,
        progress.total,
        progress.percent()
    );
    for name in gate.unlocked() {
        println!("  {name}");
    }
    Ok(())
}
