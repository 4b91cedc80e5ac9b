//! Stored game records in PGN and the tournament table built from them.

use std::collections::BTreeMap;

/// Placeholder for a missing header tag
pub const UNKNOWN_TAG: &str = "?";
/// Placeholder for a missing or unfinished result
pub const UNKNOWN_RESULT: &str = "*";

/// Header tags of a game record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeaders {
    pub round: String,
    pub date: String,
    pub white: String,
    pub black: String,
    pub result: String,
}

impl Default for RecordHeaders {
    fn default() -> Self {
        Self {
            round: UNKNOWN_TAG.to_string(),
            date: UNKNOWN_TAG.to_string(),
            white: UNKNOWN_TAG.to_string(),
            black: UNKNOWN_TAG.to_string(),
            result: UNKNOWN_RESULT.to_string(),
        }
    }
}

/// A parsed game record: headers plus the main-line moves in SAN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub headers: RecordHeaders,
    pub moves: Vec<String>,
}

impl GameRecord {
    /// Parse PGN text. Never fails: unknown tags are ignored and missing
    /// ones fall back to placeholders. Move legality is not checked here.
    pub fn parse(text: &str) -> Self {
        let mut headers = RecordHeaders::default();
        let mut movetext = String::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('[') {
                if let Some((tag, value)) = parse_tag(trimmed) {
                    if value.is_empty() {
                        continue;
                    }
                    match tag {
                        "Round" => headers.round = value.to_string(),
                        "Date" => headers.date = value.to_string(),
                        "White" => headers.white = value.to_string(),
                        "Black" => headers.black = value.to_string(),
                        "Result" => headers.result = value.to_string(),
                        _ => {}
                    }
                }
            } else {
                movetext.push_str(line);
                movetext.push('\n');
            }
        }

        Self {
            headers,
            moves: parse_movetext(&movetext),
        }
    }

    /// `Round r: White vs Black`
    pub fn title(&self) -> String {
        format!(
            "Round {}: {} vs {}",
            self.headers.round, self.headers.white, self.headers.black
        )
    }
}

/// Split `[Tag "value"]` into its parts
fn parse_tag(line: &str) -> Option<(&str, &str)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let (tag, rest) = inner.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((tag, value))
}

/// Extract main-line SAN tokens, skipping comments, variations, NAGs,
/// move numbers and the result marker
fn parse_movetext(text: &str) -> Vec<String> {
    let mut moves = Vec::new();
    let mut token = String::new();
    let mut brace_comment = false;
    let mut line_comment = false;
    let mut variation_depth = 0usize;

    for c in text.chars() {
        if line_comment {
            if c == '\n' {
                line_comment = false;
            }
            continue;
        }
        if brace_comment {
            if c == '}' {
                brace_comment = false;
            }
            continue;
        }
        match c {
            '{' => {
                flush(&mut token, &mut moves);
                brace_comment = true;
            }
            ';' => {
                flush(&mut token, &mut moves);
                line_comment = true;
            }
            '(' => {
                flush(&mut token, &mut moves);
                variation_depth += 1;
            }
            ')' => {
                token.clear();
                variation_depth = variation_depth.saturating_sub(1);
            }
            c if c.is_whitespace() => {
                if variation_depth == 0 {
                    flush(&mut token, &mut moves);
                } else {
                    token.clear();
                }
            }
            c => {
                if variation_depth == 0 {
                    token.push(c);
                }
            }
        }
    }
    flush(&mut token, &mut moves);
    moves
}

fn flush(token: &mut String, moves: &mut Vec<String>) {
    if let Some(san) = san_token(token) {
        moves.push(san);
    }
    token.clear();
}

/// The SAN part of a movetext token, if it is a move at all
fn san_token(token: &str) -> Option<String> {
    if token.is_empty() || token.starts_with('$') {
        return None;
    }
    if matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*") {
        return None;
    }
    let san = strip_move_number(token);
    if san.is_empty() {
        return None;
    }
    // Annotation glyphs like "!?" are not part of the move
    let san = san.trim_end_matches(['!', '?']);
    if san.is_empty() {
        return None;
    }
    // Some writers castle with zeros
    let san = if let Some(rest) = san.strip_prefix("0-0-0") {
        format!("O-O-O{rest}")
    } else if let Some(rest) = san.strip_prefix("0-0") {
        format!("O-O{rest}")
    } else {
        san.to_string()
    };
    Some(san)
}

/// Drop a leading move number: "12." "12..." or the "12." of "12.e4".
/// Digits not followed by a dot belong to the move.
fn strip_move_number(token: &str) -> &str {
    let digits = token.len() - token.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &token[digits..];
    if digits > 0 && rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else {
        token
    }
}

/// Aggregate score of one player across records
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Standing {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points: f32,
}

/// Score every player appearing in `records`. Unfinished games count for
/// nobody but still list both players.
pub fn standings<'a>(records: impl IntoIterator<Item = &'a GameRecord>) -> BTreeMap<String, Standing> {
    let mut table: BTreeMap<String, Standing> = BTreeMap::new();
    for record in records {
        let h = &record.headers;
        table.entry(h.white.clone()).or_default();
        table.entry(h.black.clone()).or_default();

        match h.result.as_str() {
            "1-0" => {
                credit_win(&mut table, &h.white);
                credit_loss(&mut table, &h.black);
            }
            "0-1" => {
                credit_win(&mut table, &h.black);
                credit_loss(&mut table, &h.white);
            }
            "1/2-1/2" => {
                for name in [&h.white, &h.black] {
                    if let Some(s) = table.get_mut(name) {
                        s.draws += 1;
                        s.points += 0.5;
                    }
                }
            }
            _ => {}
        }
    }
    table
}

fn credit_win(table: &mut BTreeMap<String, Standing>, name: &str) {
    if let Some(s) = table.get_mut(name) {
        s.wins += 1;
        s.points += 1.0;
    }
}

fn credit_loss(table: &mut BTreeMap<String, Standing>, name: &str) {
    if let Some(s) = table.get_mut(name) {
        s.losses += 1;
    }
}
