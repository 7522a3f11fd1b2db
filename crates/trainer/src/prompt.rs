use std::fmt::Write;

use chess_core::{GamePosition, LegalMove};

/// Suggestion request: numbered SAN list plus a strict JSON reply format.
pub fn suggestion_prompt(position: &GamePosition, legal: &[LegalMove]) -> String {
    let mut moves = String::new();
    for mv in legal {
        let _ = writeln!(moves, "{}: {}", mv.index, mv.san);
    }

    format!(
        "You are advising the {side} player in this chess position.\n\
         FEN: {fen}\n\
         Side to move: {side}\n\
         Legal moves (index: SAN):\n\
         {moves}\
         Pick the single most sensible move from the list above. Only listed moves are legal.\n\
         Reply with JSON only, no other text: {{\"i\": <index>, \"r\": \"<one or two sentence rationale>\"}}",
        side = position.turn().label(),
        fen = position.fen(),
    )
}
