pub mod ask_ai;
pub mod events;
pub mod games;
pub mod health;
pub mod hint;
