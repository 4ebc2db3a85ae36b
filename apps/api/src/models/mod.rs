pub mod flashcard;
pub mod user;
