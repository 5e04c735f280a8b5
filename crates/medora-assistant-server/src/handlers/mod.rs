pub mod chatbot;
pub mod clinic;
pub mod health;
