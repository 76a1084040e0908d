pub mod chat;
pub mod fetch;
pub mod onboard;
pub mod search;
