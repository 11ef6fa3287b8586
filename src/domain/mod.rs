pub mod credentials;
pub mod search;
pub mod ticket;
