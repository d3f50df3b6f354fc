pub mod handler;
pub mod invitation;
pub mod pin;
pub mod request;
