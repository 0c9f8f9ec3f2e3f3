pub mod csrf;
pub mod email;
pub mod error;
pub mod health;
pub mod monitoring;
pub mod notification;
pub mod schengen;
pub mod trip;
pub mod user;
pub mod visa;
