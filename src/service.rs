pub mod email_import;
pub mod notification;
pub mod schengen;
