pub mod clock;
pub mod followup;
pub mod lifecycle;
pub mod messages;
pub mod schedule;
pub mod webhooks;
