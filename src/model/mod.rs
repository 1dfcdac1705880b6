pub mod record;
pub mod translation;
