pub mod banwave;
pub mod punishments;
