pub mod builtins;
pub mod engine;
pub mod numeric;
pub mod process;
