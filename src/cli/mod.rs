//! Terminal output for the demo console

pub mod console;

pub use console::Console;
