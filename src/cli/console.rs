use colored::*;
use std::io::{self, Write};

use crate::core::{Payload, PayloadData};

/// Console handles terminal output for the demo with colored formatting
#[derive(Debug, Clone, Copy)]
pub struct Console {
    prompt_color: Color,
    output_color: Color,
    report_color: Color,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            prompt_color: Color::Cyan,
            output_color: Color::Green,
            report_color: Color::Magenta,
        }
    }

    /// Create a new Console with custom colors
    pub fn with_colors(prompt_color: Color, output_color: Color, report_color: Color) -> Self {
        Self {
            prompt_color,
            output_color,
            report_color,
        }
    }

    /// Print the input prompt (without newline)
    pub fn print_prompt(&self) -> io::Result<()> {
        print!("{} ", ">".color(self.prompt_color).bold());
        io::stdout().flush()
    }

    /// Print a payload that reached the host
    pub fn print_payload(&self, payload: &Payload) {
        let channel = format!("[{}]", payload.receiver_channel_id);

        if payload.flags.is_error() {
            self.print_error(&format!("{} {}", channel, payload.data));
            return;
        }

        match &payload.data {
            PayloadData::Json(value) => {
                println!(
                    "{} {}",
                    channel.color(self.report_color).bold(),
                    value.to_string().color(self.report_color)
                );
            }
            PayloadData::Channel(id) => {
                self.print_system(&format!("{} opened input channel {}", channel, id));
            }
            data => {
                println!("{} {}", channel.color(self.output_color).bold(), data);
            }
        }
    }

    /// Print a system message
    pub fn print_system(&self, message: &str) {
        println!("{}", message.bright_black());
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error.red());
    }

    /// Print a welcome banner
    pub fn print_banner(&self, plugin_info: &str) {
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", format!("  {}", plugin_info).bright_blue().bold());
        println!("{}", "=".repeat(60).bright_blue());
        println!();
        println!("  c        start a compute");
        println!("  i        interrupt the running compute");
        println!("  q        quit");
        println!("  <text>   send chat input");
        println!();
    }
}
