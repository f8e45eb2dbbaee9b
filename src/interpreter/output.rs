//! Destinations for `print`/`println` output.
//!
//! - Stdout: what the command line uses
//! - Buffer: captures everything for tests and for `run_source`

use std::io::Write;

/// Print sink, dispatched by enum rather than trait object.
#[derive(Debug)]
pub enum PrintHandler {
    Stdout,
    Buffer(String),
}

impl PrintHandler {
    pub fn stdout() -> Self {
        PrintHandler::Stdout
    }

    pub fn buffer() -> Self {
        PrintHandler::Buffer(String::new())
    }

    /// Print without newline.
    pub fn print(&mut self, msg: &str) {
        match self {
            PrintHandler::Stdout => {
                let mut stdout = std::io::stdout().lock();
                // A closed pipe is not the program's problem
                let _ = stdout.write_all(msg.as_bytes());
            }
            PrintHandler::Buffer(buffer) => buffer.push_str(msg),
        }
    }

    /// Print a line (with newline).
    pub fn println(&mut self, msg: &str) {
        match self {
            PrintHandler::Stdout => {
                let mut stdout = std::io::stdout().lock();
                let _ = writeln!(stdout, "{}", msg);
            }
            PrintHandler::Buffer(buffer) => {
                buffer.push_str(msg);
                buffer.push('\n');
            }
        }
    }

    /// Everything captured so far. Stdout captures nothing.
    pub fn get_output(&self) -> String {
        match self {
            PrintHandler::Stdout => String::new(),
            PrintHandler::Buffer(buffer) => buffer.clone(),
        }
    }

    pub fn flush(&mut self) {
        if let PrintHandler::Stdout = self {
            let _ = std::io::stdout().flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PrintHandler;

    #[test]
    fn test_buffer_captures_print_and_println() {
        let mut handler = PrintHandler::buffer();
        handler.print("a");
        handler.print("b");
        handler.println("");
        handler.println("line");
        assert_eq!(handler.get_output(), "ab\nline\n");
    }

    #[test]
    fn test_stdout_captures_nothing() {
        let handler = PrintHandler::stdout();
        assert_eq!(handler.get_output(), "");
    }
}
