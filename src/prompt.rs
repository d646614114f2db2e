use std::io::{self, BufRead, Write};

/// Prints the prompt and reads one line at a time.
pub struct ShellPrompt<R> {
    text: String,
    input: R,
}

impl ShellPrompt<io::StdinLock<'static>> {
    pub fn stdin(text: impl Into<String>) -> Self {
        ShellPrompt::new(text, io::stdin().lock())
    }
}

impl<R: BufRead> ShellPrompt<R> {
    pub fn new(text: impl Into<String>, input: R) -> Self {
        ShellPrompt {
            text: text.into(),
            input,
        }
    }

    pub fn show_prompt(&self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{}", self.text)?;
        out.flush()
    }

    /// `None` at end of input (e.g. Ctrl-D).
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        let bytes_read = self.input.read_line(&mut buf)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        let line = buf.strip_suffix('\n').unwrap_or(&buf);
        Ok(Some(line.strip_suffix('\r').unwrap_or(line).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_lines_until_eof() {
        let mut prompt = ShellPrompt::new("> ", "ls -l\nwc  \n".as_bytes());
        assert_eq!(prompt.read_line().unwrap(), Some("ls -l".to_string()));
        // Trailing blanks belong to the line; only the newline is dropped
        assert_eq!(prompt.read_line().unwrap(), Some("wc  ".to_string()));
        assert_eq!(prompt.read_line().unwrap(), None);
    }

    #[test]
    fn test_show_prompt() {
        let prompt = ShellPrompt::new("What next? ", io::empty());
        let mut out = Vec::new();
        prompt.show_prompt(&mut out).unwrap();
        assert_eq!(out, b"What next? ");
    }
}
