use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::trace;

/// Line-oriented sink for generated assembly.
///
/// Lines are written in call order. `close` consumes the emitter, so the
/// sink is flushed at most once; an emitter dropped after a failed compile
/// still releases the underlying writer.
pub struct Emitter<W: Write> {
    out: W,
    label_counter: usize,
    lines: usize,
}

impl Emitter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            label_counter: 1,
            lines: 0,
        }
    }

    pub fn emit(&mut self, line: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.out, "{}", line.as_ref())?;
        self.lines += 1;
        Ok(())
    }

    /// Mints a fresh label name; it is not emitted.
    pub fn label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        trace!(%label, "minted label");
        label
    }

    /// Number of lines emitted so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn close(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique_and_not_emitted() {
        let mut emitter = Emitter::new(Vec::new());
        assert_eq!(emitter.label(), "L1");
        assert_eq!(emitter.label(), "L2");
        assert_eq!(emitter.lines(), 0);
        let out = emitter.close().expect("close");
        assert!(out.is_empty());
    }

    #[test]
    fn lines_are_written_in_order() {
        let mut emitter = Emitter::new(Vec::new());
        emitter.emit("li $v0, 1").expect("emit");
        let label = emitter.label();
        emitter.emit(format!("{label}:")).expect("emit");
        assert_eq!(emitter.lines(), 2);
        let out = emitter.close().expect("close");
        assert_eq!(String::from_utf8(out).expect("utf8"), "li $v0, 1\nL1:\n");
    }
}
