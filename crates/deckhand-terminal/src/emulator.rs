//! Terminal-rendering engine seam and a headless vt100-backed engine.

/// The emulator operations the bridge and diagnostics rely on. Escape
/// sequence interpretation, cursor handling and scrollback belong to the
/// implementation.
pub trait TerminalEmulator: Send {
    fn write(&mut self, data: &[u8]);
    fn resize(&mut self, cols: u16, rows: u16);
    /// Visible row count.
    fn rows(&self) -> usize;
    /// Current viewport buffer, one string per line.
    fn buffer_lines(&self) -> Vec<String>;
}

/// Screen model without a display, used by the host process to paint
/// server-side.
pub struct HeadlessEmulator {
    parser: vt100::Parser,
}

impl HeadlessEmulator {
    pub fn new(cols: u16, rows: u16, scrollback: usize) -> Self {
        Self {
            parser: vt100::Parser::new(rows, cols, scrollback),
        }
    }

    pub fn size(&self) -> (u16, u16) {
        let (rows, cols) = self.parser.screen().size();
        (cols, rows)
    }

    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }
}

impl TerminalEmulator for HeadlessEmulator {
    fn write(&mut self, data: &[u8]) {
        self.parser.process(data);
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.parser.set_size(rows, cols);
    }

    fn rows(&self) -> usize {
        self.parser.screen().size().0 as usize
    }

    fn buffer_lines(&self) -> Vec<String> {
        let (_, cols) = self.parser.screen().size();
        self.parser.screen().rows(0, cols).collect()
    }
}
