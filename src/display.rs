//! Display frames.
//!
//! A [`DisplayFrame`] is a fixed grid of character cells together with the
//! styled regions of the grid. Frames are produced by the pure render
//! functions of each peripheral and drawn by a [`Screen`](crate::console::Screen).

/// Width of the frame in character cells.
pub const FRAME_WIDTH: usize = 80;

/// Number of cells of the bar graphs.
pub const BAR_CELLS: usize = 60;

/// Text style of a region of the frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Style {
    /// Bold text.
    Bold,
    /// Reverse video.
    Reverse,
}

/// A styled region of one row of the frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Span {
    /// Row of the region.
    pub row: usize,
    /// First column of the region.
    pub col: usize,
    /// Number of cells in the region.
    pub len: usize,
    /// Style applied to the region.
    pub style: Style,
}

/// Display frame.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DisplayFrame {
    cells: Vec<Vec<char>>,
    spans: Vec<Span>,
    bar: usize,
}

impl DisplayFrame {
    /// Creates a blank frame with the given number of rows.
    pub fn new(height: usize) -> DisplayFrame {
        DisplayFrame {
            cells: vec![vec![' '; FRAME_WIDTH]; height],
            spans: Vec::new(),
            bar: 0,
        }
    }

    /// Number of rows of the frame.
    pub fn height(&self) -> usize {
        self.cells.len()
    }

    /// Writes text starting at a cell.
    ///
    /// Text that falls outside the grid is dropped.
    pub fn put(&mut self, row: usize, col: usize, text: &str) {
        let Some(line) = self.cells.get_mut(row) else {
            return;
        };
        for (cell, c) in line.iter_mut().skip(col).zip(text.chars()) {
            *cell = c;
        }
    }

    /// Writes text starting at a cell and applies a style to it.
    pub fn put_styled(&mut self, row: usize, col: usize, text: &str, style: Style) {
        self.put(row, col, text);
        let len = text
            .chars()
            .count()
            .min(FRAME_WIDTH.saturating_sub(col));
        if row < self.height() && len > 0 {
            self.spans.push(Span {
                row,
                col,
                len,
                style,
            });
        }
    }

    /// Draws a bar graph of [`BAR_CELLS`] cells starting at a cell.
    ///
    /// `filled` is clamped to [`BAR_CELLS`].
    pub fn put_bar(&mut self, row: usize, col: usize, filled: usize) {
        let filled = filled.min(BAR_CELLS);
        let bar: String = (0..BAR_CELLS)
            .map(|n| if n < filled { '#' } else { ' ' })
            .collect();
        self.put(row, col, &bar);
        self.bar = filled;
    }

    /// Length of the bar graph in the frame.
    pub fn bar(&self) -> usize {
        self.bar
    }

    /// Styled regions of the frame.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Gives the text of each row, with trailing blanks removed.
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|line| line.iter().collect::<String>().trim_end().to_string())
            .collect()
    }

    /// Gives the full-width text of a row.
    pub fn row(&self, row: usize) -> String {
        self.cells[row].iter().collect()
    }

    /// Gives the text covered by a span.
    pub fn span_text(&self, span: &Span) -> String {
        self.cells[span.row][span.col..span.col + span.len]
            .iter()
            .collect()
    }
}

/// Computes the length of a bar graph.
///
/// `position` is the position of the value within a range of `full_scale`
/// counts starting at zero. The result is clamped to `0..=BAR_CELLS`.
pub fn bar_length(position: i64, full_scale: i64) -> usize {
    (position * BAR_CELLS as i64 / full_scale).clamp(0, BAR_CELLS as i64) as usize
}
