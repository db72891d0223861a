//! Bookkeeping for the run of known-good columns in a fixed-width buffer

/// The single contiguous range of columns holding correct data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidInterval {
    #[default]
    Empty,
    /// Columns `left..left + width`, with `width > 0`
    Span { left: usize, width: usize },
}

impl ValidInterval {
    pub fn new(left: usize, width: usize) -> Self {
        if width == 0 {
            ValidInterval::Empty
        } else {
            ValidInterval::Span { left, width }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidInterval::Span { .. })
    }

    pub fn left(&self) -> usize {
        match *self {
            ValidInterval::Empty => 0,
            ValidInterval::Span { left, .. } => left,
        }
    }

    pub fn width(&self) -> usize {
        match *self {
            ValidInterval::Empty => 0,
            ValidInterval::Span { width, .. } => width,
        }
    }

    /// One past the last valid column
    pub fn right(&self) -> usize {
        self.left() + self.width()
    }

    pub fn invalidate(&mut self) {
        *self = ValidInterval::Empty;
    }

    /// Whether every column in `left..right` is valid
    ///
    /// An empty request is always satisfied.
    pub fn spans(&self, left: usize, right: usize) -> bool {
        if right <= left {
            return true;
        }
        match *self {
            ValidInterval::Empty => false,
            ValidInterval::Span { .. } => left >= self.left() && right <= self.right(),
        }
    }

    /// Interval after the buffer content moved `dx` columns (positive = right)
    ///
    /// Whatever lands outside `0..total` is dropped; a move of a whole buffer
    /// width or more leaves nothing valid.
    pub fn shifted(&self, dx: i64, total: usize) -> ValidInterval {
        let ValidInterval::Span { left, width } = *self else {
            return ValidInterval::Empty;
        };
        if dx.unsigned_abs() >= total as u64 {
            return ValidInterval::Empty;
        }

        let new_left = (left as i64 + dx).max(0);
        let new_right = (left as i64 + width as i64 + dx).min(total as i64);
        if new_right <= new_left {
            return ValidInterval::Empty;
        }
        ValidInterval::new(new_left as usize, (new_right - new_left) as usize)
    }

    /// Merge a freshly drawn span into the interval
    ///
    /// Keeps the largest interval that is entirely known to be valid. A drawn
    /// span sharing no column with the current interval replaces it, since
    /// nothing certifies the columns between them.
    pub fn extend(&mut self, left: usize, width: usize) {
        if width == 0 {
            return;
        }
        let ValidInterval::Span {
            left: old_left,
            width: old_width,
        } = *self
        else {
            *self = ValidInterval::new(left, width);
            return;
        };

        let old_right = old_left + old_width;
        let right = left + width;

        if left <= old_left && right >= old_right {
            // new span contains the old one
            *self = ValidInterval::new(left, width);
        } else if right <= old_left || left >= old_right {
            // no column in common
            *self = ValidInterval::new(left, width);
        } else if left <= old_left {
            // overlaps the left edge
            *self = ValidInterval::new(left, old_right - left);
        } else if right >= old_right {
            // overlaps the right edge
            *self = ValidInterval::new(old_left, right - old_left);
        }
        // otherwise the new span lies inside the old interval
    }
}
