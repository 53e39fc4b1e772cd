//! Cell board shared by the snakes of one pool
//!
//! The board is addressed by `Coord { x, y }` with the origin in the top-left
//! corner. `width` and `height` are the coordinates of the far border, so the
//! backing array holds `(width + 1) * (height + 1)` cells and the playable
//! interior is `1..width` by `1..height`. Movement wraps inside that interior;
//! the grid itself never wraps and rejects every out-of-range access.

use shared::Coord;
use std::fmt;

/// State of one board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Cell {
    #[default]
    Empty = 1,
    Wall = 2,
    Food = 5,
    Player = 6,
}

impl Cell {
    /// Cells a snake head must never enter
    pub fn is_solid(self) -> bool {
        matches!(self, Cell::Wall | Cell::Player)
    }

    fn glyph(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Wall => '#',
            Cell::Food => '*',
            Cell::Player => 'o',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("x {0} is out of bounds")]
    XOutOfBounds(i32),
    #[error("y {0} is out of bounds")]
    YOutOfBounds(i32),
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates an empty board whose far border sits at `(width, height)`.
    /// Negative sizes are treated as zero.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            cells: vec![Cell::Empty; Self::cell_count(width, height)],
        }
    }

    /// Creates a board with its outer ring marked as wall.
    pub fn walled(width: i32, height: i32) -> Self {
        let mut grid = Self::new(width, height);
        grid.draw_border();
        grid
    }

    fn cell_count(width: i32, height: i32) -> usize {
        (width as usize + 1) * (height as usize + 1)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// True for cells strictly inside the border ring.
    pub fn is_interior(&self, coord: Coord) -> bool {
        coord.x > 0 && coord.x < self.width && coord.y > 0 && coord.y < self.height
    }

    // Y is checked before X so a row miss reports the row.
    fn index(&self, x: i32, y: i32) -> Result<usize, GridError> {
        if y < 0 || y > self.height {
            return Err(GridError::YOutOfBounds(y));
        }
        if x < 0 || x > self.width {
            return Err(GridError::XOutOfBounds(x));
        }
        Ok(y as usize * (self.width as usize + 1) + x as usize)
    }

    pub fn get(&self, coord: Coord) -> Result<Cell, GridError> {
        let index = self.index(coord.x, coord.y)?;
        Ok(self.cells[index])
    }

    pub fn set(&mut self, coord: Coord, cell: Cell) -> Result<(), GridError> {
        let index = self.index(coord.x, coord.y)?;
        self.cells[index] = cell;
        Ok(())
    }

    pub fn set_row(&mut self, y: i32, cell: Cell) -> Result<(), GridError> {
        let start = self.index(0, y)?;
        let end = start + self.width as usize + 1;
        self.cells[start..end].fill(cell);
        Ok(())
    }

    pub fn set_col(&mut self, x: i32, cell: Cell) -> Result<(), GridError> {
        if x < 0 || x > self.width {
            return Err(GridError::XOutOfBounds(x));
        }
        for y in 0..=self.height {
            let index = self.index(x, y)?;
            self.cells[index] = cell;
        }
        Ok(())
    }

    /// Reallocates the board at a new size. Every cell comes back empty.
    pub fn reload(&mut self, width: i32, height: i32) {
        *self = Self::new(width, height);
    }

    /// Marks the outer ring as wall.
    pub fn draw_border(&mut self) {
        // The four edges always exist, even on a 0x0 board.
        let _ = self.set_row(0, Cell::Wall);
        let _ = self.set_row(self.height, Cell::Wall);
        let _ = self.set_col(0, Cell::Wall);
        let _ = self.set_col(self.width, Cell::Wall);
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width as usize + 1) {
            let line: String = row.iter().map(|cell| cell.glyph()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
