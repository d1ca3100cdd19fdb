//! Resource field: a grid of LIFO token stacks over a continuous world rectangle.

use crate::geometry::{Rect, Vec2};
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an indivisible resource unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    /// Baseline token; metabolized for energy
    Energy,
    /// Byproduct of metabolism; two can be recycled into one `Energy`
    Waste,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Energy => write!(f, "Energy"),
            Token::Waste => write!(f, "Waste"),
        }
    }
}

/// Read-only view of one cell for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellView {
    /// What `take` would return
    pub top: Option<Token>,
    /// Stack height
    pub depth: usize,
}

/// Grid of token stacks
#[derive(Clone, Debug)]
pub struct ResourceField {
    bounds: Rect,
    dim_x: usize,
    dim_y: usize,
    /// cells[y * dim_x + x], top of stack is the last element
    cells: Vec<Vec<Token>>,
    /// Time left until the next regeneration arrival
    regen: f64,
    /// Mean regenerated tokens per unit time
    regen_rate: f64,
}

impl ResourceField {
    /// Create a field with one `Energy` token on every cell
    pub fn new(bounds: Rect, dim_x: usize, dim_y: usize, regen_rate: f64) -> Self {
        assert!(dim_x > 0 && dim_y > 0, "field needs at least one cell");
        assert!(
            bounds.width() > 0.0 && bounds.height() > 0.0,
            "field bounds must have positive area"
        );

        Self {
            bounds,
            dim_x,
            dim_y,
            cells: vec![vec![Token::Energy]; dim_x * dim_y],
            regen: 0.0,
            regen_rate,
        }
    }

    /// Map a world position to cell indices, `None` when it lands outside the grid
    pub fn to_cell(&self, position: Vec2) -> Option<(usize, usize)> {
        if !position.x.is_finite() || !position.y.is_finite() {
            return None;
        }
        let ll = self.bounds.ll;
        let x = (self.dim_x as f64 * ((position.x - ll.x) / self.bounds.width())).round();
        let y = (self.dim_y as f64 * ((position.y - ll.y) / self.bounds.height())).round();

        if 0.0 <= x && x < self.dim_x as f64 && 0.0 <= y && y < self.dim_y as f64 {
            Some((x as usize, y as usize))
        } else {
            None
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.dim_x + x
    }

    /// Pop the top token at `position`. Out-of-bounds positions yield `None`.
    pub fn take(&mut self, position: Vec2) -> Option<Token> {
        let (x, y) = self.to_cell(position)?;
        let idx = self.index(x, y);
        self.cells[idx].pop()
    }

    /// Push a token at `position`.
    ///
    /// Panics when `position` lies outside the grid: callers only ever put at
    /// clamped organism positions, so a miss means corrupted bounds.
    pub fn put(&mut self, position: Vec2, token: Token) {
        let (x, y) = self.to_cell(position).unwrap_or_else(|| {
            panic!(
                "put {} at ({}, {}) outside resource field",
                token, position.x, position.y
            )
        });
        let idx = self.index(x, y);
        self.cells[idx].push(token);
    }

    /// Poisson replenishment: push `Energy` tokens on random cells at
    /// exponentially distributed intervals
    pub fn step(&mut self, dt: f64, rng: &mut RandomSource) {
        if self.regen_rate <= 0.0 {
            return;
        }

        self.regen -= dt;
        while self.regen < 0.0 {
            let x = rng.int_range(0, self.dim_x);
            let y = rng.int_range(0, self.dim_y);
            let idx = self.index(x, y);
            self.cells[idx].push(Token::Energy);

            self.regen += rng.exponential(self.regen_rate);
        }
    }

    /// World position of a cell's center
    pub fn cell_center(&self, x: usize, y: usize) -> Vec2 {
        let ll = self.bounds.ll;
        Vec2::new(
            ll.x + x as f64 * self.bounds.width() / self.dim_x as f64,
            ll.y + y as f64 * self.bounds.height() / self.dim_y as f64,
        )
    }

    /// Clamp a position into the region that maps onto cells
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        position.clamp(
            self.bounds.ll,
            self.cell_center(self.dim_x - 1, self.dim_y - 1),
        )
    }

    /// Center of a uniformly random cell
    pub fn random_position(&self, rng: &mut RandomSource) -> Vec2 {
        let x = rng.int_range(0, self.dim_x);
        let y = rng.int_range(0, self.dim_y);
        self.cell_center(x, y)
    }

    /// Top token and stack height of a cell
    pub fn cell(&self, x: usize, y: usize) -> CellView {
        let stack = &self.cells[self.index(x, y)];
        CellView {
            top: stack.last().copied(),
            depth: stack.len(),
        }
    }

    /// Stack height at a world position, 0 when out of bounds
    pub fn depth_at(&self, position: Vec2) -> usize {
        self.to_cell(position)
            .map_or(0, |(x, y)| self.cells[self.index(x, y)].len())
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.dim_x, self.dim_y)
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Tokens stored across all cells
    pub fn total_tokens(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Tokens of one kind across all cells
    pub fn count(&self, token: Token) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&t| t == token)
            .count()
    }
}
