use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier the host uses for one sheet. The engine never interprets it
/// beyond equality; sheet 0 is whatever the host says it is.
pub type SheetId = usize;

/// Largest addressable grid, matching the common spreadsheet limits.
pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLS: u32 = 16_384;

/// Coordinates of a single cell within a sheet.
///
/// Rows and columns are **0-indexed**: `row = 0` is grid row `1`,
/// `col = 0` is column `A`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddr {
    pub row: u32,
    pub col: u32,
}

impl CellAddr {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert to A1 notation (e.g. `A1`, `BC32`).
    pub fn to_a1(self) -> String {
        format!("{}{}", column_name(self.col), self.row + 1)
    }

    /// Parse an A1-style cell address (e.g. `A1`, `$B$2`).
    ///
    /// `$` absolute markers are accepted and discarded; evaluation does not
    /// distinguish absolute from relative addressing.
    pub fn from_a1(a1: &str) -> Result<Self, A1ParseError> {
        let s = a1.trim();
        if s.is_empty() {
            return Err(A1ParseError::Empty);
        }

        let bytes = s.as_bytes();
        let mut idx = 0usize;
        if bytes.get(idx) == Some(&b'$') {
            idx += 1;
        }

        let col_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
            idx += 1;
        }
        if idx == col_start {
            return Err(A1ParseError::MissingColumn);
        }
        let col = column_index(&s[col_start..idx])?;
        if col >= MAX_COLS {
            return Err(A1ParseError::InvalidColumn);
        }

        if bytes.get(idx) == Some(&b'$') {
            idx += 1;
        }

        let row_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == row_start {
            return Err(A1ParseError::MissingRow);
        }
        if idx != bytes.len() {
            return Err(A1ParseError::TrailingCharacters);
        }

        let row_1_based: u32 = s[row_start..idx]
            .parse()
            .map_err(|_| A1ParseError::InvalidRow)?;
        if row_1_based == 0 || row_1_based > MAX_ROWS {
            return Err(A1ParseError::InvalidRow);
        }

        Ok(Self {
            row: row_1_based - 1,
            col,
        })
    }
}

impl fmt::Display for CellAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Errors from parsing an A1 cell address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum A1ParseError {
    #[error("empty A1 reference")]
    Empty,
    #[error("missing column in A1 reference")]
    MissingColumn,
    #[error("missing row in A1 reference")]
    MissingRow,
    #[error("invalid column in A1 reference")]
    InvalidColumn,
    #[error("invalid row in A1 reference")]
    InvalidRow,
    #[error("trailing characters in A1 reference")]
    TrailingCharacters,
}

/// A possibly sheet-qualified single-cell reference.
///
/// `sheet: None` means "the sheet of the position being evaluated"; the
/// resolver substitutes the concrete id before any host callback sees it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub sheet: Option<SheetId>,
    pub addr: CellAddr,
}

impl CellRef {
    #[inline]
    pub const fn new(sheet: Option<SheetId>, addr: CellAddr) -> Self {
        Self { sheet, addr }
    }

    /// The concrete sheet, falling back to `default` when unqualified.
    #[inline]
    pub fn sheet_or(self, default: SheetId) -> SheetId {
        self.sheet.unwrap_or(default)
    }

    /// The equivalent one-cell range.
    pub fn to_range(self) -> RangeRef {
        RangeRef {
            sheet: self.sheet,
            start: self.addr,
            end: self.addr,
        }
    }
}

/// A possibly sheet-qualified rectangular range, inclusive on both ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeRef {
    pub sheet: Option<SheetId>,
    pub start: CellAddr,
    pub end: CellAddr,
}

impl RangeRef {
    pub const fn new(sheet: Option<SheetId>, start: CellAddr, end: CellAddr) -> Self {
        Self { sheet, start, end }
    }

    /// Reorder corners so `start` is the top-left and `end` the bottom-right.
    pub fn normalized(self) -> Self {
        let (r1, r2) = if self.start.row <= self.end.row {
            (self.start.row, self.end.row)
        } else {
            (self.end.row, self.start.row)
        };
        let (c1, c2) = if self.start.col <= self.end.col {
            (self.start.col, self.end.col)
        } else {
            (self.end.col, self.start.col)
        };
        Self {
            sheet: self.sheet,
            start: CellAddr { row: r1, col: c1 },
            end: CellAddr { row: r2, col: c2 },
        }
    }

    #[inline]
    pub fn sheet_or(self, default: SheetId) -> SheetId {
        self.sheet.unwrap_or(default)
    }

    #[inline]
    pub fn is_single_cell(self) -> bool {
        self.start == self.end
    }

    /// True when the range spans exactly one column (any number of rows).
    #[inline]
    pub fn is_single_column(self) -> bool {
        self.start.col == self.end.col
    }

    #[inline]
    pub fn height(self) -> u32 {
        let n = self.normalized();
        n.end.row - n.start.row + 1
    }

    #[inline]
    pub fn width(self) -> u32 {
        let n = self.normalized();
        n.end.col - n.start.col + 1
    }

    pub fn contains(self, addr: CellAddr) -> bool {
        let n = self.normalized();
        addr.row >= n.start.row
            && addr.row <= n.end.row
            && addr.col >= n.start.col
            && addr.col <= n.end.col
    }

    /// The cell reference at the top-left corner, same sheet qualification.
    pub fn top_left(self) -> CellRef {
        let n = self.normalized();
        CellRef {
            sheet: n.sheet,
            addr: n.start,
        }
    }

    /// Smallest range covering both `self` and `other`.
    ///
    /// Used for the `:` range-combine operator; caller is responsible for
    /// having checked the operands live on the same sheet.
    pub fn bounding(self, other: RangeRef) -> RangeRef {
        let a = self.normalized();
        let b = other.normalized();
        RangeRef {
            sheet: a.sheet.or(b.sheet),
            start: CellAddr {
                row: a.start.row.min(b.start.row),
                col: a.start.col.min(b.start.col),
            },
            end: CellAddr {
                row: a.end.row.max(b.end.row),
                col: a.end.col.max(b.end.col),
            },
        }
    }
}

impl From<CellRef> for RangeRef {
    fn from(value: CellRef) -> Self {
        value.to_range()
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// A resolved location: what a variable or a reference-returning function
/// denotes before any data is fetched.
///
/// `Union` never comes out of the grammar; it exists because a host can
/// resolve a name to a multi-area reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Reference {
    Cell(CellRef),
    Range(RangeRef),
    Union(Vec<RangeRef>),
}

impl Reference {
    /// Collapse a one-cell range to a cell reference; leave the rest alone.
    pub fn simplified(self) -> Reference {
        match self {
            Reference::Range(range) if range.is_single_cell() => {
                Reference::Cell(range.top_left())
            }
            other => other,
        }
    }
}

impl From<CellRef> for Reference {
    fn from(value: CellRef) -> Self {
        Reference::Cell(value)
    }
}

impl From<RangeRef> for Reference {
    fn from(value: RangeRef) -> Self {
        Reference::Range(value)
    }
}

/// Coordinates of the formula being evaluated.
///
/// Supplies the default sheet for unqualified references. Set once per
/// `evaluate` call and never mutated mid-evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub sheet: SheetId,
    pub row: u32,
    pub col: u32,
}

impl Position {
    pub const fn new(sheet: SheetId, row: u32, col: u32) -> Self {
        Self { sheet, row, col }
    }

    #[inline]
    pub const fn addr(self) -> CellAddr {
        CellAddr {
            row: self.row,
            col: self.col,
        }
    }
}

/// Column index → letters (`0` → `A`, `27` → `AB`).
pub fn column_name(col: u32) -> String {
    // A1 column letters are a bijective base-26 numeral; work 1-based.
    let mut n = col + 1;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).expect("column letters are always valid UTF-8")
}

/// Column letters → index (`A` → `0`, `AB` → `27`). Case-insensitive.
pub fn column_index(s: &str) -> Result<u32, A1ParseError> {
    let mut col: u32 = 0;
    for b in s.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(A1ParseError::InvalidColumn);
        }
        let v = (b.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or(A1ParseError::InvalidColumn)?;
    }
    if col == 0 {
        return Err(A1ParseError::InvalidColumn);
    }
    Ok(col - 1)
}
