// PhySL
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Tile descriptors for distributed array shards.
//!
//! A tile annotation is stored as
//! `["tile", [axis, start, stop], ...]` with one entry per axis, axis being
//! one of `"pages"`, `"rows"` or `"columns"`.

use super::{Annotation, AnnotationError};
use crate::value::Value;
use std::fmt;

pub const TILE_KEY: &str = "tile";

/// Half-open index range `[start, stop)` along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TilingSpan {
    pub start: i64,
    pub stop: i64,
}

impl TilingSpan {
    pub fn new(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.stop
    }

    pub fn size(&self) -> i64 {
        if self.is_valid() { self.stop - self.start } else { 0 }
    }

    pub fn contains(&self, index: i64) -> bool {
        self.start <= index && index < self.stop
    }

    /// Overlapping range, `None` when the spans do not overlap
    pub fn intersect(&self, other: &TilingSpan) -> Option<TilingSpan> {
        let span = TilingSpan::new(self.start.max(other.start), self.stop.min(other.stop));
        span.is_valid().then_some(span)
    }

    /// Span relative to `origin`
    pub fn shifted(&self, origin: i64) -> TilingSpan {
        TilingSpan::new(self.start - origin, self.stop - origin)
    }
}

impl fmt::Display for TilingSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// Intersection of two spans
pub fn intersect(a: &TilingSpan, b: &TilingSpan) -> Option<TilingSpan> {
    a.intersect(b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TilingAxis {
    Pages,
    Rows,
    Columns,
}

impl TilingAxis {
    pub fn name(&self) -> &'static str {
        match self {
            TilingAxis::Pages => "pages",
            TilingAxis::Rows => "rows",
            TilingAxis::Columns => "columns",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pages" => Some(TilingAxis::Pages),
            "rows" => Some(TilingAxis::Rows),
            "columns" => Some(TilingAxis::Columns),
            _ => None,
        }
    }
}

fn span_entry(axis: TilingAxis, span: &TilingSpan) -> Value {
    Value::List(vec![Value::from(axis.name()), Value::from(span.start), Value::from(span.stop)])
}

fn invalid(message: impl Into<String>) -> AnnotationError {
    AnnotationError::Invalid {
        key: TILE_KEY.to_string(),
        message: message.into(),
    }
}

/// Axis entries of a tile annotation in stored order
fn read_spans(annotation: &Annotation) -> Result<Vec<(TilingAxis, TilingSpan)>, AnnotationError> {
    let tile = if annotation.key() == TILE_KEY {
        annotation.clone()
    } else {
        annotation.find(TILE_KEY).ok_or_else(|| AnnotationError::Missing(TILE_KEY.to_string()))?
    };

    tile.data()
        .iter()
        .map(|entry| match entry.as_list() {
            Some([Value::Str(axis), start, stop]) => {
                let axis = TilingAxis::from_name(axis).ok_or_else(|| invalid(format!("unknown axis '{}'", axis)))?;
                match (start.as_i64(), stop.as_i64()) {
                    (Some(start), Some(stop)) => Ok((axis, TilingSpan::new(start, stop))),
                    _ => Err(invalid("span bounds must be integers")),
                }
            }
            _ => Err(invalid(format!("malformed axis entry {}", entry))),
        })
        .collect()
}

fn find_span(spans: &[(TilingAxis, TilingSpan)], axis: TilingAxis) -> Result<TilingSpan, AnnotationError> {
    spans
        .iter()
        .find(|(a, _)| *a == axis)
        .map(|(_, span)| *span)
        .ok_or_else(|| invalid(format!("missing '{}' span", axis.name())))
}

/// Tile of a vector, which is either a row or a column vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingInformation1d {
    pub axis: TilingAxis,
    pub span: TilingSpan,
}

impl TilingInformation1d {
    pub fn new(axis: TilingAxis, span: TilingSpan) -> Self {
        Self { axis, span }
    }

    pub fn transpose(&self) -> Self {
        let axis = match self.axis {
            TilingAxis::Columns => TilingAxis::Rows,
            TilingAxis::Rows => TilingAxis::Columns,
            TilingAxis::Pages => TilingAxis::Pages,
        };
        Self::new(axis, self.span)
    }

    pub fn as_annotation(&self) -> Annotation {
        Annotation::new(TILE_KEY, vec![span_entry(self.axis, &self.span)])
    }

    pub fn from_annotation(annotation: &Annotation) -> Result<Self, AnnotationError> {
        match read_spans(annotation)?.as_slice() {
            [(axis @ (TilingAxis::Rows | TilingAxis::Columns), span)] => Ok(Self::new(*axis, *span)),
            _ => Err(invalid("expected a single 'rows' or 'columns' span")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingInformation2d {
    pub rows: TilingSpan,
    pub columns: TilingSpan,
}

impl TilingInformation2d {
    pub fn new(rows: TilingSpan, columns: TilingSpan) -> Self {
        Self { rows, columns }
    }

    pub fn transpose(&self) -> Self {
        Self::new(self.columns, self.rows)
    }

    pub fn intersect(&self, other: &TilingInformation2d) -> Option<Self> {
        Some(Self::new(self.rows.intersect(&other.rows)?, self.columns.intersect(&other.columns)?))
    }

    /// Tile of `self x rhs` computable locally, with the contracted index range.
    ///
    /// The result covers this tile's rows and the right-hand tile's columns;
    /// only the overlap of this tile's columns with the right-hand rows
    /// contributes. `None` when that overlap is empty.
    pub fn dot_product(&self, rhs: &TilingInformation2d) -> Option<(TilingInformation2d, TilingSpan)> {
        let inner = self.columns.intersect(&rhs.rows)?;
        Some((Self::new(self.rows, rhs.columns), inner))
    }

    /// Matrix tile times a column-vector tile
    pub fn dot_vector(&self, rhs: &TilingInformation1d) -> Option<(TilingInformation1d, TilingSpan)> {
        let inner = self.columns.intersect(&rhs.span)?;
        Some((TilingInformation1d::new(TilingAxis::Rows, self.rows), inner))
    }

    pub fn as_annotation(&self) -> Annotation {
        Annotation::new(TILE_KEY, vec![span_entry(TilingAxis::Rows, &self.rows), span_entry(TilingAxis::Columns, &self.columns)])
    }

    pub fn from_annotation(annotation: &Annotation) -> Result<Self, AnnotationError> {
        let spans = read_spans(annotation)?;
        if spans.len() != 2 {
            return Err(invalid("expected 'rows' and 'columns' spans"));
        }
        Ok(Self::new(find_span(&spans, TilingAxis::Rows)?, find_span(&spans, TilingAxis::Columns)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingInformation3d {
    pub pages: TilingSpan,
    pub rows: TilingSpan,
    pub columns: TilingSpan,
}

impl TilingInformation3d {
    pub fn new(pages: TilingSpan, rows: TilingSpan, columns: TilingSpan) -> Self {
        Self { pages, rows, columns }
    }

    /// Reverse the axis order: pages and columns trade places
    pub fn transpose(&self) -> Self {
        Self::new(self.columns, self.rows, self.pages)
    }

    pub fn intersect(&self, other: &TilingInformation3d) -> Option<Self> {
        Some(Self::new(self.pages.intersect(&other.pages)?, self.rows.intersect(&other.rows)?, self.columns.intersect(&other.columns)?))
    }

    pub fn as_annotation(&self) -> Annotation {
        Annotation::new(
            TILE_KEY,
            vec![
                span_entry(TilingAxis::Pages, &self.pages),
                span_entry(TilingAxis::Rows, &self.rows),
                span_entry(TilingAxis::Columns, &self.columns),
            ],
        )
    }

    pub fn from_annotation(annotation: &Annotation) -> Result<Self, AnnotationError> {
        let spans = read_spans(annotation)?;
        if spans.len() != 3 {
            return Err(invalid("expected 'pages', 'rows' and 'columns' spans"));
        }
        Ok(Self::new(
            find_span(&spans, TilingAxis::Pages)?,
            find_span(&spans, TilingAxis::Rows)?,
            find_span(&spans, TilingAxis::Columns)?,
        ))
    }
}
