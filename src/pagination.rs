//! Relay-style connections over upstream array slices
//!
//! Gravity pages with `size`/`offset` and reports the collection size in the
//! `x-total-count` header. These helpers translate connection arguments into
//! that offset window and wrap the returned slice back into a connection.

use async_graphql::connection::{Connection, Edge, EmptyFields};
use async_graphql::OutputType;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::{GatewayError, Result};

const CURSOR_PREFIX: &str = "arrayconnection:";

/// Cursor encoding/decoding
pub struct CursorCodec;

impl CursorCodec {
    /// Encode cursor to base64
    pub fn encode(value: &str) -> String {
        BASE64.encode(value.as_bytes())
    }

    /// Decode cursor from base64
    pub fn decode(cursor: &str) -> Result<String> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| GatewayError::InvalidCursor(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| GatewayError::InvalidCursor(e.to_string()))
    }

    /// Cursor for the item at `offset` in the full collection
    pub fn from_offset(offset: usize) -> String {
        Self::encode(&format!("{CURSOR_PREFIX}{offset}"))
    }

    /// Offset encoded in an array cursor
    pub fn to_offset(cursor: &str) -> Result<usize> {
        let decoded = Self::decode(cursor)?;
        decoded
            .strip_prefix(CURSOR_PREFIX)
            .and_then(|offset| offset.parse().ok())
            .ok_or(GatewayError::InvalidCursor(decoded))
    }

    /// Offset of the item following the one `cursor` points at
    pub fn offset_after(cursor: &str) -> Result<usize> {
        Self::to_offset(cursor)?
            .checked_add(1)
            .ok_or_else(|| GatewayError::InvalidCursor(format!("cursor {cursor} is out of range")))
    }
}

/// Connection arguments as received by a field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagingArgs {
    /// Number of items to return (forward pagination)
    pub first: Option<i32>,

    /// Cursor to start from (forward pagination)
    pub after: Option<String>,

    /// Number of items to return (backward pagination)
    pub last: Option<i32>,

    /// Cursor to start from (backward pagination)
    pub before: Option<String>,
}

/// Offset window to request upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingParameters {
    pub offset: usize,
    pub limit: usize,
}

impl PagingArgs {
    pub fn new(
        first: Option<i32>,
        after: Option<String>,
        last: Option<i32>,
        before: Option<String>,
    ) -> Self {
        Self {
            first,
            after,
            last,
            before,
        }
    }

    pub fn first(first: i32) -> Self {
        Self {
            first: Some(first),
            ..Default::default()
        }
    }

    /// Check if forward pagination
    pub fn is_forward(&self) -> bool {
        self.first.is_some() || self.after.is_some()
    }

    /// Check if backward pagination
    pub fn is_backward(&self) -> bool {
        self.last.is_some() || self.before.is_some()
    }

    /// Validate paging arguments against `max_page_size`
    pub fn validate(&self, max_page_size: i32) -> Result<()> {
        if self.is_forward() && self.is_backward() {
            return Err(GatewayError::PaginationError(
                "paging must use either first/after or last/before".to_string(),
            ));
        }

        for (name, value) in [("first", self.first), ("last", self.last)] {
            if let Some(value) = value {
                if value < 0 {
                    return Err(GatewayError::PaginationError(format!(
                        "'{name}' must be non-negative"
                    )));
                }
                if value > max_page_size {
                    return Err(GatewayError::PaginationError(format!(
                        "'{name}' cannot exceed {max_page_size}"
                    )));
                }
            }
        }

        if self.after.is_some() && self.first.is_none() {
            return Err(GatewayError::PaginationError(
                "when paging forwards, a 'first' argument is required".to_string(),
            ));
        }
        if self.before.is_some() && self.last.is_none() {
            return Err(GatewayError::PaginationError(
                "when paging backwards, a 'last' argument is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Translate into the offset window to fetch upstream.
    ///
    /// Without any paging arguments the first `default_page_size` items are
    /// requested.
    pub fn paging_parameters(
        &self,
        default_page_size: i32,
        max_page_size: i32,
    ) -> Result<PagingParameters> {
        self.validate(max_page_size)?;

        if let Some(first) = self.first {
            let offset = match &self.after {
                Some(after) => CursorCodec::offset_after(after)?,
                None => 0,
            };
            return Ok(PagingParameters {
                offset,
                limit: first as usize,
            });
        }

        if let Some(last) = self.last {
            let last = last as usize;
            return match &self.before {
                Some(before) => {
                    let before = CursorCodec::to_offset(before)?;
                    Ok(PagingParameters {
                        offset: before.saturating_sub(last),
                        limit: last.min(before),
                    })
                }
                None => Err(GatewayError::PaginationError(
                    "'last' is not supported without 'before'".to_string(),
                )),
            };
        }

        Ok(PagingParameters {
            offset: 0,
            limit: default_page_size.clamp(0, max_page_size) as usize,
        })
    }
}

/// Where a slice sits inside the full collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceInfo {
    pub slice_start: usize,
    pub array_length: usize,
}

/// A page of items with its cursors, before it becomes a GraphQL connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSlice<T> {
    pub edges: Vec<(String, T)>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> ConnectionSlice<T> {
    /// Create empty connection
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            has_next_page: false,
            has_previous_page: false,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|(_, node)| node)
    }

    pub fn into_connection(self) -> Connection<String, T>
    where
        T: OutputType,
    {
        let mut connection = Connection::new(self.has_previous_page, self.has_next_page);
        connection.edges.extend(
            self.edges
                .into_iter()
                .map(|(cursor, node)| Edge::<String, T, EmptyFields>::new(cursor, node)),
        );
        connection
    }
}

/// Build a connection from a slice of a larger collection.
///
/// `hasNextPage` is true iff items remain after the returned ones, and no page
/// holds more than `first` (or `last`) items.
pub fn connection_from_array_slice<T>(
    slice: Vec<T>,
    args: &PagingArgs,
    info: SliceInfo,
) -> Result<ConnectionSlice<T>> {
    let SliceInfo {
        slice_start,
        array_length,
    } = info;
    let slice_end = slice_start + slice.len();

    let after_offset = args
        .after
        .as_deref()
        .map(CursorCodec::offset_after)
        .transpose()?;
    let before_offset = args
        .before
        .as_deref()
        .map(CursorCodec::to_offset)
        .transpose()?
        .unwrap_or(array_length);

    let mut start = after_offset.map_or(slice_start, |after| slice_start.max(after));
    let mut end = slice_end.min(before_offset).min(array_length);

    if let Some(first) = args.first {
        if first < 0 {
            return Err(GatewayError::PaginationError(
                "'first' must be non-negative".to_string(),
            ));
        }
        end = end.min(start.saturating_add(first as usize));
    }
    if let Some(last) = args.last {
        if last < 0 {
            return Err(GatewayError::PaginationError(
                "'last' must be non-negative".to_string(),
            ));
        }
        start = start.max(end.saturating_sub(last as usize));
    }

    let edges: Vec<(String, T)> = slice
        .into_iter()
        .enumerate()
        .skip(start - slice_start)
        .take(end.saturating_sub(start))
        .map(|(index, node)| (CursorCodec::from_offset(slice_start + index), node))
        .collect();

    Ok(ConnectionSlice {
        has_next_page: start + edges.len() < array_length,
        has_previous_page: start > 0,
        edges,
    })
}

/// Build a connection from a complete collection
pub fn connection_from_array<T>(items: Vec<T>, args: &PagingArgs) -> Result<ConnectionSlice<T>> {
    let info = SliceInfo {
        slice_start: 0,
        array_length: items.len(),
    };
    connection_from_array_slice(items, args, info)
}
