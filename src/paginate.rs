//! Query splitting for the dashboard API.
//!
//! The dashboard endpoint returns at most `page_size` posts per call, so a
//! request for `total` posts is split into a sequence of `(offset, limit)`
//! descriptors. Pages are full-size except the last, which asks for exactly the
//! remainder so the window never spills into posts beyond `total`.
use thiserror::Error;

/// Default number of posts fetched per run.
pub const DEFAULT_POST_COUNT: u32 = 20;

/// Upper bound the dashboard API places on a single call.
pub const MAX_PAGE_SIZE: u32 = 20;

pub const DEFAULT_PAGE_SIZE: u32 = MAX_PAGE_SIZE;

/// Furthest into the dashboard a single run may reach.
pub const MAX_POST_COUNT: u32 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginateError {
    #[error("Page size must be greater than zero")]
    ZeroPageSize,
    /// The API silently truncates larger pages, which would leave gaps.
    #[error("Page size {0} exceeds the API limit of {max}", max = MAX_PAGE_SIZE)]
    PageSizeTooLarge(u32),
    #[error("Starting offset {starting_offset} plus {total} posts exceeds the largest dashboard offset")]
    OffsetOverflow { starting_offset: u32, total: u32 },
}

/// A single call against the dashboard endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

/// Computes the requests needed to retrieve exactly `total` posts.
///
/// Offsets start at `starting_offset` and grow by `page_size`. The plan is in
/// ascending offset order; callers concatenate responses in the same order.
pub fn plan(
    total: u32,
    page_size: u32,
    starting_offset: u32,
) -> Result<Vec<PageRequest>, PaginateError> {
    if page_size == 0 {
        return Err(PaginateError::ZeroPageSize);
    }
    if page_size > MAX_PAGE_SIZE {
        return Err(PaginateError::PageSizeTooLarge(page_size));
    }

    let full_pages = total / page_size;
    let remainder = total % page_size;
    let calls = full_pages + u32::from(remainder > 0);

    (0..calls)
        .map(|i| {
            let offset = i
                .checked_mul(page_size)
                .and_then(|step| starting_offset.checked_add(step))
                .ok_or(PaginateError::OffsetOverflow {
                    starting_offset,
                    total,
                })?;
            let is_last = i + 1 == calls;
            Ok(PageRequest {
                offset,
                limit: if is_last && remainder > 0 {
                    remainder
                } else {
                    page_size
                },
            })
        })
        .collect()
}
