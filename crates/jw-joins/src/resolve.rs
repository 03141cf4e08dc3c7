//! Address resolution.
//!
//! Turns a [`JoinSpec`] into the concrete, ordered list of addresses a
//! binding subscribes and publishes to. Numeric joins get the applicable
//! offset; named joins pass through untouched.

use jw_core::{Address, SignalKind};

use crate::error::{JoinError, JoinResult};
use crate::spec::{JoinAtom, JoinSpec, JoinTarget, Offset};

/// Offset applied to numeric joins of `kind`.
///
/// A uniform offset applies to every kind; a per-kind offset falls back to
/// `0` for kinds it does not name.
pub fn offset_for(offset: Option<&Offset>, kind: SignalKind) -> i64 {
    match offset {
        None => 0,
        Some(Offset::Uniform(n)) => *n,
        Some(Offset::PerKind(per_kind)) => per_kind.get(kind).unwrap_or(0),
    }
}

/// Longest numeric range a spec may expand to.
pub const MAX_RANGE_LEN: usize = 65_536;

/// Resolve a spec into its addresses.
///
/// The result is never empty: an empty list or a range with
/// `start > end` is rejected here, before any subscription happens. So are
/// ranges longer than [`MAX_RANGE_LEN`] and joins whose offset leaves the
/// `i64` range.
pub fn resolve(spec: &JoinSpec) -> JoinResult<Vec<Address>> {
    let offset = offset_for(spec.offset.as_ref(), spec.kind);

    match &spec.target {
        JoinTarget::Single(atom) => Ok(vec![resolve_atom(atom, offset)?]),
        JoinTarget::List(atoms) => {
            if atoms.is_empty() {
                return Err(JoinError::EmptyList {
                    context: spec.key.clone(),
                });
            }
            atoms.iter().map(|a| resolve_atom(a, offset)).collect()
        }
        JoinTarget::Range { start, end } => {
            let (first, last) = check_range(*start, *end, offset)?;
            Ok((first..=last).map(Address::from).collect())
        }
    }
}

/// Number of addresses a spec resolves to, without allocating them.
///
/// Fails exactly when [`resolve`] would.
pub fn address_count(spec: &JoinSpec) -> JoinResult<usize> {
    let offset = offset_for(spec.offset.as_ref(), spec.kind);

    match &spec.target {
        JoinTarget::Single(atom) => resolve_atom(atom, offset).map(|_| 1),
        JoinTarget::List(atoms) if atoms.is_empty() => Err(JoinError::EmptyList {
            context: spec.key.clone(),
        }),
        JoinTarget::List(atoms) => {
            for atom in atoms {
                if let JoinAtom::Number(join) = atom {
                    shift(*join, offset)?;
                }
            }
            Ok(atoms.len())
        }
        JoinTarget::Range { start, end } => {
            let (first, last) = check_range(*start, *end, offset)?;
            Ok(last.abs_diff(first) as usize + 1)
        }
    }
}

/// Validate a range and return its offset bounds.
fn check_range(start: i64, end: i64, offset: i64) -> JoinResult<(i64, i64)> {
    if start > end {
        return Err(JoinError::EmptyRange { start, end });
    }
    if end.abs_diff(start) >= MAX_RANGE_LEN as u64 {
        return Err(JoinError::RangeTooLarge {
            start,
            end,
            limit: MAX_RANGE_LEN,
        });
    }
    Ok((shift(start, offset)?, shift(end, offset)?))
}

fn shift(join: i64, offset: i64) -> JoinResult<i64> {
    join.checked_add(offset)
        .ok_or(JoinError::AddressOverflow { join, offset })
}

fn resolve_atom(atom: &JoinAtom, offset: i64) -> JoinResult<Address> {
    match atom {
        JoinAtom::Number(join) => Ok(Address::from(shift(*join, offset)?)),
        JoinAtom::Text(name) => Ok(Address::new(name.clone())),
    }
}
