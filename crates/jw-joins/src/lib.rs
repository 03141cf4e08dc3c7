//! Join specifications and join maps for joinwave.
//!
//! A [`JoinSpec`] describes which join(s) a binding cares about: one
//! address, an ordered list of addresses, or an inclusive numeric range,
//! optionally shifted by an offset. The resolver turns a spec into the
//! concrete ordered list of string addresses once, at setup time.
//!
//! A [`JoinMap`] is a named tree of specs (groups, lists and leaves) that
//! describes a whole touch-panel program's joins in one place.

pub mod error;
pub mod map;
pub mod resolve;
pub mod spec;

pub use error::{JoinError, JoinResult};
pub use map::{JoinEntry, JoinMap, JoinNode, KindEntry, Located};
pub use resolve::{MAX_RANGE_LEN, address_count, offset_for, resolve};
pub use spec::{Direction, Effects, JoinAtom, JoinSpec, JoinTarget, MockSeed, Offset, PerKindOffset};
