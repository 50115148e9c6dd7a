// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trait and method resolution against a loaded [`Store`](crate::store::Store).
//!
//! Resolvers borrow the store and keep no state between queries, so one store can serve
//! any number of resolvers on any number of threads.
//!
//! ```rust
//! use permute::resolve::{Resolution, TraitResolver};
//! use permute::store::{Store, TraitRef, Ty};
//!
//! let store = Store::load(vec![]).unwrap();
//! let resolver = TraitResolver::new(&store);
//! let eq = TraitRef::new("std::PartialEq", vec![]);
//! match resolver.resolve(&Ty::std("u32", vec![]), &eq) {
//!     Resolution::Candidate(candidate) => assert!(candidate.is_const),
//!     other => panic!("u32 should be comparable: {:?}", other),
//! }
//! ```

pub mod methods;
pub mod traits;
pub mod unify;

pub use methods::{MethodProvider, MethodRef, MethodResolution, MethodResolver};
pub use traits::{Candidate, CandidateOrigin, Resolution, TraitResolver};
pub use unify::{types_match, unify};
